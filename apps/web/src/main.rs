//! regassist web server: browser chat over the registration knowledge base.
//!
//! One assistant is built at start-up; every browser session gets its own
//! conversation with it.

mod error;
mod routes;
mod session;
mod state;

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::Result;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use regassist_core::{Agent, AnthropicClient};
use regassist_shared::{AgentConfig, load_config};

/// Serve the registration assistant over HTTP.
#[derive(Parser)]
#[command(name = "regassist-web", version, long_about = None)]
struct Args {
    /// Address to bind (defaults to the configured host).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (defaults to the configured port).
    #[arg(long)]
    port: Option<u16>,

    /// Knowledge base file (defaults to the configured output_path).
    #[arg(long)]
    kb: Option<PathBuf>,

    /// Config file (defaults to ~/.regassist/regassist.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text")]
    log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Debug, clap::ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    init_tracing(&args);

    let config = load_config(args.config.as_deref())?;
    let client = AnthropicClient::from_config(&config)?;

    let mut agent_config = AgentConfig::from(&config);
    if let Some(kb) = args.kb {
        agent_config.knowledge_base_path = kb;
    }
    let agent = Agent::load(client, &agent_config)?;

    let app = routes::create_router(state::AppState::new(agent)).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    let host = args.host.unwrap_or(config.server.host);
    let port = args.port.unwrap_or(config.server.port);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(model = %agent_config.model, "Server listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn init_tracing(args: &Args) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match args.verbose {
        0 => "regassist=info,tower_http=info",
        1 => "regassist=debug,tower_http=debug",
        _ => "regassist=trace,tower_http=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match args.log_format {
        LogFormat::Text => fmt().with_env_filter(env_filter).with_target(false).init(),
        LogFormat::Json => fmt().json().with_env_filter(env_filter).init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
