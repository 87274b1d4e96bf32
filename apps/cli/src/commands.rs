//! CLI command definitions, routing, and tracing setup.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use regassist_core::pipeline::{CollectResult, ProgressReporter, SourceReport, SourceStatus};
use regassist_core::{Agent, AnthropicClient, Conversation};
use regassist_shared::{
    AgentConfig, AppConfig, ScrapeConfig, Source, init_config, init_config_at, load_config,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// regassist: course registration answers from the university's own pages.
#[derive(Parser)]
#[command(
    name = "regassist",
    version,
    about = "Build the course registration knowledge base and ask questions about it.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.regassist/regassist.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Scrape the registration pages and write the knowledge base.
    Collect {
        /// Output file (defaults to the configured output_path).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Pause between consecutive sources, in milliseconds.
        #[arg(long)]
        delay_ms: Option<u64>,

        /// A source must yield more than this many characters to count.
        #[arg(long)]
        min_chars: Option<usize>,
    },

    /// Chat with the registration assistant in the terminal.
    Ask {
        /// Knowledge base file (defaults to the configured output_path).
        #[arg(long)]
        kb: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "regassist=info",
        1 => "regassist=debug",
        _ => "regassist=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Collect {
            out,
            delay_ms,
            min_chars,
        } => cmd_collect(config_path, out, delay_ms, min_chars).await,
        Command::Ask { kb } => cmd_ask(config_path, kb).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(config_path),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

// ---------------------------------------------------------------------------
// collect
// ---------------------------------------------------------------------------

async fn cmd_collect(
    config_path: Option<&Path>,
    out: Option<PathBuf>,
    delay_ms: Option<u64>,
    min_chars: Option<usize>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let mut scrape = ScrapeConfig::from(&config);
    if let Some(out) = out {
        scrape.output_path = out;
    }
    if let Some(ms) = delay_ms {
        scrape.politeness_delay = Duration::from_millis(ms);
    }
    if let Some(min) = min_chars {
        scrape.min_content_chars = min;
    }

    info!(
        sources = scrape.sources.len(),
        output = %scrape.output_path.display(),
        "collecting registration pages"
    );

    println!("Starting data collection...");
    println!();

    let reporter = CliProgress::new();
    let result = regassist_core::pipeline::collect(&scrape, &reporter).await?;

    print_summary(&result, scrape.sources.len());
    print_quality(&result, scrape.min_knowledge_base_chars);

    Ok(())
}

fn print_summary(result: &CollectResult, total: usize) {
    let rule = "=".repeat(60);
    println!();
    println!("{rule}");
    println!("✓ Data collection complete!");
    println!("✓ Successfully scraped: {}/{total} pages", result.succeeded);
    println!("✓ Total characters: {}", result.total_chars);
    println!("✓ Saved to: {}", result.output_path.display());
    println!("  SHA-256: {}", result.sha256);
    println!("  Time:    {:.1}s", result.elapsed.as_secs_f64());
    println!("{rule}");
}

fn print_quality(result: &CollectResult, min_chars: usize) {
    println!();
    println!("Quality checks:");
    for check in &result.quality.key_terms {
        if check.present {
            println!("  ✓ {} present", check.description);
        } else {
            println!("  ⚠ {} might be missing", check.description);
        }
    }

    if result.quality.is_small {
        println!();
        println!(
            "⚠ WARNING: Knowledge base seems small ({} < {min_chars} chars).",
            result.quality.total_chars
        );
        println!("  Some pages may not have been scraped successfully.");
    }
}

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn source_started(&self, source: &Source, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Scraping [{current}/{total}] {source}"));
    }

    fn source_finished(&self, report: &SourceReport) {
        let line = match &report.status {
            SourceStatus::Succeeded => {
                format!("✓ {} ({} chars)", report.source, report.chars)
            }
            SourceStatus::Failed(reason) => format!("✗ {}: {reason}", report.source),
        };
        self.spinner.println(line);
    }

    fn persisted(&self, path: &Path, chars: usize) {
        self.spinner
            .set_message(format!("Wrote {chars} chars to {}", path.display()));
    }

    fn done(&self, _result: &CollectResult) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// ask
// ---------------------------------------------------------------------------

/// One line of chat input.
#[derive(Debug, PartialEq, Eq)]
enum ChatInput<'a> {
    Quit,
    Reset,
    Blank,
    Question(&'a str),
}

impl<'a> ChatInput<'a> {
    fn parse(line: &'a str) -> Self {
        let line = line.trim();
        match line.to_lowercase().as_str() {
            "quit" | "exit" | "q" => Self::Quit,
            "reset" => Self::Reset,
            "" => Self::Blank,
            _ => Self::Question(line),
        }
    }
}

async fn cmd_ask(config_path: Option<&Path>, kb: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let client = AnthropicClient::from_config(&config)?;

    let mut agent_config = AgentConfig::from(&config);
    if let Some(kb) = kb {
        agent_config.knowledge_base_path = kb;
    }

    let agent = Agent::load(client, &agent_config)?;
    let mut conversation = Conversation::new();

    println!("MSU Registration Assistant");
    println!("Type 'quit' to exit, 'reset' to start a new conversation.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("You: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };

        match ChatInput::parse(&line) {
            ChatInput::Quit => break,
            ChatInput::Blank => continue,
            ChatInput::Reset => {
                conversation.reset();
                println!("Conversation reset.");
                println!();
            }
            ChatInput::Question(question) => {
                print!("\nAssistant: ");
                let _ = std::io::stdout().flush();
                let answer = agent
                    .ask_streaming(&mut conversation, question, |piece| {
                        print!("{piece}");
                        let _ = std::io::stdout().flush();
                    })
                    .await;
                match answer {
                    Ok(_) => println!("\n"),
                    Err(e) => println!("\nError: {e}\n"),
                }
            }
        }
    }

    println!("Goodbye!");
    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn cmd_config_init(config_path: Option<&Path>) -> Result<()> {
    let path = match config_path {
        Some(path) => init_config_at(path)?,
        None => init_config()?,
    };
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config: AppConfig = load_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_commands_are_case_insensitive() {
        assert_eq!(ChatInput::parse("QUIT"), ChatInput::Quit);
        assert_eq!(ChatInput::parse(" exit "), ChatInput::Quit);
        assert_eq!(ChatInput::parse("q"), ChatInput::Quit);
        assert_eq!(ChatInput::parse("Reset"), ChatInput::Reset);
    }

    #[test]
    fn blank_lines_are_skipped() {
        assert_eq!(ChatInput::parse(""), ChatInput::Blank);
        assert_eq!(ChatInput::parse("   \t"), ChatInput::Blank);
    }

    #[test]
    fn questions_are_trimmed() {
        assert_eq!(
            ChatInput::parse("  How do I drop a class?  "),
            ChatInput::Question("How do I drop a class?")
        );
    }

    #[test]
    fn collect_flags_parse() {
        let cli = Cli::try_parse_from([
            "regassist",
            "-v",
            "collect",
            "--out",
            "kb.txt",
            "--delay-ms",
            "0",
            "--min-chars",
            "100",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        match cli.command {
            Command::Collect {
                out,
                delay_ms,
                min_chars,
            } => {
                assert_eq!(out, Some(PathBuf::from("kb.txt")));
                assert_eq!(delay_ms, Some(0));
                assert_eq!(min_chars, Some(100));
            }
            _ => panic!("expected collect"),
        }
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from(["regassist", "config", "show", "--config", "/tmp/r.toml"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/r.toml")));
    }
}
