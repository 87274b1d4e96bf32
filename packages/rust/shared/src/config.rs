//! Application configuration for regassist.
//!
//! User config lives at `~/.regassist/regassist.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RegAssistError, Result};
use crate::types::Source;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "regassist.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".regassist";

// ---------------------------------------------------------------------------
// Config structs (matching regassist.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Knowledge base collection settings.
    #[serde(default)]
    pub scrape: ScrapeSettings,

    /// Completion API settings.
    #[serde(default)]
    pub anthropic: AnthropicConfig,

    /// Web server settings.
    #[serde(default)]
    pub server: ServerConfig,
}

/// `[scrape]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeSettings {
    /// Where the knowledge base artifact is written (and read by the assistant).
    #[serde(default = "default_output_path")]
    pub output_path: String,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Pause between consecutive source fetches.
    #[serde(default = "default_politeness_delay")]
    pub politeness_delay_ms: u64,

    /// A source counts as scraped only if its cleaned text is longer than this.
    #[serde(default = "default_min_content_chars")]
    pub min_content_chars: usize,

    /// Knowledge bases shorter than this trigger a warning.
    #[serde(default = "default_min_knowledge_base_chars")]
    pub min_knowledge_base_chars: usize,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            output_path: default_output_path(),
            timeout_secs: default_timeout_secs(),
            politeness_delay_ms: default_politeness_delay(),
            min_content_chars: default_min_content_chars(),
            min_knowledge_base_chars: default_min_knowledge_base_chars(),
        }
    }
}

fn default_output_path() -> String {
    "knowledge_base.txt".into()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_politeness_delay() -> u64 {
    2000
}
fn default_min_content_chars() -> usize {
    500
}
fn default_min_knowledge_base_chars() -> usize {
    5000
}

/// `[anthropic]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model used for answers.
    #[serde(default = "default_model")]
    pub model: String,

    /// Upper bound on generated tokens per answer.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout.
    #[serde(default = "default_completion_timeout")]
    pub timeout_secs: u64,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            base_url: default_base_url(),
            timeout_secs: default_completion_timeout(),
        }
    }
}

fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".into()
}
fn default_model() -> String {
    "claude-sonnet-4-20250514".into()
}
fn default_max_tokens() -> u32 {
    1000
}
fn default_base_url() -> String {
    "https://api.anthropic.com".into()
}
fn default_completion_timeout() -> u64 {
    60
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    5000
}

// ---------------------------------------------------------------------------
// Runtime configs (merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime collection configuration. Sources come from the built-in list.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// Pages to visit, in order.
    pub sources: Vec<Source>,
    /// Artifact path.
    pub output_path: PathBuf,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Pause between consecutive sources.
    pub politeness_delay: Duration,
    /// Strict lower bound on cleaned text length for a source to count.
    pub min_content_chars: usize,
    /// Size below which the finished knowledge base is flagged as small.
    pub min_knowledge_base_chars: usize,
}

impl From<&AppConfig> for ScrapeConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            sources: Source::defaults(),
            output_path: PathBuf::from(&config.scrape.output_path),
            timeout: Duration::from_secs(config.scrape.timeout_secs),
            politeness_delay: Duration::from_millis(config.scrape.politeness_delay_ms),
            min_content_chars: config.scrape.min_content_chars,
            min_knowledge_base_chars: config.scrape.min_knowledge_base_chars,
        }
    }
}

/// Runtime assistant configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Model identifier sent with each request.
    pub model: String,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    /// Knowledge base artifact to load at start-up.
    pub knowledge_base_path: PathBuf,
}

impl From<&AppConfig> for AgentConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            model: config.anthropic.model.clone(),
            max_tokens: config.anthropic.max_tokens,
            knowledge_base_path: PathBuf::from(&config.scrape.output_path),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.regassist/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| RegAssistError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.regassist/regassist.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
///
/// `path` overrides the default location; an explicit path that does not exist is an error.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = path {
        return load_config_from(path);
    }

    let path = config_file_path()?;
    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| RegAssistError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        RegAssistError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    init_config_at(&config_file_path()?)
}

/// Write a default config file at `path`, creating parent directories.
pub fn init_config_at(path: &Path) -> Result<PathBuf> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| RegAssistError::io(dir, e))?;
    }

    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| RegAssistError::config(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| RegAssistError::io(path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path.to_path_buf())
}

pub fn resolve_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.anthropic.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(RegAssistError::config(format!(
            "Anthropic API key not found. Set the {var_name} environment variable."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("output_path"));
        assert!(toml_str.contains("ANTHROPIC_API_KEY"));
        assert!(toml_str.contains("politeness_delay_ms"));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let toml_str = r#"
[scrape]
politeness_delay_ms = 0

[server]
port = 8080
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.scrape.politeness_delay_ms, 0);
        assert_eq!(config.scrape.min_content_chars, 500);
        assert_eq!(config.scrape.timeout_secs, 10);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.anthropic.max_tokens, 1000);
    }

    #[test]
    fn scrape_config_from_app_config() {
        let app = AppConfig::default();
        let scrape = ScrapeConfig::from(&app);
        assert_eq!(scrape.sources.len(), 3);
        assert_eq!(scrape.timeout, Duration::from_secs(10));
        assert_eq!(scrape.politeness_delay, Duration::from_secs(2));
        assert_eq!(scrape.min_content_chars, 500);
        assert_eq!(scrape.output_path, PathBuf::from("knowledge_base.txt"));
    }

    #[test]
    fn agent_config_reads_artifact_path_from_scrape_section() {
        let mut app = AppConfig::default();
        app.scrape.output_path = "/srv/kb.txt".into();
        let agent = AgentConfig::from(&app);
        assert_eq!(agent.knowledge_base_path, PathBuf::from("/srv/kb.txt"));
        assert_eq!(agent.max_tokens, 1000);
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let path = std::env::temp_dir().join("regassist-no-such-config-file.toml");
        let err = load_config(Some(&path)).unwrap_err();
        assert!(matches!(err, RegAssistError::Io { .. }));
    }

    #[test]
    fn init_config_at_writes_loadable_defaults() {
        let dir = std::env::temp_dir().join(format!("regassist-config-test-{}", std::process::id()));
        let path = dir.join("nested").join("regassist.toml");

        let written = init_config_at(&path).unwrap();
        assert_eq!(written, path);

        let loaded = load_config(Some(&path)).unwrap();
        assert_eq!(loaded.server.port, 5000);
        assert_eq!(loaded.anthropic.model, AppConfig::default().anthropic.model);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn api_key_validation() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.anthropic.api_key_env = "REGASSIST_TEST_NONEXISTENT_KEY_12345".into();
        let result = resolve_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
