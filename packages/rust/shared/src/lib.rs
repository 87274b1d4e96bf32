//! Shared types, error model, configuration and policy text for regassist.
//!
//! This crate is the foundation depended on by all other regassist crates.
//! It provides:
//! - [`RegAssistError`] — the unified error type
//! - Domain types ([`Source`], [`ImageDescription`]) and the built-in [`SOURCES`]
//! - Configuration ([`AppConfig`], [`ScrapeConfig`], [`AgentConfig`], config loading)
//! - [`policy`] — the hand-authored instructions shared by the artifact and the prompt

pub mod config;
pub mod error;
pub mod policy;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AgentConfig, AnthropicConfig, AppConfig, ScrapeConfig, ScrapeSettings, ServerConfig,
    config_dir, config_file_path, init_config, init_config_at, load_config, load_config_from,
    resolve_api_key,
};
pub use error::{RegAssistError, Result};
pub use types::{ImageDescription, SOURCES, Source};
