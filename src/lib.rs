//! Sitepulse: a domain snapshot and stats pipeline
//!
//! This crate tracks a registry of web domains, periodically fetches each
//! domain's page, snapshots the crawl state, and runs external stat-extraction
//! plugins over newly-seen snapshots to build per-domain and global
//! date-bucketed statistics.

pub mod config;
pub mod crawl;
pub mod domain;
pub mod pipeline;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Sitepulse operations
#[derive(Debug, Error)]
pub enum PulseError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("No record found for domain {domain}")]
    RecordNotFound { domain: String },

    #[error("Plugin {plugin} failed for {domain}: {detail}")]
    PluginFailed {
        plugin: String,
        domain: String,
        detail: String,
    },

    #[error("Plugin {plugin} timed out for {domain} after {secs}s")]
    PluginTimeout {
        plugin: String,
        domain: String,
        secs: u64,
    },

    #[error("Plugin {plugin} produced no result file for {domain}")]
    MissingResult { plugin: String, domain: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for Sitepulse operations
pub type Result<T> = std::result::Result<T, PulseError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use domain::{DomainRecord, DomainRegistry, DomainStatus};
