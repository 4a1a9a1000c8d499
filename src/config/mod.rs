//! Configuration module for Sitepulse
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use sitepulse::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sitepulse.toml")).unwrap();
//! println!("Domain store: {}", config.paths.domain_path);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, DispatcherConfig, GatherConfig, PathsConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
