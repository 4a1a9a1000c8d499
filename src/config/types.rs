use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure for Sitepulse
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub paths: PathsConfig,
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    #[serde(default)]
    pub gather: Option<GatherConfig>,
}

/// Domain discovery configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GatherConfig {
    /// Directory page whose microformats entries seed new registry domains
    #[serde(rename = "source-url")]
    pub source_url: String,
}

/// Filesystem layout configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    /// Root data directory (holds the ledger, scripts dir, and summary file)
    #[serde(rename = "data-path")]
    pub data_path: String,

    /// Directory holding one subdirectory per tracked domain
    #[serde(rename = "domain-path")]
    pub domain_path: String,

    /// Name of the domain ledger file inside the data directory
    #[serde(rename = "ledger-file", default = "default_ledger_file")]
    pub ledger_file: String,
}

fn default_ledger_file() -> String {
    "domains.json".to_string()
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Overall request timeout (seconds)
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Connection establishment timeout (seconds)
    #[serde(rename = "connect-timeout", default = "default_connect_timeout")]
    pub connect_timeout: u64,
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Plugin dispatcher configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DispatcherConfig {
    /// Maximum runtime for one plugin invocation (seconds)
    #[serde(rename = "plugin-timeout", default = "default_plugin_timeout")]
    pub plugin_timeout: u64,
}

fn default_plugin_timeout() -> u64 {
    120
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            plugin_timeout: default_plugin_timeout(),
        }
    }
}

impl Config {
    /// Path to the domain ledger file
    pub fn ledger_path(&self) -> PathBuf {
        PathBuf::from(&self.paths.data_path).join(&self.paths.ledger_file)
    }

    /// Path to the directory of stat-extraction plugins
    pub fn scripts_path(&self) -> PathBuf {
        PathBuf::from(&self.paths.data_path).join("scripts")
    }

    /// Path to the global summary file
    pub fn summary_path(&self) -> PathBuf {
        PathBuf::from(&self.paths.data_path).join("summary.json")
    }

    /// Directory holding one subdirectory per tracked domain
    pub fn domain_path(&self) -> PathBuf {
        PathBuf::from(&self.paths.domain_path)
    }

    /// Directory for a single tracked domain
    pub fn domain_dir(&self, domain: &str) -> PathBuf {
        self.domain_path().join(domain)
    }
}
