use crate::config::types::{
    Config, CrawlerConfig, DispatcherConfig, GatherConfig, PathsConfig, UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_paths_config(&config.paths)?;
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_dispatcher_config(&config.dispatcher)?;
    if let Some(gather) = &config.gather {
        validate_gather_config(gather)?;
    }
    Ok(())
}

/// Validates filesystem layout configuration
fn validate_paths_config(config: &PathsConfig) -> Result<(), ConfigError> {
    if config.data_path.is_empty() {
        return Err(ConfigError::Validation(
            "data_path cannot be empty".to_string(),
        ));
    }

    if config.domain_path.is_empty() {
        return Err(ConfigError::Validation(
            "domain_path cannot be empty".to_string(),
        ));
    }

    if config.ledger_file.is_empty() || config.ledger_file.contains('/') {
        return Err(ConfigError::Validation(format!(
            "ledger_file must be a bare file name, got '{}'",
            config.ledger_file
        )));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.request_timeout < 1 || config.request_timeout > 300 {
        return Err(ConfigError::Validation(format!(
            "request_timeout must be between 1 and 300 seconds, got {}",
            config.request_timeout
        )));
    }

    if config.connect_timeout < 1 || config.connect_timeout > config.request_timeout {
        return Err(ConfigError::Validation(format!(
            "connect_timeout must be between 1 and request_timeout, got {}",
            config.connect_timeout
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::Validation(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates dispatcher configuration
fn validate_dispatcher_config(config: &DispatcherConfig) -> Result<(), ConfigError> {
    if config.plugin_timeout < 1 {
        return Err(ConfigError::Validation(format!(
            "plugin_timeout must be >= 1 second, got {}",
            config.plugin_timeout
        )));
    }

    Ok(())
}

/// Validates domain discovery configuration
fn validate_gather_config(config: &GatherConfig) -> Result<(), ConfigError> {
    Url::parse(&config.source_url)
        .map_err(|e| ConfigError::Validation(format!("Invalid gather source-url: {}", e)))?;

    Ok(())
}

/// Basic email validation (local@domain with a dot in the domain)
fn validate_email(email: &str) -> Result<(), ConfigError> {
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid contact_email: '{}'",
            email
        )));
    }
    Ok(())
}
