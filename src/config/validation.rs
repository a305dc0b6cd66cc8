use crate::config::types::{
    Config, CrawlerConfig, HttpConfig, QueryConfig, QueueConfig, StoreConfig, UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_http_config(&config.http)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_store_config(&config.store)?;
    validate_queue_config(&config.queue)?;
    validate_query_config(&config.query)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.background_depth < -1 {
        return Err(ConfigError::Validation(format!(
            "background_depth must be -1 (unbounded) or >= 0, got {}",
            config.background_depth
        )));
    }

    Ok(())
}

/// Validates HTTP configuration
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.retry_attempts > 20 {
        return Err(ConfigError::Validation(format!(
            "retry_attempts must be <= 20, got {}",
            config.retry_attempts
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
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
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates graph store configuration
fn validate_store_config(config: &StoreConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "store database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates work queue configuration
fn validate_queue_config(config: &QueueConfig) -> Result<(), ConfigError> {
    if matches!(config.database_path.as_deref(), Some("")) {
        return Err(ConfigError::Validation(
            "queue database_path cannot be empty when set".to_string(),
        ));
    }

    if config.consumers < 1 || config.consumers > 100 {
        return Err(ConfigError::Validation(format!(
            "consumers must be between 1 and 100, got {}",
            config.consumers
        )));
    }

    if config.max_receive < 1 || config.max_receive > 100 {
        return Err(ConfigError::Validation(format!(
            "max_receive must be between 1 and 100, got {}",
            config.max_receive
        )));
    }

    if config.wait_time_secs > 60 {
        return Err(ConfigError::Validation(format!(
            "wait_time_secs must be <= 60, got {}",
            config.wait_time_secs
        )));
    }

    if config.poll_interval_ms < 1 {
        return Err(ConfigError::Validation(
            "queue poll_interval_ms must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates query configuration
fn validate_query_config(config: &QueryConfig) -> Result<(), ConfigError> {
    if config.default_display_depth < 1 {
        return Err(ConfigError::Validation(
            "default_display_depth must be >= 1".to_string(),
        ));
    }

    if config.poll_interval_ms < 10 {
        return Err(ConfigError::Validation(format!(
            "query poll_interval_ms must be >= 10ms, got {}ms",
            config.poll_interval_ms
        )));
    }

    if config.settle_window_ms < config.poll_interval_ms {
        return Err(ConfigError::Validation(format!(
            "settle_window_ms ({}) must be at least poll_interval_ms ({})",
            config.settle_window_ms, config.poll_interval_ms
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
