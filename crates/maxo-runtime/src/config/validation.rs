//! Configuration validation utilities.

use maxo_webhook::IpFilter;

use super::error::{ConfigError, ConfigResult};
use super::schema::{LogOutput, LoggingConfig, MaxoConfig, WebhookSettings};

/// Validates the entire configuration.
pub fn validate_config(config: &MaxoConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_webhook_settings(&config.webhook)?;
    Ok(())
}

/// Validates logging settings.
fn validate_logging_config(config: &LoggingConfig) -> ConfigResult<()> {
    if config.filters.keys().any(|module| module.trim().is_empty()) {
        return Err(ConfigError::validation("Log filter module cannot be empty"));
    }

    if config.output == LogOutput::File && config.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    Ok(())
}

/// Validates webhook settings.
fn validate_webhook_settings(settings: &WebhookSettings) -> ConfigResult<()> {
    if settings.listen_addr.trim().is_empty() {
        return Err(ConfigError::missing_field("webhook.listen_addr"));
    }

    if let Some(url) = &settings.url {
        validate_url(url)?;
    }

    if settings.shutdown_timeout_secs == Some(0) {
        return Err(ConfigError::validation(
            "Shutdown timeout must be greater than 0",
        ));
    }

    if settings.max_body_bytes == 0 {
        return Err(ConfigError::validation(
            "Maximum body size must be greater than 0",
        ));
    }

    IpFilter::parse(&settings.ip_allowlist)?;

    Ok(())
}

/// Validates a webhook URL.
fn validate_url(url: &str) -> ConfigResult<()> {
    if url.is_empty() {
        return Err(ConfigError::missing_field("webhook.url"));
    }

    let valid_schemes = ["http://", "https://"];
    if !valid_schemes.iter().any(|s| url.starts_with(s)) {
        return Err(ConfigError::invalid_url(
            url,
            format!("URL must start with one of: {:?}", valid_schemes),
        ));
    }

    Ok(())
}
