//! Configuration loading from disk and environment.

use secrecy::SecretString;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load, overlay environment and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: GatewayConfig = toml::from_str(&content)?;

    apply_env(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Build configuration from defaults plus environment.
pub fn config_from_env() -> Result<GatewayConfig, ConfigError> {
    let mut config = GatewayConfig::default();
    apply_env(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Overlay `PORT` and provider credentials from the process environment.
pub fn apply_env(config: &mut GatewayConfig) {
    apply_env_with(config, |key| std::env::var(key).ok());
}

fn apply_env_with(config: &mut GatewayConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(port) = lookup("PORT").and_then(|p| p.parse::<u16>().ok()) {
        let host = config
            .listener
            .bind_address
            .rsplit_once(':')
            .map(|(host, _)| host.to_string())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        config.listener.bind_address = format!("{}:{}", host, port);
    }

    let secret = |key: &str| {
        lookup(key)
            .filter(|v| !v.trim().is_empty())
            .map(SecretString::from)
    };

    let secrets = &mut config.secrets;
    if let Some(v) = secret("ANTHROPIC_API_KEY") {
        secrets.completion_api_key = Some(v);
    }
    if let Some(v) = secret("EMAILJS_SERVICE_ID") {
        secrets.email_service_id = Some(v);
    }
    if let Some(v) = secret("EMAILJS_TEMPLATE_ID") {
        secrets.email_template_id = Some(v);
    }
    if let Some(v) = secret("EMAILJS_PUBLIC_KEY") {
        secrets.email_public_key = Some(v);
    }
    if let Some(v) = secret("EMAILJS_PRIVATE_KEY") {
        secrets.email_private_key = Some(v);
    }
}
