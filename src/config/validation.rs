//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (ceilings, windows and timeouts > 0)
//! - Check that provider URLs and CORS origins parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::{GatewayConfig, WindowPolicy};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field}: invalid address '{value}'")]
    BadAddress { field: &'static str, value: String },

    #[error("{field}: invalid URL '{value}'")]
    BadUrl { field: &'static str, value: String },

    #[error("cors.allowed_origins: invalid origin '{0}'")]
    BadOrigin(String),
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config
        .listener
        .bind_address
        .parse::<SocketAddr>()
        .is_err()
    {
        errors.push(ValidationError::BadAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "timeouts.request_secs",
        });
    }

    check_policy(&mut errors, "rate_limit.chat", &config.rate_limit.chat);
    check_policy(&mut errors, "rate_limit.contact", &config.rate_limit.contact);
    if config.rate_limit.sweep_interval_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "rate_limit.sweep_interval_secs",
        });
    }
    if config.rate_limit.trust_forwarded_for && config.rate_limit.trusted_hops == 0 {
        errors.push(ValidationError::Zero {
            field: "rate_limit.trusted_hops",
        });
    }

    for origin in &config.cors.allowed_origins {
        let parsed = url::Url::parse(origin);
        let is_bare_origin = parsed
            .as_ref()
            .map(|u| u.host_str().is_some() && u.path() == "/" && !origin.ends_with('/'))
            .unwrap_or(false);
        if !is_bare_origin {
            errors.push(ValidationError::BadOrigin(origin.clone()));
        }
    }

    if url::Url::parse(&config.completion.base_url).is_err() {
        errors.push(ValidationError::BadUrl {
            field: "completion.base_url",
            value: config.completion.base_url.clone(),
        });
    }
    if config.completion.max_tokens == 0 {
        errors.push(ValidationError::Zero {
            field: "completion.max_tokens",
        });
    }
    if config.completion.timeout_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "completion.timeout_secs",
        });
    }

    if url::Url::parse(&config.email.base_url).is_err() {
        errors.push(ValidationError::BadUrl {
            field: "email.base_url",
            value: config.email.base_url.clone(),
        });
    }
    if config.email.timeout_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "email.timeout_secs",
        });
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::Zero {
            field: "security.max_body_size",
        });
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::BadAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_policy(errors: &mut Vec<ValidationError>, field: &'static str, policy: &WindowPolicy) {
    if policy.max_requests == 0 || policy.window_secs == 0 {
        errors.push(ValidationError::Zero { field });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = GatewayConfig::default();
        config.rate_limit.contact.window_secs = 0;
        config.completion.base_url = "not a url".to_string();
        config.cors.allowed_origins.push("https://neuroleads.fr/contact".to_string());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::Zero {
            field: "rate_limit.contact"
        }));
        assert!(errors.contains(&ValidationError::BadOrigin(
            "https://neuroleads.fr/contact".to_string()
        )));
    }

    #[test]
    fn test_trusted_hops_required_when_forwarding_trusted() {
        let mut config = GatewayConfig::default();
        config.rate_limit.trusted_hops = 0;
        assert!(validate_config(&config).is_ok());

        config.rate_limit.trust_forwarded_for = true;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::Zero {
                field: "rate_limit.trusted_hops"
            }]
        );
    }
}
