//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.
//! Secrets are never read from the file; they are overlaid from the
//! environment by the loader.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration for inbound requests.
    pub timeouts: TimeoutConfig,

    /// Per-endpoint rate limiting policies.
    pub rate_limit: RateLimitConfig,

    /// Cross-origin allow-list.
    pub cors: CorsConfig,

    /// Completion provider (chat) settings.
    pub completion: CompletionConfig,

    /// Transactional email provider settings.
    pub email: EmailConfig,

    /// Provider credentials. Populated from the environment only.
    #[serde(skip)]
    pub secrets: SecretsConfig,

    /// Static front-end hosting.
    pub site: SiteConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Request size limits.
    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3001").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3001".to_string(),
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total time allowed to answer one inbound request, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 45 }
    }
}

/// A fixed-window admission policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct WindowPolicy {
    /// Accepted requests per window.
    pub max_requests: u32,

    /// Window length in seconds.
    pub window_secs: u64,
}

impl WindowPolicy {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Policy for `POST /api/chat`.
    pub chat: WindowPolicy,

    /// Policy for `POST /api/contact`.
    pub contact: WindowPolicy,

    /// How often expired windows are purged, in seconds.
    pub sweep_interval_secs: u64,

    /// Key clients by `X-Forwarded-For` instead of the peer address. Only
    /// enable behind a trusted reverse proxy.
    pub trust_forwarded_for: bool,

    /// Number of trusted proxies in front of the gateway. The client is the
    /// entry this many places from the right of `X-Forwarded-For`; anything
    /// further left was supplied by the client and is ignored.
    pub trusted_hops: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            chat: WindowPolicy {
                max_requests: 10,
                window_secs: 60,
            },
            contact: WindowPolicy {
                max_requests: 5,
                window_secs: 15 * 60,
            },
            sweep_interval_secs: 60,
            trust_forwarded_for: false,
            trusted_hops: 1,
        }
    }
}

/// Cross-origin configuration for the API routes.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Exact origins allowed to call the API from a browser.
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "http://localhost:5173".to_string(),
                "http://localhost:4173".to_string(),
                "https://neuroleads.fr".to_string(),
                "https://www.neuroleads.fr".to_string(),
            ],
        }
    }
}

/// Completion provider settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// Provider base URL (without the `/v1/messages` path).
    pub base_url: String,

    /// Value of the `anthropic-version` header.
    pub api_version: String,

    /// Model identifier.
    pub model: String,

    /// Upper bound on generated output.
    pub max_tokens: u32,

    /// Outbound call deadline in seconds.
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.anthropic.com".to_string(),
            api_version: "2023-06-01".to_string(),
            model: "claude-sonnet-4-5".to_string(),
            max_tokens: 512,
            timeout_secs: 25,
        }
    }
}

/// Transactional email provider settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EmailConfig {
    /// Provider base URL (without the `/api/v1.0/email/send` path).
    pub base_url: String,

    /// `Origin` header presented to the provider.
    pub origin: String,

    /// Outbound call deadline in seconds.
    pub timeout_secs: u64,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.emailjs.com".to_string(),
            origin: "https://neuroleads.fr".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Provider credentials. Never serialized, never logged.
#[derive(Debug, Clone, Default)]
pub struct SecretsConfig {
    pub completion_api_key: Option<SecretString>,
    pub email_service_id: Option<SecretString>,
    pub email_template_id: Option<SecretString>,
    pub email_public_key: Option<SecretString>,
    pub email_private_key: Option<SecretString>,
}

impl SecretsConfig {
    /// Whether every identifier the email provider requires is present.
    pub fn email_ready(&self) -> bool {
        self.email_service_id.is_some()
            && self.email_template_id.is_some()
            && self.email_public_key.is_some()
    }
}

/// Static front-end hosting.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Directory holding the built front-end. Skipped when missing.
    pub static_dir: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            static_dir: "dist".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// "pretty" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum JSON body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 100 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policies() {
        let config = GatewayConfig::default();
        assert_eq!(config.rate_limit.chat.max_requests, 10);
        assert_eq!(config.rate_limit.chat.window(), Duration::from_secs(60));
        assert_eq!(config.rate_limit.contact.max_requests, 5);
        assert_eq!(config.rate_limit.contact.window(), Duration::from_secs(900));
        assert_eq!(config.completion.max_tokens, 512);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "127.0.0.1:4000"

            [rate_limit.chat]
            max_requests = 3
            window_secs = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:4000");
        assert_eq!(config.rate_limit.chat.max_requests, 3);
        assert_eq!(config.rate_limit.contact.max_requests, 5);
        assert_eq!(config.cors.allowed_origins.len(), 4);
        assert!(config.secrets.completion_api_key.is_none());
    }
}
