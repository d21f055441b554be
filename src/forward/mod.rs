//! Request forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! Admitted request body
//!     → validate shape (chat.rs / contact.rs)
//!     → attach credentials held by this process
//!     → call the provider with its own deadline
//!     → normalize: payload or fixed envelope on success, ForwardError otherwise
//!     → error.rs renders ForwardError as a fixed, non-sensitive response
//! ```
//!
//! # Design Decisions
//! - Raw provider error bodies are logged server-side and never returned
//! - No retries: every provider call is attempted exactly once

pub mod chat;
pub mod contact;
pub mod error;

pub use error::{ApiError, ForwardError, InvalidRequest};

use reqwest::Client;

use crate::config::{CompletionConfig, EmailConfig, GatewayConfig, SecretsConfig};

/// Relays validated requests to the completion and email providers.
pub struct RequestForwarder {
    client: Client,
    completion: CompletionConfig,
    email: EmailConfig,
    secrets: SecretsConfig,
}

impl RequestForwarder {
    pub fn new(client: Client, config: &GatewayConfig) -> Self {
        Self {
            client,
            completion: config.completion.clone(),
            email: config.email.clone(),
            secrets: config.secrets.clone(),
        }
    }

    /// Warn once at startup about credentials that will make requests fail.
    pub fn report_credentials(&self) {
        if self.secrets.completion_api_key.is_some() {
            tracing::info!("Completion provider API key loaded");
        } else {
            tracing::warn!("Completion provider API key MISSING; /api/chat will fail");
        }

        if self.secrets.email_ready() {
            tracing::info!("Email provider credentials loaded");
        } else {
            tracing::warn!("Email provider credentials MISSING; /api/contact will fail");
        }
    }
}

fn classify_send_error(error: reqwest::Error) -> ForwardError {
    if error.is_timeout() {
        ForwardError::Timeout
    } else {
        ForwardError::Unreachable(error.to_string())
    }
}

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}
