//! Forwarding errors and their browser-facing rendering.
//!
//! `ApiError` is the only place the error taxonomy turns into a status code
//! and text. Every body is one of the fixed strings below; provider detail is
//! logged and dropped here.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::time::Duration;
use thiserror::Error;

use crate::protocol::ErrorBody;
use crate::security::EndpointCategory;

pub const MISSING_MESSAGES: &str = "Messages requis.";
pub const MISSING_FIELDS: &str = "Champs obligatoires manquants.";
pub const CHAT_RATE_LIMITED: &str = "Trop de requêtes. Veuillez patienter.";
pub const CONTACT_RATE_LIMITED: &str = "Trop de soumissions. Veuillez patienter.";
pub const CHAT_PROVIDER_FAILED: &str = "Erreur du service IA.";
pub const CONTACT_PROVIDER_FAILED: &str = "Erreur lors de l'envoi du message.";
pub const INTERNAL_FAULT: &str = "Erreur interne du serveur.";
pub const BODY_TOO_LARGE: &str = "Requête trop volumineuse.";
pub const METHOD_NOT_ALLOWED: &str = "Méthode non autorisée.";
pub const REQUEST_TIMEOUT: &str = "Délai de traitement dépassé.";
pub const NOT_FOUND: &str = "Ressource introuvable.";
pub const BAD_REQUEST: &str = "Requête invalide.";

/// Why a request body was refused before any provider call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidRequest {
    #[error("messages missing or malformed")]
    MissingMessages,

    #[error("missing required field: {0}")]
    MissingRequiredField(&'static str),

    #[error("body is not a JSON object of the expected shape")]
    MalformedBody,

    #[error("body exceeds the size limit")]
    BodyTooLarge,
}

/// Failure of a forwarding operation.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("invalid request: {0}")]
    Validation(InvalidRequest),

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("provider returned status {status}")]
    Provider { status: u16 },

    #[error("provider unreachable: {0}")]
    Unreachable(String),

    #[error("provider did not answer in time")]
    Timeout,

    #[error("provider response could not be decoded")]
    InvalidResponse,

    #[error("internal fault: {0}")]
    Internal(String),
}

impl From<InvalidRequest> for ForwardError {
    fn from(e: InvalidRequest) -> Self {
        ForwardError::Validation(e)
    }
}

impl ForwardError {
    /// Attach the endpoint the error is rendered for.
    pub fn at(self, category: EndpointCategory) -> ApiError {
        ApiError {
            category,
            error: self,
        }
    }
}

/// A forwarding error bound to the endpoint that produced it.
#[derive(Debug)]
pub struct ApiError {
    pub category: EndpointCategory,
    pub error: ForwardError,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        use EndpointCategory::*;

        match (&self.error, self.category) {
            (ForwardError::Validation(InvalidRequest::BodyTooLarge), _) => StatusCode::PAYLOAD_TOO_LARGE,
            (ForwardError::Validation(_), _) => StatusCode::BAD_REQUEST,
            (ForwardError::RateLimited { .. }, _) => StatusCode::TOO_MANY_REQUESTS,
            (ForwardError::Provider { status: 429 }, Chat) => StatusCode::TOO_MANY_REQUESTS,
            (ForwardError::Provider { status }, Chat) => StatusCode::from_u16(*status)
                .ok()
                .filter(StatusCode::is_server_error)
                .unwrap_or(StatusCode::BAD_GATEWAY),
            (ForwardError::Unreachable(_) | ForwardError::InvalidResponse, Chat) => StatusCode::BAD_GATEWAY,
            (ForwardError::Timeout, Chat) => StatusCode::GATEWAY_TIMEOUT,
            (ForwardError::Timeout, Contact) => StatusCode::GATEWAY_TIMEOUT,
            (ForwardError::Provider { .. } | ForwardError::Unreachable(_) | ForwardError::InvalidResponse, Contact) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            (ForwardError::Internal(_), _) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &'static str {
        use EndpointCategory::*;

        match (&self.error, self.category) {
            (ForwardError::Validation(InvalidRequest::BodyTooLarge), _) => BODY_TOO_LARGE,
            (ForwardError::Validation(_), Chat) => MISSING_MESSAGES,
            (ForwardError::Validation(_), Contact) => MISSING_FIELDS,
            (ForwardError::RateLimited { .. }, Chat) => CHAT_RATE_LIMITED,
            (ForwardError::RateLimited { .. }, Contact) => CONTACT_RATE_LIMITED,
            (ForwardError::Provider { status: 429 }, Chat) => CHAT_RATE_LIMITED,
            (ForwardError::Internal(_), _) => INTERNAL_FAULT,
            (_, Chat) => CHAT_PROVIDER_FAILED,
            (_, Contact) => CONTACT_PROVIDER_FAILED,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self.error {
            ForwardError::Internal(detail) => {
                tracing::error!(endpoint = self.category.as_str(), detail = %detail, "Internal fault");
            }
            ForwardError::Validation(reason) => {
                tracing::debug!(endpoint = self.category.as_str(), reason = %reason, "Rejected request body");
            }
            _ => {}
        }

        let mut response = (
            status,
            Json(ErrorBody {
                error: self.message().to_string(),
            }),
        )
            .into_response();

        if let ForwardError::RateLimited { retry_after } = self.error {
            let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            if let Ok(value) = HeaderValue::from_str(&secs.max(1).to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}

/// Fixed text for a bare error status produced outside the handlers
/// (method router, body limit, timeout).
pub fn status_message(status: StatusCode) -> &'static str {
    match status {
        StatusCode::PAYLOAD_TOO_LARGE => BODY_TOO_LARGE,
        StatusCode::METHOD_NOT_ALLOWED => METHOD_NOT_ALLOWED,
        StatusCode::REQUEST_TIMEOUT => REQUEST_TIMEOUT,
        StatusCode::NOT_FOUND => NOT_FOUND,
        s if s.is_server_error() => INTERNAL_FAULT,
        _ => BAD_REQUEST,
    }
}
