//! Cross-origin policy for the mutating API routes.
//!
//! `CorsLayer` answers preflights and decorates allowed responses;
//! `origin_guard` turns away requests that carry a foreign `Origin` before
//! they reach a handler.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::CorsConfig;
use crate::protocol::ErrorBody;

pub const FORBIDDEN_ORIGIN: &str = "Origine non autorisée.";

/// Exact-match origin allow-list.
#[derive(Debug, Clone)]
pub struct OriginAllowList {
    origins: Arc<Vec<HeaderValue>>,
}

impl OriginAllowList {
    pub fn from_config(config: &CorsConfig) -> Self {
        let origins = config
            .allowed_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "Ignoring unusable CORS origin");
                    None
                }
            })
            .collect();

        Self {
            origins: Arc::new(origins),
        }
    }

    pub fn allows(&self, origin: &HeaderValue) -> bool {
        self.origins.iter().any(|allowed| allowed == origin)
    }

    pub fn cors_layer(&self) -> CorsLayer {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(self.origins.iter().cloned()))
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE])
    }
}

/// Reject requests whose `Origin` header is present and not allowed.
/// Requests without an `Origin` (non-browser callers) pass through.
pub async fn origin_guard(
    State(allow_list): State<OriginAllowList>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if let Some(origin) = request.headers().get(header::ORIGIN) {
        if !allow_list.allows(origin) {
            tracing::warn!(origin = ?origin, path = %request.uri().path(), "Rejected cross-origin request");
            return (
                StatusCode::FORBIDDEN,
                Json(ErrorBody {
                    error: FORBIDDEN_ORIGIN.to_string(),
                }),
            )
                .into_response();
        }
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_list_is_exact() {
        let list = OriginAllowList::from_config(&CorsConfig::default());

        assert!(list.allows(&HeaderValue::from_static("https://neuroleads.fr")));
        assert!(list.allows(&HeaderValue::from_static("http://localhost:5173")));
        assert!(!list.allows(&HeaderValue::from_static("https://neuroleads.fr.evil.example")));
        assert!(!list.allows(&HeaderValue::from_static("http://localhost:3000")));
    }
}
