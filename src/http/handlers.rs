//! API endpoint handlers.

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde_json::Value;

use crate::forward::error::{status_message, NOT_FOUND};
use crate::forward::{chat::parse_chat_body, ApiError, ForwardError, InvalidRequest};
use crate::http::server::AppState;
use crate::protocol::{ContactAck, ContactRequest, ErrorBody, HealthStatus};
use crate::security::EndpointCategory;

/// `POST /api/chat`
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Unreadable chat body");
        ForwardError::from(rejection_reason(&rejection, InvalidRequest::MissingMessages)).at(EndpointCategory::Chat)
    })?;

    let (messages, system) = parse_chat_body(&body)
        .map_err(|e| ForwardError::from(e).at(EndpointCategory::Chat))?;

    state
        .forwarder
        .forward_chat(&messages, &system)
        .await
        .map(Json)
        .map_err(|e| e.at(EndpointCategory::Chat))
}

/// `POST /api/contact`
pub async fn contact(
    State(state): State<AppState>,
    payload: Result<Json<ContactRequest>, JsonRejection>,
) -> Result<Json<ContactAck>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Unreadable contact body");
        ForwardError::from(rejection_reason(&rejection, InvalidRequest::MalformedBody)).at(EndpointCategory::Contact)
    })?;

    state
        .forwarder
        .forward_contact(&request)
        .await
        .map(Json)
        .map_err(|e| e.at(EndpointCategory::Contact))
}

/// A chunked body has no `Content-Length`, so the size limit only trips while
/// the extractor buffers it.
fn rejection_reason(rejection: &JsonRejection, otherwise: InvalidRequest) -> InvalidRequest {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        InvalidRequest::BodyTooLarge
    } else {
        otherwise
    }
}

/// `GET /api/health`
pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

/// Unknown `/api/*` paths never fall through to the front-end.
pub async fn api_not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            error: NOT_FOUND.to_string(),
        }),
    )
}

/// Give error responses under `/api` that did not come from a handler
/// (method router, body limit, timeout) the JSON error envelope.
pub async fn error_envelope(request: Request<Body>, next: Next) -> Response {
    let is_api = request.uri().path().starts_with("/api/");
    let response = next.run(request).await;

    let status = response.status();
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));

    if !is_api || is_json || !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let (mut parts, _) = response.into_parts();
    let body = ErrorBody {
        error: status_message(status).to_string(),
    };
    let encoded = serde_json::to_vec(&body).unwrap_or_default();

    parts
        .headers
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    parts.headers.remove(header::CONTENT_LENGTH);

    Response::from_parts(parts, Body::from(encoded))
}
