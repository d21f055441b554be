//! Chat forwarding to the completion provider.

use secrecy::ExposeSecret;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use super::{classify_send_error, endpoint, ForwardError, InvalidRequest, RequestForwarder};
use crate::observability::metrics;
use crate::protocol::ChatMessage;

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: &'a [ChatMessage],
}

/// Validate a raw `/api/chat` body into an ordered history and a system
/// prompt. An absent system prompt becomes empty.
pub fn parse_chat_body(body: &Value) -> Result<(Vec<ChatMessage>, String), InvalidRequest> {
    let entries = body
        .get("messages")
        .and_then(Value::as_array)
        .filter(|entries| !entries.is_empty())
        .ok_or(InvalidRequest::MissingMessages)?;

    let messages = entries
        .iter()
        .map(|entry| {
            serde_json::from_value::<ChatMessage>(entry.clone())
                .ok()
                .filter(|message| !message.content.trim().is_empty())
                .ok_or(InvalidRequest::MissingMessages)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let system = match body.get("system") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(_) => return Err(InvalidRequest::MalformedBody),
    };

    Ok((messages, system))
}

impl RequestForwarder {
    /// Relay a conversation to the completion provider and return its
    /// payload untouched.
    pub async fn forward_chat(&self, messages: &[ChatMessage], system: &str) -> Result<Value, ForwardError> {
        if messages.is_empty() {
            return Err(InvalidRequest::MissingMessages.into());
        }

        let api_key = self
            .secrets
            .completion_api_key
            .as_ref()
            .ok_or_else(|| ForwardError::Internal("completion API key not configured".to_string()))?;

        let body = CompletionRequest {
            model: &self.completion.model,
            max_tokens: self.completion.max_tokens,
            system,
            messages,
        };

        tracing::debug!(turns = messages.len(), model = %self.completion.model, "Forwarding chat");

        let response = self
            .client
            .post(endpoint(&self.completion.base_url, "/v1/messages"))
            .header("x-api-key", api_key.expose_secret())
            .header("anthropic-version", &self.completion.api_version)
            .json(&body)
            .timeout(Duration::from_secs(self.completion.timeout_secs))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Completion provider request failed");
                classify_send_error(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), body = %detail, "Completion provider error");
            metrics::record_provider_error("completion", status.as_u16());
            return Err(ForwardError::Provider {
                status: status.as_u16(),
            });
        }

        response.json::<Value>().await.map_err(|e| {
            tracing::error!(error = %e, "Completion provider returned an undecodable body");
            ForwardError::InvalidResponse
        })
    }
}
