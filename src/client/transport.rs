//! Transport seam between the client controllers and the gateway.

use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::future::Future;
use thiserror::Error;

use crate::protocol::{ChatRequest, ContactAck, ContactRequest, ErrorBody, HealthStatus};

/// Failure of one call to the gateway, as seen by a controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("rate limited by the gateway")]
    RateLimited,

    #[error("gateway answered {status}")]
    Status { status: u16, message: Option<String> },

    #[error("network error: {0}")]
    Network(String),

    #[error("response could not be decoded")]
    Decode,
}

/// The two mutating gateway calls. Implemented over HTTP by [`HttpGateway`]
/// and by in-memory fakes in tests.
pub trait GatewayTransport: Send + Sync {
    fn send_chat(&self, request: ChatRequest) -> impl Future<Output = Result<Value, TransportError>> + Send;

    fn send_contact(&self, request: ContactRequest) -> impl Future<Output = Result<ContactAck, TransportError>> + Send;
}

/// `reqwest`-backed client for a running gateway.
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<HealthStatus, TransportError> {
        let response = self
            .client
            .get(format!("{}/api/health", self.base_url))
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        decode(response).await
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, TransportError>
    where
        B: serde::Serialize + ?Sized,
        R: serde::de::DeserializeOwned,
    {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        decode(response).await
    }
}

async fn decode<R: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<R, TransportError> {
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(TransportError::RateLimited);
    }

    if !status.is_success() {
        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .map(|body| body.error)
            .filter(|e| !e.trim().is_empty());
        return Err(TransportError::Status {
            status: status.as_u16(),
            message,
        });
    }

    response.json::<R>().await.map_err(|_| TransportError::Decode)
}

impl GatewayTransport for HttpGateway {
    fn send_chat(&self, request: ChatRequest) -> impl Future<Output = Result<Value, TransportError>> + Send {
        async move { self.post("/api/chat", &request).await }
    }

    fn send_contact(&self, request: ContactRequest) -> impl Future<Output = Result<ContactAck, TransportError>> + Send {
        async move { self.post("/api/contact", &request).await }
    }
}
