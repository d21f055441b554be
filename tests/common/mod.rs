//! Shared utilities for integration testing: mock providers and a gateway
//! bound to an ephemeral port.

#![allow(dead_code)]

use axum::{body::Bytes, http::HeaderMap, http::StatusCode, Router};
use secrecy::SecretString;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

use lead_gateway::config::GatewayConfig;
use lead_gateway::http::HttpServer;
use lead_gateway::lifecycle::Shutdown;

pub const TEST_API_KEY: &str = "sk-test-key";
pub const SITE_ORIGIN: &str = "https://neuroleads.fr";

/// One request as seen by a mock provider.
#[derive(Debug, Clone)]
pub struct Captured {
    pub path: String,
    pub headers: HeaderMap,
    pub body: serde_json::Value,
}

impl Captured {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// A running mock provider.
pub struct MockProvider {
    pub addr: SocketAddr,
    pub captured: Arc<Mutex<Vec<Captured>>>,
}

impl MockProvider {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn calls(&self) -> usize {
        self.captured.lock().unwrap().len()
    }

    pub fn last(&self) -> Captured {
        self.captured.lock().unwrap().last().cloned().expect("no provider call captured")
    }
}

/// Start a programmable mock provider on an ephemeral port. Every request,
/// whatever its path, is captured and answered with `f()`.
pub async fn start_programmable_backend<F, Fut>(f: F) -> MockProvider
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let captured = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::new(f);

    let sink = captured.clone();
    let app = Router::new().fallback(move |uri: axum::http::Uri, headers: HeaderMap, body: Bytes| {
        let sink = sink.clone();
        let f = f.clone();
        async move {
            sink.lock().unwrap().push(Captured {
                path: uri.path().to_string(),
                headers,
                body: serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null),
            });
            let (status, body) = f().await;
            (StatusCode::from_u16(status).unwrap(), body)
        }
    });

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockProvider { addr, captured }
}

/// Start a mock provider that always answers `status` with `body`.
pub async fn start_mock_backend(status: u16, body: &'static str) -> MockProvider {
    start_programmable_backend(move || async move { (status, body.to_string()) }).await
}

/// A completion payload with one text block.
pub fn completion_payload(text: &str) -> String {
    serde_json::json!({
        "id": "msg_test",
        "type": "message",
        "role": "assistant",
        "content": [{"type": "text", "text": text}],
    })
    .to_string()
}

/// Gateway config pointing both providers at `mock`, with credentials set.
pub fn gateway_config(mock: &MockProvider) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.completion.base_url = mock.base_url();
    config.email.base_url = mock.base_url();
    config.site.static_dir = "does-not-exist".to_string();

    let secrets = &mut config.secrets;
    secrets.completion_api_key = Some(SecretString::from(TEST_API_KEY));
    secrets.email_service_id = Some(SecretString::from("service_test"));
    secrets.email_template_id = Some(SecretString::from("template_test"));
    secrets.email_public_key = Some(SecretString::from("public_test"));
    secrets.email_private_key = Some(SecretString::from("private_test"));
    config
}

/// A running gateway. Dropping it leaves the server task running until
/// the test runtime ends; call `stop` for an orderly shutdown.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn stop(&self) {
        self.shutdown.trigger();
    }
}

pub async fn start_gateway(config: GatewayConfig) -> TestGateway {
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config);
    let server_shutdown = shutdown.clone();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestGateway { addr, shutdown }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
