//! End-to-end tests of the gateway endpoints against mock providers.

use serde_json::{json, Value};
use std::time::Duration;

use lead_gateway::forward::error::{
    BODY_TOO_LARGE, CHAT_PROVIDER_FAILED, CHAT_RATE_LIMITED, CONTACT_PROVIDER_FAILED, CONTACT_RATE_LIMITED,
    METHOD_NOT_ALLOWED, MISSING_FIELDS, MISSING_MESSAGES, REQUEST_TIMEOUT,
};
use lead_gateway::security::cors::FORBIDDEN_ORIGIN;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

mod common;

fn chat_body(text: &str) -> Value {
    json!({
        "messages": [{"role": "user", "content": text}],
        "system": "Tu es un assistant.",
    })
}

fn contact_body() -> Value {
    json!({
        "name": "Jean Dupont",
        "email": "jean@entreprise.fr",
        "service": "Voice Agents IA",
    })
}

#[tokio::test]
async fn test_chat_relays_payload_and_injects_credentials() {
    let provider = common::start_programmable_backend(|| async { (200, common::completion_payload("Bonjour !")) }).await;
    let gateway = common::start_gateway(common::gateway_config(&provider)).await;

    let res = common::client()
        .post(gateway.url("/api/chat"))
        .header("origin", common::SITE_ORIGIN)
        .json(&chat_body("Bonjour"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(
        res.headers().get("access-control-allow-origin").unwrap(),
        common::SITE_ORIGIN
    );
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["content"][0]["text"], "Bonjour !");
    assert_eq!(body["id"], "msg_test");

    let call = provider.last();
    assert_eq!(call.path, "/v1/messages");
    assert_eq!(call.header("x-api-key"), Some(common::TEST_API_KEY));
    assert_eq!(call.header("anthropic-version"), Some("2023-06-01"));
    assert_eq!(call.body["model"], "claude-sonnet-4-5");
    assert_eq!(call.body["max_tokens"], 512);
    assert_eq!(call.body["system"], "Tu es un assistant.");
    assert_eq!(call.body["messages"][0]["content"], "Bonjour");

    gateway.stop();
}

#[tokio::test]
async fn test_eleventh_chat_request_is_rate_limited() {
    let provider = common::start_programmable_backend(|| async { (200, common::completion_payload("ok")) }).await;
    let gateway = common::start_gateway(common::gateway_config(&provider)).await;
    let client = common::client();

    for i in 1..=10 {
        let res = client
            .post(gateway.url("/api/chat"))
            .json(&chat_body("Bonjour"))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200, "request {} should be admitted", i);
    }

    let res = client
        .post(gateway.url("/api/chat"))
        .json(&chat_body("Bonjour"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 429);
    let retry_after: u64 = res.headers()["retry-after"].to_str().unwrap().parse().unwrap();
    assert!((1..=60).contains(&retry_after));
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], CHAT_RATE_LIMITED);
    assert_eq!(provider.calls(), 10, "rejected request must not reach the provider");

    // The contact category has its own window.
    let res = client
        .post(gateway.url("/api/contact"))
        .json(&contact_body())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    gateway.stop();
}

#[tokio::test]
async fn test_sixth_contact_submission_is_rate_limited() {
    let provider = common::start_mock_backend(200, "OK").await;
    let gateway = common::start_gateway(common::gateway_config(&provider)).await;
    let client = common::client();

    for _ in 0..5 {
        let res = client.post(gateway.url("/api/contact")).json(&contact_body()).send().await.unwrap();
        assert_eq!(res.status(), 200);
    }

    let res = client.post(gateway.url("/api/contact")).json(&contact_body()).send().await.unwrap();
    assert_eq!(res.status(), 429);
    assert!(res.headers().contains_key("retry-after"));
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], CONTACT_RATE_LIMITED);

    gateway.stop();
}

#[tokio::test]
async fn test_chat_rejects_missing_messages() {
    let provider = common::start_mock_backend(200, "{}").await;
    let gateway = common::start_gateway(common::gateway_config(&provider)).await;
    let client = common::client();

    for body in [json!({}), json!({"messages": []}), json!({"messages": "Bonjour"})] {
        let res = client.post(gateway.url("/api/chat")).json(&body).send().await.unwrap();
        assert_eq!(res.status(), 400);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"], MISSING_MESSAGES);
    }

    let res = client
        .post(gateway.url("/api/chat"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);

    assert_eq!(provider.calls(), 0);
    gateway.stop();
}

#[tokio::test]
async fn test_provider_error_detail_is_hidden() {
    let provider = common::start_mock_backend(500, r#"{"error":{"message":"internal secret detail"}}"#).await;
    let gateway = common::start_gateway(common::gateway_config(&provider)).await;

    let res = common::client()
        .post(gateway.url("/api/chat"))
        .json(&chat_body("Bonjour"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 500);
    let text = res.text().await.unwrap();
    assert!(!text.contains("secret"));
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body, json!({"error": CHAT_PROVIDER_FAILED}));

    gateway.stop();
}

#[tokio::test]
async fn test_provider_rejection_of_credentials_maps_to_bad_gateway() {
    let provider = common::start_mock_backend(401, r#"{"error":"invalid x-api-key"}"#).await;
    let gateway = common::start_gateway(common::gateway_config(&provider)).await;

    let res = common::client()
        .post(gateway.url("/api/chat"))
        .json(&chat_body("Bonjour"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 502);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], CHAT_PROVIDER_FAILED);

    gateway.stop();
}

#[tokio::test]
async fn test_slow_provider_times_out() {
    let provider = common::start_programmable_backend(|| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        (200, common::completion_payload("trop tard"))
    })
    .await;
    let mut config = common::gateway_config(&provider);
    config.completion.timeout_secs = 1;
    let gateway = common::start_gateway(config).await;

    let res = common::client()
        .post(gateway.url("/api/chat"))
        .json(&chat_body("Bonjour"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 504);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], CHAT_PROVIDER_FAILED);

    gateway.stop();
}

#[tokio::test]
async fn test_missing_api_key_is_internal_error() {
    let provider = common::start_mock_backend(200, "{}").await;
    let mut config = common::gateway_config(&provider);
    config.secrets.completion_api_key = None;
    let gateway = common::start_gateway(config).await;

    let res = common::client()
        .post(gateway.url("/api/chat"))
        .json(&chat_body("Bonjour"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 500);
    assert_eq!(provider.calls(), 0);
    gateway.stop();
}

#[tokio::test]
async fn test_contact_fills_placeholders_and_credentials() {
    let provider = common::start_mock_backend(200, "OK").await;
    let gateway = common::start_gateway(common::gateway_config(&provider)).await;

    let res = common::client()
        .post(gateway.url("/api/contact"))
        .header("origin", common::SITE_ORIGIN)
        .json(&contact_body())
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"success": true, "message": "Message envoyé avec succès."}));

    let call = provider.last();
    assert_eq!(call.path, "/api/v1.0/email/send");
    assert_eq!(call.header("origin"), Some("https://neuroleads.fr"));
    assert_eq!(call.body["service_id"], "service_test");
    assert_eq!(call.body["template_id"], "template_test");
    assert_eq!(call.body["user_id"], "public_test");
    assert_eq!(call.body["accessToken"], "private_test");

    let params = &call.body["template_params"];
    assert_eq!(params["name"], "Jean Dupont");
    assert_eq!(params["company"], "Non renseigné");
    assert_eq!(params["budget"], "Non renseigné");
    assert_eq!(params["message"], "Aucun message");

    gateway.stop();
}

#[tokio::test]
async fn test_contact_requires_fields() {
    let provider = common::start_mock_backend(200, "OK").await;
    let gateway = common::start_gateway(common::gateway_config(&provider)).await;

    let res = common::client()
        .post(gateway.url("/api/contact"))
        .json(&json!({"name": "Jean Dupont", "email": "jean@entreprise.fr"}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], MISSING_FIELDS);
    assert_eq!(provider.calls(), 0);

    gateway.stop();
}

#[tokio::test]
async fn test_contact_provider_failure_is_generic() {
    let provider = common::start_mock_backend(400, "The Public Key is invalid").await;
    let gateway = common::start_gateway(common::gateway_config(&provider)).await;

    let res = common::client()
        .post(gateway.url("/api/contact"))
        .json(&contact_body())
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 500);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"error": CONTACT_PROVIDER_FAILED}));

    gateway.stop();
}

#[tokio::test]
async fn test_foreign_origin_is_forbidden() {
    let provider = common::start_mock_backend(200, "OK").await;
    let gateway = common::start_gateway(common::gateway_config(&provider)).await;

    let res = common::client()
        .post(gateway.url("/api/contact"))
        .header("origin", "https://attacker.example")
        .json(&contact_body())
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 403);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], FORBIDDEN_ORIGIN);
    assert_eq!(provider.calls(), 0);

    gateway.stop();
}

#[tokio::test]
async fn test_preflight_from_allowed_origin() {
    let provider = common::start_mock_backend(200, "OK").await;
    let gateway = common::start_gateway(common::gateway_config(&provider)).await;

    let res = common::client()
        .request(reqwest::Method::OPTIONS, gateway.url("/api/chat"))
        .header("origin", "http://localhost:5173")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type")
        .send()
        .await
        .unwrap();

    assert!(res.status().is_success());
    assert_eq!(
        res.headers().get("access-control-allow-origin").unwrap(),
        "http://localhost:5173"
    );

    gateway.stop();
}

#[tokio::test]
async fn test_health_and_unknown_api_path() {
    let provider = common::start_mock_backend(200, "OK").await;
    let gateway = common::start_gateway(common::gateway_config(&provider)).await;
    let client = common::client();

    let res = client.get(gateway.url("/api/health")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    let timestamp = body["timestamp"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());

    let res = client.get(gateway.url("/api/does-not-exist")).send().await.unwrap();
    assert_eq!(res.status(), 404);

    gateway.stop();
}

#[tokio::test]
async fn test_oversized_body_gets_json_envelope() {
    let provider = common::start_mock_backend(200, "OK").await;
    let gateway = common::start_gateway(common::gateway_config(&provider)).await;

    let mut body = contact_body();
    body["message"] = Value::String("x".repeat(200 * 1024));

    let res = common::client()
        .post(gateway.url("/api/contact"))
        .json(&body)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 413);
    assert!(res.headers()["content-type"].to_str().unwrap().starts_with("application/json"));
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"error": BODY_TOO_LARGE}));
    assert_eq!(provider.calls(), 0);

    gateway.stop();
}

#[tokio::test]
async fn test_oversized_chunked_body_is_413_not_400() {
    let provider = common::start_mock_backend(200, "{}").await;
    let gateway = common::start_gateway(common::gateway_config(&provider)).await;

    // A chunked body carries no Content-Length; the limit trips while buffering.
    let payload = chat_body(&"x".repeat(200 * 1024)).to_string();
    let mut request = format!(
        "POST /api/chat HTTP/1.1\r\nHost: {}\r\nContent-Type: application/json\r\n\
         Transfer-Encoding: chunked\r\nConnection: close\r\n\r\n",
        gateway.addr
    );
    for chunk in payload.as_bytes().chunks(16 * 1024) {
        request.push_str(&format!("{:x}\r\n{}\r\n", chunk.len(), std::str::from_utf8(chunk).unwrap()));
    }
    request.push_str("0\r\n\r\n");

    let socket = tokio::net::TcpStream::connect(gateway.addr).await.unwrap();
    let (mut reader, mut writer) = socket.into_split();

    // The gateway may answer before the upload finishes; read concurrently.
    tokio::spawn(async move {
        let _ = writer.write_all(request.as_bytes()).await;
    });

    let mut raw = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => raw.extend_from_slice(&buf[..n]),
        }
        if String::from_utf8_lossy(&raw).contains(BODY_TOO_LARGE) {
            break;
        }
    }
    let raw = String::from_utf8_lossy(&raw);

    assert!(raw.starts_with("HTTP/1.1 413"), "unexpected response: {}", raw);
    assert!(raw.contains(BODY_TOO_LARGE));
    assert_eq!(provider.calls(), 0);

    gateway.stop();
}

#[tokio::test]
async fn test_wrong_method_gets_json_envelope() {
    let provider = common::start_mock_backend(200, "OK").await;
    let gateway = common::start_gateway(common::gateway_config(&provider)).await;

    let res = common::client().get(gateway.url("/api/chat")).send().await.unwrap();

    assert_eq!(res.status(), 405);
    assert!(res.headers().contains_key("allow"));
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"error": METHOD_NOT_ALLOWED}));

    gateway.stop();
}

#[tokio::test]
async fn test_slow_request_times_out_with_envelope() {
    let provider = common::start_programmable_backend(|| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        (200, common::completion_payload("trop tard"))
    })
    .await;
    let mut config = common::gateway_config(&provider);
    config.timeouts.request_secs = 1;
    let gateway = common::start_gateway(config).await;

    let res = common::client()
        .post(gateway.url("/api/chat"))
        .json(&chat_body("Bonjour"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 408);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"error": REQUEST_TIMEOUT}));

    gateway.stop();
}

#[tokio::test]
async fn test_rotating_forwarded_for_prefix_does_not_bypass_limit() {
    let provider = common::start_programmable_backend(|| async { (200, common::completion_payload("ok")) }).await;
    let mut config = common::gateway_config(&provider);
    config.rate_limit.trust_forwarded_for = true;
    let gateway = common::start_gateway(config).await;
    let client = common::client();

    let mut accepted = 0;
    for i in 0..25 {
        let res = client
            .post(gateway.url("/api/chat"))
            .header("x-forwarded-for", format!("10.9.9.{}, 203.0.113.7", i))
            .json(&chat_body("Bonjour"))
            .send()
            .await
            .unwrap();
        if res.status() == 200 {
            accepted += 1;
        }
    }

    assert_eq!(accepted, 10);
    assert_eq!(provider.calls(), 10);

    gateway.stop();
}
