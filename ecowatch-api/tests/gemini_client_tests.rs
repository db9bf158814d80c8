//! Gemini client wire tests
//!
//! Points the client at a local stub of `streamGenerateContent` and checks
//! the request it sends and how it buffers the streamed reply.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use ecowatch_api::ai::{AiError, GeminiClient, GenerationRequest, GenerativeModel, InlineImage};
use ecowatch_common::config::GeminiConfig;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What the stub saw for the last call
#[derive(Debug, Default, Clone)]
struct Captured {
    model_segment: String,
    api_key: Option<String>,
    body: Value,
}

#[derive(Clone)]
struct StubState {
    captured: Arc<Mutex<Option<Captured>>>,
    status: StatusCode,
    reply: Value,
}

async fn stream_generate(
    State(stub): State<StubState>,
    Path(model_segment): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    *stub.captured.lock().unwrap() = Some(Captured {
        model_segment,
        api_key: headers
            .get("x-goog-api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    });
    (stub.status, Json(stub.reply.clone()))
}

/// Start the stub on an ephemeral port; returns its base URL
async fn start_stub(status: StatusCode, reply: Value) -> (String, Arc<Mutex<Option<Captured>>>) {
    let captured = Arc::new(Mutex::new(None));
    let app = Router::new()
        .route("/v1beta/models/:model_segment", post(stream_generate))
        .with_state(StubState {
            captured: captured.clone(),
            status,
            reply,
        });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), captured)
}

fn client(base_url: &str, api_key: Option<&str>) -> GeminiClient {
    GeminiClient::new(&GeminiConfig {
        api_key: api_key.map(str::to_string),
        model: "gemini-test".to_string(),
        base_url: base_url.to_string(),
        request_timeout: Some(Duration::from_secs(10)),
    })
    .unwrap()
}

fn verification_request() -> GenerationRequest {
    GenerationRequest {
        system_instruction: "Verify the report.".to_string(),
        prompt: r#"{"lat":9.96,"lon":76.24}"#.to_string(),
        image: Some(InlineImage {
            mime_type: "image/jpeg".to_string(),
            data: vec![0xFF, 0xD8, 0xFF],
        }),
    }
}

#[tokio::test]
async fn test_request_wire_format_and_chunk_buffering() {
    // Given: a stub streaming the answer in three chunks
    let reply = json!([
        {"candidates": [{"content": {"role": "model", "parts": [{"text": "```json\n{\"location_"}]}}]},
        {"candidates": [{"content": {"role": "model", "parts": [{"text": "verification\": \"Unclear\"}"}]}}]},
        {"candidates": [{"content": {"role": "model", "parts": [{"text": "\n```"}]}, "finishReason": "STOP"}],
         "usageMetadata": {"totalTokenCount": 42}}
    ]);
    let (base_url, captured) = start_stub(StatusCode::OK, reply).await;

    // When: the client generates
    let text = client(&base_url, Some("test-key"))
        .generate(verification_request())
        .await
        .unwrap();

    // Then: the chunks are joined in order
    assert_eq!(text, "```json\n{\"location_verification\": \"Unclear\"}\n```");

    // And: the request carried the key header, model path and inline image
    let captured = captured.lock().unwrap().clone().unwrap();
    assert_eq!(captured.model_segment, "gemini-test:streamGenerateContent");
    assert_eq!(captured.api_key.as_deref(), Some("test-key"));
    assert_eq!(
        captured.body["systemInstruction"]["parts"][0]["text"],
        "Verify the report."
    );
    let parts = &captured.body["contents"][0]["parts"];
    assert_eq!(parts[0]["text"], r#"{"lat":9.96,"lon":76.24}"#);
    assert_eq!(parts[1]["inlineData"]["mimeType"], "image/jpeg");
    assert_eq!(parts[1]["inlineData"]["data"], "/9j/");
}

#[tokio::test]
async fn test_text_only_request_has_no_inline_data() {
    let reply = json!([{"candidates": [{"content": {"parts": [{"text": "{}"}]}}]}]);
    let (base_url, captured) = start_stub(StatusCode::OK, reply).await;

    let request = GenerationRequest {
        image: None,
        ..verification_request()
    };
    client(&base_url, Some("k")).generate(request).await.unwrap();

    let captured = captured.lock().unwrap().clone().unwrap();
    let parts = captured.body["contents"][0]["parts"].as_array().unwrap().clone();
    assert_eq!(parts.len(), 1);
}

#[tokio::test]
async fn test_non_success_status_is_api_error() {
    let reply = json!({"error": {"code": 400, "message": "API key not valid"}});
    let (base_url, _captured) = start_stub(StatusCode::BAD_REQUEST, reply).await;

    let result = client(&base_url, Some("bad-key"))
        .generate(verification_request())
        .await;

    match result {
        Err(AiError::ApiError(status, body)) => {
            assert_eq!(status, 400);
            assert!(body.contains("API key not valid"));
        }
        other => panic!("expected ApiError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_blocked_prompt_is_reported() {
    let reply = json!([{"promptFeedback": {"blockReason": "SAFETY"}}]);
    let (base_url, _captured) = start_stub(StatusCode::OK, reply).await;

    let result = client(&base_url, Some("k")).generate(verification_request()).await;

    assert!(matches!(result, Err(AiError::Blocked(reason)) if reason == "SAFETY"));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_network_error() {
    // Bind then drop to get a port with nothing listening
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = client(&format!("http://{}", addr), Some("k"))
        .generate(verification_request())
        .await;

    assert!(matches!(result, Err(AiError::NetworkError(_))));
}
