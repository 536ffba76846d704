//! API integration tests.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use grchub_protocol::{Category, ChatMessage, ChatRequest, MessageRole, StreamEvent};
use serde_json::Value;
use tower::ServiceExt;

mod common;
use common::{MockBackend, sse_data_frames, test_app};

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method(Method::GET)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method(Method::POST)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

fn chat_request(text: &str, category: Option<Category>) -> String {
    let request = ChatRequest {
        messages: vec![ChatMessage::text(MessageRole::User, text)],
        category,
    };
    serde_json::to_string(&request).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Test that the health endpoint works.
#[tokio::test]
async fn test_health_endpoint() {
    let app = test_app(Arc::new(MockBackend::streaming(&[])));

    let response = app.oneshot(get("/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

/// Listing without a filter returns the whole store in native order.
#[tokio::test]
async fn test_list_knowledge_all() {
    let app = test_app(Arc::new(MockBackend::streaming(&[])));

    let response = app.oneshot(get("/api/knowledge")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let entries: Vec<Value> = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(entries.len(), 20);
    assert_eq!(entries[0]["id"], "RSK-001");
    assert_eq!(entries[19]["id"], "REC-005");
}

/// Category filter returns only matching entries.
#[tokio::test]
async fn test_list_knowledge_filtered() {
    let app = test_app(Arc::new(MockBackend::streaming(&[])));

    let response = app
        .oneshot(get("/api/knowledge?category=regulatory"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let entries: Vec<Value> = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(entries.len(), 5);
    assert!(entries.iter().all(|e| e["category"] == "regulatory"));
}

/// Unknown category values are rejected with a structured 400.
#[tokio::test]
async fn test_list_knowledge_unknown_category() {
    let app = test_app(Arc::new(MockBackend::streaming(&[])));

    let response = app
        .oneshot(get("/api/knowledge?category=finance"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json["code"], "BAD_REQUEST");
}

/// Search matches across fields, case-insensitively.
#[tokio::test]
async fn test_search_knowledge() {
    let app = test_app(Arc::new(MockBackend::streaming(&[])));

    let response = app
        .oneshot(get("/api/knowledge/search?q=GDPR"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let entries: Vec<Value> = serde_json::from_str(&body_string(response).await).unwrap();
    assert!(entries.iter().any(|e| e["id"] == "CMP-001"));
}

/// Stats reflect the default feed.
#[tokio::test]
async fn test_knowledge_stats() {
    let app = test_app(Arc::new(MockBackend::streaming(&[])));

    let response = app.oneshot(get("/api/knowledge/stats")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json["total"], 20);
    assert_eq!(json["risks"], 5);
    assert_eq!(json["critical"], 3);
}

/// Entry lookup by id, and 404 for unknown ids.
#[tokio::test]
async fn test_get_knowledge_entry() {
    let app = test_app(Arc::new(MockBackend::streaming(&[])));

    let response = app
        .clone()
        .oneshot(get("/api/knowledge/RSK-001"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json["title"], "Third-Party Vendor Data Breach");

    let response = app
        .oneshot(get("/api/knowledge/RSK-999"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// Happy path: deltas are relayed in order, framed by start/finish/[DONE].
#[tokio::test]
async fn test_chat_streams_deltas_in_order() {
    let app = test_app(Arc::new(MockBackend::streaming(&[
        "Based on ",
        "RSK-001, ",
        "encrypt vendor exchanges.",
    ])));

    let response = app
        .oneshot(post_json(
            "/api/chat",
            chat_request("What are the top risks?", Some(Category::Risks)),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/event-stream"))
    );

    let body = body_string(response).await;
    let frames = sse_data_frames(&body);
    assert_eq!(frames.last().map(String::as_str), Some("[DONE]"));

    let events: Vec<StreamEvent> = frames[..frames.len() - 1]
        .iter()
        .map(|frame| serde_json::from_str(frame).unwrap())
        .collect();

    assert_eq!(events[0], StreamEvent::Start);
    assert_eq!(events[1], StreamEvent::text_delta("Based on "));
    assert_eq!(events[2], StreamEvent::text_delta("RSK-001, "));
    assert_eq!(events[3], StreamEvent::text_delta("encrypt vendor exchanges."));
    assert_eq!(events[4], StreamEvent::Finish);
}

/// An empty conversation is rejected before the model is called.
#[tokio::test]
async fn test_chat_rejects_empty_conversation() {
    let backend = MockBackend::streaming(&["unused"]);
    let calls = backend.call_counter();
    let app = test_app(Arc::new(backend));

    let response = app
        .oneshot(post_json(
            "/api/chat",
            r#"{"messages": []}"#.to_string(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

/// Unknown category values fail request decoding before the model is called.
#[tokio::test]
async fn test_chat_rejects_unknown_category() {
    let backend = MockBackend::streaming(&["unused"]);
    let calls = backend.call_counter();
    let app = test_app(Arc::new(backend));

    let body = r#"{"messages": [{"id": "1", "role": "user", "parts": [{"type": "text", "text": "hi"}]}], "category": "finance"}"#;
    let response = app
        .oneshot(post_json("/api/chat", body.to_string()))
        .await
        .unwrap();
    assert!(response.status().is_client_error());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

/// Malformed JSON fails before the model is called.
#[tokio::test]
async fn test_chat_rejects_malformed_body() {
    let backend = MockBackend::streaming(&["unused"]);
    let calls = backend.call_counter();
    let app = test_app(Arc::new(backend));

    let response = app
        .oneshot(post_json("/api/chat", "{not json".to_string()))
        .await
        .unwrap();
    assert!(response.status().is_client_error());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

/// Upstream failure surfaces as an error frame and leaves the server healthy.
#[tokio::test]
async fn test_chat_upstream_failure_is_request_scoped() {
    let app = test_app(Arc::new(MockBackend::failing("provider exploded")));

    let response = app
        .clone()
        .oneshot(post_json("/api/chat", chat_request("hello", None)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_string(response).await;
    let frames = sse_data_frames(&body);
    assert!(frames.iter().any(|frame| {
        serde_json::from_str::<StreamEvent>(frame)
            .is_ok_and(|event| matches!(event, StreamEvent::Error { .. }))
    }));
    assert_eq!(frames.last().map(String::as_str), Some("[DONE]"));

    // The failure was request-scoped; the server keeps answering.
    let response = app.oneshot(get("/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

/// A failure mid-stream keeps the already-delivered deltas and ends with an
/// error frame, not a fake completion.
#[tokio::test]
async fn test_chat_mid_stream_failure_keeps_partial_output() {
    let app = test_app(Arc::new(MockBackend::failing_mid_stream(
        &["partial "],
        "connection lost",
    )));

    let response = app
        .oneshot(post_json("/api/chat", chat_request("hello", None)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_string(response).await;
    let frames = sse_data_frames(&body);
    let events: Vec<StreamEvent> = frames[..frames.len() - 1]
        .iter()
        .map(|frame| serde_json::from_str(frame).unwrap())
        .collect();

    assert_eq!(events[0], StreamEvent::Start);
    assert_eq!(events[1], StreamEvent::text_delta("partial "));
    assert!(matches!(events[2], StreamEvent::Error { .. }));
    assert!(!events.contains(&StreamEvent::Finish));
}
