//! Integration tests for the HTTP chat client against an in-process mock of
//! the chat service.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use agency_site::chat::{ChatApi, ChatError, ChatRequest, HttpChatApi};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde_json::{Value, json};

type Seen = Arc<Mutex<Vec<Value>>>;

/// Serve `app` on an ephemeral port and return its base URL.
async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/api")
}

fn request() -> ChatRequest {
    ChatRequest {
        user_id: "3f1c2d4e-0000-4000-8000-000000000001".into(),
        message: "How much is a website?".into(),
        company_id: "acme".into(),
    }
}

fn client(base: &str) -> HttpChatApi {
    HttpChatApi::new(base, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_send_message_success() {
    let seen: Seen = Arc::default();
    let app = Router::new()
        .route(
            "/api/chat",
            post(|State(seen): State<Seen>, Json(body): Json<Value>| async move {
                seen.lock().unwrap().push(body);
                Json(json!({ "reply": "It depends on **scope**." }))
            }),
        )
        .with_state(Arc::clone(&seen));
    let base = spawn(app).await;

    let reply = client(&base).send_message(&request()).await.unwrap();
    assert_eq!(reply, "It depends on **scope**.");

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0]["user_id"], "3f1c2d4e-0000-4000-8000-000000000001");
    assert_eq!(seen[0]["message"], "How much is a website?");
    assert_eq!(seen[0]["company_id"], "acme");
}

#[tokio::test]
async fn test_non_success_status_is_error() {
    let app = Router::new().route(
        "/api/chat",
        post(|| async { (StatusCode::BAD_GATEWAY, Json(json!({ "reply": "ignored" }))) }),
    );
    let base = spawn(app).await;

    let err = client(&base).send_message(&request()).await.unwrap_err();
    assert!(matches!(err, ChatError::Status { status: 502 }));
}

#[tokio::test]
async fn test_malformed_body_is_error() {
    let app = Router::new().route("/api/chat", post(|| async { Json(json!({ "text": "hi" })) }));
    let base = spawn(app).await;

    let err = client(&base).send_message(&request()).await.unwrap_err();
    assert!(matches!(err, ChatError::Decode(_)), "got {err:?}");
}

#[tokio::test]
async fn test_slow_service_times_out() {
    let app = Router::new().route(
        "/api/chat",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Json(json!({ "reply": "too late" }))
        }),
    );
    let base = spawn(app).await;

    let api = HttpChatApi::new(&base, Duration::from_millis(200)).unwrap();
    let err = api.send_message(&request()).await.unwrap_err();
    assert!(matches!(err, ChatError::Timeout), "got {err:?}");
}

#[tokio::test]
async fn test_unreachable_service_is_transport_error() {
    // Bind then drop to get a port nothing listens on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(&format!("http://{addr}"))
        .send_message(&request())
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::Transport(_)), "got {err:?}");
}

#[tokio::test]
async fn test_company_info() {
    let app = Router::new().route(
        "/api/company-info",
        get(|Query(q): Query<std::collections::HashMap<String, String>>| async move {
            Json(json!({
                "name": format!("Company {}", q.get("client").cloned().unwrap_or_default()),
                "assistant": { "name": "Max", "imageName": "max.png" }
            }))
        }),
    );
    let base = spawn(app).await;

    let info = client(&base).company_info("acme").await.unwrap();
    assert_eq!(info.name, "Company acme");
    assert_eq!(info.assistant.name, "Max");
    assert_eq!(info.assistant.image_name, "max.png");
}
