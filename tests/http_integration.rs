//! HTTP surface tests: pages, quiz API and forms, chat widget API.

use std::sync::Arc;
use std::time::Duration;

use agency_site::AppState;
use agency_site::chat::{ChatApi, ChatError, ChatRequest, CompanyInfo};
use agency_site::config::AppConfig;
use agency_site::quiz::QuestionBank;
use agency_site::server::build_router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum_test::TestServer;
use futures::StreamExt;
use serde_json::{Value, json};
use tokio::sync::Notify;
use tower::ServiceExt;

// =============================================================================
// Test Utilities
// =============================================================================

/// Chat service stand-in. Replies with `reply`, or fails with the given
/// status; waits for `gate` first when set.
struct StubApi {
    reply: Result<String, u16>,
    gate: Option<Arc<Notify>>,
}

#[async_trait::async_trait]
impl ChatApi for StubApi {
    async fn send_message(&self, _request: &ChatRequest) -> Result<String, ChatError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.reply
            .clone()
            .map_err(|status| ChatError::Status { status })
    }

    async fn company_info(&self, company_id: &str) -> Result<CompanyInfo, ChatError> {
        if company_id == "acme" {
            Ok(CompanyInfo {
                name: "Acme Plumbing".into(),
                ..CompanyInfo::default()
            })
        } else {
            Err(ChatError::Status { status: 404 })
        }
    }
}

fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.chat.typewriter_interval_ms = 1;
    config.resilience.rate_limit_enabled = false;
    config
}

fn state_with(api: StubApi) -> AppState {
    AppState::new(Arc::new(config()), Arc::new(api), QuestionBank::builtin())
}

fn server_with(api: StubApi) -> TestServer {
    TestServer::new(build_router(state_with(api))).unwrap()
}

fn replying(reply: &str) -> StubApi {
    StubApi {
        reply: Ok(reply.to_string()),
        gate: None,
    }
}

/// Poll the session until no exchange is running.
async fn wait_idle(server: &TestServer, id: &str) -> Value {
    for _ in 0..200 {
        let snapshot: Value = server.get(&format!("/api/chat/sessions/{id}")).await.json();
        if snapshot["is_loading"] == false && snapshot["is_ai_typing"] == false {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("chat session never became idle");
}

async fn open_session(server: &TestServer) -> String {
    let res = server.post("/api/chat/sessions").await;
    res.assert_status(StatusCode::CREATED);
    res.json::<Value>()["session_id"].as_str().unwrap().to_string()
}

// =============================================================================
// Pages
// =============================================================================

#[tokio::test]
async fn test_pages_render() {
    let server = server_with(replying("hi"));
    for path in ["/", "/services", "/services/seo", "/about", "/blog"] {
        let res = server.get(path).await;
        res.assert_status_ok();
        assert!(res.text().contains(r#"id="chat-widget""#), "{path} lacks the widget");
    }
}

#[tokio::test]
async fn test_unknown_pages_are_404() {
    let server = server_with(replying("hi"));
    server.get("/services/nope").await.assert_status(StatusCode::NOT_FOUND);
    server.get("/blog/nope").await.assert_status(StatusCode::NOT_FOUND);
    server.get("/no/such/page").await.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_client_carried_to_widget_and_links() {
    let server = server_with(replying("hi"));
    let html = server.get("/about").add_query_param("client", "acme").await.text();
    assert!(html.contains(r#"data-client="acme""#));
    assert!(html.contains("/quiz?client=acme"));
}

#[tokio::test]
async fn test_healthz() {
    let server = server_with(replying("hi"));
    assert_eq!(server.get("/healthz").await.text(), "ok");
}

#[tokio::test]
async fn test_default_avatar_is_served() {
    let server = server_with(replying("hi"));
    let session: Value = server.post("/api/chat/sessions").await.json();
    let image = session["company"]["assistant"]["imageName"]
        .as_str()
        .expect("assistant image name");
    assert_eq!(image, CompanyInfo::default().assistant.image_name);

    let res = server.get(&format!("/static/avatars/{image}")).await;
    res.assert_status_ok();
    assert_eq!(res.header("content-type"), "image/png");
    assert!(res.as_bytes().starts_with(b"\x89PNG"));
}

// =============================================================================
// Quiz
// =============================================================================

#[tokio::test]
async fn test_quiz_api_scenario() {
    let server = server_with(replying("hi"));
    let res = server.post("/api/quiz").await;
    res.assert_status(StatusCode::CREATED);
    let quiz: Value = res.json();
    assert_eq!(quiz["step"], 0);
    assert_eq!(quiz["step_kind"], "intro");
    assert_eq!(quiz["total_questions"], 5);
    let id = quiz["id"].as_str().unwrap().to_string();
    let actions = format!("/api/quiz/{id}/actions");

    let quiz: Value = server
        .post(&actions)
        .json(&json!({ "action": "start", "url": "" }))
        .await
        .json();
    assert_eq!(quiz["step"], 1);
    assert_eq!(quiz["url"], Value::Null);

    // Unanswered questions block "next"
    server
        .post(&actions)
        .json(&json!({ "action": "next" }))
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let mut chosen = Vec::new();
    for step in 1..=5 {
        let quiz: Value = server.get(&format!("/api/quiz/{id}")).await.json();
        assert_eq!(quiz["step"], step);
        let option = quiz["question"]["options"][0].as_str().unwrap().to_string();
        server
            .post(&actions)
            .json(&json!({ "action": "select", "option": option }))
            .await
            .assert_status_ok();
        chosen.push(option);
        let quiz: Value = server.post(&actions).json(&json!({ "action": "next" })).await.json();
        assert_eq!(quiz["step"], step + 1);
    }

    let quiz: Value = server.get(&format!("/api/quiz/{id}")).await.json();
    assert_eq!(quiz["step"], 6);
    assert_eq!(quiz["step_kind"], "contact");
    assert_eq!(quiz["progress"], 100.0);
    assert_eq!(quiz["answers"], json!(chosen));

    let res = server
        .post(&actions)
        .json(&json!({ "action": "submit", "name": "", "email": "nope" }))
        .await;
    res.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = res.json();
    assert_eq!(body["fields"][0]["field"], "name");
    assert_eq!(body["fields"][1]["field"], "email");

    let quiz: Value = server
        .post(&actions)
        .json(&json!({ "action": "submit", "name": "Dana", "email": "dana@example.com" }))
        .await
        .json();
    assert_eq!(quiz["submitted"], true);

    server
        .post(&actions)
        .json(&json!({ "action": "back" }))
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_quiz_api_errors() {
    let server = server_with(replying("hi"));
    server.get("/api/quiz/missing").await.assert_status(StatusCode::NOT_FOUND);

    let id = server.post("/api/quiz").await.json::<Value>()["id"]
        .as_str()
        .unwrap()
        .to_string();
    let res = server
        .post(&format!("/api/quiz/{id}/actions"))
        .json(&json!({ "action": "teleport" }))
        .await;
    res.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert!(res.json::<Value>()["error"].as_str().unwrap().contains("teleport"));
}

#[tokio::test]
async fn test_quiz_form_flow() {
    let server = server_with(replying("hi"));

    let res = server.get("/quiz").add_query_param("client", "acme").await;
    res.assert_status(StatusCode::SEE_OTHER);
    let location = res.header(header::LOCATION).to_str().unwrap().to_string();
    assert!(location.starts_with("/quiz/"));
    assert!(location.ends_with("?client=acme"));
    let path = location.trim_end_matches("?client=acme").to_string();

    let html = server.get(&path).await.text();
    assert!(html.contains("Start analysis"));

    let res = server
        .post(&path)
        .form(&[("action", "no_site")])
        .await;
    res.assert_status(StatusCode::SEE_OTHER);

    // "next" without a choice re-renders the question with an error
    let res = server.post(&path).form(&[("action", "next")]).await;
    res.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert!(res.text().contains("has not been answered"));

    let bank = QuestionBank::builtin();
    for question in bank.questions() {
        let res = server
            .post(&path)
            .form(&[("action", "next"), ("option", question.options[1].as_str())])
            .await;
        res.assert_status(StatusCode::SEE_OTHER);
    }
    assert!(server.get(&path).await.text().contains("Where should we send"));

    let res = server
        .post(&path)
        .form(&[
            ("action", "submit"),
            ("name", "Dana"),
            ("email", "dana@example.com"),
            ("phone", ""),
        ])
        .await;
    res.assert_status(StatusCode::SEE_OTHER);
    let results = res.header(header::LOCATION).to_str().unwrap().to_string();
    assert_eq!(results, format!("{path}/results"));

    let html = server.get(&results).await.text();
    assert!(html.contains("Thanks, Dana!"));
    assert!(html.contains(&bank.questions()[0].options[1]));
}

// =============================================================================
// Chat widget
// =============================================================================

#[tokio::test]
async fn test_open_session_with_tenant() {
    let server = server_with(replying("hi"));
    let res = server
        .post("/api/chat/sessions")
        .add_query_param("client", "acme")
        .await;
    res.assert_status(StatusCode::CREATED);
    let body: Value = res.json();
    assert_eq!(body["company_id"], "acme");
    assert_eq!(body["company"]["name"], "Acme Plumbing");
    assert_eq!(body["user_id"], body["session_id"]);
    assert!(body["company"]["assistant"]["imageName"].is_string());

    // Unknown tenants fall back to the default record
    let body: Value = server.post("/api/chat/sessions").await.json();
    assert_eq!(body["company_id"], "default");
    assert_eq!(body["company"]["name"], CompanyInfo::default().name);
}

#[tokio::test]
async fn test_chat_exchange_and_transcript() {
    let server = server_with(replying("Hello <script>x()</script>**there**"));
    let id = open_session(&server).await;

    server
        .post(&format!("/api/chat/sessions/{id}/messages"))
        .json(&json!({ "message": "  Hi!  " }))
        .await
        .assert_status(StatusCode::ACCEPTED);

    let snapshot = wait_idle(&server, &id).await;
    let messages = snapshot["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1]["role"], "user");
    assert_eq!(messages[1]["content"], "Hi!");
    assert_eq!(messages[2]["content"], "Hello <script>x()</script>**there**");
    assert_eq!(messages[2]["is_typing"], false);
    let html = messages[2]["html"].as_str().unwrap();
    assert!(!html.contains("<script"));
    assert!(html.contains("<strong>there</strong>"));

    let res = server.get(&format!("/api/chat/sessions/{id}/transcript")).await;
    res.assert_status_ok();
    assert_eq!(
        res.header(header::CONTENT_DISPOSITION),
        r#"attachment; filename="chat-transcript.txt""#
    );
    let transcript = res.text();
    assert!(transcript.contains("You: Hi!\n"));
    assert!(transcript.ends_with("Hello <script>x()</script>**there**\n"));
    assert_eq!(
        server.get(&format!("/api/chat/sessions/{id}/transcript")).await.text(),
        transcript
    );
}

#[tokio::test]
async fn test_chat_failure_reveals_fallback() {
    let server = server_with(StubApi {
        reply: Err(500),
        gate: None,
    });
    let id = open_session(&server).await;
    server
        .post(&format!("/api/chat/sessions/{id}/messages"))
        .json(&json!({ "message": "hello" }))
        .await
        .assert_status(StatusCode::ACCEPTED);

    let snapshot = wait_idle(&server, &id).await;
    let messages = snapshot["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[2]["content"], config().chat.fallback_reply);
}

#[tokio::test]
async fn test_chat_send_rejections() {
    let gate = Arc::new(Notify::new());
    let server = server_with(StubApi {
        reply: Ok("done".into()),
        gate: Some(Arc::clone(&gate)),
    });
    let id = open_session(&server).await;
    let messages = format!("/api/chat/sessions/{id}/messages");

    server
        .post(&messages)
        .json(&json!({ "message": "   " }))
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    server
        .post(&messages)
        .json(&json!({ "message": "first" }))
        .await
        .assert_status(StatusCode::ACCEPTED);
    server
        .post(&messages)
        .json(&json!({ "message": "second" }))
        .await
        .assert_status(StatusCode::CONFLICT);

    let snapshot: Value = server.get(&format!("/api/chat/sessions/{id}")).await.json();
    assert_eq!(snapshot["messages"].as_array().unwrap().len(), 2);
    assert_eq!(snapshot["is_loading"], true);

    gate.notify_one();
    let snapshot = wait_idle(&server, &id).await;
    assert_eq!(snapshot["messages"].as_array().unwrap().len(), 3);

    server
        .post("/api/chat/sessions/unknown/messages")
        .json(&json!({ "message": "hi" }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_session() {
    let server = server_with(replying("hi"));
    let id = open_session(&server).await;
    let path = format!("/api/chat/sessions/{id}");

    server.delete(&path).await.assert_status(StatusCode::NO_CONTENT);
    server.get(&path).await.assert_status(StatusCode::NOT_FOUND);
    server.delete(&path).await.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_event_stream_starts_with_snapshot() {
    let state = state_with(replying("hi"));
    let session = state.chat.open_session(None).await;
    let app = build_router(state);

    let res = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/chat/sessions/{}/events", session.id()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "text/event-stream");

    let mut body = res.into_body().into_data_stream();
    let first = body.next().await.unwrap().unwrap();
    let first = String::from_utf8(first.to_vec()).unwrap();
    assert!(first.starts_with("event: snapshot\n"), "got {first:?}");
    assert!(first.contains(session.id()));

    // Closing the session ends the stream
    session.close();
    while let Some(chunk) = tokio::time::timeout(Duration::from_secs(2), body.next())
        .await
        .expect("stream should end after close")
    {
        chunk.unwrap();
    }
}
