//! JSON and SSE endpoints used by the chat widget and the quiz.

pub mod chat;
pub mod quiz;

use axum::{
    Router,
    routing::{get, post},
};
use serde::Deserialize;

use crate::AppState;

/// `?client=` tenant selector accepted by pages and the widget API.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ClientQuery {
    #[serde(default)]
    pub client: Option<String>,
}

/// Routes mounted under `/api`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/chat/sessions", post(chat::create_session))
        .route(
            "/chat/sessions/{id}",
            get(chat::get_session).delete(chat::delete_session),
        )
        .route("/chat/sessions/{id}/messages", post(chat::send_message))
        .route("/chat/sessions/{id}/events", get(chat::events))
        .route("/chat/sessions/{id}/transcript", get(chat::transcript))
        .route("/quiz", post(quiz::create))
        .route("/quiz/{id}", get(quiz::get))
        .route("/quiz/{id}/actions", post(quiz::apply_action))
}
