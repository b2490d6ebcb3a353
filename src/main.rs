//! Agency website server.
//!
//! Entry point: configuration, telemetry, chat client wiring, then the
//! Axum server.

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::map_err_ignore)]
#![allow(clippy::manual_let_else)]

use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use mimalloc::MiMalloc;
use tracing::info;

use agency_site::AppState;
use agency_site::chat::HttpChatApi;
use agency_site::config::AppConfig;
use agency_site::quiz::QuestionBank;
use agency_site::{server, telemetry};

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present)
    let _ = dotenv();

    let config = Arc::new(AppConfig::load().context("Failed to load configuration")?);

    // Initialize tracing (M-LOG-STRUCTURED)
    telemetry::init(&config.telemetry);
    let metrics = telemetry::install_metrics(&config.telemetry)
        .context("Failed to install metrics recorder")?;

    let questions = match &config.quiz.questions_file {
        Some(path) => QuestionBank::load(path)
            .with_context(|| format!("Failed to load quiz questions from {path}"))?,
        None => QuestionBank::builtin(),
    };
    info!(
        name: "quiz.questions.loaded",
        count = questions.len(),
        source = config.quiz.questions_file.as_deref().unwrap_or("builtin"),
        "Quiz questions loaded"
    );

    let api = HttpChatApi::new(&config.chat.api_base_url, config.chat_request_timeout())
        .context("Invalid chat.api_base_url")?;
    info!(
        name: "chat.config.loaded",
        base_url = %api.base_url(),
        timeout_secs = config.chat.request_timeout_secs,
        "Chat service configured"
    );

    let mut state = AppState::new(Arc::clone(&config), Arc::new(api), questions);
    if let Some(handle) = metrics {
        state = state.with_metrics(handle);
    }

    server::start_server(state).await
}
