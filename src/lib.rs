//! Agency website server.
//!
//! Server-rendered marketing pages plus two interactive flows: a website
//! analysis quiz and an embedded chat widget backed by an external chat
//! service.
//!
//! # Architecture
//!
//! - **Server**: Axum HTTP server, HTML pages, JSON API and SSE streams
//! - **Chat**: widget sessions, the outbound chat client and the typewriter reveal
//! - **Quiz**: a linear wizard over a question bank
//!
//! # Modules
//!
//! - [`chat`]: chat widget sessions and the send pipeline
//! - [`quiz`]: quiz wizard state machine and questions
//! - [`normalized`]: event model streamed to the widget
//! - [`session`]: expiring in-memory session store
//! - [`pages`]: HTML pages
//! - [`api`]: JSON and SSE endpoints

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::implicit_hasher)]
#![allow(clippy::assigning_clones)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::default_trait_access)]
#![allow(clippy::unused_async)]

pub mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod normalized;
pub mod pages;
pub mod quiz;
pub mod security;
pub mod server;
pub mod session;
pub mod telemetry;

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use tokio_util::sync::CancellationToken;

use crate::chat::{ChatApi, ChatService};
use crate::config::AppConfig;
use crate::quiz::{QuestionBank, QuizWizard};
use crate::security::rate_limit::AppRateLimiter;
use crate::session::SessionStore;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Global Configuration
    pub config: Arc<AppConfig>,
    /// Chat widget sessions and the send pipeline.
    pub chat: ChatService,
    /// Quiz wizards in progress or submitted.
    pub quizzes: SessionStore<QuizWizard>,
    /// Questions asked by every new wizard.
    pub questions: Arc<QuestionBank>,
    /// Global Rate Limiter
    pub rate_limiter: AppRateLimiter,
    /// Prometheus exposition, when metrics are enabled.
    pub metrics: Option<PrometheusHandle>,
    /// Cancelled on shutdown; parent of every widget session token.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Wire the state from configuration and a chat service client.
    #[must_use]
    pub fn new(config: Arc<AppConfig>, api: Arc<dyn ChatApi>, questions: QuestionBank) -> Self {
        let shutdown = CancellationToken::new();
        let chat = ChatService::new(api, config.chat_settings(), shutdown.clone());
        let rate_limiter = AppRateLimiter::new(
            config.resilience.requests_per_second,
            config.resilience.burst_size,
        );

        Self {
            config,
            chat,
            quizzes: SessionStore::new(),
            questions: Arc::new(questions),
            rate_limiter,
            metrics: None,
            shutdown,
        }
    }

    /// Expose metrics through `handle` on `/metrics`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Start a quiz wizard and register it.
    #[must_use]
    pub fn new_quiz(&self) -> QuizWizard {
        let wizard = QuizWizard::new(Arc::clone(&self.questions), self.config.quiz_policy());
        self.quizzes.insert(wizard.id(), wizard.clone());
        wizard
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("chat", &self.chat)
            .field("quizzes", &self.quizzes.len())
            .field("questions", &self.questions.len())
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}
