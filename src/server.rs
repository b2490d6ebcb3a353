use std::time::Duration;

use axum::{
    Router,
    extract::{DefaultBodyLimit, Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::IntoResponse,
    routing::get,
};
use tokio_util::sync::CancellationToken;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::AppState;
use crate::{api, pages, security};

/// Largest accepted request body.
const BODY_LIMIT: usize = 64 * 1024;

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    let config = &state.config;

    let api = api::router()
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            security::rate_limit::rate_limit_middleware,
        ));

    let timeout = config.request_timeout();

    Router::new()
        // HTML pages
        .route("/", get(pages::index_handler))
        .route("/services", get(pages::services_handler))
        .route("/services/{slug}", get(pages::service_handler))
        .route("/about", get(pages::about_handler))
        .route("/blog", get(pages::blog_handler))
        .route("/blog/{slug}", get(pages::post_handler))
        .route("/quiz", get(pages::quiz::start_handler))
        .route(
            "/quiz/{id}",
            get(pages::quiz::step_handler).post(pages::quiz::action_handler),
        )
        .route("/quiz/{id}/results", get(pages::quiz::results_handler))
        // API routes
        .nest("/api", api)
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        // Static assets
        .nest_service("/static", ServeDir::new(&config.server.static_dir))
        .fallback(pages::not_found_handler)
        // Handlers only; streamed bodies are not cut off.
        .layer(axum::middleware::from_fn(
            move |req: Request, next: Next| async move {
                match timeout {
                    Some(duration) => match tokio::time::timeout(duration, next.run(req)).await {
                        Ok(res) => res,
                        Err(_) => {
                            (StatusCode::REQUEST_TIMEOUT, "Request timed out").into_response()
                        }
                    },
                    None => next.run(req).await,
                }
            },
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

/// GET /metrics - Prometheus text exposition.
async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics are disabled").into_response(),
    }
}

/// Periodically drop idle chat sessions and quizzes.
///
/// Closing a chat session cancels its reveal. Runs until `shutdown` fires.
pub async fn sweep_sessions(state: AppState, shutdown: CancellationToken) {
    let ttl = state.config.session_ttl();
    let mut ticker = tokio::time::interval(state.config.sweep_interval());
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                let chats = state.chat.close_expired(ttl);
                let quizzes = state.quizzes.remove_expired(ttl).len();
                if chats + quizzes > 0 {
                    info!(
                        name: "session.swept",
                        chat_sessions = chats,
                        quizzes,
                        "Expired sessions removed"
                    );
                }
            }
        }
    }
}

/// Start the Axum server with the provided state.
///
/// Returns after Ctrl-C, once in-flight requests are drained. Shutdown
/// cancels every reveal and stops the sweeper.
pub async fn start_server(state: AppState) -> anyhow::Result<()> {
    let config = state.config.clone();
    let shutdown = state.shutdown.clone();

    tokio::spawn(sweep_sessions(state.clone(), shutdown.clone()));

    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        chat_api = %config.chat.api_base_url,
        "Server started"
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "Failed to listen for shutdown signal");
            }
            info!(name: "server.stopping", "Shutdown requested");
            shutdown.cancel();
        })
        .await?;
    Ok(())
}
