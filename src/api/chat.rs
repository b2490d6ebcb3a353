//! Chat widget endpoints.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::{BroadcastStream, errors::BroadcastStreamRecvError};
use tracing::{debug, info};

use super::ClientQuery;
use crate::AppState;
use crate::chat::{CompanyInfo, WidgetSession};
use crate::error::ApiError;
use crate::normalized::{ChatEvent, WidgetSnapshot, event_data, event_name};

/// File name offered for the transcript download.
pub const TRANSCRIPT_FILENAME: &str = "chat-transcript.txt";

/// Response to opening a widget session.
#[derive(Debug, Serialize)]
pub struct SessionCreated {
    pub session_id: String,
    /// Correlation key sent to the chat service.
    pub user_id: String,
    pub company_id: String,
    pub company: CompanyInfo,
    pub events_url: String,
    pub transcript_url: String,
}

/// Body of a visitor message.
#[derive(Debug, Deserialize)]
pub struct SendMessage {
    pub message: String,
}

/// Acknowledgement of an accepted message.
#[derive(Debug, Serialize)]
pub struct SendAccepted {
    pub session_id: String,
    pub events_url: String,
}

fn lookup(state: &AppState, id: &str) -> Result<WidgetSession, ApiError> {
    state
        .chat
        .session(id)
        .ok_or(ApiError::NotFound("chat session"))
}

fn events_url(id: &str) -> String {
    format!("/api/chat/sessions/{id}/events")
}

/// POST /api/chat/sessions - Open a widget session.
pub async fn create_session(
    State(state): State<AppState>,
    Query(query): Query<ClientQuery>,
) -> impl IntoResponse {
    let session = state.chat.open_session(query.client.as_deref()).await;
    let id = session.id().to_string();

    let body = SessionCreated {
        user_id: session.user_id().to_string(),
        company_id: session.company_id().to_string(),
        company: session.company().clone(),
        events_url: events_url(&id),
        transcript_url: format!("/api/chat/sessions/{id}/transcript"),
        session_id: id,
    };
    (StatusCode::CREATED, Json(body))
}

/// GET /api/chat/sessions/:id - Conversation snapshot.
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WidgetSnapshot>, ApiError> {
    Ok(Json(lookup(&state, &id)?.snapshot()))
}

/// POST /api/chat/sessions/:id/messages - Send a visitor message.
///
/// The reply arrives on the event stream.
pub async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<SendMessage>,
) -> Result<(StatusCode, Json<SendAccepted>), ApiError> {
    let session = lookup(&state, &id)?;
    // The reveal task runs detached; its end is observed through events.
    let _reveal = state.chat.send(&session, &body.message)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SendAccepted {
            events_url: events_url(&id),
            session_id: id,
        }),
    ))
}

/// DELETE /api/chat/sessions/:id - Close a session and stop its reveal.
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.chat.close_session(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("chat session"))
    }
}

/// GET /api/chat/sessions/:id/transcript - Plain-text download.
pub async fn transcript(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session = lookup(&state, &id)?;
    let disposition = format!("attachment; filename=\"{TRANSCRIPT_FILENAME}\"");
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        session.transcript(),
    ))
}

fn to_sse(event: &ChatEvent) -> Event {
    Event::default()
        .event(event_name(event))
        .data(event_data(event))
}

/// GET /api/chat/sessions/:id/events - SSE stream of session changes.
///
/// Starts with a snapshot; a subscriber that lags behind the channel gets a
/// fresh snapshot instead of the events it missed. Ends when the session
/// closes.
pub async fn events(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let session = lookup(&state, &id)?;
    // Subscribe before the snapshot is taken so nothing falls in between.
    let mut updates = BroadcastStream::new(session.subscribe());
    let cancel = session.cancellation().clone();

    info!(name: "chat.events.connected", session_id = %id, "Event stream connected");

    let stream = async_stream::stream! {
        yield Ok::<_, Infallible>(to_sse(&ChatEvent::Snapshot(session.snapshot())));

        loop {
            let next = tokio::select! {
                () = cancel.cancelled() => None,
                item = updates.next() => item,
            };
            match next {
                Some(Ok(event)) => yield Ok(to_sse(&event)),
                Some(Err(BroadcastStreamRecvError::Lagged(missed))) => {
                    debug!(
                        session_id = %session.id(),
                        missed,
                        "Event subscriber lagged; resending snapshot"
                    );
                    yield Ok(to_sse(&ChatEvent::Snapshot(session.snapshot())));
                }
                None => break,
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}
