//! Normalized event types for the chat widget stream.
//!
//! Every change to a widget session is published as a [`ChatEvent`] and
//! delivered to the browser over Server-Sent Events. Events carry both raw
//! text and pre-rendered, sanitized HTML so the client never has to interpret
//! untrusted markup itself.
//!
//! # Event Types
//!
//! - `snapshot`: the whole conversation, sent on connect and after lag
//! - `message.appended`: a new message at the end of the list
//! - `message.reveal`: the typing message now shows a longer prefix
//! - `message.done`: the reveal finished
//! - `status`: the loading/typing guards changed
//!
//! # Example
//!
//! ```rust
//! use agency_site::normalized::{ChatEvent, sse_event};
//!
//! let event = ChatEvent::Status {
//!     is_loading: true,
//!     is_ai_typing: false,
//! };
//! let sse = sse_event(&event);
//! assert!(sse.contains("event: status"));
//! ```

use serde::{Deserialize, Serialize};

use crate::chat::markup::{render_reply, render_user};
use crate::chat::{Message, Role};

/// A message as the widget displays it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageView {
    /// Role of the message author.
    pub role: Role,
    /// Raw text.
    pub content: String,
    /// Sanitized HTML rendering of `content`.
    pub html: String,
    /// Whether the reveal is still running.
    pub is_typing: bool,
}

impl MessageView {
    /// Build the view of a message.
    #[must_use]
    pub fn new(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
            html: render(message.role, &message.content),
            is_typing: message.is_typing,
        }
    }
}

/// Render text according to who wrote it.
#[must_use]
pub fn render(role: Role, content: &str) -> String {
    match role {
        Role::User => render_user(content),
        Role::Assistant => render_reply(content),
    }
}

/// Full state of a widget session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WidgetSnapshot {
    /// Widget session id.
    pub session_id: String,
    /// All messages in order.
    pub messages: Vec<MessageView>,
    /// A chat request is in flight.
    pub is_loading: bool,
    /// A reply is being revealed.
    pub is_ai_typing: bool,
}

/// Events published by a widget session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "data")]
pub enum ChatEvent {
    /// Complete state, sent first on every subscription.
    #[serde(rename = "snapshot")]
    Snapshot(WidgetSnapshot),

    /// A message was appended.
    #[serde(rename = "message.appended")]
    MessageAppended {
        /// Position of the message in the list.
        index: usize,
        /// The new message.
        message: MessageView,
    },

    /// The typing message shows a new prefix of the reply.
    #[serde(rename = "message.reveal")]
    MessageReveal {
        /// Position of the message in the list.
        index: usize,
        /// Visible prefix.
        content: String,
        /// Sanitized HTML of the prefix.
        html: String,
    },

    /// The reveal of a message finished.
    #[serde(rename = "message.done")]
    MessageDone {
        /// Position of the message in the list.
        index: usize,
        /// Final text.
        content: String,
        /// Sanitized HTML of the final text.
        html: String,
    },

    /// The re-entrancy guards changed.
    #[serde(rename = "status")]
    Status {
        /// A chat request is in flight.
        is_loading: bool,
        /// A reply is being revealed.
        is_ai_typing: bool,
    },
}

/// Get the SSE event name for a [`ChatEvent`].
pub fn event_name(evt: &ChatEvent) -> &'static str {
    match evt {
        ChatEvent::Snapshot(_) => "snapshot",
        ChatEvent::MessageAppended { .. } => "message.appended",
        ChatEvent::MessageReveal { .. } => "message.reveal",
        ChatEvent::MessageDone { .. } => "message.done",
        ChatEvent::Status { .. } => "status",
    }
}

/// JSON payload of a [`ChatEvent`] (the `data` part only).
pub fn event_data(evt: &ChatEvent) -> String {
    let value = serde_json::to_value(evt).unwrap_or_else(|e| {
        serde_json::json!({ "type": "error", "data": { "message": e.to_string() } })
    });
    value
        .get("data")
        .map_or_else(|| "{}".to_string(), ToString::to_string)
}

/// Convert a [`ChatEvent`] to an SSE-formatted string.
///
/// The output follows the Server-Sent Events format with an `event:` line
/// (for `EventSource` listeners) and a `data:` line with the JSON payload.
pub fn sse_event(evt: &ChatEvent) -> String {
    let event_name = event_name(evt);
    let json = event_data(evt);
    format!("event: {event_name}\ndata: {json}\n\n")
}
