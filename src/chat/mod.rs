//! Chat widget.
//!
//! A visitor opens a widget session, sends messages, and watches replies being
//! revealed one character at a time. Replies come from an external chat
//! service; when it fails, a fixed fallback reply is revealed instead.
//!
//! # Architecture
//!
//! - [`message`]: messages and the append-only conversation
//! - [`client`]: the [`ChatApi`] seam and its HTTP implementation
//! - [`typewriter`]: the timed character reveal
//! - [`markup`]: sanitizing and rendering reply text
//! - [`session`]: one visitor's conversation and its send guards
//! - [`service`]: the send pipeline and session registry

pub mod client;
pub mod markup;
pub mod message;
pub mod service;
pub mod session;
pub mod typewriter;

pub use client::{AssistantInfo, ChatApi, ChatError, ChatRequest, CompanyInfo, HttpChatApi};
pub use message::{Conversation, ConversationError, Message, Role};
pub use service::{ChatService, ChatSettings, reply_or_fallback};
pub use session::{LoadingGuard, SendRejected, WidgetSession};
pub use typewriter::{RevealEnd, Typewriter};
