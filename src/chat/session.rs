//! Widget session: the conversation of one visitor plus its send guards.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::client::CompanyInfo;
use super::message::{Conversation, ConversationError};
use super::typewriter::{self, Frame, RevealEnd};
use crate::normalized::{ChatEvent, MessageView, WidgetSnapshot, render};

/// Capacity of the per-session event channel. Subscribers that fall further
/// behind get a fresh snapshot instead of the missed events.
const EVENT_CAPACITY: usize = 256;

/// Why a send was refused. A refused send leaves the conversation unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendRejected {
    /// The text is empty after trimming.
    #[error("message is empty")]
    Empty,
    /// A request is in flight or a reply is being revealed.
    #[error("a reply is still in progress")]
    Busy,
    /// The session was closed.
    #[error("chat session is closed")]
    Closed,
}

#[derive(Debug, Default)]
struct WidgetState {
    conversation: Conversation,
    is_loading: bool,
    is_ai_typing: bool,
}

#[derive(Debug)]
struct Inner {
    id: String,
    company_id: String,
    company: CompanyInfo,
    state: Mutex<WidgetState>,
    events: broadcast::Sender<ChatEvent>,
    cancel: CancellationToken,
}

/// One visitor's chat widget.
///
/// The session id doubles as the `user_id` sent to the chat service. It is a
/// UUID v4 minted once, when the widget opens. Cloning yields another handle to
/// the same session.
#[derive(Debug, Clone)]
pub struct WidgetSession {
    inner: Arc<Inner>,
}

impl WidgetSession {
    /// Open a session for a tenant, greeting the visitor.
    ///
    /// `cancel` bounds the lifetime of every reveal the session starts.
    #[must_use]
    pub fn new(
        company_id: impl Into<String>,
        company: CompanyInfo,
        cancel: CancellationToken,
    ) -> Self {
        let mut conversation = Conversation::new();
        let _ = conversation.push_assistant(company.greeting());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            inner: Arc::new(Inner {
                id: Uuid::new_v4().to_string(),
                company_id: company_id.into(),
                company,
                state: Mutex::new(WidgetState {
                    conversation,
                    ..WidgetState::default()
                }),
                events,
                cancel,
            }),
        }
    }

    /// Session id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Correlation key sent with every chat request.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.inner.id
    }

    /// Tenant of this session.
    #[must_use]
    pub fn company_id(&self) -> &str {
        &self.inner.company_id
    }

    /// Branding of the tenant.
    #[must_use]
    pub fn company(&self) -> &CompanyInfo {
        &self.inner.company
    }

    fn state(&self) -> MutexGuard<'_, WidgetState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, event: ChatEvent) {
        // No subscribers is fine; the state is still updated.
        let _ = self.inner.events.send(event);
    }

    fn publish_status(&self, state: &WidgetState) {
        self.publish(ChatEvent::Status {
            is_loading: state.is_loading,
            is_ai_typing: state.is_ai_typing,
        });
    }

    /// Copy of the conversation.
    #[must_use]
    pub fn conversation(&self) -> Conversation {
        self.state().conversation.clone()
    }

    /// Whether a chat request is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state().is_loading
    }

    /// Whether a reply is being revealed.
    #[must_use]
    pub fn is_ai_typing(&self) -> bool {
        self.state().is_ai_typing
    }

    /// Full state for a newly connected client.
    #[must_use]
    pub fn snapshot(&self) -> WidgetSnapshot {
        let state = self.state();
        WidgetSnapshot {
            session_id: self.inner.id.clone(),
            messages: state
                .conversation
                .messages()
                .iter()
                .map(MessageView::new)
                .collect(),
            is_loading: state.is_loading,
            is_ai_typing: state.is_ai_typing,
        }
    }

    /// Subscribe to state changes.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.inner.events.subscribe()
    }

    /// Plain-text transcript of the conversation.
    #[must_use]
    pub fn transcript(&self) -> String {
        self.state()
            .conversation
            .transcript(&self.inner.company.assistant.name)
    }

    /// Stop every reveal this session runs. Nothing is mutated afterwards.
    pub fn close(&self) {
        self.inner.cancel.cancel();
    }

    /// Whether the session was closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// Token cancelled when the session closes.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.inner.cancel
    }

    /// Accept a visitor message.
    ///
    /// Appends the (trimmed) text as a user message and raises the loading
    /// flag. The flag stays raised until the returned guard is dropped.
    pub fn begin_send(&self, text: &str) -> Result<LoadingGuard, SendRejected> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SendRejected::Empty);
        }
        if self.is_closed() {
            return Err(SendRejected::Closed);
        }

        let mut state = self.state();
        if state.is_loading || state.is_ai_typing {
            return Err(SendRejected::Busy);
        }
        let index = state
            .conversation
            .push_user(text)
            .map_err(|_| SendRejected::Busy)?;
        state.is_loading = true;

        self.publish(ChatEvent::MessageAppended {
            index,
            message: MessageView::new(&state.conversation.messages()[index]),
        });
        self.publish_status(&state);
        drop(state);

        Ok(LoadingGuard {
            session: self.clone(),
            text: text.to_string(),
        })
    }

    /// Append an empty assistant message and raise the typing flag.
    pub fn begin_reveal(&self) -> Result<usize, ConversationError> {
        let mut state = self.state();
        let index = state.conversation.begin_typing()?;
        state.is_ai_typing = true;

        self.publish(ChatEvent::MessageAppended {
            index,
            message: MessageView::new(&state.conversation.messages()[index]),
        });
        self.publish_status(&state);
        Ok(index)
    }

    /// Reveal `reply` into the typing message started by
    /// [`begin_reveal`](Self::begin_reveal).
    pub async fn run_reveal(&self, reply: String, period: Duration) -> RevealEnd {
        typewriter::reveal(reply, period, self.inner.cancel.clone(), |frame| {
            self.apply_frame(frame);
        })
        .await
    }

    fn apply_frame(&self, frame: Frame<'_>) {
        let mut state = self.state();
        match frame {
            Frame::Progress(prefix) => {
                if let Ok(index) = state.conversation.set_typing_content(prefix) {
                    self.publish(ChatEvent::MessageReveal {
                        index,
                        content: prefix.to_string(),
                        html: render(super::Role::Assistant, prefix),
                    });
                }
            }
            Frame::Finished => {
                if let Ok(index) = state.conversation.finish_typing() {
                    state.is_ai_typing = false;
                    let content = state.conversation.messages()[index].content.clone();
                    let html = render(super::Role::Assistant, &content);
                    self.publish(ChatEvent::MessageDone {
                        index,
                        content,
                        html,
                    });
                    self.publish_status(&state);
                }
            }
        }
    }
}

/// Scoped hold on a session's loading flag.
///
/// Created by [`WidgetSession::begin_send`]; dropping it lowers the flag,
/// whatever happened to the request in between.
#[derive(Debug)]
#[must_use = "dropping the guard immediately releases the loading flag"]
pub struct LoadingGuard {
    session: WidgetSession,
    text: String,
}

impl LoadingGuard {
    /// The accepted (trimmed) visitor text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The session the guard belongs to.
    #[must_use]
    pub fn session(&self) -> &WidgetSession {
        &self.session
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        let mut state = self.session.state();
        state.is_loading = false;
        self.session.publish_status(&state);
    }
}
