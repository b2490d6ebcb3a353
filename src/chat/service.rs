//! Send pipeline: optimistic append, one outbound request, typewriter reveal.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::client::{ChatApi, ChatError, ChatRequest, CompanyInfo};
use super::session::{SendRejected, WidgetSession};
use super::typewriter::{self, RevealEnd};
use crate::session::SessionStore;

/// Reply shown when the chat service cannot answer.
pub const DEFAULT_FALLBACK_REPLY: &str =
    "Sorry, I can't answer right now. Please try again in a moment or leave us your contact details.";

/// Tenant used when no `client` parameter is given.
pub const DEFAULT_COMPANY_ID: &str = "default";

/// Longest accepted tenant id; longer values fall back to the default.
const MAX_COMPANY_ID_LEN: usize = 64;

/// Widget behaviour settings.
#[derive(Debug, Clone)]
pub struct ChatSettings {
    /// Reply substituted when the chat service fails.
    pub fallback_reply: String,
    /// Delay between reveal frames.
    pub typewriter_interval: Duration,
    /// Tenant used when the visitor did not select one.
    pub default_company_id: String,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            fallback_reply: DEFAULT_FALLBACK_REPLY.to_string(),
            typewriter_interval: typewriter::DEFAULT_INTERVAL,
            default_company_id: DEFAULT_COMPANY_ID.to_string(),
        }
    }
}

/// Substitute the fallback reply for a failed request.
///
/// This is the only place a [`ChatError`] turns into text the visitor sees.
#[must_use]
pub fn reply_or_fallback(result: Result<String, ChatError>, fallback: &str) -> String {
    match result {
        Ok(reply) => reply,
        Err(err) => {
            warn!(name: "chat.reply.failed", error = %err, "Chat API failed; using fallback reply");
            fallback.to_string()
        }
    }
}

/// Owns every open widget session and runs their exchanges.
#[derive(Clone)]
pub struct ChatService {
    api: Arc<dyn ChatApi>,
    settings: Arc<ChatSettings>,
    sessions: SessionStore<WidgetSession>,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for ChatService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatService")
            .field("settings", &self.settings)
            .field("sessions", &self.sessions.len())
            .finish_non_exhaustive()
    }
}

impl ChatService {
    /// Create a service. Cancelling `shutdown` closes every session.
    #[must_use]
    pub fn new(api: Arc<dyn ChatApi>, settings: ChatSettings, shutdown: CancellationToken) -> Self {
        Self {
            api,
            settings: Arc::new(settings),
            sessions: SessionStore::new(),
            shutdown,
        }
    }

    /// Widget settings.
    #[must_use]
    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    /// Pick the tenant for a `client` query value.
    #[must_use]
    pub fn resolve_company_id(&self, client: Option<&str>) -> String {
        client
            .map(str::trim)
            .filter(|id| !id.is_empty() && id.len() <= MAX_COMPANY_ID_LEN)
            .unwrap_or(&self.settings.default_company_id)
            .to_string()
    }

    /// Open a widget session for the given `client` value.
    ///
    /// The tenant branding is fetched once; on failure the default record is
    /// used and the failure is logged.
    pub async fn open_session(&self, client: Option<&str>) -> WidgetSession {
        let company_id = self.resolve_company_id(client);
        let company = match self.api.company_info(&company_id).await {
            Ok(info) => info,
            Err(err) => {
                warn!(
                    name: "chat.company_info.failed",
                    company_id = %company_id,
                    error = %err,
                    "Company info unavailable; using defaults"
                );
                CompanyInfo::default()
            }
        };

        let session = WidgetSession::new(company_id, company, self.shutdown.child_token());
        self.sessions.insert(session.id(), session.clone());
        info!(
            name: "chat.session.opened",
            session_id = %session.id(),
            company_id = %session.company_id(),
            "Chat session opened"
        );
        session
    }

    /// Look up an open session.
    #[must_use]
    pub fn session(&self, id: &str) -> Option<WidgetSession> {
        self.sessions.get(id)
    }

    /// Number of open sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Close and forget a session. Returns `false` for an unknown id.
    pub fn close_session(&self, id: &str) -> bool {
        match self.sessions.remove(id) {
            Some(session) => {
                session.close();
                info!(name: "chat.session.closed", session_id = %id, "Chat session closed");
                true
            }
            None => false,
        }
    }

    /// Close every session idle for longer than `ttl`.
    pub fn close_expired(&self, ttl: Duration) -> usize {
        let expired = self.sessions.remove_expired(ttl);
        for session in &expired {
            session.close();
        }
        expired.len()
    }

    /// Ask the chat service for a reply, keeping the failure distinct.
    pub async fn request_reply(
        &self,
        session: &WidgetSession,
        text: &str,
    ) -> Result<String, ChatError> {
        let request = ChatRequest {
            user_id: session.user_id().to_string(),
            message: text.to_string(),
            company_id: session.company_id().to_string(),
        };
        self.api.send_message(&request).await
    }

    /// Send a visitor message.
    ///
    /// On acceptance the user message is already appended when this returns;
    /// the request and the reveal run on the returned task. A rejected send
    /// changes nothing.
    pub fn send(
        &self,
        session: &WidgetSession,
        text: &str,
    ) -> Result<JoinHandle<RevealEnd>, SendRejected> {
        let guard = session.begin_send(text)?;
        metrics::counter!("chat_messages_total").increment(1);
        info!(
            name: "chat.send.accepted",
            session_id = %session.id(),
            chars = guard.text().chars().count(),
            "Chat message accepted"
        );

        let service = self.clone();
        let session = session.clone();
        Ok(tokio::spawn(async move {
            let cancel = session.cancellation().clone();
            let result = tokio::select! {
                () = cancel.cancelled() => return RevealEnd::Cancelled,
                result = service.request_reply(&session, guard.text()) => result,
            };

            let outcome = if result.is_ok() { "ok" } else { "fallback" };
            metrics::counter!("chat_replies_total", "outcome" => outcome).increment(1);
            let reply = reply_or_fallback(result, &service.settings.fallback_reply);

            // Typing is raised before loading drops, so no send fits in between.
            if let Err(err) = session.begin_reveal() {
                warn!(
                    name: "chat.reveal.rejected",
                    session_id = %session.id(),
                    error = %err,
                    "Reveal not started"
                );
                return RevealEnd::Cancelled;
            }
            drop(guard);

            let end = session
                .run_reveal(reply, service.settings.typewriter_interval)
                .await;
            if end == RevealEnd::Cancelled {
                info!(
                    name: "chat.reveal.cancelled",
                    session_id = %session.id(),
                    "Reveal cancelled"
                );
            }
            end
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use tokio::sync::Notify;

    use super::*;
    use crate::chat::Role;
    use crate::normalized::ChatEvent;

    /// Scripted chat service.
    #[derive(Default)]
    struct ScriptedApi {
        replies: Mutex<VecDeque<Result<String, u16>>>,
        requests: Mutex<Vec<ChatRequest>>,
        gate: Option<Arc<Notify>>,
        company_fails: bool,
    }

    impl ScriptedApi {
        fn replying(replies: Vec<Result<String, u16>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                ..Self::default()
            }
        }
    }

    #[async_trait::async_trait]
    impl ChatApi for ScriptedApi {
        async fn send_message(&self, request: &ChatRequest) -> Result<String, ChatError> {
            self.requests.lock().unwrap().push(request.clone());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            match self.replies.lock().unwrap().pop_front() {
                Some(Ok(reply)) => Ok(reply),
                Some(Err(status)) => Err(ChatError::Status { status }),
                None => Err(ChatError::Timeout),
            }
        }

        async fn company_info(&self, company_id: &str) -> Result<CompanyInfo, ChatError> {
            if self.company_fails {
                return Err(ChatError::Status { status: 503 });
            }
            let mut info = CompanyInfo::default();
            info.name = format!("Tenant {company_id}");
            Ok(info)
        }
    }

    fn service(api: ScriptedApi) -> (ChatService, Arc<ScriptedApi>) {
        let api = Arc::new(api);
        let settings = ChatSettings {
            fallback_reply: "Sorry!".to_string(),
            typewriter_interval: Duration::from_millis(10),
            default_company_id: "agency".to_string(),
        };
        let service = ChatService::new(
            Arc::clone(&api) as Arc<dyn ChatApi>,
            settings,
            CancellationToken::new(),
        );
        (service, api)
    }

    #[test]
    fn test_resolve_company_id() {
        let (service, _) = service(ScriptedApi::default());
        assert_eq!(service.resolve_company_id(None), "agency");
        assert_eq!(service.resolve_company_id(Some("  ")), "agency");
        assert_eq!(service.resolve_company_id(Some(" acme ")), "acme");
        assert_eq!(service.resolve_company_id(Some(&"x".repeat(65))), "agency");
    }

    #[tokio::test]
    async fn test_open_session_uses_company_info() {
        let (service, _) = service(ScriptedApi::default());
        let session = service.open_session(Some("acme")).await;
        assert_eq!(session.company().name, "Tenant acme");
        assert_eq!(service.session(session.id()).unwrap().id(), session.id());
    }

    #[tokio::test]
    async fn test_open_session_falls_back_to_default_company() {
        let (service, _) = service(ScriptedApi {
            company_fails: true,
            ..ScriptedApi::default()
        });
        let session = service.open_session(None).await;
        assert_eq!(session.company(), &CompanyInfo::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_exchange() {
        let (service, api) =
            service(ScriptedApi::replying(vec![Ok("We build **shops**.".into())]));
        let session = service.open_session(Some("acme")).await;

        let handle = service.send(&session, "Do you build shops?").unwrap();
        assert_eq!(session.conversation().len(), 2);

        assert_eq!(handle.await.unwrap(), RevealEnd::Completed);

        let conversation = session.conversation();
        assert_eq!(conversation.len(), 3);
        let last = conversation.last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.content, "We build **shops**.");
        assert!(!last.is_typing);
        assert!(!session.is_loading());
        assert!(!session.is_ai_typing());

        let requests = api.requests.lock().unwrap();
        assert_eq!(
            requests.as_slice(),
            &[ChatRequest {
                user_id: session.user_id().to_string(),
                message: "Do you build shops?".to_string(),
                company_id: "acme".to_string(),
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_substitutes_fallback_once() {
        let (service, _) = service(ScriptedApi::replying(vec![Err(502)]));
        let session = service.open_session(None).await;

        let handle = service.send(&session, "hello").unwrap();
        handle.await.unwrap();

        let conversation = session.conversation();
        let assistant_after_send: Vec<_> = conversation.messages()[2..]
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .collect();
        assert_eq!(assistant_after_send.len(), 1);
        assert_eq!(assistant_after_send[0].content, "Sorry!");
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn test_request_reply_keeps_error_tagged() {
        let (service, _) = service(ScriptedApi::replying(vec![Err(500)]));
        let session = service.open_session(None).await;
        let result = service.request_reply(&session, "hi").await;
        assert!(matches!(result, Err(ChatError::Status { status: 500 })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_while_loading_is_noop() {
        let gate = Arc::new(Notify::new());
        let (service, _) = service(ScriptedApi {
            gate: Some(Arc::clone(&gate)),
            ..ScriptedApi::replying(vec![Ok("done".into())])
        });
        let session = service.open_session(None).await;

        let handle = service.send(&session, "first").unwrap();
        assert!(session.is_loading());
        let before = session.conversation().len();

        assert_eq!(
            service.send(&session, "second").unwrap_err(),
            SendRejected::Busy
        );
        assert_eq!(session.conversation().len(), before);

        gate.notify_one();
        handle.await.unwrap();
        assert_eq!(session.conversation().last().unwrap().content, "done");
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_while_typing_is_noop() {
        let (service, _) =
            service(ScriptedApi::replying(vec![Ok("a fairly long reply".into())]));
        let session = service.open_session(None).await;
        let mut rx = session.subscribe();

        let handle = service.send(&session, "first").unwrap();
        loop {
            if let ChatEvent::MessageReveal { content, .. } = rx.recv().await.unwrap() {
                if !content.is_empty() {
                    break;
                }
            }
        }

        assert!(session.is_ai_typing());
        let before = session.conversation().len();
        assert_eq!(
            service.send(&session, "second").unwrap_err(),
            SendRejected::Busy
        );
        assert_eq!(session.conversation().len(), before);

        handle.await.unwrap();
        assert!(service.send(&session, "third").is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_cancels_reveal() {
        let (service, _) = service(ScriptedApi::replying(vec![Ok("x".repeat(500))]));
        let session = service.open_session(None).await;
        let mut rx = session.subscribe();

        let handle = service.send(&session, "hi").unwrap();
        while !matches!(rx.recv().await.unwrap(), ChatEvent::MessageReveal { .. }) {}

        assert!(service.close_session(session.id()));
        assert_eq!(handle.await.unwrap(), RevealEnd::Cancelled);

        let frozen = session.conversation();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(session.conversation(), frozen);
        assert!(frozen.last().unwrap().content.len() < 500);
        assert!(service.session(session.id()).is_none());
        assert!(!service.close_session(session.id()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_closes_sessions() {
        let shutdown = CancellationToken::new();
        let service = ChatService::new(
            Arc::new(ScriptedApi::default()),
            ChatSettings::default(),
            shutdown.clone(),
        );
        let session = service.open_session(None).await;
        shutdown.cancel();
        assert!(session.is_closed());
        assert_eq!(service.send(&session, "hi").unwrap_err(), SendRejected::Closed);
    }

    #[tokio::test]
    async fn test_close_expired() {
        let (service, _) = service(ScriptedApi::default());
        let session = service.open_session(None).await;
        assert_eq!(service.close_expired(Duration::from_secs(3600)), 0);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(service.close_expired(Duration::from_millis(1)), 1);
        assert!(session.is_closed());
        assert_eq!(service.session_count(), 0);
    }
}
