//! Client for the external chat service.
//!
//! The service is an external collaborator: this module only knows the two
//! endpoints the widget uses and the shape of their JSON bodies.
//!
//! - `POST {base}/chat` with [`ChatRequest`], answering `{ "reply": "..." }`
//! - `GET {base}/company-info?client=<id>`, answering [`CompanyInfo`]

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

/// Errors from the chat service.
///
/// These never reach the visitor: the widget substitutes a fallback reply.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// The configured base URL cannot be used.
    #[error("invalid chat API URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Connection, TLS, or protocol failure.
    #[error("chat API request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// The request exceeded the configured timeout.
    #[error("chat API request timed out")]
    Timeout,

    /// The service answered with a non-success status.
    #[error("chat API returned status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// The body was not the expected JSON document.
    #[error("chat API returned an unreadable body: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Status {
                status: status.as_u16(),
            }
        } else {
            Self::Transport(err)
        }
    }
}

/// Body of a chat request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Widget session token, used by the service as a correlation key.
    pub user_id: String,
    /// Visitor text.
    pub message: String,
    /// Tenant the conversation belongs to.
    pub company_id: String,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    reply: String,
}

/// Branding of a tenant, used to personalise the widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyInfo {
    /// Company display name.
    pub name: String,
    /// Assistant persona.
    pub assistant: AssistantInfo,
}

/// Assistant persona shown in the widget header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantInfo {
    /// Assistant display name.
    pub name: String,
    /// Avatar file name under `/static/avatars`.
    #[serde(rename = "imageName")]
    pub image_name: String,
}

impl Default for CompanyInfo {
    fn default() -> Self {
        Self {
            name: "Northwind Digital".to_string(),
            assistant: AssistantInfo {
                name: "Ava".to_string(),
                image_name: "assistant.png".to_string(),
            },
        }
    }
}

impl CompanyInfo {
    /// Opening message shown when the widget starts.
    #[must_use]
    pub fn greeting(&self) -> String {
        format!(
            "Hi! I'm {}, the assistant of {}. How can I help you today?",
            self.assistant.name, self.name
        )
    }
}

/// Seam between the widget and the external chat service.
#[async_trait::async_trait]
pub trait ChatApi: Send + Sync {
    /// Send one visitor message and return the reply text.
    async fn send_message(&self, request: &ChatRequest) -> Result<String, ChatError>;

    /// Fetch the branding of a tenant.
    async fn company_info(&self, company_id: &str) -> Result<CompanyInfo, ChatError>;
}

/// [`ChatApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpChatApi {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpChatApi {
    /// Create a client for the service rooted at `base_url`.
    ///
    /// Every request is bounded by `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ChatError::Transport)?;
        Self::with_client(base_url, http)
    }

    /// Create a client with a custom reqwest client.
    pub fn with_client(base_url: &str, http: reqwest::Client) -> Result<Self, ChatError> {
        let mut base_url = Url::parse(base_url)?;
        // `Url::join` replaces the last segment unless the path ends with '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { http, base_url })
    }

    /// The normalized base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ChatError> {
        Ok(self.base_url.join(path)?)
    }
}

#[async_trait::async_trait]
impl ChatApi for HttpChatApi {
    async fn send_message(&self, request: &ChatRequest) -> Result<String, ChatError> {
        let url = self.endpoint("chat")?;
        let resp = self
            .http
            .post(url)
            .json(request)
            .send()
            .await?
            .error_for_status()?;
        let body: ChatReply = resp.json().await?;
        Ok(body.reply)
    }

    async fn company_info(&self, company_id: &str) -> Result<CompanyInfo, ChatError> {
        let mut url = self.endpoint("company-info")?;
        url.query_pairs_mut().append_pair("client", company_id);
        let resp = self.http.get(url).send().await?.error_for_status()?;
        Ok(resp.json().await?)
    }
}
