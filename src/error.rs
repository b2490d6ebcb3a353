//! HTTP error mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::chat::SendRejected;
use crate::quiz::{FieldError, QuizError};

/// Errors returned by the JSON API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unknown chat session or quiz.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The widget is busy with another exchange.
    #[error("{0}")]
    Conflict(String),

    /// The request was understood but rejected.
    #[error("{message}")]
    Unprocessable {
        message: String,
        fields: Vec<FieldError>,
    },

    /// Too many requests.
    #[error("rate limit exceeded")]
    RateLimited,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unprocessable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn unprocessable(message: impl Into<String>) -> Self {
        Self::Unprocessable {
            message: message.into(),
            fields: Vec::new(),
        }
    }
}

impl From<SendRejected> for ApiError {
    fn from(err: SendRejected) -> Self {
        match err {
            SendRejected::Empty => Self::unprocessable(err.to_string()),
            SendRejected::Busy => Self::Conflict(err.to_string()),
            SendRejected::Closed => Self::NotFound("chat session"),
        }
    }
}

impl From<QuizError> for ApiError {
    fn from(err: QuizError) -> Self {
        match err {
            QuizError::InvalidContact(fields) => Self::Unprocessable {
                message: "contact details are invalid".into(),
                fields,
            },
            QuizError::Bank(_) | QuizError::Io(_) | QuizError::Yaml(_) => {
                Self::Internal(anyhow::Error::new(err))
            }
            other => Self::unprocessable(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let Self::Internal(err) = &self {
            tracing::error!(name: "api.error", error = %err, "Internal error");
        }
        let body = match &self {
            Self::Internal(_) => json!({ "error": "internal server error" }),
            Self::Unprocessable { message, fields } if !fields.is_empty() => {
                json!({ "error": message, "fields": fields })
            }
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
