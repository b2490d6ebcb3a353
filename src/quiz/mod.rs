//! Website analysis quiz.
//!
//! A linear wizard: capture the visitor's site URL, walk through a fixed list
//! of multiple-choice questions, then collect contact details.

pub mod questions;
pub mod wizard;

use serde::Serialize;

pub use questions::{Question, QuestionBank};
pub use wizard::{
    AnsweredQuestion, ContactUpdate, QuizAction, QuizForm, QuizPolicy, QuizWizard, Step,
    Submission, UserInfo,
};

/// A contact form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactField {
    /// Full name.
    Name,
    /// Email address.
    Email,
    /// Phone number.
    Phone,
}

/// A validation problem on one contact field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// The offending field.
    pub field: ContactField,
    /// Message shown next to the field.
    pub message: String,
}

impl FieldError {
    pub(crate) fn new(field: ContactField, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Quiz errors.
#[derive(Debug, thiserror::Error)]
pub enum QuizError {
    /// The action does not apply to the current step.
    #[error("'{action}' is not allowed at step {step}")]
    InvalidTransition {
        /// Rejected action.
        action: &'static str,
        /// Step index at the time.
        step: usize,
    },

    /// Forward move on a question with no answer.
    #[error("question {question} has not been answered")]
    Unanswered {
        /// 1-based question number.
        question: usize,
    },

    /// The option is not one of the current question's choices.
    #[error("'{option}' is not an option for this question")]
    UnknownOption {
        /// Rejected option.
        option: String,
    },

    /// The action name is not recognised.
    #[error("unknown quiz action '{0}'")]
    UnknownAction(String),

    /// The action needs a field that was not sent.
    #[error("missing field '{0}'")]
    MissingField(&'static str),

    /// Contact details failed validation.
    #[error("contact details are invalid")]
    InvalidContact(Vec<FieldError>),

    /// The wizard was already submitted.
    #[error("quiz was already submitted")]
    AlreadySubmitted,

    /// The question bank is unusable.
    #[error("invalid question bank: {0}")]
    Bank(String),

    /// Reading a question file failed.
    #[error("failed to read questions: {0}")]
    Io(#[from] std::io::Error),

    /// A question file is not valid YAML.
    #[error("failed to parse questions: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
