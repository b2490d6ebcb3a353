//! Quiz wizard endpoints.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;

use crate::AppState;
use crate::error::ApiError;
use crate::quiz::{Question, QuizAction, QuizError, QuizForm, QuizWizard, UserInfo};

/// Everything a client needs to render the current step.
#[derive(Debug, Clone, Serialize)]
pub struct QuizSnapshot {
    pub id: String,
    pub step: usize,
    /// `intro`, `question` or `contact`.
    pub step_kind: &'static str,
    pub progress: f64,
    pub total_questions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<Question>,
    pub answers: Vec<Option<String>>,
    pub url: Option<String>,
    pub contact: UserInfo,
    pub next_label: &'static str,
    pub submitted: bool,
}

impl QuizSnapshot {
    #[must_use]
    pub fn new(wizard: &QuizWizard) -> Self {
        Self {
            id: wizard.id().to_string(),
            step: wizard.step_index(),
            step_kind: wizard.step().kind(),
            progress: wizard.progress(),
            total_questions: wizard.total_questions(),
            question: wizard.current_question().cloned(),
            answers: wizard.answers().to_vec(),
            url: wizard.site_url().map(ToString::to_string),
            contact: wizard.contact().clone(),
            next_label: wizard.next_label(),
            submitted: wizard.is_submitted(),
        }
    }
}

/// POST /api/quiz - Start a wizard.
pub async fn create(State(state): State<AppState>) -> (StatusCode, Json<QuizSnapshot>) {
    let wizard = state.new_quiz();
    (StatusCode::CREATED, Json(QuizSnapshot::new(&wizard)))
}

/// GET /api/quiz/:id - Current state.
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<QuizSnapshot>, ApiError> {
    state
        .quizzes
        .update(&id, |wizard| QuizSnapshot::new(wizard))
        .map(Json)
        .ok_or(ApiError::NotFound("quiz"))
}

/// POST /api/quiz/:id/actions - Apply one action.
pub async fn apply_action(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(form): Json<QuizForm>,
) -> Result<Json<QuizSnapshot>, ApiError> {
    let action = QuizAction::try_from(form)?;
    let snapshot = state
        .quizzes
        .update(&id, |wizard| {
            wizard.apply(action)?;
            Ok::<_, QuizError>(QuizSnapshot::new(wizard))
        })
        .ok_or(ApiError::NotFound("quiz"))??;
    Ok(Json(snapshot))
}
