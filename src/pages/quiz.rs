//! Quiz pages: one plain HTML form per wizard step.

use std::fmt::Write as _;

use axum::{
    Form,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};

use super::{html_shell, not_found_page, with_client};
use crate::AppState;
use crate::api::ClientQuery;
use crate::chat::markup::escape_html;
use crate::quiz::{
    ContactField, FieldError, QuizAction, QuizError, QuizForm, QuizWizard, Step, Submission,
};

fn step_url(id: &str, client: Option<&str>) -> String {
    with_client(&format!("/quiz/{id}"), client)
}

fn results_url(id: &str, client: Option<&str>) -> String {
    with_client(&format!("/quiz/{id}/results"), client)
}

/// GET /quiz - Start a wizard and send the visitor to its first step.
pub async fn start_handler(
    State(state): State<AppState>,
    Query(query): Query<ClientQuery>,
) -> Redirect {
    let wizard = state.new_quiz();
    Redirect::to(&step_url(wizard.id(), query.client.as_deref()))
}

/// GET /quiz/:id - Render the current step.
pub async fn step_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ClientQuery>,
) -> Response {
    let client = query.client.as_deref();
    match state.quizzes.get(&id) {
        Some(wizard) if wizard.is_submitted() => {
            Redirect::to(&results_url(&id, client)).into_response()
        }
        Some(wizard) => Html(render_step(&wizard, client, None)).into_response(),
        None => not_found_page(client),
    }
}

/// POST /quiz/:id - Apply a form action, then redirect (or re-render on error).
pub async fn action_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ClientQuery>,
    Form(form): Form<QuizForm>,
) -> Response {
    let client = query.client.as_deref();

    // The question form posts the chosen radio together with "next".
    let mut actions = Vec::with_capacity(2);
    if form.action.trim() == "next"
        && let Some(option) = form.option.clone()
    {
        actions.push(QuizAction::Select { option });
    }

    let outcome = state.quizzes.update(&id, |wizard| {
        let result = QuizAction::try_from(form).and_then(|last| {
            actions.push(last);
            let mut submitted = None;
            for action in actions {
                submitted = wizard.apply(action)?;
            }
            Ok(submitted)
        });
        (result, wizard.clone())
    });

    match outcome {
        None => not_found_page(client),
        Some((Ok(Some(_)), _)) => Redirect::to(&results_url(&id, client)).into_response(),
        Some((Ok(None), _)) => Redirect::to(&step_url(&id, client)).into_response(),
        Some((Err(err), wizard)) => {
            tracing::debug!(quiz_id = %id, error = %err, "Quiz action rejected");
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Html(render_step(&wizard, client, Some(&err))),
            )
                .into_response()
        }
    }
}

/// GET /quiz/:id/results - Recap of a submitted quiz.
pub async fn results_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ClientQuery>,
) -> Response {
    let client = query.client.as_deref();
    match state.quizzes.get(&id) {
        Some(wizard) => match wizard.submission() {
            Some(submission) => Html(render_results(submission, client)).into_response(),
            None => Redirect::to(&step_url(&id, client)).into_response(),
        },
        None => not_found_page(client),
    }
}

fn field_errors(err: Option<&QuizError>) -> &[FieldError] {
    match err {
        Some(QuizError::InvalidContact(fields)) => fields,
        _ => &[],
    }
}

fn field_message(errors: &[FieldError], field: ContactField) -> String {
    errors
        .iter()
        .find(|e| e.field == field)
        .map(|e| format!(r#"<span class="field-error">{}</span>"#, escape_html(&e.message)))
        .unwrap_or_default()
}

/// Render the current step of `wizard` as a full page.
#[must_use]
pub fn render_step(wizard: &QuizWizard, client: Option<&str>, err: Option<&QuizError>) -> String {
    let action = escape_html(&step_url(wizard.id(), client));
    let mut content = format!(
        r#"<section class="quiz narrow">
        <progress value="{:.0}" max="100"></progress>"#,
        wizard.progress()
    );

    if let Some(err) = err
        && !matches!(err, QuizError::InvalidContact(_))
    {
        let _ = write!(
            content,
            r#"<p class="error" role="alert">{}</p>"#,
            escape_html(&err.to_string())
        );
    }

    match wizard.step() {
        Step::Intro => {
            let _ = write!(
                content,
                r#"<h1>Free website analysis</h1>
        <p>Answer {} quick questions and we will tell you what to improve first.</p>
        <form method="post" action="{action}">
            <label for="url">Your website</label>
            <input id="url" name="url" type="text" placeholder="https://example.com" value="{}">
            <button name="action" value="start">Start analysis</button>
            <button name="action" value="no_site" class="link">I don't have a site yet</button>
        </form>"#,
                wizard.total_questions(),
                escape_html(wizard.site_url().unwrap_or_default()),
            );
        }
        Step::Question(i) => {
            let Some(question) = wizard.current_question() else {
                return html_shell("Website analysis", &content, client);
            };
            let _ = write!(
                content,
                r#"<p class="step">Question {i} of {}</p>
        <h1>{}</h1>
        <form method="post" action="{action}">"#,
                wizard.total_questions(),
                escape_html(&question.prompt),
            );
            for (n, option) in question.options.iter().enumerate() {
                let checked = if wizard.current_answer() == Some(option.as_str()) {
                    " checked"
                } else {
                    ""
                };
                let _ = write!(
                    content,
                    r#"
            <label><input type="radio" name="option" id="option-{n}" value="{}"{checked}> {}</label>"#,
                    escape_html(option),
                    escape_html(option),
                );
            }
            let _ = write!(
                content,
                r#"
            <button name="action" value="back" class="secondary">Back</button>
            <button name="action" value="next">{}</button>
        </form>"#,
                wizard.next_label()
            );
        }
        Step::ContactForm => {
            let errors = field_errors(err);
            let contact = wizard.contact();
            let _ = write!(
                content,
                r#"<h1>Where should we send your analysis?</h1>
        <form method="post" action="{action}">
            <label for="name">Name</label>
            <input id="name" name="name" type="text" value="{}" required>{}
            <label for="email">Email</label>
            <input id="email" name="email" type="email" value="{}" required>{}
            <label for="phone">Phone (optional)</label>
            <input id="phone" name="phone" type="tel" value="{}">{}
            <button name="action" value="back" class="secondary" formnovalidate>Back</button>
            <button name="action" value="submit">Send me the analysis</button>
        </form>"#,
                escape_html(&contact.name),
                field_message(errors, ContactField::Name),
                escape_html(&contact.email),
                field_message(errors, ContactField::Email),
                escape_html(&contact.phone),
                field_message(errors, ContactField::Phone),
            );
        }
    }

    content.push_str("</section>");
    html_shell("Website analysis", &content, client)
}

fn render_results(submission: &Submission, client: Option<&str>) -> String {
    let mut content = format!(
        r#"<section class="quiz narrow">
        <h1>Thanks, {}!</h1>
        <p>We will review {} and email your analysis to {}.</p>
        <dl>"#,
        escape_html(&submission.contact.name),
        submission
            .site_url
            .as_deref()
            .map_or_else(|| "your plans".to_string(), escape_html),
        escape_html(&submission.contact.email),
    );
    for answer in &submission.answers {
        let text = if answer.answer.is_empty() {
            "(skipped)"
        } else {
            answer.answer.as_str()
        };
        let _ = write!(
            content,
            "<dt>{}</dt><dd>{}</dd>",
            escape_html(&answer.question),
            escape_html(text)
        );
    }
    let _ = write!(
        content,
        r#"</dl><a class="button" href="{}">Back to the home page</a></section>"#,
        escape_html(&with_client("/", client))
    );
    html_shell("Your analysis is on its way", &content, client)
}
