//! Quiz wizard state machine.
//!
//! Steps are indexed `0..=N+1`: `0` captures the site URL, `1..=N` are the
//! questions, `N+1` is the contact form. Moves are strictly linear; the step
//! never leaves that range whatever sequence of actions is applied.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::questions::{Question, QuestionBank};
use super::{ContactField, FieldError, QuizError};

/// Where the wizard is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// URL capture (index 0).
    Intro,
    /// Question `i`, 1-based.
    Question(usize),
    /// Contact form (index `N + 1`).
    ContactForm,
}

impl Step {
    /// Short name used in API payloads.
    #[must_use]
    pub fn kind(self) -> &'static str {
        match self {
            Self::Intro => "intro",
            Self::Question(_) => "question",
            Self::ContactForm => "contact",
        }
    }
}

/// Guards applied to forward transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizPolicy {
    /// `next` on a question requires an answer.
    pub require_answers: bool,
}

impl Default for QuizPolicy {
    fn default() -> Self {
        Self {
            require_answers: true,
        }
    }
}

/// Contact details typed into the last step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    /// Full name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Phone number, optional.
    pub phone: String,
}

impl UserInfo {
    fn field_mut(&mut self, field: ContactField) -> &mut String {
        match field {
            ContactField::Name => &mut self.name,
            ContactField::Email => &mut self.email,
            ContactField::Phone => &mut self.phone,
        }
    }

    fn trimmed(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self.phone.trim().to_string(),
        }
    }

    /// Check that the details are usable for a follow-up.
    ///
    /// Name and email are required; the phone is optional but must look like
    /// a phone number when given.
    #[must_use]
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        let name = self.name.trim();
        if name.is_empty() {
            errors.push(FieldError::new(ContactField::Name, "Please tell us your name."));
        } else if name.chars().count() > 100 {
            errors.push(FieldError::new(ContactField::Name, "Name is too long."));
        }
        if !is_plausible_email(self.email.trim()) {
            errors.push(FieldError::new(
                ContactField::Email,
                "Please enter a valid email address.",
            ));
        }
        let phone = self.phone.trim();
        if !phone.is_empty() && !is_plausible_phone(phone) {
            errors.push(FieldError::new(
                ContactField::Phone,
                "Please enter a valid phone number.",
            ));
        }
        errors
    }
}

fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

fn is_plausible_phone(phone: &str) -> bool {
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    (7..=15).contains(&digits)
        && phone
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')' | '.'))
}

/// A question and the answer given to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnsweredQuestion {
    /// Question id.
    pub question_id: String,
    /// Question text.
    pub question: String,
    /// Chosen option; empty when the question was skipped.
    pub answer: String,
}

/// Everything collected by a completed wizard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    /// Wizard id.
    pub quiz_id: String,
    /// Site URL, absent when the visitor has no site.
    pub site_url: Option<String>,
    /// Answers in question order.
    pub answers: Vec<AnsweredQuestion>,
    /// Contact details, trimmed.
    pub contact: UserInfo,
    /// Submission time.
    pub submitted_at: DateTime<Utc>,
}

/// One visitor's pass through the quiz.
#[derive(Debug, Clone)]
pub struct QuizWizard {
    id: String,
    bank: Arc<QuestionBank>,
    policy: QuizPolicy,
    step: usize,
    site_url: Option<String>,
    answers: Vec<Option<String>>,
    contact: UserInfo,
    submission: Option<Submission>,
}

impl QuizWizard {
    /// Start a wizard at the intro step.
    #[must_use]
    pub fn new(bank: Arc<QuestionBank>, policy: QuizPolicy) -> Self {
        let answers = vec![None; bank.len()];
        Self {
            id: Uuid::new_v4().to_string(),
            bank,
            policy,
            step: 0,
            site_url: None,
            answers,
            contact: UserInfo::default(),
            submission: None,
        }
    }

    /// Wizard id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Number of questions (`N`).
    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.bank.len()
    }

    /// Current step index in `0..=N+1`.
    #[must_use]
    pub fn step_index(&self) -> usize {
        self.step
    }

    /// Current step.
    #[must_use]
    pub fn step(&self) -> Step {
        match self.step {
            0 => Step::Intro,
            i if i <= self.total_questions() => Step::Question(i),
            _ => Step::ContactForm,
        }
    }

    /// Completion percentage: `(step + 1) / (N + 2) * 100`.
    #[must_use]
    pub fn progress(&self) -> f64 {
        progress(self.step, self.total_questions())
    }

    /// Question shown at the current step.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        match self.step() {
            Step::Question(i) => self.bank.question(i),
            _ => None,
        }
    }

    /// Answer recorded for the current question.
    #[must_use]
    pub fn current_answer(&self) -> Option<&str> {
        match self.step() {
            Step::Question(i) => self.answers[i - 1].as_deref(),
            _ => None,
        }
    }

    /// All answer slots in question order.
    #[must_use]
    pub fn answers(&self) -> &[Option<String>] {
        &self.answers
    }

    /// Site URL captured at the intro.
    #[must_use]
    pub fn site_url(&self) -> Option<&str> {
        self.site_url.as_deref()
    }

    /// Contact details typed so far.
    #[must_use]
    pub fn contact(&self) -> &UserInfo {
        &self.contact
    }

    /// Label of the forward button: "Finish" on the last question.
    #[must_use]
    pub fn next_label(&self) -> &'static str {
        if self.step == self.total_questions() {
            "Finish"
        } else {
            "Next"
        }
    }

    /// The submission, once the wizard is complete.
    #[must_use]
    pub fn submission(&self) -> Option<&Submission> {
        self.submission.as_ref()
    }

    /// Whether the wizard was submitted.
    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.submission.is_some()
    }

    fn ensure_open(&self) -> Result<(), QuizError> {
        if self.is_submitted() {
            Err(QuizError::AlreadySubmitted)
        } else {
            Ok(())
        }
    }

    fn invalid(&self, action: &'static str) -> QuizError {
        QuizError::InvalidTransition {
            action,
            step: self.step,
        }
    }

    /// "Start analysis": record the URL (empty is accepted) and go to question 1.
    pub fn start(&mut self, url: Option<&str>) -> Result<(), QuizError> {
        self.ensure_open()?;
        if self.step() != Step::Intro {
            return Err(self.invalid("start"));
        }
        self.site_url = url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(ToString::to_string);
        self.step = 1;
        Ok(())
    }

    /// "No site yet": go to question 1 without a URL.
    pub fn start_without_site(&mut self) -> Result<(), QuizError> {
        self.start(None)
    }

    /// Record `option` for the current question, replacing any earlier answer.
    pub fn select(&mut self, option: &str) -> Result<(), QuizError> {
        self.ensure_open()?;
        let Step::Question(i) = self.step() else {
            return Err(self.invalid("select"));
        };
        let question = self
            .bank
            .question(i)
            .ok_or_else(|| self.invalid("select"))?;
        if !question.has_option(option) {
            return Err(QuizError::UnknownOption {
                option: option.to_string(),
            });
        }
        self.answers[i - 1] = Some(option.to_string());
        Ok(())
    }

    /// Move forward one question, or to the contact form after the last one.
    pub fn next(&mut self) -> Result<(), QuizError> {
        self.ensure_open()?;
        let Step::Question(i) = self.step() else {
            return Err(self.invalid("next"));
        };
        if self.policy.require_answers && self.answers[i - 1].is_none() {
            return Err(QuizError::Unanswered { question: i });
        }
        self.step += 1;
        Ok(())
    }

    /// Move back one step. Does nothing on the first question or the intro.
    pub fn back(&mut self) -> Result<(), QuizError> {
        self.ensure_open()?;
        if self.step > 1 {
            self.step -= 1;
        }
        Ok(())
    }

    /// Update one contact field.
    pub fn set_contact(&mut self, field: ContactField, value: &str) -> Result<(), QuizError> {
        self.ensure_open()?;
        if self.step() != Step::ContactForm {
            return Err(self.invalid("contact"));
        }
        let slot = self.contact.field_mut(field);
        slot.clear();
        slot.push_str(value);
        Ok(())
    }

    /// Submit the wizard.
    ///
    /// Only possible from the contact form with valid contact details. The
    /// wizard is frozen afterwards.
    pub fn submit(&mut self) -> Result<Submission, QuizError> {
        self.ensure_open()?;
        if self.step() != Step::ContactForm {
            return Err(self.invalid("submit"));
        }
        let errors = self.contact.validate();
        if !errors.is_empty() {
            return Err(QuizError::InvalidContact(errors));
        }

        let answers = self
            .bank
            .questions()
            .iter()
            .zip(&self.answers)
            .map(|(question, answer)| AnsweredQuestion {
                question_id: question.id.clone(),
                question: question.prompt.clone(),
                answer: answer.clone().unwrap_or_default(),
            })
            .collect();

        let submission = Submission {
            quiz_id: self.id.clone(),
            site_url: self.site_url.clone(),
            answers,
            contact: self.contact.trimmed(),
            submitted_at: Utc::now(),
        };
        let answers = serde_json::to_string(&submission.answers).unwrap_or_default();
        tracing::info!(
            name: "quiz.submitted",
            quiz_id = %submission.quiz_id,
            site_url = submission.site_url.as_deref().unwrap_or("-"),
            contact_name = %submission.contact.name,
            contact_email = %submission.contact.email,
            contact_phone = %submission.contact.phone,
            answers = %answers,
            answered = submission.answers.iter().filter(|a| !a.answer.is_empty()).count(),
            "Quiz submitted"
        );
        metrics::counter!("quiz_submissions_total").increment(1);

        self.submission = Some(submission.clone());
        Ok(submission)
    }

    /// Apply one visitor action.
    ///
    /// A rejected action leaves the wizard unchanged, except that contact
    /// fields sent along with a failed submit are kept so the form can be
    /// shown again with what the visitor typed.
    pub fn apply(&mut self, action: QuizAction) -> Result<Option<Submission>, QuizError> {
        match action {
            QuizAction::Start { url } => self.start(url.as_deref()).map(|()| None),
            QuizAction::NoSite => self.start_without_site().map(|()| None),
            QuizAction::Select { option } => self.select(&option).map(|()| None),
            QuizAction::Next => self.next().map(|()| None),
            QuizAction::Back => self.back().map(|()| None),
            QuizAction::Contact(update) => self.apply_contact(update).map(|()| None),
            QuizAction::Submit(update) => {
                self.apply_contact(update)?;
                self.submit().map(Some)
            }
        }
    }

    fn apply_contact(&mut self, update: ContactUpdate) -> Result<(), QuizError> {
        for (field, value) in update.fields() {
            self.set_contact(field, &value)?;
        }
        Ok(())
    }
}

/// Progress percentage for `step` out of `N + 2` screens.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn progress(step: usize, total_questions: usize) -> f64 {
    (step as f64 + 1.0) / (total_questions as f64 + 2.0) * 100.0
}

/// Contact fields sent together; absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ContactUpdate {
    /// New name.
    pub name: Option<String>,
    /// New email.
    pub email: Option<String>,
    /// New phone.
    pub phone: Option<String>,
}

impl ContactUpdate {
    fn fields(self) -> impl Iterator<Item = (ContactField, String)> {
        [
            (ContactField::Name, self.name),
            (ContactField::Email, self.email),
            (ContactField::Phone, self.phone),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.map(|v| (field, v)))
    }

    /// Whether no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.phone.is_none()
    }
}

/// A visitor action on the wizard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizAction {
    /// "Start analysis" with an optional URL.
    Start {
        /// URL typed at the intro.
        url: Option<String>,
    },
    /// "No site yet".
    NoSite,
    /// Pick an option on the current question.
    Select {
        /// The chosen option.
        option: String,
    },
    /// Forward button.
    Next,
    /// Back button.
    Back,
    /// Edit contact fields.
    Contact(ContactUpdate),
    /// Edit contact fields, then submit.
    Submit(ContactUpdate),
}

/// Flat action payload, as posted by the quiz forms and the JSON API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuizForm {
    /// `start`, `no_site`, `select`, `next`, `back`, `contact` or `submit`.
    pub action: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub option: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl TryFrom<QuizForm> for QuizAction {
    type Error = QuizError;

    fn try_from(form: QuizForm) -> Result<Self, Self::Error> {
        let contact = ContactUpdate {
            name: form.name,
            email: form.email,
            phone: form.phone,
        };
        match form.action.trim() {
            "start" => Ok(Self::Start { url: form.url }),
            "no_site" => Ok(Self::NoSite),
            "select" => form
                .option
                .map(|option| Self::Select { option })
                .ok_or(QuizError::MissingField("option")),
            "next" => Ok(Self::Next),
            "back" => Ok(Self::Back),
            "contact" => Ok(Self::Contact(contact)),
            "submit" => Ok(Self::Submit(contact)),
            other => Err(QuizError::UnknownAction(other.to_string())),
        }
    }
}
