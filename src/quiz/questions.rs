//! Quiz questions.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::QuizError;

/// A multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Stable identifier, used in submissions.
    pub id: String,
    /// Text shown to the visitor.
    pub prompt: String,
    /// Choices, in display order.
    pub options: Vec<String>,
}

impl Question {
    fn new(id: &str, prompt: &str, options: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            prompt: prompt.to_string(),
            options: options.iter().map(ToString::to_string).collect(),
        }
    }

    /// Whether `option` is one of the choices.
    #[must_use]
    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }
}

/// Ordered set of questions asked by the wizard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    /// Build a bank, rejecting unusable question sets.
    pub fn new(questions: Vec<Question>) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::Bank("at least one question is required".into()));
        }
        let mut ids = HashSet::new();
        for question in &questions {
            if question.id.trim().is_empty() || question.prompt.trim().is_empty() {
                return Err(QuizError::Bank("questions need an id and a prompt".into()));
            }
            if !ids.insert(question.id.as_str()) {
                return Err(QuizError::Bank(format!("duplicate question id '{}'", question.id)));
            }
            if question.options.len() < 2 {
                return Err(QuizError::Bank(format!(
                    "question '{}' needs at least two options",
                    question.id
                )));
            }
            let unique: HashSet<&String> = question.options.iter().collect();
            if unique.len() != question.options.len() {
                return Err(QuizError::Bank(format!(
                    "question '{}' has duplicate options",
                    question.id
                )));
            }
        }
        Ok(Self { questions })
    }

    /// The questions shipped with the site.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            questions: vec![
                Question::new(
                    "goal",
                    "What is the main goal of your website?",
                    &[
                        "Generate leads",
                        "Sell products online",
                        "Build brand awareness",
                        "Share information",
                    ],
                ),
                Question::new(
                    "traffic",
                    "How do most visitors find you today?",
                    &["Search engines", "Social media", "Paid ads", "Word of mouth"],
                ),
                Question::new(
                    "age",
                    "How old is your current website?",
                    &[
                        "Less than a year",
                        "One to three years",
                        "More than three years",
                        "We don't have one yet",
                    ],
                ),
                Question::new(
                    "budget",
                    "What is your monthly marketing budget?",
                    &["Under $500", "$500 to $2,000", "$2,000 to $10,000", "Over $10,000"],
                ),
                Question::new(
                    "timeline",
                    "When would you like to get started?",
                    &["Right away", "Within a month", "Within three months", "Just exploring"],
                ),
            ],
        }
    }

    /// Parse a bank from YAML (`questions: [{ id, prompt, options }]`).
    pub fn from_yaml(yaml: &str) -> Result<Self, QuizError> {
        let raw: Self = serde_yaml::from_str(yaml)?;
        Self::new(raw.questions)
    }

    /// Load a bank from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, QuizError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    /// Number of questions (`N`).
    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Always `false`; a bank holds at least one question.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Question `i`, 1-based like wizard steps.
    #[must_use]
    pub fn question(&self, i: usize) -> Option<&Question> {
        i.checked_sub(1).and_then(|idx| self.questions.get(idx))
    }

    /// All questions in order.
    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }
}

impl Default for QuestionBank {
    fn default() -> Self {
        Self::builtin()
    }
}
