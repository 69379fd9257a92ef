use std::collections::HashSet;

use thiserror::Error;

use crate::model::ids::{OptionId, QuestionId, TestId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Validation failures for question data crossing into the domain.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question {0} has no options")]
    NoOptions(QuestionId),

    #[error("question {question_id} lists option {option_id} more than once")]
    DuplicateOption {
        question_id: QuestionId,
        option_id: OptionId,
    },

    #[error("question {question_id} has an invalid marks value: {marks}")]
    InvalidMarks { question_id: QuestionId, marks: f64 },

    #[error("question {0} appears more than once in the test")]
    DuplicateQuestion(QuestionId),

    #[error("test title cannot be empty")]
    EmptyTitle,
}

//
// ─── OPTION ────────────────────────────────────────────────────────────────────
//

/// One selectable answer of an objective question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOption {
    id: OptionId,
    text: String,
}

impl AnswerOption {
    #[must_use]
    pub fn new(id: impl Into<OptionId>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &OptionId {
        &self.id
    }

    /// Display text; may embed markup that the presentation layer renders.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A single-select objective question.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    id: QuestionId,
    text: String,
    options: Vec<AnswerOption>,
    marks: f64,
}

impl Question {
    /// Creates a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::NoOptions` if `options` is empty,
    /// `QuestionError::DuplicateOption` if two options share an id, and
    /// `QuestionError::InvalidMarks` if `marks` is negative or not finite.
    pub fn new(
        id: QuestionId,
        text: impl Into<String>,
        options: Vec<AnswerOption>,
        marks: f64,
    ) -> Result<Self, QuestionError> {
        if options.is_empty() {
            return Err(QuestionError::NoOptions(id));
        }
        if !marks.is_finite() || marks < 0.0 {
            return Err(QuestionError::InvalidMarks {
                question_id: id,
                marks,
            });
        }

        {
            let mut seen = HashSet::with_capacity(options.len());
            for option in &options {
                if !seen.insert(option.id()) {
                    return Err(QuestionError::DuplicateOption {
                        question_id: id,
                        option_id: option.id().clone(),
                    });
                }
            }
        }

        Ok(Self {
            id,
            text: text.into(),
            options,
            marks,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[AnswerOption] {
        &self.options
    }

    /// Points awarded for a correct answer. Correctness is judged server-side.
    #[must_use]
    pub fn marks(&self) -> f64 {
        self.marks
    }

    #[must_use]
    pub fn has_option(&self, option_id: &OptionId) -> bool {
        self.options.iter().any(|option| option.id() == option_id)
    }

    /// Looks up an option by its position, as shown to the student (0-based).
    #[must_use]
    pub fn option_at(&self, index: usize) -> Option<&AnswerOption> {
        self.options.get(index)
    }
}

//
// ─── TEST DEFINITION ───────────────────────────────────────────────────────────
//

/// A test as delivered to a student: metadata plus the ordered question list.
#[derive(Debug, Clone, PartialEq)]
pub struct TestDefinition {
    id: TestId,
    title: String,
    description: Option<String>,
    time_limit_minutes: Option<u32>,
    total_marks: Option<f64>,
    questions: Vec<Question>,
}

impl TestDefinition {
    /// Assemble a test definition, rejecting duplicate question ids.
    ///
    /// An empty question list is accepted here; starting an attempt on it
    /// is what fails.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyTitle` for a blank title and
    /// `QuestionError::DuplicateQuestion` if a question id repeats.
    pub fn new(
        id: TestId,
        title: impl Into<String>,
        description: Option<String>,
        time_limit_minutes: Option<u32>,
        total_marks: Option<f64>,
        questions: Vec<Question>,
    ) -> Result<Self, QuestionError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(QuestionError::EmptyTitle);
        }

        let mut seen = HashSet::with_capacity(questions.len());
        for question in &questions {
            if !seen.insert(question.id()) {
                return Err(QuestionError::DuplicateQuestion(question.id()));
            }
        }

        Ok(Self {
            id,
            title,
            description,
            time_limit_minutes,
            total_marks,
            questions,
        })
    }

    #[must_use]
    pub fn id(&self) -> TestId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Advertised time limit. Informational only; nothing enforces it.
    #[must_use]
    pub fn time_limit_minutes(&self) -> Option<u32> {
        self.time_limit_minutes
    }

    /// Total marks as reported by the server, falling back to the sum of
    /// per-question marks.
    #[must_use]
    pub fn total_marks(&self) -> f64 {
        self.total_marks
            .unwrap_or_else(|| self.questions.iter().map(Question::marks).sum())
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn into_questions(self) -> Vec<Question> {
        self.questions
    }
}
