//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::model::{AttemptError, QuestionError, TestId};

/// Errors emitted by `ApiClient`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("invalid api base url: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
    #[error("not authorized ({0}); the session token was cleared")]
    Unauthorized(reqwest::StatusCode),
    #[error("request failed with status {status}: {body}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl ApiError {
    /// HTTP status reported by the server, if the request got that far.
    #[must_use]
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            ApiError::Unauthorized(status) => Some(*status),
            ApiError::HttpStatus { status, .. } => Some(*status),
            ApiError::Http(err) => err.status(),
            ApiError::InvalidBaseUrl(_) => None,
        }
    }
}

/// Errors emitted by `AuthService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    #[error("email address cannot be empty")]
    EmptyEmail,
    #[error("name cannot be empty")]
    EmptyName,
    #[error("password is too weak: {0}")]
    WeakPassword(&'static str),
    #[error("one-time code cannot be empty")]
    EmptyOtp,
    #[error("server returned an empty access token")]
    EmptyToken,
    #[error("not logged in")]
    NotLoggedIn,
    #[error("access token could not be decoded: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Errors emitted while loading a test definition.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DefinitionError {
    #[error("test {0} was not found")]
    NotFound(TestId),
    #[error("test definition is invalid: {0}")]
    Invalid(#[from] QuestionError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Errors emitted when creating courses or tests.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthoringError {
    #[error("{0} cannot be empty")]
    Blank(&'static str),
    #[error("{field} must be a finite, non-negative number")]
    InvalidAmount { field: &'static str },
    #[error("passing marks ({passing}) cannot exceed total marks ({total})")]
    PassingAboveTotal { passing: f64, total: f64 },
    #[error("course image must be an image/* upload, got {0}")]
    NotAnImage(String),
    #[error("at least one chapter must be selected")]
    NoChapters,
    #[error("number of questions must be between 1 and 50, got {0}")]
    QuestionCount(u32),
    #[error("duration must be between 1 and 180 minutes, got {0}")]
    Duration(u32),
    #[error("a subjective test needs at least one question")]
    NoQuestions,
    #[error("question {number} has no text")]
    BlankQuestion { number: usize },
    #[error("question {number} must be worth at least one mark")]
    QuestionMarks { number: usize },
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Failure reported by the answer submission endpoint.
///
/// Recoverable: the attempt is left untouched and may be submitted again.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SubmissionError {
    #[error("submission rejected: {reason}")]
    Rejected { reason: String },
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl SubmissionError {
    /// Human-readable reason suitable for showing to the student.
    #[must_use]
    pub fn reason(&self) -> String {
        match self {
            SubmissionError::Rejected { reason } => reason.clone(),
            SubmissionError::Api(err) => err.to_string(),
        }
    }
}

/// Errors emitted by `AttemptService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AttemptServiceError {
    #[error(transparent)]
    Definition(#[from] DefinitionError),
    #[error(transparent)]
    Attempt(#[from] AttemptError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
}
