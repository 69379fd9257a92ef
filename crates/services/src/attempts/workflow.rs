use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use exam_core::model::{AttemptId, AttemptSession, TestId};

use crate::Clock;
use crate::error::AttemptServiceError;

use super::ports::{AnswerSubmissionEndpoint, TestDefinitionProvider};

/// A freshly started attempt plus the test metadata shown alongside it.
#[derive(Debug, Clone)]
pub struct StartedAttempt {
    pub test_id: TestId,
    pub title: String,
    pub description: Option<String>,
    pub time_limit_minutes: Option<u32>,
    pub total_marks: f64,
    pub session: AttemptSession,
}

/// Acknowledgement of an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub attempt_id: AttemptId,
    pub answered: usize,
    pub submitted_at: DateTime<Utc>,
}

/// Orchestrates attempt start and answer submission against the collaborators.
#[derive(Clone)]
pub struct AttemptService {
    clock: Clock,
    definitions: Arc<dyn TestDefinitionProvider>,
    submissions: Arc<dyn AnswerSubmissionEndpoint>,
}

impl AttemptService {
    #[must_use]
    pub fn new(
        clock: Clock,
        definitions: Arc<dyn TestDefinitionProvider>,
        submissions: Arc<dyn AnswerSubmissionEndpoint>,
    ) -> Self {
        Self {
            clock,
            definitions,
            submissions,
        }
    }

    /// Clock used to stamp attempt start and submission times.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Load the test once and open an attempt over its questions.
    ///
    /// # Errors
    ///
    /// Returns `AttemptServiceError::Definition` if the test cannot be loaded
    /// and `AttemptServiceError::Attempt` if it has no questions.
    pub async fn start_attempt(
        &self,
        attempt_id: AttemptId,
        test_id: TestId,
    ) -> Result<StartedAttempt, AttemptServiceError> {
        let definition = self.definitions.fetch_definition(test_id).await?;
        let title = definition.title().to_string();
        let description = definition.description().map(str::to_string);
        let time_limit_minutes = definition.time_limit_minutes();
        let total_marks = definition.total_marks();

        let session =
            AttemptSession::start(attempt_id, definition.into_questions(), self.clock.now())?;
        info!(%attempt_id, %test_id, questions = session.len(), "attempt started");

        Ok(StartedAttempt {
            test_id,
            title,
            description,
            time_limit_minutes,
            total_marks,
            session,
        })
    }

    /// Send the current answers of `session` to the submission endpoint.
    ///
    /// Unanswered questions are simply left out and repeated calls are
    /// allowed. On failure the session is left exactly as it was.
    ///
    /// # Errors
    ///
    /// Returns `AttemptServiceError::Submission` when the endpoint rejects or
    /// cannot be reached.
    pub async fn submit(
        &self,
        session: &mut AttemptSession,
    ) -> Result<SubmissionReceipt, AttemptServiceError> {
        let attempt_id = session.attempt_id();
        let payload = session.submission_payload();

        if let Err(err) = self.submissions.submit_answers(attempt_id, &payload).await {
            warn!(%attempt_id, reason = %err.reason(), "submission failed");
            return Err(err.into());
        }

        let submitted_at = self.clock.now();
        session.record_submission(submitted_at);
        info!(%attempt_id, answered = payload.len(), "answers submitted");

        Ok(SubmissionReceipt {
            attempt_id,
            answered: payload.len(),
            submitted_at,
        })
    }
}
