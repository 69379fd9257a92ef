use async_trait::async_trait;

use exam_core::model::{AnswerPair, AttemptId, TestDefinition, TestId};

use crate::error::{DefinitionError, SubmissionError};

/// Source of test definitions. Read once per attempt.
#[async_trait]
pub trait TestDefinitionProvider: Send + Sync {
    /// Fetch the validated definition of a test.
    ///
    /// # Errors
    ///
    /// Returns `DefinitionError` if the test is missing, invalid or unreachable.
    async fn fetch_definition(&self, test_id: TestId) -> Result<TestDefinition, DefinitionError>;
}

/// Receiver of the final answers of an attempt.
///
/// `answers` is a set: implementations must not rely on its order.
#[async_trait]
pub trait AnswerSubmissionEndpoint: Send + Sync {
    /// Deliver the answers of `attempt_id`.
    ///
    /// # Errors
    ///
    /// Returns `SubmissionError` if the answers were rejected or could not be delivered.
    async fn submit_answers(
        &self,
        attempt_id: AttemptId,
        answers: &[AnswerPair],
    ) -> Result<(), SubmissionError>;
}
