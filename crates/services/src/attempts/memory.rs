use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use exam_core::model::{AnswerPair, AttemptId, TestDefinition, TestId};

use crate::error::{DefinitionError, SubmissionError};

use super::ports::{AnswerSubmissionEndpoint, TestDefinitionProvider};

/// In-memory provider and submission endpoint for tests and offline demos.
///
/// Accepted submissions are recorded in arrival order. Failures can be
/// queued with `fail_next_submission` to exercise the retry path.
#[derive(Clone, Default)]
pub struct InMemoryTestCatalog {
    definitions: Arc<Mutex<HashMap<TestId, TestDefinition>>>,
    submissions: Arc<Mutex<Vec<(AttemptId, Vec<AnswerPair>)>>>,
    queued_failures: Arc<Mutex<VecDeque<String>>>,
    fetches: Arc<Mutex<usize>>,
}

impl InMemoryTestCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, definition: TestDefinition) {
        lock(&self.definitions).insert(definition.id(), definition);
    }

    /// Make the next submission fail with `reason`.
    pub fn fail_next_submission(&self, reason: impl Into<String>) {
        lock(&self.queued_failures).push_back(reason.into());
    }

    #[must_use]
    pub fn submissions(&self) -> Vec<(AttemptId, Vec<AnswerPair>)> {
        lock(&self.submissions).clone()
    }

    /// Number of `fetch_definition` calls served so far.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        *lock(&self.fetches)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[async_trait]
impl TestDefinitionProvider for InMemoryTestCatalog {
    async fn fetch_definition(&self, test_id: TestId) -> Result<TestDefinition, DefinitionError> {
        *lock(&self.fetches) += 1;
        lock(&self.definitions)
            .get(&test_id)
            .cloned()
            .ok_or(DefinitionError::NotFound(test_id))
    }
}

#[async_trait]
impl AnswerSubmissionEndpoint for InMemoryTestCatalog {
    async fn submit_answers(
        &self,
        attempt_id: AttemptId,
        answers: &[AnswerPair],
    ) -> Result<(), SubmissionError> {
        if let Some(reason) = lock(&self.queued_failures).pop_front() {
            return Err(SubmissionError::Rejected { reason });
        }
        lock(&self.submissions).push((attempt_id, answers.to_vec()));
        Ok(())
    }
}
