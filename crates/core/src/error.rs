use thiserror::Error;

use crate::model::{AttemptError, QuestionError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Attempt(#[from] AttemptError),
    #[error(transparent)]
    Question(#[from] QuestionError),
}
