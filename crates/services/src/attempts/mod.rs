mod memory;
mod ports;
mod workflow;

// Public API of the attempt subsystem.
pub use crate::error::AttemptServiceError;
pub use memory::InMemoryTestCatalog;
pub use ports::{AnswerSubmissionEndpoint, TestDefinitionProvider};
pub use workflow::{AttemptService, StartedAttempt, SubmissionReceipt};
