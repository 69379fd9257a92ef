#![forbid(unsafe_code)]

pub mod api;
pub mod app_services;
pub mod attempts;
pub mod auth_service;
pub mod authoring;
pub mod config;
pub mod course_service;
pub mod error;
pub mod test_service;

pub use exam_core::Clock;

pub use api::{ApiClient, AuthContext};
pub use app_services::AppServices;
pub use attempts::{
    AnswerSubmissionEndpoint, AttemptService, InMemoryTestCatalog, StartedAttempt,
    SubmissionReceipt, TestDefinitionProvider,
};
pub use auth_service::{AuthService, LoginOutcome, SessionUser, UserProfile};
pub use authoring::{
    Difficulty, ObjectiveTestDraft, SubjectiveAnswer, SubjectiveQuestionDraft, SubjectiveTestDraft,
};
pub use config::ClientConfig;
pub use course_service::{Course, CourseImage, CourseService, NewCourse};
pub use error::{
    ApiError, AttemptServiceError, AuthError, AuthoringError, DefinitionError, SubmissionError,
};
pub use test_service::{StudentAttempt, TestFilter, TestKind, TestService, TestSummary};
