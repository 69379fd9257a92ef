use std::sync::Arc;

use crate::Clock;
use crate::api::{ApiClient, AuthContext};
use crate::attempts::{AnswerSubmissionEndpoint, AttemptService, TestDefinitionProvider};
use crate::auth_service::AuthService;
use crate::config::ClientConfig;
use crate::course_service::CourseService;
use crate::error::ApiError;
use crate::test_service::TestService;

/// Assembles the API-backed services around one shared `AuthContext`.
#[derive(Clone)]
pub struct AppServices {
    auth: Arc<AuthService>,
    courses: Arc<CourseService>,
    tests: Arc<TestService>,
    attempts: Arc<AttemptService>,
}

impl AppServices {
    /// Build services talking to the REST API described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig, auth: AuthContext, clock: Clock) -> Result<Self, ApiError> {
        let api = ApiClient::new(config, auth)?;
        let tests = Arc::new(TestService::new(api.clone()));
        let definitions: Arc<dyn TestDefinitionProvider> = tests.clone();
        let submissions: Arc<dyn AnswerSubmissionEndpoint> = tests.clone();
        let attempts = Arc::new(AttemptService::new(clock, definitions, submissions));

        Ok(Self {
            auth: Arc::new(AuthService::new(api.clone())),
            courses: Arc::new(CourseService::new(api)),
            tests,
            attempts,
        })
    }

    #[must_use]
    pub fn auth(&self) -> Arc<AuthService> {
        Arc::clone(&self.auth)
    }

    #[must_use]
    pub fn courses(&self) -> Arc<CourseService> {
        Arc::clone(&self.courses)
    }

    #[must_use]
    pub fn tests(&self) -> Arc<TestService> {
        Arc::clone(&self.tests)
    }

    #[must_use]
    pub fn attempts(&self) -> Arc<AttemptService> {
        Arc::clone(&self.attempts)
    }
}
