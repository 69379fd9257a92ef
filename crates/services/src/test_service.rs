use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use exam_core::model::{
    AnswerOption, AnswerPair, AttemptId, CourseId, OptionId, Question, QuestionError, QuestionId,
    TestDefinition, TestId, UserId,
};

use crate::api::ApiClient;
use crate::attempts::{AnswerSubmissionEndpoint, TestDefinitionProvider};
use crate::authoring::{
    ObjectiveTestDraft, SubjectiveAnswer, SubjectiveAnswersRequest, SubjectiveTestDraft,
};
use crate::error::{ApiError, AuthoringError, DefinitionError, SubmissionError};

//
// ─── CATALOGUE TYPES ───────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestKind {
    Objective,
    Subjective,
}

impl TestKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TestKind::Objective => "OBJECTIVE",
            TestKind::Subjective => "SUBJECTIVE",
        }
    }
}

/// Row of a test listing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSummary {
    pub id: TestId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<TestKind>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub course_id: Option<CourseId>,
    #[serde(default)]
    pub time_limit: Option<u32>,
    #[serde(default)]
    pub total_marks: Option<f64>,
}

/// Query filters for `TestService::list_tests`. Unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestFilter {
    pub course_id: Option<CourseId>,
    pub teacher_id: Option<UserId>,
    pub kind: Option<TestKind>,
    pub is_published: Option<bool>,
}

impl TestFilter {
    fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(course_id) = self.course_id {
            query.push(("courseId", course_id.to_string()));
        }
        if let Some(teacher_id) = self.teacher_id {
            query.push(("teacherId", teacher_id.to_string()));
        }
        if let Some(kind) = self.kind {
            query.push(("type", kind.as_str().to_string()));
        }
        if let Some(is_published) = self.is_published {
            query.push(("isPublished", is_published.to_string()));
        }
        query
    }
}

/// A past or in-progress attempt, as listed for a student or for a test.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAttempt {
    pub id: AttemptId,
    #[serde(default)]
    pub test_id: Option<TestId>,
    #[serde(default)]
    pub student_id: Option<UserId>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
}

//
// ─── WIRE TYPES ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TestDetailsDto {
    id: TestId,
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    time_limit: Option<u32>,
    #[serde(default)]
    total_marks: Option<f64>,
    #[serde(default)]
    questions: Vec<QuestionDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestionDto {
    id: QuestionId,
    question_text: String,
    #[serde(default)]
    options: Vec<OptionDto>,
    #[serde(default)]
    marks: f64,
    #[serde(default)]
    order: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OptionDto {
    id: RawOptionId,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawOptionId {
    Text(String),
    Number(i64),
}

impl From<RawOptionId> for OptionId {
    fn from(raw: RawOptionId) -> Self {
        match raw {
            RawOptionId::Text(text) => OptionId::new(text),
            RawOptionId::Number(number) => OptionId::new(number.to_string()),
        }
    }
}

impl TryFrom<TestDetailsDto> for TestDefinition {
    type Error = QuestionError;

    fn try_from(dto: TestDetailsDto) -> Result<Self, Self::Error> {
        let mut questions = dto.questions;
        // Stable sort keeps server order for questions without an explicit position.
        questions.sort_by_key(|q| q.order.unwrap_or(i64::MAX));

        let questions = questions
            .into_iter()
            .map(|q| {
                let options = q
                    .options
                    .into_iter()
                    .map(|o| AnswerOption::new(OptionId::from(o.id), o.text))
                    .collect();
                Question::new(q.id, q.question_text, options, q.marks)
            })
            .collect::<Result<Vec<_>, _>>()?;

        TestDefinition::new(
            dto.id,
            dto.title,
            dto.description,
            dto.time_limit,
            dto.total_marks,
            questions,
        )
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StartAttemptRequest {
    student_id: UserId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartAttemptResponse {
    attempt_id: AttemptId,
}

#[derive(Debug, Serialize)]
struct ObjectiveAnswersRequest<'a> {
    answers: Vec<ObjectiveAnswer<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ObjectiveAnswer<'a> {
    objective_question_id: QuestionId,
    selected_option_original_id: &'a str,
}

impl<'a> ObjectiveAnswersRequest<'a> {
    fn from_pairs(pairs: &'a [AnswerPair]) -> Self {
        Self {
            answers: pairs
                .iter()
                .map(|pair| ObjectiveAnswer {
                    objective_question_id: pair.question_id,
                    selected_option_original_id: pair.option_id.as_str(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TeacherRequest {
    teacher_id: UserId,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Test catalogue, authoring and attempt endpoints.
#[derive(Clone, Debug)]
pub struct TestService {
    api: ApiClient,
}

impl TestService {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Fetch and validate a test definition.
    ///
    /// # Errors
    ///
    /// Returns `DefinitionError::NotFound` on 404, `DefinitionError::Invalid`
    /// if the payload fails validation, or `DefinitionError::Api`.
    pub async fn get_test(
        &self,
        test_id: TestId,
        with_solutions: bool,
    ) -> Result<TestDefinition, DefinitionError> {
        let path = format!("/tests/{test_id}");
        let dto: TestDetailsDto = self
            .api
            .get_json(&path, &[("withSolutions", with_solutions.to_string())])
            .await
            .map_err(|err| match err.status() {
                Some(StatusCode::NOT_FOUND) => DefinitionError::NotFound(test_id),
                _ => DefinitionError::Api(err),
            })?;
        debug!(%test_id, questions = dto.questions.len(), "fetched test definition");
        Ok(TestDefinition::try_from(dto)?)
    }

    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    pub async fn list_tests(&self, filter: &TestFilter) -> Result<Vec<TestSummary>, ApiError> {
        self.api.get_json("/tests", &filter.query()).await
    }

    /// Open a new attempt for `student_id` and return its id.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    pub async fn start_attempt(
        &self,
        test_id: TestId,
        student_id: UserId,
    ) -> Result<AttemptId, ApiError> {
        let path = format!("/tests/{test_id}/attempt");
        let response: StartAttemptResponse = self
            .api
            .post_json(&path, &StartAttemptRequest { student_id })
            .await?;
        Ok(response.attempt_id)
    }

    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    pub async fn submit_objective_answers(
        &self,
        attempt_id: AttemptId,
        answers: &[AnswerPair],
    ) -> Result<(), ApiError> {
        let path = format!("/tests/attempts/{attempt_id}/objective-answers");
        self.api
            .post_unit(&path, &ObjectiveAnswersRequest::from_pairs(answers))
            .await
    }

    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    pub async fn student_attempts(
        &self,
        student_id: UserId,
    ) -> Result<Vec<StudentAttempt>, ApiError> {
        let path = format!("/tests/student/{student_id}/attempts");
        self.api.get_json(&path, &[]).await
    }

    /// Tests authored by `teacher_id`, published or not.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    pub async fn tests_for_teacher(&self, teacher_id: UserId) -> Result<Vec<TestSummary>, ApiError> {
        let path = format!("/tests/teacher/{teacher_id}");
        self.api.get_json(&path, &[]).await
    }

    /// Every attempt made on one of the teacher's tests.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    pub async fn test_attempts(
        &self,
        test_id: TestId,
        teacher_id: UserId,
    ) -> Result<Vec<StudentAttempt>, ApiError> {
        let path = format!("/tests/{test_id}/attempts");
        self.api
            .get_json(&path, &[("teacherId", teacher_id.to_string())])
            .await
    }

    /// Ask the server to assemble an objective test from question-bank chapters.
    ///
    /// # Errors
    ///
    /// Returns `AuthoringError` if the draft is invalid or the request fails.
    pub async fn create_objective_test(
        &self,
        draft: &ObjectiveTestDraft,
    ) -> Result<(), AuthoringError> {
        draft.validate()?;
        self.api.post_unit("/tests/objective", draft).await?;
        info!(course_id = %draft.course_id, questions = draft.number_of_questions, "objective test created");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `AuthoringError` if the draft is invalid or the request fails.
    pub async fn create_subjective_test(
        &self,
        draft: &SubjectiveTestDraft,
    ) -> Result<(), AuthoringError> {
        let request = draft.to_request()?;
        self.api.post_unit("/tests/subjective", &request).await?;
        info!(course_id = %draft.course_id, questions = draft.questions.len(), "subjective test created");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    pub async fn delete_test(&self, test_id: TestId, teacher_id: UserId) -> Result<(), ApiError> {
        let path = format!("/tests/{test_id}");
        self.api
            .delete_unit(&path, &TeacherRequest { teacher_id })
            .await?;
        info!(%test_id, "test deleted");
        Ok(())
    }

    /// Send the written answers of a subjective attempt. They are graded
    /// later by the teacher.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    pub async fn submit_subjective_answers(
        &self,
        attempt_id: AttemptId,
        answers: &[SubjectiveAnswer],
    ) -> Result<(), ApiError> {
        let path = format!("/tests/attempts/{attempt_id}/subjective-answers");
        self.api
            .post_unit(&path, &SubjectiveAnswersRequest::from_answers(answers))
            .await
    }

    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    pub async fn publish(&self, test_id: TestId, teacher_id: UserId) -> Result<(), ApiError> {
        let path = format!("/tests/{test_id}/publish");
        self.api
            .patch_unit(&path, &TeacherRequest { teacher_id })
            .await
    }

    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    pub async fn unpublish(&self, test_id: TestId, teacher_id: UserId) -> Result<(), ApiError> {
        let path = format!("/tests/{test_id}/unpublish");
        self.api
            .patch_unit(&path, &TeacherRequest { teacher_id })
            .await
    }
}

#[async_trait]
impl TestDefinitionProvider for TestService {
    async fn fetch_definition(&self, test_id: TestId) -> Result<TestDefinition, DefinitionError> {
        self.get_test(test_id, false).await
    }
}

#[async_trait]
impl AnswerSubmissionEndpoint for TestService {
    async fn submit_answers(
        &self,
        attempt_id: AttemptId,
        answers: &[AnswerPair],
    ) -> Result<(), SubmissionError> {
        self.submit_objective_answers(attempt_id, answers)
            .await
            .map_err(|err| match err {
                ApiError::HttpStatus { status, body } if status.is_client_error() => {
                    SubmissionError::Rejected {
                        reason: if body.trim().is_empty() {
                            status.to_string()
                        } else {
                            body
                        },
                    }
                }
                other => SubmissionError::Api(other),
            })
    }
}
