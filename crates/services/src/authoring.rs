//! Drafts for teacher-authored tests and the answer sheets of subjective attempts.
//!
//! Each draft is checked before it leaves the client so obviously broken
//! forms never reach the API.

use serde::Serialize;

use exam_core::model::{CourseId, QuestionId, UserId};

use crate::error::AuthoringError;

pub(crate) const MAX_GENERATED_QUESTIONS: u32 = 50;
pub(crate) const MAX_DURATION_MINUTES: u32 = 180;

pub(crate) fn non_blank<'a>(value: &'a str, field: &'static str) -> Result<&'a str, AuthoringError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(AuthoringError::Blank(field))
    } else {
        Ok(trimmed)
    }
}

fn amount(value: f64, minimum: f64, field: &'static str) -> Result<f64, AuthoringError> {
    if value.is_finite() && value >= minimum {
        Ok(value)
    } else {
        Err(AuthoringError::InvalidAmount { field })
    }
}

fn passing_within_total(passing: f64, total: f64) -> Result<(), AuthoringError> {
    if passing > total {
        return Err(AuthoringError::PassingAboveTotal { passing, total });
    }
    Ok(())
}

//
// ─── OBJECTIVE ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// Objective test generated server-side from question-bank chapters.
///
/// Serialized as-is; unset optional fields are left out of the body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectiveTestDraft {
    pub course_id: CourseId,
    pub chapter_ids: Vec<u64>,
    pub exam_type_id: u64,
    pub teacher_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    pub number_of_questions: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_marks: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passing_marks: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<u32>,
}

impl ObjectiveTestDraft {
    /// # Errors
    ///
    /// Returns `AuthoringError` when no chapter is selected, the question
    /// count is outside 1..=50, or the marks are negative or inconsistent.
    pub fn validate(&self) -> Result<(), AuthoringError> {
        if self.chapter_ids.is_empty() {
            return Err(AuthoringError::NoChapters);
        }
        if !(1..=MAX_GENERATED_QUESTIONS).contains(&self.number_of_questions) {
            return Err(AuthoringError::QuestionCount(self.number_of_questions));
        }
        if let Some(total) = self.total_marks {
            amount(total, 0.0, "total marks")?;
        }
        if let Some(passing) = self.passing_marks {
            amount(passing, 0.0, "passing marks")?;
        }
        if let (Some(passing), Some(total)) = (self.passing_marks, self.total_marks) {
            passing_within_total(passing, total)?;
        }
        Ok(())
    }
}

//
// ─── SUBJECTIVE ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq)]
pub struct SubjectiveQuestionDraft {
    pub text: String,
    pub marks: f64,
}

/// Free-text test written question by question by the teacher.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectiveTestDraft {
    pub title: String,
    pub description: Option<String>,
    pub duration_minutes: u32,
    pub course_id: CourseId,
    pub teacher_id: UserId,
    pub total_marks: f64,
    pub passing_marks: f64,
    pub questions: Vec<SubjectiveQuestionDraft>,
}

impl SubjectiveTestDraft {
    /// Validate and build the request body. Questions are numbered from 1
    /// in list order.
    ///
    /// # Errors
    ///
    /// Returns `AuthoringError` for a blank title or question, a duration
    /// outside 1..=180 minutes, marks below the minimum, or passing marks
    /// above the total.
    pub(crate) fn to_request(&self) -> Result<SubjectiveTestRequest<'_>, AuthoringError> {
        let title = non_blank(&self.title, "title")?;
        if !(1..=MAX_DURATION_MINUTES).contains(&self.duration_minutes) {
            return Err(AuthoringError::Duration(self.duration_minutes));
        }
        let total_marks = amount(self.total_marks, 1.0, "total marks")?;
        let passing_marks = amount(self.passing_marks, 0.0, "passing marks")?;
        passing_within_total(passing_marks, total_marks)?;
        if self.questions.is_empty() {
            return Err(AuthoringError::NoQuestions);
        }

        let questions = self
            .questions
            .iter()
            .enumerate()
            .map(|(index, question)| {
                let number = index + 1;
                let text = question.text.trim();
                if text.is_empty() {
                    return Err(AuthoringError::BlankQuestion { number });
                }
                if !question.marks.is_finite() || question.marks < 1.0 {
                    return Err(AuthoringError::QuestionMarks { number });
                }
                Ok(SubjectiveQuestionRequest {
                    text,
                    order: number,
                    marks: question.marks,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SubjectiveTestRequest {
            title,
            description: self.description.as_deref().map(str::trim),
            duration: self.duration_minutes,
            course_id: self.course_id,
            teacher_id: self.teacher_id,
            total_marks,
            passing_marks,
            questions,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubjectiveTestRequest<'a> {
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    duration: u32,
    course_id: CourseId,
    teacher_id: UserId,
    total_marks: f64,
    passing_marks: f64,
    questions: Vec<SubjectiveQuestionRequest<'a>>,
}

#[derive(Debug, Serialize)]
struct SubjectiveQuestionRequest<'a> {
    text: &'a str,
    order: usize,
    marks: f64,
}

/// Written answer to one subjective question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectiveAnswer {
    pub question_id: QuestionId,
    pub answer_text: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubjectiveAnswersRequest<'a> {
    answers: Vec<SubjectiveAnswerRequest<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubjectiveAnswerRequest<'a> {
    subjective_question_id: QuestionId,
    answer_text: &'a str,
}

impl<'a> SubjectiveAnswersRequest<'a> {
    pub(crate) fn from_answers(answers: &'a [SubjectiveAnswer]) -> Self {
        Self {
            answers: answers
                .iter()
                .map(|answer| SubjectiveAnswerRequest {
                    subjective_question_id: answer.question_id,
                    answer_text: &answer.answer_text,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn objective() -> ObjectiveTestDraft {
        ObjectiveTestDraft {
            course_id: CourseId::new(3),
            chapter_ids: vec![10, 11],
            exam_type_id: 2,
            teacher_id: UserId::new(8),
            difficulty: Some(Difficulty::Medium),
            number_of_questions: 20,
            title: Some("Unit test 1".into()),
            description: None,
            total_marks: Some(80.0),
            passing_marks: Some(32.0),
            time_limit: Some(45),
        }
    }

    fn subjective() -> SubjectiveTestDraft {
        SubjectiveTestDraft {
            title: " Essay round ".into(),
            description: Some("Answer any two".into()),
            duration_minutes: 60,
            course_id: CourseId::new(3),
            teacher_id: UserId::new(8),
            total_marks: 20.0,
            passing_marks: 8.0,
            questions: vec![
                SubjectiveQuestionDraft {
                    text: " Explain inertia. ".into(),
                    marks: 10.0,
                },
                SubjectiveQuestionDraft {
                    text: "Derive v = u + at.".into(),
                    marks: 10.0,
                },
            ],
        }
    }

    #[test]
    fn objective_draft_body_matches_api_contract() {
        let draft = objective();
        draft.validate().unwrap();
        assert_eq!(
            serde_json::to_value(&draft).unwrap(),
            json!({
                "courseId": 3,
                "chapterIds": [10, 11],
                "examTypeId": 2,
                "teacherId": 8,
                "difficulty": "medium",
                "numberOfQuestions": 20,
                "title": "Unit test 1",
                "totalMarks": 80.0,
                "passingMarks": 32.0,
                "timeLimit": 45
            })
        );
    }

    #[test]
    fn objective_draft_limits() {
        let mut draft = objective();
        draft.chapter_ids.clear();
        assert!(matches!(draft.validate(), Err(AuthoringError::NoChapters)));

        let mut draft = objective();
        draft.number_of_questions = 51;
        assert!(matches!(draft.validate(), Err(AuthoringError::QuestionCount(51))));

        let mut draft = objective();
        draft.passing_marks = Some(90.0);
        assert!(matches!(
            draft.validate(),
            Err(AuthoringError::PassingAboveTotal { .. })
        ));
    }

    #[test]
    fn subjective_body_numbers_questions_in_order() {
        let draft = subjective();
        let body = serde_json::to_value(draft.to_request().unwrap()).unwrap();
        assert_eq!(
            body,
            json!({
                "title": "Essay round",
                "description": "Answer any two",
                "duration": 60,
                "courseId": 3,
                "teacherId": 8,
                "totalMarks": 20.0,
                "passingMarks": 8.0,
                "questions": [
                    {"text": "Explain inertia.", "order": 1, "marks": 10.0},
                    {"text": "Derive v = u + at.", "order": 2, "marks": 10.0}
                ]
            })
        );
    }

    #[test]
    fn subjective_draft_rejects_broken_forms() {
        let mut draft = subjective();
        draft.duration_minutes = 181;
        assert!(matches!(draft.to_request(), Err(AuthoringError::Duration(181))));

        let mut draft = subjective();
        draft.passing_marks = 25.0;
        assert!(matches!(
            draft.to_request(),
            Err(AuthoringError::PassingAboveTotal { .. })
        ));

        let mut draft = subjective();
        draft.questions[1].text = "   ".into();
        assert!(matches!(
            draft.to_request(),
            Err(AuthoringError::BlankQuestion { number: 2 })
        ));

        let mut draft = subjective();
        draft.questions[0].marks = 0.5;
        assert!(matches!(
            draft.to_request(),
            Err(AuthoringError::QuestionMarks { number: 1 })
        ));

        let mut draft = subjective();
        draft.questions.clear();
        assert!(matches!(draft.to_request(), Err(AuthoringError::NoQuestions)));
    }

    #[test]
    fn subjective_answers_body_matches_api_contract() {
        let answers = vec![SubjectiveAnswer {
            question_id: QuestionId::new(4),
            answer_text: "Objects resist changes in motion.".into(),
        }];
        assert_eq!(
            serde_json::to_value(SubjectiveAnswersRequest::from_answers(&answers)).unwrap(),
            json!({"answers": [
                {"subjectiveQuestionId": 4, "answerText": "Objects resist changes in motion."}
            ]})
        );
    }
}
