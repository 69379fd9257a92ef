use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{AttemptId, OptionId, QuestionId};
use crate::model::question::Question;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Errors raised by attempt operations. All of them point at a caller bug
/// or stale data; none mutate the attempt.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("an attempt needs at least one question")]
    Empty,

    #[error("question index {index} is out of range for {len} questions")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("question {0} is not part of this attempt")]
    UnknownQuestion(QuestionId),

    #[error("question {0} appears more than once in the attempt")]
    DuplicateQuestion(QuestionId),

    #[error("option {option_id} does not belong to question {question_id}")]
    UnknownOption {
        question_id: QuestionId,
        option_id: OptionId,
    },
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Per-question palette state shown to the student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionStatus {
    /// Never shown to the student.
    NotVisited,
    /// Shown, but no option is selected.
    NotAnswered,
    /// An option is selected.
    Answered,
    /// Flagged for review; may or may not carry an answer.
    Marked,
}

impl QuestionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionStatus::NotVisited => "not_visited",
            QuestionStatus::NotAnswered => "not_answered",
            QuestionStatus::Answered => "answered",
            QuestionStatus::Marked => "marked",
        }
    }
}

impl fmt::Display for QuestionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Count of questions in each status. The four counts always add up to the
/// number of questions in the attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AttemptStats {
    pub not_visited: usize,
    pub not_answered: usize,
    pub answered: usize,
    pub marked: usize,
}

impl AttemptStats {
    #[must_use]
    pub fn total(&self) -> usize {
        self.not_visited + self.not_answered + self.answered + self.marked
    }

    fn bump(&mut self, status: QuestionStatus) {
        match status {
            QuestionStatus::NotVisited => self.not_visited += 1,
            QuestionStatus::NotAnswered => self.not_answered += 1,
            QuestionStatus::Answered => self.answered += 1,
            QuestionStatus::Marked => self.marked += 1,
        }
    }
}

/// One `(question, selected option)` pair of the submission payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnswerPair {
    pub question_id: QuestionId,
    pub option_id: OptionId,
}

//
// ─── ATTEMPT SESSION ───────────────────────────────────────────────────────────
//

/// In-memory state of one student's test attempt.
///
/// Holds an immutable snapshot of the questions, the current position, the
/// selected option per question and a status for every question. Mutations
/// either succeed completely or leave the attempt untouched.
#[derive(Clone)]
pub struct AttemptSession {
    attempt_id: AttemptId,
    questions: Vec<Question>,
    positions: HashMap<QuestionId, usize>,
    current: usize,
    answers: HashMap<QuestionId, OptionId>,
    status: HashMap<QuestionId, QuestionStatus>,
    started_at: DateTime<Utc>,
    submitted_at: Option<DateTime<Utc>>,
}

impl AttemptSession {
    /// Start an attempt over the given questions.
    ///
    /// The first question counts as visited straight away.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::Empty` if `questions` is empty and
    /// `AttemptError::DuplicateQuestion` if a question id repeats.
    pub fn start(
        attempt_id: AttemptId,
        questions: Vec<Question>,
        started_at: DateTime<Utc>,
    ) -> Result<Self, AttemptError> {
        if questions.is_empty() {
            return Err(AttemptError::Empty);
        }

        let mut positions = HashMap::with_capacity(questions.len());
        for (index, question) in questions.iter().enumerate() {
            if positions.insert(question.id(), index).is_some() {
                return Err(AttemptError::DuplicateQuestion(question.id()));
            }
        }
        let status = questions
            .iter()
            .map(|question| (question.id(), QuestionStatus::NotVisited))
            .collect();

        let mut session = Self {
            attempt_id,
            questions,
            positions,
            current: 0,
            answers: HashMap::new(),
            status,
            started_at,
            submitted_at: None,
        };
        session.visit(0);
        Ok(session)
    }

    #[must_use]
    pub fn attempt_id(&self) -> AttemptId {
        self.attempt_id
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Time of the most recent accepted submission, if any.
    #[must_use]
    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.submitted_at.is_some()
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Always false; an attempt cannot be started without questions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        &self.questions[self.current]
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.current + 1 >= self.questions.len()
    }

    #[must_use]
    pub fn answer_for(&self, question_id: QuestionId) -> Option<&OptionId> {
        self.answers.get(&question_id)
    }

    #[must_use]
    pub fn status_of(&self, question_id: QuestionId) -> Option<QuestionStatus> {
        self.status.get(&question_id).copied()
    }

    /// Status of every question in display order.
    #[must_use]
    pub fn status_board(&self) -> Vec<(QuestionId, QuestionStatus)> {
        self.questions
            .iter()
            .map(|question| (question.id(), self.status[&question.id()]))
            .collect()
    }

    /// Jump to the question at `index`.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::IndexOutOfRange` if `index` is not a valid position.
    pub fn navigate_to(&mut self, index: usize) -> Result<(), AttemptError> {
        if index >= self.questions.len() {
            return Err(AttemptError::IndexOutOfRange {
                index,
                len: self.questions.len(),
            });
        }
        self.visit(index);
        Ok(())
    }

    /// Record `option_id` as the answer to `question_id`, replacing any earlier choice.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::UnknownQuestion` or `AttemptError::UnknownOption`
    /// when the ids are not part of this attempt.
    pub fn select_option(
        &mut self,
        question_id: QuestionId,
        option_id: OptionId,
    ) -> Result<(), AttemptError> {
        let index = *self
            .positions
            .get(&question_id)
            .ok_or(AttemptError::UnknownQuestion(question_id))?;
        if !self.questions[index].has_option(&option_id) {
            return Err(AttemptError::UnknownOption {
                question_id,
                option_id,
            });
        }

        self.answers.insert(question_id, option_id);
        self.status.insert(question_id, QuestionStatus::Answered);
        Ok(())
    }

    /// Flag the current question for review and move on when possible.
    ///
    /// Any selected answer is kept.
    pub fn mark_for_review(&mut self) {
        let question_id = self.current_question().id();
        self.status.insert(question_id, QuestionStatus::Marked);
        self.go_to_next();
    }

    /// Drop the current answer and reset the status to not answered, which
    /// also removes a review mark.
    pub fn clear_response(&mut self) {
        let question_id = self.current_question().id();
        self.answers.remove(&question_id);
        self.status.insert(question_id, QuestionStatus::NotAnswered);
    }

    /// Advance one question; does nothing on the last one.
    pub fn go_to_next(&mut self) {
        if !self.is_last() {
            self.visit(self.current + 1);
        }
    }

    #[must_use]
    pub fn stats(&self) -> AttemptStats {
        let mut stats = AttemptStats::default();
        for status in self.status.values() {
            stats.bump(*status);
        }
        stats
    }

    /// One pair per answered question, ordered by question id.
    #[must_use]
    pub fn submission_payload(&self) -> Vec<AnswerPair> {
        let mut pairs: Vec<_> = self
            .answers
            .iter()
            .map(|(question_id, option_id)| AnswerPair {
                question_id: *question_id,
                option_id: option_id.clone(),
            })
            .collect();
        pairs.sort();
        pairs
    }

    /// Note that the submission endpoint accepted the answers.
    ///
    /// Repeated calls move the timestamp forward; nothing else changes.
    pub fn record_submission(&mut self, submitted_at: DateTime<Utc>) {
        self.submitted_at = Some(submitted_at);
    }

    fn visit(&mut self, index: usize) {
        self.current = index;
        let question_id = self.questions[index].id();
        if let Some(status) = self.status.get_mut(&question_id) {
            if *status == QuestionStatus::NotVisited {
                *status = QuestionStatus::NotAnswered;
            }
        }
    }
}

impl fmt::Debug for AttemptSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttemptSession")
            .field("attempt_id", &self.attempt_id)
            .field("questions_len", &self.questions.len())
            .field("current", &self.current)
            .field("answers_len", &self.answers.len())
            .field("started_at", &self.started_at)
            .field("submitted_at", &self.submitted_at)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::question::AnswerOption;
    use crate::time::fixed_now;

    fn question(id: u64) -> Question {
        Question::new(
            QuestionId::new(id),
            format!("Question {id}"),
            vec![
                AnswerOption::new("a", "first"),
                AnswerOption::new("b", "second"),
                AnswerOption::new("c", "third"),
            ],
            4.0,
        )
        .unwrap()
    }

    fn three_questions() -> AttemptSession {
        AttemptSession::start(
            AttemptId::new(77),
            vec![question(1), question(2), question(3)],
            fixed_now(),
        )
        .unwrap()
    }

    fn stats(not_visited: usize, not_answered: usize, answered: usize, marked: usize) -> AttemptStats {
        AttemptStats {
            not_visited,
            not_answered,
            answered,
            marked,
        }
    }

    fn opt(id: &str) -> OptionId {
        OptionId::new(id)
    }

    fn assert_invariants(session: &AttemptSession) {
        assert_eq!(session.stats().total(), session.len());
        for q in session.questions() {
            let answered = session.status_of(q.id()) == Some(QuestionStatus::Answered);
            if answered {
                assert!(session.answer_for(q.id()).is_some());
            }
            if session.status_of(q.id()) == Some(QuestionStatus::NotVisited) {
                assert!(session.answer_for(q.id()).is_none());
            }
        }
    }

    #[test]
    fn start_rejects_empty_question_list() {
        let err = AttemptSession::start(AttemptId::new(1), Vec::new(), fixed_now()).unwrap_err();
        assert_eq!(err, AttemptError::Empty);
    }

    #[test]
    fn start_rejects_repeated_question_ids() {
        let err = AttemptSession::start(
            AttemptId::new(1),
            vec![question(1), question(2), question(1)],
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, AttemptError::DuplicateQuestion(QuestionId::new(1)));
    }

    #[test]
    fn start_visits_first_question() {
        let session = three_questions();
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.stats(), stats(2, 1, 0, 0));
        assert_eq!(
            session.status_of(QuestionId::new(1)),
            Some(QuestionStatus::NotAnswered)
        );
        assert_invariants(&session);
    }

    #[test]
    fn scenarios_walk_through_select_navigate_and_mark() {
        let mut session = three_questions();

        session.select_option(QuestionId::new(1), opt("a")).unwrap();
        assert_eq!(session.stats(), stats(2, 0, 1, 0));
        assert_eq!(session.answer_for(QuestionId::new(1)), Some(&opt("a")));
        assert_eq!(session.current_index(), 0);

        session.navigate_to(1).unwrap();
        assert_eq!(session.stats(), stats(1, 1, 1, 0));

        session.mark_for_review();
        assert_eq!(
            session.status_of(QuestionId::new(2)),
            Some(QuestionStatus::Marked)
        );
        assert_eq!(session.current_index(), 2);
        assert_eq!(session.stats(), stats(0, 1, 1, 1));
        assert_invariants(&session);
    }

    #[test]
    fn mark_on_last_question_stays_put() {
        let mut session = three_questions();
        session.navigate_to(2).unwrap();
        session.mark_for_review();
        assert_eq!(session.current_index(), 2);
        assert_eq!(
            session.status_of(QuestionId::new(3)),
            Some(QuestionStatus::Marked)
        );
    }

    #[test]
    fn mark_keeps_existing_answer() {
        let mut session = three_questions();
        session.select_option(QuestionId::new(1), opt("b")).unwrap();
        session.mark_for_review();
        assert_eq!(
            session.status_of(QuestionId::new(1)),
            Some(QuestionStatus::Marked)
        );
        assert_eq!(session.answer_for(QuestionId::new(1)), Some(&opt("b")));
        assert_eq!(session.submission_payload().len(), 1);
    }

    #[test]
    fn navigate_out_of_range_is_an_error() {
        let mut session = three_questions();
        let err = session.navigate_to(3).unwrap_err();
        assert_eq!(err, AttemptError::IndexOutOfRange { index: 3, len: 3 });
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.stats(), stats(2, 1, 0, 0));
    }

    #[test]
    fn navigate_twice_changes_nothing() {
        let mut session = three_questions();
        session.navigate_to(1).unwrap();
        let board = session.status_board();
        session.navigate_to(1).unwrap();
        assert_eq!(session.status_board(), board);
    }

    #[test]
    fn revisiting_keeps_answer_and_mark() {
        let mut session = three_questions();
        session.select_option(QuestionId::new(1), opt("a")).unwrap();
        session.navigate_to(1).unwrap();
        session.mark_for_review();
        session.navigate_to(0).unwrap();
        session.navigate_to(1).unwrap();
        assert_eq!(
            session.status_of(QuestionId::new(1)),
            Some(QuestionStatus::Answered)
        );
        assert_eq!(
            session.status_of(QuestionId::new(2)),
            Some(QuestionStatus::Marked)
        );
    }

    #[test]
    fn select_overwrites_previous_choice() {
        let mut session = three_questions();
        session.select_option(QuestionId::new(2), opt("a")).unwrap();
        session.select_option(QuestionId::new(2), opt("c")).unwrap();
        assert_eq!(session.answer_for(QuestionId::new(2)), Some(&opt("c")));
        // Answering a question that was never shown does not move the cursor.
        assert_eq!(session.current_index(), 0);
        assert_invariants(&session);
    }

    #[test]
    fn select_rejects_unknown_ids() {
        let mut session = three_questions();
        assert_eq!(
            session.select_option(QuestionId::new(9), opt("a")),
            Err(AttemptError::UnknownQuestion(QuestionId::new(9)))
        );
        assert_eq!(
            session.select_option(QuestionId::new(1), opt("z")),
            Err(AttemptError::UnknownOption {
                question_id: QuestionId::new(1),
                option_id: opt("z"),
            })
        );
        assert!(session.submission_payload().is_empty());
        assert_eq!(session.stats(), stats(2, 1, 0, 0));
    }

    #[test]
    fn clear_after_select_restores_visited_state() {
        let mut session = three_questions();
        session.navigate_to(1).unwrap();
        let before = session.status_board();

        session.select_option(QuestionId::new(2), opt("b")).unwrap();
        session.clear_response();

        assert_eq!(session.status_board(), before);
        assert!(session.answer_for(QuestionId::new(2)).is_none());
    }

    #[test]
    fn clear_is_idempotent_and_unmarks() {
        let mut session = three_questions();
        session.select_option(QuestionId::new(1), opt("a")).unwrap();
        session.mark_for_review();
        session.navigate_to(0).unwrap();

        session.clear_response();
        let once = (session.status_board(), session.submission_payload());
        session.clear_response();
        assert_eq!((session.status_board(), session.submission_payload()), once);
        assert_eq!(
            session.status_of(QuestionId::new(1)),
            Some(QuestionStatus::NotAnswered)
        );
    }

    #[test]
    fn go_to_next_stops_at_the_end() {
        let mut session = three_questions();
        session.go_to_next();
        session.go_to_next();
        assert!(session.is_last());
        session.go_to_next();
        assert_eq!(session.current_index(), 2);
        assert_eq!(session.stats(), stats(0, 3, 0, 0));
    }

    #[test]
    fn payload_contains_each_answer_once() {
        let mut session = three_questions();
        session.select_option(QuestionId::new(3), opt("c")).unwrap();
        session.select_option(QuestionId::new(1), opt("a")).unwrap();
        session.select_option(QuestionId::new(1), opt("b")).unwrap();

        let payload = session.submission_payload();
        assert_eq!(
            payload,
            vec![
                AnswerPair {
                    question_id: QuestionId::new(1),
                    option_id: opt("b"),
                },
                AnswerPair {
                    question_id: QuestionId::new(3),
                    option_id: opt("c"),
                },
            ]
        );
    }

    #[test]
    fn record_submission_sets_timestamp() {
        let mut session = three_questions();
        assert!(!session.is_submitted());
        session.record_submission(fixed_now());
        assert_eq!(session.submitted_at(), Some(fixed_now()));
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(QuestionStatus::NotAnswered.to_string(), "not_answered");
        assert_eq!(
            serde_json::to_string(&QuestionStatus::Marked).unwrap(),
            "\"marked\""
        );
    }
}
