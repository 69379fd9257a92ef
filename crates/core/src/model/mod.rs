mod attempt;
mod ids;
mod question;

pub use ids::{AttemptId, CourseId, OptionId, ParseIdError, QuestionId, TestId, UserId};

pub use attempt::{AnswerPair, AttemptError, AttemptSession, AttemptStats, QuestionStatus};
pub use question::{AnswerOption, Question, QuestionError, TestDefinition};
