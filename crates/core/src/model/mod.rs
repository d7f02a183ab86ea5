mod attempt;
mod course;
mod identity;
mod ids;
mod question;
mod quiz;

pub use ids::{AttemptId, CourseId, ParseIdError, QuestionId, QuizId, UserId};

pub use attempt::{AnswerSheet, AttemptRecordError, QuizAttempt};
pub use course::{Course, CourseError, Difficulty, parse_topics};
pub use identity::{Identity, IdentityError, Role, normalize_email};
pub use question::{Question, QuestionDraft, QuestionError, QuestionKind};
pub use quiz::{Quiz, QuizError};
