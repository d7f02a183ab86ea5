//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{
    CourseError, CourseId, IdentityError, QuestionError, QuestionId, QuizError, QuizId, UserId,
};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by the session store and token codec.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid token: {0}")]
    InvalidToken(String),
    #[error("token encoding failed: {0}")]
    TokenEncoding(String),
    #[error("a login is already in progress")]
    LoginInFlight,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while driving a quiz attempt.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("quiz not found: {0}")]
    NotFound(QuizId),
    #[error("quiz attempt is not in progress")]
    NotInProgress,
    #[error("quiz attempt is not finished")]
    NotFinished,
    #[error("question {0} does not belong to this quiz")]
    UnknownQuestion(QuestionId),
    #[error("a submission is already in progress")]
    SubmitInFlight,
    #[error("no signed-in user")]
    NotAuthenticated,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// User-input validation failures that are not tied to a domain type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("password must be at least {min} characters long")]
    PasswordTooShort { min: usize },
    #[error("passwords do not match")]
    PasswordMismatch,
    #[error("question count must be between 1 and {max}, got {got}")]
    QuestionCount { got: u32, max: u32 },
    #[error("topic cannot be empty")]
    EmptyTopic,
}

/// Errors emitted by `UserService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum UserServiceError {
    #[error("a user with email {0} already exists")]
    DuplicateEmail(String),
    #[error("user not found: {0}")]
    NotFound(UserId),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `CourseService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CourseServiceError {
    #[error("course not found: {0}")]
    NotFound(CourseId),
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by the question generator.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GenerationError {
    #[error("question generation is not configured")]
    Disabled,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("question generation failed: {0}")]
    GenerationFailed(String),
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        Self::GenerationFailed(e.to_string())
    }
}

impl From<QuestionError> for GenerationError {
    fn from(e: QuestionError) -> Self {
        Self::GenerationFailed(format!("generated question rejected: {e}"))
    }
}

/// Errors emitted by `QuizService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizServiceError {
    #[error("course not found: {0}")]
    CourseNotFound(CourseId),
    #[error("quiz not found: {0}")]
    NotFound(QuizId),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `AnalyticsService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AnalyticsError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
