#![forbid(unsafe_code)]

pub mod access;
pub mod analytics;
pub mod app_services;
pub mod attempts;
pub mod auth;
pub mod courses;
pub mod error;
pub mod generation;
mod in_flight;
pub mod quizzes;
pub mod users;

pub use quiz_core::Clock;

pub use access::{AccessGuard, GuardDecision, Route, RouteAccess, post_login_destination};
pub use analytics::AnalyticsService;
pub use app_services::AppServices;
pub use attempts::{AttemptService, AttemptSession, QuizRun, RunState};
pub use auth::{Base64JsonCodec, SessionSnapshot, SessionStore, TokenCodec};
pub use courses::{CourseService, NewCourse};
pub use error::{
    AnalyticsError, AppServicesError, AttemptError, AuthError, CourseServiceError,
    GenerationError, QuizServiceError, UserServiceError, ValidationError,
};
pub use generation::{GeneratorConfig, HttpQuestionGenerator, QuestionGenerator};
pub use quizzes::{CatalogEntry, CatalogFilter, NewQuiz, QuizService};
pub use users::{NewUser, UserService};
