use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::access::AccessGuard;
use crate::analytics::AnalyticsService;
use crate::attempts::AttemptService;
use crate::auth::SessionStore;
use crate::courses::CourseService;
use crate::error::AppServicesError;
use crate::generation::{HttpQuestionGenerator, QuestionGenerator};
use crate::quizzes::QuizService;
use crate::users::UserService;

/// Assembles the app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    session: SessionStore,
    guard: AccessGuard,
    attempts: Arc<AttemptService>,
    analytics: Arc<AnalyticsService>,
    users: Arc<UserService>,
    courses: Arc<CourseService>,
    quizzes: Arc<QuizService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage, with the question generator
    /// configured from the environment.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(
            &storage,
            clock,
            Arc::new(HttpQuestionGenerator::from_env()),
        ))
    }

    /// Build services over an existing storage aggregate.
    #[must_use]
    pub fn from_storage(
        storage: &Storage,
        clock: Clock,
        generator: Arc<dyn QuestionGenerator>,
    ) -> Self {
        let session = SessionStore::from_storage(storage);
        let attempts = Arc::new(AttemptService::new(
            clock,
            Arc::clone(&storage.quizzes),
            Arc::clone(&storage.attempts),
            session.clone(),
        ));
        let analytics = Arc::new(AnalyticsService::new(
            Arc::clone(&storage.identities),
            Arc::clone(&storage.courses),
            Arc::clone(&storage.quizzes),
            Arc::clone(&storage.attempts),
        ));
        let users = Arc::new(UserService::new(
            clock,
            Arc::clone(&storage.identities),
            Arc::clone(&storage.credentials),
        ));
        let courses = Arc::new(CourseService::new(clock, Arc::clone(&storage.courses)));
        let quizzes = Arc::new(QuizService::new(
            clock,
            Arc::clone(&storage.courses),
            Arc::clone(&storage.quizzes),
            generator,
        ));

        Self {
            session,
            guard: AccessGuard,
            attempts,
            analytics,
            users,
            courses,
            quizzes,
        }
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    #[must_use]
    pub fn guard(&self) -> AccessGuard {
        self.guard
    }

    #[must_use]
    pub fn attempts(&self) -> Arc<AttemptService> {
        Arc::clone(&self.attempts)
    }

    #[must_use]
    pub fn analytics(&self) -> Arc<AnalyticsService> {
        Arc::clone(&self.analytics)
    }

    #[must_use]
    pub fn users(&self) -> Arc<UserService> {
        Arc::clone(&self.users)
    }

    #[must_use]
    pub fn courses(&self) -> Arc<CourseService> {
        Arc::clone(&self.courses)
    }

    #[must_use]
    pub fn quizzes(&self) -> Arc<QuizService> {
        Arc::clone(&self.quizzes)
    }
}
