use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use quiz_core::model::{AttemptId, Question, QuestionId, QuizAttempt, QuizId, UserId};
use storage::repository::{AttemptRepository, QuizRepository};

use super::machine::{Progress, QuizRun, ReviewItem, RunState};
use crate::Clock;
use crate::auth::SessionStore;
use crate::error::AttemptError;
use crate::in_flight::InFlightGuard;

/// Starts quiz runs and persists their attempts.
#[derive(Clone)]
pub struct AttemptService {
    clock: Clock,
    quizzes: Arc<dyn QuizRepository>,
    attempts: Arc<dyn AttemptRepository>,
    session: SessionStore,
}

impl AttemptService {
    #[must_use]
    pub fn new(
        clock: Clock,
        quizzes: Arc<dyn QuizRepository>,
        attempts: Arc<dyn AttemptRepository>,
        session: SessionStore,
    ) -> Self {
        Self {
            clock,
            quizzes,
            attempts,
            session,
        }
    }

    /// Load a quiz and open a run on it.
    ///
    /// A missing quiz is not an error: the returned run is in
    /// [`RunState::NotFound`].
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::Storage` if the quiz cannot be read.
    pub async fn start(&self, quiz_id: &QuizId) -> Result<AttemptSession, AttemptError> {
        let mut run = QuizRun::new(quiz_id.clone());
        let found = self.quizzes.get_quiz(quiz_id).await?;
        if found.is_none() {
            tracing::info!(quiz = %quiz_id, "quiz not found");
        }
        run.load(found);
        Ok(AttemptSession {
            run: Arc::new(Mutex::new(run)),
            submitting: Arc::new(AtomicBool::new(false)),
            service: self.clone(),
        })
    }

    /// Attempts submitted by one student, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::Storage` if repository access fails.
    pub async fn history(&self, student_id: &UserId) -> Result<Vec<QuizAttempt>, AttemptError> {
        Ok(self.attempts.list_attempts_for_student(student_id).await?)
    }
}

/// Shared handle on one [`QuizRun`]. Clones drive the same run.
#[derive(Clone)]
pub struct AttemptSession {
    run: Arc<Mutex<QuizRun>>,
    submitting: Arc<AtomicBool>,
    service: AttemptService,
}

impl AttemptSession {
    fn lock(&self) -> MutexGuard<'_, QuizRun> {
        self.run.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the underlying run.
    #[must_use]
    pub fn run(&self) -> QuizRun {
        self.lock().clone()
    }

    #[must_use]
    pub fn state(&self) -> RunState {
        self.lock().state()
    }

    #[must_use]
    pub fn progress(&self) -> Option<Progress> {
        self.lock().progress()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<Question> {
        self.lock().current_question().cloned()
    }

    #[must_use]
    pub fn answer_for(&self, question_id: &QuestionId) -> Option<String> {
        self.lock().answer_for(question_id).map(str::to_owned)
    }

    /// # Errors
    ///
    /// See [`QuizRun::record_answer`].
    pub fn record_answer(
        &self,
        question_id: &QuestionId,
        value: impl Into<String>,
    ) -> Result<(), AttemptError> {
        self.lock().record_answer(question_id, value)
    }

    /// # Errors
    ///
    /// See [`QuizRun::next`].
    pub fn next(&self) -> Result<usize, AttemptError> {
        self.lock().next()
    }

    /// # Errors
    ///
    /// See [`QuizRun::previous`].
    pub fn previous(&self) -> Result<usize, AttemptError> {
        self.lock().previous()
    }

    /// # Errors
    ///
    /// See [`QuizRun::retake`].
    pub fn retake(&self) -> Result<(), AttemptError> {
        self.lock().retake()
    }

    /// # Errors
    ///
    /// See [`QuizRun::review`].
    pub fn review(&self) -> Result<Vec<ReviewItem>, AttemptError> {
        self.lock().review()
    }

    #[must_use]
    pub fn percent(&self) -> Option<u32> {
        self.lock().percent()
    }

    /// Score the current answers, persist one attempt for the signed-in user,
    /// then move the run to `Finished`.
    ///
    /// Exactly one record is written per successful call. If persistence
    /// fails the run stays `InProgress` with its answers, and nothing is
    /// retried.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::SubmitInFlight` while another submit on this run
    /// is outstanding, `AttemptError::NotAuthenticated` without a signed-in
    /// user, `AttemptError::NotInProgress` outside `InProgress`, and
    /// `AttemptError::Storage` if the attempt cannot be saved.
    pub async fn submit(&self) -> Result<QuizAttempt, AttemptError> {
        let _guard =
            InFlightGuard::try_acquire(&self.submitting).ok_or(AttemptError::SubmitInFlight)?;

        let submission = self.lock().submission()?;
        let student = self
            .service
            .session
            .current_identity()
            .ok_or(AttemptError::NotAuthenticated)?;

        let attempt = QuizAttempt::new(
            AttemptId::generate(),
            submission.quiz_id,
            student.id().clone(),
            submission.answers,
            submission.card,
            self.service.clock.now(),
        );

        if let Err(err) = self.service.attempts.insert_attempt(&attempt).await {
            tracing::warn!(quiz = %attempt.quiz_id(), error = %err, "failed to save attempt");
            return Err(err.into());
        }

        self.lock().finish(&attempt)?;
        tracing::info!(
            attempt = %attempt.id(),
            quiz = %attempt.quiz_id(),
            student = %attempt.student_id(),
            score = attempt.score(),
            total_points = attempt.total_points(),
            "quiz submitted"
        );
        Ok(attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use quiz_core::time::fixed_now;
    use storage::repository::{Storage, StorageError};
    use storage::seed::{JS_QUIZ_ID, seed_demo};

    /// Reads succeed with nothing stored; every write fails.
    struct UnwritableAttempts;

    #[async_trait]
    impl AttemptRepository for UnwritableAttempts {
        async fn list_attempts(&self) -> Result<Vec<QuizAttempt>, StorageError> {
            Ok(Vec::new())
        }

        async fn list_attempts_for_student(
            &self,
            _student_id: &UserId,
        ) -> Result<Vec<QuizAttempt>, StorageError> {
            Ok(Vec::new())
        }

        async fn get_attempt(&self, _id: &AttemptId) -> Result<Option<QuizAttempt>, StorageError> {
            Ok(None)
        }

        async fn insert_attempt(&self, _attempt: &QuizAttempt) -> Result<(), StorageError> {
            Err(StorageError::Connection("disk full".into()))
        }
    }

    async fn seeded() -> (Storage, SessionStore, AttemptService) {
        let storage = Storage::in_memory();
        seed_demo(&storage, fixed_now()).await.unwrap();
        let session = SessionStore::from_storage(&storage);
        session.initialize().await.unwrap();
        let service = AttemptService::new(
            Clock::fixed(fixed_now()),
            Arc::clone(&storage.quizzes),
            Arc::clone(&storage.attempts),
            session.clone(),
        );
        (storage, session, service)
    }

    #[tokio::test]
    async fn start_on_missing_quiz_is_terminal_not_found() {
        let (_storage, _session, service) = seeded().await;
        let run = service.start(&QuizId::new("quiz-missing")).await.unwrap();
        assert_eq!(run.state(), RunState::NotFound);
        assert!(matches!(run.next(), Err(AttemptError::NotInProgress)));
    }

    #[tokio::test]
    async fn submit_requires_signed_in_user() {
        let (storage, _session, service) = seeded().await;
        let run = service.start(&QuizId::new(JS_QUIZ_ID)).await.unwrap();
        assert!(matches!(
            run.submit().await,
            Err(AttemptError::NotAuthenticated)
        ));
        assert!(matches!(run.state(), RunState::InProgress { .. }));
        assert!(storage.attempts.list_attempts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn second_submit_is_rejected_while_first_is_outstanding() {
        let (_storage, session, service) = seeded().await;
        session
            .login("student@skillforge.com", "student123")
            .await
            .unwrap();
        let run = service.start(&QuizId::new(JS_QUIZ_ID)).await.unwrap();

        let held = InFlightGuard::try_acquire(&run.submitting).unwrap();
        assert!(matches!(
            run.submit().await,
            Err(AttemptError::SubmitInFlight)
        ));
        drop(held);
        assert!(run.submit().await.is_ok());
        assert!(matches!(
            run.submit().await,
            Err(AttemptError::NotInProgress)
        ));
    }

    #[tokio::test]
    async fn failed_save_keeps_run_in_progress_with_answers() {
        let (storage, session, _service) = seeded().await;
        session
            .login("student@skillforge.com", "student123")
            .await
            .unwrap();
        let service = AttemptService::new(
            Clock::fixed(fixed_now()),
            Arc::clone(&storage.quizzes),
            Arc::new(UnwritableAttempts),
            session,
        );
        let run = service.start(&QuizId::new(JS_QUIZ_ID)).await.unwrap();
        run.record_answer(&QuestionId::new("q1"), "const").unwrap();

        assert!(matches!(
            run.submit().await,
            Err(AttemptError::Storage(StorageError::Connection(_)))
        ));
        assert_eq!(run.state(), RunState::InProgress { question_index: 0 });
        assert_eq!(run.answer_for(&QuestionId::new("q1")).as_deref(), Some("const"));

        // The in-flight flag was released, so the student can try again.
        assert!(matches!(run.submit().await, Err(AttemptError::Storage(_))));
    }
}
