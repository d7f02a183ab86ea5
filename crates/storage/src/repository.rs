use async_trait::async_trait;
use quiz_core::model::{
    Course, CourseId, Identity, Quiz, QuizAttempt, QuizId, AttemptId, UserId,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Repository contract for user identities.
///
/// Listing returns records in insertion order.
#[async_trait]
pub trait IdentityRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_identities(&self) -> Result<Vec<Identity>, StorageError>;

    /// Fetch an identity by ID; `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_identity(&self, id: &UserId) -> Result<Option<Identity>, StorageError>;

    /// Fetch an identity by exact (trimmed) email.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn find_identity_by_email(&self, email: &str)
    -> Result<Option<Identity>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the id or email is already taken.
    async fn insert_identity(&self, identity: &Identity) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the identity does not exist.
    async fn update_identity(&self, identity: &Identity) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the identity does not exist.
    async fn delete_identity(&self, id: &UserId) -> Result<(), StorageError>;
}

/// Credential map (email → secret). Secrets are stored as given; this is a mock
/// credential check, not a password store.
#[async_trait]
pub trait CredentialRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn verify_credential(&self, email: &str, secret: &str) -> Result<bool, StorageError>;

    /// Insert or replace the secret for an email.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn set_credential(&self, email: &str, secret: &str) -> Result<(), StorageError>;

    /// Move a secret to a new email; a missing entry is ignored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if `to` already has a credential.
    async fn rename_credential(&self, from: &str, to: &str) -> Result<(), StorageError>;

    /// Remove the credential for an email; missing entries are ignored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn remove_credential(&self, email: &str) -> Result<(), StorageError>;
}

#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_courses(&self) -> Result<Vec<Course>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_course(&self, id: &CourseId) -> Result<Option<Course>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the id is already taken.
    async fn insert_course(&self, course: &Course) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the course does not exist.
    async fn update_course(&self, course: &Course) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the course does not exist.
    async fn delete_course(&self, id: &CourseId) -> Result<(), StorageError>;
}

#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_quizzes(&self) -> Result<Vec<Quiz>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_quizzes_for_course(&self, course_id: &CourseId)
    -> Result<Vec<Quiz>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_quiz(&self, id: &QuizId) -> Result<Option<Quiz>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the id is already taken.
    async fn insert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the quiz does not exist.
    async fn update_quiz(&self, quiz: &Quiz) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the quiz does not exist.
    async fn delete_quiz(&self, id: &QuizId) -> Result<(), StorageError>;
}

/// Append-only store of quiz attempts. There is no update: history is never rewritten.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_attempts(&self) -> Result<Vec<QuizAttempt>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_attempts_for_student(
        &self,
        student_id: &UserId,
    ) -> Result<Vec<QuizAttempt>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_attempt(&self, id: &AttemptId) -> Result<Option<QuizAttempt>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the id is already taken.
    async fn insert_attempt(&self, attempt: &QuizAttempt) -> Result<(), StorageError>;
}

/// Slot for the persisted opaque session token.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn load_token(&self) -> Result<Option<String>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn save_token(&self, token: &str) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn clear_token(&self) -> Result<(), StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct Tables {
    identities: Vec<Identity>,
    credentials: HashMap<String, String>,
    courses: Vec<Course>,
    quizzes: Vec<Quiz>,
    attempts: Vec<QuizAttempt>,
    token: Option<String>,
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// Collections are kept as vectors so listings preserve insertion order.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StorageError> {
        self.tables
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

fn replace_by<T: Clone>(
    items: &mut [T],
    item: &T,
    same: impl Fn(&T) -> bool,
) -> Result<(), StorageError> {
    let slot = items
        .iter_mut()
        .find(|existing| same(existing))
        .ok_or(StorageError::NotFound)?;
    *slot = item.clone();
    Ok(())
}

fn remove_by<T>(items: &mut Vec<T>, same: impl Fn(&T) -> bool) -> Result<(), StorageError> {
    let before = items.len();
    items.retain(|existing| !same(existing));
    if items.len() == before {
        return Err(StorageError::NotFound);
    }
    Ok(())
}

#[async_trait]
impl IdentityRepository for InMemoryRepository {
    async fn list_identities(&self) -> Result<Vec<Identity>, StorageError> {
        Ok(self.lock()?.identities.clone())
    }

    async fn get_identity(&self, id: &UserId) -> Result<Option<Identity>, StorageError> {
        Ok(self
            .lock()?
            .identities
            .iter()
            .find(|i| i.id() == id)
            .cloned())
    }

    async fn find_identity_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Identity>, StorageError> {
        let email = email.trim();
        Ok(self
            .lock()?
            .identities
            .iter()
            .find(|i| i.email() == email)
            .cloned())
    }

    async fn insert_identity(&self, identity: &Identity) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if guard
            .identities
            .iter()
            .any(|i| i.id() == identity.id() || i.email() == identity.email())
        {
            return Err(StorageError::Conflict(format!(
                "identity {} / {}",
                identity.id(),
                identity.email()
            )));
        }
        guard.identities.push(identity.clone());
        Ok(())
    }

    async fn update_identity(&self, identity: &Identity) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if guard
            .identities
            .iter()
            .any(|i| i.id() != identity.id() && i.email() == identity.email())
        {
            return Err(StorageError::Conflict(format!("email {}", identity.email())));
        }
        replace_by(&mut guard.identities, identity, |i| i.id() == identity.id())
    }

    async fn delete_identity(&self, id: &UserId) -> Result<(), StorageError> {
        remove_by(&mut self.lock()?.identities, |i| i.id() == id)
    }
}

#[async_trait]
impl CredentialRepository for InMemoryRepository {
    async fn verify_credential(&self, email: &str, secret: &str) -> Result<bool, StorageError> {
        Ok(self
            .lock()?
            .credentials
            .get(email.trim())
            .is_some_and(|stored| stored == secret))
    }

    async fn set_credential(&self, email: &str, secret: &str) -> Result<(), StorageError> {
        self.lock()?
            .credentials
            .insert(email.trim().to_owned(), secret.to_owned());
        Ok(())
    }

    async fn rename_credential(&self, from: &str, to: &str) -> Result<(), StorageError> {
        let (from, to) = (from.trim(), to.trim());
        if from == to {
            return Ok(());
        }
        let mut guard = self.lock()?;
        if guard.credentials.contains_key(to) {
            return Err(StorageError::Conflict(format!("credential {to}")));
        }
        if let Some(secret) = guard.credentials.remove(from) {
            guard.credentials.insert(to.to_owned(), secret);
        }
        Ok(())
    }

    async fn remove_credential(&self, email: &str) -> Result<(), StorageError> {
        self.lock()?.credentials.remove(email.trim());
        Ok(())
    }
}

#[async_trait]
impl CourseRepository for InMemoryRepository {
    async fn list_courses(&self) -> Result<Vec<Course>, StorageError> {
        Ok(self.lock()?.courses.clone())
    }

    async fn get_course(&self, id: &CourseId) -> Result<Option<Course>, StorageError> {
        Ok(self.lock()?.courses.iter().find(|c| c.id() == id).cloned())
    }

    async fn insert_course(&self, course: &Course) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if guard.courses.iter().any(|c| c.id() == course.id()) {
            return Err(StorageError::Conflict(format!("course {}", course.id())));
        }
        guard.courses.push(course.clone());
        Ok(())
    }

    async fn update_course(&self, course: &Course) -> Result<(), StorageError> {
        replace_by(&mut self.lock()?.courses, course, |c| c.id() == course.id())
    }

    async fn delete_course(&self, id: &CourseId) -> Result<(), StorageError> {
        remove_by(&mut self.lock()?.courses, |c| c.id() == id)
    }
}

#[async_trait]
impl QuizRepository for InMemoryRepository {
    async fn list_quizzes(&self) -> Result<Vec<Quiz>, StorageError> {
        Ok(self.lock()?.quizzes.clone())
    }

    async fn list_quizzes_for_course(
        &self,
        course_id: &CourseId,
    ) -> Result<Vec<Quiz>, StorageError> {
        Ok(self
            .lock()?
            .quizzes
            .iter()
            .filter(|q| q.course_id() == course_id)
            .cloned()
            .collect())
    }

    async fn get_quiz(&self, id: &QuizId) -> Result<Option<Quiz>, StorageError> {
        Ok(self.lock()?.quizzes.iter().find(|q| q.id() == id).cloned())
    }

    async fn insert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if guard.quizzes.iter().any(|q| q.id() == quiz.id()) {
            return Err(StorageError::Conflict(format!("quiz {}", quiz.id())));
        }
        guard.quizzes.push(quiz.clone());
        Ok(())
    }

    async fn update_quiz(&self, quiz: &Quiz) -> Result<(), StorageError> {
        replace_by(&mut self.lock()?.quizzes, quiz, |q| q.id() == quiz.id())
    }

    async fn delete_quiz(&self, id: &QuizId) -> Result<(), StorageError> {
        remove_by(&mut self.lock()?.quizzes, |q| q.id() == id)
    }
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn list_attempts(&self) -> Result<Vec<QuizAttempt>, StorageError> {
        Ok(self.lock()?.attempts.clone())
    }

    async fn list_attempts_for_student(
        &self,
        student_id: &UserId,
    ) -> Result<Vec<QuizAttempt>, StorageError> {
        Ok(self
            .lock()?
            .attempts
            .iter()
            .filter(|a| a.student_id() == student_id)
            .cloned()
            .collect())
    }

    async fn get_attempt(&self, id: &AttemptId) -> Result<Option<QuizAttempt>, StorageError> {
        Ok(self.lock()?.attempts.iter().find(|a| a.id() == id).cloned())
    }

    async fn insert_attempt(&self, attempt: &QuizAttempt) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if guard.attempts.iter().any(|a| a.id() == attempt.id()) {
            return Err(StorageError::Conflict(format!("attempt {}", attempt.id())));
        }
        guard.attempts.push(attempt.clone());
        Ok(())
    }
}

#[async_trait]
impl TokenStore for InMemoryRepository {
    async fn load_token(&self) -> Result<Option<String>, StorageError> {
        Ok(self.lock()?.token.clone())
    }

    async fn save_token(&self, token: &str) -> Result<(), StorageError> {
        self.lock()?.token = Some(token.to_owned());
        Ok(())
    }

    async fn clear_token(&self) -> Result<(), StorageError> {
        self.lock()?.token = None;
        Ok(())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub identities: Arc<dyn IdentityRepository>,
    pub credentials: Arc<dyn CredentialRepository>,
    pub courses: Arc<dyn CourseRepository>,
    pub quizzes: Arc<dyn QuizRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
    pub tokens: Arc<dyn TokenStore>,
}

impl Storage {
    /// Build every repository over one shared backend value.
    #[must_use]
    pub fn from_backend<R>(repo: R) -> Self
    where
        R: IdentityRepository
            + CredentialRepository
            + CourseRepository
            + QuizRepository
            + AttemptRepository
            + TokenStore
            + Clone
            + 'static,
    {
        Self {
            identities: Arc::new(repo.clone()),
            credentials: Arc::new(repo.clone()),
            courses: Arc::new(repo.clone()),
            quizzes: Arc::new(repo.clone()),
            attempts: Arc::new(repo.clone()),
            tokens: Arc::new(repo),
        }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_backend(InMemoryRepository::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{
        AnswerSheet, Difficulty, Question, QuestionId, Role,
    };
    use quiz_core::scoring::ScoreCard;
    use quiz_core::time::fixed_now;

    fn identity(id: &str, email: &str) -> Identity {
        Identity::new(UserId::new(id), email, "Someone", Role::Student, fixed_now()).unwrap()
    }

    fn quiz(id: &str, course: &str) -> Quiz {
        Quiz::new(
            QuizId::new(id),
            CourseId::new(course),
            "Quiz",
            vec![Question::short_answer(QuestionId::new("q1"), "?", "a", 5).unwrap()],
            Difficulty::Beginner,
            UserId::new("mentor"),
            fixed_now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn insert_identity_rejects_duplicate_email() {
        let repo = InMemoryRepository::new();
        repo.insert_identity(&identity("u1", "a@x.io")).await.unwrap();
        let err = repo
            .insert_identity(&identity("u2", "a@x.io"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[tokio::test]
    async fn listing_preserves_insertion_order() {
        let repo = InMemoryRepository::new();
        for id in ["quiz-b", "quiz-a", "quiz-c"] {
            repo.insert_quiz(&quiz(id, "course-1")).await.unwrap();
        }
        let ids: Vec<String> = repo
            .list_quizzes()
            .await
            .unwrap()
            .iter()
            .map(|q| q.id().to_string())
            .collect();
        assert_eq!(ids, ["quiz-b", "quiz-a", "quiz-c"]);
    }

    #[tokio::test]
    async fn quizzes_filter_by_course() {
        let repo = InMemoryRepository::new();
        repo.insert_quiz(&quiz("quiz-1", "course-1")).await.unwrap();
        repo.insert_quiz(&quiz("quiz-2", "course-2")).await.unwrap();
        let found = repo
            .list_quizzes_for_course(&CourseId::new("course-2"))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id(), &QuizId::new("quiz-2"));
    }

    #[tokio::test]
    async fn credentials_verify_exact_secret() {
        let repo = InMemoryRepository::new();
        repo.set_credential("a@x.io", "secret1").await.unwrap();
        assert!(repo.verify_credential(" a@x.io", "secret1").await.unwrap());
        assert!(!repo.verify_credential("a@x.io", "Secret1").await.unwrap());
        repo.rename_credential("a@x.io", "b@x.io").await.unwrap();
        assert!(!repo.verify_credential("a@x.io", "secret1").await.unwrap());
        assert!(repo.verify_credential("b@x.io", "secret1").await.unwrap());
        repo.remove_credential("b@x.io").await.unwrap();
        assert!(!repo.verify_credential("b@x.io", "secret1").await.unwrap());
    }

    #[tokio::test]
    async fn update_and_delete_missing_records_report_not_found() {
        let repo = InMemoryRepository::new();
        let missing = quiz("quiz-404", "course-1");
        assert!(matches!(
            repo.update_quiz(&missing).await,
            Err(StorageError::NotFound)
        ));
        assert!(matches!(
            repo.delete_identity(&UserId::new("nobody")).await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn attempts_are_append_only_by_id() {
        let repo = InMemoryRepository::new();
        let attempt = QuizAttempt::new(
            AttemptId::new("attempt-1"),
            QuizId::new("quiz-1"),
            UserId::new("u1"),
            AnswerSheet::new(),
            ScoreCard {
                score: 0,
                total_points: 5,
            },
            fixed_now(),
        );
        repo.insert_attempt(&attempt).await.unwrap();
        assert!(matches!(
            repo.insert_attempt(&attempt).await,
            Err(StorageError::Conflict(_))
        ));
        let mine = repo
            .list_attempts_for_student(&UserId::new("u1"))
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
    }

    #[tokio::test]
    async fn token_slot_round_trip() {
        let repo = InMemoryRepository::new();
        assert_eq!(repo.load_token().await.unwrap(), None);
        repo.save_token("abc").await.unwrap();
        assert_eq!(repo.load_token().await.unwrap().as_deref(), Some("abc"));
        repo.clear_token().await.unwrap();
        assert_eq!(repo.load_token().await.unwrap(), None);
    }
}
