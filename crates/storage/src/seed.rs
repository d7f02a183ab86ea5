//! Demo dataset: one admin, one mentor, one student, two courses, one quiz.

use chrono::{DateTime, Utc};
use quiz_core::model::{
    Course, CourseId, Difficulty, Identity, Question, QuestionId, Quiz, QuizId, Role, UserId,
};

use crate::repository::{Storage, StorageError};

pub const ADMIN_ID: &str = "user-admin-01";
pub const MENTOR_ID: &str = "user-mentor-01";
pub const STUDENT_ID: &str = "user-student-01";
pub const JS_COURSE_ID: &str = "course-js-01";
pub const REACT_COURSE_ID: &str = "course-react-02";
pub const JS_QUIZ_ID: &str = "quiz-js-vars-01";

/// Rows inserted by [`seed_demo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeedReport {
    pub users: usize,
    pub courses: usize,
    pub quizzes: usize,
}

impl SeedReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users == 0 && self.courses == 0 && self.quizzes == 0
    }
}

struct DemoUser {
    id: &'static str,
    email: &'static str,
    name: &'static str,
    role: Role,
    secret: &'static str,
}

const DEMO_USERS: [DemoUser; 3] = [
    DemoUser {
        id: ADMIN_ID,
        email: "admin@skillforge.com",
        name: "Admin User",
        role: Role::Admin,
        secret: "admin123",
    },
    DemoUser {
        id: MENTOR_ID,
        email: "mentor@skillforge.com",
        name: "Mentor User",
        role: Role::Mentor,
        secret: "mentor123",
    },
    DemoUser {
        id: STUDENT_ID,
        email: "student@skillforge.com",
        name: "Student User",
        role: Role::Student,
        secret: "student123",
    },
];

fn invalid<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn demo_courses(now: DateTime<Utc>) -> Result<Vec<Course>, StorageError> {
    let strings = |items: &[&str]| items.iter().map(|s| (*s).to_string()).collect::<Vec<_>>();
    Ok(vec![
        Course::new(
            CourseId::new(JS_COURSE_ID),
            "JavaScript Fundamentals",
            "Master the basics of JavaScript.",
            Difficulty::Beginner,
            UserId::new(MENTOR_ID),
            strings(&["Variables", "Functions", "Arrays", "Objects"]),
            now,
        )
        .map_err(invalid)?,
        Course::new(
            CourseId::new(REACT_COURSE_ID),
            "React Advanced Patterns",
            "Learn advanced patterns for building scalable React apps.",
            Difficulty::Advanced,
            UserId::new(MENTOR_ID),
            strings(&["Hooks", "Context API", "Performance", "Render Props"]),
            now,
        )
        .map_err(invalid)?,
    ])
}

/// The two-question JavaScript variables quiz (20 points).
///
/// # Errors
///
/// Returns `StorageError::Serialization` if the fixture fails validation.
pub fn demo_quiz(now: DateTime<Utc>) -> Result<Quiz, StorageError> {
    let questions = vec![
        Question::multiple_choice(
            QuestionId::new("q1"),
            "Which keyword is used to declare a variable that cannot be reassigned?",
            ["let", "var", "const", "static"]
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            "const",
            10,
        )
        .map_err(invalid)?,
        Question::short_answer(
            QuestionId::new("q2"),
            "What is the data type of `null` in JavaScript?",
            "object",
            10,
        )
        .map_err(invalid)?,
    ];
    Quiz::new(
        QuizId::new(JS_QUIZ_ID),
        CourseId::new(JS_COURSE_ID),
        "JavaScript Variables Quiz",
        questions,
        Difficulty::Beginner,
        UserId::new(MENTOR_ID),
        now,
    )
    .map_err(invalid)
}

/// Load the demo dataset unless any user already exists.
///
/// # Errors
///
/// Returns `StorageError` if a repository call fails.
pub async fn seed_demo(storage: &Storage, now: DateTime<Utc>) -> Result<SeedReport, StorageError> {
    if !storage.identities.list_identities().await?.is_empty() {
        tracing::info!("users already present; skipping demo seed");
        return Ok(SeedReport::default());
    }

    let mut report = SeedReport::default();
    for user in &DEMO_USERS {
        let identity = Identity::new(UserId::new(user.id), user.email, user.name, user.role, now)
            .map_err(invalid)?;
        storage.identities.insert_identity(&identity).await?;
        storage
            .credentials
            .set_credential(user.email, user.secret)
            .await?;
        report.users += 1;
    }

    for course in demo_courses(now)? {
        storage.courses.insert_course(&course).await?;
        report.courses += 1;
    }

    storage.quizzes.insert_quiz(&demo_quiz(now)?).await?;
    report.quizzes += 1;

    tracing::info!(
        users = report.users,
        courses = report.courses,
        quizzes = report.quizzes,
        "seeded demo dataset"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::time::fixed_now;

    #[tokio::test]
    async fn seeds_once() {
        let storage = Storage::in_memory();
        let first = seed_demo(&storage, fixed_now()).await.unwrap();
        assert_eq!(
            first,
            SeedReport {
                users: 3,
                courses: 2,
                quizzes: 1
            }
        );
        let second = seed_demo(&storage, fixed_now()).await.unwrap();
        assert!(second.is_empty());
        assert!(
            storage
                .credentials
                .verify_credential("student@skillforge.com", "student123")
                .await
                .unwrap()
        );
    }

    #[test]
    fn demo_quiz_is_worth_twenty_points() {
        assert_eq!(demo_quiz(fixed_now()).unwrap().total_points(), 20);
    }
}
