use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::course::Difficulty;
use crate::model::ids::{CourseId, QuestionId, QuizId, UserId};
use crate::model::question::Question;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz title cannot be empty")]
    EmptyTitle,

    #[error("quiz must contain at least one question")]
    NoQuestions,

    #[error("duplicate question id: {0}")]
    DuplicateQuestionId(QuestionId),
}

/// An ordered set of questions belonging to exactly one course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "QuizFields")]
pub struct Quiz {
    id: QuizId,
    course_id: CourseId,
    title: String,
    questions: Vec<Question>,
    difficulty: Difficulty,
    created_by: UserId,
    created_at: DateTime<Utc>,
}

impl Quiz {
    /// Creates a validated quiz.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` for a blank title, an empty question list, or
    /// question ids that repeat (answers are keyed by question id).
    pub fn new(
        id: QuizId,
        course_id: CourseId,
        title: impl Into<String>,
        questions: Vec<Question>,
        difficulty: Difficulty,
        created_by: UserId,
        created_at: DateTime<Utc>,
    ) -> Result<Self, QuizError> {
        let title = title.into().trim().to_owned();
        if title.is_empty() {
            return Err(QuizError::EmptyTitle);
        }
        if questions.is_empty() {
            return Err(QuizError::NoQuestions);
        }
        let mut seen = HashSet::with_capacity(questions.len());
        for question in &questions {
            if !seen.insert(question.id()) {
                return Err(QuizError::DuplicateQuestionId(question.id().clone()));
            }
        }

        Ok(Self {
            id,
            course_id,
            title,
            questions,
            difficulty,
            created_by,
            created_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> &QuizId {
        &self.id
    }

    #[must_use]
    pub fn course_id(&self) -> &CourseId {
        &self.course_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question(&self, id: &QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id() == id)
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn created_by(&self) -> &UserId {
        &self.created_by
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Sum of question points as the quiz stands now.
    #[must_use]
    pub fn total_points(&self) -> u32 {
        self.questions
            .iter()
            .fold(0_u32, |acc, q| acc.saturating_add(q.points()))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuizFields {
    id: QuizId,
    course_id: CourseId,
    title: String,
    questions: Vec<Question>,
    difficulty: Difficulty,
    created_by: UserId,
    created_at: DateTime<Utc>,
}

impl TryFrom<QuizFields> for Quiz {
    type Error = QuizError;

    fn try_from(f: QuizFields) -> Result<Self, Self::Error> {
        Quiz::new(
            f.id,
            f.course_id,
            f.title,
            f.questions,
            f.difficulty,
            f.created_by,
            f.created_at,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn q(id: &str, points: u32) -> Question {
        Question::short_answer(QuestionId::new(id), "?", "x", points).unwrap()
    }

    fn build(questions: Vec<Question>) -> Result<Quiz, QuizError> {
        Quiz::new(
            QuizId::new("quiz-1"),
            CourseId::new("course-1"),
            "Quiz",
            questions,
            Difficulty::Beginner,
            UserId::new("mentor-1"),
            fixed_now(),
        )
    }

    #[test]
    fn total_points_sums_questions() {
        let quiz = build(vec![q("a", 10), q("b", 5)]).unwrap();
        assert_eq!(quiz.total_points(), 15);
    }

    #[test]
    fn rejects_duplicate_question_ids() {
        let err = build(vec![q("a", 1), q("a", 2)]).unwrap_err();
        assert_eq!(err, QuizError::DuplicateQuestionId(QuestionId::new("a")));
    }

    #[test]
    fn rejects_empty_question_list() {
        assert_eq!(build(vec![]).unwrap_err(), QuizError::NoQuestions);
    }
}
