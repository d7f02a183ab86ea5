use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::model::ids::{AttemptId, QuestionId, QuizId, UserId};
use crate::scoring::ScoreCard;

/// Submitted answers keyed by question id. Unanswered questions are absent.
pub type AnswerSheet = BTreeMap<QuestionId, String>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptRecordError {
    #[error("score ({score}) exceeds total points ({total_points})")]
    ScoreExceedsTotal { score: u32, total_points: u32 },
}

/// One scored pass through a quiz by one student. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "AttemptFields")]
pub struct QuizAttempt {
    id: AttemptId,
    quiz_id: QuizId,
    student_id: UserId,
    answers: AnswerSheet,
    score: u32,
    total_points: u32,
    submitted_at: DateTime<Utc>,
}

impl QuizAttempt {
    /// Build a fresh attempt from a computed score card.
    #[must_use]
    pub fn new(
        id: AttemptId,
        quiz_id: QuizId,
        student_id: UserId,
        answers: AnswerSheet,
        card: ScoreCard,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            quiz_id,
            student_id,
            answers,
            score: card.score,
            total_points: card.total_points,
            submitted_at,
        }
    }

    /// Rehydrate an attempt from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `AttemptRecordError::ScoreExceedsTotal` if `score > total_points`.
    pub fn from_persisted(
        id: AttemptId,
        quiz_id: QuizId,
        student_id: UserId,
        answers: AnswerSheet,
        score: u32,
        total_points: u32,
        submitted_at: DateTime<Utc>,
    ) -> Result<Self, AttemptRecordError> {
        if score > total_points {
            return Err(AttemptRecordError::ScoreExceedsTotal {
                score,
                total_points,
            });
        }
        Ok(Self {
            id,
            quiz_id,
            student_id,
            answers,
            score,
            total_points,
            submitted_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> &AttemptId {
        &self.id
    }

    #[must_use]
    pub fn quiz_id(&self) -> &QuizId {
        &self.quiz_id
    }

    #[must_use]
    pub fn student_id(&self) -> &UserId {
        &self.student_id
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerSheet {
        &self.answers
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total_points(&self) -> u32 {
        self.total_points
    }

    #[must_use]
    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    /// Unrounded score percentage; `0.0` when the attempt carries no points.
    #[must_use]
    pub fn percent(&self) -> f64 {
        ScoreCard {
            score: self.score,
            total_points: self.total_points,
        }
        .percent()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttemptFields {
    id: AttemptId,
    quiz_id: QuizId,
    student_id: UserId,
    #[serde(default)]
    answers: AnswerSheet,
    score: u32,
    total_points: u32,
    submitted_at: DateTime<Utc>,
}

impl TryFrom<AttemptFields> for QuizAttempt {
    type Error = AttemptRecordError;

    fn try_from(f: AttemptFields) -> Result<Self, Self::Error> {
        QuizAttempt::from_persisted(
            f.id,
            f.quiz_id,
            f.student_id,
            f.answers,
            f.score,
            f.total_points,
            f.submitted_at,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn from_persisted_rejects_score_above_total() {
        let err = QuizAttempt::from_persisted(
            AttemptId::new("attempt-1"),
            QuizId::new("quiz-1"),
            UserId::new("user-1"),
            AnswerSheet::new(),
            11,
            10,
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            AttemptRecordError::ScoreExceedsTotal {
                score: 11,
                total_points: 10
            }
        );
    }

    #[test]
    fn percent_handles_zero_total() {
        let attempt = QuizAttempt::from_persisted(
            AttemptId::new("attempt-1"),
            QuizId::new("quiz-1"),
            UserId::new("user-1"),
            AnswerSheet::new(),
            0,
            0,
            fixed_now(),
        )
        .unwrap();
        assert!(attempt.percent().abs() < f64::EPSILON);
    }

    #[test]
    fn serializes_answers_as_object() {
        let mut answers = AnswerSheet::new();
        answers.insert(QuestionId::new("q1"), "const".into());
        let attempt = QuizAttempt::new(
            AttemptId::new("attempt-1"),
            QuizId::new("quiz-1"),
            UserId::new("user-1"),
            answers,
            ScoreCard {
                score: 10,
                total_points: 20,
            },
            fixed_now(),
        );
        let value = serde_json::to_value(&attempt).unwrap();
        assert_eq!(value["answers"]["q1"], "const");
        assert_eq!(value["totalPoints"], 20);
    }
}
