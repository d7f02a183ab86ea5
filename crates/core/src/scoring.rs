//! Exact-match quiz scoring.
//!
//! Answers are compared after trimming surrounding whitespace and ignoring
//! case. There is no partial credit and no other normalization.

use crate::model::{AnswerSheet, Question, QuestionId};

/// Result of scoring a question set against an answer sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScoreCard {
    pub score: u32,
    pub total_points: u32,
}

impl ScoreCard {
    /// Unrounded percentage in `[0, 100]`; `0.0` when there are no points.
    #[must_use]
    pub fn percent(&self) -> f64 {
        if self.total_points == 0 {
            return 0.0;
        }
        f64::from(self.score) / f64::from(self.total_points) * 100.0
    }

    /// Percentage rounded half away from zero.
    #[must_use]
    pub fn rounded_percent(&self) -> u32 {
        round_percent(self.percent())
    }
}

/// Per-question outcome, used to review a finished attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionOutcome {
    pub question_id: QuestionId,
    pub submitted: Option<String>,
    pub correct_answer: String,
    pub is_correct: bool,
    pub points_awarded: u32,
}

/// Compare a submitted answer with the expected one.
#[must_use]
pub fn answers_match(submitted: &str, expected: &str) -> bool {
    submitted.trim().to_lowercase() == expected.trim().to_lowercase()
}

/// Score `answers` against `questions`.
///
/// `total_points` covers every question whether answered or not; a missing
/// answer counts as the empty string and therefore as wrong.
#[must_use]
pub fn score(questions: &[Question], answers: &AnswerSheet) -> ScoreCard {
    grade(questions, answers)
        .iter()
        .zip(questions)
        .fold(ScoreCard::default(), |card, (outcome, question)| ScoreCard {
            score: card.score.saturating_add(outcome.points_awarded),
            total_points: card.total_points.saturating_add(question.points()),
        })
}

/// Grade each question in order.
#[must_use]
pub fn grade(questions: &[Question], answers: &AnswerSheet) -> Vec<QuestionOutcome> {
    questions
        .iter()
        .map(|question| {
            let submitted = answers.get(question.id()).cloned();
            let is_correct = answers_match(
                submitted.as_deref().unwrap_or_default(),
                question.correct_answer(),
            );
            QuestionOutcome {
                question_id: question.id().clone(),
                submitted,
                correct_answer: question.correct_answer().to_owned(),
                is_correct,
                points_awarded: if is_correct { question.points() } else { 0 },
            }
        })
        .collect()
}

/// Round a percentage to the nearest integer, halves away from zero.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn round_percent(percent: f64) -> u32 {
    if !percent.is_finite() || percent <= 0.0 {
        return 0;
    }
    percent.round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn questions() -> Vec<Question> {
        vec![
            Question::multiple_choice(
                QuestionId::new("q1"),
                "Which keyword declares a constant binding?",
                vec!["let".into(), "var".into(), "const".into(), "static".into()],
                "const",
                10,
            )
            .unwrap(),
            Question::short_answer(
                QuestionId::new("q2"),
                "What is typeof null?",
                "object",
                10,
            )
            .unwrap(),
        ]
    }

    fn sheet(pairs: &[(&str, &str)]) -> AnswerSheet {
        pairs
            .iter()
            .map(|(k, v)| (QuestionId::new(*k), (*v).to_string()))
            .collect()
    }

    #[test]
    fn all_correct_with_case_and_whitespace_noise() {
        let card = score(&questions(), &sheet(&[("q1", "const"), ("q2", "OBJECT ")]));
        assert_eq!(card, ScoreCard { score: 20, total_points: 20 });
    }

    #[test]
    fn empty_sheet_scores_zero_of_total() {
        let card = score(&questions(), &AnswerSheet::new());
        assert_eq!(card, ScoreCard { score: 0, total_points: 20 });
    }

    #[test]
    fn case_and_trim_invariance() {
        let a = score(&questions(), &sheet(&[("q1", " Const ")]));
        let b = score(&questions(), &sheet(&[("q1", "const")]));
        assert_eq!(a, b);
        assert_eq!(a.score, 10);
    }

    #[test]
    fn no_partial_credit_for_near_misses() {
        let card = score(&questions(), &sheet(&[("q1", "constant"), ("q2", "objects")]));
        assert_eq!(card.score, 0);
    }

    #[test]
    fn answers_for_unknown_questions_are_ignored() {
        let card = score(&questions(), &sheet(&[("zzz", "const")]));
        assert_eq!(card, ScoreCard { score: 0, total_points: 20 });
    }

    #[test]
    fn score_never_exceeds_total() {
        let inputs = [
            sheet(&[]),
            sheet(&[("q1", "const")]),
            sheet(&[("q1", "let"), ("q2", "object")]),
            sheet(&[("q1", "CONST"), ("q2", "object")]),
        ];
        for answers in &inputs {
            let card = score(&questions(), answers);
            assert!(card.score <= card.total_points);
            assert_eq!(card.total_points, 20);
        }
    }

    #[test]
    fn grade_reports_missing_answers() {
        let outcomes = grade(&questions(), &sheet(&[("q1", "const")]));
        assert!(outcomes[0].is_correct);
        assert_eq!(outcomes[1].submitted, None);
        assert!(!outcomes[1].is_correct);
        assert_eq!(outcomes[1].points_awarded, 0);
    }

    #[test]
    fn rounded_percent_rounds_halves_up() {
        let card = ScoreCard { score: 1, total_points: 8 };
        assert_eq!(card.rounded_percent(), 13);
        assert_eq!(round_percent(62.5), 63);
        assert_eq!(ScoreCard::default().rounded_percent(), 0);
    }
}
