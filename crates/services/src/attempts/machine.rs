use quiz_core::model::{AnswerSheet, AttemptId, Question, QuestionId, Quiz, QuizAttempt, QuizId};
use quiz_core::scoring::{self, ScoreCard};

use crate::error::AttemptError;

/// Label shown in a review for a question left blank.
pub const NOT_ANSWERED: &str = "Not Answered";

/// Observable phase of a [`QuizRun`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Loading,
    /// Terminal: the quiz does not exist.
    NotFound,
    InProgress { question_index: usize },
    Finished(ScoreCard),
}

/// Position within an in-progress run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub question_index: usize,
    pub total_questions: usize,
    pub answered: usize,
}

impl Progress {
    /// Share of the quiz reached so far, counting the current question.
    #[must_use]
    pub fn percent(&self) -> u32 {
        if self.total_questions == 0 {
            return 0;
        }
        #[allow(clippy::cast_precision_loss)]
        let ratio = (self.question_index + 1) as f64 / self.total_questions as f64;
        scoring::round_percent(ratio * 100.0)
    }
}

/// One row of a finished run's breakdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewItem {
    pub question_id: QuestionId,
    pub prompt: String,
    pub submitted: Option<String>,
    pub correct_answer: String,
    pub is_correct: bool,
    pub points_awarded: u32,
}

impl ReviewItem {
    /// The submitted answer, or [`NOT_ANSWERED`] when missing or empty.
    #[must_use]
    pub fn submitted_label(&self) -> &str {
        match self.submitted.as_deref() {
            Some(answer) if !answer.is_empty() => answer,
            _ => NOT_ANSWERED,
        }
    }
}

/// Answers and score captured by [`QuizRun::submission`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub quiz_id: QuizId,
    pub answers: AnswerSheet,
    pub card: ScoreCard,
}

#[derive(Debug, Clone)]
enum Phase {
    Loading,
    NotFound,
    InProgress {
        quiz: Quiz,
        index: usize,
        answers: AnswerSheet,
    },
    Finished {
        quiz: Quiz,
        answers: AnswerSheet,
        card: ScoreCard,
        attempt_id: AttemptId,
    },
}

/// A single pass through one quiz, from loading to a scored result.
///
/// Transitions: `Loading → NotFound` or `Loading → InProgress(0, {})`,
/// `InProgress → Finished` via [`QuizRun::finish`], and
/// `Finished → InProgress(0, {})` via [`QuizRun::retake`]. The run performs no
/// I/O; persisting the attempt is the caller's job.
#[derive(Debug, Clone)]
pub struct QuizRun {
    quiz_id: QuizId,
    phase: Phase,
}

impl QuizRun {
    #[must_use]
    pub fn new(quiz_id: QuizId) -> Self {
        Self {
            quiz_id,
            phase: Phase::Loading,
        }
    }

    /// Resolve the loading phase with the fetched quiz. Ignored in any other
    /// phase.
    pub fn load(&mut self, found: Option<Quiz>) {
        if !matches!(self.phase, Phase::Loading) {
            return;
        }
        self.phase = match found {
            Some(quiz) => Phase::InProgress {
                quiz,
                index: 0,
                answers: AnswerSheet::new(),
            },
            None => Phase::NotFound,
        };
    }

    #[must_use]
    pub fn quiz_id(&self) -> &QuizId {
        &self.quiz_id
    }

    #[must_use]
    pub fn state(&self) -> RunState {
        match &self.phase {
            Phase::Loading => RunState::Loading,
            Phase::NotFound => RunState::NotFound,
            Phase::InProgress { index, .. } => RunState::InProgress {
                question_index: *index,
            },
            Phase::Finished { card, .. } => RunState::Finished(*card),
        }
    }

    #[must_use]
    pub fn quiz(&self) -> Option<&Quiz> {
        match &self.phase {
            Phase::InProgress { quiz, .. } | Phase::Finished { quiz, .. } => Some(quiz),
            Phase::Loading | Phase::NotFound => None,
        }
    }

    #[must_use]
    pub fn answers(&self) -> Option<&AnswerSheet> {
        match &self.phase {
            Phase::InProgress { answers, .. } | Phase::Finished { answers, .. } => Some(answers),
            Phase::Loading | Phase::NotFound => None,
        }
    }

    #[must_use]
    pub fn answer_for(&self, question_id: &QuestionId) -> Option<&str> {
        self.answers()?.get(question_id).map(String::as_str)
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        match &self.phase {
            Phase::InProgress { quiz, index, .. } => quiz.questions().get(*index),
            _ => None,
        }
    }

    #[must_use]
    pub fn progress(&self) -> Option<Progress> {
        match &self.phase {
            Phase::InProgress {
                quiz,
                index,
                answers,
            } => Some(Progress {
                question_index: *index,
                total_questions: quiz.questions().len(),
                answered: answers.len(),
            }),
            _ => None,
        }
    }

    /// Id of the attempt persisted for the finished run.
    #[must_use]
    pub fn attempt_id(&self) -> Option<&AttemptId> {
        match &self.phase {
            Phase::Finished { attempt_id, .. } => Some(attempt_id),
            _ => None,
        }
    }

    /// Upsert the answer for a question. The current index is unchanged.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::NotInProgress` outside `InProgress` and
    /// `AttemptError::UnknownQuestion` for a question not in this quiz.
    pub fn record_answer(
        &mut self,
        question_id: &QuestionId,
        value: impl Into<String>,
    ) -> Result<(), AttemptError> {
        let Phase::InProgress { quiz, answers, .. } = &mut self.phase else {
            return Err(AttemptError::NotInProgress);
        };
        if quiz.question(question_id).is_none() {
            return Err(AttemptError::UnknownQuestion(question_id.clone()));
        }
        answers.insert(question_id.clone(), value.into());
        Ok(())
    }

    /// Move forward one question; a no-op at the last question.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::NotInProgress` outside `InProgress`.
    pub fn next(&mut self) -> Result<usize, AttemptError> {
        let Phase::InProgress { quiz, index, .. } = &mut self.phase else {
            return Err(AttemptError::NotInProgress);
        };
        let last = quiz.questions().len().saturating_sub(1);
        *index = (*index + 1).min(last);
        Ok(*index)
    }

    /// Move back one question; a no-op at the first question.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::NotInProgress` outside `InProgress`.
    pub fn previous(&mut self) -> Result<usize, AttemptError> {
        let Phase::InProgress { index, .. } = &mut self.phase else {
            return Err(AttemptError::NotInProgress);
        };
        *index = index.saturating_sub(1);
        Ok(*index)
    }

    /// Snapshot the answers and score them. The run stays `InProgress`.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::NotInProgress` outside `InProgress`.
    pub fn submission(&self) -> Result<Submission, AttemptError> {
        let Phase::InProgress { quiz, answers, .. } = &self.phase else {
            return Err(AttemptError::NotInProgress);
        };
        Ok(Submission {
            quiz_id: quiz.id().clone(),
            answers: answers.clone(),
            card: scoring::score(quiz.questions(), answers),
        })
    }

    /// Move to `Finished` once `attempt` has been persisted. The run keeps the
    /// answers that were scored, not whatever was recorded since.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::NotInProgress` outside `InProgress`.
    pub fn finish(&mut self, attempt: &QuizAttempt) -> Result<(), AttemptError> {
        let Phase::InProgress { quiz, .. } = &mut self.phase else {
            return Err(AttemptError::NotInProgress);
        };
        let quiz = quiz.clone();
        self.phase = Phase::Finished {
            quiz,
            answers: attempt.answers().clone(),
            card: ScoreCard {
                score: attempt.score(),
                total_points: attempt.total_points(),
            },
            attempt_id: attempt.id().clone(),
        };
        Ok(())
    }

    /// Start over with no answers. Earlier attempts are left as they were.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::NotFinished` outside `Finished`.
    pub fn retake(&mut self) -> Result<(), AttemptError> {
        let Phase::Finished { quiz, .. } = &self.phase else {
            return Err(AttemptError::NotFinished);
        };
        self.phase = Phase::InProgress {
            quiz: quiz.clone(),
            index: 0,
            answers: AnswerSheet::new(),
        };
        Ok(())
    }

    /// Per-question breakdown of a finished run, in question order.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::NotFinished` outside `Finished`.
    pub fn review(&self) -> Result<Vec<ReviewItem>, AttemptError> {
        let Phase::Finished { quiz, answers, .. } = &self.phase else {
            return Err(AttemptError::NotFinished);
        };
        Ok(scoring::grade(quiz.questions(), answers)
            .into_iter()
            .zip(quiz.questions())
            .map(|(outcome, question)| ReviewItem {
                question_id: outcome.question_id,
                prompt: question.prompt().to_owned(),
                submitted: outcome.submitted,
                correct_answer: outcome.correct_answer,
                is_correct: outcome.is_correct,
                points_awarded: outcome.points_awarded,
            })
            .collect())
    }

    /// Rounded score percentage of a finished run; `0` for a zero-point quiz.
    #[must_use]
    pub fn percent(&self) -> Option<u32> {
        match &self.phase {
            Phase::Finished { card, .. } => Some(card.rounded_percent()),
            _ => None,
        }
    }
}
