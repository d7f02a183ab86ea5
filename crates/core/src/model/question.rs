use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuestionId;
use crate::scoring::answers_match;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyPrompt,

    #[error("correct answer cannot be empty")]
    EmptyCorrectAnswer,

    #[error("points must be > 0")]
    InvalidPoints,

    #[error("multiple-choice question needs at least one option")]
    MissingOptions,

    #[error("options must contain the correct answer")]
    CorrectAnswerNotInOptions,

    #[error("short-answer question cannot carry options")]
    UnexpectedOptions,
}

/// How a question is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionKind {
    MultipleChoice,
    ShortAnswer,
}

/// Unvalidated question content, e.g. as authored or as returned by a generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDraft {
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub correct_answer: String,
    pub points: u32,
}

impl QuestionDraft {
    /// Validate the draft and assign it an id.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the text or answer is blank, points are zero,
    /// or the options do not fit the question kind.
    pub fn validate(self, id: QuestionId) -> Result<Question, QuestionError> {
        let prompt = self.question.trim().to_owned();
        if prompt.is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }
        if self.correct_answer.trim().is_empty() {
            return Err(QuestionError::EmptyCorrectAnswer);
        }
        if self.points == 0 {
            return Err(QuestionError::InvalidPoints);
        }

        let options: Vec<String> = self
            .options
            .unwrap_or_default()
            .into_iter()
            .map(|o| o.trim().to_owned())
            .filter(|o| !o.is_empty())
            .collect();

        match self.kind {
            QuestionKind::MultipleChoice => {
                if options.is_empty() {
                    return Err(QuestionError::MissingOptions);
                }
                if !options
                    .iter()
                    .any(|o| answers_match(o, &self.correct_answer))
                {
                    return Err(QuestionError::CorrectAnswerNotInOptions);
                }
            }
            QuestionKind::ShortAnswer => {
                if !options.is_empty() {
                    return Err(QuestionError::UnexpectedOptions);
                }
            }
        }

        Ok(Question {
            id,
            kind: self.kind,
            prompt,
            options,
            correct_answer: self.correct_answer,
            points: self.points,
        })
    }
}

/// A validated quiz question.
///
/// `options` is non-empty iff the kind is multiple-choice, and then contains the
/// correct answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "QuestionFields", try_from = "QuestionFields")]
pub struct Question {
    id: QuestionId,
    kind: QuestionKind,
    prompt: String,
    options: Vec<String>,
    correct_answer: String,
    points: u32,
}

impl Question {
    /// Convenience constructor for a multiple-choice question.
    ///
    /// # Errors
    ///
    /// See [`QuestionDraft::validate`].
    pub fn multiple_choice(
        id: QuestionId,
        prompt: impl Into<String>,
        options: Vec<String>,
        correct_answer: impl Into<String>,
        points: u32,
    ) -> Result<Self, QuestionError> {
        QuestionDraft {
            kind: QuestionKind::MultipleChoice,
            question: prompt.into(),
            options: Some(options),
            correct_answer: correct_answer.into(),
            points,
        }
        .validate(id)
    }

    /// Convenience constructor for a short-answer question.
    ///
    /// # Errors
    ///
    /// See [`QuestionDraft::validate`].
    pub fn short_answer(
        id: QuestionId,
        prompt: impl Into<String>,
        correct_answer: impl Into<String>,
        points: u32,
    ) -> Result<Self, QuestionError> {
        QuestionDraft {
            kind: QuestionKind::ShortAnswer,
            question: prompt.into(),
            options: None,
            correct_answer: correct_answer.into(),
            points,
        }
        .validate(id)
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        self.kind
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    #[must_use]
    pub fn points(&self) -> u32 {
        self.points
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestionFields {
    id: QuestionId,
    #[serde(flatten)]
    draft: QuestionDraft,
}

impl From<Question> for QuestionFields {
    fn from(q: Question) -> Self {
        let options = match q.kind {
            QuestionKind::MultipleChoice => Some(q.options),
            QuestionKind::ShortAnswer => None,
        };
        Self {
            id: q.id,
            draft: QuestionDraft {
                kind: q.kind,
                question: q.prompt,
                options,
                correct_answer: q.correct_answer,
                points: q.points,
            },
        }
    }
}

impl TryFrom<QuestionFields> for Question {
    type Error = QuestionError;

    fn try_from(fields: QuestionFields) -> Result<Self, Self::Error> {
        fields.draft.validate(fields.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn multiple_choice_requires_correct_answer_in_options() {
        let err = Question::multiple_choice(
            QuestionId::new("q1"),
            "Pick one",
            opts(&["let", "var"]),
            "const",
            10,
        )
        .unwrap_err();
        assert_eq!(err, QuestionError::CorrectAnswerNotInOptions);
    }

    #[test]
    fn multiple_choice_without_options_is_rejected() {
        let err = Question::multiple_choice(QuestionId::new("q1"), "Pick", vec![], "a", 1)
            .unwrap_err();
        assert_eq!(err, QuestionError::MissingOptions);
    }

    #[test]
    fn zero_points_is_rejected() {
        let err = Question::short_answer(QuestionId::new("q2"), "Type?", "object", 0).unwrap_err();
        assert_eq!(err, QuestionError::InvalidPoints);
    }

    #[test]
    fn short_answer_with_options_is_rejected() {
        let draft = QuestionDraft {
            kind: QuestionKind::ShortAnswer,
            question: "Type?".into(),
            options: Some(opts(&["object"])),
            correct_answer: "object".into(),
            points: 10,
        };
        assert_eq!(
            draft.validate(QuestionId::new("q2")).unwrap_err(),
            QuestionError::UnexpectedOptions
        );
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let q = Question::short_answer(QuestionId::new("q2"), "Type of null?", "object", 10)
            .unwrap();
        let value = serde_json::to_value(&q).unwrap();
        assert_eq!(value["type"], "short-answer");
        assert_eq!(value["correctAnswer"], "object");
        assert_eq!(value["question"], "Type of null?");
        assert!(value.get("options").is_none());

        let back: Question = serde_json::from_value(value).unwrap();
        assert_eq!(back, q);
    }

    #[test]
    fn deserializing_invalid_question_fails() {
        let json = r#"{"id":"q1","type":"multiple-choice","question":"?","correctAnswer":"a","points":5}"#;
        assert!(serde_json::from_str::<Question>(json).is_err());
    }
}
