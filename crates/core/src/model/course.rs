use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{CourseId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CourseError {
    #[error("course title cannot be empty")]
    EmptyTitle,

    #[error("unknown difficulty: {0}")]
    UnknownDifficulty(String),
}

/// Difficulty level shared by courses and quizzes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [
        Difficulty::Beginner,
        Difficulty::Intermediate,
        Difficulty::Advanced,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Beginner => "Beginner",
            Difficulty::Intermediate => "Intermediate",
            Difficulty::Advanced => "Advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = CourseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Difficulty::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| CourseError::UnknownDifficulty(needle.to_owned()))
    }
}

/// A course owned by exactly one mentor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "CourseFields")]
pub struct Course {
    id: CourseId,
    title: String,
    description: String,
    difficulty: Difficulty,
    mentor_id: UserId,
    topics: Vec<String>,
    created_at: DateTime<Utc>,
}

impl Course {
    /// Creates a validated course. Topics are trimmed and blank entries dropped.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::EmptyTitle` if the title is blank.
    pub fn new(
        id: CourseId,
        title: impl Into<String>,
        description: impl Into<String>,
        difficulty: Difficulty,
        mentor_id: UserId,
        topics: Vec<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CourseError> {
        let title = title.into().trim().to_owned();
        if title.is_empty() {
            return Err(CourseError::EmptyTitle);
        }
        let topics = topics
            .into_iter()
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty())
            .collect();
        Ok(Self {
            id,
            title,
            description: description.into().trim().to_owned(),
            difficulty,
            mentor_id,
            topics,
            created_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> &CourseId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn mentor_id(&self) -> &UserId {
        &self.mentor_id
    }

    #[must_use]
    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Splits a comma-separated topic list, e.g. `"Hooks, Context API,"`.
#[must_use]
pub fn parse_topics(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
        .collect()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CourseFields {
    id: CourseId,
    title: String,
    #[serde(default)]
    description: String,
    difficulty: Difficulty,
    mentor_id: UserId,
    #[serde(default)]
    topics: Vec<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<CourseFields> for Course {
    type Error = CourseError;

    fn try_from(f: CourseFields) -> Result<Self, Self::Error> {
        Course::new(
            f.id,
            f.title,
            f.description,
            f.difficulty,
            f.mentor_id,
            f.topics,
            f.created_at,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn parse_topics_drops_blanks() {
        assert_eq!(
            parse_topics(" Hooks, ,Context API ,"),
            vec!["Hooks".to_string(), "Context API".to_string()]
        );
    }

    #[test]
    fn difficulty_parse_is_case_insensitive() {
        assert_eq!("advanced".parse::<Difficulty>().unwrap(), Difficulty::Advanced);
        assert!("expert".parse::<Difficulty>().is_err());
    }

    #[test]
    fn blank_title_is_rejected() {
        let err = Course::new(
            CourseId::new("c"),
            "  ",
            "",
            Difficulty::Beginner,
            UserId::new("m"),
            vec![],
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, CourseError::EmptyTitle);
    }
}
