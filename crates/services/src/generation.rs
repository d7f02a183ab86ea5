//! Client for the external question-generation service.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use quiz_core::model::{Difficulty, Question, QuestionDraft, QuestionId};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{GenerationError, ValidationError};

pub const MAX_QUESTIONS: u32 = 10;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Produces validated questions for a topic. Every returned question carries
/// a fresh id.
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    /// # Errors
    ///
    /// Returns `GenerationError::Validation` for a blank topic or a count
    /// outside `1..=10`, `GenerationError::Disabled` when no service is
    /// configured, and `GenerationError::GenerationFailed` for any transport
    /// or schema problem.
    async fn generate(
        &self,
        topic: &str,
        difficulty: Difficulty,
        count: u32,
    ) -> Result<Vec<Question>, GenerationError>;
}

#[derive(Clone, Debug)]
pub struct GeneratorConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

impl GeneratorConfig {
    /// Read `QUIZ_AI_API_KEY`, `QUIZ_AI_BASE_URL` and `QUIZ_AI_MODEL`.
    /// Returns `None` when the key is missing or blank.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("QUIZ_AI_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url = env::var("QUIZ_AI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        let model = env::var("QUIZ_AI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());
        Some(Self::new(base_url, api_key, model))
    }

    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Chat-completions backed generator. One request per call, no retries.
#[derive(Clone)]
pub struct HttpQuestionGenerator {
    client: Client,
    config: Option<GeneratorConfig>,
}

impl HttpQuestionGenerator {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(GeneratorConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<GeneratorConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    #[instrument(skip(self, config), fields(model = %config.model))]
    async fn request_drafts(
        &self,
        config: &GeneratorConfig,
        topic: &str,
        difficulty: Difficulty,
        count: u32,
    ) -> Result<Vec<QuestionDraft>, GenerationError> {
        let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        let payload = ChatRequest {
            model: config.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt(topic, difficulty, count),
            }],
            temperature: 0.4,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&config.api_key)
            .timeout(config.timeout)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%status, "question generation request rejected");
            return Err(GenerationError::GenerationFailed(format!(
                "service responded with {status}"
            )));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| GenerationError::GenerationFailed("empty response".into()))?;

        let parsed: GeneratedQuestions = serde_json::from_str(strip_code_fence(&content))
            .map_err(|e| GenerationError::GenerationFailed(format!("malformed questions: {e}")))?;
        Ok(parsed.questions)
    }
}

#[async_trait]
impl QuestionGenerator for HttpQuestionGenerator {
    async fn generate(
        &self,
        topic: &str,
        difficulty: Difficulty,
        count: u32,
    ) -> Result<Vec<Question>, GenerationError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(ValidationError::EmptyTopic.into());
        }
        if !(1..=MAX_QUESTIONS).contains(&count) {
            return Err(ValidationError::QuestionCount {
                got: count,
                max: MAX_QUESTIONS,
            }
            .into());
        }
        let config = self.config.as_ref().ok_or(GenerationError::Disabled)?;

        let drafts = self.request_drafts(config, topic, difficulty, count).await?;
        let questions = drafts
            .into_iter()
            .take(usize::try_from(count).unwrap_or(usize::MAX))
            .map(|draft| draft.validate(QuestionId::generate()))
            .collect::<Result<Vec<_>, _>>()?;
        if questions.is_empty() {
            return Err(GenerationError::GenerationFailed(
                "no questions returned".into(),
            ));
        }
        tracing::info!(topic, %difficulty, generated = questions.len(), "questions generated");
        Ok(questions)
    }
}

fn prompt(topic: &str, difficulty: Difficulty, count: u32) -> String {
    format!(
        "Generate {count} quiz questions about \"{topic}\" for a learning platform. \
         The difficulty level should be \"{difficulty}\". \
         Include a mix of multiple-choice and short-answer questions. \
         For multiple-choice, provide 4 options and make correctAnswer one of them. \
         Respond with a JSON object of the form \
         {{\"questions\": [{{\"type\": \"multiple-choice\" | \"short-answer\", \
         \"question\": string, \"options\": [string] (multiple-choice only), \
         \"correctAnswer\": string, \"points\": integer (typically 10)}}]}}."
    )
}

/// Some models wrap JSON in a markdown fence despite the response format.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeneratedQuestions {
    questions: Vec<QuestionDraft>,
}
