//! LLM agent module for summarisation.
//!
//! The pipeline only sees the [`Summarizer`] trait. [`GeminiClient`] talks to
//! the Gemini `generateContent` REST endpoint and maps every failure onto a
//! [`SummarizationErrorKind`]. It never retries; that is the caller's call.

use crate::error::{SummarizationError, SummarizationErrorKind};
use crate::prompt::SummaryPrompt;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";

/// Longest error body excerpt kept in messages
const ERROR_EXCERPT_CHARS: usize = 200;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Submit a prompt and return the generated text.
    async fn summarize(&self, prompt: &SummaryPrompt) -> Result<String, SummarizationError>;
}

/// Connection settings for [`GeminiClient`]
#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: Option<String>,
    pub model: String,
    /// Base URL, overridable for tests and proxies
    pub endpoint: String,
    pub timeout: Duration,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: [TextPart<'a>; 1],
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Deserialize, Default)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|part| part.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

/// Summariser backed by the Gemini REST API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    settings: GeminiSettings,
}

impl GeminiClient {
    pub fn new(settings: GeminiSettings) -> Result<Self, AgentError> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self { client, settings })
    }

    /// Accepts both `gemini-x` and the resource form `models/gemini-x`.
    fn generate_url(&self) -> String {
        let model = self.settings.model.trim();
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.settings.endpoint.trim_end_matches('/'),
            model.strip_prefix("models/").unwrap_or(model)
        )
    }
}

#[async_trait]
impl Summarizer for GeminiClient {
    #[instrument(skip(self, prompt), fields(model = %self.settings.model), level = "debug")]
    async fn summarize(&self, prompt: &SummaryPrompt) -> Result<String, SummarizationError> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                SummarizationError::new(SummarizationErrorKind::Auth, "no Gemini API key configured")
            })?;

        let body = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: [TextPart {
                    text: &prompt.system,
                }],
            },
            contents: [Content {
                role: Some("user"),
                parts: [TextPart { text: &prompt.user }],
            }],
        };

        debug!("sending {} prompt characters", prompt.user.chars().count());
        let response = self
            .client
            .post(self.generate_url())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let payload = response.text().await.map_err(map_transport_error)?;

        if !status.is_success() {
            return Err(map_status(status, &payload));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&payload).map_err(|e| {
            SummarizationError::new(
                SummarizationErrorKind::ServiceError,
                format!("unexpected response shape: {e}"),
            )
        })?;

        let text = parsed.text();
        let text = text.trim();
        if text.is_empty() {
            return Err(SummarizationError::new(
                SummarizationErrorKind::EmptyResponse,
                "the service returned no text",
            ));
        }

        Ok(text.to_string())
    }
}

fn map_transport_error(err: reqwest::Error) -> SummarizationError {
    if err.is_timeout() {
        SummarizationError::new(SummarizationErrorKind::Timeout, err.to_string())
    } else {
        SummarizationError::new(SummarizationErrorKind::ServiceError, err.to_string())
    }
}

fn map_status(status: StatusCode, body: &str) -> SummarizationError {
    let excerpt: String = body.trim().chars().take(ERROR_EXCERPT_CHARS).collect();
    let message = format!("{status}: {excerpt}");

    let kind = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SummarizationErrorKind::Auth,
        StatusCode::TOO_MANY_REQUESTS => SummarizationErrorKind::RateLimited,
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => SummarizationErrorKind::Timeout,
        // Gemini reports a bad key as 400 INVALID_ARGUMENT
        StatusCode::BAD_REQUEST if body.contains("API_KEY_INVALID") || body.contains("API key not valid") => {
            SummarizationErrorKind::Auth
        }
        _ => SummarizationErrorKind::ServiceError,
    };

    SummarizationError::new(kind, message)
}
