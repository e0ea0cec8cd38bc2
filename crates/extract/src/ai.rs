use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("AI service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("AI service returned no text")]
    EmptyResponse,
    #[error("AI classification is not configured")]
    Disabled,
    #[error("{0}")]
    Other(String),
}

/// A text-completion service: prompt in, raw model text out.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Name reported on the health endpoint.
    fn model_name(&self) -> &str;

    async fn complete(&self, prompt: &str) -> Result<String, AiError>;
}

#[async_trait]
impl<T: CompletionBackend + ?Sized> CompletionBackend for Box<T> {
    fn model_name(&self) -> &str {
        (**self).model_name()
    }

    async fn complete(&self, prompt: &str) -> Result<String, AiError> {
        (**self).complete(prompt).await
    }
}

// ── Gemini ────────────────────────────────────────────────────────────────────

/// Google Generative Language API (`models/{model}:generateContent`).
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self, AiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: GEMINI_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
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
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    fn into_text(self) -> Option<String> {
        let text: String = self
            .candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .filter_map(|p| p.text)
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

#[async_trait]
impl CompletionBackend for GeminiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, AiError> {
        debug!(model = %self.model, prompt_chars = prompt.len(), "calling Gemini");
        let body = GenerateRequest {
            contents: vec![GeminiContent { parts: vec![GeminiPart { text: prompt }] }],
        };
        let resp = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AiError::Status {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }

        let parsed: GenerateResponse = resp.json().await?;
        parsed.into_text().ok_or(AiError::EmptyResponse)
    }
}

// ── Disabled backend ──────────────────────────────────────────────────────────

/// Used when no API key is configured; every call goes to the fallback.
pub struct DisabledBackend;

#[async_trait]
impl CompletionBackend for DisabledBackend {
    fn model_name(&self) -> &str {
        "none"
    }

    async fn complete(&self, _prompt: &str) -> Result<String, AiError> {
        Err(AiError::Disabled)
    }
}

// ── Mock backend (tests) ──────────────────────────────────────────────────────

/// Canned replies, recording every prompt it receives.
pub struct MockCompletion {
    reply: Result<String, String>,
    prompts: Mutex<Vec<String>>,
}

impl MockCompletion {
    pub fn replying(text: impl Into<String>) -> Self {
        Self { reply: Ok(text.into()), prompts: Mutex::new(vec![]) }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self { reply: Err(message.into()), prompts: Mutex::new(vec![]) }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CompletionBackend for MockCompletion {
    fn model_name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, prompt: &str) -> Result<String, AiError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        self.reply.clone().map_err(AiError::Other)
    }
}
