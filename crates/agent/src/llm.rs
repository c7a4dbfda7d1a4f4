//! Completion clients.
//!
//! One network call per stage invocation, no retries at this layer: a failed
//! or timed-out call is reported as [`CompletionError`] and the calling stage
//! decides what to do with it (always: fall back deterministically).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use tenderdesk_core::config::LlmConfig;
use tenderdesk_core::errors::StageError;

#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
pub enum CompletionError {
    #[error("no api key configured for the model endpoint")]
    MissingApiKey,
    #[error("authentication with the model endpoint failed")]
    Auth,
    #[error("model endpoint rate limit exceeded")]
    RateLimited,
    #[error("request timed out after {0}s")]
    Timeout(u64),
    #[error("model endpoint request failed: {0}")]
    Http(String),
    #[error("model endpoint returned no text")]
    EmptyResponse,
}

impl From<CompletionError> for StageError {
    fn from(error: CompletionError) -> Self {
        StageError::CompletionFailed(error.to_string())
    }
}

/// One structured-completion request: a fixed instruction, a rendered user
/// prompt, and a stage-specific sampling temperature.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}

/// HTTP client for a Gemini-style `generateContent` endpoint.
pub struct GenerativeHttpClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: SecretString,
    timeout_secs: u64,
}

impl GenerativeHttpClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, CompletionError> {
        let api_key = config.api_key.clone().ok_or(CompletionError::MissingApiKey)?;
        Self::new(&config.base_url, &config.model, api_key, config.timeout_secs)
    }

    pub fn new(
        base_url: &str,
        model: &str,
        api_key: SecretString,
        timeout_secs: u64,
    ) -> Result<Self, CompletionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|error| CompletionError::Http(error.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
            timeout_secs,
        })
    }
}

#[async_trait]
impl CompletionClient for GenerativeHttpClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let url = format!(
            "{}/{}:generateContent?key={}",
            self.base_url,
            self.model,
            self.api_key.expose_secret()
        );

        let body = GenerateRequest {
            system_instruction: Instruction { parts: vec![Part { text: request.system.clone() }] },
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part { text: request.prompt.clone() }],
            }],
            generation_config: GenerationConfig { temperature: request.temperature },
        };

        let response = self.client.post(&url).json(&body).send().await.map_err(|error| {
            if error.is_timeout() {
                CompletionError::Timeout(self.timeout_secs)
            } else {
                CompletionError::Http(error.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status.as_u16() {
                401 | 403 => CompletionError::Auth,
                429 => CompletionError::RateLimited,
                code => CompletionError::Http(format!("endpoint returned status {code}")),
            });
        }

        let parsed: GenerateResponse =
            response.json().await.map_err(|error| CompletionError::Http(error.to_string()))?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().next())
            .map(|part| part.text)
            .filter(|text| !text.trim().is_empty())
            .ok_or(CompletionError::EmptyResponse)
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    system_instruction: Instruction,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Instruction {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// Test double: returns queued responses in order and counts calls.
#[derive(Default)]
pub struct ScriptedClient {
    responses: Mutex<VecDeque<Result<String, CompletionError>>>,
    calls: AtomicUsize,
}

impl ScriptedClient {
    pub fn new(responses: Vec<Result<String, CompletionError>>) -> Self {
        Self { responses: Mutex::new(responses.into()), calls: AtomicUsize::new(0) }
    }

    /// A client whose every call fails the same way.
    pub fn always_failing() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut responses = self.responses.lock().expect("scripted responses lock");
        responses
            .pop_front()
            .unwrap_or_else(|| Err(CompletionError::Http("script exhausted".to_string())))
    }
}
