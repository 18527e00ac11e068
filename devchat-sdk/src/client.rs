//! Completion client trait and the OpenAI-compatible HTTP implementation.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::api::{ApiMessage, ApiRequest, ApiResponse};
use crate::error::CompletionError;
use crate::message::CompletionRequest;

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4";

/// The capability every handler receives: send role-tagged messages,
/// get a single generated text back.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError>;
}

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_min: Duration,
    pub backoff_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_min: Duration::from_secs(4),
            backoff_max: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Delay before the given retry (1-based): min * 2^(retry - 1), capped at max.
    fn delay(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.backoff_min.saturating_mul(factor).min(self.backoff_max)
    }
}

/// Client for the OpenAI chat completions API (or any compatible endpoint).
pub struct OpenAiClient {
    api_key: String,
    api_url: String,
    model: String,
    retry: RetryPolicy,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_url(api_key, DEFAULT_API_URL)
    }

    /// Create a client against a custom endpoint (for OpenAI-compatible APIs).
    pub fn with_url(api_key: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: api_url.into(),
            model: DEFAULT_MODEL.to_string(),
            retry: RetryPolicy::default(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, request: &CompletionRequest) -> ApiRequest {
        ApiRequest {
            model: self.model.clone(),
            messages: request
                .messages
                .iter()
                .map(|m| ApiMessage {
                    role: m.role.as_str().to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            max_tokens: request.max_tokens,
            temperature: Some(request.temperature),
        }
    }

    async fn send_once(&self, api_request: &ApiRequest) -> Result<String, CompletionError> {
        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(api_request)
            .send()
            .await
            .map_err(|e| CompletionError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api { status, message });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Network(e.to_string()))?;

        if let Some(usage) = &api_response.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "completion usage"
            );
        }

        api_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or(CompletionError::EmptyResponse)
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
        let api_request = self.build_request(&request);

        let mut last_error: Option<CompletionError> = None;
        for attempt in 1..=self.retry.max_attempts {
            if attempt > 1 {
                let delay = self.retry.delay(attempt - 1);
                debug!(attempt, ?delay, "retrying completion request");
                tokio::time::sleep(delay).await;
            }

            match self.send_once(&api_request).await {
                Ok(content) => return Ok(content),
                Err(e) if e.is_retryable() => {
                    warn!(attempt, error = %e, "completion attempt failed");
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        let last_error = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempts made".to_string());
        Err(CompletionError::RetriesExhausted {
            attempts: self.retry.max_attempts,
            last_error,
        })
    }
}
