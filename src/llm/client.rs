//! OpenAI-compatible chat completion client with retry

use super::models::{ChatCompletionRequest, ChatCompletionResponse, ChatRequest};
use super::{ChatModel, LlmError};
use crate::config::LlmConfig;
use crate::metrics::METRICS;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use std::time::Instant;
use tracing::{debug, warn};

/// Chat completion client for any OpenAI-compatible endpoint
pub struct OpenAiClient {
    http: Client,
    config: LlmConfig,
    endpoint: String,
}

impl OpenAiClient {
    /// Create a new client from configuration
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| LlmError::Initialization(e.to_string()))?;

        let endpoint = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));

        Ok(Self {
            http,
            config,
            endpoint,
        })
    }

    async fn send_once(&self, request: &ChatRequest) -> Result<String, LlmError> {
        let body = ChatCompletionRequest::from_request(&self.config.model, request);

        let mut req = self.http.post(&self.endpoint).json(&body);
        if let Some(ref api_key) = self.config.api_key {
            req = req.bearer_auth(api_key.expose_secret());
        }

        let response = req
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed = response
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|e| LlmError::Parse {
                expected: "chat completion",
                message: e.to_string(),
            })?;

        let message = parsed
            .choices
            .into_iter()
            .next()
            .ok_or(LlmError::NoChoices)?
            .message;

        if let Some(refusal) = message.refusal.filter(|r| !r.is_empty()) {
            return Err(LlmError::Refusal(refusal));
        }

        message.content.ok_or(LlmError::NoChoices)
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        let start = Instant::now();
        let mut attempt = 0;

        loop {
            if attempt > 0 {
                let backoff = self.config.retry_backoff() * (1u32 << (attempt - 1).min(16));
                debug!("Retry attempt {} in {:?}", attempt, backoff);
                tokio::time::sleep(backoff).await;
            }

            match self.send_once(request).await {
                Ok(content) => {
                    debug!("Model call succeeded after {} attempt(s)", attempt + 1);
                    METRICS.record_model_call(true, start.elapsed());
                    return Ok(content);
                }
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    warn!("Model call failed (attempt {}): {}", attempt + 1, e);
                    attempt += 1;
                }
                Err(e) => {
                    warn!("Model call failed after {} attempt(s): {}", attempt + 1, e);
                    METRICS.record_model_call(false, start.elapsed());
                    return Err(e);
                }
            }
        }
    }
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.config.model)
            .finish()
    }
}

