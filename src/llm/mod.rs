//! Chat-completion oracle with structured (JSON schema) responses
//!
//! `ChatModel` is the seam the rest of the crate talks to. `OpenAiClient` is
//! the production implementation; tests substitute scripted models.

pub mod client;
pub mod models;

pub use client::OpenAiClient;
pub use models::{
    ChatRequest, Country, KeywordExtraction, LocationsAndDates, MainTopic, ResponseFormat,
    StructuredOutput, Summarization,
};

use async_trait::async_trait;
use thiserror::Error;

/// Errors from a single model call
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Initialization error: {0}")]
    Initialization(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    #[error("No choices in response")]
    NoChoices,

    #[error("Model refused the request: {0}")]
    Refusal(String),

    #[error("Failed to parse {expected} from model output: {message}")]
    Parse { expected: &'static str, message: String },
}

impl LlmError {
    /// Whether repeating the same request may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Network(_) => true,
            LlmError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// A model that answers one chat request with the raw message content
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError>;
}

#[async_trait]
impl<M: ChatModel + ?Sized> ChatModel for std::sync::Arc<M> {
    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        (**self).complete(request).await
    }
}

/// Send `request` and decode the content into `T`
pub async fn complete_structured<T, M>(model: &M, request: &ChatRequest) -> Result<T, LlmError>
where
    T: StructuredOutput,
    M: ChatModel + ?Sized,
{
    let content = model.complete(request).await?;
    T::parse(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(LlmError::Network("reset".into()).is_retryable());
        assert!(LlmError::Api { status: 429, body: String::new() }.is_retryable());
        assert!(LlmError::Api { status: 503, body: String::new() }.is_retryable());
        assert!(!LlmError::Api { status: 400, body: String::new() }.is_retryable());
        assert!(!LlmError::NoChoices.is_retryable());
        assert!(!LlmError::Parse { expected: "x", message: String::new() }.is_retryable());
    }
}
