//! Summarization oracles for the hierarchical reducer

use super::models::SummaryStage;
use crate::llm::{complete_structured, ChatModel, ChatRequest, LlmError, Summarization};
use crate::prompts;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Summarizer trait: one call turns one rendered batch into one summary
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(
        &self,
        batch: &str,
        stage: SummaryStage,
    ) -> Result<String, SummarizerError>;
}

/// Prompt and output budget for one stage
#[derive(Debug, Clone, PartialEq)]
pub struct StagePrompt {
    pub system: String,
    /// Heading placed before the batch in the user message
    pub heading: String,
    pub max_completion_tokens: u32,
    pub temperature: f32,
}

/// Prompts for both stages of a reduction
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryPrompts {
    pub messages: StagePrompt,
    pub summaries: StagePrompt,
}

impl SummaryPrompts {
    /// Describing one cluster of messages
    pub fn cluster(message_tag: &str, summary_tag: &str) -> Self {
        Self {
            messages: StagePrompt {
                system: prompts::cluster_messages(message_tag),
                heading: "Inserted texts:".to_string(),
                max_completion_tokens: 700,
                temperature: 0.3,
            },
            summaries: StagePrompt {
                system: prompts::merge_summaries(summary_tag),
                heading: "Summaries:".to_string(),
                max_completion_tokens: 1000,
                temperature: 0.3,
            },
        }
    }

    /// Describing a whole channel
    pub fn channel(message_tag: &str, summary_tag: &str) -> Self {
        Self {
            messages: StagePrompt {
                system: prompts::channel_messages(message_tag),
                heading: "Inserted texts:".to_string(),
                max_completion_tokens: 800,
                temperature: 0.3,
            },
            summaries: StagePrompt {
                system: prompts::merge_summaries(summary_tag),
                heading: "Summaries:".to_string(),
                max_completion_tokens: 800,
                temperature: 0.3,
            },
        }
    }

    pub fn stage(&self, stage: SummaryStage) -> &StagePrompt {
        match stage {
            SummaryStage::Messages => &self.messages,
            SummaryStage::Summaries => &self.summaries,
        }
    }
}

/// LLM-backed summarizer using structured `Summarization` output
pub struct LlmSummarizer<M: ?Sized> {
    model: Arc<M>,
    prompts: SummaryPrompts,
}

impl<M: ChatModel + ?Sized> LlmSummarizer<M> {
    pub fn new(model: Arc<M>, prompts: SummaryPrompts) -> Self {
        Self { model, prompts }
    }

    /// Build the request sent for one batch
    pub fn build_request(&self, batch: &str, stage: SummaryStage) -> ChatRequest {
        let prompt = self.prompts.stage(stage);
        ChatRequest::new(prompt.system.clone(), format!("{} \n{}", prompt.heading, batch))
            .expecting::<Summarization>()
            .with_temperature(prompt.temperature)
            .with_max_completion_tokens(prompt.max_completion_tokens)
    }
}

#[async_trait]
impl<M: ChatModel + ?Sized> Summarizer for LlmSummarizer<M> {
    async fn summarize(
        &self,
        batch: &str,
        stage: SummaryStage,
    ) -> Result<String, SummarizerError> {
        debug!("Summarizing {} batch of {} bytes", stage, batch.len());
        let request = self.build_request(batch, stage);
        let response: Summarization = complete_structured(self.model.as_ref(), &request).await?;
        Ok(response.summary)
    }
}

/// Echoes the batch back unchanged (offline runs and tests)
pub struct ConcatenationSummarizer;

#[async_trait]
impl Summarizer for ConcatenationSummarizer {
    async fn summarize(
        &self,
        batch: &str,
        _stage: SummaryStage,
    ) -> Result<String, SummarizerError> {
        Ok(batch.to_string())
    }
}

/// Summarizer errors
#[derive(Debug, thiserror::Error)]
pub enum SummarizerError {
    #[error("Model error: {0}")]
    Model(#[from] LlmError),
}
