//! Crate-wide error type

use crate::context::{BudgetError, SummarizerError};
use crate::llm::LlmError;
use thiserror::Error;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, DigestError>;

/// Errors surfaced to callers of the packing and summarization pipeline
#[derive(Debug, Error)]
pub enum DigestError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to load configuration: {0}")]
    ConfigLoad(#[from] ::config::ConfigError),

    #[error("Context limit must be positive")]
    InvalidContextLimit,

    #[error("Nothing to summarize: input contains no texts")]
    EmptyInput,

    #[error("Reduction did not converge after {rounds} rounds ({remaining} summaries left)")]
    NotConverged { rounds: usize, remaining: usize },

    #[error("Budget error: {0}")]
    Budget(#[from] BudgetError),

    #[error("Summarization failed: {0}")]
    Summarizer(#[from] SummarizerError),

    #[error("Model call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
