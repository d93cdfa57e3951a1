//! Cluster digest
//!
//! Packs message clusters into token-budgeted batches and reduces them to a
//! single description through repeated LLM summarization.

pub mod analysis;
pub mod config;
pub mod context;
pub mod error;
pub mod llm;
pub mod logging;
pub mod metrics;
pub mod prompts;

pub use crate::analysis::{seeded_rng, Analyst, ClusterDescription};
pub use crate::config::Config;
pub use crate::context::{
    ContextPacker, HierarchicalSummarizer, PackedContexts, Reduction, ReductionPlan, Summarizer,
    SummaryStage, TokenEstimator,
};
pub use crate::error::{DigestError, Result};
pub use crate::llm::{ChatModel, LlmError, OpenAiClient};
