//! Token-budgeted context packing and hierarchical summarization
//!
//! `ContextPacker` splits texts into batches that fit one model call;
//! `HierarchicalSummarizer` summarizes every batch and repeats on the
//! summaries until a single one is left.

pub mod budget;
pub mod models;
pub mod packer;
pub mod reducer;
pub mod summarizer;
pub mod token_estimator;

pub use budget::{BudgetError, ContextBudget};
pub use models::{BatchStats, ContextBatch, Delimiter, PackedContexts, SummaryStage};
pub use packer::ContextPacker;
pub use reducer::{HierarchicalSummarizer, Reduction, ReductionPlan, StagePlan};
pub use summarizer::{
    ConcatenationSummarizer, LlmSummarizer, StagePrompt, Summarizer, SummarizerError,
    SummaryPrompts,
};
pub use token_estimator::{FnEstimator, TiktokenEstimator, TokenEstimator, WordBasedEstimator};
