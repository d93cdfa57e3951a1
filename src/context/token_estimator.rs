//! Token estimation using tiktoken

use super::budget::BudgetError;
use std::sync::Arc;
use tiktoken_rs::{cl100k_base, get_bpe_from_model, CoreBPE};
use tracing::warn;

/// Token estimator trait for different tokenization strategies
pub trait TokenEstimator: Send + Sync {
    /// Estimate the number of tokens in the given text
    fn estimate(&self, text: &str) -> usize;
}

/// Tiktoken-based token estimator
pub struct TiktokenEstimator {
    bpe: Arc<CoreBPE>,
}

impl TiktokenEstimator {
    /// Create a new tiktoken estimator with cl100k_base encoding
    pub fn new() -> Result<Self, BudgetError> {
        let bpe = cl100k_base().map_err(|e| BudgetError::EstimationFailed(e.to_string()))?;
        Ok(Self { bpe: Arc::new(bpe) })
    }

    /// Use the encoding of a specific model, falling back to cl100k_base
    /// when tiktoken does not know the model name.
    pub fn for_model(model: &str) -> Result<Self, BudgetError> {
        match get_bpe_from_model(model) {
            Ok(bpe) => Ok(Self { bpe: Arc::new(bpe) }),
            Err(e) => {
                warn!("No tiktoken encoding for model {}: {}, using cl100k_base", model, e);
                Self::new()
            }
        }
    }
}

impl TokenEstimator for TiktokenEstimator {
    fn estimate(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

/// Word-based token estimator (fallback, ~1.3 tokens per word)
pub struct WordBasedEstimator {
    tokens_per_word: f64,
}

impl WordBasedEstimator {
    pub fn new(tokens_per_word: f64) -> Self {
        Self { tokens_per_word }
    }
}

impl Default for WordBasedEstimator {
    fn default() -> Self {
        Self::new(1.3)
    }
}

impl TokenEstimator for WordBasedEstimator {
    fn estimate(&self, text: &str) -> usize {
        let word_count = text.split_whitespace().count();
        (word_count as f64 * self.tokens_per_word).ceil() as usize
    }
}

/// Adapts any `Fn(&str) -> usize` into an estimator
pub struct FnEstimator<F>(pub F);

impl<F> TokenEstimator for FnEstimator<F>
where
    F: Fn(&str) -> usize + Send + Sync,
{
    fn estimate(&self, text: &str) -> usize {
        (self.0)(text)
    }
}
