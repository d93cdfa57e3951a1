//! Per-call token budgets derived from the model's context window
//!
//! The oracle accepts a fixed context window. Each stage of a reduction packs
//! its batches against a fraction of that window so the prompt, the wrapping
//! tags and the completion still fit.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Token budget errors
#[derive(Debug, Error)]
pub enum BudgetError {
    #[error("Context window must be positive")]
    EmptyWindow,

    #[error("Budget fraction {0} is outside (0, 1]")]
    InvalidFraction(f64),

    #[error("Budget of {window} tokens at {fraction} leaves no room for a batch")]
    NoCapacity { window: usize, fraction: f64 },

    #[error("Token estimation failed: {0}")]
    EstimationFailed(String),
}

/// A fraction of a context window reserved for packed input
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContextBudget {
    pub context_window: usize,
    pub fraction: f64,
}

impl ContextBudget {
    pub fn new(context_window: usize, fraction: f64) -> Result<Self, BudgetError> {
        let budget = Self {
            context_window,
            fraction,
        };
        budget.validate()?;
        Ok(budget)
    }

    /// Validate that the budget leaves at least one token per batch
    pub fn validate(&self) -> Result<(), BudgetError> {
        if self.context_window == 0 {
            return Err(BudgetError::EmptyWindow);
        }
        if !(self.fraction > 0.0 && self.fraction <= 1.0) {
            return Err(BudgetError::InvalidFraction(self.fraction));
        }
        if self.raw_limit() == 0 {
            return Err(BudgetError::NoCapacity {
                window: self.context_window,
                fraction: self.fraction,
            });
        }
        Ok(())
    }

    /// Token limit a single batch should target
    pub fn limit(&self) -> usize {
        self.raw_limit().max(1)
    }

    fn raw_limit(&self) -> usize {
        (self.context_window as f64 * self.fraction).floor() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_window_limits() {
        assert_eq!(ContextBudget::new(128_000, 0.75).unwrap().limit(), 96_000);
        assert_eq!(ContextBudget::new(128_000, 0.6).unwrap().limit(), 76_800);
    }

    #[test]
    fn test_rejects_bad_fraction() {
        assert!(matches!(
            ContextBudget::new(1000, 0.0),
            Err(BudgetError::InvalidFraction(_))
        ));
        assert!(matches!(
            ContextBudget::new(1000, 1.5),
            Err(BudgetError::InvalidFraction(_))
        ));
        assert!(matches!(
            ContextBudget::new(1000, f64::NAN),
            Err(BudgetError::InvalidFraction(_))
        ));
    }

    #[test]
    fn test_rejects_empty_window() {
        assert!(matches!(ContextBudget::new(0, 0.5), Err(BudgetError::EmptyWindow)));
    }

    #[test]
    fn test_rejects_window_too_small_for_fraction() {
        assert!(matches!(
            ContextBudget::new(1, 0.5),
            Err(BudgetError::NoCapacity { .. })
        ));
    }
}
