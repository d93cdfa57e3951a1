//! Greedy, randomized packing of texts into token-budgeted batches
//!
//! The number of batches is fixed up front at `ceil(total / limit)`, never more
//! than the number of items. Items are dealt largest-first, one per batch per
//! round, with the batch order reshuffled every round, and finally each
//! batch's items are shuffled so the rendered text is not ordered by length.

use super::models::{ContextBatch, Delimiter, PackedContexts};
use super::token_estimator::TokenEstimator;
use crate::error::{DigestError, Result};
use crate::metrics::METRICS;
use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, warn};

/// Packs texts into batches that target a token limit
#[derive(Clone)]
pub struct ContextPacker {
    estimator: Arc<dyn TokenEstimator>,
    context_limit: usize,
    delimiter: Delimiter,
}

impl ContextPacker {
    /// Create a packer; a zero limit is rejected
    pub fn new(estimator: Arc<dyn TokenEstimator>, context_limit: usize) -> Result<Self> {
        if context_limit == 0 {
            return Err(DigestError::InvalidContextLimit);
        }
        Ok(Self {
            estimator,
            context_limit,
            delimiter: Delimiter::default(),
        })
    }

    /// Use a different wrapping tag for rendered items
    pub fn with_delimiter(mut self, delimiter: Delimiter) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Number of batches needed for `total_tokens`, clamped to `1..=item_count`
    /// so that no batch is left empty.
    pub fn batch_count(&self, total_tokens: usize, item_count: usize) -> usize {
        if item_count == 0 {
            return 0;
        }
        total_tokens
            .div_ceil(self.context_limit)
            .clamp(1, item_count)
    }

    /// Partition `texts` into batches. Every input text lands in exactly one
    /// batch; a text larger than the limit is kept whole.
    pub fn pack<R>(&self, texts: &[String], rng: &mut R) -> PackedContexts
    where
        R: Rng + ?Sized,
    {
        let mut sized: Vec<(usize, &String)> = texts
            .iter()
            .map(|text| (self.estimator.estimate(text), text))
            .collect();
        let total_tokens: usize = sized.iter().map(|(tokens, _)| tokens).sum();
        let needed = self.batch_count(total_tokens, sized.len());

        // Stable, so equal-sized items keep their input order before shuffling.
        sized.sort_by(|a, b| b.0.cmp(&a.0));

        let mut batches = vec![ContextBatch::default(); needed];
        let mut indexes: Vec<usize> = (0..needed).collect();
        let mut remaining = sized.into_iter();

        'deal: loop {
            indexes.shuffle(rng);
            for &idx in &indexes {
                let Some((tokens, text)) = remaining.next() else {
                    break 'deal;
                };
                let batch = &mut batches[idx];
                batch.tokens += tokens;
                batch.items.push(text.clone());
            }
            if needed == 0 {
                break;
            }
        }

        for batch in &mut batches {
            batch.items.shuffle(rng);
        }

        let packed = PackedContexts {
            batches,
            delimiter: self.delimiter.clone(),
            context_limit: self.context_limit,
        };

        let overflowing = packed.overflowing();
        debug!(
            "Packed {} texts ({} tokens) into {} batches, limit {}",
            texts.len(),
            total_tokens,
            packed.len(),
            self.context_limit
        );
        if overflowing > 0 {
            warn!(
                "{} of {} batches exceed the {} token limit",
                overflowing,
                packed.len(),
                self.context_limit
            );
        }
        METRICS.record_pack(packed.len(), overflowing);

        packed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::token_estimator::FnEstimator;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn char_packer(limit: usize) -> ContextPacker {
        ContextPacker::new(Arc::new(FnEstimator(|t: &str| t.chars().count())), limit).unwrap()
    }

    #[test]
    fn test_zero_limit_rejected() {
        let estimator = Arc::new(FnEstimator(|t: &str| t.len()));
        assert!(matches!(
            ContextPacker::new(estimator, 0),
            Err(DigestError::InvalidContextLimit)
        ));
    }

    #[test]
    fn test_empty_input() {
        let mut rng = StdRng::seed_from_u64(1);
        let packed = char_packer(10).pack(&[], &mut rng);
        assert!(packed.is_empty());
        assert!(packed.stats().is_empty());
    }

    #[test]
    fn test_zero_token_items_still_packed() {
        let mut rng = StdRng::seed_from_u64(1);
        let texts = vec![String::new(), String::new()];
        let packed = char_packer(10).pack(&texts, &mut rng);
        assert_eq!(packed.len(), 1);
        assert_eq!(packed.batches[0].len(), 2);
    }

    #[test]
    fn test_batch_count_never_exceeds_items() {
        let packer = char_packer(10);
        assert_eq!(packer.batch_count(0, 0), 0);
        assert_eq!(packer.batch_count(0, 3), 1);
        assert_eq!(packer.batch_count(25, 10), 3);
        assert_eq!(packer.batch_count(500, 2), 2);
    }

    #[test]
    fn test_oversize_items_each_get_a_batch() {
        let mut rng = StdRng::seed_from_u64(9);
        let texts = vec!["x".repeat(50), "y".repeat(40)];
        let packed = char_packer(10).pack(&texts, &mut rng);
        assert_eq!(packed.len(), 2);
        assert!(packed.batches.iter().all(|b| b.len() == 1));
    }

    #[test]
    fn test_largest_items_spread_across_batches() {
        let mut rng = StdRng::seed_from_u64(7);
        let texts: Vec<String> = ["aaaaaaaaaa", "bbbbbbbbbb", "c", "d"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        // 22 chars at limit 11 -> 2 batches; the two big items go first, one each
        let packed = char_packer(11).pack(&texts, &mut rng);
        assert_eq!(packed.len(), 2);
        for batch in &packed.batches {
            assert_eq!(batch.tokens, 11);
        }
    }

    #[test]
    fn test_render_uses_delimiter() {
        let mut rng = StdRng::seed_from_u64(3);
        let packer = char_packer(100).with_delimiter(Delimiter::new("summary"));
        let packed = packer.pack(&["hello".to_string()], &mut rng);
        assert_eq!(packed.render(), vec!["<summary>hello</summary>\n".to_string()]);
    }
}
