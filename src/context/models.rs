//! Data models for context packing

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Which level of the reduction a batch belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryStage {
    /// First round: raw messages
    Messages,
    /// Every later round: summaries produced by the previous round
    Summaries,
}

impl SummaryStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryStage::Messages => "messages",
            SummaryStage::Summaries => "summaries",
        }
    }
}

impl fmt::Display for SummaryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tag pair wrapped around every item of a rendered batch, e.g. `<msg>...</msg>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delimiter {
    tag: String,
}

impl Delimiter {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Wrap a single item, including the trailing newline
    pub fn wrap(&self, text: &str) -> String {
        format!("<{tag}>{text}</{tag}>\n", tag = self.tag)
    }
}

impl Default for Delimiter {
    fn default() -> Self {
        Self::new("msg")
    }
}

/// One bundle of items destined for a single oracle call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextBatch {
    pub items: Vec<String>,
    pub tokens: usize,
}

impl ContextBatch {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Concatenate the items, each wrapped in the delimiter
    pub fn render(&self, delimiter: &Delimiter) -> String {
        self.items.iter().map(|item| delimiter.wrap(item)).collect()
    }
}

/// Per-batch diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub tokens: usize,
    pub items: usize,
}

/// Output of one packing pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackedContexts {
    pub batches: Vec<ContextBatch>,
    pub delimiter: Delimiter,
    pub context_limit: usize,
}

impl PackedContexts {
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Rendered batch texts, in batch order
    pub fn render(&self) -> Vec<String> {
        self.batches
            .iter()
            .map(|batch| batch.render(&self.delimiter))
            .collect()
    }

    /// Diagnostic map from batch index to token total and item count
    pub fn stats(&self) -> BTreeMap<usize, BatchStats> {
        self.batches
            .iter()
            .enumerate()
            .map(|(idx, batch)| {
                (
                    idx,
                    BatchStats {
                        tokens: batch.tokens,
                        items: batch.len(),
                    },
                )
            })
            .collect()
    }

    /// Number of batches whose real total exceeds the limit
    pub fn overflowing(&self) -> usize {
        self.batches
            .iter()
            .filter(|batch| batch.tokens > self.context_limit)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delimiter_wraps_with_newline() {
        let delimiter = Delimiter::new("summary");
        assert_eq!(delimiter.wrap("abc"), "<summary>abc</summary>\n");
    }

    #[test]
    fn test_batch_render_concatenates() {
        let batch = ContextBatch {
            items: vec!["a".to_string(), "b".to_string()],
            tokens: 2,
        };
        assert_eq!(batch.render(&Delimiter::default()), "<msg>a</msg>\n<msg>b</msg>\n");
    }

    #[test]
    fn test_stats_and_overflow() {
        let packed = PackedContexts {
            batches: vec![
                ContextBatch { items: vec!["x".into(); 3], tokens: 12 },
                ContextBatch { items: vec!["y".into()], tokens: 4 },
            ],
            delimiter: Delimiter::default(),
            context_limit: 10,
        };
        let stats = packed.stats();
        assert_eq!(stats[&0], BatchStats { tokens: 12, items: 3 });
        assert_eq!(stats[&1], BatchStats { tokens: 4, items: 1 });
        assert_eq!(packed.overflowing(), 1);
    }
}
