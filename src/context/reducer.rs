//! Hierarchical reduction: pack, summarize each batch, repeat on the
//! summaries until exactly one remains.

use super::models::{Delimiter, PackedContexts, SummaryStage};
use super::packer::ContextPacker;
use super::summarizer::Summarizer;
use super::token_estimator::TokenEstimator;
use crate::error::{DigestError, Result};
use crate::metrics::METRICS;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Packing parameters for one stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagePlan {
    pub context_limit: usize,
    pub delimiter: Delimiter,
}

/// Budgets and bounds for a whole reduction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReductionPlan {
    /// First round, over raw messages
    pub messages: StagePlan,
    /// Every later round, over summaries
    pub summaries: StagePlan,
    /// Rounds allowed before giving up with `NotConverged`
    pub max_rounds: usize,
}

impl ReductionPlan {
    /// Same limit for both stages, `msg` and `summary` tags
    pub fn uniform(context_limit: usize, max_rounds: usize) -> Self {
        Self {
            messages: StagePlan {
                context_limit,
                delimiter: Delimiter::new("msg"),
            },
            summaries: StagePlan {
                context_limit,
                delimiter: Delimiter::new("summary"),
            },
            max_rounds,
        }
    }

    pub fn stage(&self, stage: SummaryStage) -> &StagePlan {
        match stage {
            SummaryStage::Messages => &self.messages,
            SummaryStage::Summaries => &self.summaries,
        }
    }
}

/// Outcome of a successful reduction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reduction {
    pub summary: String,
    pub rounds: usize,
    pub oracle_calls: usize,
}

/// Where a reduction currently stands
#[derive(Debug)]
enum ReductionState {
    Packing {
        texts: Vec<String>,
        stage: SummaryStage,
    },
    Summarizing {
        packed: PackedContexts,
        stage: SummaryStage,
    },
    Done(String),
}

/// Drives a `Summarizer` over packed batches until one summary is left
#[derive(Clone)]
pub struct HierarchicalSummarizer {
    estimator: Arc<dyn TokenEstimator>,
    plan: ReductionPlan,
}

impl HierarchicalSummarizer {
    pub fn new(estimator: Arc<dyn TokenEstimator>, plan: ReductionPlan) -> Result<Self> {
        if plan.max_rounds == 0 {
            return Err(DigestError::Configuration(
                "reduction needs at least one round".to_string(),
            ));
        }
        // Fail on a zero limit here rather than mid-reduction.
        ContextPacker::new(estimator.clone(), plan.messages.context_limit)?;
        ContextPacker::new(estimator.clone(), plan.summaries.context_limit)?;
        Ok(Self { estimator, plan })
    }

    fn packer(&self, stage: SummaryStage) -> Result<ContextPacker> {
        let stage_plan = self.plan.stage(stage);
        Ok(ContextPacker::new(self.estimator.clone(), stage_plan.context_limit)?
            .with_delimiter(stage_plan.delimiter.clone()))
    }

    /// Reduce `texts` to a single summary.
    ///
    /// Oracle calls run one at a time. The first failure aborts the whole
    /// reduction; summaries already produced are discarded.
    pub async fn reduce<S, R>(
        &self,
        texts: Vec<String>,
        summarizer: &S,
        rng: &mut R,
    ) -> Result<Reduction>
    where
        S: Summarizer + ?Sized,
        R: Rng + Send + ?Sized,
    {
        if texts.is_empty() {
            return Err(DigestError::EmptyInput);
        }

        let mut rounds = 0;
        let mut oracle_calls = 0;
        let mut state = ReductionState::Packing {
            texts,
            stage: SummaryStage::Messages,
        };

        let result = loop {
            state = match state {
                ReductionState::Packing { texts, stage } => {
                    if rounds >= self.plan.max_rounds {
                        warn!(
                            "Reduction stopped after {} rounds with {} summaries left",
                            rounds,
                            texts.len()
                        );
                        break Err(DigestError::NotConverged {
                            rounds,
                            remaining: texts.len(),
                        });
                    }
                    let packed = self.packer(stage)?.pack(&texts, &mut *rng);
                    ReductionState::Summarizing { packed, stage }
                }
                ReductionState::Summarizing { packed, stage } => {
                    rounds += 1;
                    info!(
                        "Round {} ({}): summarizing {} batches",
                        rounds,
                        stage,
                        packed.len()
                    );

                    let mut summaries = Vec::with_capacity(packed.len());
                    for (idx, batch) in packed.render().into_iter().enumerate() {
                        debug!("Summarizing batch {} of {}", idx + 1, packed.len());
                        oracle_calls += 1;
                        let outcome = summarizer.summarize(&batch, stage).await;
                        METRICS.record_oracle_call(stage.as_str(), outcome.is_ok());
                        match outcome {
                            Ok(summary) => summaries.push(summary),
                            Err(e) => {
                                warn!("Batch {} failed, aborting reduction: {}", idx + 1, e);
                                METRICS.record_reduction(false, rounds);
                                return Err(e.into());
                            }
                        }
                    }

                    if summaries.len() == 1 {
                        ReductionState::Done(summaries.remove(0))
                    } else if summaries.is_empty() {
                        break Err(DigestError::EmptyInput);
                    } else {
                        ReductionState::Packing {
                            texts: summaries,
                            stage: SummaryStage::Summaries,
                        }
                    }
                }
                ReductionState::Done(summary) => {
                    break Ok(Reduction {
                        summary,
                        rounds,
                        oracle_calls,
                    });
                }
            };
        };

        METRICS.record_reduction(result.is_ok(), rounds);
        if let Ok(ref reduction) = result {
            info!(
                "Reduction finished: {} rounds, {} oracle calls",
                reduction.rounds, reduction.oracle_calls
            );
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::summarizer::ConcatenationSummarizer;
    use crate::context::token_estimator::FnEstimator;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn word_estimator() -> Arc<dyn TokenEstimator> {
        Arc::new(FnEstimator(|t: &str| t.split_whitespace().count()))
    }

    #[test]
    fn test_zero_rounds_rejected() {
        let plan = ReductionPlan::uniform(10, 0);
        assert!(HierarchicalSummarizer::new(word_estimator(), plan).is_err());
    }

    #[test]
    fn test_zero_limit_rejected() {
        let plan = ReductionPlan::uniform(0, 3);
        assert!(matches!(
            HierarchicalSummarizer::new(word_estimator(), plan),
            Err(DigestError::InvalidContextLimit)
        ));
    }

    #[tokio::test]
    async fn test_empty_input_fails_fast() {
        let reducer =
            HierarchicalSummarizer::new(word_estimator(), ReductionPlan::uniform(10, 3)).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let result = reducer
            .reduce(Vec::new(), &ConcatenationSummarizer, &mut rng)
            .await;
        assert!(matches!(result, Err(DigestError::EmptyInput)));
    }

    #[tokio::test]
    async fn test_single_item_single_call() {
        let reducer =
            HierarchicalSummarizer::new(word_estimator(), ReductionPlan::uniform(10, 3)).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let reduction = reducer
            .reduce(vec!["one two".to_string()], &ConcatenationSummarizer, &mut rng)
            .await
            .unwrap();
        assert_eq!(reduction.rounds, 1);
        assert_eq!(reduction.oracle_calls, 1);
        assert_eq!(reduction.summary, "<msg>one two</msg>\n");
    }
}
