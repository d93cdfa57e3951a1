//! Cluster and channel analysis built on the packer, the reducer and the model
//!
//! Every operation takes the model as an explicit dependency; callers create
//! one client and share it through `Arc`.

pub mod models;

pub use models::ClusterDescription;

use crate::config::{AnalysisConfig, Config, PackingConfig};
use crate::context::{
    ContextPacker, Delimiter, HierarchicalSummarizer, LlmSummarizer, SummaryPrompts,
    TiktokenEstimator, TokenEstimator,
};
use crate::error::Result;
use crate::llm::{
    complete_structured, ChatModel, ChatRequest, Country, KeywordExtraction, LocationsAndDates,
    MainTopic, OpenAiClient,
};
use crate::prompts;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tracing::{debug, info};

/// Seeded RNG when a seed is given, entropy otherwise
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Runs the analysis operations against one model
pub struct Analyst<M: ?Sized> {
    model: Arc<M>,
    estimator: Arc<dyn TokenEstimator>,
    packing: PackingConfig,
    analysis: AnalysisConfig,
}

impl Analyst<OpenAiClient> {
    /// Build the production analyst: OpenAI client plus the model's tokenizer
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = OpenAiClient::new(config.llm.clone())?;
        let estimator = TiktokenEstimator::for_model(&config.llm.model)?;
        Self::new(
            Arc::new(client),
            Arc::new(estimator),
            config.packing.clone(),
            config.analysis.clone(),
        )
    }
}

impl<M: ChatModel + ?Sized> Analyst<M> {
    pub fn new(
        model: Arc<M>,
        estimator: Arc<dyn TokenEstimator>,
        packing: PackingConfig,
        analysis: AnalysisConfig,
    ) -> Result<Self> {
        packing.validate()?;
        Ok(Self {
            model,
            estimator,
            packing,
            analysis,
        })
    }

    /// Describe one cluster: hierarchical summary, plus a topic line when enabled
    pub async fn describe_cluster<R>(
        &self,
        messages: Vec<String>,
        rng: &mut R,
    ) -> Result<ClusterDescription>
    where
        R: Rng + Send + ?Sized,
    {
        info!("Describing cluster of {} messages", messages.len());
        let reducer =
            HierarchicalSummarizer::new(self.estimator.clone(), self.packing.cluster_plan()?)?;
        let stages = SummaryPrompts::cluster(&self.packing.message_tag, &self.packing.summary_tag);
        let summarizer = LlmSummarizer::new(self.model.clone(), stages);
        let reduction = reducer.reduce(messages, &summarizer, rng).await?;

        let topic = if self.analysis.extract_topic {
            Some(self.main_topic(&reduction.summary).await?)
        } else {
            None
        };

        Ok(ClusterDescription {
            summary: reduction.summary,
            topic,
            rounds: reduction.rounds,
            oracle_calls: reduction.oracle_calls,
        })
    }

    /// Describe a whole channel
    pub async fn describe_channel<R>(&self, messages: Vec<String>, rng: &mut R) -> Result<String>
    where
        R: Rng + Send + ?Sized,
    {
        info!("Describing channel - {} messages", messages.len());
        let reducer =
            HierarchicalSummarizer::new(self.estimator.clone(), self.packing.channel_plan()?)?;
        let stages = SummaryPrompts::channel(&self.packing.message_tag, &self.packing.summary_tag);
        let summarizer = LlmSummarizer::new(self.model.clone(), stages);
        let reduction = reducer.reduce(messages, &summarizer, rng).await?;
        info!(
            "Describing channel - finished after {} rounds",
            reduction.rounds
        );
        Ok(reduction.summary)
    }

    /// Most important countries mentioned across `messages`, at most
    /// `max_locations` of them
    pub async fn extract_locations<R>(
        &self,
        messages: &[String],
        rng: &mut R,
    ) -> Result<Vec<String>>
    where
        R: Rng + Send + ?Sized,
    {
        let packer = ContextPacker::new(self.estimator.clone(), self.packing.message_limit()?)?
            .with_delimiter(Delimiter::new(self.packing.message_tag.clone()));
        let packed = packer.pack(messages, rng);

        let mut candidates = Vec::new();
        for batch in packed.render() {
            let request = ChatRequest::new(prompts::BATCH_LOCATIONS, format!("Texts:\n {}", batch))
                .expecting::<LocationsAndDates>();
            let found: LocationsAndDates =
                complete_structured(self.model.as_ref(), &request).await?;
            debug!("Batch yielded {} locations", found.locations_dates.len());
            candidates.extend(found.locations_dates);
        }

        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let request = ChatRequest::new(
            prompts::top_locations(self.analysis.max_locations),
            format!("Locations:\n {}", candidates.join(", ")),
        )
        .expecting::<KeywordExtraction>();
        let top: KeywordExtraction = complete_structured(self.model.as_ref(), &request).await?;

        let mut locations = top.keywords;
        locations.truncate(self.analysis.max_locations);
        Ok(locations)
    }

    /// 4 to 7 keywords, most important first
    pub async fn generate_keywords(&self, text: &str) -> Result<Vec<String>> {
        let request = ChatRequest::new(prompts::KEYWORDS, format!("Text:\n{}", text))
            .expecting::<KeywordExtraction>()
            .with_temperature(0.5);
        let response: KeywordExtraction = complete_structured(self.model.as_ref(), &request).await?;
        Ok(response.keywords)
    }

    /// Main country of a single message; `None` when none is named
    pub async fn extract_country(&self, text: &str) -> Result<Option<String>> {
        let request = ChatRequest::new(prompts::MESSAGE_COUNTRY, format!("Text:\n{}", text))
            .expecting::<Country>()
            .with_temperature(0.5);
        let response: Country = complete_structured(self.model.as_ref(), &request).await?;
        let country = response.country.trim();
        Ok((!country.is_empty()).then(|| country.to_string()))
    }

    /// One-line topic of `text`
    pub async fn main_topic(&self, text: &str) -> Result<String> {
        let request = ChatRequest::new(prompts::MAIN_TOPIC, format!("Text:\n {}", text))
            .expecting::<MainTopic>();
        let response: MainTopic = complete_structured(self.model.as_ref(), &request).await?;
        Ok(response.main_topic)
    }
}
