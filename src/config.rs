//! Configuration loading
//!
//! Sources are layered: an optional TOML file, then `DIGEST__<SECTION>__<KEY>`
//! environment variables. A `.env` file in the working directory is loaded
//! first so both layers can come from it.

use crate::context::{ContextBudget, Delimiter, ReductionPlan, StagePlan};
use crate::error::{DigestError, Result};
use ::config::{Config as RawConfig, Environment, File, FileFormat};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub packing: PackingConfig,

    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load from an optional TOML file plus environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut builder = RawConfig::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        let raw = builder
            .add_source(
                Environment::with_prefix("DIGEST")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Self::finish(raw.try_deserialize()?)
    }

    /// Load from a TOML document, without environment overrides
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let raw = RawConfig::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?;
        Self::finish(raw.try_deserialize()?)
    }

    fn finish(mut config: Config) -> Result<Self> {
        config.llm = config.llm.from_env();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.llm.validate()?;
        self.packing.validate()
    }
}

/// Chat completion endpoint settings
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API, without `/chat/completions`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Falls back to `OPENAI_API_KEY`, then `OPENAI_API`
    #[serde(default)]
    pub api_key: Option<SecretString>,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Retries after the first attempt, for network errors, 429 and 5xx only
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_base_url() -> String { "https://api.openai.com/v1".to_string() }
fn default_model() -> String { "gpt-4o-mini".to_string() }
fn default_timeout_ms() -> u64 { 60_000 }
fn default_max_retries() -> usize { 3 }
fn default_retry_backoff_ms() -> u64 { 500 }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl LlmConfig {
    /// Fill the API key from the environment when the config left it unset
    pub fn from_env(mut self) -> Self {
        if self.api_key.is_none() {
            self.api_key = ["OPENAI_API_KEY", "OPENAI_API"]
                .iter()
                .find_map(|name| std::env::var(name).ok().filter(|v| !v.is_empty()))
                .map(SecretString::new);
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(DigestError::Configuration("llm.base_url is empty".to_string()));
        }
        if self.model.trim().is_empty() {
            return Err(DigestError::Configuration("llm.model is empty".to_string()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// Batch sizing for each reduction stage
#[derive(Debug, Clone, Deserialize)]
pub struct PackingConfig {
    /// Model context window in tokens
    #[serde(default = "default_context_window")]
    pub context_window: usize,

    /// Share of the window used when packing raw messages
    #[serde(default = "default_message_fraction")]
    pub message_fraction: f64,

    /// Share of the window used when merging cluster summaries
    #[serde(default = "default_summary_fraction")]
    pub summary_fraction: f64,

    /// Share of the window used when merging channel summaries
    #[serde(default = "default_channel_summary_fraction")]
    pub channel_summary_fraction: f64,

    #[serde(default = "default_message_tag")]
    pub message_tag: String,

    #[serde(default = "default_summary_tag")]
    pub summary_tag: String,

    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,

    /// Fixed RNG seed; random when unset
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_context_window() -> usize { 128_000 }
fn default_message_fraction() -> f64 { 0.75 }
fn default_summary_fraction() -> f64 { 0.75 }
fn default_channel_summary_fraction() -> f64 { 0.6 }
fn default_message_tag() -> String { "msg".to_string() }
fn default_summary_tag() -> String { "summary".to_string() }
fn default_max_rounds() -> usize { 8 }

impl Default for PackingConfig {
    fn default() -> Self {
        Self {
            context_window: default_context_window(),
            message_fraction: default_message_fraction(),
            summary_fraction: default_summary_fraction(),
            channel_summary_fraction: default_channel_summary_fraction(),
            message_tag: default_message_tag(),
            summary_tag: default_summary_tag(),
            max_rounds: default_max_rounds(),
            seed: None,
        }
    }
}

impl PackingConfig {
    pub fn validate(&self) -> Result<()> {
        for fraction in [
            self.message_fraction,
            self.summary_fraction,
            self.channel_summary_fraction,
        ] {
            ContextBudget::new(self.context_window, fraction)?;
        }
        if self.message_tag.trim().is_empty() || self.summary_tag.trim().is_empty() {
            return Err(DigestError::Configuration(
                "packing tags must not be empty".to_string(),
            ));
        }
        if self.max_rounds == 0 {
            return Err(DigestError::Configuration(
                "packing.max_rounds must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn message_limit(&self) -> Result<usize> {
        Ok(ContextBudget::new(self.context_window, self.message_fraction)?.limit())
    }

    /// Plan for reducing a cluster of messages
    pub fn cluster_plan(&self) -> Result<ReductionPlan> {
        self.plan_with_merge_fraction(self.summary_fraction)
    }

    /// Plan for reducing a whole channel; merges use a tighter budget
    pub fn channel_plan(&self) -> Result<ReductionPlan> {
        self.plan_with_merge_fraction(self.channel_summary_fraction)
    }

    fn plan_with_merge_fraction(&self, merge_fraction: f64) -> Result<ReductionPlan> {
        let merge_limit = ContextBudget::new(self.context_window, merge_fraction)?.limit();
        Ok(ReductionPlan {
            messages: StagePlan {
                context_limit: self.message_limit()?,
                delimiter: Delimiter::new(self.message_tag.clone()),
            },
            summaries: StagePlan {
                context_limit: merge_limit,
                delimiter: Delimiter::new(self.summary_tag.clone()),
            },
            max_rounds: self.max_rounds,
        })
    }
}

/// Optional analysis steps
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Derive a one-line topic from each cluster description
    #[serde(default)]
    pub extract_topic: bool,

    #[serde(default = "default_max_locations")]
    pub max_locations: usize,
}

fn default_max_locations() -> usize { 10 }

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            extract_topic: false,
            max_locations: default_max_locations(),
        }
    }
}

/// Logging output settings
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String { "info".to_string() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
