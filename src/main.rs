use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use cluster_digest::context::{ContextPacker, Delimiter, TiktokenEstimator};
use cluster_digest::metrics::METRICS;
use cluster_digest::{logging, seeded_rng, Analyst, Config};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "cluster-digest", version, about = "Summarize message clusters with an LLM")]
struct Cli {
    /// TOML config file; DIGEST__* environment variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Fixed seed for batch assignment
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Print Prometheus metrics to stderr when done
    #[arg(long, global = true)]
    print_metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Pack messages into batches and print per-batch diagnostics (no model calls)
    Pack {
        #[command(flatten)]
        input: InputArgs,
        /// Token limit per batch; defaults to the configured message budget
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Summarize one cluster of messages
    DescribeCluster(InputArgs),
    /// Summarize a whole channel
    DescribeChannel(InputArgs),
    /// List the most important countries mentioned
    Locations(InputArgs),
    /// Extract keywords from a text
    Keywords(TextArgs),
    /// Extract the main country of a single message
    Country(TextArgs),
}

#[derive(Args)]
struct InputArgs {
    /// JSON array of strings, or one message per line
    #[arg(long, short)]
    input: PathBuf,
}

#[derive(Args)]
struct TextArgs {
    /// Literal text
    #[arg(long, conflicts_with = "input", required_unless_present = "input")]
    text: Option<String>,
    /// File whose whole content is the text
    #[arg(long, short)]
    input: Option<PathBuf>,
}

impl TextArgs {
    fn resolve(&self) -> anyhow::Result<String> {
        match (&self.text, &self.input) {
            (Some(text), _) => Ok(text.clone()),
            (None, Some(path)) => std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display())),
            (None, None) => anyhow::bail!("either --text or --input is required"),
        }
    }
}

fn read_messages(path: &Path) -> anyhow::Result<Vec<String>> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    if raw.trim_start().starts_with('[') {
        return serde_json::from_str(&raw)
            .with_context(|| format!("parsing {} as a JSON array of strings", path.display()));
    }
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if cli.seed.is_some() {
        config.packing.seed = cli.seed;
    }
    logging::init(&config.logging);

    let mut rng = seeded_rng(config.packing.seed);

    match &cli.command {
        Command::Pack { input, limit } => {
            let messages = read_messages(&input.input)?;
            let limit = match limit {
                Some(limit) => *limit,
                None => config.packing.message_limit()?,
            };
            let estimator = TiktokenEstimator::for_model(&config.llm.model)?;
            let packer = ContextPacker::new(Arc::new(estimator), limit)?
                .with_delimiter(Delimiter::new(config.packing.message_tag.clone()));
            let packed = packer.pack(&messages, &mut rng);
            println!("{}", serde_json::to_string_pretty(&packed.stats())?);
        }
        Command::DescribeCluster(input) => {
            let analyst = Analyst::from_config(&config)?;
            let description = analyst
                .describe_cluster(read_messages(&input.input)?, &mut rng)
                .await?;
            println!("{}", serde_json::to_string_pretty(&description)?);
        }
        Command::DescribeChannel(input) => {
            let analyst = Analyst::from_config(&config)?;
            let summary = analyst
                .describe_channel(read_messages(&input.input)?, &mut rng)
                .await?;
            println!("{}", summary);
        }
        Command::Locations(input) => {
            let analyst = Analyst::from_config(&config)?;
            let locations = analyst
                .extract_locations(&read_messages(&input.input)?, &mut rng)
                .await?;
            println!("{}", serde_json::to_string_pretty(&locations)?);
        }
        Command::Keywords(text) => {
            let analyst = Analyst::from_config(&config)?;
            let keywords = analyst.generate_keywords(&text.resolve()?).await?;
            println!("{}", serde_json::to_string_pretty(&keywords)?);
        }
        Command::Country(text) => {
            let analyst = Analyst::from_config(&config)?;
            match analyst.extract_country(&text.resolve()?).await? {
                Some(country) => println!("{}", country),
                None => println!(),
            }
        }
    }

    if cli.print_metrics {
        eprintln!("{}", METRICS.export_prometheus());
    }

    Ok(())
}
