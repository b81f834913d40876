use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use reviewsense::{
    BuiltinEncoder, JsonLinesSource, ModelManager, OnnxEmbedder, PipelineConfig, Review,
    ReviewSource, RuntimeConfig, SentimentPipeline,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON-lines file of reviews with `text` and `stars` fields
    reviews: PathBuf,

    /// Read at most this many usable reviews
    #[arg(long, default_value_t = 5000)]
    limit: usize,

    /// JSON file with pipeline settings; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Ratings at or below this are negative
    #[arg(long)]
    low: Option<i64>,

    /// Ratings at or above this are positive
    #[arg(long)]
    high: Option<i64>,

    /// Fraction of examples held out for evaluation
    #[arg(long)]
    test_fraction: Option<f64>,

    /// Seed for the train/test shuffle
    #[arg(long)]
    seed: Option<u64>,

    /// Iteration cap for logistic regression
    #[arg(long)]
    max_iter: Option<usize>,

    /// Worker threads used for embedding
    #[arg(long)]
    workers: Option<usize>,

    /// Truncate texts to this many tokens
    #[arg(long)]
    max_tokens: Option<usize>,

    /// ONNX encoder to use instead of the built-in BERT model
    #[arg(long, requires = "tokenizer_path")]
    model_path: Option<String>,

    /// tokenizer.json matching --model-path
    #[arg(long, requires = "model_path")]
    tokenizer_path: Option<String>,

    /// Force a fresh download of the encoder files
    #[arg(short, long)]
    fresh: bool,

    /// Print the evaluation report as JSON
    #[arg(long)]
    json: bool,
}

impl Args {
    fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)
                .with_context(|| format!("loading config from {:?}", path))?,
            None => PipelineConfig::default(),
        };

        if let Some(low) = self.low {
            config.thresholds.low = low;
        }
        if let Some(high) = self.high {
            config.thresholds.high = high;
        }
        if let Some(fraction) = self.test_fraction {
            config.split.test_fraction = fraction;
        }
        if let Some(seed) = self.seed {
            config.split.seed = seed;
        }
        if let Some(max_iter) = self.max_iter {
            config.training.max_iter = max_iter;
        }
        if let Some(workers) = self.workers {
            config.batch.workers = workers;
        }
        if let Some(max_tokens) = self.max_tokens {
            config.embedder.max_sequence_length = max_tokens;
        }
        Ok(config)
    }
}

async fn ensure_model_downloaded(fresh: bool) -> Result<()> {
    let manager = ModelManager::new_default()?;
    let model = BuiltinEncoder::BertBaseUncased;

    if fresh {
        info!("Fresh download requested - removing any existing model files...");
        manager.remove_download(model)?;
    }

    manager.ensure_model_downloaded(model).await?;
    Ok(())
}

fn build_embedder(args: &Args, config: &PipelineConfig) -> Result<OnnxEmbedder> {
    // Embedding workers already run in parallel, so keep each session single-threaded then
    let runtime = if config.batch.workers > 1 {
        RuntimeConfig::with_intra_threads(1)
    } else {
        RuntimeConfig::default()
    };
    let builder = OnnxEmbedder::builder()
        .with_runtime_config(runtime)
        .with_config(config.embedder);

    let builder = match (&args.model_path, &args.tokenizer_path) {
        (Some(model), Some(tokenizer)) => {
            builder.with_custom_model(model, tokenizer, Some(config.embedder.max_sequence_length))?
        }
        _ => builder.with_model(BuiltinEncoder::BertBaseUncased)?,
    };
    Ok(builder.build()?)
}

/// Reports how many reviews fill the whole token window and lose their tail
fn log_truncation(embedder: &OnnxEmbedder, reviews: &[Review]) -> Result<()> {
    if !log::log_enabled!(log::Level::Info) {
        return Ok(());
    }
    let limit = embedder.config().max_sequence_length;
    let mut at_limit = 0usize;
    for review in reviews {
        if embedder.count_tokens(&review.text)? >= limit {
            at_limit += 1;
        }
    }
    info!("{} of {} reviews reach the {} token limit", at_limit, reviews.len(), limit);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = args.pipeline_config()?;

    info!("=== Review Sentiment Training ===");
    let start = Instant::now();

    info!("Fetching reviews from {:?}...", args.reviews);
    let reviews = JsonLinesSource::new(&args.reviews)
        .with_limit(args.limit)
        .load()
        .with_context(|| format!("reading reviews from {:?}", args.reviews))?;
    info!("Fetched {} reviews.", reviews.len());

    if args.model_path.is_none() {
        ensure_model_downloaded(args.fresh).await?;
    }
    let embedder = build_embedder(&args, &config)?;
    log_truncation(&embedder, &reviews)?;

    info!("Training sentiment analysis model with encoder embeddings...");
    let outcome = SentimentPipeline::new(config).run(&reviews, &embedder)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome.report)?);
    } else {
        println!("Classification Report:");
        println!("{}", outcome.report);
    }

    info!(
        "Trained on {} reviews, evaluated on {}, dropped {} neutral; total time {:.2?}",
        outcome.train_size,
        outcome.test_size,
        outcome.dropped,
        start.elapsed()
    );
    Ok(())
}
