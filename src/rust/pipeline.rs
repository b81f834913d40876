use std::time::Instant;

use log::info;

use crate::batcher::embed_all_labeled;
use crate::classifier::{LogisticRegression, TrainedClassifier};
use crate::config::PipelineConfig;
use crate::dataset::{self, Review};
use crate::embedding::TextEmbedder;
use crate::error::PipelineError;
use crate::evaluator::{evaluate, EvaluationReport};
use crate::splitter::split;

/// Everything a finished run produces
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub report: EvaluationReport,
    pub classifier: TrainedClassifier,
    pub train_size: usize,
    pub test_size: usize,
    /// Reviews dropped for falling in the neutral rating band
    pub dropped: usize,
}

/// Runs build → split → embed → fit → predict → evaluate, one stage at a time.
///
/// Any stage failure ends the run and is returned unchanged.
#[derive(Debug, Clone, Default)]
pub struct SentimentPipeline {
    config: PipelineConfig,
}

impl SentimentPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(
        &self,
        reviews: &[Review],
        embedder: &dyn TextEmbedder,
    ) -> Result<PipelineOutcome, PipelineError> {
        let start = Instant::now();
        let config = &self.config;

        let dataset = dataset::build(reviews, &config.thresholds)?;
        let dropped = reviews.len() - dataset.len();

        let (train, test) = split(&dataset, config.split.test_fraction, config.split.seed)?;
        info!("Split into {} training and {} test examples", train.len(), test.len());

        info!("Encoding training texts...");
        let train_vectors = embed_all_labeled(&train.texts(), embedder, &config.batch, "train")?;
        info!("Encoding testing texts...");
        let test_vectors = embed_all_labeled(&test.texts(), embedder, &config.batch, "test")?;

        let classifier = LogisticRegression::new(config.training)
            .fit(&train_vectors, &train.labels())?;

        let predicted = classifier.predict(&test_vectors)?;
        let report = evaluate(&test.labels(), &predicted)?;

        info!(
            "Pipeline finished in {:.2?}: accuracy {:.3} on {} held-out reviews",
            start.elapsed(),
            report.accuracy,
            test.len()
        );

        Ok(PipelineOutcome {
            report,
            classifier,
            train_size: train.len(),
            test_size: test.len(),
            dropped,
        })
    }
}
