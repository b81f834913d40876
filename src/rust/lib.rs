//! Review sentiment classification on pretrained encoder embeddings.
//!
//! Reviews with a star rating are labeled positive or negative by
//! thresholding, split into training and test sets, embedded with a
//! pretrained encoder, and used to fit a logistic regression whose held-out
//! precision, recall and F1 are reported.
//!
//! # Basic Usage
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use reviewsense::{BuiltinEncoder, OnnxEmbedder, PipelineConfig, Review, SentimentPipeline};
//!
//! let embedder = OnnxEmbedder::builder()
//!     .with_model(BuiltinEncoder::BertBaseUncased)?
//!     .build()?;
//!
//! let reviews = vec![
//!     Review::new("Best tacos in town", 5),
//!     Review::new("Cold food, rude staff", 1),
//!     Review::new("It was fine", 3),
//!     Review::new("Will come back for sure", 4),
//!     Review::new("Waited an hour for nothing", 2),
//! ];
//!
//! let outcome = SentimentPipeline::new(PipelineConfig::default()).run(&reviews, &embedder)?;
//! println!("{}", outcome.report);
//! # Ok(())
//! # }
//! ```
//!
//! # Custom Embedders
//!
//! Anything implementing [`TextEmbedder`] can drive the pipeline, which keeps
//! it testable without downloading a model:
//!
//! ```
//! use ndarray::Array1;
//! use reviewsense::{EmbeddingVector, PipelineError, TextEmbedder};
//!
//! struct LengthEmbedder;
//!
//! impl TextEmbedder for LengthEmbedder {
//!     fn embed(&self, text: &str) -> Result<EmbeddingVector, PipelineError> {
//!         Ok(Array1::from(vec![text.len() as f32]))
//!     }
//!
//!     fn dimension(&self) -> usize {
//!         1
//!     }
//! }
//! ```

pub mod batcher;
pub mod classifier;
pub mod config;
pub mod dataset;
pub mod embedding;
pub mod error;
pub mod evaluator;
pub mod model_manager;
pub mod models;
pub mod pipeline;
mod runtime;
pub mod source;
pub mod splitter;

pub use batcher::embed_all;
pub use classifier::{LogisticRegression, TrainedClassifier};
pub use config::{BatchConfig, EmbedderConfig, PipelineConfig, SplitConfig, Thresholds, TrainingConfig};
pub use dataset::{Dataset, Label, LabeledExample, Review};
pub use embedding::{EmbedderBuilder, EmbeddingVector, OnnxEmbedder, TextEmbedder};
pub use error::PipelineError;
pub use evaluator::{evaluate, ClassMetrics, ConfusionMatrix, EvaluationReport};
pub use model_manager::{ModelError, ModelManager};
pub use models::{BuiltinEncoder, ModelCharacteristics, ModelInfo};
pub use pipeline::{PipelineOutcome, SentimentPipeline};
pub use runtime::{create_session_builder, RuntimeConfig};
pub use source::{JsonLinesSource, ReviewSource};
pub use splitter::split;

pub fn init_logger() {
    env_logger::init();
}
