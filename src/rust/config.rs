use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Rating cut-offs used to derive binary labels.
///
/// Ratings at or above `high` are positive, ratings at or below `low` are
/// negative, anything strictly in between is dropped as neutral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub low: i64,
    pub high: i64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self { low: 2, high: 4 }
    }
}

/// Train/test partitioning parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    pub test_fraction: f64,
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
        }
    }
}

/// Controls how a collection of texts is pushed through an embedder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Number of worker threads; 0 or 1 embeds on the calling thread
    pub workers: usize,
    /// Log a progress line every this many processed items (0 disables)
    pub progress_interval: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            progress_interval: 100,
        }
    }
}

/// Logistic regression hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub max_iter: usize,
    /// Stop once every gradient component is below this magnitude
    pub tolerance: f64,
    /// Inverse L2 regularization strength; larger means weaker penalty
    pub c: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            tolerance: 1e-4,
            c: 1.0,
        }
    }
}

/// Tokenization and post-processing settings for the ONNX embedder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedderConfig {
    /// Texts are head-truncated to this many tokens, special tokens included
    pub max_sequence_length: usize,
    /// Pad every text to `max_sequence_length` before running the model
    pub pad_to_max_length: bool,
    /// L2-normalize the CLS vector
    pub normalize: bool,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            max_sequence_length: 512,
            pad_to_max_length: true,
            normalize: false,
        }
    }
}

/// Everything a pipeline run needs, passed explicitly into each stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub thresholds: Thresholds,
    pub split: SplitConfig,
    pub batch: BatchConfig,
    pub training: TrainingConfig,
    pub embedder: EmbedderConfig,
}

impl PipelineConfig {
    /// Loads a configuration from a JSON file. Missing fields keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let raw = fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&raw).map_err(|e| PipelineError::SourceError {
            line: e.line(),
            message: format!("Invalid config {:?}: {}", path.as_ref(), e),
        })
    }
}
