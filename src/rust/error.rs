use ort::Error as OrtError;
use std::io;

/// Represents the different types of errors that can occur in the sentiment pipeline.
///
/// Every stage returns these unmodified to the caller; the pipeline never
/// retries or continues with partial data.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// No review survived label thresholding
    #[error("Empty dataset: {0}")]
    EmptyDatasetError(String),
    /// The low threshold is not strictly below the high threshold
    #[error("Invalid thresholds: low {low} must be below high {high}")]
    InvalidThresholdsError { low: i64, high: i64 },
    /// Test fraction outside (0, 1), or a dataset too small to split
    #[error("Invalid split: {0}")]
    InvalidSplitError(String),
    /// A text could not be turned into an embedding
    #[error("Encoding error: {0}")]
    EncodingError(String),
    /// Training data that cannot produce a two-class model
    #[error("Degenerate training set: {0}")]
    DegenerateTrainingSetError(String),
    /// A vector whose width differs from the rest of the run
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatchError { expected: usize, actual: usize },
    /// Malformed label sequences handed to the evaluator
    #[error("Report computation error: {0}")]
    ReportComputationError(String),
    /// Error occurred while loading or using the tokenizer
    #[error("Tokenizer error: {0}")]
    TokenizerError(String),
    /// Error occurred while loading or running the ONNX model
    #[error("Model error: {0}")]
    ModelError(String),
    /// Error occurred while assembling an embedder
    #[error("Build error: {0}")]
    BuildError(String),
    /// A review record that could not be read
    #[error("Source error at line {line}: {message}")]
    SourceError { line: usize, message: String },
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl From<OrtError> for PipelineError {
    fn from(err: OrtError) -> Self {
        PipelineError::BuildError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_context() {
        let err = PipelineError::InvalidThresholdsError { low: 4, high: 2 };
        assert_eq!(err.to_string(), "Invalid thresholds: low 4 must be below high 2");

        let err = PipelineError::DimensionMismatchError { expected: 768, actual: 384 };
        assert!(err.to_string().contains("expected 768"));
    }

    #[test]
    fn test_io_conversion() {
        let err: PipelineError = io::Error::new(io::ErrorKind::NotFound, "missing").into();
        assert!(matches!(err, PipelineError::IoError(_)));
    }
}
