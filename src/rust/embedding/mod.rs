use std::collections::HashMap;
use std::sync::Arc;

use ndarray::{Array1, Array2};
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;

use crate::config::EmbedderConfig;
use crate::error::PipelineError;

pub mod builder;
mod utils;

pub use builder::EmbedderBuilder;
pub(crate) use utils::normalize_vector;

/// Fixed-length numeric representation of one text
pub type EmbeddingVector = Array1<f32>;

/// Turns a single text into a fixed-width vector.
///
/// Implementations must be deterministic and free of side effects apart from
/// compute cost, and safe to call from several threads at once: the batcher
/// shares one embedder across its workers.
pub trait TextEmbedder: Send + Sync {
    /// Embeds `text`. The returned vector always has `dimension()` entries.
    ///
    /// # Errors
    /// - `EncodingError` if the text cannot be tokenized
    /// - `ModelError` if the encoder fails to run
    fn embed(&self, text: &str) -> Result<EmbeddingVector, PipelineError>;

    /// Width of every vector this embedder produces
    fn dimension(&self) -> usize;
}

/// Token sequences ready to be fed to the encoder, all of one length.
#[derive(Debug, Clone)]
pub(crate) struct EncodedText {
    pub ids: Vec<i64>,
    pub attention_mask: Vec<i64>,
    pub type_ids: Vec<i64>,
}

/// Shared ONNX encoding logic for anything holding a tokenizer and a session.
///
/// The ONNX model is expected to:
/// - Accept `input_ids` and `attention_mask` (and optionally `token_type_ids`),
///   each shaped [batch_size, sequence_length]
/// - Output the last hidden state shaped [batch_size, sequence_length, hidden_size]
///
/// The hidden state of the first ([CLS]) token is used as the text embedding.
pub(crate) trait OnnxEncoding {
    fn tokenizer(&self) -> Option<&Tokenizer>;

    fn session(&self) -> Option<&Session>;

    fn embedder_config(&self) -> &EmbedderConfig;

    /// Counts tokens after truncation, special tokens included.
    fn count_tokens(&self, text: &str) -> Result<usize, PipelineError> {
        self.tokenize(text).map(|encoded| {
            encoded.attention_mask.iter().filter(|&&m| m == 1).count()
        })
    }

    /// Tokenizes `text` with the truncation and padding configured on the tokenizer.
    ///
    /// # Errors
    /// - `TokenizerError` if the tokenizer is not initialized
    /// - `EncodingError` if the text is blank or cannot be encoded
    fn tokenize(&self, text: &str) -> Result<EncodedText, PipelineError> {
        let tokenizer = self.tokenizer()
            .ok_or_else(|| PipelineError::TokenizerError("Tokenizer not initialized".into()))?;

        if text.trim().is_empty() {
            return Err(PipelineError::EncodingError("Input text cannot be empty".into()));
        }

        let encoding = tokenizer.encode(text, true)
            .map_err(|e| PipelineError::EncodingError(e.to_string()))?;

        let widen = |values: &[u32]| values.iter().map(|&v| i64::from(v)).collect::<Vec<_>>();
        let encoded = EncodedText {
            ids: widen(encoding.get_ids()),
            attention_mask: widen(encoding.get_attention_mask()),
            type_ids: widen(encoding.get_type_ids()),
        };

        if encoded.ids.is_empty() {
            return Err(PipelineError::EncodingError("Text produced no tokens".into()));
        }
        Ok(encoded)
    }

    /// Runs the encoder over already tokenized input and returns the CLS vector.
    ///
    /// # Errors
    /// - `ModelError` if the session is not initialized
    /// - `ModelError` if tensor creation, execution or output extraction fails
    fn get_embedding(&self, encoded: &EncodedText) -> Result<EmbeddingVector, PipelineError> {
        let session = self.session()
            .ok_or_else(|| PipelineError::ModelError("Session not initialized".into()))?;

        let seq_len = encoded.ids.len();
        let to_tensor = |name: &str, values: &[i64]| -> Result<Tensor<i64>, PipelineError> {
            let array = Array2::from_shape_vec((1, seq_len), values.to_vec())
                .map_err(|e| PipelineError::ModelError(format!("Failed to create {} array: {}", name, e)))?;
            let array_dyn = array.into_dyn();
            let standard = array_dyn.as_standard_layout();
            Tensor::from_array(&standard)
                .map_err(|e| PipelineError::ModelError(format!("Failed to create {} tensor: {}", name, e)))
        };

        let mut input_tensors = HashMap::new();
        input_tensors.insert("input_ids", to_tensor("input_ids", &encoded.ids)?);
        input_tensors.insert("attention_mask", to_tensor("attention_mask", &encoded.attention_mask)?);
        if session.inputs.iter().any(|input| input.name == "token_type_ids") {
            input_tensors.insert("token_type_ids", to_tensor("token_type_ids", &encoded.type_ids)?);
        }

        let outputs = session.run(input_tensors)
            .map_err(|e| PipelineError::ModelError(format!("Failed to run model: {}", e)))?;
        let output_tensor = outputs[0].try_extract_tensor::<f32>()
            .map_err(|e| PipelineError::ModelError(format!("Failed to extract output tensor: {}", e)))?;

        if output_tensor.ndim() != 3 {
            return Err(PipelineError::ModelError(format!(
                "Expected a [batch, sequence, hidden] output, got shape {:?}",
                output_tensor.shape()
            )));
        }

        let cls = output_tensor.slice(ndarray::s![0, 0, ..]);
        let embedding: EmbeddingVector = cls.iter().cloned().collect();

        if self.embedder_config().normalize {
            Ok(normalize_vector(&embedding))
        } else {
            Ok(embedding)
        }
    }

    fn embed_text(&self, text: &str) -> Result<EmbeddingVector, PipelineError> {
        let encoded = self.tokenize(text)?;
        self.get_embedding(&encoded)
    }
}

/// A pretrained encoder running on ONNX Runtime.
///
/// Cloning is cheap: the tokenizer and session are shared behind `Arc`, and
/// `Session::run` only needs a shared reference, so one instance can serve
/// every worker thread of a batch.
#[derive(Debug, Clone)]
pub struct OnnxEmbedder {
    pub model_path: String,
    pub tokenizer_path: String,
    pub(crate) tokenizer: Arc<Tokenizer>,
    pub(crate) session: Arc<Session>,
    pub(crate) config: EmbedderConfig,
    pub(crate) embedding_size: usize,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<OnnxEmbedder>();
    }
};

impl OnnxEncoding for OnnxEmbedder {
    fn tokenizer(&self) -> Option<&Tokenizer> {
        Some(&self.tokenizer)
    }

    fn session(&self) -> Option<&Session> {
        Some(&self.session)
    }

    fn embedder_config(&self) -> &EmbedderConfig {
        &self.config
    }
}

impl TextEmbedder for OnnxEmbedder {
    fn embed(&self, text: &str) -> Result<EmbeddingVector, PipelineError> {
        let embedding = self.embed_text(text)?;
        if embedding.len() != self.embedding_size {
            return Err(PipelineError::DimensionMismatchError {
                expected: self.embedding_size,
                actual: embedding.len(),
            });
        }
        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.embedding_size
    }
}

impl OnnxEmbedder {
    /// Creates a new EmbedderBuilder for fluent construction
    pub fn builder() -> EmbedderBuilder {
        EmbedderBuilder::new()
    }

    /// Number of real (non-padding) tokens the encoder sees for `text`
    pub fn count_tokens(&self, text: &str) -> Result<usize, PipelineError> {
        OnnxEncoding::count_tokens(self, text)
    }

    pub fn config(&self) -> &EmbedderConfig {
        &self.config
    }
}
