use std::path::Path;
use std::sync::Arc;

use log::{error, info};
use ort::session::Session;
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

use super::{OnnxEmbedder, OnnxEncoding};
use crate::config::EmbedderConfig;
use crate::error::PipelineError;
use crate::model_manager::ModelManager;
use crate::models::{BuiltinEncoder, ModelCharacteristics};
use crate::runtime::{create_session_builder, RuntimeConfig};

/// A builder for constructing an `OnnxEmbedder` with a fluent interface.
///
/// The model is loaded by `with_model` or `with_custom_model`; tokenization
/// settings are applied in `build`, so `with_config` may come before or after.
#[derive(Default, Debug)]
pub struct EmbedderBuilder {
    model_path: Option<String>,
    tokenizer_path: Option<String>,
    tokenizer: Option<Tokenizer>,
    session: Option<Session>,
    model_characteristics: Option<ModelCharacteristics>,
    config: EmbedderConfig,
    runtime_config: RuntimeConfig,
}

impl OnnxEncoding for EmbedderBuilder {
    fn tokenizer(&self) -> Option<&Tokenizer> {
        self.tokenizer.as_ref()
    }

    fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    fn embedder_config(&self) -> &EmbedderConfig {
        &self.config
    }
}

impl EmbedderBuilder {
    /// Creates a new empty EmbedderBuilder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the runtime configuration for ONNX model execution.
    ///
    /// Must be called before the model is loaded to take effect.
    pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime_config = config;
        self
    }

    /// Sets tokenization and post-processing options
    pub fn with_config(mut self, config: EmbedderConfig) -> Self {
        self.config = config;
        self
    }

    /// Truncates inputs to at most `max_len` tokens
    pub fn with_max_sequence_length(mut self, max_len: usize) -> Self {
        self.config.max_sequence_length = max_len;
        self
    }

    /// L2-normalizes every CLS vector before returning it
    pub fn normalize(mut self, normalize: bool) -> Self {
        self.config.normalize = normalize;
        self
    }

    /// Loads a built-in encoder from the default model cache.
    ///
    /// # Errors
    /// - `BuildError` if a model is already loaded
    /// - `BuildError` if the model has not been downloaded
    /// - `BuildError`/`ModelError` if the files fail to load or the model shape is wrong
    pub fn with_model(self, model: BuiltinEncoder) -> Result<Self, PipelineError> {
        let manager = ModelManager::new_default()
            .map_err(|e| PipelineError::BuildError(format!("Failed to create model manager: {}", e)))?;
        self.with_model_from(&manager, model)
    }

    /// Loads a built-in encoder from the cache managed by `manager`.
    pub fn with_model_from(mut self, manager: &ModelManager, model: BuiltinEncoder) -> Result<Self, PipelineError> {
        if self.model_path.is_some() || self.tokenizer_path.is_some() {
            return Err(PipelineError::BuildError("Model and tokenizer paths already set".to_string()));
        }

        manager.require_downloaded(model).map_err(|e| {
            PipelineError::BuildError(format!(
                "{}. Please download it first using ModelManager::download_model()",
                e
            ))
        })?;

        let model_path = manager.get_model_path(model);
        let tokenizer_path = manager.get_tokenizer_path(model);

        let (tokenizer, session) = self.load(&model_path, &tokenizer_path)?;

        self.model_characteristics = Some(model.characteristics());
        self.model_path = Some(model_path.to_string_lossy().to_string());
        self.tokenizer_path = Some(tokenizer_path.to_string_lossy().to_string());
        self.tokenizer = Some(tokenizer);
        self.session = Some(session);
        Ok(self)
    }

    /// Loads an encoder from explicit ONNX and tokenizer files.
    ///
    /// The embedding size is inferred by running a probe text through the
    /// model. `max_sequence_length` defaults to 512 tokens when not given.
    ///
    /// # Errors
    /// - `BuildError` if either path is empty, missing, or a model is already loaded
    /// - `BuildError`/`ModelError` if the files fail to load or the model shape is wrong
    pub fn with_custom_model(
        mut self,
        model_path: &str,
        tokenizer_path: &str,
        max_sequence_length: Option<usize>,
    ) -> Result<Self, PipelineError> {
        if model_path.is_empty() || tokenizer_path.is_empty() {
            return Err(PipelineError::BuildError("Model and tokenizer paths cannot be empty".to_string()));
        }
        if self.model_path.is_some() || self.tokenizer_path.is_some() {
            return Err(PipelineError::BuildError("Model and tokenizer paths already set".to_string()));
        }

        if !Path::new(model_path).exists() {
            return Err(PipelineError::BuildError(format!("Model file not found: {}", model_path)));
        }
        if !Path::new(tokenizer_path).exists() {
            return Err(PipelineError::BuildError(format!("Tokenizer file not found: {}", tokenizer_path)));
        }

        let (tokenizer, session) = self.load(Path::new(model_path), Path::new(tokenizer_path))?;
        self.tokenizer = Some(tokenizer);
        self.session = Some(session);

        let max_sequence_length = max_sequence_length.unwrap_or(512);
        self.configure_tokenizer(max_sequence_length)?;

        let embedding = self.embed_text("Test input to infer embedding size")?;
        let embedding_size = embedding.len();
        info!("Inferred embedding size from model: {}", embedding_size);

        self.model_characteristics = Some(ModelCharacteristics {
            embedding_size,
            max_sequence_length,
            model_size_mb: 0,
        });
        self.model_path = Some(model_path.to_string());
        self.tokenizer_path = Some(tokenizer_path.to_string());
        Ok(self)
    }

    /// Builds the embedder, fixing truncation and padding on the tokenizer.
    ///
    /// The effective sequence length is the smaller of the configured
    /// `max_sequence_length` and what the model supports.
    ///
    /// # Errors
    /// - `BuildError` if no model has been loaded
    /// - `TokenizerError` if truncation cannot be configured
    pub fn build(mut self) -> Result<OnnxEmbedder, PipelineError> {
        let characteristics = self.model_characteristics.take()
            .ok_or_else(|| PipelineError::BuildError("Model and tokenizer paths must be set".to_string()))?;

        let max_len = self.config.max_sequence_length.min(characteristics.max_sequence_length);
        self.config.max_sequence_length = max_len;
        self.configure_tokenizer(max_len)?;

        let tokenizer = Arc::new(self.tokenizer.take()
            .ok_or_else(|| PipelineError::BuildError("No tokenizer loaded".into()))?);
        let session = Arc::new(self.session.take()
            .ok_or_else(|| PipelineError::BuildError("No ONNX model loaded".into()))?);

        info!(
            "Embedder ready: {} dimensions, {} max tokens",
            characteristics.embedding_size, max_len
        );

        Ok(OnnxEmbedder {
            model_path: self.model_path.take().unwrap_or_default(),
            tokenizer_path: self.tokenizer_path.take().unwrap_or_default(),
            tokenizer,
            session,
            config: self.config,
            embedding_size: characteristics.embedding_size,
        })
    }

    fn load(&self, model_path: &Path, tokenizer_path: &Path) -> Result<(Tokenizer, Session), PipelineError> {
        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| {
                error!("Failed to load tokenizer: {}", e);
                PipelineError::BuildError(format!("Failed to load tokenizer: {}", e))
            })?;
        info!("Tokenizer loaded successfully");

        let session = create_session_builder(&self.runtime_config)?
            .commit_from_file(model_path)?;

        Self::validate_model(&session)?;
        info!("Model structure validated successfully");

        Ok((tokenizer, session))
    }

    /// Head-truncates to `max_len` tokens and, when configured, pads to exactly `max_len`.
    fn configure_tokenizer(&mut self, max_len: usize) -> Result<(), PipelineError> {
        let pad = self.config.pad_to_max_length;
        let tokenizer = self.tokenizer.as_mut()
            .ok_or_else(|| PipelineError::BuildError("No tokenizer loaded".into()))?;

        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: max_len,
                ..Default::default()
            }))
            .map_err(|e| PipelineError::TokenizerError(format!("Failed to set truncation: {}", e)))?;

        let padding = pad.then(|| PaddingParams {
            strategy: PaddingStrategy::Fixed(max_len),
            ..Default::default()
        });
        tokenizer.with_padding(padding);
        Ok(())
    }

    /// Validates that the model has the expected input/output structure
    fn validate_model(session: &Session) -> Result<(), PipelineError> {
        let inputs = &session.inputs;
        if inputs.len() < 2 {
            return Err(PipelineError::ModelError(
                format!("Model must have at least 2 inputs (input_ids and attention_mask), found {}", inputs.len())
            ));
        }
        for required in ["input_ids", "attention_mask"] {
            if !inputs.iter().any(|input| input.name == required) {
                return Err(PipelineError::ModelError(format!("Model is missing the '{}' input", required)));
            }
        }

        if session.outputs.is_empty() {
            return Err(PipelineError::ModelError(
                "Model must have at least 1 output for embeddings".to_string()
            ));
        }

        Ok(())
    }
}
