/// Static properties of an encoder model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCharacteristics {
    /// Width of the hidden state, and therefore of every embedding
    pub embedding_size: usize,
    /// Longest token sequence the model accepts
    pub max_sequence_length: usize,
    pub model_size_mb: usize,
}

/// Where to fetch an encoder's files and, when pinned, what they hash to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub name: String,
    pub model_url: String,
    pub tokenizer_url: String,
    /// Expected SHA-256 of the ONNX file; `None` accepts any download
    pub model_hash: Option<String>,
    /// Expected SHA-256 of tokenizer.json; `None` accepts any download
    pub tokenizer_hash: Option<String>,
}

/// Encoders that can be downloaded by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinEncoder {
    /// BERT base, uncased vocabulary, exported to ONNX
    BertBaseUncased,
}

impl BuiltinEncoder {
    pub fn characteristics(&self) -> ModelCharacteristics {
        match self {
            Self::BertBaseUncased => ModelCharacteristics {
                embedding_size: 768,
                max_sequence_length: 512,
                model_size_mb: 438,
            },
        }
    }

    pub fn get_model_info(&self) -> ModelInfo {
        match self {
            Self::BertBaseUncased => ModelInfo {
                name: "bert-base-uncased".to_string(),
                model_url: "https://huggingface.co/Xenova/bert-base-uncased/resolve/main/onnx/model.onnx"
                    .to_string(),
                tokenizer_url: "https://huggingface.co/Xenova/bert-base-uncased/resolve/main/tokenizer.json"
                    .to_string(),
                model_hash: None,
                tokenizer_hash: None,
            },
        }
    }
}
