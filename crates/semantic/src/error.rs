use std::io;
use thiserror::Error;

/// Errors surfaced while loading an encoder or embedding a document.
#[derive(Debug, Error)]
pub enum EmbedError {
    /// A required model file is not cached locally and could not be fetched
    /// (offline mode, or the hub answered 404).
    #[error("model asset missing: {0}")]
    AssetMissing(String),
    /// Unable to download remote assets.
    #[error("download failed: {0}")]
    Download(String),
    /// Assets are present but the tokenizer or weights could not be loaded.
    #[error("model load failed: {0}")]
    ModelLoad(String),
    /// Configuration is inconsistent (e.g., unknown device).
    #[error("invalid embedder config: {0}")]
    InvalidConfig(String),
    /// The tokenizer rejected the input text.
    #[error("encoding failed: {0}")]
    Encoding(String),
    /// Forward pass or tensor conversion failure.
    #[error("inference failure: {0}")]
    Inference(String),
    /// Low-level IO failures while touching the filesystem.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl EmbedError {
    /// True for failures that mean the model could not be acquired at all
    /// (as opposed to a problem with the input document).
    pub fn is_model_acquisition(&self) -> bool {
        matches!(
            self,
            EmbedError::AssetMissing(_) | EmbedError::Download(_) | EmbedError::ModelLoad(_)
        )
    }
}
