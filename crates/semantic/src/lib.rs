//! Embeddings for source files.
//!
//! This crate turns a document into a single dense vector: the hidden state a pretrained encoder
//! produces for the sequence's leading `<s>`/`[CLS]` token. No mean pooling and no normalization
//! happen on top of it; consumers get exactly `last_hidden_state[0][0]`.
//!
//! Two backends:
//!
//! - **candle** - BERT-family weights (CodeBERT by default) fetched from the Hugging Face hub on
//!   first use, cached under `cache_dir`, and run locally on CPU (or CUDA when built for it).
//! - **stub** - deterministic hash-based encoder with an in-memory byte-level tokenizer. No
//!   downloads, same truncation and first-token rules. Handy for tests and offline runs.
//!
//! Documents longer than `max_sequence_length` tokens (512 by default, special tokens included)
//! are truncated on the right; dropped tokens never influence the result.
//!
//! ## Quick example
//!
//! ```no_run
//! use semantic::{Embedder, EmbedderConfig};
//!
//! let embedder = Embedder::load(&EmbedderConfig::default()).unwrap();
//! let embedding = embedder.embed("mov eax, 1\nret").unwrap();
//! println!("{} dims", embedding.embedding_dim);
//! ```

pub mod config;
pub mod encoder;
pub mod error;
pub mod types;

mod assets;
mod stub;
mod tokenize;

pub use crate::config::{Backend, EmbedderConfig, MAX_MODEL_SEQUENCE_LENGTH};
pub use crate::encoder::{first_token_state, BertEncoder, Encoder};
pub use crate::error::EmbedError;
pub use crate::stub::StubEncoder;
pub use crate::types::{Embedding, EncoderOutput, TokenizedInput};

use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::assets::resolve_model_assets;
use crate::encoder::select_device;
use crate::tokenize::{apply_truncation, encode, load_tokenizer, stub_tokenizer};

const STUB_MODEL_ID: &str = "stub";

/// A loaded tokenizer/encoder pair. Owns everything it needs; drop it to release the model.
pub struct Embedder {
    tokenizer: Tokenizer,
    encoder: Box<dyn Encoder>,
    model_id: String,
    max_sequence_length: usize,
}

impl Embedder {
    /// Resolves assets for the configured backend and loads tokenizer and weights.
    pub fn load(cfg: &EmbedderConfig) -> Result<Self, EmbedError> {
        cfg.validate()?;

        match cfg.backend {
            Backend::Stub => {
                debug!(hidden_size = cfg.stub_hidden_size, "using stub encoder");
                Self::from_parts(
                    stub_tokenizer()?,
                    Box::new(StubEncoder::new(cfg.stub_hidden_size)),
                    STUB_MODEL_ID,
                    cfg.max_sequence_length,
                )
            }
            Backend::Candle => {
                let assets = resolve_model_assets(cfg)?;
                let tokenizer = load_tokenizer(&assets.tokenizer)?;
                let device = select_device(&cfg.device)?;
                let encoder = BertEncoder::load(&assets, device)?;
                info!(model = %cfg.model_id, revision = %cfg.revision, "encoder loaded");
                Self::from_parts(
                    tokenizer,
                    Box::new(encoder),
                    &cfg.model_id,
                    cfg.max_sequence_length,
                )
            }
        }
    }

    /// Assembles an embedder from an already loaded tokenizer and encoder.
    /// The tokenizer is reconfigured to truncate at `max_sequence_length` tokens.
    pub fn from_parts(
        mut tokenizer: Tokenizer,
        encoder: Box<dyn Encoder>,
        model_id: &str,
        max_sequence_length: usize,
    ) -> Result<Self, EmbedError> {
        if max_sequence_length == 0 {
            return Err(EmbedError::InvalidConfig(
                "max_sequence_length must be at least 1".into(),
            ));
        }
        apply_truncation(&mut tokenizer, max_sequence_length)?;
        Ok(Self {
            tokenizer,
            encoder,
            model_id: model_id.to_string(),
            max_sequence_length,
        })
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn max_sequence_length(&self) -> usize {
        self.max_sequence_length
    }

    /// Tokenizes `document` exactly as [`embed`](Self::embed) would.
    pub fn tokenize(&self, document: &str) -> Result<TokenizedInput, EmbedError> {
        encode(&self.tokenizer, document)
    }

    /// Converts `document` into the first-token hidden state of the encoder.
    pub fn embed(&self, document: &str) -> Result<Embedding, EmbedError> {
        let input = self.tokenize(document)?;
        if input.truncated {
            info!(
                max_tokens = self.max_sequence_length,
                "document exceeds the sequence limit, truncating"
            );
        }

        let output = self.encoder.forward(&input)?;
        let vector = first_token_state(&output)?;
        debug!(tokens = input.len(), dim = vector.len(), "embedded document");

        Ok(Embedding {
            embedding_dim: vector.len(),
            vector,
            model_id: self.model_id.clone(),
            token_count: input.len(),
            truncated: input.truncated,
        })
    }
}

/// Loads an embedder for `cfg` and embeds a single `text`.
pub fn embed_text(text: &str, cfg: &EmbedderConfig) -> Result<Embedding, EmbedError> {
    Embedder::load(cfg)?.embed(text)
}
