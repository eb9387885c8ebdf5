//! Embed an assembly source file and persist the vector.
//!
//! [`run`] is the whole pipeline: read the file, load the encoder, take the first-token hidden
//! state, and write it as a flat JSON array to `<output_dir>/<stem>_embedding.json`. The input is
//! read and embedded before anything is written, so a failed run leaves no output behind.

pub mod config;
mod output;

pub use crate::config::{AppConfig, ConfigLoadError};
pub use crate::output::{output_path, write_embedding};
pub use semantic::{Backend, EmbedError, Embedder, EmbedderConfig, Embedding};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

/// Errors that can occur while turning a file into a stored embedding.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("cannot read input file {}: {source}", .path.display())]
    InputAccess {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot derive an output name from {}", .0.display())]
    InvalidInputPath(PathBuf),

    #[error(transparent)]
    Embed(#[from] EmbedError),

    #[error("cannot write embedding to {}: {source}", .path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize embedding: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Embeds the file at `input` and writes the vector; returns the output path.
pub fn run(input: &Path, cfg: &AppConfig) -> Result<PathBuf, RunError> {
    let document = read_document(input)?;
    let target = output_path(input, cfg)?;

    let embedder = Embedder::load(&cfg.embedder)?;
    persist(&embedder, &document, &target)?;
    Ok(target)
}

/// Same as [`run`] with an already loaded embedder.
pub fn run_with(input: &Path, cfg: &AppConfig, embedder: &Embedder) -> Result<PathBuf, RunError> {
    let document = read_document(input)?;
    let target = output_path(input, cfg)?;
    persist(embedder, &document, &target)?;
    Ok(target)
}

fn read_document(input: &Path) -> Result<String, RunError> {
    fs::read_to_string(input).map_err(|source| RunError::InputAccess {
        path: input.to_path_buf(),
        source,
    })
}

fn persist(embedder: &Embedder, document: &str, target: &Path) -> Result<(), RunError> {
    let embedding = embedder.embed(document)?;
    write_embedding(target, &embedding.vector)?;
    info!(
        path = %target.display(),
        model = embedder.model_id(),
        max_tokens = embedder.max_sequence_length(),
        dim = embedding.embedding_dim,
        tokens = embedding.token_count,
        truncated = embedding.truncated,
        "embedding saved"
    );
    Ok(())
}
