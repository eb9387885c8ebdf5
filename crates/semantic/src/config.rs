use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::EmbedError;

/// Hard ceiling on sequence length for the BERT-family encoders we load.
pub const MAX_MODEL_SEQUENCE_LENGTH: usize = 512;

/// Which encoder implementation produces the hidden states.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Pretrained weights run locally through candle.
    #[default]
    Candle,
    /// Deterministic hash-based encoder; needs no model files.
    Stub,
}

/// Runtime configuration describing which model to fetch and how to run it.
///
/// # Example
/// ```no_run
/// use semantic::{Embedder, EmbedderConfig};
///
/// let cfg = EmbedderConfig {
///     model_id: "microsoft/codebert-base".into(),
///     offline: true,
///     ..Default::default()
/// };
///
/// let embedder = Embedder::load(&cfg).unwrap();
/// let embedding = embedder.embed("mov eax, 1\nret").unwrap();
/// assert_eq!(embedding.embedding_dim, 768);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbedderConfig {
    /// Encoder implementation.
    pub backend: Backend,
    /// Hub repository id, e.g. `"microsoft/codebert-base"`.
    pub model_id: String,
    /// Branch, tag or commit to resolve files against.
    pub revision: String,
    /// Base URL of the model hub.
    pub hub_url: String,
    /// Directory holding downloaded assets; files land in `<cache_dir>/<model_id>/`.
    pub cache_dir: PathBuf,
    /// Tokens kept per document, special tokens included. Longer input is truncated.
    pub max_sequence_length: usize,
    /// Compute device: `"cpu"` or `"cuda"` (falls back to CPU when CUDA is unavailable).
    pub device: String,
    /// Never touch the network; missing assets become [`EmbedError::AssetMissing`].
    pub offline: bool,
    /// Per-request timeout for asset downloads.
    pub download_timeout_secs: u64,
    /// Use this tokenizer file instead of resolving one from the hub.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokenizer_path: Option<PathBuf>,
    /// Use this weights file instead of resolving one from the hub.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weights_path: Option<PathBuf>,
    /// Hidden size reported by the stub backend.
    pub stub_hidden_size: usize,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Candle,
            model_id: "microsoft/codebert-base".into(),
            revision: "main".into(),
            hub_url: "https://huggingface.co".into(),
            cache_dir: PathBuf::from("./models"),
            max_sequence_length: MAX_MODEL_SEQUENCE_LENGTH,
            device: "cpu".into(),
            offline: false,
            download_timeout_secs: 300,
            tokenizer_path: None,
            weights_path: None,
            stub_hidden_size: 768,
        }
    }
}

impl EmbedderConfig {
    /// Checks field ranges before any asset is touched.
    pub fn validate(&self) -> Result<(), EmbedError> {
        if self.model_id.trim().is_empty() {
            return Err(EmbedError::InvalidConfig("model_id must not be empty".into()));
        }
        if self.max_sequence_length == 0 {
            return Err(EmbedError::InvalidConfig(
                "max_sequence_length must be at least 1".into(),
            ));
        }
        match self.backend {
            Backend::Candle => {
                if self.max_sequence_length > MAX_MODEL_SEQUENCE_LENGTH {
                    return Err(EmbedError::InvalidConfig(format!(
                        "max_sequence_length {} exceeds the model limit of {MAX_MODEL_SEQUENCE_LENGTH}",
                        self.max_sequence_length
                    )));
                }
            }
            Backend::Stub => {
                if self.stub_hidden_size == 0 {
                    return Err(EmbedError::InvalidConfig(
                        "stub_hidden_size must be at least 1".into(),
                    ));
                }
            }
        }
        match self.device.as_str() {
            "cpu" | "cuda" => Ok(()),
            other => Err(EmbedError::InvalidConfig(format!(
                "device must be one of [\"cpu\", \"cuda\"], got {other:?}"
            ))),
        }
    }

    /// Local directory for this model's cached files.
    pub fn model_dir(&self) -> PathBuf {
        self.cache_dir.join(Path::new(&self.model_id))
    }

    /// Remote location of `file` within the configured repository and revision.
    pub fn asset_url(&self, file: &str) -> String {
        format!(
            "{}/{}/resolve/{}/{}",
            self.hub_url.trim_end_matches('/'),
            self.model_id,
            self.revision,
            file
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_values() {
        let cfg = EmbedderConfig::default();
        assert_eq!(cfg.backend, Backend::Candle);
        assert_eq!(cfg.model_id, "microsoft/codebert-base");
        assert_eq!(cfg.revision, "main");
        assert_eq!(cfg.max_sequence_length, 512);
        assert_eq!(cfg.device, "cpu");
        assert!(!cfg.offline);
        assert!(cfg.tokenizer_path.is_none());
        assert!(cfg.weights_path.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn asset_url_uses_resolve_endpoint() {
        let cfg = EmbedderConfig {
            hub_url: "https://huggingface.co/".into(),
            ..Default::default()
        };
        assert_eq!(
            cfg.asset_url("config.json"),
            "https://huggingface.co/microsoft/codebert-base/resolve/main/config.json"
        );
    }

    #[test]
    fn model_dir_nests_repo_id() {
        let cfg = EmbedderConfig {
            cache_dir: PathBuf::from("/tmp/cache"),
            ..Default::default()
        };
        assert_eq!(
            cfg.model_dir(),
            PathBuf::from("/tmp/cache/microsoft/codebert-base")
        );
    }

    #[test]
    fn validate_rejects_oversized_sequence_for_candle() {
        let cfg = EmbedderConfig {
            max_sequence_length: 1024,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(EmbedError::InvalidConfig(_))));

        let stub = EmbedderConfig {
            backend: Backend::Stub,
            max_sequence_length: 1024,
            ..Default::default()
        };
        assert!(stub.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_length_and_bad_device() {
        let zero = EmbedderConfig {
            max_sequence_length: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());

        let device = EmbedderConfig {
            device: "tpu".into(),
            ..Default::default()
        };
        let err = device.validate().unwrap_err();
        assert!(err.to_string().contains("tpu"));
    }

    #[test]
    fn backend_deserializes_lowercase() {
        let cfg: EmbedderConfig =
            serde_json::from_str(r#"{"backend":"stub","stub_hidden_size":16}"#).unwrap();
        assert_eq!(cfg.backend, Backend::Stub);
        assert_eq!(cfg.stub_hidden_size, 16);
        assert_eq!(cfg.model_id, "microsoft/codebert-base");
    }
}
