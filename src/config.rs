//! Runtime configuration for `asm-embed`.
//!
//! Every key has a default, so the tool runs without any configuration. Overrides are layered:
//!
//! 1. `asm-embed.{toml,yaml,json}` in the working directory (optional)
//! 2. environment variables prefixed with `ASM_EMBED`, nested with `__`
//!
//! ```toml
//! output_dir = "embeddings"
//! output_suffix = "_embedding.json"
//! log_level = "warn"
//!
//! [embedder]
//! backend = "candle"
//! model_id = "microsoft/codebert-base"
//! revision = "main"
//! cache_dir = "./models"
//! max_sequence_length = 512
//! device = "cpu"
//! offline = false
//! ```
//!
//! e.g. `ASM_EMBED__EMBEDDER__BACKEND=stub` or `ASM_EMBED__OUTPUT_DIR=out`.

use std::path::{Path, PathBuf};

use semantic::EmbedderConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Config file stem looked up in the working directory.
pub const CONFIG_FILE_STEM: &str = "asm-embed";
/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "ASM_EMBED";

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Source(#[from] config::ConfigError),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Directory the embedding JSON files are written to.
    pub output_dir: PathBuf,

    /// Appended to the input file stem to name the output file.
    pub output_suffix: String,

    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_level: String,

    /// Model selection and inference settings.
    pub embedder: EmbedderConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("embeddings"),
            output_suffix: "_embedding.json".to_string(),
            log_level: "warn".to_string(),
            embedder: EmbedderConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from the optional config file in the working directory, then the environment.
    pub fn load() -> Result<Self, ConfigLoadError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE_STEM).required(false));
        Self::finish(builder)
    }

    /// Load from an explicit file (format picked from the extension), then the environment.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let builder =
            config::Config::builder().add_source(config::File::from(path.as_ref()).required(true));
        Self::finish(builder)
    }

    fn finish(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigLoadError> {
        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: AppConfig = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.output_dir.as_os_str().is_empty() {
            return Err(ConfigLoadError::Validation(
                "output_dir must not be empty".into(),
            ));
        }
        if self.output_suffix.is_empty() {
            return Err(ConfigLoadError::Validation(
                "output_suffix must not be empty".into(),
            ));
        }
        if self.output_suffix.contains(['/', '\\']) {
            return Err(ConfigLoadError::Validation(
                "output_suffix must not contain path separators".into(),
            ));
        }
        self.embedder
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("embedder: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semantic::Backend;
    use std::fs;

    #[test]
    fn default_config_matches_cli_contract() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.output_dir, PathBuf::from("embeddings"));
        assert_eq!(cfg.output_suffix, "_embedding.json");
        assert_eq!(cfg.embedder.model_id, "microsoft/codebert-base");
        assert_eq!(cfg.embedder.max_sequence_length, 512);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn loads_partial_toml_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("asm-embed.toml");
        fs::write(
            &path,
            r#"
output_dir = "vectors"

[embedder]
backend = "stub"
stub_hidden_size = 32
"#,
        )
        .unwrap();

        let cfg = AppConfig::from_file(&path).unwrap();
        assert_eq!(cfg.output_dir, PathBuf::from("vectors"));
        assert_eq!(cfg.output_suffix, "_embedding.json");
        assert_eq!(cfg.embedder.backend, Backend::Stub);
        assert_eq!(cfg.embedder.stub_hidden_size, 32);
        assert_eq!(cfg.embedder.revision, "main");
    }

    #[test]
    fn loads_yaml_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("settings.yaml");
        fs::write(&path, "log_level: debug\nembedder:\n  offline: true\n").unwrap();

        let cfg = AppConfig::from_file(&path).unwrap();
        assert_eq!(cfg.log_level, "debug");
        assert!(cfg.embedder.offline);
    }

    #[test]
    fn invalid_embedder_settings_fail_validation() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("asm-embed.toml");
        fs::write(&path, "[embedder]\nmax_sequence_length = 4096\n").unwrap();

        let err = AppConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigLoadError::Validation(ref m) if m.contains("4096")));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = AppConfig::from_file("/nonexistent/asm-embed.toml").unwrap_err();
        assert!(matches!(err, ConfigLoadError::Source(_)));
    }

    #[test]
    fn suffix_with_separator_is_rejected() {
        let cfg = AppConfig {
            output_suffix: "/escape.json".into(),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let empty = AppConfig {
            output_dir: PathBuf::new(),
            ..Default::default()
        };
        assert!(empty.validate().is_err());
    }
}
