use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use reqwest::{blocking::Client, StatusCode};
use tracing::{debug, info};

use crate::{EmbedError, EmbedderConfig};

pub(crate) const CONFIG_FILE: &str = "config.json";
pub(crate) const TOKENIZER_JSON: &str = "tokenizer.json";
pub(crate) const VOCAB_FILE: &str = "vocab.json";
pub(crate) const MERGES_FILE: &str = "merges.txt";
pub(crate) const SAFETENSORS_WEIGHTS: &str = "model.safetensors";
pub(crate) const PICKLE_WEIGHTS: &str = "pytorch_model.bin";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum WeightsFile {
    Safetensors(PathBuf),
    Pickle(PathBuf),
}

impl WeightsFile {
    fn from_path(path: PathBuf) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("safetensors") => WeightsFile::Safetensors(path),
            _ => WeightsFile::Pickle(path),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenizerFiles {
    /// Serialized `tokenizers` pipeline.
    Json(PathBuf),
    /// GPT-2 style byte-level BPE vocabulary.
    VocabMerges { vocab: PathBuf, merges: PathBuf },
}

#[derive(Debug)]
pub(crate) struct ModelAssets {
    pub(crate) config_path: PathBuf,
    pub(crate) weights: WeightsFile,
    pub(crate) tokenizer: TokenizerFiles,
}

/// Only "not there" errors move on to the next candidate; network failures abort.
pub(crate) fn should_try_next_candidate(err: &EmbedError) -> bool {
    matches!(err, EmbedError::AssetMissing(_))
}

/// Ensures the model config, weights and tokenizer exist locally, downloading them on cache miss.
pub(crate) fn resolve_model_assets(cfg: &EmbedderConfig) -> Result<ModelAssets, EmbedError> {
    let fetcher = AssetFetcher::new(cfg)?;

    let config_path = fetcher.fetch(CONFIG_FILE)?;

    let weights = match &cfg.weights_path {
        Some(path) => WeightsFile::from_path(require_local(path)?),
        None => match fetcher.fetch(SAFETENSORS_WEIGHTS) {
            Ok(path) => WeightsFile::Safetensors(path),
            Err(err) if should_try_next_candidate(&err) => {
                debug!(model = %cfg.model_id, "no safetensors weights, trying {PICKLE_WEIGHTS}");
                WeightsFile::Pickle(fetcher.fetch(PICKLE_WEIGHTS)?)
            }
            Err(err) => return Err(err),
        },
    };

    let tokenizer = match &cfg.tokenizer_path {
        Some(path) => TokenizerFiles::Json(require_local(path)?),
        None => match fetcher.fetch(TOKENIZER_JSON) {
            Ok(path) => TokenizerFiles::Json(path),
            Err(err) if should_try_next_candidate(&err) => {
                debug!(model = %cfg.model_id, "no {TOKENIZER_JSON}, falling back to vocab/merges");
                TokenizerFiles::VocabMerges {
                    vocab: fetcher.fetch(VOCAB_FILE)?,
                    merges: fetcher.fetch(MERGES_FILE)?,
                }
            }
            Err(err) => return Err(err),
        },
    };

    Ok(ModelAssets {
        config_path,
        weights,
        tokenizer,
    })
}

fn require_local(path: &Path) -> Result<PathBuf, EmbedError> {
    if path.is_file() {
        Ok(path.to_path_buf())
    } else {
        Err(EmbedError::AssetMissing(path.display().to_string()))
    }
}

/// Resolves repository files against the local cache, falling back to the hub.
struct AssetFetcher<'a> {
    cfg: &'a EmbedderConfig,
    dir: PathBuf,
    client: Option<Client>,
}

impl<'a> AssetFetcher<'a> {
    fn new(cfg: &'a EmbedderConfig) -> Result<Self, EmbedError> {
        let client = if cfg.offline {
            None
        } else {
            let client = Client::builder()
                .timeout(Duration::from_secs(cfg.download_timeout_secs))
                .build()
                .map_err(|e| EmbedError::Download(e.to_string()))?;
            Some(client)
        };
        Ok(Self {
            cfg,
            dir: cfg.model_dir(),
            client,
        })
    }

    /// Returns the cached copy of `file`, otherwise attempts to download it.
    fn fetch(&self, file: &str) -> Result<PathBuf, EmbedError> {
        let target = self.dir.join(file);
        if target.is_file() {
            debug!(path = %target.display(), "asset cache hit");
            return Ok(target);
        }

        let Some(client) = &self.client else {
            return Err(EmbedError::AssetMissing(format!(
                "{} (offline, not cached at {})",
                file,
                target.display()
            )));
        };

        let url = self.cfg.asset_url(file);
        download_to_path(client, &target, &url)?;
        Ok(target)
    }
}

/// Downloads `url` into `target` through a `.part` file, creating parent directories as needed.
fn download_to_path(client: &Client, target: &Path, url: &str) -> Result<(), EmbedError> {
    if let Some(parent) = target.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    info!(%url, "downloading model asset");
    let mut response = client
        .get(url)
        .send()
        .map_err(|e| EmbedError::Download(e.to_string()))?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(EmbedError::AssetMissing(url.to_string()));
    }
    if !status.is_success() {
        return Err(EmbedError::Download(format!(
            "unexpected status {} while fetching {}",
            status, url
        )));
    }

    let partial = partial_path(target);
    let mut file = fs::File::create(&partial)?;
    let written = response
        .copy_to(&mut file)
        .map_err(|e| EmbedError::Download(e.to_string()))?;
    file.sync_all()?;
    drop(file);
    fs::rename(&partial, target)?;

    debug!(path = %target.display(), bytes = written, "asset stored");
    Ok(())
}

fn partial_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!("{name}.part"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_cfg(cache: &Path) -> EmbedderConfig {
        EmbedderConfig {
            model_id: "acme/tiny-encoder".into(),
            cache_dir: cache.to_path_buf(),
            offline: true,
            ..Default::default()
        }
    }

    fn touch(dir: &Path, name: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(name), b"{}").unwrap();
    }

    #[test]
    fn resolves_preferred_files_from_cache() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = offline_cfg(tmp.path());
        let dir = cfg.model_dir();
        for name in [CONFIG_FILE, SAFETENSORS_WEIGHTS, PICKLE_WEIGHTS, TOKENIZER_JSON] {
            touch(&dir, name);
        }

        let assets = resolve_model_assets(&cfg).unwrap();
        assert_eq!(assets.config_path, dir.join(CONFIG_FILE));
        assert_eq!(
            assets.weights,
            WeightsFile::Safetensors(dir.join(SAFETENSORS_WEIGHTS))
        );
        assert_eq!(assets.tokenizer, TokenizerFiles::Json(dir.join(TOKENIZER_JSON)));
    }

    #[test]
    fn falls_back_to_pickle_weights_and_vocab_merges() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = offline_cfg(tmp.path());
        let dir = cfg.model_dir();
        for name in [CONFIG_FILE, PICKLE_WEIGHTS, VOCAB_FILE, MERGES_FILE] {
            touch(&dir, name);
        }

        let assets = resolve_model_assets(&cfg).unwrap();
        assert_eq!(assets.weights, WeightsFile::Pickle(dir.join(PICKLE_WEIGHTS)));
        assert_eq!(
            assets.tokenizer,
            TokenizerFiles::VocabMerges {
                vocab: dir.join(VOCAB_FILE),
                merges: dir.join(MERGES_FILE),
            }
        );
    }

    #[test]
    fn offline_without_cache_reports_missing_asset() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = offline_cfg(tmp.path());

        let err = resolve_model_assets(&cfg).unwrap_err();
        assert!(matches!(err, EmbedError::AssetMissing(_)));
        assert!(err.to_string().contains(CONFIG_FILE));
        assert!(err.is_model_acquisition());
    }

    #[test]
    fn explicit_overrides_skip_resolution() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cfg = offline_cfg(tmp.path());
        touch(&cfg.model_dir(), CONFIG_FILE);

        let custom = tmp.path().join("custom");
        touch(&custom, "weights.safetensors");
        touch(&custom, "tok.json");
        cfg.weights_path = Some(custom.join("weights.safetensors"));
        cfg.tokenizer_path = Some(custom.join("tok.json"));

        let assets = resolve_model_assets(&cfg).unwrap();
        assert_eq!(
            assets.weights,
            WeightsFile::Safetensors(custom.join("weights.safetensors"))
        );
        assert_eq!(assets.tokenizer, TokenizerFiles::Json(custom.join("tok.json")));
    }

    #[test]
    fn missing_override_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cfg = offline_cfg(tmp.path());
        touch(&cfg.model_dir(), CONFIG_FILE);
        cfg.weights_path = Some(tmp.path().join("nope.bin"));

        let err = resolve_model_assets(&cfg).unwrap_err();
        assert!(matches!(err, EmbedError::AssetMissing(ref p) if p.contains("nope.bin")));
    }

    #[test]
    fn partial_path_appends_suffix() {
        let path = Path::new("/cache/model.safetensors");
        assert_eq!(
            partial_path(path),
            PathBuf::from("/cache/model.safetensors.part")
        );
    }

    #[test]
    fn candidate_fallback_only_on_missing() {
        assert!(should_try_next_candidate(&EmbedError::AssetMissing("x".into())));
        assert!(!should_try_next_candidate(&EmbedError::Download("x".into())));
    }
}
