use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::AppConfig;
use crate::RunError;

/// Where the embedding for `input` goes: `<output_dir>/<stem><suffix>`.
///
/// The stem drops the directory and the last extension only, so `loop.asm` becomes
/// `loop_embedding.json` and `boot.tar.s` becomes `boot.tar_embedding.json`.
pub fn output_path(input: &Path, cfg: &AppConfig) -> Result<PathBuf, RunError> {
    let stem = input
        .file_stem()
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| RunError::InvalidInputPath(input.to_path_buf()))?;

    let mut name = stem.to_os_string();
    name.push(&cfg.output_suffix);
    Ok(cfg.output_dir.join(name))
}

/// Serializes `vector` as a bare JSON array, creating parent directories and replacing any
/// existing file.
pub fn write_embedding(path: &Path, vector: &[f32]) -> Result<(), RunError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| output_write(path, source))?;
    }

    let file = fs::File::create(path).map_err(|source| output_write(path, source))?;
    write_json(BufWriter::new(file), path, vector)?;

    debug!(path = %path.display(), values = vector.len(), "embedding written");
    Ok(())
}

/// Encodes up front so that every failure reaching `writer` is an output error.
fn write_json<W: Write>(mut writer: W, path: &Path, vector: &[f32]) -> Result<(), RunError> {
    let bytes = serde_json::to_vec(vector)?;
    writer
        .write_all(&bytes)
        .and_then(|()| writer.flush())
        .map_err(|source| output_write(path, source))
}

fn output_write(path: &Path, source: io::Error) -> RunError {
    RunError::OutputWrite {
        path: path.to_path_buf(),
        source,
    }
}
