//! Streaming model downloads into the per-user cache directory.

use anyhow::{Context, Result, anyhow};
use futures_util::StreamExt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Cache location for downloaded model files, e.g.
/// `~/.bhasha/.cache/whisper/ggml-small.bin`.
pub fn cache_path(kind: &str, file: &str) -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        let home = home.trim();
        if !home.is_empty() {
            return Path::new(home).join(".bhasha/.cache").join(kind).join(file);
        }
    }
    Path::new(".bhasha/.cache").join(kind).join(file)
}

/// Downloads `url` to `dest` unless it is already cached, writing through a
/// `.part` file so an interrupted download never leaves a truncated model.
pub async fn ensure_file(url: &str, dest: &Path) -> Result<()> {
    if dest.exists() {
        return Ok(());
    }
    let dir = dest.parent().ok_or_else(|| anyhow!("invalid model path"))?;
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create model dir: {}", dir.display()))?;

    info!("downloading {} ...", url);
    let response = reqwest::get(url)
        .await
        .with_context(|| format!("failed to download model file: {}", url))?;
    if !response.status().is_success() {
        return Err(anyhow!(
            "failed to download model file: {} (status {})",
            url,
            response.status()
        ));
    }

    let tmp = dest.with_extension("part");
    let mut file = fs::File::create(&tmp)
        .with_context(|| format!("failed to write model: {}", tmp.display()))?;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.with_context(|| "failed to read model bytes")?;
        std::io::Write::write_all(&mut file, &chunk)?;
    }
    fs::rename(&tmp, dest)
        .with_context(|| format!("failed to finalize model: {}", dest.display()))?;
    Ok(())
}
