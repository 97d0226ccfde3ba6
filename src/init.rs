use crate::error::PipelineError;
use crate::{logi, logw};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use walkdir::WalkDir;

/// Extensions of the intermediate and output media a run leaves behind.
const STALE_MEDIA_EXTS: &[&str] = &["mp4", "mp3", "m4a", "part"];

pub async fn ensure_work_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create work dir {}", dir.display()))?;
        logi(format!("Created directory: {}", dir.display()));
    }
    Ok(())
}

/// Removes media left by earlier runs. Other files are kept.
pub async fn clear_stale_media(dir: &Path) -> Result<usize> {
    if !dir.is_dir() {
        return Ok(0);
    }

    let mut stale = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        let is_media = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| STALE_MEDIA_EXTS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if entry.file_type().is_file() && is_media {
            stale.push(entry.into_path());
        }
    }
    Ok(remove_files(&stale).await)
}

/// Number of files actually removed. Failures are logged and skipped.
async fn remove_files(paths: &[PathBuf]) -> usize {
    let mut removed = 0;
    for path in paths {
        match fs::remove_file(path).await {
            Ok(()) => removed += 1,
            Err(e) => logw(format!("Could not remove {}: {}", path.display(), e)),
        }
    }
    removed
}

const REQUIRED_TOOLS: &[&str] = &["ffmpeg", "ffprobe"];

pub async fn check_ffmpeg() -> bool {
    require_tools(REQUIRED_TOOLS).await.is_ok()
}

/// Fails with `MissingTool` for the first program that does not answer `-version`.
pub async fn require_tools(tools: &[&'static str]) -> Result<()> {
    for &tool in tools {
        let ok = match tokio::process::Command::new(tool).arg("-version").output().await {
            Ok(output) => output.status.success(),
            Err(_) => false,
        };
        if !ok {
            return Err(PipelineError::MissingTool(tool).into());
        }
    }
    Ok(())
}

pub async fn require_ffmpeg() -> Result<()> {
    require_tools(REQUIRED_TOOLS).await
}
