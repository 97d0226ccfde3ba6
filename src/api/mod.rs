pub mod catbox;
pub mod freesound;
pub mod openai;
pub mod pixabay;
pub mod telegram;
pub mod webhook;

use anyhow::{Context, Result};
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tokio::fs;

const USER_AGENT: &str = concat!("animal-reels/", env!("CARGO_PKG_VERSION"));

pub fn build_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(10))
        .build()
        .context("Failed to build HTTP client")
}

/// Buffers the whole body and writes it in one go.
pub async fn download_to_file(client: &Client, url: &str, dest: &Path, timeout: Duration) -> Result<u64> {
    let resp = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .with_context(|| format!("Download request failed: {url}"))?
        .error_for_status()
        .with_context(|| format!("Download rejected: {url}"))?;

    let bytes = resp.bytes().await.context("Download body read failed")?;
    if bytes.is_empty() {
        anyhow::bail!("Downloaded empty body from {url}");
    }
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create dir {}", parent.display()))?;
    }
    fs::write(dest, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", dest.display()))?;

    Ok(bytes.len() as u64)
}

pub(crate) fn snippet(raw: &str) -> String {
    raw.chars().take(800).collect()
}
