use crate::api::openai;
use crate::config::OpenAiSettings;
use crate::error::PipelineError;
use crate::{logi, logw};
use anyhow::{Context, Result};
use rand::Rng;
use rand::seq::SliceRandom;
use reqwest::Client;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;
use tokio::fs;

pub const HASHTAGS: &[&str] = &[
    "#animals",
    "#wildlife",
    "#nature",
    "#animalvideos",
    "#naturelovers",
    "#animalworld",
    "#earthlife",
    "#reels",
];

const DEFAULT_TITLES: &[&str] = &[
    "Nature at its best 🐾",
    "Wildlife moments you’ll love 🦁",
    "Animals living their best life 🐶",
    "Pure nature vibes 🌿",
    "Life in the wild 🦊",
];

const DEFAULT_CAPTIONS: &[&str] = &[
    "Nature never fails to amaze us 💚",
    "Wildlife is pure magic ✨",
    "Peaceful moments from nature 🍃",
    "Animals remind us how beautiful life is 🐾",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caption {
    pub title: String,
    pub caption: String,
    pub hashtags: String,
}

impl Caption {
    /// Used whenever generated copy is unavailable.
    pub fn fallback() -> Self {
        Self {
            title: DEFAULT_TITLES[0].to_string(),
            caption: DEFAULT_CAPTIONS[0].to_string(),
            hashtags: HASHTAGS.join(" "),
        }
    }

    pub fn render(&self) -> String {
        format!("{}\n\n{}\n\n{}", self.title, self.caption, self.hashtags)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptionPools {
    pub titles: Vec<String>,
    pub captions: Vec<String>,
}

impl Default for CaptionPools {
    fn default() -> Self {
        Self {
            titles: DEFAULT_TITLES.iter().map(|s| s.to_string()).collect(),
            captions: DEFAULT_CAPTIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl CaptionPools {
    /// Baked-in pools, each replaced by `titles.json` / `captions.json` from
    /// `dir` when that file exists and holds a non-empty array.
    pub async fn load(dir: &Path) -> Result<Self> {
        let mut pools = Self::default();
        if let Some(titles) = read_pool(&dir.join("titles.json")).await? {
            pools.titles = titles;
        }
        if let Some(captions) = read_pool(&dir.join("captions.json")).await? {
            pools.captions = captions;
        }
        Ok(pools)
    }
}

async fn read_pool(path: &Path) -> Result<Option<Vec<String>>> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err).with_context(|| format!("Failed to read {}", path.display())),
    };

    let pool: Vec<String> = serde_json::from_str(&content).map_err(|source| PipelineError::InvalidOverride {
        path: path.to_path_buf(),
        source,
    })?;
    let pool: Vec<String> = pool
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if pool.is_empty() {
        logw(format!("{} is empty; keeping built-in pool", path.display()));
        return Ok(None);
    }
    logi(format!("Loaded {} entries from {}", pool.len(), path.display()));
    Ok(Some(pool))
}

pub fn static_caption<R: Rng + ?Sized>(pools: &CaptionPools, rng: &mut R) -> Caption {
    let fallback = Caption::fallback();
    Caption {
        title: pools.titles.choose(rng).cloned().unwrap_or(fallback.title),
        caption: pools.captions.choose(rng).cloned().unwrap_or(fallback.caption),
        hashtags: fallback.hashtags,
    }
}

/// `title | caption | hashtags`, exactly three non-empty fields.
pub fn parse_generated(text: &str) -> Option<Caption> {
    let fields: Vec<&str> = text.trim().split('|').map(str::trim).collect();
    match fields.as_slice() {
        [title, caption, hashtags] if !title.is_empty() && !caption.is_empty() && !hashtags.is_empty() => {
            Some(Caption {
                title: title.to_string(),
                caption: caption.to_string(),
                hashtags: hashtags.to_string(),
            })
        }
        _ => None,
    }
}

/// Parsed copy, or the fallback when `text` is not in the expected form.
pub fn caption_from_generated(text: &str) -> Caption {
    parse_generated(text).unwrap_or_else(|| {
        logw(format!("Generated caption not in title|caption|hashtags form: {:?}", text));
        Caption::fallback()
    })
}

/// Generated copy when the AI service is configured, pool picks otherwise.
/// Every generation failure ends in [`Caption::fallback`].
pub async fn build_caption<R: Rng + ?Sized>(
    client: &Client,
    openai_settings: Option<&OpenAiSettings>,
    pools: &CaptionPools,
    timeout: Duration,
    rng: &mut R,
) -> Caption {
    let Some(settings) = openai_settings else {
        return static_caption(pools, rng);
    };

    match openai::openai_generate_caption(client, settings, timeout).await {
        Ok(Some(text)) => caption_from_generated(&text),
        Ok(None) => Caption::fallback(),
        Err(err) => {
            logw(format!("Caption generation failed: {err:#}"));
            Caption::fallback()
        }
    }
}
