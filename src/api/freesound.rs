use crate::api::{download_to_file, snippet};
use crate::error::PipelineError;
use crate::{logi, logw};
use anyhow::{Context, Result};
use rand::Rng;
use rand::seq::SliceRandom;
use reqwest::Client;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const FREESOUND_BASE: &str = "https://freesound.org/apiv2";
const CC0_FILTER: &str = "license:\"Creative Commons 0\"";
const SEARCH_FIELDS: &str = "id,name,duration,previews";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AudioCandidate {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    pub duration: Option<f64>,
    #[serde(default)]
    previews: Previews,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
struct Previews {
    #[serde(rename = "preview-hq-mp3")]
    hq_mp3: Option<String>,
    #[serde(rename = "preview-lq-mp3")]
    lq_mp3: Option<String>,
}

impl Previews {
    fn best(&self) -> Option<&str> {
        self.hq_mp3
            .as_deref()
            .or(self.lq_mp3.as_deref())
            .filter(|u| !u.is_empty())
    }
}

impl AudioCandidate {
    pub fn preview_url(&self) -> Option<&str> {
        self.previews.best()
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<AudioCandidate>,
}

pub fn parse_search_response(body: &str) -> Result<Vec<AudioCandidate>> {
    let resp: SearchResponse = serde_json::from_str(body).context("Failed to parse Freesound search response")?;
    Ok(resp.results)
}

pub fn parse_sound_detail(body: &str) -> Result<AudioCandidate> {
    serde_json::from_str(body).context("Failed to parse Freesound sound detail")
}

#[derive(Debug, Clone)]
pub struct AudioTrack {
    pub id: u64,
    pub name: String,
    pub path: PathBuf,
}

pub struct FreesoundClient {
    client: Client,
    token: String,
    api_timeout: Duration,
    transfer_timeout: Duration,
}

impl FreesoundClient {
    pub fn new(client: Client, token: impl Into<String>, api_timeout: Duration, transfer_timeout: Duration) -> Self {
        Self {
            client,
            token: token.into(),
            api_timeout,
            transfer_timeout,
        }
    }

    async fn get_json_text(&self, url: &str, query: &[(&str, &str)]) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .query(query)
            .query(&[("token", self.token.as_str())])
            .timeout(self.api_timeout)
            .send()
            .await
            .context("Freesound request failed")?;

        let status = resp.status();
        let raw = resp.text().await.context("Freesound response read failed")?;
        if !status.is_success() {
            logw(format!("Freesound HTTP {}: {}", status.as_u16(), snippet(&raw)));
            anyhow::bail!("Freesound request failed with HTTP {}", status.as_u16());
        }
        Ok(raw)
    }

    pub async fn search(&self, query: &str) -> Result<Vec<AudioCandidate>> {
        let raw = self
            .get_json_text(
                &format!("{FREESOUND_BASE}/search/text/"),
                &[("query", query), ("filter", CC0_FILTER), ("fields", SEARCH_FIELDS)],
            )
            .await?;
        parse_search_response(&raw)
    }

    /// Preview link of `sound`, with a detail lookup when the search result lacks one.
    pub async fn resolve_preview(&self, sound: &AudioCandidate) -> Result<String> {
        if let Some(url) = sound.preview_url() {
            return Ok(url.to_string());
        }

        let raw = self
            .get_json_text(&format!("{FREESOUND_BASE}/sounds/{}/", sound.id), &[])
            .await?;
        let detail = parse_sound_detail(&raw)?;
        detail
            .preview_url()
            .map(str::to_string)
            .with_context(|| format!("Freesound sound {} has no mp3 preview", sound.id))
    }

    /// Searches `query`, picks one result uniformly at random and downloads its preview.
    pub async fn fetch_track<R: Rng + ?Sized>(&self, query: &str, dest: &Path, rng: &mut R) -> Result<AudioTrack> {
        let results = self.search(query).await?;
        let sound = results
            .choose(rng)
            .cloned()
            .ok_or_else(|| PipelineError::NoAudioCandidate {
                query: query.to_string(),
            })?;
        logi(format!(
            "Picked Freesound {} {:?} from {} results",
            sound.id,
            sound.name,
            results.len()
        ));

        let url = self.resolve_preview(&sound).await?;
        download_to_file(&self.client, &url, dest, self.transfer_timeout).await?;

        Ok(AudioTrack {
            id: sound.id,
            name: sound.name,
            path: dest.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_results_expose_hq_preview() {
        let body = r#"{"count": 2, "results": [
            {"id": 1, "name": "forest", "duration": 31.5,
             "previews": {"preview-hq-mp3": "https://cdn.freesound.org/1-hq.mp3",
                          "preview-lq-mp3": "https://cdn.freesound.org/1-lq.mp3"}},
            {"id": 2, "name": "river"}
        ]}"#;
        let results = parse_search_response(body).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].preview_url(), Some("https://cdn.freesound.org/1-hq.mp3"));
        assert_eq!(results[0].duration, Some(31.5));
        assert_eq!(results[1].preview_url(), None);
    }

    #[test]
    fn detail_falls_back_to_lq_preview() {
        let detail = parse_sound_detail(
            r#"{"id": 2, "name": "river", "previews": {"preview-lq-mp3": "https://cdn.freesound.org/2-lq.mp3"}}"#,
        )
        .unwrap();
        assert_eq!(detail.preview_url(), Some("https://cdn.freesound.org/2-lq.mp3"));
    }

    #[test]
    fn empty_results_parse_as_empty() {
        assert!(parse_search_response(r#"{"count": 0, "results": []}"#).unwrap().is_empty());
    }
}
