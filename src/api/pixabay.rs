use crate::api::{download_to_file, snippet};
use crate::candidate::{Candidate, CandidateId, parse_tag_list};
use crate::selector::CatalogSource;
use crate::logw;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

const PIXABAY_VIDEOS_URL: &str = "https://pixabay.com/api/videos/";
const PER_PAGE: u32 = 20;
const RENDITION_PREFERENCE: &[&str] = &["large", "medium", "small", "tiny"];

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    id: Option<serde_json::Value>,
    #[serde(default)]
    tags: String,
    #[serde(default)]
    duration: f64,
    #[serde(default)]
    videos: HashMap<String, Rendition>,
}

#[derive(Debug, Deserialize)]
struct Rendition {
    #[serde(default)]
    url: String,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
}

/// Turns a videos-search body into candidates, keeping provider order.
/// Hits without any usable rendition are dropped.
pub fn parse_search_response(body: &str) -> Result<Vec<Candidate>> {
    let resp: SearchResponse = serde_json::from_str(body).context("Failed to parse Pixabay response")?;

    let mut out = Vec::with_capacity(resp.hits.len());
    for hit in resp.hits {
        let Some(rendition) = RENDITION_PREFERENCE
            .iter()
            .filter_map(|name| hit.videos.get(*name))
            .find(|r| !r.url.is_empty())
        else {
            continue;
        };

        let native = match &hit.id {
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            _ => None,
        };

        out.push(Candidate {
            id: CandidateId::resolve(native.as_deref(), &rendition.url),
            media_url: rendition.url.clone(),
            tags: parse_tag_list(&hit.tags),
            duration_seconds: hit.duration,
            width: (rendition.width > 0).then_some(rendition.width),
            height: (rendition.height > 0).then_some(rendition.height),
        });
    }
    Ok(out)
}

pub struct PixabayClient {
    client: Client,
    api_key: String,
    api_timeout: Duration,
    transfer_timeout: Duration,
}

impl PixabayClient {
    pub fn new(client: Client, api_key: impl Into<String>, api_timeout: Duration, transfer_timeout: Duration) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            api_timeout,
            transfer_timeout,
        }
    }
}

#[async_trait]
impl CatalogSource for PixabayClient {
    async fn search(&self, keyword: &str) -> Result<Vec<Candidate>> {
        let per_page = PER_PAGE.to_string();
        let resp = self
            .client
            .get(PIXABAY_VIDEOS_URL)
            .query(&[
                ("key", self.api_key.as_str()),
                ("q", keyword),
                ("per_page", per_page.as_str()),
                ("video_type", "film"),
                ("safesearch", "true"),
            ])
            .timeout(self.api_timeout)
            .send()
            .await
            .context("Pixabay request failed")?;

        let status = resp.status();
        let raw = resp.text().await.context("Pixabay response read failed")?;
        if !status.is_success() {
            logw(format!("Pixabay HTTP {}: {}", status.as_u16(), snippet(&raw)));
            anyhow::bail!("Pixabay search for {keyword:?} failed with HTTP {}", status.as_u16());
        }

        parse_search_response(&raw)
    }

    async fn download(&self, candidate: &Candidate, dest: &Path) -> Result<()> {
        download_to_file(&self.client, &candidate.media_url, dest, self.transfer_timeout).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_largest_available_rendition() {
        let body = r#"{
            "total": 2,
            "hits": [
                {"id": 202, "tags": "dog, Puppy", "duration": 9,
                 "videos": {
                    "large": {"url": "", "width": 0, "height": 0},
                    "medium": {"url": "https://cdn.pixabay.com/202_m.mp4", "width": 1280, "height": 720},
                    "small": {"url": "https://cdn.pixabay.com/202_s.mp4", "width": 960, "height": 540}
                 }},
                {"id": 303, "tags": "cat", "duration": 14,
                 "videos": {"large": {"url": "https://cdn.pixabay.com/303_l.mp4", "width": 1920, "height": 1080}}}
            ]
        }"#;

        let candidates = parse_search_response(body).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].id.as_str(), "202");
        assert_eq!(candidates[0].media_url, "https://cdn.pixabay.com/202_m.mp4");
        assert_eq!(candidates[0].width, Some(1280));
        assert!(candidates[0].tags.contains("puppy"));
        assert_eq!(candidates[1].duration_seconds, 14.0);
    }

    #[test]
    fn missing_id_falls_back_to_url_hash() {
        let body = r#"{"hits": [{"tags": "lion", "duration": 8,
            "videos": {"tiny": {"url": "https://cdn.pixabay.com/x.mp4?sig=1"}}}]}"#;
        let candidates = parse_search_response(body).unwrap();
        assert_eq!(candidates[0].id, CandidateId::from_media_url("https://cdn.pixabay.com/x.mp4"));
    }

    #[test]
    fn empty_or_absent_hits_are_no_match() {
        assert!(parse_search_response(r#"{"total":0,"hits":[]}"#).unwrap().is_empty());
        assert!(parse_search_response(r#"{"total":0}"#).unwrap().is_empty());
        assert!(parse_search_response("<html>").is_err());
    }
}
