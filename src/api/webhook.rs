use crate::caption::Caption;
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

/// `caption` is the full rendered block, as posted to Telegram. The parts are
/// repeated separately for consumers that lay them out themselves.
#[derive(Debug, Serialize)]
pub struct WebhookPayload<'a> {
    pub video_url: &'a str,
    pub caption: String,
    pub title: &'a str,
    pub description: &'a str,
    pub hashtags: &'a str,
}

impl<'a> WebhookPayload<'a> {
    pub fn new(video_url: &'a str, caption: &'a Caption) -> Self {
        Self {
            video_url,
            caption: caption.render(),
            title: &caption.title,
            description: &caption.caption,
            hashtags: &caption.hashtags,
        }
    }
}

pub async fn send(client: &Client, url: &str, payload: &WebhookPayload<'_>, timeout: Duration) -> Result<()> {
    client
        .post(url)
        .json(payload)
        .timeout(timeout)
        .send()
        .await
        .context("Webhook request failed")?
        .error_for_status()
        .context("Webhook rejected the payload")?;
    Ok(())
}
