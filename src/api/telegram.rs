use crate::api::snippet;
use crate::config::{TelegramMode, TelegramTarget};
use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

const TELEGRAM_API: &str = "https://api.telegram.org";
/// Bot API limit for media captions.
const MAX_CAPTION_CHARS: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct TelegramRequest {
    pub method: &'static str,
    pub fields: Vec<(&'static str, String)>,
}

pub fn build_request(target: &TelegramTarget, video_url: &str, text: &str) -> TelegramRequest {
    match target.mode {
        TelegramMode::Video => TelegramRequest {
            method: "sendVideo",
            fields: vec![
                ("chat_id", target.chat_id.clone()),
                ("video", video_url.to_string()),
                ("caption", text.chars().take(MAX_CAPTION_CHARS).collect()),
            ],
        },
        TelegramMode::Message => TelegramRequest {
            method: "sendMessage",
            fields: vec![
                ("chat_id", target.chat_id.clone()),
                ("text", format!("{}\n\n{}", text.trim_end(), video_url)),
            ],
        },
    }
}

pub async fn send(
    client: &Client,
    target: &TelegramTarget,
    video_url: &str,
    text: &str,
    timeout: Duration,
) -> Result<()> {
    let request = build_request(target, video_url, text);
    let url = format!("{TELEGRAM_API}/bot{}/{}", target.bot_token, request.method);

    let resp = client
        .post(url)
        .form(&request.fields)
        .timeout(timeout)
        .send()
        .await
        .context("Telegram request failed")?;

    let status = resp.status();
    let raw = resp.text().await.unwrap_or_default();
    let ok = serde_json::from_str::<serde_json::Value>(&raw)
        .ok()
        .and_then(|v| v.get("ok").and_then(|ok| ok.as_bool()))
        .unwrap_or(false);
    if !status.is_success() || !ok {
        anyhow::bail!("Telegram {} HTTP {}: {}", request.method, status.as_u16(), snippet(&raw));
    }
    Ok(())
}
