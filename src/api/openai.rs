use crate::api::snippet;
use crate::config::OpenAiSettings;
use crate::{logi, logw};
use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

const RESPONSES_URL: &str = "https://api.openai.com/v1/responses";

/// Fixed instruction for the caption request. The answer must be a single
/// line of three `|`-separated fields.
pub const CAPTION_INSTRUCTION: &str = "Write social media copy for a short vertical video of animals in nature.\n\
Reply with ONE line in exactly this format and nothing else:\n\
TITLE | CAPTION | HASHTAGS\n\
- TITLE: under 60 characters, may end with one emoji.\n\
- CAPTION: one friendly sentence.\n\
- HASHTAGS: 6-10 hashtags separated by spaces.\n\
Do not use the | character anywhere else.";

pub(crate) fn openai_extract_output_text(resp_json: &str) -> Option<String> {
    let root: serde_json::Value = serde_json::from_str(resp_json).ok()?;

    if let Some(err) = root.get("error").filter(|e| !e.is_null()) {
        if let Some(msg) = err.get("message").and_then(|v| v.as_str()) {
            logw(format!("OpenAI error message: {}", msg));
        }
        if let Some(code) = err.get("code").and_then(|v| v.as_str()) {
            logw(format!("OpenAI error code: {}", code));
        }
        return None;
    }

    let output = root.get("output")?.as_array()?;
    for item in output {
        let Some(content) = item.get("content").and_then(|v| v.as_array()) else {
            continue;
        };
        for entry in content {
            let typ = entry.get("type").and_then(|v| v.as_str());
            let text = entry.get("text").and_then(|v| v.as_str());
            if typ == Some("output_text") {
                if let Some(text) = text {
                    return Some(text.to_string());
                }
            }
        }
    }

    None
}

/// One generation request. `Ok(None)` when the service answered but gave no
/// usable text.
pub async fn openai_generate_caption(
    client: &Client,
    settings: &OpenAiSettings,
    timeout: Duration,
) -> Result<Option<String>> {
    let body = json!({
        "model": settings.model,
        "input": [
            {"role": "user", "content": CAPTION_INSTRUCTION},
        ],
    });

    let resp = client
        .post(RESPONSES_URL)
        .bearer_auth(&settings.api_key)
        .json(&body)
        .timeout(timeout)
        .send()
        .await
        .context("OpenAI request failed")?;

    let status = resp.status();
    let raw = resp.text().await.unwrap_or_default();

    if !status.is_success() {
        logw(format!("OpenAI HTTP {}", status.as_u16()));
        if !raw.is_empty() {
            logw(format!("OpenAI raw body: {}", snippet(&raw)));
        }
        return Ok(None);
    }

    let text = openai_extract_output_text(&raw);
    match &text {
        Some(t) => logi(format!("OpenAI caption received ({} chars)", t.len())),
        None => logw(format!("OpenAI response parse failed: {}", snippet(&raw))),
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_output_text() {
        let raw = r#"{"output": [
            {"type": "reasoning", "summary": []},
            {"type": "message", "content": [
                {"type": "output_text", "text": "Wild Hearts | Look at them go. | #animals #wildlife"}
            ]}
        ]}"#;
        assert_eq!(
            openai_extract_output_text(raw).as_deref(),
            Some("Wild Hearts | Look at them go. | #animals #wildlife")
        );
    }

    #[test]
    fn error_body_yields_nothing() {
        let raw = r#"{"error": {"message": "quota", "code": "insufficient_quota"}}"#;
        assert_eq!(openai_extract_output_text(raw), None);
        assert_eq!(openai_extract_output_text("not json"), None);
    }

    #[test]
    fn null_error_field_is_ignored() {
        let raw = r#"{"error": null, "output": [{"content": [{"type": "output_text", "text": "a|b|c"}]}]}"#;
        assert_eq!(openai_extract_output_text(raw).as_deref(), Some("a|b|c"));
    }
}
