use crate::error::PipelineError;
use crate::logi;
use anyhow::{Context, Result};
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use std::path::Path;
use std::time::Duration;

const CATBOX_API_URL: &str = "https://catbox.moe/user/api.php";

/// The host answers with the public link as plain text, or an error message.
pub fn parse_upload_response(body: &str) -> Result<String> {
    let trimmed = body.trim();
    let is_link = trimmed.starts_with("https://") || trimmed.starts_with("http://");
    if is_link && !trimmed.contains(char::is_whitespace) {
        return Ok(trimmed.to_string());
    }
    Err(PipelineError::UploadRejected(trimmed.chars().take(200).collect()).into())
}

pub async fn upload_file(client: &Client, path: &Path, timeout: Duration) -> Result<String> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let size = data.len();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "reel.mp4".to_string());

    let part = Part::bytes(data)
        .file_name(file_name)
        .mime_str("video/mp4")
        .context("Failed to build multipart part")?;
    let form = Form::new().text("reqtype", "fileupload").part("fileToUpload", part);

    logi(format!("Uploading {} ({} bytes) to catbox", path.display(), size));
    let resp = client
        .post(CATBOX_API_URL)
        .multipart(form)
        .timeout(timeout)
        .send()
        .await
        .context("Catbox upload failed")?;

    let status = resp.status();
    let body = resp.text().await.context("Catbox response read failed")?;
    if !status.is_success() {
        return Err(PipelineError::UploadRejected(format!("HTTP {}: {}", status.as_u16(), body.trim())).into());
    }
    parse_upload_response(&body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_link_is_accepted() {
        assert_eq!(
            parse_upload_response("https://files.catbox.moe/abc123.mp4\n").unwrap(),
            "https://files.catbox.moe/abc123.mp4"
        );
    }

    #[test]
    fn error_text_is_rejected() {
        let err = parse_upload_response("No file uploaded").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::UploadRejected(msg)) if msg == "No file uploaded"
        ));
        assert!(parse_upload_response("").is_err());
        assert!(parse_upload_response("https://x.moe/a b").is_err());
    }
}
