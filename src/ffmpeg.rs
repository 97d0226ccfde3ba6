use crate::error::PipelineError;
use crate::logi;
use crate::render::{RenderSpec, SourceInfo};
use anyhow::{Context, Result};
use std::path::Path;
use tokio::process::Command;

async fn run_cmd(args: &[String]) -> Result<()> {
    if args.is_empty() {
        return Ok(());
    }

    let mut cmd = Command::new(&args[0]);
    if args.len() > 1 {
        cmd.args(&args[1..]);
    }

    let status = cmd.status().await.context("Command execution failed")?;
    if !status.success() {
        return Err(PipelineError::EncoderFailed {
            status: status.to_string(),
            args: args.join(" "),
        }
        .into());
    }

    Ok(())
}

pub async fn ffprobe_video_dimensions(path: &Path) -> Result<(u32, u32)> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height",
            "-of",
            "csv=s=x:p=0",
        ])
        .arg(path)
        .output()
        .await
        .context("ffprobe execution failed")?;

    if !output.status.success() {
        anyhow::bail!("ffprobe failed for {}", path.display());
    }

    let text = String::from_utf8_lossy(&output.stdout);
    parse_dimensions(&text).with_context(|| format!("Invalid dimensions {:?} for {}", text.trim(), path.display()))
}

fn parse_dimensions(text: &str) -> Option<(u32, u32)> {
    let line = text.lines().next()?.trim();
    let (w, h) = line.split_once('x')?;
    let w = w.trim().parse::<u32>().ok()?;
    let h = h.trim().trim_end_matches('x').parse::<u32>().ok()?;
    (w > 0 && h > 0).then_some((w, h))
}

pub async fn ffprobe_duration_seconds(path: &Path) -> Result<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .await
        .context("ffprobe duration failed")?;

    if !output.status.success() {
        anyhow::bail!("ffprobe failed for {}", path.display());
    }

    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let duration = text.parse::<f64>().unwrap_or(-1.0);
    if duration <= 0.1 {
        anyhow::bail!("Invalid duration {:?} for {}", text, path.display());
    }
    Ok(duration)
}

pub async fn probe_source(path: &Path) -> Result<SourceInfo> {
    let (width, height) = ffprobe_video_dimensions(path).await?;
    let duration = ffprobe_duration_seconds(path).await?;
    Ok(SourceInfo {
        width,
        height,
        duration,
    })
}

/// Full argument list for the single trim/crop/scale/mux pass.
pub fn reel_args(video_in: &Path, audio_in: &Path, spec: &RenderSpec, out_mp4: &Path) -> Vec<String> {
    let mut args: Vec<String> = ["ffmpeg", "-y", "-hide_banner", "-loglevel", "error"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    if spec.window.loop_video {
        args.extend(["-stream_loop".to_string(), "-1".to_string()]);
    }
    args.extend([
        "-ss".to_string(),
        format!("{:.3}", spec.window.start),
        "-i".to_string(),
        video_in.display().to_string(),
    ]);

    if spec.audio_loops > 0 {
        args.extend(["-stream_loop".to_string(), spec.audio_loops.to_string()]);
    }
    args.extend(["-i".to_string(), audio_in.display().to_string()]);

    args.extend([
        "-filter_complex".to_string(),
        format!("[0:v]{}[v];[1:a]{}[a]", spec.video_filter(), spec.audio_filter()),
        "-map".to_string(),
        "[v]".to_string(),
        "-map".to_string(),
        "[a]".to_string(),
        "-t".to_string(),
        format!("{:.3}", spec.target_duration()),
        "-r".to_string(),
        "30".to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-preset".to_string(),
        "veryfast".to_string(),
        "-crf".to_string(),
        "22".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        "192k".to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
        out_mp4.display().to_string(),
    ]);
    args
}

pub async fn ffmpeg_make_reel(video_in: &Path, audio_in: &Path, spec: &RenderSpec, out_mp4: &Path) -> Result<()> {
    logi(format!(
        "Rendering {:.3}s from {:.3}s ({:?}, audio loops {}) -> {}",
        spec.target_duration(),
        spec.window.start,
        spec.crop.mode,
        spec.audio_loops,
        out_mp4.display()
    ));

    run_cmd(&reel_args(video_in, audio_in, spec, out_mp4)).await?;
    if !out_mp4.exists() {
        anyhow::bail!("Encoder reported success but {} is missing", out_mp4.display());
    }
    Ok(())
}
