use crate::api::catbox;
use crate::api::freesound::FreesoundClient;
use crate::api::pixabay::PixabayClient;
use crate::caption::{self, Caption, CaptionPools};
use crate::config::Config;
use crate::ffmpeg;
use crate::init;
use crate::notify::{self, Dispatched, NotifyTargets};
use crate::render;
use crate::selector;
use crate::used_set::UsedSetStore;
use crate::{logi, logok, logw};
use anyhow::{Context, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

const VIDEO_FILE: &str = "video.mp4";
const MUSIC_FILE: &str = "music.mp3";

fn now_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// Wall-clock limit for the whole run, checked between steps.
#[derive(Debug, Clone, Copy)]
pub struct RunBudget {
    started: Instant,
    limit: Option<Duration>,
}

impl RunBudget {
    pub fn start(limit: Option<Duration>) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn exceeded(&self) -> bool {
        self.limit.is_some_and(|limit| self.elapsed() >= limit)
    }

    fn check(&self, step: &'static str) -> Option<RunOutcome> {
        if !self.exceeded() {
            return None;
        }
        logw(format!(
            "Time budget exhausted after {:.1}s; stopping before {}",
            self.elapsed().as_secs_f64(),
            step
        ));
        Some(RunOutcome::BudgetExceeded {
            step,
            elapsed: self.elapsed(),
        })
    }
}

#[derive(Debug)]
pub enum RunOutcome {
    Published {
        url: String,
        caption: Caption,
        notifications: Dispatched,
    },
    /// Clean early stop; not an error.
    BudgetExceeded { step: &'static str, elapsed: Duration },
}

pub async fn run_generation(cfg: &Config) -> Result<RunOutcome> {
    let budget = RunBudget::start(cfg.time_budget);
    let mut rng = StdRng::seed_from_u64(now_seed());

    init::require_ffmpeg().await?;
    init::ensure_work_dir(&cfg.work_dir).await?;
    let cleared = init::clear_stale_media(&cfg.work_dir).await?;
    if cleared > 0 {
        logi(format!("Cleared {} stale media files from {}", cleared, cfg.work_dir.display()));
    }

    let pools = CaptionPools::load(&cfg.config_dir).await?;
    let client = crate::api::build_client()?;

    logi("Fetching media...".to_string());
    let catalog = PixabayClient::new(
        client.clone(),
        &cfg.pixabay_key,
        cfg.http_timeout,
        cfg.transfer_timeout,
    );
    let store = UsedSetStore::new(cfg.used_set_path());
    let video_path = cfg.work_dir.join(VIDEO_FILE);
    let selection =
        selector::select_and_fetch(&catalog, &cfg.keywords, &cfg.filters, &store, &video_path, &mut rng).await?;

    if let Some(outcome) = budget.check("audio fetch") {
        return Ok(outcome);
    }

    let audio = FreesoundClient::new(
        client.clone(),
        &cfg.freesound_key,
        cfg.http_timeout,
        cfg.transfer_timeout,
    );
    let music_path = cfg.work_dir.join(MUSIC_FILE);
    let track = audio.fetch_track(&cfg.audio_query, &music_path, &mut rng).await?;
    logok(format!(
        "Downloaded audio {} ({:?}) -> {}",
        track.id,
        track.name,
        track.path.display()
    ));

    if let Some(outcome) = budget.check("render") {
        return Ok(outcome);
    }

    let source = ffmpeg::probe_source(&selection.local_path).await?;
    let audio_duration = ffmpeg::ffprobe_duration_seconds(&track.path).await?;
    let spec = render::plan_render(source, audio_duration, cfg.clip_duration, cfg.max_start_offset, &mut rng);
    let audio_covered = render::audio_output_duration(audio_duration, spec.target_duration());
    logi(format!(
        "Render plan: {}x{} source, {:.3}s from {:.3}s, audio {:.2}s x{} -> {:.3}s",
        source.width,
        source.height,
        spec.target_duration(),
        spec.window.start,
        audio_duration,
        spec.audio_loops + 1,
        audio_covered
    ));
    if spec.window.loop_video {
        logw(format!(
            "Source is {:.2}s, shorter than the {:.2}s target; looping it",
            source.duration,
            spec.target_duration()
        ));
    }

    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let out_path = cfg.work_dir.join(format!("reel_{stamp}.mp4"));
    ffmpeg::ffmpeg_make_reel(&selection.local_path, &track.path, &spec, &out_path)
        .await
        .context("Reel render failed")?;
    logok(format!("Rendered reel: {}", out_path.display()));

    let caption = caption::build_caption(
        &client,
        cfg.openai.as_ref(),
        &pools,
        cfg.http_timeout,
        &mut rng,
    )
    .await;

    if let Some(outcome) = budget.check("upload") {
        return Ok(outcome);
    }

    let url = catbox::upload_file(&client, &out_path, cfg.transfer_timeout).await?;
    logok(format!("Uploaded: {}", url));

    let targets = NotifyTargets {
        telegram: cfg.telegram.clone(),
        webhook_url: cfg.webhook_url.clone(),
    };
    let notifications = notify::dispatch(&client, &targets, &url, &caption, cfg.http_timeout);
    logi(format!("Dispatched {} notifications", notifications.len()));

    Ok(RunOutcome::Published {
        url,
        caption,
        notifications,
    })
}
