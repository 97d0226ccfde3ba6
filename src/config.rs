use crate::error::PipelineError;
use crate::render::ClipDuration;
use crate::selector::SelectionFilters;
use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_KEYWORDS: &[&str] = &["dog", "cat", "lion", "bird", "horse", "elephant"];
const DEFAULT_AUDIO_QUERY: &str = "nature";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_MAX_START_OFFSET: f64 = 2.0;
const DEFAULT_CLIP_RANGE: (f64, f64) = (8.0, 10.0);
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;
const DEFAULT_TRANSFER_TIMEOUT_SECS: u64 = 120;
/// Filters print durations with three decimals; anything shorter renders as zero.
const MIN_CLIP_SECONDS: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelegramMode {
    /// `sendVideo` with the hosted link and the caption.
    Video,
    /// `sendMessage` with the caption and the link as text.
    Message,
}

#[derive(Debug, Clone)]
pub struct TelegramTarget {
    pub bot_token: String,
    pub chat_id: String,
    pub mode: TelegramMode,
}

#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub pixabay_key: String,
    pub freesound_key: String,
    pub telegram: Option<TelegramTarget>,
    pub webhook_url: Option<String>,
    pub openai: Option<OpenAiSettings>,
    pub keywords: Vec<String>,
    pub filters: SelectionFilters,
    pub clip_duration: ClipDuration,
    pub max_start_offset: f64,
    pub audio_query: String,
    pub time_budget: Option<Duration>,
    pub work_dir: PathBuf,
    pub config_dir: PathBuf,
    pub http_timeout: Duration,
    pub transfer_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let pixabay_key = get("PIXABAY_API_KEY")
            .or_else(|| get("PIXABAY_KEY"))
            .ok_or(PipelineError::MissingCredential("PIXABAY_API_KEY"))?;
        let freesound_key = get("FREESOUND_API_KEY")
            .or_else(|| get("FREESOUND_KEY"))
            .ok_or(PipelineError::MissingCredential("FREESOUND_API_KEY"))?;

        let telegram = match (get("TELEGRAM_BOT_TOKEN"), get("TELEGRAM_CHAT_ID")) {
            (Some(bot_token), Some(chat_id)) => {
                let mode = match get("TELEGRAM_SEND_MODE").as_deref() {
                    None | Some("video") => TelegramMode::Video,
                    Some("message") => TelegramMode::Message,
                    Some(other) => {
                        return Err(PipelineError::InvalidSetting {
                            name: "TELEGRAM_SEND_MODE",
                            value: other.to_string(),
                            reason: "expected `video` or `message`",
                        }
                        .into());
                    }
                };
                Some(TelegramTarget {
                    bot_token,
                    chat_id,
                    mode,
                })
            }
            (None, None) => None,
            (Some(_), None) => return Err(PipelineError::MissingCredential("TELEGRAM_CHAT_ID").into()),
            (None, Some(_)) => return Err(PipelineError::MissingCredential("TELEGRAM_BOT_TOKEN").into()),
        };

        let openai = get("OPENAI_API_KEY").map(|api_key| OpenAiSettings {
            api_key,
            model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
        });

        let keywords = match get("REEL_KEYWORDS") {
            Some(raw) => split_list(&raw),
            None => DEFAULT_KEYWORDS.iter().map(|s| s.to_string()).collect(),
        };
        if keywords.is_empty() {
            return Err(PipelineError::InvalidSetting {
                name: "REEL_KEYWORDS",
                value: get("REEL_KEYWORDS").unwrap_or_default(),
                reason: "at least one keyword is required",
            }
            .into());
        }

        let deny_tags = get("REEL_DENY_TAGS")
            .map(|raw| split_list(&raw))
            .unwrap_or_default();

        let min_duration = parse_seconds(&get, "REEL_MIN_DURATION")?;
        let max_duration = parse_seconds(&get, "REEL_MAX_DURATION")?;
        let duration_window = match (min_duration, max_duration) {
            (None, None) => None,
            (min, max) => {
                let min = min.unwrap_or(0.0);
                let max = max.unwrap_or(f64::INFINITY);
                if min > max {
                    return Err(PipelineError::InvalidSetting {
                        name: "REEL_MIN_DURATION",
                        value: min.to_string(),
                        reason: "minimum exceeds REEL_MAX_DURATION",
                    }
                    .into());
                }
                Some((min, max))
            }
        };

        let clip_duration = match parse_seconds(&get, "REEL_CLIP_SECONDS")? {
            Some(secs) if secs >= MIN_CLIP_SECONDS => ClipDuration::Fixed(secs),
            Some(secs) => {
                return Err(PipelineError::InvalidSetting {
                    name: "REEL_CLIP_SECONDS",
                    value: secs.to_string(),
                    reason: "must be at least one millisecond",
                }
                .into());
            }
            None => ClipDuration::Range {
                min: DEFAULT_CLIP_RANGE.0,
                max: DEFAULT_CLIP_RANGE.1,
            },
        };

        let max_start_offset =
            parse_seconds(&get, "REEL_MAX_START_OFFSET")?.unwrap_or(DEFAULT_MAX_START_OFFSET);

        let time_budget = parse_duration(&get, "REEL_TIME_BUDGET_SECS", false)?;

        let http_timeout = parse_duration(&get, "REEL_HTTP_TIMEOUT_SECS", true)?
            .unwrap_or(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS));
        let transfer_timeout = parse_duration(&get, "REEL_TRANSFER_TIMEOUT_SECS", true)?
            .unwrap_or(Duration::from_secs(DEFAULT_TRANSFER_TIMEOUT_SECS));

        Ok(Config {
            pixabay_key,
            freesound_key,
            telegram,
            webhook_url: get("WEBHOOK_URL"),
            openai,
            keywords,
            filters: SelectionFilters {
                deny_tags,
                duration_window,
            },
            clip_duration,
            max_start_offset,
            audio_query: get("REEL_AUDIO_QUERY").unwrap_or_else(|| DEFAULT_AUDIO_QUERY.to_string()),
            time_budget,
            work_dir: get("REEL_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("reels_work")),
            config_dir: get("REEL_CONFIG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            http_timeout,
            transfer_timeout,
        })
    }

    pub fn used_set_path(&self) -> PathBuf {
        self.config_dir.join("used_videos.json")
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_seconds<G>(get: &G, name: &'static str) -> Result<Option<f64>>
where
    G: Fn(&str) -> Option<String>,
{
    let Some(raw) = get(name) else {
        return Ok(None);
    };
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(Some(v)),
        _ => Err(PipelineError::InvalidSetting {
            name,
            value: raw,
            reason: "expected a non-negative number of seconds",
        }
        .into()),
    }
}

/// Like `parse_seconds`, but the value must also fit a `Duration`.
fn parse_duration<G>(get: &G, name: &'static str, nonzero: bool) -> Result<Option<Duration>>
where
    G: Fn(&str) -> Option<String>,
{
    let Some(secs) = parse_seconds(get, name)? else {
        return Ok(None);
    };
    let invalid = |reason| PipelineError::InvalidSetting {
        name,
        value: secs.to_string(),
        reason,
    };
    let duration = Duration::try_from_secs_f64(secs).map_err(|_| invalid("too large for a duration"))?;
    if nonzero && duration.is_zero() {
        return Err(invalid("must be greater than zero").into());
    }
    Ok(Some(duration))
}
