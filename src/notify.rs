//! Fire-and-forget distribution of the published link.
//!
//! Each configured channel gets its own tokio task. Nothing here reports
//! back to the run: failures are logged inside the task and dropped.

use crate::api::{telegram, webhook};
use crate::caption::Caption;
use crate::config::TelegramTarget;
use crate::{logok, logw};
use reqwest::Client;
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Default)]
pub struct NotifyTargets {
    pub telegram: Option<TelegramTarget>,
    pub webhook_url: Option<String>,
}

/// Handles of the spawned notification tasks.
#[derive(Debug, Default)]
pub struct Dispatched {
    handles: Vec<JoinHandle<()>>,
}

impl Dispatched {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Gives the tasks up to `grace` to finish before the runtime is torn
    /// down. Outcomes are not inspected.
    pub async fn settle(self, grace: Duration) {
        let all = join_quietly(self.handles);
        if tokio::time::timeout(grace, all).await.is_err() {
            logw("Notification tasks still running at exit; abandoning them".to_string());
        }
    }
}

async fn join_quietly(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        let _ = handle.await;
    }
}

pub fn dispatch(
    client: &Client,
    targets: &NotifyTargets,
    video_url: &str,
    caption: &Caption,
    timeout: Duration,
) -> Dispatched {
    let mut handles = Vec::new();

    if let Some(target) = targets.telegram.clone() {
        let client = client.clone();
        let url = video_url.to_string();
        let text = caption.render();
        handles.push(tokio::spawn(async move {
            match telegram::send(&client, &target, &url, &text, timeout).await {
                Ok(()) => logok("Telegram notified".to_string()),
                Err(err) => logw(format!("Telegram notification failed: {err:#}")),
            }
        }));
    }

    if let Some(hook_url) = targets.webhook_url.clone() {
        let client = client.clone();
        let url = video_url.to_string();
        let caption = caption.clone();
        handles.push(tokio::spawn(async move {
            let payload = webhook::WebhookPayload::new(&url, &caption);
            match webhook::send(&client, &hook_url, &payload, timeout).await {
                Ok(()) => logok("Webhook notified".to_string()),
                Err(err) => logw(format!("Webhook notification failed: {err:#}")),
            }
        }));
    }

    if handles.is_empty() {
        logw("No notification channel configured".to_string());
    }
    Dispatched { handles }
}
