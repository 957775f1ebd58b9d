//! Chat webhook notifications.
//!
//! Delivery is best effort: a failing webhook is logged and never fails the
//! preview run.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Serialize;
use serde_json::{json, Value};

use crate::config::{NotifyEvent, NotifyTarget, WebhookKind};
use crate::error::{PreviewError, Result};
use crate::github::{is_retryable_status, parse_retry_after, retry_delay, truncate_for_error};

const MAX_ATTEMPTS: u32 = 3;

/// Everything a chat message may mention about one preview change.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PreviewNotice {
    pub repo: String,
    pub pr: u64,
    pub title: String,
    pub pr_url: String,
    pub theme_id: Option<u64>,
    pub theme_name: Option<String>,
    pub preview_url: Option<String>,
    pub editor_url: Option<String>,
    pub error: Option<String>,
}

impl PreviewNotice {
    /// One-line plain-text summary used by the text-based webhook kinds.
    pub fn summary(&self, event: NotifyEvent) -> String {
        let pr = if self.title.is_empty() {
            format!("{} #{}", self.repo, self.pr)
        } else {
            format!("{} #{} \"{}\"", self.repo, self.pr, self.title)
        };
        match event {
            NotifyEvent::Deployed => format!(
                "Theme preview ready for {pr}: {}",
                self.preview_url.as_deref().unwrap_or("(no link)")
            ),
            NotifyEvent::Failed => format!(
                "Theme preview failed for {pr}: {}",
                self.error.as_deref().unwrap_or("unknown error")
            ),
            NotifyEvent::Removed => format!("Theme preview removed for {pr}"),
            NotifyEvent::Evicted => format!(
                "Theme preview for {pr} was deleted to stay under the store theme limit"
            ),
        }
    }
}

/// Build the JSON body a webhook of `kind` expects.
pub fn payload(kind: WebhookKind, event: NotifyEvent, notice: &PreviewNotice) -> Value {
    let text = notice.summary(event);
    match kind {
        WebhookKind::Slack | WebhookKind::Teams | WebhookKind::GoogleChat => json!({ "text": text }),
        WebhookKind::Discord => json!({ "content": text }),
        WebhookKind::Generic => json!({
            "event": event.as_str(),
            "text": text,
            "preview": notice,
        }),
    }
}

pub struct Notifier {
    http: Client,
    targets: Vec<NotifyTarget>,
    base_delay_ms: u64,
}

impl Notifier {
    pub fn new(targets: Vec<NotifyTarget>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "webhook client setup failed, using defaults");
                Client::new()
            });
        Self {
            http,
            targets,
            base_delay_ms: 500,
        }
    }

    /// A notifier with no targets; every send is a no-op.
    pub fn disabled() -> Self {
        Self::new(Vec::new())
    }

    pub fn with_base_delay_ms(mut self, base_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self
    }

    /// Deliver `event` to every subscribed target. Returns how many
    /// deliveries succeeded.
    pub fn send(&self, event: NotifyEvent, notice: &PreviewNotice) -> usize {
        let mut delivered = 0;
        for target in self.targets.iter().filter(|t| t.wants(event)) {
            let Some(url) = target.resolve_url() else {
                tracing::debug!(kind = ?target.kind, "webhook url not set, skipping");
                continue;
            };
            let body = payload(target.kind, event, notice);
            match self.post(&url, &body) {
                Ok(()) => delivered += 1,
                Err(e) => tracing::warn!(
                    kind = ?target.kind,
                    event = event.as_str(),
                    error = %e,
                    "webhook delivery failed"
                ),
            }
        }
        delivered
    }

    fn post(&self, url: &str, body: &Value) -> Result<()> {
        let mut attempt = 0_u32;
        loop {
            attempt += 1;
            match self.http.post(url).json(body).send() {
                Ok(response) if response.status().is_success() => return Ok(()),
                Ok(response) => {
                    let status = response.status().as_u16();
                    if attempt < MAX_ATTEMPTS && is_retryable_status(status) {
                        let wait =
                            retry_delay(self.base_delay_ms, attempt, parse_retry_after(response.headers()));
                        std::thread::sleep(wait);
                        continue;
                    }
                    return Err(PreviewError::Api {
                        operation: "webhook".into(),
                        status,
                        body: truncate_for_error(&response.text().unwrap_or_default(), 200),
                    });
                }
                Err(e) if attempt < MAX_ATTEMPTS && (e.is_timeout() || e.is_connect()) => {
                    std::thread::sleep(retry_delay(self.base_delay_ms, attempt, None));
                }
                Err(source) => {
                    return Err(PreviewError::Http {
                        operation: "webhook".into(),
                        source,
                    })
                }
            }
        }
    }
}
