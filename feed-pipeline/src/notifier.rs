use crate::types::{BackendError, Notification, Notifier};
use crate::utils::text;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

// Discord rejects embed descriptions above 4096 characters.
const DISCORD_DESCRIPTION_LIMIT: usize = 4000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WebhookFlavor {
    #[default]
    Slack,
    Discord,
}

impl FromStr for WebhookFlavor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "slack" => Ok(WebhookFlavor::Slack),
            "discord" => Ok(WebhookFlavor::Discord),
            other => Err(format!("unknown webhook flavor {:?}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub url: String,
    pub flavor: WebhookFlavor,
    pub timeout_seconds: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            flavor: WebhookFlavor::Slack,
            timeout_seconds: 15,
        }
    }
}

/// JSON body for one notification.
pub(crate) fn render_payload(flavor: WebhookFlavor, notification: &Notification) -> Value {
    match flavor {
        WebhookFlavor::Slack => json!({
            "text": format!(
                "*{}* ({})\n{}\n\n{}",
                notification.title, notification.source, notification.url, notification.summary
            ),
        }),
        WebhookFlavor::Discord => json!({
            "embeds": [{
                "title": notification.title,
                "url": notification.url,
                "description": text::smart_truncate(&notification.summary, DISCORD_DESCRIPTION_LIMIT),
                "footer": { "text": notification.source },
            }],
        }),
    }
}

/// Posts notifications to a chat webhook.
pub struct WebhookNotifier {
    client: Client,
    config: WebhookConfig,
}

impl WebhookNotifier {
    pub fn new(config: WebhookConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| BackendError::Request(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), BackendError> {
        let body = render_payload(self.config.flavor, notification);

        let response = self
            .client
            .post(&self.config.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        debug!("Sent notification for {:?}", notification.title);
        Ok(())
    }
}

/// Writes notifications to the log instead of sending them.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), BackendError> {
        info!(
            "[dry run] {} ({}) {}\n{}",
            notification.title, notification.source, notification.url, notification.summary
        );
        Ok(())
    }
}
