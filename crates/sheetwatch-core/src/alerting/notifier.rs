//! Alert delivery

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::ChannelConfig;
use crate::error::{Error, Result};

/// A destination for alert messages.
///
/// Delivery is fire-and-forget: `Ok` means the transport accepted the
/// message, nothing more.
#[async_trait]
pub trait AlertChannel: Send + Sync {
    /// Deliver one message, failing with `Dispatch`
    async fn dispatch(&self, text: &str) -> Result<()>;
}

/// Posts messages to a Slack incoming webhook
pub struct SlackChannel {
    client: Client,
    webhook_url: String,
    username: String,
    icon_emoji: String,
}

impl SlackChannel {
    /// Create a channel from configuration; the webhook URL is required
    pub fn new(config: &ChannelConfig) -> Result<Self> {
        let webhook_url = config
            .webhook_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| Error::config("missing required setting 'channel.webhook_url'"))?;

        Self::with_webhook(webhook_url, &config.username, &config.icon_emoji, config.timeout)
    }

    /// Create a channel for an explicit webhook
    pub fn with_webhook(
        webhook_url: &str,
        username: &str,
        icon_emoji: &str,
        timeout: Duration,
    ) -> Result<Self> {
        url::Url::parse(webhook_url)
            .map_err(|e| Error::config(format!("invalid channel.webhook_url: {e}")))?;

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            webhook_url: webhook_url.to_string(),
            username: username.to_string(),
            icon_emoji: icon_emoji.to_string(),
        })
    }
}

#[async_trait]
impl AlertChannel for SlackChannel {
    async fn dispatch(&self, text: &str) -> Result<()> {
        let payload = SlackPayload {
            text,
            username: Some(&self.username).filter(|u| !u.is_empty()),
            icon_emoji: Some(&self.icon_emoji).filter(|i| !i.is_empty()),
        };

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::dispatch(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::dispatch(format!("Slack returned {status}: {body}")));
        }

        debug!("Slack notification sent");
        Ok(())
    }
}

/// Writes messages to the log instead of sending them; used for dry runs
#[derive(Debug, Default)]
pub struct LogChannel {
    messages: Mutex<Vec<String>>,
}

impl LogChannel {
    /// Create a new log channel
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages "sent" so far
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

#[async_trait]
impl AlertChannel for LogChannel {
    async fn dispatch(&self, text: &str) -> Result<()> {
        info!(message = %text, "Dry run: alert not sent");
        self.messages.lock().push(text.to_string());
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct SlackPayload<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon_emoji: Option<&'a String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shape() {
        let username = "Spyke Alert".to_string();
        let icon = ":warning:".to_string();
        let payload = SlackPayload {
            text: "hello",
            username: Some(&username),
            icon_emoji: Some(&icon),
        };

        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            serde_json::json!({
                "text": "hello",
                "username": "Spyke Alert",
                "icon_emoji": ":warning:",
            })
        );
    }

    #[test]
    fn test_missing_webhook_is_config_error() {
        assert!(matches!(
            SlackChannel::new(&ChannelConfig::default()),
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_log_channel_keeps_messages() {
        let channel = LogChannel::new();
        channel.dispatch("one").await.unwrap();
        channel.dispatch("two").await.unwrap();

        assert_eq!(channel.messages(), vec!["one", "two"]);
    }
}
