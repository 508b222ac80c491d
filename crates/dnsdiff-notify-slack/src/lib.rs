// # Slack Webhook Notifier
//
// Delivers a rendered report to a Slack incoming webhook.
//
// ## Trust Level: Untrusted (Notifier)
//
// - ✅ One POST per `deliver()` call
// - ❌ NO retry logic (the pipeline reports a failed delivery as a failed run)
//
// ## Security Requirements
//
// - The webhook URL carries its secret in the path and NEVER appears in logs
//
// ## API Reference
//
// - Incoming webhooks: https://api.slack.com/messaging/webhooks
// - POST `<webhook_url>` with `{"blocks": [...]}`, success is any 2xx

use async_trait::async_trait;
use dnsdiff_core::config::{NotifierConfig, redact_url, validate_webhook_url};
use dnsdiff_core::report::Message;
use dnsdiff_core::traits::Notifier;
use dnsdiff_core::{Error, Result};
use std::time::Duration;

/// Default HTTP timeout for webhook delivery (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Slack incoming-webhook notifier
pub struct SlackWebhookNotifier {
    /// Webhook URL
    /// ⚠️ NEVER log this value
    webhook_url: String,

    client: reqwest::Client,
}

impl std::fmt::Debug for SlackWebhookNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackWebhookNotifier")
            .field("webhook_url", &redact_url(&self.webhook_url))
            .finish()
    }
}

impl SlackWebhookNotifier {
    /// Create a notifier for `webhook_url`
    ///
    /// # Errors
    ///
    /// - `Error::Config` if the URL is empty or not HTTP(S)
    /// - `Error::Http` if the HTTP client cannot be built
    pub fn new(webhook_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Self::with_client(webhook_url, client)
    }

    /// Create a notifier that sends through `client`
    pub fn with_client(webhook_url: impl Into<String>, client: reqwest::Client) -> Result<Self> {
        let webhook_url = webhook_url.into();
        validate_webhook_url(&webhook_url)?;

        Ok(Self {
            webhook_url,
            client,
        })
    }

    /// Build a notifier from configuration
    pub fn from_config(config: &NotifierConfig) -> Result<Self> {
        match config {
            NotifierConfig::SlackWebhook { webhook_url } => Self::new(webhook_url.clone()),
        }
    }
}

#[async_trait]
impl Notifier for SlackWebhookNotifier {
    async fn deliver(&self, message: &Message) -> Result<()> {
        tracing::debug!(
            "Posting {} block(s) to {}",
            message.blocks.len(),
            redact_url(&self.webhook_url)
        );

        let response = self
            .client
            .post(&self.webhook_url)
            .json(message)
            .send()
            .await
            // reqwest errors embed the URL
            .map_err(|e| Error::delivery(format!("Failed to send to Slack: {}", e.without_url())))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!("Slack webhook rejected message: {} {}", status, error_text);
            return Err(Error::delivery(format!(
                "Failed to send to Slack: {}",
                status
            )));
        }

        Ok(())
    }

    fn notifier_name(&self) -> &'static str {
        "slack-webhook"
    }
}
