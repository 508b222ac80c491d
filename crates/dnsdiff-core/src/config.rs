//! Configuration types for the dnsdiff pipeline
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};

/// Main dnsdiff configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsDiffConfig {
    /// DNS provider configuration
    pub provider: ProviderConfig,

    /// Snapshot store configuration
    #[serde(default)]
    pub store: SnapshotStoreConfig,

    /// Notification destination
    pub notifier: NotifierConfig,

    /// Optional scan settings
    #[serde(default)]
    pub scan: ScanConfig,
}

impl DnsDiffConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.notifier.validate()?;
        self.provider.validate()?;
        self.store.validate()?;
        self.scan.validate()?;

        Ok(())
    }
}

/// DNS provider configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Cloudflare provider
    Cloudflare {
        /// Cloudflare API token with Zone:Read and DNS:Read permissions
        api_token: String,
        /// Restrict zone listing to one account (optional)
        account_id: Option<String>,
    },
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Cloudflare { api_token, .. } => {
                if api_token.is_empty() {
                    return Err(crate::Error::config("Cloudflare API token cannot be empty"));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Cloudflare { .. } => "cloudflare",
        }
    }
}

// Keeps the API token out of logs
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::Cloudflare { account_id, .. } => f
                .debug_struct("Cloudflare")
                .field("api_token", &"<REDACTED>")
                .field("account_id", account_id)
                .finish(),
        }
    }
}

/// Snapshot store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SnapshotStoreConfig {
    /// File-based snapshot store
    File {
        /// Path to the snapshot file
        path: String,
    },

    /// In-memory snapshot store (not persistent)
    #[default]
    Memory,
}

impl SnapshotStoreConfig {
    /// Validate the store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            SnapshotStoreConfig::File { path } if path.is_empty() => Err(crate::Error::config(
                "Snapshot store path cannot be empty",
            )),
            _ => Ok(()),
        }
    }
}

/// Notification destination configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotifierConfig {
    /// Slack incoming webhook
    SlackWebhook {
        /// Webhook URL
        webhook_url: String,
    },
}

impl NotifierConfig {
    /// Validate the destination
    ///
    /// A missing destination is fatal: the run could neither report success
    /// nor failure.
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            NotifierConfig::SlackWebhook { webhook_url } => validate_webhook_url(webhook_url),
        }
    }
}

// Webhook URLs embed a secret in their path
impl std::fmt::Debug for NotifierConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotifierConfig::SlackWebhook { webhook_url } => f
                .debug_struct("SlackWebhook")
                .field("webhook_url", &redact_url(webhook_url))
                .finish(),
        }
    }
}

/// Check that a webhook URL is present and uses HTTP(S)
pub fn validate_webhook_url(url: &str) -> Result<(), crate::Error> {
    if url.trim().is_empty() {
        return Err(crate::Error::config("Notification webhook URL is not set"));
    }
    if !url.starts_with("https://") && !url.starts_with("http://") {
        return Err(crate::Error::config(
            "Notification webhook URL must use HTTP or HTTPS scheme",
        ));
    }
    Ok(())
}

/// Reduce a URL to its scheme and host for logging
pub fn redact_url(url: &str) -> String {
    match url.split_once("://") {
        Some((scheme, rest)) => {
            let host = rest.split('/').next().unwrap_or_default();
            format!("{}://{}/<REDACTED>", scheme, host)
        }
        None => "<REDACTED>".to_string(),
    }
}

/// Longest accepted snapshot retention (ten years)
pub const MAX_RETENTION_DAYS: u32 = 3650;

/// Longest accepted baseline skew margin (one day)
pub const MAX_SKEW_MARGIN_SECS: u64 = 86_400;

/// Scan settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Days a snapshot is kept before the store drops it
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Margin subtracted from the run time when looking up the baseline
    /// (in seconds)
    #[serde(default = "default_skew_margin_secs")]
    pub skew_margin_secs: u64,

    /// Maximum number of zones whose record sets are fetched at once
    ///
    /// Set to 1 to fetch zones sequentially.
    #[serde(default = "default_max_concurrent_zone_fetches")]
    pub max_concurrent_zone_fetches: usize,

    /// Capacity of the pipeline event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl ScanConfig {
    /// Validate the scan settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.retention_days == 0 {
            return Err(crate::Error::config("Retention must be at least one day"));
        }
        if self.retention_days > MAX_RETENTION_DAYS {
            return Err(crate::Error::config(format!(
                "Retention must be at most {} days. Got: {}",
                MAX_RETENTION_DAYS, self.retention_days
            )));
        }
        if self.skew_margin_secs > MAX_SKEW_MARGIN_SECS {
            return Err(crate::Error::config(format!(
                "Skew margin must be at most {} seconds. Got: {}",
                MAX_SKEW_MARGIN_SECS, self.skew_margin_secs
            )));
        }
        if self.max_concurrent_zone_fetches == 0 {
            return Err(crate::Error::config(
                "Concurrent zone fetches must be > 0",
            ));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }

    /// Retention window as a duration, capped at [`MAX_RETENTION_DAYS`]
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.retention_days.min(MAX_RETENTION_DAYS)))
    }

    /// Baseline skew margin as a duration, capped at [`MAX_SKEW_MARGIN_SECS`]
    pub fn skew_margin(&self) -> chrono::Duration {
        let secs = self.skew_margin_secs.min(MAX_SKEW_MARGIN_SECS);
        chrono::Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX))
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
            skew_margin_secs: default_skew_margin_secs(),
            max_concurrent_zone_fetches: default_max_concurrent_zone_fetches(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_retention_days() -> u32 {
    30
}

fn default_skew_margin_secs() -> u64 {
    300
}

fn default_max_concurrent_zone_fetches() -> usize {
    4
}

fn default_event_channel_capacity() -> usize {
    100
}
