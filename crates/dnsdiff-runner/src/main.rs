// # dnsdiff - DNS change report runner
//
// Runs the snapshot-diff-notify pipeline once and exits. Intended to be
// started by an external daily scheduler (cron, systemd timer, Kubernetes
// CronJob).
//
// This binary is a THIN integration layer:
// - Reads configuration from environment variables
// - Initializes tracing and the tokio runtime
// - Builds the provider, snapshot store and notifier
// - Runs the `ScanPipeline` once
//
// All scan logic lives in dnsdiff-core.
//
// ## Configuration
//
// ### Notification
// - `DNSDIFF_SLACK_WEBHOOK_URL`: Slack incoming webhook (required)
//
// ### DNS Provider
// - `DNSDIFF_PROVIDER_TYPE`: Provider type (cloudflare)
// - `DNSDIFF_PROVIDER_API_TOKEN`: API token (required)
// - `DNSDIFF_PROVIDER_ACCOUNT_ID`: Restrict zone listing to one account (optional)
//
// ### Snapshot Store
// - `DNSDIFF_STORE_TYPE`: Type of snapshot store (file, memory)
// - `DNSDIFF_STORE_PATH`: Path to snapshot file (for file store)
//
// ### Scan
// - `DNSDIFF_RETENTION_DAYS`: Days a snapshot is kept (default 30)
// - `DNSDIFF_SKEW_MARGIN_SECS`: Baseline lookup margin (default 300)
// - `DNSDIFF_MAX_CONCURRENT_ZONES`: Zones fetched at once (default 4)
// - `DNSDIFF_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Example
//
// ```bash
// export DNSDIFF_SLACK_WEBHOOK_URL=https://hooks.slack.com/services/...
// export DNSDIFF_PROVIDER_API_TOKEN=your_token
// export DNSDIFF_STORE_PATH=/var/lib/dnsdiff/snapshots.json
//
// dnsdiff
// ```
//
// On success the run prints `{"statusCode":200,"body":"..."}` to stdout.

use anyhow::{Context, Result};
use dnsdiff_core::config::{
    DnsDiffConfig, NotifierConfig, ProviderConfig, ScanConfig, SnapshotStoreConfig,
};
use dnsdiff_core::traits::{DnsProvider, Notifier, SnapshotStore};
use dnsdiff_core::{
    Collector, FileSnapshotStore, MemorySnapshotStore, PipelineEvent, Reporter, ScanOutcome,
    ScanPipeline,
};
use std::env;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for the scheduler
///
/// - 0: Report delivered
/// - 1: Configuration or startup error
/// - 2: The run failed (a failure report was attempted)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DnsDiffExitCode {
    Success = 0,
    ConfigError = 1,
    RunFailed = 2,
}

impl From<DnsDiffExitCode> for ExitCode {
    fn from(code: DnsDiffExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
#[derive(Debug)]
struct Config {
    pipeline: DnsDiffConfig,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`
    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider = match var("DNSDIFF_PROVIDER_TYPE")
            .unwrap_or_else(|| "cloudflare".to_string())
            .as_str()
        {
            "cloudflare" => ProviderConfig::Cloudflare {
                api_token: var("DNSDIFF_PROVIDER_API_TOKEN").unwrap_or_default(),
                account_id: var("DNSDIFF_PROVIDER_ACCOUNT_ID"),
            },
            other => anyhow::bail!(
                "DNSDIFF_PROVIDER_TYPE '{}' is not supported. \
                Supported providers: cloudflare",
                other
            ),
        };

        let store = match var("DNSDIFF_STORE_TYPE")
            .unwrap_or_else(|| "file".to_string())
            .as_str()
        {
            "file" => SnapshotStoreConfig::File {
                path: var("DNSDIFF_STORE_PATH").unwrap_or_default(),
            },
            "memory" => SnapshotStoreConfig::Memory,
            other => anyhow::bail!(
                "DNSDIFF_STORE_TYPE '{}' is not supported. \
                Supported types: file, memory",
                other
            ),
        };

        let notifier = NotifierConfig::SlackWebhook {
            webhook_url: var("DNSDIFF_SLACK_WEBHOOK_URL").unwrap_or_default(),
        };

        let defaults = ScanConfig::default();
        let scan = ScanConfig {
            retention_days: parse_or("DNSDIFF_RETENTION_DAYS", &var, defaults.retention_days)?,
            skew_margin_secs: parse_or("DNSDIFF_SKEW_MARGIN_SECS", &var, defaults.skew_margin_secs)?,
            max_concurrent_zone_fetches: parse_or(
                "DNSDIFF_MAX_CONCURRENT_ZONES",
                &var,
                defaults.max_concurrent_zone_fetches,
            )?,
            ..defaults
        };

        Ok(Self {
            pipeline: DnsDiffConfig {
                provider,
                store,
                notifier,
                scan,
            },
            log_level: var("DNSDIFF_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// The webhook is checked first: without it neither a report nor a
    /// failure report can be delivered.
    fn validate(&self) -> Result<()> {
        if let NotifierConfig::SlackWebhook { webhook_url } = &self.pipeline.notifier
            && webhook_url.is_empty()
        {
            anyhow::bail!(
                "DNSDIFF_SLACK_WEBHOOK_URL is required. \
                Set it via: export DNSDIFF_SLACK_WEBHOOK_URL=https://hooks.slack.com/services/..."
            );
        }

        let ProviderConfig::Cloudflare { api_token, .. } = &self.pipeline.provider;
        if api_token.is_empty() {
            anyhow::bail!(
                "DNSDIFF_PROVIDER_API_TOKEN is required. \
                Set it via: export DNSDIFF_PROVIDER_API_TOKEN=your_token"
            );
        }

        if let SnapshotStoreConfig::File { path } = &self.pipeline.store
            && path.is_empty()
        {
            anyhow::bail!(
                "DNSDIFF_STORE_PATH is required when DNSDIFF_STORE_TYPE=file. \
                Set it via: export DNSDIFF_STORE_PATH=/var/lib/dnsdiff/snapshots.json"
            );
        }

        self.pipeline.validate()?;

        parse_level(&self.log_level)?;

        Ok(())
    }
}

/// Parse `key` if set, otherwise fall back to `default`
fn parse_or<T>(key: &str, var: impl Fn(&str) -> Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e| {
            anyhow::anyhow!("{} must be a non-negative integer. Got '{}': {}", key, raw, e)
        }),
    }
}

fn parse_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "DNSDIFF_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            level
        ),
    }
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DnsDiffExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return DnsDiffExitCode::ConfigError.into();
    }

    let log_level = parse_level(&config.log_level).unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DnsDiffExitCode::ConfigError.into();
    }

    info!("Starting dnsdiff");
    debug!("Configuration: {:?}", config);

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DnsDiffExitCode::ConfigError.into();
        }
    };

    rt.block_on(run(config.pipeline)).into()
}

/// Build the components and run the pipeline once
async fn run(config: DnsDiffConfig) -> DnsDiffExitCode {
    let (pipeline, events) = match build_pipeline(&config).await {
        Ok(built) => built,
        Err(e) => {
            error!("Startup error: {:#}", e);
            return DnsDiffExitCode::ConfigError;
        }
    };

    let logger = tokio::spawn(log_events(events));
    let result = pipeline.run().await;

    // Closing the event channel lets the logger drain and finish
    drop(pipeline);
    if let Err(e) = logger.await {
        warn!("Event logger stopped abnormally: {}", e);
    }

    exit_code_for(result)
}

/// Report the outcome on stdout and map it to an exit code
fn exit_code_for(result: dnsdiff_core::Result<ScanOutcome>) -> DnsDiffExitCode {
    match result {
        Ok(outcome) => {
            match serde_json::to_string(&outcome) {
                Ok(json) => println!("{}", json),
                Err(e) => warn!("Failed to serialize outcome: {}", e),
            }
            DnsDiffExitCode::Success
        }
        Err(e) => {
            error!("Scan failed: {}", e);
            DnsDiffExitCode::RunFailed
        }
    }
}

async fn build_pipeline(
    config: &DnsDiffConfig,
) -> Result<(ScanPipeline, mpsc::Receiver<PipelineEvent>)> {
    let provider = build_provider(&config.provider)?;
    let store = build_store(&config.store).await?;
    let notifier = build_notifier(&config.notifier)?;

    info!(
        "Provider: {}, store: {}, notifier: {}",
        provider.provider_name(),
        store.store_name(),
        notifier.notifier_name()
    );

    let collector = Collector::new(provider, config.scan.max_concurrent_zone_fetches);
    let reporter = Reporter::new(notifier);
    Ok(ScanPipeline::new(
        collector,
        store,
        reporter,
        config.scan.clone(),
    )?)
}

#[cfg(feature = "cloudflare")]
fn build_provider(config: &ProviderConfig) -> Result<Arc<dyn DnsProvider>> {
    let provider = dnsdiff_provider_cloudflare::CloudflareProvider::from_config(config)
        .context("Failed to create Cloudflare provider")?;
    Ok(Arc::new(provider))
}

#[cfg(not(feature = "cloudflare"))]
fn build_provider(config: &ProviderConfig) -> Result<Arc<dyn DnsProvider>> {
    anyhow::bail!(
        "Provider '{}' is not compiled in. Rebuild with --features cloudflare",
        config.type_name()
    )
}

#[cfg(feature = "slack")]
fn build_notifier(config: &NotifierConfig) -> Result<Box<dyn Notifier>> {
    let notifier = dnsdiff_notify_slack::SlackWebhookNotifier::from_config(config)
        .context("Failed to create Slack notifier")?;
    Ok(Box::new(notifier))
}

#[cfg(not(feature = "slack"))]
fn build_notifier(_config: &NotifierConfig) -> Result<Box<dyn Notifier>> {
    anyhow::bail!("Slack notifier is not compiled in. Rebuild with --features slack")
}

async fn build_store(config: &SnapshotStoreConfig) -> Result<Arc<dyn SnapshotStore>> {
    match config {
        SnapshotStoreConfig::File { path } => {
            let store = FileSnapshotStore::open(path)
                .await
                .with_context(|| format!("Failed to open snapshot store at {}", path))?;
            Ok(Arc::new(store))
        }
        SnapshotStoreConfig::Memory => {
            warn!("Using in-memory snapshot store: no baseline survives this run");
            Ok(Arc::new(MemorySnapshotStore::new()))
        }
    }
}

/// Log pipeline events until the pipeline is dropped
///
/// Returns how many events were logged.
async fn log_events(mut events: mpsc::Receiver<PipelineEvent>) -> usize {
    let mut logged = 0;
    while let Some(event) = events.recv().await {
        match event {
            PipelineEvent::StageEntered { stage } => debug!("Stage: {}", stage),
            PipelineEvent::BaselineUnavailable { error } => {
                warn!("Baseline unavailable: {}", error)
            }
            PipelineEvent::Completed {
                total_records,
                added,
                removed,
                unchanged,
            } => info!(
                "Completed: total={} added={} removed={} unchanged={}",
                total_records, added, removed, unchanged
            ),
            PipelineEvent::Failed {
                stage,
                error,
                failure_reported,
            } => error!(
                "Failed during {}: {} (failure reported: {})",
                stage, error, failure_reported
            ),
        }
        logged += 1;
    }
    logged
}
