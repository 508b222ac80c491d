//! Scan pipeline
//!
//! The ScanPipeline is responsible for:
//! - Collecting the current records via the Collector
//! - Loading the baseline snapshot
//! - Persisting today's snapshot
//! - Diffing current against baseline
//! - Reporting the result (or the failure)
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Collector  │─── Vec<Record> ───┐
//! └─────────────┘                   │
//!                                   ▼
//!                          ┌──────────────┐
//!                          │ ScanPipeline │
//!                          └──────────────┘
//!                                   │
//!       ┌───────────────────────────┼───────────────────────────┐
//!       │                           │                           │
//!       ▼                           ▼                           ▼
//! ┌───────────────┐         ┌──────────────┐           ┌─────────────┐
//! │ SnapshotStore │         │    diff()    │           │  Reporter   │
//! │ (read, write) │         │              │           │  (deliver)  │
//! └───────────────┘         └──────────────┘           └─────────────┘
//! ```
//!
//! ## Stages
//!
//! `Collecting → LoadingBaseline → Persisting → Diffing → Reporting → Done`
//!
//! Any failure moves the run to `Failed`, which delivers one failure report
//! and returns the error. A baseline read failure is not a failure: the run
//! continues with no baseline. No stage is retried.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::collector::Collector;
use crate::config::ScanConfig;
use crate::diff::{DiffResult, diff};
use crate::error::{Error, Result};
use crate::model::Snapshot;
use crate::report::Reporter;
use crate::traits::{BaselineQuery, SnapshotStore};

/// Body returned on a successful run
pub const SUCCESS_BODY: &str = "Scan completed successfully";

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Collecting,
    LoadingBaseline,
    Persisting,
    Diffing,
    Reporting,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Collecting => "collecting",
            Stage::LoadingBaseline => "loading-baseline",
            Stage::Persisting => "persisting",
            Stage::Diffing => "diffing",
            Stage::Reporting => "reporting",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Events emitted by the ScanPipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    /// A stage started
    StageEntered { stage: Stage },

    /// Baseline could not be read; the run continues without one
    BaselineUnavailable { error: String },

    /// Run finished and the report was delivered
    Completed {
        total_records: usize,
        added: usize,
        removed: usize,
        unchanged: usize,
    },

    /// Run failed in `stage`
    Failed {
        stage: Stage,
        error: String,
        failure_reported: bool,
    },
}

/// Result of a successful run, in the scheduler's `{statusCode, body}` shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanOutcome {
    pub status_code: u16,
    pub body: String,
    #[serde(skip)]
    pub diff: DiffResult,
    #[serde(skip)]
    pub total_records: usize,
}

/// The snapshot-diff-notify pipeline
///
/// ## Lifecycle
///
/// 1. Create with [`ScanPipeline::new()`]
/// 2. Invoke [`ScanPipeline::run()`] once per scheduled trigger
///
/// Each external call (listing, store read, store write, delivery) is made
/// at most once per run.
pub struct ScanPipeline {
    /// Record collection
    collector: Collector,

    /// Snapshot persistence
    store: Arc<dyn SnapshotStore>,

    /// Report rendering and delivery
    reporter: Reporter,

    /// Scan settings
    scan: ScanConfig,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<PipelineEvent>,
}

impl ScanPipeline {
    /// Create a new pipeline
    ///
    /// # Returns
    ///
    /// A tuple of (pipeline, event_receiver) where event_receiver yields
    /// pipeline events
    pub fn new(
        collector: Collector,
        store: Arc<dyn SnapshotStore>,
        reporter: Reporter,
        scan: ScanConfig,
    ) -> Result<(Self, mpsc::Receiver<PipelineEvent>)> {
        scan.validate()?;

        let (tx, rx) = mpsc::channel(scan.event_channel_capacity);

        let pipeline = Self {
            collector,
            store,
            reporter,
            scan,
            event_tx: tx,
        };

        Ok((pipeline, rx))
    }

    /// Run the pipeline at the current time
    pub async fn run(&self) -> Result<ScanOutcome> {
        self.run_at(Utc::now()).await
    }

    /// Run the pipeline as if invoked at `now`
    ///
    /// # Returns
    ///
    /// - `Ok(ScanOutcome)`: The change report was delivered
    /// - `Err(Error)`: The run failed; a failure report was attempted
    ///   unless delivery itself was the failing stage
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<ScanOutcome> {
        info!("Starting DNS scan");

        match self.execute(now).await {
            Ok(outcome) => {
                self.enter(Stage::Done);
                info!(
                    "Scan complete: {} record(s), {} added, {} removed",
                    outcome.total_records,
                    outcome.diff.added.len(),
                    outcome.diff.removed.len()
                );
                self.emit_event(PipelineEvent::Completed {
                    total_records: outcome.total_records,
                    added: outcome.diff.added.len(),
                    removed: outcome.diff.removed.len(),
                    unchanged: outcome.diff.unchanged_count,
                });
                Ok(outcome)
            }
            Err((stage, e)) => {
                self.enter(Stage::Failed);
                error!("Scan failed during {}: {}", stage, e);

                let failure_reported = if stage == Stage::Reporting {
                    false
                } else {
                    self.report_failure(&e).await
                };

                self.emit_event(PipelineEvent::Failed {
                    stage,
                    error: e.to_string(),
                    failure_reported,
                });
                Err(e)
            }
        }
    }

    async fn execute(&self, now: DateTime<Utc>) -> std::result::Result<ScanOutcome, (Stage, Error)> {
        self.enter(Stage::Collecting);
        let current = self
            .collector
            .collect()
            .await
            .map_err(|e| (Stage::Collecting, e))?;

        self.enter(Stage::LoadingBaseline);
        let previous = self.load_baseline(now).await;

        self.enter(Stage::Persisting);
        let snapshot = Snapshot::new(current, now, self.scan.retention());
        self.store
            .put(&snapshot)
            .await
            .map_err(|e| (Stage::Persisting, into_persistence(e)))?;
        info!(
            "Stored snapshot {} in {} store",
            snapshot.date,
            self.store.store_name()
        );

        self.enter(Stage::Diffing);
        let result = diff(
            &snapshot.records,
            previous.as_ref().map(|p| p.records.as_slice()),
        );

        self.enter(Stage::Reporting);
        let message = self.reporter.render(&result, snapshot.records.len(), now);
        self.reporter
            .deliver(&message)
            .await
            .map_err(|e| (Stage::Reporting, e))?;

        Ok(ScanOutcome {
            status_code: 200,
            body: SUCCESS_BODY.to_string(),
            diff: result,
            total_records: snapshot.records.len(),
        })
    }

    /// Read the baseline, degrading any failure to "no baseline"
    async fn load_baseline(&self, now: DateTime<Utc>) -> Option<Snapshot> {
        let query = BaselineQuery::new(now, self.scan.skew_margin());

        match self.store.get_previous(&query).await {
            Ok(Some(previous)) => {
                info!(
                    "Baseline snapshot {} with {} record(s)",
                    previous.date,
                    previous.records.len()
                );
                Some(previous)
            }
            Ok(None) => {
                info!("No baseline snapshot before {}", query.cutoff());
                None
            }
            Err(e) => {
                warn!("Failed to load baseline snapshot, continuing without one: {}", e);
                self.emit_event(PipelineEvent::BaselineUnavailable {
                    error: e.to_string(),
                });
                None
            }
        }
    }

    /// Deliver the failure report; returns whether it was delivered
    async fn report_failure(&self, cause: &Error) -> bool {
        let message = self.reporter.render_failure(&cause.to_string());
        match self.reporter.deliver(&message).await {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to deliver failure report: {}", e);
                false
            }
        }
    }

    fn enter(&self, stage: Stage) {
        self.emit_event(PipelineEvent::StageEntered { stage });
    }

    /// Emit a pipeline event
    fn emit_event(&self, event: PipelineEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            // Nobody is listening
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}

fn into_persistence(err: Error) -> Error {
    match err {
        Error::Persistence(_) => err,
        other => Error::persistence(other.to_string()),
    }
}
