// # Snapshot Store Trait
//
// Defines the interface for durable, day-partitioned snapshot storage.
//
// ## Purpose
//
// The snapshot store keeps one full record scan per calendar day and drops
// each one once its retention window elapses. The previous day's scan is
// the baseline the next run diffs against.
//
// ## Implementations
//
// - File-based: single JSON document with atomic writes
// - In-memory: tests and ephemeral deployments

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::model::{DayKey, Snapshot};

/// Parameters of the baseline lookup
///
/// The lookup boundary is `now - skew_margin`. The margin keeps a run from
/// matching a snapshot written within the same run window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaselineQuery {
    /// Time of the current run
    pub now: DateTime<Utc>,
    /// Margin subtracted from `now` before matching
    pub skew_margin: Duration,
}

impl BaselineQuery {
    pub fn new(now: DateTime<Utc>, skew_margin: Duration) -> Self {
        Self { now, skew_margin }
    }

    /// Instant a baseline must have been created strictly before
    pub fn cutoff(&self) -> DateTime<Utc> {
        self.now - self.skew_margin
    }

    /// Latest day key a baseline may be stored under
    pub fn cutoff_day(&self) -> DayKey {
        DayKey::of(self.cutoff())
    }

    /// Whether `snapshot` qualifies as a baseline for this query
    pub fn matches(&self, snapshot: &Snapshot) -> bool {
        !snapshot.is_expired(self.now)
            && snapshot.date <= self.cutoff_day()
            && snapshot.created_at < self.cutoff()
    }
}

/// Trait for snapshot store implementations
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently from multiple tasks.
///
/// # Trust Level: Trusted (Core Component)
///
/// ## Allowed Capabilities
/// - ✅ Perform I/O for persistent storage
/// - ✅ Drop snapshots whose expiry has elapsed
///
/// ## Forbidden Capabilities
/// - ❌ Compare snapshots (owned by the differ)
/// - ❌ Decide whether a read failure is fatal (owned by `ScanPipeline`)
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Get the most recent baseline snapshot
    ///
    /// Among unexpired snapshots that [`BaselineQuery::matches`], returns
    /// the one with the greatest day key.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Snapshot))`: The baseline
    /// - `Ok(None)`: No baseline exists
    /// - `Err(Error)`: Storage error
    async fn get_previous(&self, query: &BaselineQuery) -> Result<Option<Snapshot>, crate::Error>;

    /// Write the snapshot for its day, replacing any existing one
    ///
    /// Snapshots whose expiry has elapsed at `snapshot.created_at` are
    /// dropped as part of the write.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Durably written
    /// - `Err(Error::Persistence)`: Write failed
    async fn put(&self, snapshot: &Snapshot) -> Result<(), crate::Error>;

    /// Get the stored snapshot for a day, expired or not
    async fn get(&self, date: &DayKey) -> Result<Option<Snapshot>, crate::Error>;

    /// List stored day keys in ascending order
    async fn list_dates(&self) -> Result<Vec<DayKey>, crate::Error>;

    /// Get the store name (for logging/debugging)
    fn store_name(&self) -> &'static str;
}
