// # Memory Snapshot Store
//
// In-memory implementation of SnapshotStore.
//
// ## Purpose
//
// Provides a simple, fast snapshot store that doesn't persist across
// restarts. Every process start has no baseline, so the first report lists
// all records as new.
//
// ## When to Use
//
// - Testing environments
// - Dry runs against a new provider account

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::Error;
use crate::model::{DayKey, Snapshot};
use crate::traits::snapshot_store::{BaselineQuery, SnapshotStore};

/// In-memory snapshot store implementation
///
/// Snapshots are kept in a `BTreeMap` keyed by day, protected by a RwLock.
///
/// # Example
///
/// ```rust,no_run
/// use dnsdiff_core::state::MemorySnapshotStore;
/// use dnsdiff_core::traits::{BaselineQuery, SnapshotStore};
/// use dnsdiff_core::model::Snapshot;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemorySnapshotStore::new();
///     let now = chrono::Utc::now();
///
///     store.put(&Snapshot::new(Vec::new(), now, chrono::Duration::days(30))).await?;
///
///     let query = BaselineQuery::new(now + chrono::Duration::days(1), chrono::Duration::minutes(5));
///     assert!(store.get_previous(&query).await?.is_some());
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    inner: Arc<RwLock<BTreeMap<DayKey, Snapshot>>>,
}

impl MemorySnapshotStore {
    /// Create a new empty memory snapshot store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of stored snapshots
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn get_previous(&self, query: &BaselineQuery) -> Result<Option<Snapshot>, Error> {
        let guard = self.inner.read().await;
        Ok(guard
            .values()
            .rev()
            .find(|snapshot| query.matches(snapshot))
            .cloned())
    }

    async fn put(&self, snapshot: &Snapshot) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.retain(|_, stored| !stored.is_expired(snapshot.created_at));
        guard.insert(snapshot.date, snapshot.clone());
        Ok(())
    }

    async fn get(&self, date: &DayKey) -> Result<Option<Snapshot>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.get(date).cloned())
    }

    async fn list_dates(&self) -> Result<Vec<DayKey>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.keys().copied().collect())
    }

    fn store_name(&self) -> &'static str {
        "memory"
    }
}
