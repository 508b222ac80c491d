// # File Snapshot Store
//
// File-based implementation of SnapshotStore with crash recovery.
//
// ## Purpose
//
// Keeps one snapshot per calendar day across runs so each run can diff
// against the previous one. Snapshots past their expiry are dropped on
// load and on every write.
//
// ## Crash Recovery
//
// - Atomic writes: Uses write-then-rename for atomicity
// - Corruption detection: Validates JSON on load
// - Automatic backup: Keeps .backup of last known good state
// - Recovery: Falls back to backup if corruption detected
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "snapshots": [
//     {
//       "date": "2025-03-10",
//       "created_at": "2025-03-10T06:00:00Z",
//       "expires_at": 1744264800,
//       "records": [{ "type": "A", "name": "example.com", "value": "1.1.1.1" }]
//     }
//   ]
// }
// ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::Error;
use crate::model::{DayKey, Snapshot};
use crate::traits::snapshot_store::{BaselineQuery, SnapshotStore};

/// Snapshot file format version
const SNAPSHOT_FILE_VERSION: &str = "1.0";

/// File-based snapshot store with crash recovery
///
/// All snapshots live in one JSON document which is rewritten atomically on
/// every `put`.
///
/// # Example
///
/// ```rust,no_run
/// use dnsdiff_core::state::FileSnapshotStore;
/// use dnsdiff_core::traits::SnapshotStore;
/// use dnsdiff_core::model::Snapshot;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileSnapshotStore::open("/var/lib/dnsdiff/snapshots.json").await?;
///
///     let snapshot = Snapshot::new(Vec::new(), chrono::Utc::now(), chrono::Duration::days(30));
///     store.put(&snapshot).await?;
///
///     assert!(store.get(&snapshot.date).await?.is_some());
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileSnapshotStore {
    path: PathBuf,
    snapshots: Arc<RwLock<BTreeMap<DayKey, Snapshot>>>,
}

/// Serializable snapshot file format
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct SnapshotFileFormat {
    version: String,
    snapshots: Vec<Snapshot>,
}

impl FileSnapshotStore {
    /// Open or create a file snapshot store
    ///
    /// This will:
    /// 1. Create parent directories if needed
    /// 2. Try to load the existing snapshot file
    /// 3. If corruption detected, try to load from backup
    /// 4. If both fail, start empty
    /// 5. Drop snapshots that have already expired
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::config(format!(
                    "Failed to create snapshot directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let mut snapshots = Self::load_with_recovery(&path).await?;

        let now = Utc::now();
        let before = snapshots.len();
        snapshots.retain(|_, snapshot| !snapshot.is_expired(now));
        if snapshots.len() < before {
            tracing::debug!(
                "Dropped {} expired snapshot(s) on load",
                before - snapshots.len()
            );
        }

        Ok(Self {
            path,
            snapshots: Arc::new(RwLock::new(snapshots)),
        })
    }

    /// Load snapshots with automatic recovery
    ///
    /// Recovery strategy:
    /// 1. Try to load the main file
    /// 2. If it does not parse, try loading the backup
    /// 3. If the backup also fails, start empty
    async fn load_with_recovery(path: &Path) -> Result<BTreeMap<DayKey, Snapshot>, Error> {
        match Self::load(path).await {
            Ok(snapshots) => {
                tracing::debug!("Loaded {} snapshot(s) from file", snapshots.len());
                Ok(snapshots)
            }
            Err(Error::Json(e)) => {
                tracing::warn!(
                    "Snapshot file appears corrupted: {}. Attempting recovery from backup.",
                    e
                );

                let backup_path = Self::backup_path(path);
                if !backup_path.exists() {
                    tracing::warn!("No backup file found. Starting with no snapshots.");
                    return Ok(BTreeMap::new());
                }

                match Self::load(&backup_path).await {
                    Ok(snapshots) => {
                        tracing::info!("Recovered {} snapshot(s) from backup", snapshots.len());

                        if let Err(restore_err) = fs::copy(&backup_path, path).await {
                            tracing::error!(
                                "Failed to restore snapshot file from backup: {}",
                                restore_err
                            );
                        }

                        Ok(snapshots)
                    }
                    Err(backup_err) => {
                        tracing::error!(
                            "Backup also unreadable: {}. Starting with no snapshots.",
                            backup_err
                        );
                        Ok(BTreeMap::new())
                    }
                }
            }
            Err(other) => Err(other),
        }
    }

    /// Load snapshots from a file
    ///
    /// Parse failures are returned as `Error::Json`; read failures as
    /// `Error::Persistence`.
    async fn load(path: &Path) -> Result<BTreeMap<DayKey, Snapshot>, Error> {
        if !path.exists() {
            tracing::debug!("Snapshot file does not exist: {}", path.display());
            return Ok(BTreeMap::new());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::persistence(format!(
                "Failed to read snapshot file {}: {}",
                path.display(),
                e
            ))
        })?;

        let file: SnapshotFileFormat = serde_json::from_str(&content)?;

        if file.version != SNAPSHOT_FILE_VERSION {
            tracing::warn!(
                "Snapshot file version mismatch: expected {}, got {}. \
                Attempting to load anyway.",
                SNAPSHOT_FILE_VERSION,
                file.version
            );
        }

        Ok(file
            .snapshots
            .into_iter()
            .map(|snapshot| (snapshot.date, snapshot))
            .collect())
    }

    /// Write all snapshots to file atomically
    async fn write(&self, snapshots: &BTreeMap<DayKey, Snapshot>) -> Result<(), Error> {
        let file = SnapshotFileFormat {
            version: SNAPSHOT_FILE_VERSION.to_string(),
            snapshots: snapshots.values().cloned().collect(),
        };

        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| Error::persistence(format!("Failed to serialize snapshots: {}", e)))?;

        let temp_path = self.temp_path();
        {
            let mut temp = fs::File::create(&temp_path).await.map_err(|e| {
                Error::persistence(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            temp.write_all(json.as_bytes()).await.map_err(|e| {
                Error::persistence(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            temp.sync_all().await.map_err(|e| {
                Error::persistence(format!(
                    "Failed to sync temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        if self.path.exists() {
            let backup_path = Self::backup_path(&self.path);
            if let Err(e) = fs::copy(&self.path, &backup_path).await {
                tracing::warn!("Failed to create backup: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::persistence(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("Snapshots written to file: {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn get_previous(&self, query: &BaselineQuery) -> Result<Option<Snapshot>, Error> {
        let guard = self.snapshots.read().await;
        Ok(guard
            .values()
            .rev()
            .find(|snapshot| query.matches(snapshot))
            .cloned())
    }

    async fn put(&self, snapshot: &Snapshot) -> Result<(), Error> {
        // Write lock held through the file write so concurrent puts serialize
        let mut guard = self.snapshots.write().await;

        let mut next = guard.clone();
        next.retain(|_, stored| !stored.is_expired(snapshot.created_at));
        next.insert(snapshot.date, snapshot.clone());

        self.write(&next).await?;
        *guard = next;

        tracing::debug!(
            "Stored snapshot {} with {} record(s)",
            snapshot.date,
            snapshot.records.len()
        );
        Ok(())
    }

    async fn get(&self, date: &DayKey) -> Result<Option<Snapshot>, Error> {
        let guard = self.snapshots.read().await;
        Ok(guard.get(date).cloned())
    }

    async fn list_dates(&self) -> Result<Vec<DayKey>, Error> {
        let guard = self.snapshots.read().await;
        Ok(guard.keys().copied().collect())
    }

    fn store_name(&self) -> &'static str {
        "file"
    }
}
