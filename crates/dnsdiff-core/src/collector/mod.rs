//! Record collection
//!
//! The Collector enumerates every zone the provider exposes, drains the
//! record-set pages of each zone and flattens the result into the record
//! model. A partial listing is never returned: the differ would read every
//! missing record as removed.
//!
//! ## Flow
//!
//! ```text
//! list_zones (all pages)
//!        │
//!        ├── zone 1 ── list_record_sets (all pages) ──┐
//!        ├── zone 2 ── list_record_sets (all pages) ──┤  bounded by a semaphore
//!        └── zone n ── list_record_sets (all pages) ──┘
//!                                                     ▼
//!                                       normalize + dedup, in zone order
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::{MISSING_VALUE, Record, UNKNOWN_FIELD};
use crate::traits::{DnsProvider, RawRecordSet, Zone};

/// Gathers the full current record set from a DNS provider
pub struct Collector {
    /// Provider to enumerate
    provider: Arc<dyn DnsProvider>,

    /// Upper bound on zones fetched at once
    max_concurrent_zone_fetches: usize,
}

impl Collector {
    /// Create a new collector
    ///
    /// `max_concurrent_zone_fetches` is clamped to at least 1 (sequential).
    pub fn new(provider: Arc<dyn DnsProvider>, max_concurrent_zone_fetches: usize) -> Self {
        Self {
            provider,
            max_concurrent_zone_fetches: max_concurrent_zone_fetches.max(1),
        }
    }

    /// Collect every record across every zone
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<Record>)`: Deduplicated records, zone order preserved
    /// - `Err(Error::Upstream)`: Any listing call failed
    pub async fn collect(&self) -> Result<Vec<Record>> {
        let zones = self.list_all_zones().await?;
        info!(
            "Listing record sets for {} zone(s) via {}",
            zones.len(),
            self.provider.provider_name()
        );

        let per_zone = self.fetch_all_record_sets(zones).await?;

        let mut seen = HashSet::new();
        let mut records = Vec::new();
        for record in per_zone.into_iter().flatten().flat_map(normalize) {
            if seen.insert(record.clone()) {
                records.push(record);
            }
        }

        info!("Collected {} record(s)", records.len());
        Ok(records)
    }

    async fn list_all_zones(&self) -> Result<Vec<Zone>> {
        let mut zones = Vec::new();
        let mut cursor: Option<String> = None;
        let mut seen = HashSet::new();

        loop {
            let page = self
                .provider
                .list_zones(cursor.as_deref())
                .await
                .map_err(|e| upstream("Failed to list zones", e))?;

            debug!("Zone page returned {} zone(s)", page.items.len());
            zones.extend(page.items);

            match page.next {
                Some(next) if !seen.insert(next.clone()) => {
                    return Err(Error::upstream(format!(
                        "Zone pagination returned cursor {} twice",
                        next
                    )));
                }
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(zones)
    }

    async fn fetch_all_record_sets(&self, zones: Vec<Zone>) -> Result<Vec<Vec<RawRecordSet>>> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_zone_fetches));
        let mut tasks = JoinSet::new();
        let zone_count = zones.len();

        for (index, zone) in zones.into_iter().enumerate() {
            let provider = Arc::clone(&self.provider);
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| Error::upstream(format!("Zone fetch limiter closed: {}", e)))?;
                let sets = list_zone_record_sets(provider.as_ref(), &zone).await?;
                Ok::<_, Error>((index, sets))
            });
        }

        let mut results: Vec<Vec<RawRecordSet>> = vec![Vec::new(); zone_count];
        // Returning early drops the JoinSet, which aborts the remaining fetches
        while let Some(joined) = tasks.join_next().await {
            let (index, sets) = joined
                .map_err(|e| Error::upstream(format!("Zone fetch task failed: {}", e)))??;
            results[index] = sets;
        }

        Ok(results)
    }
}

/// Drain every record-set page of one zone
async fn list_zone_record_sets(provider: &dyn DnsProvider, zone: &Zone) -> Result<Vec<RawRecordSet>> {
    let mut sets = Vec::new();
    let mut cursor: Option<String> = None;
    let mut seen = HashSet::new();

    loop {
        let page = provider
            .list_record_sets(&zone.id, cursor.as_deref())
            .await
            .map_err(|e| {
                upstream(
                    &format!("Failed to list record sets for zone {} ({})", zone.name, zone.id),
                    e,
                )
            })?;

        sets.extend(page.items);

        match page.next {
            Some(next) if !seen.insert(next.clone()) => {
                return Err(Error::upstream(format!(
                    "Record pagination for zone {} returned cursor {} twice",
                    zone.name, next
                )));
            }
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    debug!("Zone {} has {} record set(s)", zone.name, sets.len());
    Ok(sets)
}

/// Normalize a provider record set into one record per value
///
/// A set without values yields a single record valued [`MISSING_VALUE`];
/// an empty type or name becomes [`UNKNOWN_FIELD`].
pub fn normalize(set: RawRecordSet) -> Vec<Record> {
    let record_type = non_empty_or(set.record_type, UNKNOWN_FIELD);
    let name = non_empty_or(set.name, UNKNOWN_FIELD);

    if set.values.is_empty() {
        return vec![Record::new(record_type, name, MISSING_VALUE)];
    }

    set.values
        .into_iter()
        .map(|value| Record::new(record_type.clone(), name.clone(), non_empty_or(value, MISSING_VALUE)))
        .collect()
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

fn upstream(context: &str, err: Error) -> Error {
    match err {
        Error::Upstream(msg) => Error::upstream(format!("{}: {}", context, msg)),
        other => Error::upstream(format!("{}: {}", context, other)),
    }
}
