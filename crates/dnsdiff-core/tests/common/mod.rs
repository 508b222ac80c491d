//! Test doubles and common utilities for pipeline contract tests
//!
//! The doubles record every call so tests can assert how often each
//! external collaborator was touched during a run.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use dnsdiff_core::error::{Error, Result};
use dnsdiff_core::model::{DayKey, Record, Snapshot};
use dnsdiff_core::report::{Message, Reporter};
use dnsdiff_core::traits::{
    BaselineQuery, DnsProvider, Notifier, Page, RawRecordSet, SnapshotStore, Zone,
};
use dnsdiff_core::{Collector, MemorySnapshotStore, PipelineEvent, ScanConfig, ScanPipeline};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// A DnsProvider that serves fixed zones and record-set pages
#[derive(Default)]
pub struct ScriptedProvider {
    zones: Vec<Zone>,
    zone_page_size: usize,
    record_pages: HashMap<String, Vec<Vec<RawRecordSet>>>,
    zone_listing_error: Option<String>,
    failing_zone: Option<String>,
    zone_calls: Arc<AtomicUsize>,
    record_calls: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    delay_ms: u64,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            zone_page_size: 100,
            ..Self::default()
        }
    }

    /// Add a zone whose record sets are served as the given pages
    pub fn zone(mut self, id: &str, name: &str, pages: Vec<Vec<RawRecordSet>>) -> Self {
        self.zones.push(Zone::new(id, name));
        self.record_pages.insert(id.to_string(), pages);
        self
    }

    /// Serve zones `size` at a time
    pub fn zone_page_size(mut self, size: usize) -> Self {
        self.zone_page_size = size.max(1);
        self
    }

    /// Fail every zone listing call
    pub fn failing_zone_listing(self) -> Self {
        self.failing_zone_listing_with("zone listing unavailable")
    }

    /// Fail every zone listing call with `message`
    pub fn failing_zone_listing_with(mut self, message: impl Into<String>) -> Self {
        self.zone_listing_error = Some(message.into());
        self
    }

    /// Fail record-set listing for one zone
    pub fn failing_zone(mut self, id: &str) -> Self {
        self.failing_zone = Some(id.to_string());
        self
    }

    /// Sleep inside each record-set call
    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn zone_calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.zone_calls)
    }

    pub fn record_calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.record_calls)
    }

    pub fn max_in_flight(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.max_in_flight)
    }
}

fn page_index(cursor: Option<&str>) -> usize {
    cursor.map(|c| c.parse().expect("numeric cursor")).unwrap_or(0)
}

fn page_of<T: Clone>(pages: &[Vec<T>], index: usize) -> Page<T> {
    let items = pages.get(index).cloned().unwrap_or_default();
    if index + 1 < pages.len() {
        Page::with_next(items, (index + 1).to_string())
    } else {
        Page::last(items)
    }
}

#[async_trait]
impl DnsProvider for ScriptedProvider {
    async fn list_zones(&self, cursor: Option<&str>) -> Result<Page<Zone>> {
        self.zone_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.zone_listing_error {
            return Err(Error::provider("scripted", message.clone()));
        }

        let pages: Vec<Vec<Zone>> = self
            .zones
            .chunks(self.zone_page_size)
            .map(|chunk| chunk.to_vec())
            .collect();
        Ok(page_of(&pages, page_index(cursor)))
    }

    async fn list_record_sets(
        &self,
        zone_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<RawRecordSet>> {
        self.record_calls.fetch_add(1, Ordering::SeqCst);
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);

        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_zone.as_deref() == Some(zone_id) {
            return Err(Error::provider("scripted", format!("zone {} unavailable", zone_id)));
        }

        let pages = self.record_pages.get(zone_id).cloned().unwrap_or_default();
        Ok(page_of(&pages, page_index(cursor)))
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

/// A Notifier that records every delivered message
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    messages: Arc<Mutex<Vec<Message>>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose destination rejects every message
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Messages handed to deliver(), including rejected ones
    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn deliver(&self, message: &Message) -> Result<()> {
        self.messages.lock().unwrap().push(message.clone());
        if self.fail {
            return Err(Error::delivery("webhook returned 500 Internal Server Error"));
        }
        Ok(())
    }

    fn notifier_name(&self) -> &'static str {
        "recording"
    }
}

/// A SnapshotStore wrapper that can fail reads or writes
#[derive(Clone, Default)]
pub struct FlakyStore {
    inner: MemorySnapshotStore,
    fail_reads: bool,
    fail_writes: bool,
    reads: Arc<AtomicUsize>,
    writes: Arc<AtomicUsize>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotStore for FlakyStore {
    async fn get_previous(&self, query: &BaselineQuery) -> Result<Option<Snapshot>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads {
            return Err(Error::persistence("table unavailable"));
        }
        self.inner.get_previous(query).await
    }

    async fn put(&self, snapshot: &Snapshot) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(Error::persistence("write throttled"));
        }
        self.inner.put(snapshot).await
    }

    async fn get(&self, date: &DayKey) -> Result<Option<Snapshot>> {
        self.inner.get(date).await
    }

    async fn list_dates(&self) -> Result<Vec<DayKey>> {
        self.inner.list_dates().await
    }

    fn store_name(&self) -> &'static str {
        "flaky"
    }
}

/// Record set with one value
pub fn set(record_type: &str, name: &str, value: &str) -> RawRecordSet {
    RawRecordSet::new(record_type, name, vec![value.to_string()])
}

pub fn record(record_type: &str, name: &str, value: &str) -> Record {
    Record::new(record_type, name, value)
}

/// 06:00 UTC on the given day of March 2025
pub fn march(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, day, 6, 0, 0).unwrap()
}

/// Build a pipeline over the given doubles
pub fn pipeline(
    provider: ScriptedProvider,
    store: Arc<dyn SnapshotStore>,
    notifier: &RecordingNotifier,
) -> (ScanPipeline, mpsc::Receiver<PipelineEvent>) {
    let scan = ScanConfig::default();
    let collector = Collector::new(Arc::new(provider), scan.max_concurrent_zone_fetches);
    let reporter = Reporter::new(Box::new(notifier.clone()));
    ScanPipeline::new(collector, store, reporter, scan).expect("pipeline construction succeeds")
}

/// Drain every event currently buffered
pub fn drain_events(rx: &mut mpsc::Receiver<PipelineEvent>) -> Vec<PipelineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
