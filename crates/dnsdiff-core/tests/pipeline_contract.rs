//! Architectural Contract Test: Scan Pipeline
//!
//! Constraints verified:
//! - Each run delivers exactly one report: the change report on success,
//!   one failure report otherwise
//! - A delivery failure is not followed by a second delivery
//! - A baseline read failure degrades to "no baseline" instead of failing
//! - A snapshot write failure fails the run
//! - The collector drains every page and bounds concurrent zone fetches
//!
//! If this test fails, the run no longer reports reliably.

mod common;

use common::*;
use dnsdiff_core::model::DayKey;
use dnsdiff_core::report::{Block, SECTION_TEXT_LIMIT};
use dnsdiff_core::traits::SnapshotStore;
use dnsdiff_core::{
    Collector, Error, MemorySnapshotStore, PipelineEvent, Reporter, ScanConfig, ScanPipeline, Stage,
};
use std::sync::Arc;
use std::sync::atomic::Ordering;

fn example_provider() -> ScriptedProvider {
    ScriptedProvider::new().zone(
        "zone-1",
        "example.com",
        vec![vec![
            set("A", "example.com", "1.1.1.1"),
            set("CNAME", "www.example.com", "example.com"),
        ]],
    )
}

#[tokio::test]
async fn first_run_reports_everything_as_new() {
    let store = Arc::new(MemorySnapshotStore::new());
    let notifier = RecordingNotifier::new();
    let (pipeline, _events) = pipeline(example_provider(), store.clone(), &notifier);

    let outcome = pipeline.run_at(march(10)).await.expect("run succeeds");

    assert_eq!(outcome.status_code, 200);
    assert_eq!(outcome.total_records, 2);
    assert_eq!(outcome.diff.added.len(), 2);
    assert_eq!(outcome.diff.unchanged_count, 0);

    let messages = notifier.messages();
    assert_eq!(messages.len(), 1, "exactly one report per run");
    assert!(matches!(messages[0].blocks[0], Block::Header { .. }));
    assert!(messages[0].text().contains("⚠️*New Records:*"));

    let stored = store.get(&DayKey::of(march(10))).await.unwrap().unwrap();
    assert_eq!(stored.records.len(), 2);
}

#[tokio::test]
async fn second_day_diffs_against_first() {
    let store: Arc<dyn SnapshotStore> = Arc::new(MemorySnapshotStore::new());

    let day_one = ScriptedProvider::new().zone(
        "zone-1",
        "example.com",
        vec![vec![set("A", "example.com", "1.1.1.1")]],
    );
    let notifier = RecordingNotifier::new();
    let (pipeline_one, _events) = pipeline(day_one, store.clone(), &notifier);
    pipeline_one.run_at(march(10)).await.expect("day one succeeds");

    let notifier = RecordingNotifier::new();
    let (pipeline_two, _events) = pipeline(example_provider(), store.clone(), &notifier);
    let outcome = pipeline_two.run_at(march(11)).await.expect("day two succeeds");

    assert_eq!(
        outcome.diff.added,
        vec![record("CNAME", "www.example.com", "example.com")]
    );
    assert!(outcome.diff.removed.is_empty());
    assert_eq!(outcome.diff.unchanged_count, 1);

    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    let text = messages[0].text();
    assert!(text.contains("Total Records: 2"));
    assert!(text.contains("Additions/Deletions: 1"));
    assert!(text.contains("Unchanged Records: 1"));
    assert!(text.contains("Domain: www.example.com\nType: CNAME\nValue: example.com"));
    assert!(!text.contains("Removed Records"));
}

#[tokio::test]
async fn collector_failure_reports_error_once_and_fails_run() {
    let store = FlakyStore::new();
    let notifier = RecordingNotifier::new();
    let provider = example_provider().failing_zone_listing();
    let (pipeline, mut events) = pipeline(provider, Arc::new(store.clone()), &notifier);

    let err = pipeline.run_at(march(10)).await.unwrap_err();
    assert!(matches!(err, Error::Upstream(_)));

    let messages = notifier.messages();
    assert_eq!(messages.len(), 1, "exactly one failure report");
    assert_eq!(messages[0].blocks.len(), 1);
    assert!(messages[0].text().starts_with("❌ Error in daily DNS scan:"));
    assert!(messages[0].text().contains("zone listing unavailable"));

    assert_eq!(store.reads(), 0, "no stage after collecting runs");
    assert_eq!(store.writes(), 0);

    let events = drain_events(&mut events);
    assert!(events.contains(&PipelineEvent::Failed {
        stage: Stage::Collecting,
        error: err.to_string(),
        failure_reported: true,
    }));
}

#[tokio::test]
async fn failing_zone_aborts_collection() {
    let provider = ScriptedProvider::new()
        .zone("zone-1", "example.com", vec![vec![set("A", "example.com", "1.1.1.1")]])
        .zone("zone-2", "example.org", vec![vec![set("A", "example.org", "2.2.2.2")]])
        .failing_zone("zone-2");
    let store = Arc::new(MemorySnapshotStore::new());
    let notifier = RecordingNotifier::new();
    let (pipeline, _events) = pipeline(provider, store.clone(), &notifier);

    let err = pipeline.run_at(march(10)).await.unwrap_err();
    assert!(matches!(err, Error::Upstream(_)));
    assert!(err.to_string().contains("example.org"));

    assert!(store.is_empty().await, "partial listing is never persisted");
    assert_eq!(notifier.messages().len(), 1);
}

#[tokio::test]
async fn baseline_read_failure_degrades_to_all_added() {
    let store = FlakyStore::new().failing_reads();
    let notifier = RecordingNotifier::new();
    let (pipeline, mut events) = pipeline(example_provider(), Arc::new(store.clone()), &notifier);

    let outcome = pipeline.run_at(march(10)).await.expect("run succeeds");

    assert_eq!(outcome.diff.added.len(), 2);
    assert!(outcome.diff.removed.is_empty());
    assert_eq!(store.reads(), 1, "read is not retried");
    assert_eq!(store.writes(), 1);

    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].text().contains("New Records"));

    let events = drain_events(&mut events);
    assert!(
        events
            .iter()
            .any(|e| matches!(e, PipelineEvent::BaselineUnavailable { .. }))
    );
}

#[tokio::test]
async fn persistence_failure_reports_error_and_fails_run() {
    let store = FlakyStore::new().failing_writes();
    let notifier = RecordingNotifier::new();
    let (pipeline, _events) = pipeline(example_provider(), Arc::new(store.clone()), &notifier);

    let err = pipeline.run_at(march(10)).await.unwrap_err();
    assert!(matches!(err, Error::Persistence(_)));
    assert_eq!(store.writes(), 1);

    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].text().contains("write throttled"));
    assert!(!messages[0].text().contains("New Records"));
}

#[tokio::test]
async fn delivery_failure_is_not_retried() {
    let store = Arc::new(MemorySnapshotStore::new());
    let notifier = RecordingNotifier::failing();
    let (pipeline, mut events) = pipeline(example_provider(), store.clone(), &notifier);

    let err = pipeline.run_at(march(10)).await.unwrap_err();
    assert!(matches!(err, Error::Delivery(_)));

    let messages = notifier.messages();
    assert_eq!(messages.len(), 1, "only the change report was attempted");
    assert!(messages[0].text().contains("New Records"));

    // The snapshot was written before reporting
    assert_eq!(store.len().await, 1);

    let events = drain_events(&mut events);
    assert!(events.contains(&PipelineEvent::Failed {
        stage: Stage::Reporting,
        error: err.to_string(),
        failure_reported: false,
    }));
}

#[tokio::test]
async fn failure_report_delivery_failure_keeps_original_error() {
    let notifier = RecordingNotifier::failing();
    let provider = example_provider().failing_zone_listing();
    let (pipeline, _events) = pipeline(provider, Arc::new(MemorySnapshotStore::new()), &notifier);

    let err = pipeline.run_at(march(10)).await.unwrap_err();
    assert!(matches!(err, Error::Upstream(_)));
    assert_eq!(notifier.messages().len(), 1);
}

#[tokio::test]
async fn stages_run_in_order() {
    let notifier = RecordingNotifier::new();
    let (pipeline, mut events) =
        pipeline(example_provider(), Arc::new(MemorySnapshotStore::new()), &notifier);

    pipeline.run_at(march(10)).await.expect("run succeeds");

    let stages: Vec<Stage> = drain_events(&mut events)
        .into_iter()
        .filter_map(|e| match e {
            PipelineEvent::StageEntered { stage } => Some(stage),
            _ => None,
        })
        .collect();
    assert_eq!(
        stages,
        vec![
            Stage::Collecting,
            Stage::LoadingBaseline,
            Stage::Persisting,
            Stage::Diffing,
            Stage::Reporting,
            Stage::Done,
        ]
    );
}

#[tokio::test]
async fn collector_drains_all_pages() {
    let provider = ScriptedProvider::new()
        .zone_page_size(1)
        .zone(
            "zone-1",
            "example.com",
            vec![
                vec![set("A", "example.com", "1.1.1.1")],
                vec![set("A", "a.example.com", "1.1.1.2")],
                vec![set("A", "b.example.com", "1.1.1.3")],
            ],
        )
        .zone(
            "zone-2",
            "example.org",
            vec![
                vec![set("MX", "example.org", "10 mx.example.org")],
                vec![dnsdiff_core::traits::RawRecordSet::new("NS", "example.org", Vec::new())],
            ],
        );
    let zone_calls = provider.zone_calls();
    let record_calls = provider.record_calls();

    let records = Collector::new(Arc::new(provider), 2)
        .collect()
        .await
        .expect("collection succeeds");

    assert_eq!(
        records,
        vec![
            record("A", "example.com", "1.1.1.1"),
            record("A", "a.example.com", "1.1.1.2"),
            record("A", "b.example.com", "1.1.1.3"),
            record("MX", "example.org", "10 mx.example.org"),
            record("NS", "example.org", "N/A"),
        ]
    );
    assert_eq!(zone_calls.load(Ordering::SeqCst), 2);
    assert_eq!(record_calls.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn collector_bounds_concurrent_zone_fetches() {
    let mut provider = ScriptedProvider::new().with_delay_ms(20);
    for i in 0..6 {
        provider = provider.zone(
            &format!("zone-{}", i),
            &format!("example{}.com", i),
            vec![vec![set("A", &format!("example{}.com", i), "1.1.1.1")]],
        );
    }
    let max_in_flight = provider.max_in_flight();

    let records = Collector::new(Arc::new(provider), 2)
        .collect()
        .await
        .expect("collection succeeds");

    assert_eq!(records.len(), 6);
    assert!(max_in_flight.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn collector_deduplicates_across_zones() {
    let provider = ScriptedProvider::new()
        .zone("zone-1", "example.com", vec![vec![set("A", "shared.example.com", "1.1.1.1")]])
        .zone("zone-2", "example.com", vec![vec![set("A", "shared.example.com", "1.1.1.1")]]);

    let records = Collector::new(Arc::new(provider), 1)
        .collect()
        .await
        .expect("collection succeeds");

    assert_eq!(records, vec![record("A", "shared.example.com", "1.1.1.1")]);
}

#[tokio::test]
async fn out_of_range_scan_settings_fail_at_construction() {
    let notifier = RecordingNotifier::new();

    for scan in [
        ScanConfig {
            retention_days: 4_000_000_000,
            ..ScanConfig::default()
        },
        ScanConfig {
            skew_margin_secs: 10_u64.pow(16),
            ..ScanConfig::default()
        },
    ] {
        let collector = Collector::new(Arc::new(example_provider()), 1);
        let reporter = Reporter::new(Box::new(notifier.clone()));
        let store: Arc<dyn SnapshotStore> = Arc::new(MemorySnapshotStore::new());

        let err = ScanPipeline::new(collector, store, reporter, scan).err().unwrap();
        assert!(err.is_config());
    }

    assert!(notifier.messages().is_empty());
}

#[tokio::test]
async fn oversized_error_still_produces_deliverable_failure_report() {
    let notifier = RecordingNotifier::new();
    let gateway_page = format!("<html>{}</html>", "<p>502 Bad Gateway</p>".repeat(400));
    let provider = example_provider().failing_zone_listing_with(gateway_page);
    let (pipeline, _events) = pipeline(provider, Arc::new(MemorySnapshotStore::new()), &notifier);

    let err = pipeline.run_at(march(10)).await.unwrap_err();
    assert!(matches!(err, Error::Upstream(_)));

    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    let text = messages[0].text();
    assert!(text.chars().count() <= SECTION_TEXT_LIMIT);
    assert!(text.starts_with("❌ Error in daily DNS scan:"));
    assert!(text.ends_with("…```"));
}
