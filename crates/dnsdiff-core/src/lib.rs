// # dnsdiff-core
//
// Core library for the DNS snapshot-diff-notify pipeline.
//
// ## Architecture Overview
//
// This library provides the core functionality for daily DNS change reports:
// - **DnsProvider**: Trait for enumerating zones and record sets
// - **SnapshotStore**: Trait for day-partitioned snapshot persistence
// - **Notifier**: Trait for delivering a rendered report
// - **Collector**: Drains the provider into the record model
// - **diff**: Set difference between the current scan and the baseline
// - **Reporter**: Renders the difference into a chat message and delivers it
// - **ScanPipeline**: Sequences the above for one scheduled run
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from integrations
// 2. **Explicit Wiring**: Components are built from config and passed in
// 3. **Completeness**: A partial listing is an error, never a snapshot
// 4. **Library-First**: All core functionality can be used as a library
// 5. **One Report Per Run**: Success or failure, never both

pub mod collector;
pub mod config;
pub mod diff;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod state;
pub mod traits;

// Re-export core types for convenience
pub use collector::Collector;
pub use config::{DnsDiffConfig, NotifierConfig, ProviderConfig, ScanConfig, SnapshotStoreConfig};
pub use diff::{DiffResult, diff};
pub use error::{Error, Result};
pub use model::{DayKey, Record, Snapshot};
pub use pipeline::{PipelineEvent, ScanOutcome, ScanPipeline, Stage};
pub use report::{Block, Message, Reporter};
pub use state::{FileSnapshotStore, MemorySnapshotStore};
pub use traits::{DnsProvider, Notifier, SnapshotStore};
