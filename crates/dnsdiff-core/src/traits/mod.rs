//! Core traits for the dnsdiff pipeline
//!
//! This module defines the capabilities the pipeline is composed from.
//!
//! - [`DnsProvider`]: Enumerate zones and record sets
//! - [`SnapshotStore`]: Day-partitioned snapshot persistence with expiry
//! - [`Notifier`]: Deliver a rendered report

pub mod dns_provider;
pub mod notifier;
pub mod snapshot_store;

pub use dns_provider::{DnsProvider, Page, RawRecordSet, Zone};
pub use notifier::Notifier;
pub use snapshot_store::{BaselineQuery, SnapshotStore};
