//! Snapshot comparison
//!
//! Computes the set difference between the current scan and the baseline.
//! Both sides are reduced to ordered sets first, so input order and
//! duplicate entries never affect the result, and output is always in the
//! canonical record order.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::model::Record;

/// Difference between two record collections
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffResult {
    /// Records in the current scan but not in the baseline
    pub added: Vec<Record>,
    /// Records in the baseline but not in the current scan
    pub removed: Vec<Record>,
    /// Current records that also exist in the baseline
    pub unchanged_count: usize,
}

impl DiffResult {
    /// Number of additions plus removals
    pub fn change_count(&self) -> usize {
        self.added.len() + self.removed.len()
    }

    /// Whether nothing changed
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Compare the current records against an optional baseline
///
/// With no baseline every current record is reported as added.
///
/// `unchanged_count` is `|current| - |added|` over the deduplicated current
/// set, which equals the size of the intersection.
pub fn diff(current: &[Record], previous: Option<&[Record]>) -> DiffResult {
    let current: BTreeSet<&Record> = current.iter().collect();

    let Some(previous) = previous else {
        return DiffResult {
            added: current.into_iter().cloned().collect(),
            removed: Vec::new(),
            unchanged_count: 0,
        };
    };

    let previous: BTreeSet<&Record> = previous.iter().collect();

    let added: Vec<Record> = current.difference(&previous).map(|r| (*r).clone()).collect();
    let removed: Vec<Record> = previous.difference(&current).map(|r| (*r).clone()).collect();
    let unchanged_count = current.len() - added.len();

    DiffResult {
        added,
        removed,
        unchanged_count,
    }
}
