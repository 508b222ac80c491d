//! Record model
//!
//! Canonical representation of a DNS record and the snapshot that holds a
//! full scan of them.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Value substituted when a record set carries no values
pub const MISSING_VALUE: &str = "N/A";

/// Value substituted when a record set has no type or name
pub const UNKNOWN_FIELD: &str = "UNKNOWN";

/// A single DNS record
///
/// Identity is the `(type, name, value)` tuple, compared case-sensitively.
/// Records order canonically by the concatenation `type + name + value`;
/// ties on the concatenation fall back to the tuple so that `Ord` agrees
/// with `Eq`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    /// Record type (e.g. "A", "CNAME")
    #[serde(rename = "type")]
    pub record_type: String,
    /// Fully qualified record name
    pub name: String,
    /// Record value
    pub value: String,
}

impl Record {
    /// Create a new record
    pub fn new(
        record_type: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            record_type: record_type.into(),
            name: name.into(),
            value: value.into(),
        }
    }

    fn key_bytes(&self) -> impl Iterator<Item = u8> + '_ {
        self.record_type
            .bytes()
            .chain(self.name.bytes())
            .chain(self.value.bytes())
    }
}

impl Ord for Record {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key_bytes().cmp(other.key_bytes()).then_with(|| {
            (&self.record_type, &self.name, &self.value).cmp(&(
                &other.record_type,
                &other.name,
                &other.value,
            ))
        })
    }
}

impl PartialOrd for Record {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.record_type, self.name, self.value)
    }
}

/// Calendar day (UTC) used as the snapshot key, rendered `YYYY-MM-DD`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DayKey(NaiveDate);

impl DayKey {
    /// Derive the day key of an instant
    pub fn of(instant: DateTime<Utc>) -> Self {
        Self(instant.date_naive())
    }

    /// Build a day key from a date
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Parse a `YYYY-MM-DD` key
    pub fn parse(key: &str) -> Result<Self, crate::Error> {
        NaiveDate::parse_from_str(key, "%Y-%m-%d")
            .map(Self)
            .map_err(|e| crate::Error::invalid_input(format!("Invalid day key '{}': {}", key, e)))
    }

    /// The underlying date
    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// A full record scan stored under one calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Day key the snapshot is stored under
    pub date: DayKey,
    /// When the scan was taken
    pub created_at: DateTime<Utc>,
    /// Expiry as epoch seconds; the store drops the snapshot after this
    pub expires_at: i64,
    /// Records captured by the scan
    pub records: Vec<Record>,
}

impl Snapshot {
    /// Build the snapshot for a scan taken at `created_at`
    ///
    /// The day key is derived from `created_at` and the expiry is
    /// `created_at + retention`.
    pub fn new(records: Vec<Record>, created_at: DateTime<Utc>, retention: Duration) -> Self {
        Self {
            date: DayKey::of(created_at),
            created_at,
            expires_at: (created_at + retention).timestamp(),
            records,
        }
    }

    /// Whether the retention window has elapsed at `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.expires_at
    }
}
