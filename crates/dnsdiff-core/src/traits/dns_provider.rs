// # DNS Provider Trait
//
// Defines the read-only interface for enumerating zones and record sets.
//
// ## Implementations
//
// - Cloudflare: `dnsdiff-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use dnsdiff_core::DnsProvider;
//
// let mut cursor = None;
// loop {
//     let page = provider.list_zones(cursor.as_deref()).await?;
//     for zone in page.items { /* ... */ }
//     match page.next {
//         Some(next) => cursor = Some(next),
//         None => break,
//     }
// }
// ```

use async_trait::async_trait;

/// A DNS zone as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    /// Provider-specific zone ID
    pub id: String,
    /// Zone apex domain
    pub name: String,
}

impl Zone {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A record set in provider shape: one name and type, zero or more values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecordSet {
    /// Record type (may be empty if the provider omitted it)
    pub record_type: String,
    /// Record name (may be empty if the provider omitted it)
    pub name: String,
    /// Record values
    pub values: Vec<String>,
}

impl RawRecordSet {
    pub fn new(
        record_type: impl Into<String>,
        name: impl Into<String>,
        values: Vec<String>,
    ) -> Self {
        Self {
            record_type: record_type.into(),
            name: name.into(),
            values,
        }
    }
}

/// One page of a paginated listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// Opaque cursor for the next page, `None` on the last page
    pub next: Option<String>,
}

impl<T> Page<T> {
    /// A page with no continuation
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }

    /// A page followed by another one
    pub fn with_next(items: Vec<T>, next: impl Into<String>) -> Self {
        Self {
            items,
            next: Some(next.into()),
        }
    }
}

/// Trait for DNS provider implementations
///
/// Providers are consumed read-only. Each call is a single request against
/// the provider API; pagination is driven by the caller through the cursor
/// returned in [`Page::next`].
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS API calls to their endpoints only
/// - ✅ Parse provider-specific responses
/// - ✅ Return success or failure
///
/// ## Forbidden Capabilities
/// - ❌ Retry or back off (a failed run is retried by the scheduler)
/// - ❌ Access the snapshot store
/// - ❌ Cache listings between calls
/// - ❌ Drain pages on their own (owned by `Collector`)
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// List one page of zones
    ///
    /// # Parameters
    ///
    /// - `cursor`: `None` for the first page, otherwise the `next` value of
    ///   the previous page
    async fn list_zones(&self, cursor: Option<&str>) -> Result<Page<Zone>, crate::Error>;

    /// List one page of record sets within a zone
    ///
    /// # Parameters
    ///
    /// - `zone_id`: The zone ID returned by [`DnsProvider::list_zones`]
    /// - `cursor`: `None` for the first page, otherwise the `next` value of
    ///   the previous page
    async fn list_record_sets(
        &self,
        zone_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<RawRecordSet>, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
