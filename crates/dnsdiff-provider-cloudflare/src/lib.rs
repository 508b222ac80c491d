// # Cloudflare DNS Provider
//
// Read-only Cloudflare implementation of the `DnsProvider` trait.
//
// ## Implementation Status
//
// - ✅ Zone listing with page/per_page pagination
// - ✅ DNS record listing per zone with page/per_page pagination
// - ✅ Optional account filter for zone listing
// - ✅ HTTP timeout configured (30 seconds)
// - ✅ Specific error handling for HTTP status codes (401, 403, 404, 429, 5xx)
// - ❌ NO retry logic (a failed listing fails the run)
// - ❌ NO caching (every run reads the live zone state)
// - ❌ NO write calls
//
// ## Trust Level: Untrusted (DNS Provider)
//
// **Allowed Capabilities**:
// - ✅ Perform HTTP/HTTPS API calls to the Cloudflare API only
// - ✅ Parse provider-specific responses
//
// **Forbidden Capabilities**:
// - ❌ Spawn tasks or threads (the Collector owns concurrency)
// - ❌ Implement retry logic
// - ❌ Access the snapshot store
//
// ## Security Requirements
//
// - API token NEVER appears in logs
// - Provider MUST fail fast if token is empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List Zones: GET `/zones?page=N&per_page=50[&account.id=...]`
// - List DNS Records: GET `/zones/:zone_id/dns_records?page=N&per_page=100`
//
// Pagination cursors are the decimal page number of the next page.

use async_trait::async_trait;
use dnsdiff_core::config::ProviderConfig;
use dnsdiff_core::report::truncate_chars;
use dnsdiff_core::traits::{DnsProvider, Page, RawRecordSet, Zone};
use dnsdiff_core::{Error, Result};
use serde_json::Value;
use std::time::Duration;

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Zones requested per page
const ZONES_PER_PAGE: u32 = 50;

/// DNS records requested per page
const RECORDS_PER_PAGE: u32 = 100;

const PROVIDER_NAME: &str = "cloudflare";

/// Characters of an error response body kept in error messages
const ERROR_BODY_MAX_CHARS: usize = 300;

/// Cloudflare DNS provider
///
/// # Trust Level: Untrusted
///
/// Stateless and single-shot: each trait call makes exactly one HTTP request.
///
/// # Security
///
/// The Debug implementation does NOT expose the API token.
pub struct CloudflareProvider {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// Restrict zone listing to one account
    account_id: Option<String>,

    /// API base URL
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("account_id", &self.account_id)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:Read and DNS:Read permissions
    /// - `account_id`: Optional account filter for zone listing
    ///
    /// # Errors
    ///
    /// - `Error::Config` if the token is empty
    /// - `Error::Http` if the HTTP client cannot be built
    pub fn new(api_token: impl Into<String>, account_id: Option<String>) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.trim().is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            account_id: account_id.filter(|id| !id.is_empty()),
            base_url: CLOUDFLARE_API_BASE.to_string(),
            client,
        })
    }

    /// Build a provider from configuration
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        match config {
            ProviderConfig::Cloudflare {
                api_token,
                account_id,
            } => Self::new(api_token.clone(), account_id.clone()),
        }
    }

    /// Point the provider at a different API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Replace the HTTP client
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Issue one authenticated GET and return the parsed JSON body
    ///
    /// # API Call
    ///
    /// ```http
    /// GET {base_url}{path}
    /// Authorization: Bearer <token>
    /// ```
    async fn get_json(&self, path: &str, query: &[(&str, String)], context: &str) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("GET {} {:?}", path, query);

        let response = self
            .client
            .get(&url)
            .query(query)
            .bearer_auth(&self.api_token)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| Error::provider(PROVIDER_NAME, format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(status_error(status.as_u16(), &error_text, context));
        }

        response
            .json()
            .await
            .map_err(|e| Error::provider(PROVIDER_NAME, format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    async fn list_zones(&self, cursor: Option<&str>) -> Result<Page<Zone>> {
        let page = page_number(cursor)?;

        let mut query = vec![
            ("page", page.to_string()),
            ("per_page", ZONES_PER_PAGE.to_string()),
        ];
        if let Some(account_id) = &self.account_id {
            query.push(("account.id", account_id.clone()));
        }

        let json = self.get_json("/zones", &query, "Zone listing").await?;
        let zones = parse_zone_page(&json, page)?;

        tracing::debug!("Cloudflare zone page {} returned {} zone(s)", page, zones.items.len());
        Ok(zones)
    }

    async fn list_record_sets(
        &self,
        zone_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<RawRecordSet>> {
        let page = page_number(cursor)?;

        let query = [
            ("page", page.to_string()),
            ("per_page", RECORDS_PER_PAGE.to_string()),
        ];
        let path = format!("/zones/{}/dns_records", zone_id);
        let context = format!("Record listing for zone {}", zone_id);

        let json = self.get_json(&path, &query, &context).await?;
        parse_record_page(&json, page)
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

/// Decode a pagination cursor into a 1-based page number
fn page_number(cursor: Option<&str>) -> Result<u32> {
    match cursor {
        None => Ok(1),
        Some(raw) => match raw.parse::<u32>() {
            Ok(page) if page >= 1 => Ok(page),
            _ => Err(Error::invalid_input(format!(
                "Invalid Cloudflare pagination cursor: {}",
                raw
            ))),
        },
    }
}

/// Map a non-success HTTP status to an error
///
/// The response body is cut to [`ERROR_BODY_MAX_CHARS`]; gateway error pages
/// can run to several kilobytes.
fn status_error(status: u16, body: &str, context: &str) -> Error {
    let body = truncate_chars(body.trim(), ERROR_BODY_MAX_CHARS);
    let message = match status {
        401 | 403 => format!(
            "Authentication failed: Invalid API token or insufficient permissions. Status: {}",
            status
        ),
        404 => format!("{} failed: resource not found. Status: {}", context, status),
        429 => format!("Rate limit exceeded. Status: {}", status),
        500..=599 => format!("Cloudflare server error: {} - {}", status, body),
        _ => format!("{} failed: {} - {}", context, status, body),
    };
    Error::provider(PROVIDER_NAME, message)
}

/// Extract the `result` array, failing on an unsuccessful envelope
fn result_array(json: &Value) -> Result<&Vec<Value>> {
    if json["success"].as_bool() == Some(false) {
        let messages: Vec<&str> = json["errors"]
            .as_array()
            .map(|errors| errors.iter().filter_map(|e| e["message"].as_str()).collect())
            .unwrap_or_default();
        return Err(Error::provider(
            PROVIDER_NAME,
            format!("API reported failure: {}", messages.join("; ")),
        ));
    }

    json["result"].as_array().ok_or_else(|| {
        Error::provider(PROVIDER_NAME, "Invalid response format: result is not an array")
    })
}

/// Cursor for the page after `page`, from `result_info.total_pages`
fn next_cursor(json: &Value, page: u32) -> Option<String> {
    let total_pages = json["result_info"]["total_pages"].as_u64()?;
    if u64::from(page) < total_pages {
        Some((page + 1).to_string())
    } else {
        None
    }
}

fn into_page<T>(items: Vec<T>, next: Option<String>) -> Page<T> {
    match next {
        Some(next) => Page::with_next(items, next),
        None => Page::last(items),
    }
}

/// Parse a `GET /zones` response body
pub fn parse_zone_page(json: &Value, page: u32) -> Result<Page<Zone>> {
    let zones = result_array(json)?
        .iter()
        .map(|zone| {
            let id = zone["id"].as_str().ok_or_else(|| {
                Error::provider(PROVIDER_NAME, "Invalid response format: zone.id is not a string")
            })?;
            let name = zone["name"].as_str().unwrap_or_default();
            Ok(Zone::new(id, name))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(into_page(zones, next_cursor(json, page)))
}

/// Parse a `GET /zones/:zone_id/dns_records` response body
///
/// Cloudflare returns one entry per value, so each becomes a record set
/// with a single value. A missing `content` yields a set with no values.
pub fn parse_record_page(json: &Value, page: u32) -> Result<Page<RawRecordSet>> {
    let sets = result_array(json)?
        .iter()
        .map(|record| {
            let values = match record["content"].as_str() {
                Some(content) => vec![content.to_string()],
                None => Vec::new(),
            };
            RawRecordSet::new(
                record["type"].as_str().unwrap_or_default(),
                record["name"].as_str().unwrap_or_default(),
                values,
            )
        })
        .collect();

    Ok(into_page(sets, next_cursor(json, page)))
}
