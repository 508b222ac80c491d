//! Report rendering and delivery
//!
//! Renders a [`DiffResult`] into a chat message made of header and section
//! blocks, and hands it to a [`Notifier`].
//!
//! ## Message Format
//!
//! ```json
//! {
//!   "blocks": [
//!     { "type": "header",  "text": { "type": "plain_text", "text": "...", "emoji": true } },
//!     { "type": "section", "text": { "type": "mrkdwn", "text": "..." } }
//!   ]
//! }
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::diff::DiffResult;
use crate::error::{Error, Result};
use crate::model::Record;
use crate::traits::Notifier;

/// Maximum characters in one section's text
pub const SECTION_TEXT_LIMIT: usize = 3000;

const REPORT_TITLE: &str = "🔍 Daily DNS Scan Report 🔍";
const ADDED_LABEL: &str = "New Records";
const REMOVED_LABEL: &str = "Removed Records";

/// A notification message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub blocks: Vec<Block>,
}

impl Message {
    /// All block texts joined by newlines
    pub fn text(&self) -> String {
        self.blocks
            .iter()
            .map(Block::text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A message block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    /// Large plain-text title
    Header { text: Text },
    /// Markdown body section
    Section { text: Text },
}

impl Block {
    pub fn header(text: impl Into<String>) -> Self {
        Block::Header {
            text: Text::PlainText {
                text: text.into(),
                emoji: true,
            },
        }
    }

    pub fn section(text: impl Into<String>) -> Self {
        Block::Section {
            text: Text::Mrkdwn { text: text.into() },
        }
    }

    /// The block's text content
    pub fn text(&self) -> &str {
        match self {
            Block::Header { text } | Block::Section { text } => text.content(),
        }
    }
}

/// A text object inside a block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Text {
    #[serde(rename = "plain_text")]
    PlainText { text: String, emoji: bool },
    #[serde(rename = "mrkdwn")]
    Mrkdwn { text: String },
}

impl Text {
    pub fn content(&self) -> &str {
        match self {
            Text::PlainText { text, .. } | Text::Mrkdwn { text } => text,
        }
    }
}

/// Renders reports and delivers them through a notifier
pub struct Reporter {
    notifier: Box<dyn Notifier>,
}

impl Reporter {
    pub fn new(notifier: Box<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// Render the change report for a completed scan
    pub fn render(
        &self,
        diff: &DiffResult,
        total_current_records: usize,
        scan_time: DateTime<Utc>,
    ) -> Message {
        render_report(diff, total_current_records, scan_time)
    }

    /// Render the report sent in place of a change report when a run fails
    pub fn render_failure(&self, error_message: &str) -> Message {
        render_failure(error_message)
    }

    /// Deliver a message
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Delivered
    /// - `Err(Error::Config)`: Destination not configured
    /// - `Err(Error::Delivery)`: Any other transport failure
    pub async fn deliver(&self, message: &Message) -> Result<()> {
        debug!(
            "Delivering {} block(s) via {}",
            message.blocks.len(),
            self.notifier.notifier_name()
        );

        match self.notifier.deliver(message).await {
            Ok(()) => {
                info!("Report delivered via {}", self.notifier.notifier_name());
                Ok(())
            }
            Err(e @ (Error::Config(_) | Error::Delivery(_))) => Err(e),
            Err(other) => Err(Error::delivery(other.to_string())),
        }
    }
}

/// Render the change report for a completed scan
pub fn render_report(
    diff: &DiffResult,
    total_current_records: usize,
    scan_time: DateTime<Utc>,
) -> Message {
    let mut blocks = vec![
        Block::header(REPORT_TITLE),
        Block::section(format!(
            "Scan Time: {}\n⚠️ *Summary:*\nTotal Records: {}\nAdditions/Deletions: {}\nUnchanged Records: {}",
            scan_time.to_rfc3339_opts(SecondsFormat::Millis, true),
            total_current_records,
            diff.change_count(),
            diff.unchanged_count
        )),
    ];

    blocks.extend(listing_blocks(ADDED_LABEL, &diff.added));
    blocks.extend(listing_blocks(REMOVED_LABEL, &diff.removed));

    Message { blocks }
}

const FAILURE_PREFIX: &str = "❌ Error in daily DNS scan:\n```";
const FAILURE_SUFFIX: &str = "```";

/// Render the single-block failure report
///
/// The error message is truncated so the section fits [`SECTION_TEXT_LIMIT`].
pub fn render_failure(error_message: &str) -> Message {
    let budget = SECTION_TEXT_LIMIT
        - FAILURE_PREFIX.chars().count()
        - FAILURE_SUFFIX.chars().count();

    Message {
        blocks: vec![Block::section(format!(
            "{}{}{}",
            FAILURE_PREFIX,
            truncate_chars(error_message, budget),
            FAILURE_SUFFIX
        ))],
    }
}

/// Cut `text` to at most `max_chars` characters, ending in `…` when cut
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    truncated.push('…');
    truncated
}

fn format_entry(record: &Record) -> String {
    format!(
        "Domain: {}\nType: {}\nValue: {}",
        record.name, record.record_type, record.value
    )
}

fn listing_title(label: &str, continued: bool) -> String {
    if continued {
        format!("⚠️*{} (continued):*", label)
    } else {
        format!("⚠️*{}:*", label)
    }
}

/// Split a record listing into sections that fit [`SECTION_TEXT_LIMIT`]
///
/// Entries are never split across sections. An entry too long for any
/// section is truncated to fit one on its own.
fn listing_blocks(label: &str, records: &[Record]) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut title = listing_title(label, false);
    let mut body = String::new();
    let mut body_len = 0;

    // The continued title is the longer of the two
    let max_entry = SECTION_TEXT_LIMIT - listing_title(label, true).chars().count() - 1;

    for entry in records.iter().map(|r| truncate_chars(&format_entry(r), max_entry)) {
        let entry_len = entry.chars().count();
        let separator_len = if body.is_empty() { 0 } else { 2 };
        let section_len = title.chars().count() + 1 + body_len + separator_len + entry_len;

        if !body.is_empty() && section_len > SECTION_TEXT_LIMIT {
            blocks.push(Block::section(format!("{}\n{}", title, body)));
            title = listing_title(label, true);
            body.clear();
            body_len = 0;
        }

        if !body.is_empty() {
            body.push_str("\n\n");
            body_len += 2;
        }
        body.push_str(&entry);
        body_len += entry_len;
    }

    if !body.is_empty() {
        blocks.push(Block::section(format!("{}\n{}", title, body)));
    }

    blocks
}
