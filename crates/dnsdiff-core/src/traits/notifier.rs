// # Notifier Trait
//
// Defines the interface for delivering a rendered report to a chat channel.
//
// ## Implementations
//
// - Slack incoming webhook: `dnsdiff-notify-slack` crate

use async_trait::async_trait;

use crate::report::Message;

/// Trait for notification transports
///
/// A transport accepts one structured [`Message`] and reports whether the
/// destination accepted it. Delivery is attempted exactly once per call.
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ Perform a single HTTP/HTTPS request to the configured destination
///
/// ## Forbidden Capabilities
/// - ❌ Retry delivery
/// - ❌ Alter the message content
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a message
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The destination reported success
    /// - `Err(Error::Delivery)`: Non-success status or transport failure
    /// - `Err(Error::Config)`: The destination is not configured
    async fn deliver(&self, message: &Message) -> Result<(), crate::Error>;

    /// Get the notifier name (for logging/debugging)
    fn notifier_name(&self) -> &'static str;
}
