//! Port interface for external calendar feed imports

use async_trait::async_trait;
use hivedesk_domain::{ExternalEvent, FeedError};

/// Trait for fetching and parsing one calendar feed URL.
///
/// An implementation owns transport (timeouts, size limits) and parsing.
/// The result is all-or-nothing per URL: a parse error discards every event
/// from that document, so a partially corrupt feed never applies a partial
/// event set.
#[async_trait]
pub trait FeedImporter: Send + Sync {
    /// Fetch one feed and return its parsed events.
    async fn fetch(&self, url: &str) -> Result<Vec<ExternalEvent>, FeedError>;
}
