//! Mock feed importer for sync orchestrator tests

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use hivedesk_core::FeedImporter;
use hivedesk_domain::{ExternalEvent, FeedError};

/// Scripted in-memory feed importer.
///
/// Each URL resolves to a fixed result; unknown URLs behave as unreachable.
/// An optional per-fetch delay lets tests hold a sync run open while another
/// trigger races for the same space's lock.
#[derive(Default)]
pub struct MockFeedImporter {
    feeds: Mutex<HashMap<String, Result<Vec<ExternalEvent>, FeedError>>>,
    delay: Option<Duration>,
}

impl MockFeedImporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slow every fetch down, keeping the run in flight.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Script a URL to return the given events.
    pub fn serve(&self, url: &str, events: Vec<ExternalEvent>) {
        self.feeds.lock().unwrap().insert(url.to_string(), Ok(events));
    }

    /// Script a URL to fail with the given error.
    pub fn fail(&self, url: &str, error: FeedError) {
        self.feeds.lock().unwrap().insert(url.to_string(), Err(error));
    }
}

#[async_trait]
impl FeedImporter for MockFeedImporter {
    async fn fetch(&self, url: &str) -> Result<Vec<ExternalEvent>, FeedError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.feeds
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(FeedError::Unreachable(format!("no route to {url}"))))
    }
}
