// Trait seams for the lookup pipeline.
//
// LogFetcher: one upstream page per call; DlogClient in production,
//   MockFetcher in tests.
// ProgressSink: told once when a subject's history turns out to be large.
//
// Everything above these traits is deterministic and runs without a network.

use async_trait::async_trait;

use dlog_client::{Cursor, DlogClient, LogRecord, Subject};

#[async_trait]
pub trait LogFetcher: Send + Sync {
    /// Fetch one page of records for `subject`, resuming at `cursor`.
    async fn fetch_page(
        &self,
        subject: &Subject,
        cursor: Option<&Cursor>,
    ) -> dlog_client::Result<Vec<LogRecord>>;
}

#[async_trait]
impl LogFetcher for DlogClient {
    async fn fetch_page(
        &self,
        subject: &Subject,
        cursor: Option<&Cursor>,
    ) -> dlog_client::Result<Vec<LogRecord>> {
        self.page(subject, cursor).await
    }
}

#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// Called before the next page is requested, when `remaining` pages are
    /// left in the budget for `subject`.
    async fn pages_remaining(&self, subject: &Subject, remaining: usize);
}
