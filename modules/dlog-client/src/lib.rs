pub mod error;
pub mod subject;
pub mod types;

pub use error::{DlogError, Result, EMPTY_BODY_MESSAGE};
pub use subject::{is_ip, is_ipv4, is_ipv6};
pub use types::{Cursor, LogRecord, Subject, OPTED_OUT_APP_ID, PAGE_SIZE};

use std::time::Duration;

use tracing::{debug, warn};

/// Client for the Discussions activity log service.
///
/// One call returns one page (at most [`PAGE_SIZE`] records, newest first).
/// Paging across calls is the caller's business.
pub struct DlogClient {
    client: reqwest::Client,
    endpoint: String,
    access_token: String,
}

impl DlogClient {
    pub fn new(endpoint: &str, access_token: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            access_token: access_token.to_string(),
        })
    }

    /// Fetch one page of log records for `subject`, resuming at `cursor`.
    pub async fn page(&self, subject: &Subject, cursor: Option<&Cursor>) -> Result<Vec<LogRecord>> {
        let mut query = vec![(subject.query_key(), subject.as_str())];
        if let Some(cursor) = cursor {
            query.push(("ts_from", cursor.as_str()));
        }

        // The body is authoritative; error statuses come with a readable body.
        let body = self
            .client
            .get(&self.endpoint)
            .query(&query)
            .header("Content-Type", "application/json")
            .header("Cookie", format!("access_token={}", self.access_token))
            .send()
            .await?
            .text()
            .await?;

        let page = parse_page(&body);
        match &page {
            Ok(records) => {
                debug!(subject = %subject, cursor = ?cursor.map(Cursor::as_str), count = records.len(), "Fetched log page");
            }
            Err(e) => {
                warn!(subject = %subject, error = %e, "Log service rejected request");
            }
        }
        page
    }
}

/// Classify a response body: a JSON array is a page; anything else is a failure.
pub fn parse_page(body: &str) -> Result<Vec<LogRecord>> {
    if body.trim().is_empty() {
        return Err(DlogError::Unavailable(EMPTY_BODY_MESSAGE.to_string()));
    }
    serde_json::from_str::<Vec<LogRecord>>(body).map_err(|_| DlogError::InvalidSubject(body.to_string()))
}
