// Test mocks for the lookup pipeline.
//
// - MockFetcher (LogFetcher): subject → scripted pages, failures, delays
// - RecordingProgress (ProgressSink): remembers every notice
// - RecordingSurface (Surface): remembers every notice and block
//
// Plus record builders so tests read as data.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use dlog_client::{Cursor, DlogError, LogRecord, Subject};

use crate::aggregate::TextBlock;
use crate::surface::Surface;
use crate::traits::{LogFetcher, ProgressSink};

// ---------------------------------------------------------------------------
// Record builders
// ---------------------------------------------------------------------------

/// A record with a fixed timestamp, id `1`, and no device signals.
pub fn record(user: &str, site: &str, ip: &str) -> LogRecord {
    LogRecord {
        timestamp: "2021-06-01T12:00:00Z".to_string(),
        site_name: site.to_string(),
        user_name: user.to_string(),
        user_id: "1".to_string(),
        ip: ip.to_string(),
        user_agent: None,
        app_id: String::new(),
    }
}

pub trait RecordExt {
    fn agent(self, user_agent: &str) -> Self;
    fn app(self, app_id: &str) -> Self;
    fn id(self, user_id: &str) -> Self;
    fn at(self, timestamp: &str) -> Self;
}

impl RecordExt for LogRecord {
    fn agent(mut self, user_agent: &str) -> Self {
        self.user_agent = Some(user_agent.to_string());
        self
    }

    fn app(mut self, app_id: &str) -> Self {
        self.app_id = app_id.to_string();
        self
    }

    fn id(mut self, user_id: &str) -> Self {
        self.user_id = user_id.to_string();
        self
    }

    fn at(mut self, timestamp: &str) -> Self {
        self.timestamp = timestamp.to_string();
        self
    }
}

/// Timestamp `index` seconds before the end of 2021-06-01. Higher index is older.
pub fn ts(index: usize) -> String {
    let secs = 86_399usize.saturating_sub(index);
    format!(
        "2021-06-01T{:02}:{:02}:{:02}Z",
        secs / 3600,
        secs % 3600 / 60,
        secs % 60
    )
}

/// `count` records, newest first, starting `offset` records into the history.
pub fn page_of(user: &str, site: &str, ip: &str, count: usize, offset: usize) -> Vec<LogRecord> {
    (offset..offset + count)
        .map(|i| record(user, site, ip).at(&ts(i)))
        .collect()
}

pub fn invalid(reason: &str) -> DlogError {
    DlogError::InvalidSubject(reason.to_string())
}

pub fn unavailable(reason: &str) -> DlogError {
    DlogError::Unavailable(reason.to_string())
}

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// One recorded upstream request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCall {
    pub subject: String,
    pub cursor: Option<String>,
}

pub type CallLog = Arc<Mutex<Vec<FetchCall>>>;

#[derive(Default)]
struct Script {
    pages: Vec<Vec<LogRecord>>,
    fail_after: Option<(usize, DlogError)>,
    delay: Option<Duration>,
}

/// Subject-keyed fake log service. Returns `Err` for unregistered subjects,
/// and an empty page once a subject's scripted pages run out.
/// Builder pattern: `.on_pages()`, `.fail()`, `.fail_after()`, `.delay()`.
#[derive(Default)]
pub struct MockFetcher {
    scripts: HashMap<String, Script>,
    calls: CallLog,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_pages(mut self, subject: &str, pages: Vec<Vec<LogRecord>>) -> Self {
        self.scripts.entry(subject.to_string()).or_default().pages = pages;
        self
    }

    /// Single page shorthand.
    pub fn on_records(self, subject: &str, records: Vec<LogRecord>) -> Self {
        self.on_pages(subject, vec![records])
    }

    pub fn fail(self, subject: &str, error: DlogError) -> Self {
        self.fail_after(subject, 0, error)
    }

    /// Succeed for the first `calls` requests, then fail with `error`.
    pub fn fail_after(mut self, subject: &str, calls: usize, error: DlogError) -> Self {
        self.scripts.entry(subject.to_string()).or_default().fail_after = Some((calls, error));
        self
    }

    pub fn delay(mut self, subject: &str, delay: Duration) -> Self {
        self.scripts.entry(subject.to_string()).or_default().delay = Some(delay);
        self
    }

    pub fn call_log(&self) -> CallLog {
        self.calls.clone()
    }

    pub fn calls(&self) -> Vec<FetchCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, subject: &str) -> usize {
        self.calls().iter().filter(|c| c.subject == subject).count()
    }

    pub fn cursors_for(&self, subject: &str) -> Vec<Option<String>> {
        self.calls()
            .into_iter()
            .filter(|c| c.subject == subject)
            .map(|c| c.cursor)
            .collect()
    }
}

#[async_trait]
impl LogFetcher for MockFetcher {
    async fn fetch_page(
        &self,
        subject: &Subject,
        cursor: Option<&Cursor>,
    ) -> dlog_client::Result<Vec<LogRecord>> {
        let call_index = {
            let mut calls = self.calls.lock().unwrap();
            let index = calls.iter().filter(|c| c.subject == subject.as_str()).count();
            calls.push(FetchCall {
                subject: subject.as_str().to_string(),
                cursor: cursor.map(|c| c.as_str().to_string()),
            });
            index
        };

        let Some(script) = self.scripts.get(subject.as_str()) else {
            return Err(invalid(&format!("MockFetcher: nothing registered for {subject}")));
        };

        if let Some(delay) = script.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some((after, error)) = &script.fail_after {
            if call_index >= *after {
                return Err(error.clone());
            }
        }

        Ok(script.pages.get(call_index).cloned().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// RecordingProgress
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressNotice {
    pub subject: String,
    pub remaining: usize,
    /// Upstream requests already made when the notice fired.
    pub calls_before: usize,
}

pub struct RecordingProgress {
    calls: CallLog,
    notices: Mutex<Vec<ProgressNotice>>,
}

impl RecordingProgress {
    pub fn new(calls: CallLog) -> Self {
        Self {
            calls,
            notices: Mutex::new(Vec::new()),
        }
    }

    pub fn notices(&self) -> Vec<ProgressNotice> {
        self.notices.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProgressSink for RecordingProgress {
    async fn pages_remaining(&self, subject: &Subject, remaining: usize) {
        let calls_before = self.calls.lock().unwrap().len();
        self.notices.lock().unwrap().push(ProgressNotice {
            subject: subject.as_str().to_string(),
            remaining,
            calls_before,
        });
    }
}

// ---------------------------------------------------------------------------
// RecordingSurface
// ---------------------------------------------------------------------------

/// Everything a handler sent, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Notice(String),
    Block(TextBlock),
}

#[derive(Default)]
pub struct RecordingSurface {
    sent: Mutex<Vec<Sent>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn notices(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Notice(text) => Some(text),
                Sent::Block(_) => None,
            })
            .collect()
    }

    pub fn blocks(&self) -> Vec<TextBlock> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Block(block) => Some(block),
                Sent::Notice(_) => None,
            })
            .collect()
    }
}

#[async_trait]
impl Surface for RecordingSurface {
    async fn notice(&self, text: &str) {
        self.sent.lock().unwrap().push(Sent::Notice(text.to_string()));
    }

    async fn block(&self, block: &TextBlock) {
        self.sent.lock().unwrap().push(Sent::Block(block.clone()));
    }
}
