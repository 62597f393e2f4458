use tracing::{debug, info};

use dlog_client::{Cursor, LogRecord, Subject};

use crate::dedup::{dedup, DedupKey};
use crate::traits::{LogFetcher, ProgressSink};

/// How far to page and when to warn.
#[derive(Debug, Clone, Copy)]
pub struct CollectOptions {
    /// Maximum number of upstream requests for one subject.
    pub page_cap: usize,
    /// Fire the progress sink before the request that leaves this many pages
    /// in the budget. `None` never fires.
    pub progress_at_remaining: Option<usize>,
    pub dedup: DedupKey,
}

impl CollectOptions {
    pub fn new(page_cap: usize, dedup: DedupKey) -> Self {
        Self {
            page_cap,
            progress_at_remaining: None,
            dedup,
        }
    }

    pub fn with_progress_at(mut self, remaining: usize) -> Self {
        self.progress_at_remaining = (remaining > 0).then_some(remaining);
        self
    }
}

/// Why paging stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completeness {
    /// The service ran out of records.
    Complete,
    /// The page cap was hit with more records possibly available.
    Truncated { pages: usize },
}

/// A subject's deduplicated history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub records: Vec<LogRecord>,
    pub pages_fetched: usize,
    pub completeness: Completeness,
    /// Oldest timestamp among every fetched record, before dedup.
    pub earliest: Option<String>,
}

impl Collection {
    pub fn is_truncated(&self) -> bool {
        matches!(self.completeness, Completeness::Truncated { .. })
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Page through `subject`'s history until it runs out or the budget does.
///
/// The first failed request aborts the whole collection; there is no partial
/// result on failure.
pub async fn collect(
    fetcher: &dyn LogFetcher,
    subject: &Subject,
    options: CollectOptions,
    progress: Option<&dyn ProgressSink>,
) -> dlog_client::Result<Collection> {
    let mut records: Vec<LogRecord> = Vec::new();
    let mut earliest: Option<String> = None;
    let mut cursor: Option<Cursor> = None;
    let mut pages_fetched = 0;
    let mut completeness = Completeness::Truncated {
        pages: options.page_cap,
    };

    while pages_fetched < options.page_cap {
        let remaining = options.page_cap - pages_fetched;
        if pages_fetched > 0 && options.progress_at_remaining == Some(remaining) {
            if let Some(sink) = progress {
                info!(subject = %subject, pages_fetched, remaining, "Large history, notifying caller");
                sink.pages_remaining(subject, remaining).await;
            }
        }

        let page = fetcher.fetch_page(subject, cursor.as_ref()).await?;
        pages_fetched += 1;
        debug!(subject = %subject, page = pages_fetched, count = page.len(), "Collected page");

        if page.is_empty() {
            completeness = Completeness::Complete;
            break;
        }

        for record in &page {
            if !record.timestamp.is_empty()
                && earliest.as_deref().map_or(true, |e| record.timestamp.as_str() < e)
            {
                earliest = Some(record.timestamp.clone());
            }
        }

        // A short page is the last one. This trusts the service's page size.
        let next = Cursor::next(&page);
        records.extend(page);
        records = dedup(&records, options.dedup);

        match next {
            Some(next) => cursor = Some(next),
            None => {
                completeness = Completeness::Complete;
                break;
            }
        }
    }

    if let Completeness::Truncated { pages } = completeness {
        info!(subject = %subject, pages, earliest = ?earliest, "Page cap reached, history truncated");
    }

    Ok(Collection {
        records,
        pages_fetched,
        completeness,
        earliest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    fn user(name: &str) -> Subject {
        Subject::User(name.to_string())
    }

    #[tokio::test]
    async fn empty_history_is_complete() {
        let fetcher = MockFetcher::new().on_pages("Alice", vec![vec![]]);
        let out = collect(&fetcher, &user("Alice"), CollectOptions::new(8, DedupKey::Record), None)
            .await
            .unwrap();
        assert!(out.is_empty());
        assert_eq!(out.completeness, Completeness::Complete);
        assert_eq!(out.earliest, None);
        assert_eq!(out.pages_fetched, 1);
    }

    #[tokio::test]
    async fn short_page_ends_paging() {
        let page = page_of("Alice", "a.fandom.com", "1.1.1.1", 3, 0);
        let fetcher = MockFetcher::new().on_pages("Alice", vec![page]);
        let out = collect(&fetcher, &user("Alice"), CollectOptions::new(8, DedupKey::Record), None)
            .await
            .unwrap();
        assert_eq!(out.records.len(), 3);
        assert_eq!(out.completeness, Completeness::Complete);
        assert_eq!(fetcher.calls_for("Alice"), 1);
    }

    #[tokio::test]
    async fn full_pages_advance_the_cursor() {
        let first = page_of("Alice", "a.fandom.com", "1.1.1.1", 100, 0);
        let second = page_of("Alice", "b.fandom.com", "1.1.1.1", 10, 100);
        let last_ts = first.last().unwrap().timestamp.clone();
        let fetcher = MockFetcher::new().on_pages("Alice", vec![first, second]);

        let out = collect(&fetcher, &user("Alice"), CollectOptions::new(8, DedupKey::Record), None)
            .await
            .unwrap();

        assert_eq!(out.records.len(), 110);
        assert_eq!(out.completeness, Completeness::Complete);
        let cursors = fetcher.cursors_for("Alice");
        assert_eq!(cursors.len(), 2);
        assert_eq!(cursors[0], None);
        assert_eq!(
            cursors[1].as_deref(),
            Some(last_ts.replace('T', " ").trim_end_matches('Z'))
        );
    }

    #[tokio::test]
    async fn cap_reached_is_truncated_with_earliest_timestamp() {
        let pages: Vec<_> = (0..20)
            .map(|i| page_of("Alice", "a.fandom.com", "1.1.1.1", 100, i * 100))
            .collect();
        let oldest_in_budget = pages[2].last().unwrap().timestamp.clone();
        let fetcher = MockFetcher::new().on_pages("Alice", pages);

        let out = collect(&fetcher, &user("Alice"), CollectOptions::new(3, DedupKey::Site), None)
            .await
            .unwrap();

        assert_eq!(out.completeness, Completeness::Truncated { pages: 3 });
        assert!(out.is_truncated());
        assert_eq!(out.pages_fetched, 3);
        assert_eq!(fetcher.calls_for("Alice"), 3);
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.earliest, Some(oldest_in_budget));
    }

    #[tokio::test]
    async fn failure_aborts_without_partial_result() {
        let fetcher = MockFetcher::new()
            .on_pages("Alice", vec![page_of("Alice", "a.fandom.com", "1.1.1.1", 100, 0)])
            .fail_after("Alice", 1, invalid("Validation failed"));
        let err = collect(&fetcher, &user("Alice"), CollectOptions::new(8, DedupKey::Record), None)
            .await
            .unwrap_err();
        assert_eq!(err, invalid("Validation failed"));
    }

    #[tokio::test]
    async fn progress_fires_once_before_threshold_page() {
        let pages: Vec<_> = (0..20)
            .map(|i| page_of("Alice", "a.fandom.com", "1.1.1.1", 100, i * 100))
            .collect();
        let fetcher = MockFetcher::new().on_pages("Alice", pages);
        let progress = RecordingProgress::new(fetcher.call_log());

        collect(
            &fetcher,
            &user("Alice"),
            CollectOptions::new(8, DedupKey::Record).with_progress_at(4),
            Some(&progress),
        )
        .await
        .unwrap();

        let notices = progress.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].remaining, 4);
        // Four pages were already requested when the notice went out.
        assert_eq!(notices[0].calls_before, 4);
    }

    #[tokio::test]
    async fn progress_silent_for_small_histories() {
        let fetcher = MockFetcher::new()
            .on_pages("Alice", vec![page_of("Alice", "a.fandom.com", "1.1.1.1", 5, 0)]);
        let progress = RecordingProgress::new(fetcher.call_log());
        collect(
            &fetcher,
            &user("Alice"),
            CollectOptions::new(8, DedupKey::Record).with_progress_at(4),
            Some(&progress),
        )
        .await
        .unwrap();
        assert!(progress.notices().is_empty());
    }

    #[tokio::test]
    async fn terminates_within_cap_for_endless_full_pages() {
        for cap in 1..=5 {
            let pages: Vec<_> = (0..50)
                .map(|i| page_of("Alice", "a.fandom.com", "1.1.1.1", 100, i * 100))
                .collect();
            let fetcher = MockFetcher::new().on_pages("Alice", pages);
            let out = collect(&fetcher, &user("Alice"), CollectOptions::new(cap, DedupKey::Record), None)
                .await
                .unwrap();
            assert_eq!(fetcher.calls_for("Alice"), cap);
            assert_eq!(out.completeness, Completeness::Truncated { pages: cap });
        }
    }
}
