use std::collections::HashSet;

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use dlog_client::{DlogError, LogRecord, Subject};
use lookup_common::SignalScope;

use crate::collector::{collect, CollectOptions};
use crate::dedup::{dedup, distinct, scoped, DedupKey};
use crate::traits::LogFetcher;

#[derive(Debug, Clone)]
pub struct CorrelateOptions {
    /// Restrict IPs and candidates to this wiki.
    pub wiki: Option<String>,
    pub signal_scope: SignalScope,
    pub ip_page_cap: usize,
    /// Max per-IP lookups in flight.
    pub concurrency: usize,
}

/// The subject's own device fingerprints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceSignals {
    pub user_agents: HashSet<String>,
    pub app_ids: HashSet<String>,
}

impl DeviceSignals {
    /// Non-empty user agents and usable (not opted-out) app ids.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a LogRecord>) -> Self {
        let mut signals = Self::default();
        for record in records {
            if let Some(ua) = record.usable_user_agent() {
                signals.user_agents.insert(ua.to_string());
            }
            if record.has_usable_app_id() {
                signals.app_ids.insert(record.app_id.clone());
            }
        }
        signals
    }
}

/// Outcome of correlating a subject's IPs against everyone else's activity.
#[derive(Debug, Clone, Default)]
pub struct Correlation {
    /// Other accounts seen on the subject's IPs, in discovery order.
    pub candidates: Vec<String>,
    /// Every record from the successful per-IP lookups, in IP order. Not
    /// wiki-scoped: a candidate's evidence includes its activity elsewhere.
    pub ip_records: Vec<LogRecord>,
    pub signals: DeviceSignals,
    /// IPs that were looked up.
    pub ips: Vec<String>,
    /// IPs whose lookup failed; they contribute nothing.
    pub failed: Vec<(String, DlogError)>,
}

/// Find accounts sharing an IP with `subject`.
///
/// Per-IP failures are logged and dropped; this never fails as a whole.
pub async fn correlate(
    fetcher: &dyn LogFetcher,
    subject: &str,
    own_records: &[LogRecord],
    options: &CorrelateOptions,
) -> Correlation {
    let wiki = options.wiki.as_deref();

    let ips = distinct(scoped(own_records, wiki), |r| r.ip.as_str());
    let signals = match options.signal_scope {
        SignalScope::AllActivity => DeviceSignals::from_records(own_records),
        SignalScope::ScopedWiki => DeviceSignals::from_records(scoped(own_records, wiki)),
    };

    info!(
        subject,
        wiki = ?wiki,
        ips = ips.len(),
        user_agents = signals.user_agents.len(),
        app_ids = signals.app_ids.len(),
        "Correlating subject IPs"
    );

    let ip_options = CollectOptions::new(options.ip_page_cap, DedupKey::Record);
    let requests = ips.iter().cloned().enumerate().map(move |(index, ip)| async move {
        let outcome = collect(fetcher, &Subject::Ip(ip.clone()), ip_options, None).await;
        (index, ip, outcome)
    });
    let mut lookups: Vec<_> = stream::iter(requests)
        .buffer_unordered(options.concurrency.max(1))
        .collect()
        .await;
    // Candidates are reported in the order of the subject's IPs.
    lookups.sort_by_key(|(index, _, _)| *index);

    let mut correlation = Correlation {
        signals,
        ips: ips.clone(),
        ..Default::default()
    };
    let candidate_key = if wiki.is_some() {
        DedupKey::UserSite
    } else {
        DedupKey::User
    };

    for (_, ip, outcome) in lookups {
        let collection = match outcome {
            Ok(collection) => collection,
            Err(e) => {
                warn!(subject, ip = ip.as_str(), error = %e, "IP lookup failed, skipping");
                correlation.failed.push((ip, e));
                continue;
            }
        };

        let others: Vec<LogRecord> = scoped(&collection.records, wiki)
            .filter(|r| r.user_name != subject)
            .cloned()
            .collect();
        for record in dedup(&others, candidate_key) {
            if !correlation.candidates.contains(&record.user_name) {
                correlation.candidates.push(record.user_name);
            }
        }
        correlation.ip_records.extend(collection.records);
    }

    info!(
        subject,
        candidates = correlation.candidates.len(),
        failed_ips = correlation.failed.len(),
        "Correlation complete"
    );

    correlation
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testing::*;

    fn options(wiki: Option<&str>) -> CorrelateOptions {
        CorrelateOptions {
            wiki: wiki.map(String::from),
            signal_scope: SignalScope::AllActivity,
            ip_page_cap: 8,
            concurrency: 4,
        }
    }

    #[tokio::test]
    async fn finds_other_accounts_and_excludes_subject() {
        let own = vec![
            record("Alice", "a.fandom.com", "1.1.1.1"),
            record("Alice", "a.fandom.com", "2.2.2.2"),
            record("Alice", "a.fandom.com", "1.1.1.1"),
        ];
        let fetcher = MockFetcher::new()
            .on_records(
                "1.1.1.1",
                vec![
                    record("Alice", "a.fandom.com", "1.1.1.1"),
                    record("Bob", "a.fandom.com", "1.1.1.1"),
                    record("Bob", "b.fandom.com", "1.1.1.1"),
                ],
            )
            .on_records(
                "2.2.2.2",
                vec![
                    record("Carol", "c.fandom.com", "2.2.2.2"),
                    record("Bob", "c.fandom.com", "2.2.2.2"),
                ],
            );

        let out = correlate(&fetcher, "Alice", &own, &options(None)).await;

        assert_eq!(out.candidates, vec!["Bob", "Carol"]);
        assert_eq!(out.ips, vec!["1.1.1.1", "2.2.2.2"]);
        assert_eq!(out.ip_records.len(), 5);
        assert!(out.failed.is_empty());
        assert_eq!(fetcher.calls_for("1.1.1.1"), 1);
    }

    #[tokio::test]
    async fn empty_ips_are_never_looked_up() {
        let own = vec![record("Alice", "a.fandom.com", "")];
        let fetcher = MockFetcher::new();
        let out = correlate(&fetcher, "Alice", &own, &options(None)).await;
        assert!(out.candidates.is_empty());
        assert!(out.ips.is_empty());
        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_lookups_do_not_sink_the_others() {
        let own = vec![
            record("Alice", "a.fandom.com", "1.1.1.1"),
            record("Alice", "a.fandom.com", "2.2.2.2"),
            record("Alice", "a.fandom.com", "3.3.3.3"),
        ];
        let fetcher = MockFetcher::new()
            .fail("1.1.1.1", unavailable("timeout"))
            .on_records("2.2.2.2", vec![record("Bob", "a.fandom.com", "2.2.2.2")])
            .fail("3.3.3.3", invalid("Validation failed"));

        let out = correlate(&fetcher, "Alice", &own, &options(None)).await;

        assert_eq!(out.candidates, vec!["Bob"]);
        let failed: Vec<_> = out.failed.iter().map(|(ip, _)| ip.as_str()).collect();
        assert_eq!(failed, vec!["1.1.1.1", "3.3.3.3"]);
    }

    #[tokio::test]
    async fn all_lookups_failing_yields_empty_candidates() {
        let own = vec![record("Alice", "a.fandom.com", "1.1.1.1")];
        let fetcher = MockFetcher::new().fail("1.1.1.1", unavailable("down"));
        let out = correlate(&fetcher, "Alice", &own, &options(None)).await;
        assert!(out.candidates.is_empty());
        assert_eq!(out.failed.len(), 1);
    }

    #[tokio::test]
    async fn wiki_scope_limits_ips_and_candidates() {
        let own = vec![
            record("Alice", "a.fandom.com", "1.1.1.1"),
            record("Alice", "b.fandom.com", "9.9.9.9"),
        ];
        let fetcher = MockFetcher::new().on_records(
            "1.1.1.1",
            vec![
                record("Bob", "a.fandom.com", "1.1.1.1"),
                record("Dave", "b.fandom.com", "1.1.1.1"),
            ],
        );

        let out = correlate(&fetcher, "Alice", &own, &options(Some("a.fandom.com"))).await;

        assert_eq!(out.ips, vec!["1.1.1.1"]);
        assert_eq!(out.candidates, vec!["Bob"]);
        // Off-wiki records are kept for flagging.
        assert_eq!(out.ip_records.len(), 2);
        assert_eq!(fetcher.calls_for("9.9.9.9"), 0);
    }

    #[tokio::test]
    async fn signal_scope_controls_device_signals() {
        let own = vec![
            record("Alice", "a.fandom.com", "1.1.1.1").agent("UA-a").app("app-a"),
            record("Alice", "b.fandom.com", "2.2.2.2").agent("UA-b").app("opted-out"),
        ];
        let fetcher = MockFetcher::new().on_records("1.1.1.1", vec![]);

        let all = correlate(&fetcher, "Alice", &own, &options(Some("a.fandom.com"))).await;
        assert_eq!(all.signals.user_agents.len(), 2);
        assert_eq!(all.signals.app_ids, HashSet::from(["app-a".to_string()]));

        let mut scoped_opts = options(Some("a.fandom.com"));
        scoped_opts.signal_scope = SignalScope::ScopedWiki;
        let scoped = correlate(&fetcher, "Alice", &own, &scoped_opts).await;
        assert_eq!(scoped.signals.user_agents, HashSet::from(["UA-a".to_string()]));
    }

    #[tokio::test(start_paused = true)]
    async fn lookups_run_concurrently_and_keep_ip_order() {
        let own = vec![
            record("Alice", "a.fandom.com", "1.1.1.1"),
            record("Alice", "a.fandom.com", "2.2.2.2"),
        ];
        let fetcher = MockFetcher::new()
            .on_records("1.1.1.1", vec![record("Bob", "a.fandom.com", "1.1.1.1")])
            .delay("1.1.1.1", Duration::from_secs(30))
            .on_records("2.2.2.2", vec![record("Carol", "a.fandom.com", "2.2.2.2")])
            .delay("2.2.2.2", Duration::from_secs(10));

        let started = tokio::time::Instant::now();
        let out = correlate(&fetcher, "Alice", &own, &options(None)).await;

        assert_eq!(out.candidates, vec!["Bob", "Carol"]);
        assert!(started.elapsed() < Duration::from_secs(40));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_ip_does_not_hold_back_the_rest_of_the_window() {
        let own = vec![
            record("Alice", "a.fandom.com", "1.1.1.1"),
            record("Alice", "a.fandom.com", "2.2.2.2"),
            record("Alice", "a.fandom.com", "3.3.3.3"),
        ];
        let fetcher = MockFetcher::new()
            .on_records("1.1.1.1", vec![record("Bob", "a.fandom.com", "1.1.1.1")])
            .delay("1.1.1.1", Duration::from_secs(100))
            .on_records("2.2.2.2", vec![record("Carol", "a.fandom.com", "2.2.2.2")])
            .delay("2.2.2.2", Duration::from_secs(10))
            .on_records("3.3.3.3", vec![record("Dave", "a.fandom.com", "3.3.3.3")])
            .delay("3.3.3.3", Duration::from_secs(10));

        let mut opts = options(None);
        opts.concurrency = 2;
        let started = tokio::time::Instant::now();
        let out = correlate(&fetcher, "Alice", &own, &opts).await;

        // The third lookup starts as soon as the second finishes.
        assert!(started.elapsed() < Duration::from_secs(110), "{:?}", started.elapsed());
        assert_eq!(out.candidates, vec!["Bob", "Carol", "Dave"]);
    }
}
