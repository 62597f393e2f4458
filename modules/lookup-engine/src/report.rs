// End-to-end lookups: subject in, structured report out.
//
// wikis_report: where has this account been active?
// check_report: which other accounts share its IPs, and how strongly?
//
// Both own their accumulators; nothing is shared between invocations.

use std::sync::Arc;

use tracing::info;

use dlog_client::Subject;
use lookup_common::error::Result;
use lookup_common::{Config, LookupError, SignalScope};

use crate::aggregate::{wikis_view, WikiEntry};
use crate::collector::{collect, CollectOptions, Collection};
use crate::correlator::{correlate, CorrelateOptions, Correlation};
use crate::dedup::DedupKey;
use crate::flagger::{flag, FlaggedCandidate};
use crate::traits::{LogFetcher, ProgressSink};

/// Tunables for one lookup.
#[derive(Debug, Clone)]
pub struct LookupSettings {
    pub page_cap: usize,
    pub ip_page_cap: usize,
    pub progress_remaining: usize,
    pub ip_concurrency: usize,
    pub signal_scope: SignalScope,
    pub default_site: String,
    pub command_prefix: String,
}

impl Default for LookupSettings {
    fn default() -> Self {
        Self {
            page_cap: 8,
            ip_page_cap: 8,
            progress_remaining: 4,
            ip_concurrency: 8,
            signal_scope: SignalScope::AllActivity,
            default_site: "community.fandom.com".to_string(),
            command_prefix: "!".to_string(),
        }
    }
}

impl From<&Config> for LookupSettings {
    fn from(config: &Config) -> Self {
        Self {
            page_cap: config.page_cap,
            ip_page_cap: config.ip_page_cap,
            progress_remaining: config.progress_remaining,
            ip_concurrency: config.ip_concurrency,
            signal_scope: config.signal_scope,
            default_site: config.default_site.clone(),
            command_prefix: config.command_prefix.clone(),
        }
    }
}

/// Immutable per-request dependencies.
#[derive(Clone)]
pub struct LookupContext {
    pub fetcher: Arc<dyn LogFetcher>,
    pub settings: LookupSettings,
}

impl LookupContext {
    pub fn new(fetcher: Arc<dyn LogFetcher>, settings: LookupSettings) -> Self {
        Self { fetcher, settings }
    }

    fn history_options(&self, dedup: DedupKey) -> CollectOptions {
        CollectOptions::new(self.settings.page_cap, dedup)
            .with_progress_at(self.settings.progress_remaining)
    }
}

#[derive(Debug, Clone)]
pub enum WikisReport {
    NoWikis { subject: String },
    Found {
        subject: String,
        collection: Collection,
        wikis: Vec<WikiEntry>,
    },
}

#[derive(Debug, Clone)]
pub enum CheckReport {
    NoResults { subject: String },
    NoCandidates { subject: String, correlation: Correlation },
    Found {
        subject: String,
        collection: Collection,
        correlation: Correlation,
        candidates: Vec<FlaggedCandidate>,
    },
}

/// Wikis where `subject` was active. IP subjects are refused before any request.
pub async fn wikis_report(
    ctx: &LookupContext,
    subject: &str,
    progress: Option<&dyn ProgressSink>,
) -> Result<WikisReport> {
    let subject = parse_subject(subject)?;
    if subject.is_ip() {
        return Err(LookupError::IpNotSupported(subject.to_string()));
    }

    let collection = collect(
        ctx.fetcher.as_ref(),
        &subject,
        ctx.history_options(DedupKey::Site),
        progress,
    )
    .await?;

    let wikis = wikis_view(&collection);
    info!(subject = %subject, wikis = wikis.len(), truncated = collection.is_truncated(), "Wikis lookup complete");

    if wikis.is_empty() {
        return Ok(WikisReport::NoWikis {
            subject: subject.to_string(),
        });
    }
    Ok(WikisReport::Found {
        subject: subject.to_string(),
        collection,
        wikis,
    })
}

/// Other accounts sharing `subject`'s IPs, optionally limited to `wiki`.
pub async fn check_report(
    ctx: &LookupContext,
    subject: &str,
    wiki: Option<&str>,
    progress: Option<&dyn ProgressSink>,
) -> Result<CheckReport> {
    let subject = parse_subject(subject)?;

    let collection = collect(
        ctx.fetcher.as_ref(),
        &subject,
        ctx.history_options(DedupKey::Record),
        progress,
    )
    .await?;

    if collection.is_empty() {
        return Ok(CheckReport::NoResults {
            subject: subject.to_string(),
        });
    }

    let options = CorrelateOptions {
        wiki: wiki.map(String::from),
        signal_scope: ctx.settings.signal_scope,
        ip_page_cap: ctx.settings.ip_page_cap,
        concurrency: ctx.settings.ip_concurrency,
    };
    let correlation = correlate(
        ctx.fetcher.as_ref(),
        subject.as_str(),
        &collection.records,
        &options,
    )
    .await;

    if correlation.candidates.is_empty() {
        return Ok(CheckReport::NoCandidates {
            subject: subject.to_string(),
            correlation,
        });
    }

    let candidates = flag(&correlation, &ctx.settings.default_site);
    Ok(CheckReport::Found {
        subject: subject.to_string(),
        collection,
        correlation,
        candidates,
    })
}

fn parse_subject(raw: &str) -> Result<Subject> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(LookupError::EmptySubject);
    }
    Ok(Subject::classify(raw))
}
