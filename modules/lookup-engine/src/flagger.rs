use std::collections::HashMap;

use dlog_client::LogRecord;

use crate::correlator::{Correlation, DeviceSignals};

/// Strength of the evidence tying a candidate to the subject. Ordered weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Confidence {
    NoMatch,
    /// Same user agent string. Browsers are shared by many people.
    DeviceMatch,
    /// Same app installation id.
    AppIdMatch,
}

impl Confidence {
    /// Tier for a single record against the subject's signals.
    pub fn of(record: &LogRecord, signals: &DeviceSignals) -> Self {
        if record.has_usable_app_id() && signals.app_ids.contains(&record.app_id) {
            Confidence::AppIdMatch
        } else if record
            .usable_user_agent()
            .is_some_and(|ua| signals.user_agents.contains(ua))
        {
            Confidence::DeviceMatch
        } else {
            Confidence::NoMatch
        }
    }

    pub fn label(&self) -> Option<&'static str> {
        match self {
            Confidence::NoMatch => None,
            Confidence::DeviceMatch => Some(":grey_exclamation: Device/browser match"),
            Confidence::AppIdMatch => Some(":exclamation: App ID match"),
        }
    }
}

/// A candidate account with its evidence tier and where to find it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlaggedCandidate {
    pub user_name: String,
    /// Display only; empty site names are replaced by the default site.
    pub site_name: String,
    pub user_id: String,
    pub confidence: Confidence,
}

/// Tier every candidate, keeping correlation order.
///
/// Each candidate takes the strongest tier over all of its records; display
/// details come from its first record.
pub fn flag(correlation: &Correlation, default_site: &str) -> Vec<FlaggedCandidate> {
    let mut first_seen: HashMap<&str, &LogRecord> = HashMap::new();
    let mut tiers: HashMap<&str, Confidence> = HashMap::new();

    for record in &correlation.ip_records {
        let name = record.user_name.as_str();
        first_seen.entry(name).or_insert(record);

        let tier = tiers.entry(name).or_insert(Confidence::NoMatch);
        if *tier < Confidence::AppIdMatch {
            *tier = (*tier).max(Confidence::of(record, &correlation.signals));
        }
    }

    correlation
        .candidates
        .iter()
        .map(|name| {
            let (site_name, user_id) = match first_seen.get(name.as_str()) {
                Some(record) => (record.site_name.as_str(), record.user_id.as_str()),
                None => ("", ""),
            };
            FlaggedCandidate {
                user_name: name.clone(),
                site_name: if site_name.is_empty() {
                    default_site.to_string()
                } else {
                    site_name.to_string()
                },
                user_id: user_id.to_string(),
                confidence: tiers
                    .get(name.as_str())
                    .copied()
                    .unwrap_or(Confidence::NoMatch),
            }
        })
        .collect()
}
