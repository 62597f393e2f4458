//! Stable deduplication of log records.
//!
//! Every strategy keeps the first record seen for each key, in input order,
//! so deduplicating twice is the same as deduplicating once.

use std::collections::HashSet;

use dlog_client::LogRecord;

/// Which fields make two records "the same".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupKey {
    /// Every field. Collapses verbatim repeats only.
    Record,
    /// `siteName`: one record per wiki.
    Site,
    /// `userName`: one record per account.
    User,
    /// `(userName, siteName)`: one record per account per wiki.
    UserSite,
    /// `(userName, ip)`: distinct IPs for a user.
    UserIp,
    /// `(ip, userName)`: distinct usernames for an IP.
    IpUser,
}

#[derive(PartialEq, Eq, Hash)]
enum Key<'a> {
    Record(&'a LogRecord),
    One(&'a str),
    Pair(&'a str, &'a str),
}

impl DedupKey {
    fn key<'a>(&self, record: &'a LogRecord) -> Key<'a> {
        match self {
            DedupKey::Record => Key::Record(record),
            DedupKey::Site => Key::One(&record.site_name),
            DedupKey::User => Key::One(&record.user_name),
            DedupKey::UserSite => Key::Pair(&record.user_name, &record.site_name),
            DedupKey::UserIp => Key::Pair(&record.user_name, &record.ip),
            DedupKey::IpUser => Key::Pair(&record.ip, &record.user_name),
        }
    }
}

/// Keep the first record per distinct `key`, preserving order.
pub fn dedup(records: &[LogRecord], key: DedupKey) -> Vec<LogRecord> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter(|record| seen.insert(key.key(*record)))
        .cloned()
        .collect()
}

/// Records on `wiki`, or all records when unscoped.
pub fn scoped<'a>(
    records: &'a [LogRecord],
    wiki: Option<&'a str>,
) -> impl Iterator<Item = &'a LogRecord> + 'a {
    records
        .iter()
        .filter(move |record| wiki.map_or(true, |w| record.site_name == w))
}

/// Distinct non-empty values of `field`, in first-seen order.
pub fn distinct<'a, I, F>(records: I, field: F) -> Vec<String>
where
    I: IntoIterator<Item = &'a LogRecord>,
    F: Fn(&'a LogRecord) -> &'a str,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for record in records {
        let value = field(record);
        if !value.is_empty() && seen.insert(value) {
            out.push(value.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(user: &str, site: &str, ip: &str) -> LogRecord {
        LogRecord {
            timestamp: "2021-01-01T00:00:00Z".to_string(),
            site_name: site.to_string(),
            user_name: user.to_string(),
            user_id: "1".to_string(),
            ip: ip.to_string(),
            user_agent: None,
            app_id: String::new(),
        }
    }

    fn sample() -> Vec<LogRecord> {
        vec![
            rec("Alice", "a.fandom.com", "1.1.1.1"),
            rec("Alice", "a.fandom.com", "2.2.2.2"),
            rec("Bob", "b.fandom.com", "1.1.1.1"),
            rec("Alice", "a.fandom.com", "1.1.1.1"),
            rec("Bob", "a.fandom.com", "1.1.1.1"),
            rec("Alice", "", "3.3.3.3"),
        ]
    }

    #[test]
    fn by_site_keeps_first_per_site() {
        let out = dedup(&sample(), DedupKey::Site);
        let sites: Vec<_> = out.iter().map(|r| r.site_name.as_str()).collect();
        assert_eq!(sites, vec!["a.fandom.com", "b.fandom.com", ""]);
        assert_eq!(out[0].ip, "1.1.1.1");
    }

    #[test]
    fn by_user_ip_gives_distinct_ips_per_user() {
        let out = dedup(&sample(), DedupKey::UserIp);
        let pairs: Vec<_> = out
            .iter()
            .map(|r| (r.user_name.as_str(), r.ip.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("Alice", "1.1.1.1"),
                ("Alice", "2.2.2.2"),
                ("Bob", "1.1.1.1"),
                ("Alice", "3.3.3.3"),
            ]
        );
    }

    #[test]
    fn by_record_only_drops_exact_repeats() {
        let out = dedup(&sample(), DedupKey::Record);
        assert_eq!(out.len(), 5);
    }

    #[test]
    fn every_strategy_is_idempotent() {
        for key in [
            DedupKey::Record,
            DedupKey::Site,
            DedupKey::User,
            DedupKey::UserSite,
            DedupKey::UserIp,
            DedupKey::IpUser,
        ] {
            let once = dedup(&sample(), key);
            let twice = dedup(&once, key);
            assert_eq!(once, twice, "{key:?} is not idempotent");
        }
    }

    #[test]
    fn no_two_records_share_a_key() {
        let out = dedup(&sample(), DedupKey::UserSite);
        let keys: HashSet<_> = out
            .iter()
            .map(|r| (r.user_name.clone(), r.site_name.clone()))
            .collect();
        assert_eq!(keys.len(), out.len());
    }

    #[test]
    fn scoping_and_distinct_values() {
        let records = sample();
        let ips = distinct(scoped(&records, Some("a.fandom.com")), |r| r.ip.as_str());
        assert_eq!(ips, vec!["1.1.1.1", "2.2.2.2"]);

        let all_sites = distinct(scoped(&records, None), |r| r.site_name.as_str());
        assert_eq!(all_sites, vec!["a.fandom.com", "b.fandom.com"]);
    }
}
