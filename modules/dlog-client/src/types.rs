use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::subject::is_ip;

/// Largest page the service returns. A shorter page is the last one.
pub const PAGE_SIZE: usize = 100;

/// Sentinel `appId` for users who opted out of device tracking.
pub const OPTED_OUT_APP_ID: &str = "opted-out";

/// One observed Discussions action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    /// UTC, second precision, e.g. `2021-03-04T05:06:07Z`. Sorts lexically.
    #[serde(default)]
    pub timestamp: String,
    /// Empty when the action is not tied to a wiki.
    #[serde(default, deserialize_with = "string_or_null")]
    pub site_name: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub user_name: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub user_id: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub ip: String,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default, deserialize_with = "string_or_null")]
    pub app_id: String,
}

impl LogRecord {
    /// Whether the `appId` can be used as a device signal.
    pub fn has_usable_app_id(&self) -> bool {
        !self.app_id.is_empty() && self.app_id != OPTED_OUT_APP_ID
    }

    /// The `userAgent`, if present and non-empty.
    pub fn usable_user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref().filter(|ua| !ua.is_empty())
    }
}

/// The service is loose about scalar types: ids arrive as numbers or strings,
/// and any field may be null.
fn string_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Str(String),
        Int(i64),
        Uint(u64),
        Float(f64),
        Bool(bool),
    }

    Ok(match Option::<Loose>::deserialize(deserializer)? {
        None => String::new(),
        Some(Loose::Str(s)) => s,
        Some(Loose::Int(n)) => n.to_string(),
        Some(Loose::Uint(n)) => n.to_string(),
        Some(Loose::Float(n)) => n.to_string(),
        Some(Loose::Bool(b)) => b.to_string(),
    })
}

/// What a lookup is keyed by. Classified once, at entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Subject {
    User(String),
    Ip(String),
}

impl Subject {
    pub fn classify(raw: &str) -> Self {
        if is_ip(raw) {
            Subject::Ip(raw.to_string())
        } else {
            Subject::User(raw.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Subject::User(name) => name,
            Subject::Ip(ip) => ip,
        }
    }

    pub fn is_ip(&self) -> bool {
        matches!(self, Subject::Ip(_))
    }

    /// The query parameter this subject is sent as.
    pub(crate) fn query_key(&self) -> &'static str {
        match self {
            Subject::User(_) => "username",
            Subject::Ip(_) => "ip",
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resume point for the next page, sent as `ts_from`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor(String);

impl Cursor {
    /// Cursor continuing after `record`: `T` becomes a space, the trailing `Z` goes.
    pub fn after(record: &LogRecord) -> Self {
        let ts = record.timestamp.replacen('T', " ", 1);
        let ts = ts.strip_suffix('Z').unwrap_or(&ts);
        Cursor(ts.to_string())
    }

    /// Cursor for the page after `page`, or `None` when `page` was the last one.
    pub fn next(page: &[LogRecord]) -> Option<Self> {
        if page.len() < PAGE_SIZE {
            return None;
        }
        page.last().map(Cursor::after)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
