use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::info;

use crate::error::{LookupError, Result};

/// Whose device signals count when a check is scoped to one wiki.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignalScope {
    /// User agents and app ids from the subject's whole history.
    #[default]
    AllActivity,
    /// Only from the subject's records on the scoped wiki.
    ScopedWiki,
}

impl FromStr for SignalScope {
    type Err = LookupError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(SignalScope::AllActivity),
            "wiki" => Ok(SignalScope::ScopedWiki),
            other => Err(LookupError::Config(format!(
                "LOOKUP_SIGNAL_SCOPE must be \"all\" or \"wiki\", got \"{other}\""
            ))),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Log service
    pub dlog_endpoint: String,
    pub dlog_access_token: String,
    pub dlog_timeout: Duration,

    // Paging
    pub page_cap: usize,
    pub ip_page_cap: usize,
    /// Progress notice fires when this many pages of the budget remain. 0 disables it.
    pub progress_remaining: usize,

    // Correlation
    pub ip_concurrency: usize,
    pub signal_scope: SignalScope,

    // Display
    pub command_prefix: String,
    pub default_site: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| LookupError::Config(format!("{key} environment variable is required")))
        };

        Ok(Self {
            dlog_endpoint: required("DLOG_ENDPOINT")?,
            dlog_access_token: required("DLOG_ACCESS_TOKEN")?,
            dlog_timeout: Duration::from_secs(parsed(&lookup, "DLOG_TIMEOUT_SECS", 30)?),
            page_cap: positive(&lookup, "LOOKUP_PAGE_CAP", 8)?,
            ip_page_cap: positive(&lookup, "LOOKUP_IP_PAGE_CAP", 8)?,
            progress_remaining: parsed(&lookup, "LOOKUP_PROGRESS_REMAINING", 4)?,
            ip_concurrency: positive(&lookup, "LOOKUP_IP_CONCURRENCY", 8)?,
            signal_scope: match lookup("LOOKUP_SIGNAL_SCOPE") {
                Some(v) => v.parse()?,
                None => SignalScope::default(),
            },
            command_prefix: lookup("LOOKUP_COMMAND_PREFIX").unwrap_or_else(|| "!".to_string()),
            default_site: lookup("LOOKUP_DEFAULT_SITE")
                .unwrap_or_else(|| "community.fandom.com".to_string()),
        })
    }

    /// Log the effective configuration without the access token.
    pub fn log_redacted(&self) {
        info!(
            dlog_endpoint = self.dlog_endpoint.as_str(),
            dlog_access_token = redact(&self.dlog_access_token).as_str(),
            dlog_timeout_secs = self.dlog_timeout.as_secs(),
            page_cap = self.page_cap,
            ip_page_cap = self.ip_page_cap,
            progress_remaining = self.progress_remaining,
            ip_concurrency = self.ip_concurrency,
            signal_scope = ?self.signal_scope,
            command_prefix = self.command_prefix.as_str(),
            default_site = self.default_site.as_str(),
            "Loaded configuration"
        );
    }
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| LookupError::Config(format!("{key} must be a number, got \"{raw}\""))),
    }
}

fn positive<F>(lookup: &F, key: &str, default: usize) -> Result<usize>
where
    F: Fn(&str) -> Option<String>,
{
    match parsed(lookup, key, default)? {
        0 => Err(LookupError::Config(format!("{key} must be at least 1"))),
        n => Ok(n),
    }
}

fn redact(secret: &str) -> String {
    match secret.chars().count() {
        0 => String::new(),
        n if n <= 8 => "*".repeat(n),
        n => {
            let head: String = secret.chars().take(4).collect();
            format!("{head}…{}", "*".repeat(n.min(12) - 4))
        }
    }
}
