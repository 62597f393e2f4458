use dlog_client::DlogError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LookupError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error(transparent)]
    Upstream(#[from] DlogError),

    #[error("Cannot lookup the wikis for an IP: {0}")]
    IpNotSupported(String),

    #[error("No username provided")]
    EmptySubject,

    #[error("Configuration error: {0}")]
    Config(String),
}
