use thiserror::Error;

pub type Result<T> = std::result::Result<T, DlogError>;

/// Message used when the service answers with an empty body.
pub const EMPTY_BODY_MESSAGE: &str = "Error: Invalid username or connection issue with Fandom";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DlogError {
    /// The service answered, but not with a page of records. Usually the
    /// subject was rejected; the body is kept as the reason.
    #[error("{0}")]
    InvalidSubject(String),

    /// Transport failure or a response with nothing recognizable in it.
    #[error("{0}")]
    Unavailable(String),
}

impl DlogError {
    /// Human-readable reason carried by either variant.
    pub fn reason(&self) -> &str {
        match self {
            DlogError::InvalidSubject(reason) | DlogError::Unavailable(reason) => reason,
        }
    }
}

impl From<reqwest::Error> for DlogError {
    fn from(err: reqwest::Error) -> Self {
        DlogError::Unavailable(err.to_string())
    }
}
