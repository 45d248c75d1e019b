//! Error types for birthday normalization
//!
//! All fallible operations return `Result<T, Error>`.
//! Per-record parse failures are not errors at this level: they are
//! recovered into `Outcome::Unresolved` by the normalizer.

use thiserror::Error;

/// Birthday normalizer error types
#[derive(Debug, Error)]
pub enum Error {
    /// A contact carries more than one birthday entry; merge policy is undefined
    #[error("unsupported: {resource_name} has {count} birthday entries, expected exactly one")]
    UnsupportedMultiEntry { resource_name: String, count: usize },

    /// A birthday marker is present but holds neither a date nor text
    #[error("malformed birthday on {resource_name}: neither date nor text is set")]
    MalformedEntry { resource_name: String },

    /// Original and candidate records of a proposal disagree on identity
    #[error("identifier mismatch: original {original}, candidate {candidate}")]
    IdentifierMismatch { original: String, candidate: String },

    /// `fetch_next` was called before `start`
    #[error("page cursor used before start()")]
    CursorNotStarted,

    /// Transport or authorization failure reported by a contact service
    #[error("service error: {0}")]
    Service(String),

    /// Invalid configuration value
    #[error("config error: {0}")]
    Config(String),

    /// A committing run regenerated a different plan than the one confirmed
    #[error("plan digest mismatch: confirmed {expected}, regenerated {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type alias for birthday operations
pub type Result<T> = std::result::Result<T, Error>;

/// Free text that could not be interpreted as a date
///
/// Recovered locally: the record becomes `Unresolved` and the run continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot parse {text:?} as a date: {reason}")]
pub struct ParseFailure {
    pub text: String,
    pub reason: String,
}

impl ParseFailure {
    pub fn new(text: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            reason: reason.into(),
        }
    }
}
