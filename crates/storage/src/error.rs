use crate::AppendReport;
use thiserror::Error;

/// Storage-layer failures.
///
/// These are recoverable from the caller's point of view: rows committed
/// before the failure stay committed, and the next write may succeed.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An insert failed part way through a batch. `committed` describes the
    /// rows that were written (and rejected) before the failure.
    #[error("append stopped after {} rows: {source}", .committed.inserted)]
    Append {
        committed: AppendReport,
        #[source]
        source: rusqlite::Error,
    },
}

impl Error {
    /// Rows already committed when a batch append failed.
    pub fn committed(&self) -> Option<&AppendReport> {
        match self {
            Self::Append { committed, .. } => Some(committed),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// A single event row that failed validation.
///
/// Rejected rows are dropped; the rest of their batch is still written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field was absent or null.
    #[error("missing field '{0}'")]
    MissingField(&'static str),

    /// The timestamp is not a string in a recognized ISO-8601 form.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// The event type is outside the entry/exit vocabulary.
    #[error("unknown event type: {0}")]
    UnknownKind(String),

    /// People counts cannot be negative.
    #[error("negative value: {0}")]
    NegativeValue(i64),

    /// The value exceeds the per-event cap.
    #[error("value too large: {0}")]
    ValueTooLarge(i64),

    /// The value is not an integer.
    #[error("invalid value: {0}")]
    InvalidValue(String),
}
