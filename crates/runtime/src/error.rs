use thiserror::Error;

/// Failure to obtain a batch from the remote provider.
///
/// Always recoverable: the update loop logs it and retries on the next tick.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FetchError {
    #[error("HTTP client error: {0}")]
    Client(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("provider returned HTTP {0}")]
    Status(u16),

    #[error("could not decode provider payload: {0}")]
    Decode(String),
}

/// Requested update interval is outside the allowed range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("update interval must be between {min} and {max} seconds, got {secs}")]
pub struct IntervalError {
    pub secs: u64,
    pub min: u64,
    pub max: u64,
}
