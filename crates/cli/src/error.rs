//! CLI error types.

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;

/// CLI errors.
///
/// Only startup and one-shot command failures end up here; errors inside
/// the update loop are logged and never reach `main`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The database file does not exist.
    ///
    /// This typically means the monitor has never run.
    #[error("database not found at {path}. Run 'occupancy run' first")]
    DatabaseNotFound { path: PathBuf },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Interval(#[from] runtime::IntervalError),

    #[error(transparent)]
    Source(#[from] runtime::FetchError),

    #[error(transparent)]
    Storage(#[from] storage::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
