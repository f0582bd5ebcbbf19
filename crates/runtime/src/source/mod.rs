//! Remote event source abstraction.
//!
//! Provides a trait for pulling the latest batch of occupancy events, so the
//! update loop can run against the HTTP provider in production and against
//! scripted sources in tests.

mod http;

pub use http::{HttpSource, HttpSourceBuilder};

use crate::FetchError;
use std::future::Future;
use storage::RawEvent;

/// Trait for remote event providers.
///
/// One call issues one request. Implementations must not retry internally;
/// the next scheduled tick is the retry.
pub trait EventSource: Send + Sync {
    /// Fetch the provider's current batch of raw event rows.
    fn fetch(&self) -> impl Future<Output = Result<Vec<RawEvent>, FetchError>> + Send;
}
