//! Occupancy runtime — the fetch, store, aggregate and publish loop.
//!
//! This crate turns a remote feed of entry/exit events into a live
//! occupancy display.
//!
//! # Overview
//!
//! The runtime is organized around these concepts:
//!
//! - **EventSource**: a trait abstracting the remote provider; [`HttpSource`]
//!   pulls a JSON batch with one `GET`.
//! - **aggregate**: a pure function folding the ordered event log into an
//!   [`OccupancySnapshot`].
//! - **Monitor**: owns the store, source and publisher and runs one tick at
//!   a time. Errors never escape a tick.
//! - **run**: drives the monitor on a [`Cadence`] until shutdown.
//! - **Publisher**: the presentation boundary.
//!
//! # Example
//!
//! ```no_run
//! use runtime::{Cadence, HttpSource, Monitor, WatchPublisher, run};
//! use storage::EventStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = EventStore::open("dashboard_data.db")?;
//! let source = HttpSource::builder("http://localhost:5000/api/donnees").build()?;
//! let (publisher, mut updates) = WatchPublisher::channel();
//!
//! let mut monitor = Monitor::new(store, source, publisher);
//! let cadence = Cadence::new(2)?;
//! let (_stop, shutdown) = tokio::sync::watch::channel(false);
//!
//! tokio::spawn(async move {
//!     while updates.changed().await.is_ok() {
//!         if let Some(update) = updates.borrow().as_ref() {
//!             println!("{:?}", update.snapshot.current());
//!         }
//!     }
//! });
//!
//! run(&mut monitor, &cadence, shutdown).await;
//! # Ok(())
//! # }
//! ```

mod aggregate;
mod error;
mod monitor;
mod publish;
mod runner;
mod source;

pub use aggregate::{Occupancy, OccupancySnapshot, SeriesPoint, aggregate};
pub use error::{FetchError, IntervalError};
pub use monitor::{DEFAULT_TAIL, LoopState, Monitor, TickReport};
pub use publish::{Publication, Published, Publisher, WatchPublisher};
pub use runner::{
    Cadence, DEFAULT_INTERVAL_SECS, MAX_INTERVAL_SECS, MIN_INTERVAL_SECS, RunSummary, run,
};
pub use source::{EventSource, HttpSource, HttpSourceBuilder};
