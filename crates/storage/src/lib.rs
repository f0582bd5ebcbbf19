//! SQLite-backed occupancy event storage.
//!
//! This crate provides the durable, append-only log of people entering and
//! leaving a building. It is the single source of truth for everything the
//! monitor displays: occupancy figures are always recomputed from it.
//!
//! # Core Concepts
//!
//! ## RawEvent
//!
//! A [`RawEvent`] is a row exactly as the remote provider sent it. Its
//! fields are untyped until [`RawEvent::validate`] checks them.
//!
//! ## Event
//!
//! An [`Event`] is a validated record: a UTC timestamp, an [`EventKind`]
//! (`entry` or `exit`) and a non-negative people count.
//!
//! ## EventStore
//!
//! The [`EventStore`] wraps a SQLite database with a single
//! `occupancy_events` table. Appends validate row by row: a malformed row
//! yields a [`ValidationError`] in the [`AppendReport`] while its siblings
//! are still written.
//!
//! # Example
//!
//! ```no_run
//! use storage::{EventStore, RawEvent};
//!
//! let store = EventStore::open("dashboard_data.db")?;
//!
//! let report = store.append(&[
//!     RawEvent::new("2024-03-01T09:00:00", "entree", 5),
//!     RawEvent::new("2024-03-01T09:10:00", "sortie", 2),
//! ])?;
//! println!("{} stored, {} rejected", report.inserted, report.rejected.len());
//!
//! for stored in store.read_all()? {
//!     println!("#{} {} {} {}", stored.id, stored.event.timestamp, stored.event.kind, stored.event.value);
//! }
//! # Ok::<(), storage::Error>(())
//! ```

mod error;
mod event;
mod store;

pub use error::{Error, Result, ValidationError};
pub use event::{Event, EventKind, MAX_EVENT_VALUE, RawEvent, StoredEvent, parse_timestamp};
pub use store::{AppendReport, EventStore, Rejection};
