//! Presentation boundary.
//!
//! Each tick hands a [`Publication`] to a [`Publisher`]. How it gets
//! rendered (terminal, web page, chart) is the publisher's business.

use crate::OccupancySnapshot;
use chrono::{DateTime, Utc};
use serde::Serialize;
use storage::StoredEvent;
use tokio::sync::watch;

/// What one tick exposes to the display.
#[derive(Debug, Clone, Copy)]
pub struct Publication<'a> {
    /// Scalar metrics and the full cumulative series, or the waiting state.
    pub snapshot: &'a OccupancySnapshot,
    /// The most recent raw events, oldest first.
    pub recent: &'a [StoredEvent],
}

/// Consumer of per-tick publications.
pub trait Publisher {
    fn publish(&mut self, publication: &Publication<'_>);
}

impl<P: Publisher + ?Sized> Publisher for Box<P> {
    fn publish(&mut self, publication: &Publication<'_>) {
        (**self).publish(publication);
    }
}

impl<P: Publisher + ?Sized> Publisher for &mut P {
    fn publish(&mut self, publication: &Publication<'_>) {
        (**self).publish(publication);
    }
}

/// An owned copy of a publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Published {
    pub published_at: DateTime<Utc>,
    pub snapshot: OccupancySnapshot,
    pub recent: Vec<StoredEvent>,
}

impl From<&Publication<'_>> for Published {
    fn from(publication: &Publication<'_>) -> Self {
        Self {
            published_at: Utc::now(),
            snapshot: publication.snapshot.clone(),
            recent: publication.recent.to_vec(),
        }
    }
}

/// Publishes the latest state into a `watch` channel.
///
/// Receivers always see the most recent publication; `None` until the
/// first tick completes.
pub struct WatchPublisher {
    tx: watch::Sender<Option<Published>>,
}

impl WatchPublisher {
    pub fn channel() -> (Self, watch::Receiver<Option<Published>>) {
        let (tx, rx) = watch::channel(None);
        (Self { tx }, rx)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Published>> {
        self.tx.subscribe()
    }
}

impl Publisher for WatchPublisher {
    fn publish(&mut self, publication: &Publication<'_>) {
        // No receivers is fine; the value is kept for later subscribers.
        self.tx.send_replace(Some(Published::from(publication)));
    }
}
