//! Update loop runner.
//!
//! [`run`] drives [`Monitor::tick`] on a fixed, runtime-adjustable cadence
//! until a shutdown signal arrives. The signal is only honoured between
//! ticks: a tick that has started always runs to completion.

use crate::{EventSource, IntervalError, Monitor, Publisher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::futures::Notified;
use tokio::sync::{Notify, watch};
use tokio::time::Instant;
use tracing::info;

pub const MIN_INTERVAL_SECS: u64 = 1;
pub const MAX_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_INTERVAL_SECS: u64 = 1;

/// Delay between ticks, shared with whoever may adjust it at runtime.
#[derive(Debug)]
pub struct Cadence {
    interval_secs: AtomicU64,
    changed: Notify,
}

impl Cadence {
    pub fn new(interval_secs: u64) -> Result<Self, IntervalError> {
        check_interval(interval_secs)?;
        Ok(Self {
            interval_secs: AtomicU64::new(interval_secs),
            changed: Notify::new(),
        })
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs.load(Ordering::Acquire)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs())
    }

    /// Change the interval, returning the previous one.
    ///
    /// A pause already under way is re-timed against the new interval.
    pub fn set_interval_secs(&self, interval_secs: u64) -> Result<u64, IntervalError> {
        check_interval(interval_secs)?;
        let prev = self.interval_secs.swap(interval_secs, Ordering::AcqRel);
        self.changed.notify_waiters();
        info!(prev, interval_secs, "update interval changed");
        Ok(prev)
    }

    /// Resolves on the next successful [`Cadence::set_interval_secs`].
    ///
    /// The future observes changes made any time after it was created.
    pub fn changed(&self) -> Notified<'_> {
        self.changed.notified()
    }
}

impl Default for Cadence {
    fn default() -> Self {
        Self {
            interval_secs: AtomicU64::new(DEFAULT_INTERVAL_SECS),
            changed: Notify::new(),
        }
    }
}

fn check_interval(secs: u64) -> Result<(), IntervalError> {
    if (MIN_INTERVAL_SECS..=MAX_INTERVAL_SECS).contains(&secs) {
        Ok(())
    } else {
        Err(IntervalError {
            secs,
            min: MIN_INTERVAL_SECS,
            max: MAX_INTERVAL_SECS,
        })
    }
}

/// Result of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
}

/// Tick until `shutdown` becomes `true` (or its sender is dropped).
pub async fn run<S, P>(
    monitor: &mut Monitor<S, P>,
    cadence: &Cadence,
    mut shutdown: watch::Receiver<bool>,
) -> RunSummary
where
    S: EventSource,
    P: Publisher,
{
    let mut ticks = 0u64;
    info!(
        interval_secs = cadence.interval_secs(),
        "update loop starting"
    );

    'ticks: loop {
        if *shutdown.borrow_and_update() {
            break;
        }

        monitor.tick().await;
        ticks += 1;
        let paused_at = Instant::now();

        // Pause until the interval has elapsed, re-reading it whenever it
        // changes so a shorter interval applies to the current pause.
        loop {
            if *shutdown.borrow_and_update() {
                break 'ticks;
            }
            let interval_changed = cadence.changed();
            let deadline = paused_at + cadence.interval();

            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => break,
                _ = interval_changed => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        info!("shutdown sender dropped");
                        break 'ticks;
                    }
                }
            }
        }
    }

    info!(ticks, "update loop stopped");
    RunSummary { ticks }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cadence_bounds() {
        assert!(Cadence::new(0).is_err());
        assert!(Cadence::new(11).is_err());
        assert_eq!(Cadence::new(10).unwrap().interval_secs(), 10);
        assert_eq!(Cadence::default().interval(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn set_interval_wakes_pending_change() {
        let cadence = Cadence::new(5).unwrap();
        let changed = cadence.changed();
        cadence.set_interval_secs(3).unwrap();
        changed.await;

        let changed = cadence.changed();
        assert!(cadence.set_interval_secs(0).is_err());
        assert!(
            tokio::time::timeout(Duration::from_millis(20), changed)
                .await
                .is_err()
        );
    }

    #[test]
    fn set_interval_returns_previous() {
        let cadence = Cadence::new(2).unwrap();
        assert_eq!(cadence.set_interval_secs(5), Ok(2));
        assert_eq!(cadence.interval_secs(), 5);

        let err = cadence.set_interval_secs(42).unwrap_err();
        assert_eq!(
            err,
            IntervalError {
                secs: 42,
                min: 1,
                max: 10
            }
        );
        assert_eq!(cadence.interval_secs(), 5);
    }
}
