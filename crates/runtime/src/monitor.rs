//! Single update cycle: fetch, store, aggregate, publish.

use crate::{EventSource, Publication, Publisher, aggregate};
use storage::{EventStore, RawEvent};
use tracing::{debug, error, info, warn};

/// Number of raw events exposed to the display by default.
pub const DEFAULT_TAIL: usize = 20;

/// Where the update loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopState {
    /// Waiting for the next tick.
    #[default]
    Idle,
    /// A fetch/store/aggregate/publish cycle is running.
    Ticking,
}

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    /// Rows received from the source.
    pub fetched: usize,
    pub fetch_failed: bool,
    pub inserted: usize,
    pub rejected: usize,
    /// Set when the store failed to write or read this tick.
    pub storage_error: Option<String>,
    /// Events the published snapshot was computed from.
    pub total_events: usize,
    pub published: bool,
}

/// Owns the store, the source and the display for the update loop.
///
/// [`Monitor::tick`] never fails: every fetch, validation or storage error
/// is logged, recorded in the [`TickReport`], and the tick carries on with
/// whatever data is already stored.
pub struct Monitor<S, P> {
    store: EventStore,
    source: S,
    publisher: P,
    tail: usize,
    state: LoopState,
    ticks: u64,
}

impl<S: EventSource, P: Publisher> Monitor<S, P> {
    /// Create a monitor over the given store, source and publisher.
    pub fn new(store: EventStore, source: S, publisher: P) -> Self {
        Self {
            store,
            source,
            publisher,
            tail: DEFAULT_TAIL,
            state: LoopState::Idle,
            ticks: 0,
        }
    }

    /// Set how many recent raw events are published each tick.
    pub fn with_tail(mut self, tail: usize) -> Self {
        self.tail = tail;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn publisher_mut(&mut self) -> &mut P {
        &mut self.publisher
    }

    /// Run one full cycle.
    pub async fn tick(&mut self) -> TickReport {
        self.state = LoopState::Ticking;
        self.ticks += 1;
        let mut report = TickReport {
            tick: self.ticks,
            ..TickReport::default()
        };

        let rows = self.fetch_latest(&mut report).await;
        if !rows.is_empty() {
            self.store_rows(&rows, &mut report);
        }
        self.refresh(&mut report);

        info!(
            tick = report.tick,
            fetched = report.fetched,
            inserted = report.inserted,
            rejected = report.rejected,
            total_events = report.total_events,
            fetch_failed = report.fetch_failed,
            published = report.published,
            "tick complete"
        );

        self.state = LoopState::Idle;
        report
    }

    /// Fetch the provider's batch; any failure becomes an empty batch.
    async fn fetch_latest(&self, report: &mut TickReport) -> Vec<RawEvent> {
        match self.source.fetch().await {
            Ok(rows) => {
                report.fetched = rows.len();
                rows
            }
            Err(e) => {
                warn!(tick = report.tick, error = %e, "fetch failed, showing stored data");
                report.fetch_failed = true;
                Vec::new()
            }
        }
    }

    fn store_rows(&self, rows: &[RawEvent], report: &mut TickReport) {
        match self.store.append(rows) {
            Ok(append) => {
                for rejection in &append.rejected {
                    warn!(
                        tick = report.tick,
                        index = rejection.index,
                        error = %rejection.error,
                        "rejected event row"
                    );
                }
                report.inserted = append.inserted;
                report.rejected = append.rejected.len();
            }
            Err(e) => {
                if let Some(committed) = e.committed() {
                    report.inserted = committed.inserted;
                    report.rejected = committed.rejected.len();
                }
                error!(
                    tick = report.tick,
                    inserted = report.inserted,
                    error = %e,
                    "failed to store events"
                );
                report.storage_error = Some(e.to_string());
            }
        }
    }

    /// Recompute from the full log and publish.
    fn refresh(&mut self, report: &mut TickReport) {
        let events = match self.store.read_all() {
            Ok(events) => events,
            Err(e) => {
                error!(tick = report.tick, error = %e, "failed to read events");
                report.storage_error = Some(e.to_string());
                return;
            }
        };

        let snapshot = aggregate(events.iter().map(|stored| &stored.event));
        if snapshot.is_no_data() {
            debug!(tick = report.tick, "no events stored yet");
        }

        let recent = &events[events.len().saturating_sub(self.tail)..];
        self.publisher.publish(&Publication {
            snapshot: &snapshot,
            recent,
        });

        report.total_events = events.len();
        report.published = true;
    }
}
