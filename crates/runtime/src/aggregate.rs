//! Occupancy aggregation.
//!
//! Folds the ordered event log into a running occupancy count. Entries add
//! their value, exits subtract it, and the prefix sums form the series.
//! Occupancy is never clamped: a negative count means the upstream data
//! recorded more exits than entries and is shown as such.

use chrono::{DateTime, Utc};
use serde::Serialize;
use storage::{Event, EventKind, MAX_EVENT_VALUE};

/// Occupancy right after one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub occupancy: i64,
}

/// Figures derived from a non-empty event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Occupancy {
    /// People currently inside; may be negative.
    pub current: i64,
    pub total_entries: i64,
    pub total_exits: i64,
    /// One point per event, in timestamp order.
    pub series: Vec<SeriesPoint>,
}

/// Result of aggregating the whole event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OccupancySnapshot {
    /// No events stored yet; the display should show a waiting state.
    NoData,
    Populated(Occupancy),
}

impl OccupancySnapshot {
    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::NoData)
    }

    pub fn occupancy(&self) -> Option<&Occupancy> {
        match self {
            Self::NoData => None,
            Self::Populated(occupancy) => Some(occupancy),
        }
    }

    pub fn current(&self) -> Option<i64> {
        self.occupancy().map(|o| o.current)
    }
}

/// Aggregate events that are already in timestamp order.
///
/// Sums are exact while every value is at most [`MAX_EVENT_VALUE`], which
/// the store enforces, and the log holds fewer than 2^31 events.
pub fn aggregate<'a, I>(events: I) -> OccupancySnapshot
where
    I: IntoIterator<Item = &'a Event>,
{
    let mut current = 0i64;
    let mut total_entries = 0i64;
    let mut total_exits = 0i64;
    let mut series = Vec::new();

    for event in events {
        match event.kind {
            EventKind::Entry => total_entries = total_entries.saturating_add(event.value),
            EventKind::Exit => total_exits = total_exits.saturating_add(event.value),
        }
        current = current.saturating_add(event.delta());
        series.push(SeriesPoint {
            timestamp: event.timestamp,
            occupancy: current,
        });
    }

    if series.is_empty() {
        return OccupancySnapshot::NoData;
    }

    OccupancySnapshot::Populated(Occupancy {
        current,
        total_entries,
        total_exits,
        series,
    })
}
