//! SQLite event store implementation.

use crate::event::format_timestamp;
use crate::{
    Error, Event, EventKind, MAX_EVENT_VALUE, RawEvent, Result, StoredEvent, ValidationError,
};
use rusqlite::{Connection, Row, params};
use std::path::Path;
use tracing::warn;

const SELECT_COLUMNS: &str = "SELECT id, timestamp, type, value FROM occupancy_events";

/// A row that was dropped from a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Position of the row in the submitted batch.
    pub index: usize,
    pub error: ValidationError,
}

/// Outcome of appending one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppendReport {
    pub inserted: usize,
    pub rejected: Vec<Rejection>,
}

impl AppendReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// SQLite-backed append-only occupancy event log.
///
/// The store owns its connection; there is no process-wide handle. Each
/// row is written by its own autocommitted `INSERT`, so a failure part way
/// through a batch leaves every earlier row intact. The store assumes a
/// single writer: callers sharing it across writers must serialize calls
/// to [`EventStore::append`].
pub struct EventStore {
    conn: Connection,
}

impl EventStore {
    /// Open or create an event store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize()?;
        Ok(store)
    }

    /// Create an in-memory event store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize()?;
        Ok(store)
    }

    /// Create the events table and its index if they do not exist yet.
    ///
    /// Safe to call any number of times; existing rows are never touched.
    pub fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS occupancy_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                type TEXT NOT NULL,
                value INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_occupancy_events_time
                ON occupancy_events(timestamp, id);
            "#,
        )?;
        Ok(())
    }

    /// Validate and append a batch of provider rows, in order.
    ///
    /// Invalid rows are skipped and listed in the report. A database
    /// failure stops the batch with [`Error::Append`], which carries the
    /// report for the rows written before it; those remain committed.
    pub fn append(&self, batch: &[RawEvent]) -> Result<AppendReport> {
        let mut report = AppendReport::default();
        for (index, raw) in batch.iter().enumerate() {
            match raw.validate() {
                Ok(event) => match self.insert(&event) {
                    Ok(_) => report.inserted += 1,
                    Err(source) => {
                        return Err(Error::Append {
                            committed: report,
                            source,
                        });
                    }
                },
                Err(error) => report.rejected.push(Rejection { index, error }),
            }
        }
        Ok(report)
    }

    /// Append already validated events, in order. Returns their new ids.
    pub fn append_events(&self, events: &[Event]) -> Result<Vec<i64>> {
        let ids: Vec<i64> = events
            .iter()
            .map(|event| self.insert(event))
            .collect::<rusqlite::Result<_>>()?;
        Ok(ids)
    }

    fn insert(&self, event: &Event) -> rusqlite::Result<i64> {
        self.conn.execute(
            "INSERT INTO occupancy_events (timestamp, type, value) VALUES (?1, ?2, ?3)",
            params![
                format_timestamp(&event.timestamp),
                event.kind.as_str(),
                event.value,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Load every event, oldest first; ties keep insertion order.
    pub fn read_all(&self) -> Result<Vec<StoredEvent>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SELECT_COLUMNS} ORDER BY timestamp, id"))?;
        let rows = stmt.query_map([], raw_row)?;
        collect_rows(rows)
    }

    /// The most recent `limit` events, still oldest first.
    pub fn tail(&self, limit: usize) -> Result<Vec<StoredEvent>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT * FROM ({SELECT_COLUMNS} ORDER BY timestamp DESC, id DESC LIMIT ?1)
             ORDER BY timestamp, id"
        ))?;
        let rows = stmt.query_map([limit], raw_row)?;
        collect_rows(rows)
    }

    /// Number of stored events.
    pub fn count(&self) -> Result<usize> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM occupancy_events", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

type RawRow = (i64, String, String, i64);

fn raw_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn collect_rows(
    rows: impl Iterator<Item = rusqlite::Result<RawRow>>,
) -> Result<Vec<StoredEvent>> {
    let mut events = Vec::new();
    for row in rows {
        let (id, timestamp, kind, value) = row?;
        match decode_row(&timestamp, &kind, value) {
            Some(event) => events.push(StoredEvent { id, event }),
            None => warn!(id, %timestamp, %kind, value, "skipping undecodable stored event"),
        }
    }
    Ok(events)
}

fn decode_row(timestamp: &str, kind: &str, value: i64) -> Option<Event> {
    if !(0..=MAX_EVENT_VALUE).contains(&value) {
        return None;
    }
    let kind: EventKind = kind.parse().ok()?;
    Some(Event {
        timestamp: timestamp.parse().ok()?,
        kind,
        value,
    })
}
