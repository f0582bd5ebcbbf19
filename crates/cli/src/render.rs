//! Terminal and JSON renderings of each publication.

use std::io::Write;

use chrono::{DateTime, Local, TimeZone, Utc};
use runtime::{Occupancy, OccupancySnapshot, Publication, Published, Publisher};
use storage::StoredEvent;
use tracing::warn;

const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const SPARK_WIDTH: usize = 60;

/// Human-readable dashboard written to a terminal.
pub struct TerminalPublisher<W> {
    out: W,
}

impl<W: Write> TerminalPublisher<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    fn render(&mut self, publication: &Publication<'_>) -> std::io::Result<()> {
        let now = Local::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(self.out, "\n=== Occupancy at {now} ===")?;

        match publication.snapshot {
            OccupancySnapshot::NoData => {
                writeln!(self.out, "No data available")?;
                writeln!(self.out, "Waiting for data...")?;
            }
            OccupancySnapshot::Populated(occupancy) => {
                self.render_metrics(occupancy)?;
                self.render_recent(publication.recent)?;
                self.render_series(occupancy)?;
            }
        }
        self.out.flush()
    }

    fn render_metrics(&mut self, occupancy: &Occupancy) -> std::io::Result<()> {
        writeln!(
            self.out,
            "In building: {:<8}  Total entries: {:<8}  Total exits: {}",
            occupancy.current, occupancy.total_entries, occupancy.total_exits
        )
    }

    fn render_recent(&mut self, recent: &[StoredEvent]) -> std::io::Result<()> {
        writeln!(self.out, "\nLatest events:")?;
        writeln!(self.out, "{:>8}  {:<19}  {:<5}  VALUE", "ID", "TIMESTAMP", "TYPE")?;
        for stored in recent {
            writeln!(
                self.out,
                "{:>8}  {:<19}  {:<5}  {}",
                stored.id,
                local_time(&stored.event.timestamp),
                stored.event.kind,
                stored.event.value
            )?;
        }
        Ok(())
    }

    fn render_series(&mut self, occupancy: &Occupancy) -> std::io::Result<()> {
        let values: Vec<i64> = occupancy.series.iter().map(|p| p.occupancy).collect();
        writeln!(self.out, "\nOccupancy over time ({} points):", values.len())?;
        writeln!(self.out, "{}", sparkline(&values, SPARK_WIDTH))
    }
}

impl<W: Write> Publisher for TerminalPublisher<W> {
    fn publish(&mut self, publication: &Publication<'_>) {
        if let Err(e) = self.render(publication) {
            warn!(error = %e, "failed to render dashboard");
        }
    }
}

/// One JSON document per publication, newline separated.
pub struct JsonPublisher<W> {
    out: W,
}

impl<W: Write> JsonPublisher<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    fn write(&mut self, publication: &Publication<'_>) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.out, &Published::from(publication))?;
        writeln!(self.out)?;
        self.out.flush()
    }
}

impl<W: Write> Publisher for JsonPublisher<W> {
    fn publish(&mut self, publication: &Publication<'_>) {
        if let Err(e) = self.write(publication) {
            warn!(error = %e, "failed to write snapshot");
        }
    }
}

pub fn local_time(ts: &DateTime<Utc>) -> String {
    Local
        .from_utc_datetime(&ts.naive_utc())
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Render the last `width` values as a block-character sparkline.
fn sparkline(values: &[i64], width: usize) -> String {
    let window = &values[values.len().saturating_sub(width)..];
    let (Some(&min), Some(&max)) = (window.iter().min(), window.iter().max()) else {
        return String::new();
    };
    // Widened so the full i64 range cannot overflow.
    let span = (i128::from(max) - i128::from(min)).max(1) as f64;
    let top = SPARK_LEVELS.len() - 1;
    let line: String = window
        .iter()
        .map(|&v| {
            let offset = (i128::from(v) - i128::from(min)) as f64;
            let level = (offset / span * top as f64).round() as usize;
            SPARK_LEVELS[level.min(top)]
        })
        .collect();
    format!("{line}  (min {min}, max {max})")
}
