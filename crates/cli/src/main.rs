mod config;
mod control;
mod error;
mod render;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use runtime::{Cadence, HttpSource, Monitor, Publication, Publisher, aggregate};
use storage::{EventStore, StoredEvent};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::Config;
use error::{Error, Result};
use render::{JsonPublisher, TerminalPublisher, local_time};

const CONFIG_FILE: &str = "occupancy.toml";

#[derive(Parser)]
#[command(name = "occupancy")]
#[command(about = "Live building occupancy from an entry/exit event feed", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults apply if the default file is absent)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Provider endpoint, overrides config and environment
    #[arg(long, global = true)]
    url: Option<String>,

    /// SQLite database file, overrides config and environment
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the provider and keep the dashboard updated
    Run {
        /// Seconds between updates (1-10)
        #[arg(short, long)]
        interval: Option<u64>,
        /// Number of recent events to show
        #[arg(short, long)]
        tail: Option<usize>,
        /// Run a single update and exit
        #[arg(long)]
        once: bool,
        /// Emit one JSON document per update instead of the dashboard
        #[arg(long)]
        json: bool,
    },
    /// Show occupancy computed from stored events, without fetching
    Stats {
        /// Emit JSON instead of the dashboard
        #[arg(long)]
        json: bool,
    },
    /// Show the most recent stored events
    Tail {
        /// Number of events to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Some(Commands::Run {
            interval,
            tail,
            once,
            json,
        }) => cmd_run(config, interval, tail, once, json).await,
        None => cmd_run(config, None, None, false, false).await,
        Some(Commands::Stats { json }) => cmd_stats(&config, json),
        Some(Commands::Tail { limit }) => cmd_tail(&config, limit),
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(CONFIG_FILE)?,
    }
    .with_env(|key| std::env::var(key).ok());

    if let Some(url) = &cli.url {
        config.source.url = url.clone();
    }
    if let Some(db) = &cli.db {
        config.store.path = db.clone();
    }
    config.validate()?;
    Ok(config)
}

fn publisher(json: bool) -> Box<dyn Publisher> {
    if json {
        Box::new(JsonPublisher::new(io::stdout()))
    } else {
        Box::new(TerminalPublisher::new(io::stdout()))
    }
}

async fn cmd_run(
    config: Config,
    interval: Option<u64>,
    tail: Option<usize>,
    once: bool,
    json: bool,
) -> Result<()> {
    let cadence = Arc::new(Cadence::new(
        interval.unwrap_or(config.display.interval_secs),
    )?);

    let store = EventStore::open(&config.store.path)?;
    let source = HttpSource::builder(&config.source.url)
        .timeout(config.source.timeout())
        .build()?;
    info!(
        source = %source,
        db = %config.store.path.display(),
        interval_secs = cadence.interval_secs(),
        "occupancy monitor starting"
    );

    let mut monitor = Monitor::new(store, source, publisher(json))
        .with_tail(tail.unwrap_or(config.display.tail));

    if once {
        monitor.tick().await;
        return Ok(());
    }

    let (stop_tx, stop_rx) = watch::channel(false);
    let stop_tx = Arc::new(stop_tx);

    let ctrl_c = Arc::clone(&stop_tx);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("interrupt received, stopping after current update"),
            Err(e) => warn!(error = %e, "failed to listen for interrupt"),
        }
        ctrl_c.send_replace(true);
    });
    control::spawn(Arc::clone(&cadence), Arc::clone(&stop_tx));

    let summary = runtime::run(&mut monitor, &cadence, stop_rx).await;
    info!(ticks = summary.ticks, "occupancy monitor stopped");
    Ok(())
}

fn cmd_stats(config: &Config, json: bool) -> Result<()> {
    let store = open_store(config)?;
    let events = store.read_all()?;
    let snapshot = aggregate(events.iter().map(|stored| &stored.event));
    let recent = &events[events.len().saturating_sub(config.display.tail)..];

    publisher(json).publish(&Publication {
        snapshot: &snapshot,
        recent,
    });
    Ok(())
}

fn cmd_tail(config: &Config, limit: usize) -> Result<()> {
    let store = open_store(config)?;
    let events = store.tail(limit)?;

    if events.is_empty() {
        println!("No events stored yet.");
        return Ok(());
    }

    for stored in &events {
        print_event(stored);
    }
    Ok(())
}

fn print_event(stored: &StoredEvent) {
    let sign = match stored.event.kind {
        storage::EventKind::Entry => '+',
        storage::EventKind::Exit => '-',
    };
    println!(
        "[{}] #{:<6} {:<5} {sign}{}",
        local_time(&stored.event.timestamp),
        stored.id,
        stored.event.kind,
        stored.event.value
    );
}

fn open_store(config: &Config) -> Result<EventStore> {
    let db_path = &config.store.path;

    if !db_path.exists() {
        return Err(Error::DatabaseNotFound {
            path: db_path.clone(),
        });
    }

    Ok(EventStore::open(db_path)?)
}
