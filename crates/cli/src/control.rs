//! Operator commands typed on stdin while the monitor runs.

use std::io::BufRead;
use std::sync::Arc;

use runtime::Cadence;
use tokio::sync::watch;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Change the update interval, in seconds.
    Interval(u64),
    Quit,
}

pub fn parse(line: &str) -> Option<Command> {
    let mut words = line.split_whitespace();
    let command = match (words.next()?, words.next()) {
        ("interval", Some(secs)) => Command::Interval(secs.parse().ok()?),
        ("quit" | "exit", None) => Command::Quit,
        _ => return None,
    };
    words.next().is_none().then_some(command)
}

/// Read commands from stdin on a dedicated thread.
///
/// Blocking stdin reads stay off the async runtime so they cannot hold up
/// shutdown. End of input just stops listening.
pub fn spawn(cadence: Arc<Cadence>, stop: Arc<watch::Sender<bool>>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            match parse(&line) {
                Some(Command::Interval(secs)) => {
                    if let Err(e) = cadence.set_interval_secs(secs) {
                        warn!(error = %e, "interval not changed");
                    }
                }
                Some(Command::Quit) => {
                    info!("quit requested");
                    stop.send_replace(true);
                    break;
                }
                None => warn!(
                    input = line.trim(),
                    "unknown command, expected 'interval <secs>' or 'quit'"
                ),
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(parse("interval 5"), Some(Command::Interval(5)));
        assert_eq!(parse("  interval   3 "), Some(Command::Interval(3)));
        assert_eq!(parse("quit"), Some(Command::Quit));
        assert_eq!(parse("exit"), Some(Command::Quit));
    }

    #[test]
    fn rejects_malformed_commands() {
        assert_eq!(parse("interval"), None);
        assert_eq!(parse("interval fast"), None);
        assert_eq!(parse("interval 2 3"), None);
        assert_eq!(parse("quit now"), None);
        assert_eq!(parse("pause"), None);
        assert_eq!(parse(""), None);
    }
}
