//! Terminal front end for `--headless` runs.
//!
//! Journal entries are printed as they are appended. Each stdin line is one
//! operator command:
//!
//! | input          | action                         |
//! |----------------|--------------------------------|
//! | `calibrate`    | press the calibrate control    |
//! | `threshold N`  | move the threshold slider      |
//! | `min-area N`   | move the minimum area slider   |
//! | `save`         | save the settings draft        |
//! | `settings`     | toggle the settings panel      |
//! | `status`       | print a one-line JSON summary  |
//! | `quit`         | leave                          |

use crate::controller::ControllerHandle;
use crate::error::Result;
use crate::session::{LogEntry, Snapshot, UserAction};
use std::io::Write;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};

/// One parsed input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Forward to the controller.
    Action(UserAction),
    /// Print the status summary.
    Status,
    /// Leave the console.
    Quit,
}

/// Why an input line was not understood.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Unrecognized verb.
    #[error("unknown command '{0}' (try: calibrate, threshold N, min-area N, save, settings, status, quit)")]
    Unknown(String),
    /// Verb needs an integer argument.
    #[error("'{0}' expects an integer argument")]
    MissingValue(&'static str),
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Option<std::result::Result<ConsoleCommand, CommandError>> {
    let mut words = line.split_whitespace();
    let verb = words.next()?;
    let value = words.next().and_then(|w| w.trim_end_matches('%').parse::<i32>().ok());

    let command = match verb.to_lowercase().as_str() {
        "calibrate" => Ok(ConsoleCommand::Action(UserAction::Calibrate)),
        "save" => Ok(ConsoleCommand::Action(UserAction::SaveSettings)),
        "settings" => Ok(ConsoleCommand::Action(UserAction::ToggleSettings)),
        "threshold" => value
            .map(|v| ConsoleCommand::Action(UserAction::SetThreshold(v)))
            .ok_or(CommandError::MissingValue("threshold")),
        "min-area" | "min_area" => value
            .map(|v| ConsoleCommand::Action(UserAction::SetMinAreaPercent(v)))
            .ok_or(CommandError::MissingValue("min-area")),
        "status" => Ok(ConsoleCommand::Status),
        "quit" | "exit" => Ok(ConsoleCommand::Quit),
        other => Err(CommandError::Unknown(other.to_string())),
    };
    Some(command)
}

/// Entries appended since `seen_revision`, oldest first.
///
/// Entries evicted before they could be printed are skipped.
#[must_use]
pub fn unseen_entries(snapshot: &Snapshot, seen_revision: u64) -> &[LogEntry] {
    let new = snapshot.log_revision.saturating_sub(seen_revision);
    let new = usize::try_from(new).unwrap_or(usize::MAX).min(snapshot.log.len());
    &snapshot.log[snapshot.log.len() - new..]
}

/// Run until `quit`, end of input, or the controller goes away.
pub async fn run(handle: ControllerHandle) -> Result<()> {
    let mut snapshots = handle.subscribe();
    let mut seen_revision = 0;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        {
            let snapshot = snapshots.borrow_and_update();
            print_entries(unseen_entries(&snapshot, seen_revision))?;
            seen_revision = snapshot.log_revision;
        }

        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    tracing::info!("Controller stopped");
                    return Ok(());
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    return Ok(());
                };
                match parse_command(&line) {
                    None => {}
                    Some(Ok(ConsoleCommand::Action(action))) => handle.send(action)?,
                    Some(Ok(ConsoleCommand::Status)) => {
                        let summary = handle.snapshot().summary();
                        println!("{}", serde_json::to_string(&summary)?);
                    }
                    Some(Ok(ConsoleCommand::Quit)) => return Ok(()),
                    Some(Err(e)) => eprintln!("{e}"),
                }
            }
        }
    }
}

fn print_entries(entries: &[LogEntry]) -> Result<()> {
    if entries.is_empty() {
        return Ok(());
    }
    let mut out = std::io::stdout().lock();
    for entry in entries {
        let marker = if entry.is_error() { "!" } else { " " };
        writeln!(out, "{marker} {entry}")?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Event, Session, TransportEvent};
    use tokio::time::Instant;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            parse_command("calibrate"),
            Some(Ok(ConsoleCommand::Action(UserAction::Calibrate)))
        );
        assert_eq!(
            parse_command("  threshold 45 "),
            Some(Ok(ConsoleCommand::Action(UserAction::SetThreshold(45))))
        );
        assert_eq!(
            parse_command("min-area 12%"),
            Some(Ok(ConsoleCommand::Action(UserAction::SetMinAreaPercent(12))))
        );
        assert_eq!(parse_command("STATUS"), Some(Ok(ConsoleCommand::Status)));
        assert_eq!(parse_command(""), None);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            parse_command("threshold high"),
            Some(Err(CommandError::MissingValue("threshold")))
        );
        assert!(matches!(
            parse_command("open-door"),
            Some(Err(CommandError::Unknown(_)))
        ));
    }

    #[test]
    fn test_unseen_entries() {
        let mut session = Session::default();
        let first = session.snapshot();
        assert_eq!(unseen_entries(&first, 0).len(), 1);
        assert!(unseen_entries(&first, first.log_revision).is_empty());

        session.handle(Event::Transport(TransportEvent::Connected), Instant::now());
        let second = session.snapshot();
        let unseen = unseen_entries(&second, first.log_revision);
        assert_eq!(unseen.len(), 1);
        assert_eq!(unseen[0].message(), "Connected to server");
    }
}
