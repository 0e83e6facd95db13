//! Line commands typed by the driver on stdin.

use round_controller::{DriverInput, ScanEvent};
use shared::domain::RoundId;

pub const HELP: &str = "\
commands:
  rounds            reload the round list
  select <id>       open the summary of a round
  start             begin navigation
  arrive            open the scanner at the current stop
  scan [payload]    feed one barcode read
  back              leave the current screen
  status            print the current progress
  help              show this text
  quit              stop the driver";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineCommand {
    Input(DriverInput),
    Status,
    Help,
    Quit,
}

/// `Ok(None)` for blank lines.
pub fn parse_line(line: &str) -> Result<Option<LineCommand>, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "" => return Ok(None),
        "rounds" | "refresh" => LineCommand::Input(DriverInput::RefreshRounds),
        "select" => {
            let id = rest
                .parse::<i64>()
                .map_err(|_| format!("select expects a round id, got '{rest}'"))?;
            LineCommand::Input(DriverInput::SelectRound(RoundId(id)))
        }
        "start" => LineCommand::Input(DriverInput::BeginNavigation),
        "arrive" => LineCommand::Input(DriverInput::RequestLocationScan),
        "scan" => {
            let payload = if rest.is_empty() { "manual" } else { rest };
            LineCommand::Input(DriverInput::Scan(ScanEvent::now(payload)))
        }
        "back" => LineCommand::Input(DriverInput::GoBack),
        "status" => LineCommand::Status,
        "help" | "?" => LineCommand::Help,
        "quit" | "exit" => LineCommand::Quit,
        other => return Err(format!("unknown command '{other}', type 'help'")),
    };
    Ok(Some(command))
}
