use crate::settings::Quality;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// Commands the user can type at the prompt. These are the screen's "form
/// fields" and buttons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Record,
    Stop,
    Length(u32),
    Size(u64),
    Quality(Quality),
    Compress(bool),
    Allow,
    Show,
    Save,
    Load,
    Quit,
}

pub const HELP: &str = "commands: record | stop | length <secs> | size <mb> | quality low|high | \
compress on|off | allow | show | save | load | quit";

/// Parse one input line. `Ok(None)` for blank lines, `Err` with a message
/// for anything unrecognized.
pub fn parse(line: &str) -> Result<Option<Command>, String> {
    let mut parts = line.split_whitespace();
    let Some(word) = parts.next() else {
        return Ok(None);
    };
    let arg = parts.next();

    let command = match (word, arg) {
        ("record", None) => Command::Record,
        ("stop", None) => Command::Stop,
        ("length", Some(v)) => {
            let secs = v
                .parse::<u32>()
                .map_err(|_| format!("invalid length '{}', expected seconds", v))?;
            Command::Length(secs)
        }
        ("size", Some(v)) => {
            let mb = v
                .parse::<u64>()
                .map_err(|_| format!("invalid size '{}', expected MB", v))?;
            Command::Size(mb)
        }
        ("quality", Some("low")) => Command::Quality(Quality::Low),
        ("quality", Some("high")) => Command::Quality(Quality::High),
        ("compress", Some("on")) => Command::Compress(true),
        ("compress", Some("off")) => Command::Compress(false),
        ("allow", None) => Command::Allow,
        ("show", None) => Command::Show,
        ("save", None) => Command::Save,
        ("load", None) => Command::Load,
        ("quit", None) | ("exit", None) => Command::Quit,
        _ => return Err(format!("unknown command '{}'. {}", line.trim(), HELP)),
    };

    if parts.next().is_some() {
        return Err(format!("unknown command '{}'. {}", line.trim(), HELP));
    }

    Ok(Some(command))
}

/// Read stdin line by line and forward parsed commands to the controller.
/// Exits when stdin closes or the controller goes away.
pub async fn read_commands(tx: mpsc::Sender<Command>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match parse(&line) {
                Ok(Some(command)) => {
                    if tx.send(command).await.is_err() {
                        break;
                    }
                }
                Ok(None) => {}
                Err(msg) => eprintln!("{}", msg),
            },
            Ok(None) => {
                tracing::debug!("stdin closed");
                break;
            }
            Err(e) => {
                tracing::warn!("Failed to read stdin: {}", e);
                break;
            }
        }
    }
}
