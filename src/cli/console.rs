//! Interactive console: one `<player> <command>` per stdin line

use super::app::TradeApp;
use super::commands::{ConsoleLine, PlayerCommand};
use crate::config::SETTING_KEYS;
use crate::error::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Read commands from stdin until EOF or `quit`
pub async fn run_console(app: TradeApp) -> anyhow::Result<()> {
    let events = app.clone();
    let event_loop = tokio::spawn(async move { events.run_event_loop().await });

    println!("Enter '<player> <command>', e.g. 'Alex join' or 'Alex trade Steve'. 'quit' exits.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("quit") {
            break;
        }

        match ConsoleLine::parse_line(line) {
            Ok(parsed) => match execute(&app, parsed) {
                Ok(Some(output)) => println!("{}", output),
                Ok(None) => {}
                Err(e) => tracing::debug!("Command failed: {}", e),
            },
            Err(e) => eprintln!("{}", e),
        }
    }

    event_loop.abort();
    Ok(())
}

/// Run one parsed line, returning console output if the command produces any
///
/// Trade outcomes are reported to players through the notification sink,
/// so only presence, listing and settings commands print here.
pub fn execute(app: &TradeApp, line: ConsoleLine) -> Result<Option<String>> {
    let player = line.player.as_str();

    match line.command {
        PlayerCommand::Join => {
            let handle = app.join(player);
            Ok(Some(format!("{} is online", handle)))
        }
        PlayerCommand::Leave => Ok(Some(match app.leave(player) {
            Some(handle) => format!("{} went offline", handle),
            None => format!("{} is not online", player),
        })),
        PlayerCommand::Trade { target } => app.trade(player, &target).map(|_| None),
        PlayerCommand::Accept { player: initiator } => {
            app.accept(player, initiator.as_deref()).map(|_| None)
        }
        PlayerCommand::Deny { player: initiator } => {
            app.deny(player, initiator.as_deref()).map(|_| None)
        }
        PlayerCommand::Cancel { player: target } => {
            app.cancel(player, target.as_deref()).map(|_| None)
        }
        PlayerCommand::Pending => {
            let (incoming, outgoing) = app.pending(player)?;
            Ok(Some(format!(
                "Incoming: {}\nOutgoing: {}",
                list_or_none(&incoming),
                list_or_none(&outgoing)
            )))
        }
        PlayerCommand::Players => {
            let players = app.tradeable(player)?;
            Ok(Some(format!("Available: {}", list_or_none(&players))))
        }
        PlayerCommand::Config { key, value } => {
            let settings = app.settings();
            match (key, value) {
                (None, _) => {
                    let current = settings.snapshot();
                    let lines: Result<Vec<String>> =
                        SETTING_KEYS.iter().map(|key| current.describe(key)).collect();
                    Ok(Some(lines?.join("\n")))
                }
                (Some(key), None) => Ok(Some(settings.snapshot().describe(&key)?)),
                (Some(key), Some(value)) => {
                    let updated = settings.set(&key, &value)?;
                    Ok(Some(updated.describe(&key)?))
                }
            }
        }
    }
}

fn list_or_none(names: &[String]) -> String {
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}
