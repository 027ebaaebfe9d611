//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tradeoffer")]
#[command(about = "Player-to-player trade request negotiation", long_about = None)]
pub struct Cli {
    /// Settings file, created with defaults if missing
    #[arg(short, long, global = true, default_value = "trade-settings.json")]
    pub settings: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run an interactive console reading `<player> <command>` lines from stdin
    Console,

    /// Inspect or change trade settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Drive concurrent random trading between simulated players
    Simulate {
        /// Number of simulated players
        #[arg(short, long, default_value = "6")]
        players: usize,

        /// Number of random commands to issue
        #[arg(short, long, default_value = "200")]
        rounds: usize,

        /// Seed for reproducible runs
        #[arg(long)]
        seed: Option<u64>,

        /// Offer timeout in seconds for the run
        #[arg(long, default_value = "1")]
        timeout: u64,

        /// Cooldown in seconds for the run
        #[arg(long, default_value = "0")]
        cooldown: u64,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show every setting
    Show,

    /// Show one setting
    Get {
        /// timeout, cooldown or cooldown-mode
        key: String,
    },

    /// Change one setting and save it
    Set {
        /// timeout, cooldown or cooldown-mode
        key: String,

        /// New value
        value: String,
    },
}

/// One console line: the acting player followed by their command
#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_help_flag = true)]
pub struct ConsoleLine {
    /// Acting player
    pub player: String,

    #[command(subcommand)]
    pub command: PlayerCommand,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum PlayerCommand {
    /// Come online
    Join,

    /// Go offline
    Leave,

    /// Send a trade request
    Trade {
        /// Player to trade with
        target: String,
    },

    /// Accept a pending request
    Accept {
        /// Player who sent the request
        player: Option<String>,
    },

    /// Deny a pending request
    Deny {
        /// Player who sent the request
        player: Option<String>,
    },

    /// Withdraw a request you sent
    Cancel {
        /// Player the request was sent to
        player: Option<String>,
    },

    /// List pending requests
    Pending,

    /// List online players free to trade with
    Players,

    /// Show or change a setting
    Config {
        key: Option<String>,
        value: Option<String>,
    },
}

impl ConsoleLine {
    /// Parse a whitespace-separated console line
    pub fn parse_line(line: &str) -> Result<Self, clap::Error> {
        Self::try_parse_from(line.split_whitespace())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
        ConsoleLine::command().debug_assert();
    }

    #[test]
    fn test_parse_trade_line() {
        let line = ConsoleLine::parse_line("Alex trade Steve").unwrap();

        assert_eq!(line.player, "Alex");
        assert_eq!(
            line.command,
            PlayerCommand::Trade {
                target: "Steve".to_string()
            }
        );
    }

    #[test]
    fn test_parse_optional_counterpart() {
        let bare = ConsoleLine::parse_line("Steve accept").unwrap();
        let named = ConsoleLine::parse_line("  Steve   deny   Alex ").unwrap();

        assert_eq!(bare.command, PlayerCommand::Accept { player: None });
        assert_eq!(
            named.command,
            PlayerCommand::Deny {
                player: Some("Alex".to_string())
            }
        );
    }

    #[test]
    fn test_parse_config_line() {
        let line = ConsoleLine::parse_line("Alex config timeout 30").unwrap();

        assert_eq!(
            line.command,
            PlayerCommand::Config {
                key: Some("timeout".to_string()),
                value: Some("30".to_string())
            }
        );
    }

    #[test]
    fn test_parse_players_line() {
        let line = ConsoleLine::parse_line("Alex players").unwrap();
        assert_eq!(line.command, PlayerCommand::Players);
    }

    #[test]
    fn test_parse_rejects_unknown_command() {
        assert!(ConsoleLine::parse_line("Alex fly").is_err());
        assert!(ConsoleLine::parse_line("Alex").is_err());
    }

    #[test]
    fn test_simulate_defaults() {
        let cli = Cli::try_parse_from(["tradeoffer", "simulate"]).unwrap();

        match cli.command {
            Commands::Simulate {
                players,
                rounds,
                seed,
                ..
            } => {
                assert_eq!(players, 6);
                assert_eq!(rounds, 200);
                assert!(seed.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert_eq!(cli.settings, PathBuf::from("trade-settings.json"));
    }
}
