//! Command-line front end

pub mod app;
pub mod commands;
pub mod console;
pub mod simulate;

pub use app::TradeApp;
pub use commands::{Cli, Commands, ConfigAction, ConsoleLine, PlayerCommand};
pub use console::run_console;
pub use simulate::{simulate, SimulationReport};
