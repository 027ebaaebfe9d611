//! Trade offer negotiation between players
//!
//! Tracks pending trade requests between pairs of players and resolves them
//! through accept, deny, cancel or timeout:
//! - One pending request per ordered pair of players
//! - Disambiguation when a player has several requests pending
//! - Cooldown after a completed trade
//! - Best-effort notification of both parties

pub mod cli;
pub mod config;
pub mod error;
pub mod exchange;
pub mod negotiation;
pub mod ports;
pub mod presence;
pub mod types;

// Re-export commonly used types
pub use config::{CooldownMode, SettingsStore, TradeSettings};
pub use error::{Result, TradeError};
pub use negotiation::{Acceptance, CooldownTracker, TradeAction, TradeEvent, TradeRegistry};
pub use types::{ActorHandle, ActorId, OfferKey};
