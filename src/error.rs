//! Error types for trade negotiation

use crate::types::ActorId;
use std::time::Duration;
use thiserror::Error;

/// Main error type for trade negotiation
#[derive(Error, Debug)]
pub enum TradeError {
    // Offer creation errors
    #[error("Cannot trade with yourself")]
    SelfTrade,

    #[error("A trade request to that player is already pending")]
    DuplicateOffer,

    #[error("Trade cooldown active: {}s remaining", .remaining.as_secs().max(1))]
    OnCooldown { remaining: Duration },

    // Resolution errors
    #[error("No pending trade requests")]
    NoOffers,

    #[error("No pending trade request with that player")]
    NoSuchOffer,

    #[error("Multiple pending trade requests: {}", join_ids(.0))]
    Ambiguous(Vec<ActorId>),

    // Directory errors
    #[error("Player unavailable: {0}")]
    ActorUnavailable(ActorId),

    // Configuration errors
    #[error("Unknown setting: {0}")]
    UnknownSetting(String),

    #[error("Invalid configuration value for {key}: {reason}")]
    InvalidConfig { key: String, reason: String },

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn join_ids(ids: &[ActorId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias for trade operations
pub type Result<T> = std::result::Result<T, TradeError>;
