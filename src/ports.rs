//! Collaborator interfaces consumed by the trade registry
//!
//! The registry owns offer state only. Everything it needs from the host
//! environment (settings, player lookup, the exchange itself, message
//! delivery) comes through these traits.

use crate::config::TradeSettings;
use crate::error::Result;
use crate::types::{ActorHandle, ActorId, SessionId};

/// Read-only view of the current trade settings
pub trait SettingsProvider: Send + Sync {
    fn settings(&self) -> TradeSettings;
}

/// Resolves stored actor ids to live handles
pub trait ActorDirectory: Send + Sync {
    /// Returns `TradeError::ActorUnavailable` when the actor is offline or unknown
    fn resolve(&self, id: &ActorId) -> Result<ActorHandle>;
}

/// Conducts the actual item exchange once both parties confirmed
pub trait ExchangeSessions: Send + Sync {
    /// Takes ownership of the exchange between the two parties
    fn open(&self, initiator: ActorHandle, target: ActorHandle) -> SessionId;
}

/// Delivers rendered messages to actors
///
/// Delivery is best-effort; callers log and drop failures.
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, recipient: &ActorHandle, message: &str) -> Result<()>;
}
