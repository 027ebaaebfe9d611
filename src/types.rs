//! Core types used throughout trade negotiation

use blake2::{Blake2b512, Digest};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch
pub type Timestamp = u64;

/// Stable identifier of an actor (survives reconnects)
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorId(pub String);

impl ActorId {
    /// Derive the offline-mode id for a player name
    ///
    /// Deterministic and case-insensitive: a player who reconnects under any
    /// spelling of the same name keeps their cooldown history.
    pub fn offline(name: &str) -> Self {
        let mut hasher = Blake2b512::new();
        hasher.update(b"OfflinePlayer:");
        hasher.update(name.to_lowercase().as_bytes());
        let result = hasher.finalize();
        Self(hex::encode(&result[..16])) // Use first 16 bytes
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ActorId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Live, addressable actor as returned by the actor directory
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorHandle {
    pub id: ActorId,
    pub name: String,
}

impl ActorHandle {
    pub fn new(id: ActorId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl fmt::Display for ActorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Ordered `(initiator, target)` pair identifying a pending offer
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OfferKey {
    pub initiator: ActorId,
    pub target: ActorId,
}

impl OfferKey {
    pub fn new(initiator: ActorId, target: ActorId) -> Self {
        Self { initiator, target }
    }

    /// Whether the actor is either party of the offer
    pub fn involves(&self, actor: &ActorId) -> bool {
        &self.initiator == actor || &self.target == actor
    }
}

impl fmt::Display for OfferKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.initiator, self.target)
    }
}

/// Registry-unique sequence number of an offer
///
/// Distinguishes two offers that share an `OfferKey` over time, so an
/// expiry signal for a retired offer never touches its replacement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OfferId(pub u64);

impl fmt::Display for OfferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "offer_{}", self.0)
    }
}

/// Identifier handed back by the exchange-session collaborator
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Source of wall-clock time for cooldown bookkeeping
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Default system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }
}

/// Hand-driven clock for tests
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ManualClock(std::sync::atomic::AtomicU64);

#[cfg(test)]
impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self(std::sync::atomic::AtomicU64::new(start))
    }

    pub fn set(&self, now: Timestamp) {
        self.0.store(now, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn advance(&self, by: std::time::Duration) {
        self.0
            .fetch_add(by.as_millis() as u64, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.0.load(std::sync::atomic::Ordering::SeqCst)
    }
}
