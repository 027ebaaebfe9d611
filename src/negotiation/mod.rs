//! Trade negotiation: pending offers, expiry and cooldowns

pub mod cooldown;
pub mod offer;
pub mod registry;
pub mod timer;
pub mod types;

pub use cooldown::CooldownTracker;
pub use offer::{OfferSummary, TradeOffer};
pub use registry::TradeRegistry;
pub use timer::OfferTimer;
pub use types::{Acceptance, TradeAction, TradeEvent};
