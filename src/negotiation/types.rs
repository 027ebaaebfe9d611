//! Negotiation events and outcomes

use crate::error::TradeError;
use crate::types::{ActorId, OfferKey, SessionId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Resolution command issued by one of the parties
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeAction {
    /// Target confirms the offer
    Accept,
    /// Target rejects the offer
    Deny,
    /// Initiator withdraws the offer
    Cancel,
}

impl TradeAction {
    /// Whether the acting actor is the offer's initiator (otherwise its target)
    pub fn acts_as_initiator(&self) -> bool {
        matches!(self, TradeAction::Cancel)
    }

    /// Command name shown in re-prompts
    pub fn command(&self) -> &'static str {
        match self {
            TradeAction::Accept => "accept",
            TradeAction::Deny => "deny",
            TradeAction::Cancel => "cancel",
        }
    }
}

/// Everything an actor can be told about
///
/// Lifecycle variants are emitted by the registry; the rest are rejection
/// notices the command layer builds from a returned `TradeError`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TradeEvent {
    /// A new offer is pending
    NewOffer {
        initiator: ActorId,
        target: ActorId,
        timeout: Duration,
    },
    /// Target accepted; the exchange session took over
    Accepted {
        initiator: ActorId,
        target: ActorId,
        session: SessionId,
    },
    /// Target denied the offer
    Denied { initiator: ActorId, target: ActorId },
    /// Initiator withdrew the offer
    Cancelled { initiator: ActorId, target: ActorId },
    /// Offer timed out unanswered
    Expired { initiator: ActorId, target: ActorId },
    /// Offer dropped because one party left
    Invalidated {
        initiator: ActorId,
        target: ActorId,
        departed: ActorId,
    },
    /// More than one offer matched an omitted counterpart
    Ambiguous {
        actor: ActorId,
        action: TradeAction,
        candidates: Vec<ActorId>,
    },
    OnCooldown { actor: ActorId, remaining: Duration },
    NoOffers { actor: ActorId },
    NoSuchOffer { actor: ActorId },
    SelfTrade { actor: ActorId },
    DuplicateOffer { actor: ActorId },
    ActorUnavailable { actor: ActorId, missing: ActorId },
}

impl TradeEvent {
    /// Build the notice for a rejected command, if the error is user-facing
    pub fn rejection(actor: &ActorId, action: Option<TradeAction>, err: &TradeError) -> Option<Self> {
        let actor = actor.clone();
        let event = match err {
            TradeError::SelfTrade => TradeEvent::SelfTrade { actor },
            TradeError::DuplicateOffer => TradeEvent::DuplicateOffer { actor },
            TradeError::OnCooldown { remaining } => TradeEvent::OnCooldown {
                actor,
                remaining: *remaining,
            },
            TradeError::NoOffers => TradeEvent::NoOffers { actor },
            TradeError::NoSuchOffer => TradeEvent::NoSuchOffer { actor },
            TradeError::Ambiguous(candidates) => TradeEvent::Ambiguous {
                actor,
                action: action.unwrap_or(TradeAction::Accept),
                candidates: candidates.clone(),
            },
            TradeError::ActorUnavailable(missing) => TradeEvent::ActorUnavailable {
                actor,
                missing: missing.clone(),
            },
            _ => return None,
        };
        Some(event)
    }

    /// Offer this event retires or announces, if any
    pub fn offer(&self) -> Option<OfferKey> {
        match self {
            TradeEvent::NewOffer { initiator, target, .. }
            | TradeEvent::Accepted { initiator, target, .. }
            | TradeEvent::Denied { initiator, target }
            | TradeEvent::Cancelled { initiator, target }
            | TradeEvent::Expired { initiator, target }
            | TradeEvent::Invalidated { initiator, target, .. } => {
                Some(OfferKey::new(initiator.clone(), target.clone()))
            }
            _ => None,
        }
    }

    /// Actors that should be told about this event
    pub fn recipients(&self) -> Vec<ActorId> {
        match self.offer() {
            Some(key) => vec![key.initiator, key.target],
            None => match self {
                TradeEvent::Ambiguous { actor, .. }
                | TradeEvent::OnCooldown { actor, .. }
                | TradeEvent::NoOffers { actor }
                | TradeEvent::NoSuchOffer { actor }
                | TradeEvent::SelfTrade { actor }
                | TradeEvent::DuplicateOffer { actor }
                | TradeEvent::ActorUnavailable { actor, .. } => vec![actor.clone()],
                _ => Vec::new(),
            },
        }
    }
}

/// Successful acceptance
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acceptance {
    pub key: OfferKey,
    pub session: SessionId,
}
