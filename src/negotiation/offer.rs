//! Pending trade offer

use crate::types::{ActorId, OfferId, OfferKey, Timestamp};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::timer::OfferTimer;

/// A pending, directional proposal from `initiator` to `target`
///
/// Owns its expiry timer; the timer is cancelled when the offer resolves or
/// is dropped.
#[derive(Debug)]
pub struct TradeOffer {
    id: OfferId,
    key: OfferKey,
    created_at: Timestamp,
    timeout: Duration,
    timer: OfferTimer,
}

impl TradeOffer {
    pub fn new(
        id: OfferId,
        key: OfferKey,
        created_at: Timestamp,
        timeout: Duration,
        timer: OfferTimer,
    ) -> Self {
        Self {
            id,
            key,
            created_at,
            timeout,
            timer,
        }
    }

    pub fn id(&self) -> OfferId {
        self.id
    }

    pub fn initiator(&self) -> &ActorId {
        &self.key.initiator
    }

    pub fn target(&self) -> &ActorId {
        &self.key.target
    }

    /// Wall-clock time at which the offer lapses
    pub fn expires_at(&self) -> Timestamp {
        self.created_at
            .saturating_add(self.timeout.as_millis() as u64)
    }

    /// Stop the expiry timer. Returns `true` if the expiry was prevented.
    pub fn cancel_timer(&self) -> bool {
        self.timer.cancel()
    }

    pub fn summary(&self) -> OfferSummary {
        OfferSummary {
            id: self.id,
            initiator: self.key.initiator.clone(),
            target: self.key.target.clone(),
            created_at: self.created_at,
            expires_at: self.expires_at(),
        }
    }
}

/// Read-only snapshot of a pending offer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferSummary {
    pub id: OfferId,
    pub initiator: ActorId,
    pub target: ActorId,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offer(timeout: Duration) -> TradeOffer {
        let key = OfferKey::new(ActorId::from("a"), ActorId::from("b"));
        let timer = OfferTimer::start(timeout, || {});
        TradeOffer::new(OfferId(7), key, 10_000, timeout, timer)
    }

    #[tokio::test(start_paused = true)]
    async fn test_offer_accessors() {
        let offer = offer(Duration::from_secs(60));

        assert_eq!(offer.id(), OfferId(7));
        assert_eq!(offer.initiator(), &ActorId::from("a"));
        assert_eq!(offer.target(), &ActorId::from("b"));
        assert_eq!(offer.summary().created_at, 10_000);
        assert_eq!(offer.expires_at(), 70_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_timer_once() {
        let offer = offer(Duration::from_secs(60));

        assert!(offer.cancel_timer());
        assert!(!offer.cancel_timer());
    }

    #[tokio::test(start_paused = true)]
    async fn test_summary_matches_offer() {
        let offer = offer(Duration::from_secs(5));
        let summary = offer.summary();

        assert_eq!(summary.id, offer.id());
        assert_eq!(&summary.initiator, offer.initiator());
        assert_eq!(summary.expires_at, 15_000);
    }
}
