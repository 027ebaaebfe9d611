//! Trade registry owns every pending offer and resolves them

use crate::error::{Result, TradeError};
use crate::ports::{ActorDirectory, ExchangeSessions, SettingsProvider};
use crate::types::{ActorId, Clock, OfferId, OfferKey, SystemClock};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;

use super::cooldown::CooldownTracker;
use super::offer::{OfferSummary, TradeOffer};
use super::timer::OfferTimer;
use super::types::{Acceptance, TradeAction, TradeEvent};

/// Registry of pending trade offers
///
/// All mutations of the offer map happen under one lock, held only for the
/// read-modify-write of a single operation. Collaborators, timer
/// cancellation and event emission run after the lock is released.
///
/// Offers are created with tokio timers, so `initiate` must run inside a
/// tokio runtime.
pub struct TradeRegistry {
    offers: Mutex<HashMap<OfferKey, TradeOffer>>,
    next_offer_id: AtomicU64,
    cooldowns: CooldownTracker,
    settings: Arc<dyn SettingsProvider>,
    directory: Arc<dyn ActorDirectory>,
    exchange: Arc<dyn ExchangeSessions>,
    clock: Arc<dyn Clock>,
    event_tx: mpsc::UnboundedSender<TradeEvent>,
    event_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<TradeEvent>>,
    self_ref: Weak<TradeRegistry>,
}

impl TradeRegistry {
    /// Create a registry using the system clock
    pub fn new(
        settings: Arc<dyn SettingsProvider>,
        directory: Arc<dyn ActorDirectory>,
        exchange: Arc<dyn ExchangeSessions>,
    ) -> Arc<Self> {
        Self::with_clock(settings, directory, exchange, Arc::new(SystemClock))
    }

    /// Create a registry with an explicit clock for cooldown bookkeeping
    pub fn with_clock(
        settings: Arc<dyn SettingsProvider>,
        directory: Arc<dyn ActorDirectory>,
        exchange: Arc<dyn ExchangeSessions>,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Arc::new_cyclic(|self_ref| Self {
            offers: Mutex::new(HashMap::new()),
            next_offer_id: AtomicU64::new(1),
            cooldowns: CooldownTracker::new(clock.clone()),
            settings,
            directory,
            exchange,
            clock,
            event_tx,
            event_rx: tokio::sync::Mutex::new(event_rx),
            self_ref: self_ref.clone(),
        })
    }

    /// Send a new offer from `initiator` to `target`
    pub fn initiate(&self, initiator: &ActorId, target: &ActorId) -> Result<OfferKey> {
        if initiator == target {
            return Err(TradeError::SelfTrade);
        }

        let settings = self.settings.settings();
        if let Some(remaining) = self.cooldowns.remaining(initiator, settings.cooldown()) {
            return Err(TradeError::OnCooldown { remaining });
        }

        self.directory.resolve(initiator)?;
        self.directory.resolve(target)?;

        let key = OfferKey::new(initiator.clone(), target.clone());
        let id = OfferId(self.next_offer_id.fetch_add(1, Ordering::Relaxed));
        let timeout = settings.timeout();

        {
            let mut offers = self.offers.lock();
            if offers.contains_key(&key) {
                return Err(TradeError::DuplicateOffer);
            }

            let timer = self.start_timer(key.clone(), id, timeout);
            let offer = TradeOffer::new(id, key.clone(), self.clock.now(), timeout, timer);
            offers.insert(key.clone(), offer);
        }

        tracing::info!("Trade offer {} created: {} (timeout {:?})", id, key, timeout);
        self.emit(TradeEvent::NewOffer {
            initiator: key.initiator.clone(),
            target: key.target.clone(),
            timeout,
        });

        Ok(key)
    }

    /// Accept an offer addressed to `target`
    ///
    /// Both parties are re-resolved before the offer is touched; if either
    /// is unavailable the offer stays pending.
    pub fn accept(&self, target: &ActorId, initiator: Option<&ActorId>) -> Result<Acceptance> {
        let key = self.resolve_key(target, initiator, TradeAction::Accept)?;
        let id = self
            .offers
            .lock()
            .get(&key)
            .map(TradeOffer::id)
            .ok_or(TradeError::NoSuchOffer)?;

        let initiator_handle = self.directory.resolve(&key.initiator)?;
        let target_handle = self.directory.resolve(&key.target)?;

        // The offer may have been replaced while the parties were resolved.
        let offer = self.take_if(&key, |offer| offer.id() == id)?;
        let session = self.exchange.open(initiator_handle, target_handle);
        self.cooldowns.record_completion(
            &key.initiator,
            &key.target,
            self.settings.settings().cooldown_mode,
        );

        tracing::info!(
            "Trade offer {} accepted: {}, handed to session {}",
            offer.id(),
            key,
            session
        );
        self.emit(TradeEvent::Accepted {
            initiator: key.initiator.clone(),
            target: key.target.clone(),
            session: session.clone(),
        });

        Ok(Acceptance { key, session })
    }

    /// Deny an offer addressed to `target`
    pub fn deny(&self, target: &ActorId, initiator: Option<&ActorId>) -> Result<OfferKey> {
        let key = self.resolve_key(target, initiator, TradeAction::Deny)?;
        let offer = self.take(&key)?;

        tracing::info!("Trade offer {} denied: {}", offer.id(), key);
        self.emit(TradeEvent::Denied {
            initiator: key.initiator.clone(),
            target: key.target.clone(),
        });

        Ok(key)
    }

    /// Withdraw an offer sent by `initiator`
    pub fn cancel(&self, initiator: &ActorId, target: Option<&ActorId>) -> Result<OfferKey> {
        let key = self.resolve_key(initiator, target, TradeAction::Cancel)?;
        let offer = self.take(&key)?;

        tracing::info!("Trade offer {} cancelled: {}", offer.id(), key);
        self.emit(TradeEvent::Cancelled {
            initiator: key.initiator.clone(),
            target: key.target.clone(),
        });

        Ok(key)
    }

    /// Drop every offer the actor is a party to, returning how many were dropped
    pub fn invalidate_actor(&self, actor: &ActorId) -> usize {
        let dropped: Vec<TradeOffer> = {
            let mut offers = self.offers.lock();
            let keys: Vec<OfferKey> = offers
                .keys()
                .filter(|key| key.involves(actor))
                .cloned()
                .collect();
            keys.iter().filter_map(|key| offers.remove(key)).collect()
        };

        for offer in &dropped {
            offer.cancel_timer();
            tracing::info!("Trade offer {} invalidated: {} left", offer.id(), actor);
            self.emit(TradeEvent::Invalidated {
                initiator: offer.initiator().clone(),
                target: offer.target().clone(),
                departed: actor.clone(),
            });
        }

        dropped.len()
    }

    /// Initiators with an offer pending to `target`, sorted
    pub fn pending_for_target(&self, target: &ActorId) -> Vec<ActorId> {
        self.counterparts(target, false)
    }

    /// Targets of offers pending from `initiator`, sorted
    pub fn pending_from(&self, initiator: &ActorId) -> Vec<ActorId> {
        self.counterparts(initiator, true)
    }

    /// Whether the actor is a party to any pending offer
    pub fn is_engaged(&self, actor: &ActorId) -> bool {
        self.offers.lock().keys().any(|key| key.involves(actor))
    }

    pub fn get(&self, initiator: &ActorId, target: &ActorId) -> Option<OfferSummary> {
        self.offers
            .lock()
            .get(&OfferKey::new(initiator.clone(), target.clone()))
            .map(TradeOffer::summary)
    }

    /// Snapshot of every pending offer
    pub fn offers(&self) -> Vec<OfferSummary> {
        self.offers.lock().values().map(TradeOffer::summary).collect()
    }

    pub fn pending_count(&self) -> usize {
        self.offers.lock().len()
    }

    pub fn cooldowns(&self) -> &CooldownTracker {
        &self.cooldowns
    }

    /// Next event without waiting, if one is queued
    pub async fn poll_event(&self) -> Option<TradeEvent> {
        self.event_rx.lock().await.try_recv().ok()
    }

    /// Wait for the next event
    pub async fn next_event(&self) -> Option<TradeEvent> {
        self.event_rx.lock().await.recv().await
    }

    /// Work out which offer an action refers to
    ///
    /// Without an explicit counterpart the actor's pending offers on the
    /// relevant side are enumerated: none is `NoOffers`, several is
    /// `Ambiguous` listing the counterparts.
    fn resolve_key(
        &self,
        actor: &ActorId,
        counterpart: Option<&ActorId>,
        action: TradeAction,
    ) -> Result<OfferKey> {
        let as_initiator = action.acts_as_initiator();
        let counterpart = match counterpart {
            Some(counterpart) => counterpart.clone(),
            None => {
                let mut candidates = self.counterparts(actor, as_initiator);
                match candidates.len() {
                    0 => return Err(TradeError::NoOffers),
                    1 => candidates.remove(0),
                    _ => return Err(TradeError::Ambiguous(candidates)),
                }
            }
        };

        Ok(if as_initiator {
            OfferKey::new(actor.clone(), counterpart)
        } else {
            OfferKey::new(counterpart, actor.clone())
        })
    }

    fn counterparts(&self, actor: &ActorId, as_initiator: bool) -> Vec<ActorId> {
        let mut counterparts: Vec<ActorId> = self
            .offers
            .lock()
            .keys()
            .filter_map(|key| {
                if as_initiator && &key.initiator == actor {
                    Some(key.target.clone())
                } else if !as_initiator && &key.target == actor {
                    Some(key.initiator.clone())
                } else {
                    None
                }
            })
            .collect();
        counterparts.sort();
        counterparts
    }

    /// Remove an offer and stop its timer
    fn take(&self, key: &OfferKey) -> Result<TradeOffer> {
        self.take_if(key, |_| true)
    }

    fn take_if(&self, key: &OfferKey, matches: impl FnOnce(&TradeOffer) -> bool) -> Result<TradeOffer> {
        let offer = {
            let mut offers = self.offers.lock();
            match offers.get(key) {
                Some(offer) if matches(offer) => offers.remove(key),
                _ => None,
            }
        }
        .ok_or(TradeError::NoSuchOffer)?;
        offer.cancel_timer();
        Ok(offer)
    }

    fn start_timer(&self, key: OfferKey, id: OfferId, timeout: std::time::Duration) -> OfferTimer {
        let registry = self.self_ref.clone();
        OfferTimer::start(timeout, move || {
            if let Some(registry) = registry.upgrade() {
                registry.expire(&key, id);
            }
        })
    }

    /// Timer signal: offer `id` under `key` ran out of time
    ///
    /// A no-op if the offer already resolved or was replaced.
    fn expire(&self, key: &OfferKey, id: OfferId) -> bool {
        let expired = {
            let mut offers = self.offers.lock();
            match offers.get(key) {
                Some(offer) if offer.id() == id => offers.remove(key),
                _ => None,
            }
        };

        match expired {
            Some(_) => {
                tracing::info!("Trade offer {} expired: {}", id, key);
                self.emit(TradeEvent::Expired {
                    initiator: key.initiator.clone(),
                    target: key.target.clone(),
                });
                true
            }
            None => {
                tracing::debug!("Ignoring stale expiry of {} ({})", id, key);
                false
            }
        }
    }

    fn emit(&self, event: TradeEvent) {
        let _ = self.event_tx.send(event);
    }
}
