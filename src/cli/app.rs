//! Trade application wiring the registry to presence and delivery

use crate::config::SettingsStore;
use crate::error::{Result, TradeError};
use crate::exchange::SessionLedger;
use crate::negotiation::{Acceptance, TradeAction, TradeEvent, TradeRegistry};
use crate::ports::{ActorDirectory, NotificationSink};
use crate::presence::{render, PresenceDirectory, PresenceEvent};
use crate::types::{ActorHandle, ActorId, OfferKey};
use std::sync::Arc;
use std::time::Duration;

const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Main trading application
///
/// Commands are addressed by player name. Failed commands are answered with
/// a notice to the acting player; lifecycle events reach both parties
/// through the event loop.
#[derive(Clone)]
pub struct TradeApp {
    registry: Arc<TradeRegistry>,
    directory: Arc<PresenceDirectory>,
    settings: Arc<SettingsStore>,
    exchange: Arc<SessionLedger>,
    sink: Arc<dyn NotificationSink>,
}

impl TradeApp {
    /// Create a new application around a settings store and a delivery sink
    pub fn new(settings: Arc<SettingsStore>, sink: Arc<dyn NotificationSink>) -> Self {
        let directory = Arc::new(PresenceDirectory::new());
        let exchange = Arc::new(SessionLedger::new());
        let registry = TradeRegistry::new(settings.clone(), directory.clone(), exchange.clone());

        Self {
            registry,
            directory,
            settings,
            exchange,
            sink,
        }
    }

    pub fn registry(&self) -> Arc<TradeRegistry> {
        self.registry.clone()
    }

    pub fn directory(&self) -> Arc<PresenceDirectory> {
        self.directory.clone()
    }

    pub fn settings(&self) -> Arc<SettingsStore> {
        self.settings.clone()
    }

    pub fn exchange(&self) -> Arc<SessionLedger> {
        self.exchange.clone()
    }

    /// Bring a player online
    pub fn join(&self, name: &str) -> ActorHandle {
        self.directory.join(name)
    }

    /// Take a player offline and drop every offer they are part of
    pub fn leave(&self, name: &str) -> Option<ActorHandle> {
        let handle = self.directory.find_by_name(name)?;
        let handle = self.directory.leave(&handle.id)?;
        self.drop_offers_of(&handle);
        Some(handle)
    }

    /// Send a trade request from `actor` to `target`
    pub fn trade(&self, actor: &str, target: &str) -> Result<OfferKey> {
        let actor = self.online_id(actor)?;
        let target = self.directory.id_for(target);

        let result = self.registry.initiate(&actor, &target);
        self.answer(&actor, None, result)
    }

    /// Accept a pending request, optionally naming the initiator
    pub fn accept(&self, actor: &str, initiator: Option<&str>) -> Result<Acceptance> {
        let actor = self.online_id(actor)?;
        let initiator = initiator.map(|name| self.directory.id_for(name));

        let result = self.registry.accept(&actor, initiator.as_ref());
        self.answer(&actor, Some(TradeAction::Accept), result)
    }

    /// Deny a pending request, optionally naming the initiator
    pub fn deny(&self, actor: &str, initiator: Option<&str>) -> Result<OfferKey> {
        let actor = self.online_id(actor)?;
        let initiator = initiator.map(|name| self.directory.id_for(name));

        let result = self.registry.deny(&actor, initiator.as_ref());
        self.answer(&actor, Some(TradeAction::Deny), result)
    }

    /// Withdraw a request `actor` sent, optionally naming the target
    pub fn cancel(&self, actor: &str, target: Option<&str>) -> Result<OfferKey> {
        let actor = self.online_id(actor)?;
        let target = target.map(|name| self.directory.id_for(name));

        let result = self.registry.cancel(&actor, target.as_ref());
        self.answer(&actor, Some(TradeAction::Cancel), result)
    }

    /// Names of players with requests to `actor`, and of players `actor` has asked
    pub fn pending(&self, actor: &str) -> Result<(Vec<String>, Vec<String>)> {
        let actor = self.online_id(actor)?;

        let names = |ids: Vec<ActorId>| -> Vec<String> {
            ids.iter().map(|id| self.directory.display_name(id)).collect()
        };

        Ok((
            names(self.registry.pending_for_target(&actor)),
            names(self.registry.pending_from(&actor)),
        ))
    }

    /// Online players `actor` could send a request to
    ///
    /// Players already party to a pending offer are left out.
    pub fn tradeable(&self, actor: &str) -> Result<Vec<String>> {
        let actor = self.online_id(actor)?;

        Ok(self
            .directory
            .online()
            .into_iter()
            .filter(|handle| handle.id != actor && !self.registry.is_engaged(&handle.id))
            .map(|handle| handle.name)
            .collect())
    }

    /// Forget cooldowns that have run out, returning how many were dropped
    pub fn prune_cooldowns(&self) -> usize {
        let cooldown = self.settings.snapshot().cooldown();
        let pruned = self.registry.cooldowns().prune(cooldown);
        if pruned > 0 {
            tracing::debug!("Pruned {} expired cooldown(s)", pruned);
        }
        pruned
    }

    /// Drain queued events without waiting, returning what was dispatched
    pub async fn process_pending_events(&self) -> Vec<TradeEvent> {
        let mut dispatched = Vec::new();

        loop {
            let mut progressed = false;

            while let Some(event) = self.directory.poll_events().await {
                self.handle_presence_event(event);
                progressed = true;
            }

            while let Some(event) = self.registry.poll_event().await {
                self.dispatch(&event);
                dispatched.push(event);
                progressed = true;
            }

            if !progressed {
                return dispatched;
            }
        }
    }

    /// Run the event loop
    pub async fn run_event_loop(&self) {
        let mut prune = tokio::time::interval(PRUNE_INTERVAL);

        loop {
            tokio::select! {
                Some(event) = self.registry.next_event() => self.dispatch(&event),
                Some(event) = self.directory.next_event() => self.handle_presence_event(event),
                _ = prune.tick() => {
                    self.prune_cooldowns();
                }
            }
        }
    }

    fn handle_presence_event(&self, event: PresenceEvent) {
        match event {
            PresenceEvent::Joined(handle) => {
                tracing::debug!("Presence: {} joined", handle);
            }
            // Covers leaves that bypassed `leave`. A player who is back
            // online by now may already hold new offers.
            PresenceEvent::Left(handle) => {
                if !self.directory.is_online(&handle.id) {
                    self.drop_offers_of(&handle);
                }
            }
        }
    }

    fn drop_offers_of(&self, handle: &ActorHandle) {
        let dropped = self.registry.invalidate_actor(&handle.id);
        if dropped > 0 {
            tracing::info!("Dropped {} offer(s) involving {}", dropped, handle);
        }
    }

    /// Deliver an event to every online recipient
    fn dispatch(&self, event: &TradeEvent) {
        for recipient in event.recipients() {
            let handle = match self.directory.resolve(&recipient) {
                Ok(handle) => handle,
                Err(_) => {
                    tracing::debug!("Skipping notice for offline player {}", recipient);
                    continue;
                }
            };

            let message = render(event, &recipient, |id| self.directory.display_name(id));
            if let Err(e) = self.sink.deliver(&handle, &message) {
                tracing::debug!("Failed to notify {}: {}", handle, e);
            }
        }
    }

    /// Notify `actor` of a rejected command and pass the result through
    fn answer<T>(&self, actor: &ActorId, action: Option<TradeAction>, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            match TradeEvent::rejection(actor, action, e) {
                Some(notice) => self.dispatch(&notice),
                None => tracing::warn!("Command from {} failed: {}", actor, e),
            }
        }
        result
    }

    fn online_id(&self, name: &str) -> Result<ActorId> {
        self.directory
            .find_by_name(name)
            .map(|handle| handle.id)
            .ok_or_else(|| TradeError::ActorUnavailable(ActorId::offline(name)))
    }
}
