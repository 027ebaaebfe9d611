//! In-memory directory of online players

use crate::error::{Result, TradeError};
use crate::ports::ActorDirectory;
use crate::types::{ActorHandle, ActorId};
use parking_lot::RwLock;
use std::collections::HashMap;
use tokio::sync::{mpsc, Mutex};

/// Presence changes that can occur
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceEvent {
    /// Player came online
    Joined(ActorHandle),
    /// Player went offline
    Left(ActorHandle),
}

/// Directory of online players keyed by offline-mode id
pub struct PresenceDirectory {
    online: RwLock<HashMap<ActorId, ActorHandle>>,
    known_names: RwLock<HashMap<ActorId, String>>,
    event_tx: mpsc::UnboundedSender<PresenceEvent>,
    event_rx: Mutex<mpsc::UnboundedReceiver<PresenceEvent>>,
}

impl PresenceDirectory {
    pub fn new() -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            online: RwLock::new(HashMap::new()),
            known_names: RwLock::new(HashMap::new()),
            event_tx,
            event_rx: Mutex::new(event_rx),
        }
    }

    /// Bring a player online. Joining twice returns the existing handle.
    pub fn join(&self, name: &str) -> ActorHandle {
        let id = ActorId::offline(name);
        let mut online = self.online.write();

        if let Some(existing) = online.get(&id) {
            return existing.clone();
        }

        let handle = ActorHandle::new(id.clone(), name);
        online.insert(id.clone(), handle.clone());
        drop(online);
        self.known_names.write().insert(id, name.to_string());

        tracing::info!("Player joined: {}", handle);
        let _ = self.event_tx.send(PresenceEvent::Joined(handle.clone()));
        handle
    }

    /// Take a player offline
    pub fn leave(&self, id: &ActorId) -> Option<ActorHandle> {
        let handle = self.online.write().remove(id)?;

        tracing::info!("Player left: {}", handle);
        let _ = self.event_tx.send(PresenceEvent::Left(handle.clone()));
        Some(handle)
    }

    /// Look up an online player by name (case-insensitive)
    pub fn find_by_name(&self, name: &str) -> Option<ActorHandle> {
        self.online
            .read()
            .values()
            .find(|handle| handle.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    /// Id for a player name, whether or not they are online
    ///
    /// Unknown names are remembered so later messages can still show them.
    pub fn id_for(&self, name: &str) -> ActorId {
        if let Some(handle) = self.find_by_name(name) {
            return handle.id;
        }
        let id = ActorId::offline(name);
        self.known_names
            .write()
            .entry(id.clone())
            .or_insert_with(|| name.to_string());
        id
    }

    /// Display name for an id, falling back to the raw id
    pub fn display_name(&self, id: &ActorId) -> String {
        if let Some(handle) = self.online.read().get(id) {
            return handle.name.clone();
        }
        self.known_names
            .read()
            .get(id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }

    /// Online players sorted by name
    pub fn online(&self) -> Vec<ActorHandle> {
        let mut online: Vec<ActorHandle> = self.online.read().values().cloned().collect();
        online.sort_by(|a, b| a.name.cmp(&b.name));
        online
    }

    pub fn is_online(&self, id: &ActorId) -> bool {
        self.online.read().contains_key(id)
    }

    /// Poll for presence events (non-blocking)
    pub async fn poll_events(&self) -> Option<PresenceEvent> {
        self.event_rx.lock().await.try_recv().ok()
    }

    /// Wait for the next presence event
    pub async fn next_event(&self) -> Option<PresenceEvent> {
        self.event_rx.lock().await.recv().await
    }
}

impl Default for PresenceDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl ActorDirectory for PresenceDirectory {
    fn resolve(&self, id: &ActorId) -> Result<ActorHandle> {
        self.online
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| TradeError::ActorUnavailable(id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_join_and_resolve() {
        let directory = PresenceDirectory::new();

        let steve = directory.join("Steve");

        assert_eq!(steve.id, ActorId::offline("Steve"));
        assert_eq!(directory.resolve(&steve.id).unwrap(), steve);
        assert_eq!(
            directory.poll_events().await,
            Some(PresenceEvent::Joined(steve))
        );
    }

    #[tokio::test]
    async fn test_join_twice_is_idempotent() {
        let directory = PresenceDirectory::new();

        let first = directory.join("Steve");
        let second = directory.join("Steve");

        assert_eq!(first, second);
        assert_eq!(directory.online().len(), 1);
        assert!(directory.poll_events().await.is_some());
        assert!(directory.poll_events().await.is_none());
    }

    #[tokio::test]
    async fn test_leave_makes_actor_unavailable() {
        let directory = PresenceDirectory::new();
        let steve = directory.join("Steve");

        assert_eq!(directory.leave(&steve.id), Some(steve.clone()));
        assert!(directory.leave(&steve.id).is_none());

        assert!(matches!(
            directory.resolve(&steve.id),
            Err(TradeError::ActorUnavailable(_))
        ));
        assert!(!directory.is_online(&steve.id));
    }

    #[tokio::test]
    async fn test_rejoin_keeps_id() {
        let directory = PresenceDirectory::new();
        let before = directory.join("Steve");
        directory.leave(&before.id);

        let after = directory.join("Steve");

        assert_eq!(before.id, after.id);
    }

    #[test]
    fn test_find_by_name_ignores_case() {
        let directory = PresenceDirectory::new();
        let alex = directory.join("Alex");
        directory.join("Steve");

        assert_eq!(directory.find_by_name("alex"), Some(alex.clone()));
        assert!(directory.find_by_name("notch").is_none());
        assert_eq!(directory.display_name(&alex.id), "Alex");
        assert_eq!(directory.display_name(&ActorId::from("x")), "x");
    }

    #[test]
    fn test_id_for_remembers_offline_names() {
        let directory = PresenceDirectory::new();
        let alex = directory.join("Alex");

        assert_eq!(directory.id_for("ALEX"), alex.id);

        let notch = directory.id_for("Notch");
        assert_eq!(notch, ActorId::offline("Notch"));
        assert_eq!(directory.display_name(&notch), "Notch");

        directory.leave(&alex.id);
        assert_eq!(directory.display_name(&alex.id), "Alex");
    }

    #[test]
    fn test_online_sorted_by_name() {
        let directory = PresenceDirectory::new();
        directory.join("Steve");
        directory.join("Alex");

        let names: Vec<String> = directory.online().into_iter().map(|h| h.name).collect();
        assert_eq!(names, vec!["Alex", "Steve"]);
    }
}
