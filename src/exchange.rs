//! Hand-off point to the item exchange

use crate::ports::ExchangeSessions;
use crate::types::{ActorHandle, SessionId};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Exchange opened for a confirmed trade
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpenedSession {
    pub id: SessionId,
    pub initiator: ActorHandle,
    pub target: ActorHandle,
}

/// Exchange backend that records sessions and logs the hand-off
///
/// The actual item transfer happens elsewhere; this keeps the ledger of
/// which pairs were handed over.
#[derive(Debug, Default)]
pub struct SessionLedger {
    next_id: AtomicU64,
    sessions: Mutex<Vec<OpenedSession>>,
}

impl SessionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// All sessions opened so far, oldest first
    pub fn sessions(&self) -> Vec<OpenedSession> {
        self.sessions.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ExchangeSessions for SessionLedger {
    fn open(&self, initiator: ActorHandle, target: ActorHandle) -> SessionId {
        let id = SessionId(format!(
            "session_{}",
            self.next_id.fetch_add(1, Ordering::Relaxed) + 1
        ));

        tracing::info!("Opening exchange {} between {} and {}", id, initiator, target);
        self.sessions.lock().push(OpenedSession {
            id: id.clone(),
            initiator,
            target,
        });

        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ActorId;

    fn handle(name: &str) -> ActorHandle {
        ActorHandle::new(ActorId::offline(name), name)
    }

    #[test]
    fn test_ledger_assigns_sequential_ids() {
        let ledger = SessionLedger::new();

        let first = ledger.open(handle("alex"), handle("steve"));
        let second = ledger.open(handle("steve"), handle("alex"));

        assert_eq!(first, SessionId("session_1".to_string()));
        assert_eq!(second, SessionId("session_2".to_string()));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_ledger_records_parties() {
        let ledger = SessionLedger::new();
        assert!(ledger.is_empty());

        let id = ledger.open(handle("alex"), handle("steve"));

        let sessions = ledger.sessions();
        assert_eq!(sessions[0].id, id);
        assert_eq!(sessions[0].initiator.name, "alex");
        assert_eq!(sessions[0].target.name, "steve");
    }
}
