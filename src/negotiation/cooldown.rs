//! Per-actor throttle on new offers after a completed trade

use crate::config::CooldownMode;
use crate::types::{ActorId, Clock, Timestamp};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Tracks when each actor last completed a trade
pub struct CooldownTracker {
    last_completion: Mutex<HashMap<ActorId, Timestamp>>,
    clock: Arc<dyn Clock>,
}

impl CooldownTracker {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            last_completion: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Whether `actor` completed a trade less than `cooldown` ago
    pub fn is_on_cooldown(&self, actor: &ActorId, cooldown: Duration) -> bool {
        self.remaining(actor, cooldown).is_some()
    }

    /// Time left before `actor` may send a new offer, if any
    pub fn remaining(&self, actor: &ActorId, cooldown: Duration) -> Option<Duration> {
        let last = *self.last_completion.lock().get(actor)?;
        let elapsed = self.clock.now().saturating_sub(last);
        let window = cooldown.as_millis() as u64;

        (elapsed < window).then(|| Duration::from_millis(window - elapsed))
    }

    /// Stamp the parties of a completed trade according to `mode`
    ///
    /// Under `BothUsers` both parties share one timestamp.
    pub fn record_completion(&self, initiator: &ActorId, target: &ActorId, mode: CooldownMode) {
        let now = self.clock.now();
        let mut last_completion = self.last_completion.lock();

        last_completion.insert(initiator.clone(), now);
        if mode == CooldownMode::BothUsers {
            last_completion.insert(target.clone(), now);
        }
    }

    /// Drop entries whose window has elapsed, returning how many were removed
    pub fn prune(&self, cooldown: Duration) -> usize {
        let now = self.clock.now();
        let window = cooldown.as_millis() as u64;
        let mut last_completion = self.last_completion.lock();

        let before = last_completion.len();
        last_completion.retain(|_, last| now.saturating_sub(*last) < window);
        before - last_completion.len()
    }

    pub fn len(&self) -> usize {
        self.last_completion.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ManualClock;

    const MINUTE: Duration = Duration::from_secs(60);

    fn tracker() -> (CooldownTracker, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000_000));
        (CooldownTracker::new(clock.clone()), clock)
    }

    #[test]
    fn test_unknown_actor_is_free() {
        let (tracker, _clock) = tracker();
        assert!(!tracker.is_on_cooldown(&ActorId::from("a"), MINUTE));
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_window_is_half_open() {
        let (tracker, clock) = tracker();
        let a = ActorId::from("a");

        tracker.record_completion(&a, &ActorId::from("b"), CooldownMode::WhoInitiated);
        assert!(tracker.is_on_cooldown(&a, MINUTE));
        assert_eq!(tracker.remaining(&a, MINUTE), Some(MINUTE));

        clock.advance(MINUTE - Duration::from_millis(1));
        assert!(tracker.is_on_cooldown(&a, MINUTE));
        assert_eq!(tracker.remaining(&a, MINUTE), Some(Duration::from_millis(1)));

        clock.advance(Duration::from_millis(1));
        assert!(!tracker.is_on_cooldown(&a, MINUTE));

        clock.advance(MINUTE);
        assert!(!tracker.is_on_cooldown(&a, MINUTE));
    }

    #[test]
    fn test_zero_cooldown_never_blocks() {
        let (tracker, _clock) = tracker();
        let a = ActorId::from("a");

        tracker.record_completion(&a, &ActorId::from("b"), CooldownMode::BothUsers);
        assert!(!tracker.is_on_cooldown(&a, Duration::ZERO));
    }

    #[test]
    fn test_who_initiated_stamps_initiator_only() {
        let (tracker, _clock) = tracker();
        let a = ActorId::from("a");
        let b = ActorId::from("b");

        tracker.record_completion(&a, &b, CooldownMode::WhoInitiated);

        assert!(tracker.is_on_cooldown(&a, MINUTE));
        assert!(!tracker.is_on_cooldown(&b, MINUTE));
    }

    #[test]
    fn test_both_users_share_timestamp() {
        let (tracker, clock) = tracker();
        let a = ActorId::from("a");
        let b = ActorId::from("b");

        tracker.record_completion(&a, &b, CooldownMode::BothUsers);
        clock.advance(Duration::from_secs(15));

        assert_eq!(tracker.remaining(&a, MINUTE), Some(Duration::from_secs(45)));
        assert_eq!(tracker.remaining(&b, MINUTE), Some(Duration::from_secs(45)));
    }

    #[test]
    fn test_new_completion_restarts_window() {
        let (tracker, clock) = tracker();
        let a = ActorId::from("a");
        let b = ActorId::from("b");

        tracker.record_completion(&a, &b, CooldownMode::WhoInitiated);
        clock.advance(Duration::from_secs(50));
        tracker.record_completion(&a, &b, CooldownMode::WhoInitiated);
        clock.advance(Duration::from_secs(50));

        assert!(tracker.is_on_cooldown(&a, MINUTE));
    }

    #[test]
    fn test_prune_keeps_active_entries() {
        let (tracker, clock) = tracker();
        let a = ActorId::from("a");
        let b = ActorId::from("b");

        tracker.record_completion(&a, &b, CooldownMode::WhoInitiated);
        clock.advance(Duration::from_secs(30));
        tracker.record_completion(&b, &a, CooldownMode::WhoInitiated);
        clock.advance(Duration::from_secs(40));

        assert_eq!(tracker.prune(MINUTE), 1);
        assert_eq!(tracker.len(), 1);
        assert!(tracker.is_on_cooldown(&b, MINUTE));
    }
}
