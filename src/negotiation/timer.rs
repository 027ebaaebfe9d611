//! Single-shot offer expiry timer

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const PENDING: u8 = 0;
const FIRED: u8 = 1;
const CANCELLED: u8 = 2;

/// Delayed callback bound to one offer
///
/// The callback runs at most once. Whichever of firing and `cancel` claims
/// the pending state first wins, so a successful `cancel` guarantees the
/// callback never runs. Dropping the timer cancels it.
#[derive(Debug)]
pub struct OfferTimer {
    state: Arc<AtomicU8>,
    token: CancellationToken,
}

impl OfferTimer {
    /// Schedule `on_expiry` to run after `delay`
    ///
    /// # Panics
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<F>(delay: Duration, on_expiry: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let deadline = Instant::now() + delay;
        let state = Arc::new(AtomicU8::new(PENDING));
        let token = CancellationToken::new();

        let task_state = state.clone();
        let task_token = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = task_token.cancelled() => {}
                _ = tokio::time::sleep_until(deadline) => {
                    if task_state
                        .compare_exchange(PENDING, FIRED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        on_expiry();
                    }
                }
            }
        });

        Self { state, token }
    }

    /// Cancel the timer
    ///
    /// Returns `true` if this call prevented the callback. Cancelling a
    /// fired or already cancelled timer is a no-op returning `false`.
    pub fn cancel(&self) -> bool {
        let prevented = self
            .state
            .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        self.token.cancel();
        prevented
    }

}

impl Drop for OfferTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_timer(delay: Duration) -> (OfferTimer, Arc<AtomicUsize>) {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let timer = OfferTimer::start(delay, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (timer, fired)
    }

    async fn wait(duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_after_delay() {
        let (timer, fired) = counting_timer(Duration::from_secs(5));

        wait(Duration::from_secs(4)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        wait(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!timer.cancel());

        wait(Duration::from_secs(60)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_firing_prevents_callback() {
        let (timer, fired) = counting_timer(Duration::from_secs(5));

        assert!(timer.cancel());

        wait(Duration::from_secs(10)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(!timer.cancel());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_after_firing_is_noop() {
        let (timer, fired) = counting_timer(Duration::from_secs(1));

        wait(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        assert!(!timer.cancel());
        assert!(!timer.cancel());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_cancel_is_noop() {
        let (timer, _fired) = counting_timer(Duration::from_secs(1));
        assert!(timer.cancel());
        assert!(!timer.cancel());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let (timer, fired) = counting_timer(Duration::from_secs(1));
        drop(timer);

        wait(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
