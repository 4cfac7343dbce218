//! Restartable single-shot countdown

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;

pub type TimeoutCallback = Arc<dyn Fn() + Send + Sync>;

struct Armed {
    duration: Duration,
    callback: TimeoutCallback,
}

#[derive(Default)]
struct TimerState {
    /// Bumped on every arm/cancel; a sleeping task only fires if its
    /// generation is still current when it wakes.
    generation: u64,
    armed: Option<Armed>,
    pending: Option<JoinHandle<()>>,
}

/// Countdown that restarts on activity and fires at most once per arming.
///
/// Must be used from within a tokio runtime.
#[derive(Clone, Default)]
pub struct InactivityTimer {
    state: Arc<Mutex<TimerState>>,
}

impl InactivityTimer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start the countdown, replacing any pending one
    pub fn arm(&self, duration: Duration, on_timeout: TimeoutCallback) {
        let mut state = self.lock();
        state.armed = Some(Armed {
            duration,
            callback: on_timeout,
        });
        self.schedule(&mut state);
    }

    /// Restart the countdown with the last duration and callback.
    /// Does nothing if the timer was never armed or has been cancelled.
    pub fn reset(&self) {
        let mut state = self.lock();
        if state.armed.is_some() {
            self.schedule(&mut state);
        }
    }

    /// Disarm. The cancelled arming will not fire, even if its sleep has
    /// already elapsed but the callback has not been dispatched.
    pub fn cancel(&self) {
        let mut state = self.lock();
        state.generation += 1;
        state.armed = None;
        if let Some(handle) = state.pending.take() {
            handle.abort();
        }
    }

    /// Whether a timeout is currently pending
    pub fn is_pending(&self) -> bool {
        self.lock().pending.is_some()
    }

    fn schedule(&self, state: &mut TimerState) {
        state.generation += 1;
        if let Some(handle) = state.pending.take() {
            handle.abort();
        }

        let Some(armed) = state.armed.as_ref() else {
            return;
        };
        let generation = state.generation;
        let duration = armed.duration;
        let timer = self.clone();

        state.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            timer.fire(generation);
        }));
    }

    fn fire(&self, generation: u64) {
        let callback = {
            let mut state = self.lock();
            if state.generation != generation {
                return;
            }
            // Consume this arming so it cannot fire twice; the duration and
            // callback stay for a later reset().
            state.generation += 1;
            state.pending = None;
            match state.armed.as_ref() {
                Some(armed) => armed.callback.clone(),
                None => return,
            }
        };

        // Outside the lock so the callback may re-arm this timer
        callback();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, TimeoutCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = count.clone();
        (count, Arc::new(move || {
            inner.fetch_add(1, Ordering::SeqCst);
        }))
    }

    async fn advance(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_after_duration() {
        let timer = InactivityTimer::new();
        let (count, callback) = counter();
        timer.arm(Duration::from_millis(100), callback);

        advance(99).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        advance(2).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!timer.is_pending());

        advance(500).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_discards_elapsed_time() {
        let timer = InactivityTimer::new();
        let (count, callback) = counter();
        timer.arm(Duration::from_millis(100), callback);

        advance(80).await;
        timer.reset();
        advance(80).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        advance(21).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_resets_leave_one_pending() {
        let timer = InactivityTimer::new();
        let (count, callback) = counter();
        timer.arm(Duration::from_millis(50), callback);

        for _ in 0..100 {
            timer.reset();
        }

        advance(200).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_fire() {
        let timer = InactivityTimer::new();
        let (count, callback) = counter();
        timer.arm(Duration::from_millis(100), callback);

        advance(50).await;
        timer.cancel();
        assert!(!timer.is_pending());

        advance(200).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        // Reset after cancel does not resurrect the arming
        timer.reset();
        advance(200).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_generation_never_fires() {
        let timer = InactivityTimer::new();
        let (count, callback) = counter();
        timer.arm(Duration::from_millis(100), callback);
        let stale = timer.lock().generation;

        // Sleep elapsed but cancel got the lock first
        timer.cancel();
        timer.fire(stale);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_callback() {
        let timer = InactivityTimer::new();
        let (first, first_cb) = counter();
        let (second, second_cb) = counter();

        timer.arm(Duration::from_millis(100), first_cb);
        advance(50).await;
        timer.arm(Duration::from_millis(30), second_cb);

        advance(200).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_after_fire_rearms() {
        let timer = InactivityTimer::new();
        let (count, callback) = counter();
        timer.arm(Duration::from_millis(10), callback);

        advance(20).await;
        timer.reset();
        advance(20).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
