//! Pausable countdown ticker.
//!
//! Decrements a tick counter once per interval while not paused and invokes a
//! completion callback when the counter reaches zero. Typically started from
//! an entry action to post a timeout event to an [`crate::AsyncRunner`].
//!
//! The callback runs on tokio's blocking pool, so it may block, for example
//! in [`crate::AsyncRunner::blocking_send_event`].

use crate::config::CountdownConfig;
use crate::error::RunnerError;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

struct Shared {
    remaining: AtomicU64,
    paused: AtomicBool,
    finished: AtomicBool,
    cancelled: AtomicBool,
    cancel: Notify,
}

/// Handle to a running countdown.
pub struct Countdown {
    shared: Arc<Shared>,
    interval: Duration,
}

impl Countdown {
    /// Starts counting down `ticks` intervals on the current tokio runtime.
    ///
    /// The first tick happens one interval after the call. A countdown of
    /// zero ticks completes on the first tick.
    pub fn start<F>(ticks: u64, interval: Duration, on_complete: F) -> Result<Self, RunnerError>
    where
        F: FnOnce() + Send + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| RunnerError::NoRuntime)?;
        let shared = Arc::new(Shared {
            remaining: AtomicU64::new(ticks),
            paused: AtomicBool::new(false),
            finished: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            cancel: Notify::new(),
        });

        tracing::debug!(ticks, interval_ms = interval.as_millis() as u64, "countdown started");
        runtime.spawn(run(Arc::clone(&shared), interval, on_complete));
        Ok(Self { shared, interval })
    }

    /// Starts a countdown using the configured tick interval.
    pub fn from_config<F>(
        ticks: u64,
        config: &CountdownConfig,
        on_complete: F,
    ) -> Result<Self, RunnerError>
    where
        F: FnOnce() + Send + 'static,
    {
        Self::start(ticks, config.tick_interval(), on_complete)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Ticks left before completion.
    pub fn remaining(&self) -> u64 {
        self.shared.remaining.load(Ordering::SeqCst)
    }

    /// Ticks that elapse while paused are not counted.
    pub fn pause(&self) {
        self.shared.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.shared.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::SeqCst)
    }

    /// Stops the countdown without invoking the callback.
    pub fn cancel(&self) {
        self.shared.cancelled.store(true, Ordering::SeqCst);
        self.shared.cancel.notify_one();
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::SeqCst)
    }

    /// Whether the counter reached zero and the callback was invoked.
    pub fn is_finished(&self) -> bool {
        self.shared.finished.load(Ordering::SeqCst)
    }
}

async fn run<F>(shared: Arc<Shared>, interval: Duration, on_complete: F)
where
    F: FnOnce() + Send + 'static,
{
    // tokio intervals must be non-zero.
    let interval = interval.max(Duration::from_millis(1));
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);

    let completed = loop {
        tokio::select! {
            _ = shared.cancel.notified() => break false,
            _ = ticker.tick() => {}
        }

        if shared.cancelled.load(Ordering::SeqCst) {
            break false;
        }
        if shared.paused.load(Ordering::SeqCst) {
            continue;
        }

        let left = shared.remaining.load(Ordering::SeqCst).saturating_sub(1);
        shared.remaining.store(left, Ordering::SeqCst);
        if left == 0 {
            break true;
        }
    };

    if completed {
        tracing::debug!("countdown complete");
        if let Err(e) = tokio::task::spawn_blocking(on_complete).await {
            tracing::error!(error = %e, "countdown callback failed");
        }
        shared.finished.store(true, Ordering::SeqCst);
    } else {
        tracing::debug!(remaining = shared.remaining.load(Ordering::SeqCst), "countdown cancelled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let fired = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&fired);
        (fired, move || {
            inner.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_counts_down_and_fires_once() {
        let (fired, on_complete) = counter();
        let countdown = Countdown::start(3, Duration::from_secs(1), on_complete).unwrap();
        assert_eq!(countdown.remaining(), 3);

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(countdown.remaining(), 1);
        assert!(!countdown.is_finished());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(countdown.remaining(), 0);
        assert!(countdown.is_finished());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_holds_counter() {
        let (fired, on_complete) = counter();
        let countdown = Countdown::start(2, Duration::from_secs(1), on_complete).unwrap();

        tokio::time::sleep(Duration::from_millis(1500)).await;
        countdown.pause();
        assert!(countdown.is_paused());
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(countdown.remaining(), 1);
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        countdown.resume();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(countdown.is_finished());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_skips_callback() {
        let (fired, on_complete) = counter();
        let countdown = Countdown::start(2, Duration::from_secs(1), on_complete).unwrap();

        tokio::time::sleep(Duration::from_millis(1500)).await;
        countdown.cancel();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(countdown.is_cancelled());
        assert!(!countdown.is_finished());
        assert_eq!(countdown.remaining(), 1);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_ticks_fire_on_first_tick() {
        let (fired, on_complete) = counter();
        let config = CountdownConfig {
            tick_interval_ms: 100,
        };
        let countdown = Countdown::from_config(0, &config, on_complete).unwrap();
        assert_eq!(countdown.interval(), Duration::from_millis(100));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_callback_posts_to_runner() {
        use crate::{AsyncRunner, RunnerConfig};
        use statetab_core::{
            Capabilities, Dispatcher, FsmDescription, StateDescription, TransitionDescription,
        };

        let desc = FsmDescription::new("WAITING")
            .state(
                StateDescription::new("WAITING")
                    .on(TransitionDescription::new("TIMEOUT", "DONE")),
            )
            .state(StateDescription::new("DONE"));
        let fsm = Dispatcher::new(desc, &Capabilities::new()).unwrap();
        let runner = Arc::new(AsyncRunner::new(fsm, RunnerConfig::default()));
        runner.start().unwrap();

        let poster = Arc::clone(&runner);
        let countdown = Countdown::start(1, Duration::from_millis(10), move || {
            assert!(poster.blocking_send_event("TIMEOUT"));
        })
        .unwrap();

        tokio::time::timeout(Duration::from_secs(5), runner.wait_for_state("DONE"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(countdown.remaining(), 0);

        runner.send_exit_event().await;
        assert_eq!(runner.join().await.unwrap().final_state, "DONE");
    }

    #[test]
    fn test_requires_runtime() {
        let result = Countdown::start(1, Duration::from_secs(1), || {});
        assert!(matches!(result, Err(RunnerError::NoRuntime)));
    }
}
