use crate::{fetcher::Fetcher, store::SyncStore};
use parking_lot::Mutex;
use rand::Rng;
use std::{collections::HashMap, fmt::Debug, sync::Arc, time::Duration};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Poll interval must be longer than zero")]
pub struct ZeroIntervalError;

/// A non-zero polling period.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct PollInterval(Duration);

impl PollInterval {
    #[must_use]
    pub fn new(duration: Duration) -> Option<Self> {
        (!duration.is_zero()).then_some(Self(duration))
    }

    #[must_use]
    pub fn from_millis(millis: u64) -> Option<Self> {
        Self::new(Duration::from_millis(millis))
    }

    #[must_use]
    pub fn get(self) -> Duration {
        self.0
    }
}

impl TryFrom<Duration> for PollInterval {
    type Error = ZeroIntervalError;

    fn try_from(value: Duration) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(ZeroIntervalError)
    }
}

/// Stretches the wait after consecutive failed polls.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct PollBackoff {
    pub multiplier: f64,
    pub max_delay: Duration,
    /// Randomize each delay by up to ±30%.
    pub jitter: bool,
}

impl Default for PollBackoff {
    fn default() -> Self {
        Self {
            multiplier: 2.0,
            max_delay: Duration::from_secs(60),
            jitter: true,
        }
    }
}

impl PollBackoff {
    #[must_use]
    pub fn delay(&self, interval: Duration, failures: u32) -> Duration {
        if failures == 0 {
            return interval;
        }
        let exponent = i32::try_from(failures).unwrap_or(i32::MAX);
        let scaled = interval.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = scaled.min(self.max_delay.as_secs_f64()).max(interval.as_secs_f64());

        let jittered = if self.jitter {
            capped * (1.0 + rand::rng().random_range(-0.3..0.3))
        } else {
            capped
        };
        Duration::from_secs_f64(jittered)
    }
}

struct Timer {
    subscribers: usize,
    cancel: CancellationToken,
}

type Timers<K> = Arc<Mutex<HashMap<(K, PollInterval), Timer>>>;

/// Keeps polled keys fresh with one timer per distinct `(key, interval)`,
/// however many views subscribe to it.
pub struct PollScheduler<F: Fetcher> {
    store: SyncStore<F>,
    timers: Timers<F::Key>,
    backoff: Option<PollBackoff>,
}

impl<F: Fetcher> Clone for PollScheduler<F> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            timers: Arc::clone(&self.timers),
            backoff: self.backoff,
        }
    }
}

impl<F: Fetcher> Debug for PollScheduler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollScheduler")
            .field("active_timers", &self.active_timers())
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

impl<F: Fetcher> PollScheduler<F> {
    /// Failed polls are retried on the next tick at the same interval.
    #[must_use]
    pub fn new(store: SyncStore<F>) -> Self {
        Self {
            store,
            timers: Arc::default(),
            backoff: None,
        }
    }

    #[must_use]
    pub fn with_backoff(store: SyncStore<F>, backoff: PollBackoff) -> Self {
        Self {
            backoff: Some(backoff),
            ..Self::new(store)
        }
    }

    #[must_use]
    pub fn store(&self) -> &SyncStore<F> {
        &self.store
    }

    #[must_use]
    pub fn active_timers(&self) -> usize {
        self.timers.lock().len()
    }

    /// Reads `key` now and revalidates it every `interval` until the returned
    /// guard and every other guard for the same pair are dropped.
    pub fn subscribe(&self, key: F::Key, interval: PollInterval) -> PollSubscription {
        {
            let mut timers = self.timers.lock();
            let timer = timers
                .entry((key.clone(), interval))
                .or_insert_with(|| {
                    let cancel = CancellationToken::new();
                    debug!(?key, ?interval, "starting poll timer");
                    tokio::spawn(poll(
                        self.store.clone(),
                        key.clone(),
                        interval,
                        self.backoff,
                        cancel.clone(),
                    ));
                    Timer {
                        subscribers: 0,
                        cancel,
                    }
                });
            timer.subscribers += 1;
        }

        self.store.read(&key);

        let timers = Arc::clone(&self.timers);
        PollSubscription {
            release: Some(Box::new(move || {
                let mut timers = timers.lock();
                let slot = (key, interval);
                if let Some(timer) = timers.get_mut(&slot) {
                    timer.subscribers -= 1;
                    if timer.subscribers == 0 {
                        debug!(key = ?slot.0, "last subscriber gone, stopping poll timer");
                        timer.cancel.cancel();
                        timers.remove(&slot);
                    }
                }
            })),
        }
    }
}

async fn poll<F: Fetcher>(
    store: SyncStore<F>,
    key: F::Key,
    interval: PollInterval,
    backoff: Option<PollBackoff>,
    cancel: CancellationToken,
) {
    let mut failures = 0;
    loop {
        let delay = backoff.map_or(interval.get(), |backoff| {
            backoff.delay(interval.get(), failures)
        });

        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }

        // In-flight fetches run to completion even if the timer is cancelled meanwhile.
        match store.revalidate(&key).await {
            Ok(()) => failures = 0,
            Err(_) => failures = failures.saturating_add(1),
        }
    }
}

/// Keeps a poll timer alive; dropping it unsubscribes.
#[must_use = "polling stops when the subscription is dropped"]
pub struct PollSubscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Debug for PollSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollSubscription").finish_non_exhaustive()
    }
}

impl Drop for PollSubscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        scheduler::{PollBackoff, PollInterval, PollScheduler},
        store::tests::store,
    };
    use std::time::Duration;

    fn interval(millis: u64) -> PollInterval {
        PollInterval::from_millis(millis).unwrap()
    }

    #[test]
    fn zero_intervals_are_rejected() {
        assert!(PollInterval::new(Duration::ZERO).is_none());
        assert!(PollInterval::try_from(Duration::from_millis(1)).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_to_the_same_key_share_one_timer() {
        let (store, fetcher) = store();
        fetcher.respond("chat", Ok(vec![1]));
        let scheduler = PollScheduler::new(store);

        let first = scheduler.subscribe("chat", interval(2000));
        let second = scheduler.subscribe("chat", interval(2000));
        assert_eq!(scheduler.active_timers(), 1);

        tokio::time::sleep(Duration::from_millis(6500)).await;
        // One initial read plus ticks at 2s, 4s and 6s.
        assert_eq!(fetcher.calls("chat"), 4);

        drop(first);
        assert_eq!(scheduler.active_timers(), 1);
        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(fetcher.calls("chat"), 5);

        drop(second);
        assert_eq!(scheduler.active_timers(), 0);
        tokio::time::sleep(Duration::from_millis(10_000)).await;
        assert_eq!(fetcher.calls("chat"), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn distinct_intervals_get_their_own_timers() {
        let (store, fetcher) = store();
        fetcher.respond("feed", Ok(vec![]));
        let scheduler = PollScheduler::new(store);

        let _fast = scheduler.subscribe("feed", interval(2000));
        let _slow = scheduler.subscribe("feed", interval(3000));
        assert_eq!(scheduler.active_timers(), 2);

        tokio::time::sleep(Duration::from_millis(6500)).await;
        // Initial read, then 2s/4s/6s from one timer and 3s/6s from the other.
        assert_eq!(fetcher.calls("feed"), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_retried_on_the_next_tick() {
        let (store, fetcher) = store();
        fetcher.respond("feed", Err("offline"));
        let scheduler = PollScheduler::new(store);

        let _subscription = scheduler.subscribe("feed", interval(1000));
        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(fetcher.calls("feed"), 4);

        fetcher.respond("feed", Ok(vec![9]));
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(
            scheduler.store().get(&"feed").value.as_deref(),
            Some(&vec![9])
        );
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_stretches_the_wait_after_failures() {
        let (store, fetcher) = store();
        fetcher.respond("feed", Err("503"));
        let backoff = PollBackoff {
            multiplier: 2.0,
            max_delay: Duration::from_secs(10),
            jitter: false,
        };
        let scheduler = PollScheduler::with_backoff(store, backoff);

        let _subscription = scheduler.subscribe("feed", interval(1000));
        // Polls at 1s, 3s and 7s; the next one would be at 15s.
        tokio::time::sleep(Duration::from_millis(7500)).await;
        assert_eq!(fetcher.calls("feed"), 4);
    }

    #[test]
    fn backoff_delay_is_capped() {
        let backoff = PollBackoff {
            multiplier: 2.0,
            max_delay: Duration::from_secs(5),
            jitter: false,
        };
        let interval = Duration::from_secs(1);
        assert_eq!(backoff.delay(interval, 0), interval);
        assert_eq!(backoff.delay(interval, 2), Duration::from_secs(4));
        assert_eq!(backoff.delay(interval, 10), Duration::from_secs(5));
    }
}
