use crate::fetcher::Fetcher;
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    fmt::Debug,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};
use tokio::{
    sync::{Mutex as AsyncMutex, watch},
    task::JoinHandle,
};
use tracing::{debug, warn};

/// What a consumer sees for a key at one point in time.
#[derive(Debug)]
pub struct Snapshot<V> {
    pub value: Option<Arc<V>>,
    /// Set while the first fetch for an empty key is in flight.
    pub is_loading: bool,
}

impl<V> Clone for Snapshot<V> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            is_loading: self.is_loading,
        }
    }
}

impl<V> Default for Snapshot<V> {
    fn default() -> Self {
        Self {
            value: None,
            is_loading: false,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum EntryState {
    Empty,
    Loading,
    Ready,
}

impl<V> Snapshot<V> {
    #[must_use]
    pub fn state(&self) -> EntryState {
        match (&self.value, self.is_loading) {
            (Some(_), _) => EntryState::Ready,
            (None, true) => EntryState::Loading,
            (None, false) => EntryState::Empty,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct MutateOptions {
    /// Fetch fresh data after applying the update.
    pub revalidate: bool,
}

impl Default for MutateOptions {
    fn default() -> Self {
        Self { revalidate: true }
    }
}

impl MutateOptions {
    pub const LOCAL_ONLY: Self = Self { revalidate: false };
}

type Entries<F> = HashMap<<F as Fetcher>::Key, watch::Sender<Snapshot<<F as Fetcher>::Value>>>;

/// Per key, the sequence number at which the last successful fetch started.
type Flights<F> = HashMap<<F as Fetcher>::Key, Arc<AsyncMutex<u64>>>;

struct StoreInner<F: Fetcher> {
    fetcher: F,
    entries: Mutex<Entries<F>>,
    flights: Mutex<Flights<F>>,
    sequence: AtomicU64,
}

/// Last known server state per key, shared by every view that reads it.
///
/// Cloning is cheap and yields a handle to the same store. Writes to a key
/// are last-write-wins.
pub struct SyncStore<F: Fetcher> {
    inner: Arc<StoreInner<F>>,
}

impl<F: Fetcher> Clone for SyncStore<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F: Fetcher> Debug for SyncStore<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncStore")
            .field("keys", &self.inner.entries.lock().len())
            .finish_non_exhaustive()
    }
}

impl<F: Fetcher> SyncStore<F> {
    #[must_use]
    pub fn new(fetcher: F) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                fetcher,
                entries: Mutex::new(HashMap::new()),
                flights: Mutex::new(HashMap::new()),
                sequence: AtomicU64::new(0),
            }),
        }
    }

    #[must_use]
    pub fn fetcher(&self) -> &F {
        &self.inner.fetcher
    }

    /// Whether any view has read or subscribed to `key`.
    #[must_use]
    pub fn contains(&self, key: &F::Key) -> bool {
        self.inner.entries.lock().contains_key(key)
    }

    /// Current snapshot without triggering a fetch.
    #[must_use]
    pub fn get(&self, key: &F::Key) -> Snapshot<F::Value> {
        self.inner
            .entries
            .lock()
            .get(key)
            .map(|sender| sender.borrow().clone())
            .unwrap_or_default()
    }

    /// Current snapshot; an empty key starts loading in the background.
    pub fn read(&self, key: &F::Key) -> Snapshot<F::Value> {
        let (snapshot, start_fetch) = {
            let mut entries = self.inner.entries.lock();
            let sender = entries
                .entry(key.clone())
                .or_insert_with(|| watch::Sender::new(Snapshot::default()));

            let mut start_fetch = false;
            sender.send_if_modified(|snapshot| {
                start_fetch = snapshot.state() == EntryState::Empty;
                if start_fetch {
                    snapshot.is_loading = true;
                }
                start_fetch
            });
            (sender.borrow().clone(), start_fetch)
        };

        if start_fetch {
            debug!(?key, "first read, fetching");
            self.spawn_revalidate(key.clone());
        }
        snapshot
    }

    pub fn subscribe(&self, key: &F::Key) -> watch::Receiver<Snapshot<F::Value>> {
        self.inner
            .entries
            .lock()
            .entry(key.clone())
            .or_insert_with(|| watch::Sender::new(Snapshot::default()))
            .subscribe()
    }

    pub fn set(&self, key: &F::Key, value: F::Value) {
        self.publish(key, |snapshot| {
            snapshot.value = Some(Arc::new(value));
            snapshot.is_loading = false;
        });
    }

    pub fn remove(&self, key: &F::Key) {
        if let Some(sender) = self.inner.entries.lock().remove(key) {
            sender.send_replace(Snapshot::default());
        }
    }

    /// Applies `updater` to the cached value and publishes the result at once.
    ///
    /// Returns `false` and leaves the entry alone if nothing is cached yet.
    /// `updater` runs under the store lock and must not call back into the store.
    pub fn mutate(
        &self,
        key: &F::Key,
        updater: impl FnOnce(&mut F::Value),
        options: MutateOptions,
    ) -> bool {
        let applied = {
            let entries = self.inner.entries.lock();
            entries.get(key).is_some_and(|sender| {
                sender.send_if_modified(|snapshot| match &mut snapshot.value {
                    Some(value) => {
                        updater(Arc::make_mut(value));
                        true
                    }
                    None => false,
                })
            })
        };

        if applied && options.revalidate {
            self.spawn_revalidate(key.clone());
        }
        applied
    }

    /// Fetches `key` and publishes the result.
    ///
    /// Fetches for one key run one at a time. A call that waited behind others
    /// returns without fetching if a fetch that started after the call already
    /// succeeded, so a burst of calls costs at most two requests and every
    /// caller sees data at least as new as its call.
    ///
    /// On failure the previous value stays visible and the error is returned
    /// for the caller to log or ignore.
    pub async fn revalidate(&self, key: &F::Key) -> Result<(), F::Error> {
        let requested = self.inner.sequence.fetch_add(1, Ordering::Relaxed);
        let flight = Arc::clone(self.inner.flights.lock().entry(key.clone()).or_default());
        let mut last_success = flight.lock().await;
        if *last_success > requested {
            debug!(?key, "already revalidated by a newer fetch");
            return Ok(());
        }

        let started = self.inner.sequence.fetch_add(1, Ordering::Relaxed);
        match self.inner.fetcher.fetch(key).await {
            Ok(value) => {
                debug!(?key, "revalidated");
                *last_success = started;
                self.set(key, value);
                Ok(())
            }
            Err(err) => {
                warn!(?key, error = %err, "fetch failed, keeping stale data");
                self.publish(key, |snapshot| snapshot.is_loading = false);
                Err(err)
            }
        }
    }

    pub fn spawn_revalidate(&self, key: F::Key) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let _ = store.revalidate(&key).await;
        })
    }

    fn publish(&self, key: &F::Key, modify: impl FnOnce(&mut Snapshot<F::Value>)) {
        self.inner
            .entries
            .lock()
            .entry(key.clone())
            .or_insert_with(|| watch::Sender::new(Snapshot::default()))
            .send_modify(modify);
    }
}
