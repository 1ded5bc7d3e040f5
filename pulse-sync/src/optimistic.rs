use crate::{
    fetcher::Fetcher,
    store::{MutateOptions, SyncStore},
};
use std::{fmt::Display, future::Future};
use tracing::warn;

/// What happens to optimistic patches when the server rejects the action.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash)]
pub enum FailurePolicy {
    /// Leave the patches in place; the follow-up revalidation restores
    /// server truth once it succeeds.
    #[default]
    TrustRevalidation,
    /// Undo every patch right away, then revalidate.
    Rollback,
}

type Undo<V> = Box<dyn FnOnce(&mut V) + Send>;

/// An action whose visible effect is applied to the cache before the
/// server has confirmed it.
///
/// Every key touched here that some view has read or subscribed to is
/// revalidated after the action settles, whatever its outcome.
#[must_use = "patches are applied eagerly but nothing is revalidated until `run` is awaited"]
pub struct Optimistic<'s, F: Fetcher> {
    store: &'s SyncStore<F>,
    policy: FailurePolicy,
    undo: Vec<(F::Key, Undo<F::Value>)>,
    keys: Vec<F::Key>,
}

impl<F: Fetcher> SyncStore<F> {
    pub fn optimistic(&self) -> Optimistic<'_, F> {
        Optimistic {
            store: self,
            policy: FailurePolicy::default(),
            undo: Vec::new(),
            keys: Vec::new(),
        }
    }
}

impl<F: Fetcher> Optimistic<'_, F> {
    pub fn policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Applies `apply` now; `undo` runs only on failure under
    /// [`FailurePolicy::Rollback`].
    pub fn patch(
        mut self,
        key: F::Key,
        apply: impl FnOnce(&mut F::Value),
        undo: impl FnOnce(&mut F::Value) + Send + 'static,
    ) -> Self {
        if self.store.mutate(&key, apply, MutateOptions::LOCAL_ONLY) {
            self.undo.push((key.clone(), Box::new(undo)));
        }
        self.touch(key)
    }

    /// Applies `apply` now with nothing to undo.
    pub fn update(self, key: F::Key, apply: impl FnOnce(&mut F::Value)) -> Self {
        self.store.mutate(&key, apply, MutateOptions::LOCAL_ONLY);
        self.touch(key)
    }

    /// Revalidates `key` after the action without patching it first.
    pub fn touch(mut self, key: F::Key) -> Self {
        if !self.keys.contains(&key) {
            self.keys.push(key);
        }
        self
    }

    pub async fn run<T, E: Display>(
        self,
        action: impl Future<Output = Result<T, E>>,
    ) -> Result<T, E> {
        let result = action.await;

        if let Err(err) = &result {
            match self.policy {
                FailurePolicy::TrustRevalidation => {
                    warn!(error = %err, keys = ?self.keys, "optimistic action failed");
                }
                FailurePolicy::Rollback => {
                    warn!(
                        error = %err,
                        keys = ?self.keys,
                        "optimistic action failed, rolling back"
                    );
                    for (key, undo) in self.undo.into_iter().rev() {
                        self.store.mutate(&key, undo, MutateOptions::LOCAL_ONLY);
                    }
                }
            }
        }

        for key in self.keys {
            if self.store.contains(&key) {
                self.store.spawn_revalidate(key);
            }
        }
        result
    }
}
