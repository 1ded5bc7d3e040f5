//! A keyed cache of server state that keeps every view of the same data in
//! step, polls it on an interval, and applies edits before the server
//! confirms them.

pub mod fetcher;
pub mod optimistic;
pub mod scheduler;
pub mod store;

pub use fetcher::Fetcher;
pub use optimistic::{FailurePolicy, Optimistic};
pub use scheduler::{PollBackoff, PollInterval, PollScheduler, PollSubscription};
pub use store::{EntryState, MutateOptions, Snapshot, SyncStore};
