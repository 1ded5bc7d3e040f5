use std::{
    fmt::{Debug, Display},
    future::Future,
    hash::Hash,
};

/// Retrieves the authoritative value behind a cache key.
///
/// Implementations normalize every failure into `Self::Error`; the store
/// never inspects it beyond logging.
pub trait Fetcher: Send + Sync + 'static {
    /// Describes one request, e.g. a URL plus its query parameters.
    type Key: Clone + Eq + Hash + Debug + Send + Sync + 'static;
    type Value: Clone + Send + Sync + 'static;
    type Error: Display + Send + 'static;

    fn fetch(
        &self,
        key: &Self::Key,
    ) -> impl Future<Output = Result<Self::Value, Self::Error>> + Send;
}
