//! Shared endpoint cursor consumed by all workers of a pool

use crate::proxy::models::Endpoint;
use parking_lot::Mutex;
use std::iter::Fuse;
use std::sync::atomic::{AtomicU64, Ordering};

type BoxedEndpoints = Box<dyn Iterator<Item = Endpoint> + Send>;

/// Ordered source of endpoints with exactly-once retrieval
///
/// Every call to [`SharedSource::next`] takes the lock for the duration of a
/// single pull, so concurrent workers never see the same endpoint twice and
/// never skip one. Once the underlying iterator returns `None` it is never
/// polled again.
pub struct SharedSource {
    inner: Mutex<Fuse<BoxedEndpoints>>,
    pulled: AtomicU64,
}

impl SharedSource {
    pub fn new<I>(endpoints: I) -> Self
    where
        I: IntoIterator<Item = Endpoint>,
        I::IntoIter: Send + 'static,
    {
        let boxed: BoxedEndpoints = Box::new(endpoints.into_iter());
        Self {
            inner: Mutex::new(boxed.fuse()),
            pulled: AtomicU64::new(0),
        }
    }

    /// A source that is exhausted from the start
    pub fn empty() -> Self {
        Self::new(std::iter::empty())
    }

    /// Take the next endpoint, or `None` once the source is exhausted
    pub fn next(&self) -> Option<Endpoint> {
        let endpoint = self.inner.lock().next();
        if endpoint.is_some() {
            self.pulled.fetch_add(1, Ordering::Relaxed);
        }
        endpoint
    }

    /// Number of endpoints handed out so far
    pub fn pulled(&self) -> u64 {
        self.pulled.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for SharedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSource")
            .field("pulled", &self.pulled())
            .finish_non_exhaustive()
    }
}
