//! Correlation of in-flight schema/query requests, so that a response to a
//! superseded request is dropped instead of overwriting newer state.

use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;

/// Identifier handed out by [`RequestTracker::issue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for RequestId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Tracks the latest issued request. Every `issue` supersedes earlier IDs.
#[derive(Debug, Default)]
pub struct RequestTracker {
    latest: AtomicU64,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> RequestId {
        RequestId(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, id: RequestId) -> bool {
        self.latest.load(Ordering::SeqCst) == id.0
    }

    /// Pass `payload` through if `id` is still the latest request.
    pub fn accept<T>(&self, id: RequestId, payload: T) -> Option<T> {
        if self.is_current(id) {
            Some(payload)
        } else {
            debug!(
                "dropping response to request {} (latest is {})",
                id.0,
                self.latest.load(Ordering::SeqCst)
            );
            None
        }
    }
}
