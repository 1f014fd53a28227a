//! ETag cache for embedded resources.

use std::sync::Arc;

use dashmap::DashMap;
use sha2::{Digest, Sha256};

use crate::observability::metrics;

/// Content hash of a resource, lowercase hex.
pub fn compute_etag(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// A thread-safe, append-only map of resource key to ETag.
///
/// Entries are never evicted: embedded content cannot change without a new
/// process image.
#[derive(Debug, Clone, Default)]
pub struct EtagCache {
    inner: Arc<DashMap<String, Arc<str>>>,
}

impl EtagCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Arc<str>> {
        self.inner.get(key).map(|r| r.value().clone())
    }

    /// Store `etag` unless an entry already exists, returning the stored value.
    ///
    /// Racing first readers may each compute a digest; only the first insert
    /// is kept and every caller sees that one.
    pub fn get_or_insert(&self, key: &str, etag: String) -> Arc<str> {
        if let Some(existing) = self.get(key) {
            return existing;
        }
        let stored = self
            .inner
            .entry(key.to_string())
            .or_insert_with(|| {
                metrics::record_etag_computed();
                Arc::from(etag)
            })
            .value()
            .clone();
        stored
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
