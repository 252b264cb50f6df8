//! Guarded object cache — hash-keyed de-duplication with a held lock
//!
//! The device keeps one `GuardedCache` per de-duplicated resource kind
//! (samplers, input layouts, graphics pipelines, frame buffers). The cache
//! lock is held across the miss path, so concurrent callers requesting the
//! same new descriptor content serialize on the lock and exactly one
//! creation runs; the losers observe the inserted entry and reuse it.
//!
//! Hash equality is treated as content equality: there is no secondary
//! equality probe on the stored descriptors. The hashing side must therefore
//! cover every field that affects backend behavior.

use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex};
use crate::error::Result;

/// Mutex-guarded mapping from descriptor content hash to shared handle
///
/// At most one resource object exists per distinct hash for the lifetime of
/// the cache.
pub struct GuardedCache<T: ?Sized> {
    entries: Mutex<FxHashMap<u64, Arc<T>>>,
}

impl<T: ?Sized> GuardedCache<T> {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(FxHashMap::default()),
        }
    }

    /// Look up `key`, creating and inserting on miss
    ///
    /// The internal lock is held while `create` runs: racing callers with
    /// the same key block on the lock rather than creating duplicates. If
    /// `create` fails, nothing is inserted and the error propagates.
    pub fn get_or_create<F>(&self, key: u64, create: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Result<Arc<T>>,
    {
        let mut entries = self.entries.lock().unwrap();
        if let Some(existing) = entries.get(&key) {
            return Ok(Arc::clone(existing));
        }
        let created = create()?;
        entries.insert(key, Arc::clone(&created));
        Ok(created)
    }

    /// Look up `key` without creating
    pub fn get(&self, key: u64) -> Option<Arc<T>> {
        self.entries.lock().unwrap().get(&key).map(Arc::clone)
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// True if the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached handle
    ///
    /// Resources stay alive while callers still hold their `Arc`s; entries
    /// only release the cache's reference.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

impl<T: ?Sized> Default for GuardedCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
