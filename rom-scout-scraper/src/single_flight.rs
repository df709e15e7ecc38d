//! Per-key single-flight overlay.
//!
//! At most one in-flight network request exists per canonical cache key.
//! Callers take the key's guard, re-check the cache, and only then hit the
//! network; a second caller for the same key blocks on the guard and finds
//! the first caller's result in the cache when it wakes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Key-indexed async mutexes. One instance lives for the duration of a
/// scrape run; the map is bounded by the number of distinct keys seen.
#[derive(Default)]
pub struct SingleFlight {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the guard for a key, waiting for any in-flight holder first.
    pub async fn guard(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().expect("single-flight map poisoned");
            locks
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}
