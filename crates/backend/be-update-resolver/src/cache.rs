//! Get-or-compute cache with a time-to-live.
//!
//! Each key owns an async slot. A reader holds the slot while it refreshes,
//! so concurrent readers of a stale key wait for that one refresh instead of
//! starting their own. A failed refresh keeps serving the previous value if
//! there is one.

use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::types::Release;

/// Cache holding the upstream latest release
pub type ReleaseCache = TtlCache<Release>;

struct CachedEntry<V> {
    value: Arc<V>,
    fetched_at: Instant,
}

type Slot<V> = Arc<tokio::sync::Mutex<Option<CachedEntry<V>>>>;

pub struct TtlCache<V> {
    slots: Mutex<HashMap<String, Slot<V>>>,
}

impl<V> Default for TtlCache<V> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<V> TtlCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &str) -> Slot<V> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.entry(key.to_string()).or_default().clone()
    }

    /// Return the cached value for `key` if it is younger than `ttl`,
    /// otherwise run `compute` and store its result.
    ///
    /// Returns `None` only when `compute` fails and nothing was cached before.
    #[instrument(skip(self, compute))]
    pub async fn get_or_compute<F, Fut>(&self, key: &str, compute: F, ttl: Duration) -> Option<Arc<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<V>>,
    {
        let slot = self.slot(key);
        let mut entry = slot.lock().await;

        if let Some(cached) = entry.as_ref()
            && cached.fetched_at.elapsed() < ttl
        {
            debug!("Cache hit for '{}'", key);
            return Some(cached.value.clone());
        }

        debug!("Cache miss for '{}', refreshing", key);
        match compute().await {
            Ok(value) => {
                let value = Arc::new(value);
                *entry = Some(CachedEntry {
                    value: value.clone(),
                    fetched_at: Instant::now(),
                });
                Some(value)
            }
            Err(e) => match entry.as_ref() {
                Some(stale) => {
                    warn!("Refresh of '{}' failed, serving stale value: {:#}", key, e);
                    Some(stale.value.clone())
                }
                None => {
                    warn!("Refresh of '{}' failed with nothing cached: {:#}", key, e);
                    None
                }
            },
        }
    }

    /// Drop the cached value for `key`
    pub async fn invalidate(&self, key: &str) {
        let slot = self.slot(key);
        slot.lock().await.take();
    }
}
