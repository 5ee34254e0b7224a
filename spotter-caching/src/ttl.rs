//! Time-based TTL cache

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// String-keyed cache whose entries expire after a per-entry TTL.
///
/// Holds at most `max_entries` keys. Inserting a new key into a full cache
/// first drops expired entries, then the entry closest to expiry.
#[derive(Debug)]
pub struct TtlCache<V> {
    default_ttl: Duration,
    max_entries: usize,
    store: RwLock<HashMap<String, CacheEntry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(default_ttl: Duration, max_entries: usize) -> Self {
        Self {
            default_ttl,
            max_entries: max_entries.max(1),
            store: RwLock::new(HashMap::new()),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// The live value for `key`; an expired entry is removed on the way
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut store = self.store.write();
        match store.get(key) {
            Some(entry) if entry.is_expired(now) => {
                store.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.insert_with_ttl(key, value, self.default_ttl);
    }

    pub fn insert_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.insert_until(key, value, Instant::now() + ttl);
    }

    /// Store `value` until `expires_at`
    pub fn insert_until(&self, key: impl Into<String>, value: V, expires_at: Instant) {
        let key = key.into();
        let mut store = self.store.write();

        if !store.contains_key(&key) && store.len() >= self.max_entries {
            let now = Instant::now();
            store.retain(|_, entry| !entry.is_expired(now));

            if store.len() >= self.max_entries {
                let soonest = store
                    .iter()
                    .min_by_key(|(_, entry)| entry.expires_at)
                    .map(|(key, _)| key.clone());
                if let Some(soonest) = soonest {
                    store.remove(&soonest);
                }
            }
        }

        store.insert(key, CacheEntry { value, expires_at });
    }

    /// Remove `key`, returning its value if it was still live
    pub fn remove(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        self.store
            .write()
            .remove(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value)
    }

    /// Remove every key matching `predicate`; returns how many were removed
    pub fn remove_where<P>(&self, predicate: P) -> usize
    where
        P: Fn(&str) -> bool,
    {
        let mut store = self.store.write();
        let before = store.len();
        store.retain(|key, _| !predicate(key));
        before - store.len()
    }

    /// Remove everything; returns how many entries were dropped
    pub fn clear(&self) -> usize {
        let mut store = self.store.write();
        let count = store.len();
        store.clear();
        count
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.store
            .read()
            .values()
            .filter(|entry| !entry.is_expired(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop expired entries; returns how many were dropped
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut store = self.store.write();
        let before = store.len();
        store.retain(|_, entry| !entry.is_expired(now));
        before - store.len()
    }
}

impl<V: Clone + Send + Sync + 'static> TtlCache<V> {
    /// Run [`TtlCache::cleanup_expired`] every `interval` until the task is aborted
    pub fn start_cleanup_task(self: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                let removed = self.cleanup_expired();
                if removed > 0 {
                    log::debug!("Removed {} expired cache entries", removed);
                }
            }
        })
    }
}
