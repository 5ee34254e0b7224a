//! Read-through fetch in front of a [`TtlCache`]

use crate::ttl::TtlCache;
use spotter_config::CacheConfig;
use spotter_core::NormalizedError;
use spotter_resilience::{classify, with_timeout, ClassifyContext};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Per-call options for [`FetchCache::fetch`]
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Lifetime of the stored value; the cache default when `None`
    pub ttl: Option<Duration>,
    /// Limit on the fetch; the cache default when `None`
    pub timeout: Option<Duration>,
    /// Skip the cached value and fetch again
    pub force_refresh: bool,
}

impl FetchOptions {
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn force_refresh(mut self) -> Self {
        self.force_refresh = true;
        self
    }
}

/// Cache of fetched values keyed by string.
///
/// A value's lifetime is measured from when its fetch started. Failures are
/// classified with the key as context and are not stored.
#[derive(Debug)]
pub struct FetchCache<V> {
    store: TtlCache<V>,
    enabled: bool,
    timeout: Option<Duration>,
}

impl<V: Clone> FetchCache<V> {
    pub fn new(default_ttl: Duration) -> Self {
        Self::from_config(&CacheConfig {
            default_ttl,
            ..CacheConfig::default()
        })
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            store: TtlCache::new(config.default_ttl, config.max_entries),
            enabled: config.enabled,
            timeout: config.timeout,
        }
    }

    /// Return the live value for `key` or run `fetch` and store its result
    pub async fn fetch<F, Fut, E>(
        &self,
        key: &str,
        fetch: F,
        options: &FetchOptions,
    ) -> Result<V, NormalizedError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
        E: Into<anyhow::Error>,
    {
        if self.enabled && !options.force_refresh {
            if let Some(value) = self.store.get(key) {
                log::trace!("Cache hit for {}", key);
                return Ok(value);
            }
        }

        log::debug!("Fetching {} (force_refresh: {})", key, options.force_refresh);
        let requested_at = Instant::now();
        let outcome: anyhow::Result<V> = match options.timeout.or(self.timeout) {
            Some(timeout) => match with_timeout(fetch(), timeout).await {
                Ok(result) => result.map_err(Into::into),
                Err(timeout) => Err(anyhow::Error::new(timeout)),
            },
            None => fetch().await.map_err(Into::into),
        };
        let value = outcome.map_err(|error| classify(error, &ClassifyContext::new(key)))?;

        if self.enabled {
            let ttl = options.ttl.unwrap_or_else(|| self.store.default_ttl());
            self.store.insert_until(key, value.clone(), requested_at + ttl);
        }
        Ok(value)
    }

    /// Forget `key`; returns whether a live value was dropped
    pub fn invalidate(&self, key: &str) -> bool {
        self.store.remove(key).is_some()
    }

    /// Forget every key matching `predicate`
    pub fn invalidate_where<P>(&self, predicate: P) -> usize
    where
        P: Fn(&str) -> bool,
    {
        self.store.remove_where(predicate)
    }

    /// Forget everything
    pub fn invalidate_all(&self) -> usize {
        self.store.clear()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl<V: Clone> Default for FetchCache<V> {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}
