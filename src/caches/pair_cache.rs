use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use ethers::types::Address;
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::metrics;

/// Looks up venue data for one token pair.
#[async_trait]
pub trait PairFetcher: Send + Sync + 'static {
    /// `Default` is the empty placeholder returned on misses and timeouts.
    type Value: Clone + Default + Send + Sync + 'static;

    fn name(&self) -> &'static str;

    async fn fetch_pair(&self, taker_token: Address, maker_token: Address) -> Result<Self::Value>;
}

#[derive(Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// Lazily filled per-pair cache with a TTL.
///
/// The sampling path only ever reads what is already cached; fetching is
/// either bounded by a timeout or left running in the background.
pub struct PairCache<F: PairFetcher> {
    fetcher: Arc<F>,
    entries: Arc<DashMap<(Address, Address), CacheEntry<F::Value>>>,
    ttl: Duration,
}

impl<F: PairFetcher> Clone for PairCache<F> {
    fn clone(&self) -> Self {
        Self {
            fetcher: self.fetcher.clone(),
            entries: self.entries.clone(),
            ttl: self.ttl,
        }
    }
}

impl<F: PairFetcher> PairCache<F> {
    pub fn new(fetcher: F, ttl: Duration) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            entries: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Cached value if present and not expired, otherwise fetches it, giving
    /// up after `timeout`. A fetch that loses the race keeps running and
    /// still populates the cache when it finishes.
    pub async fn get_fresh_for_pair(
        &self,
        taker_token: Address,
        maker_token: Address,
        timeout: Duration,
    ) -> F::Value {
        if let Some(value) = self.get_unexpired_for_pair(taker_token, maker_token) {
            return value;
        }
        let fetch = self.spawn_fetch(taker_token, maker_token);
        match tokio::time::timeout(timeout, fetch).await {
            Ok(Ok(Some(value))) => value,
            Ok(Ok(None)) => F::Value::default(),
            Ok(Err(e)) => {
                warn!("{} fetch task for pair failed: {}", self.fetcher.name(), e);
                F::Value::default()
            }
            Err(_) => {
                debug!(
                    "{} lookup for {:?}/{:?} timed out after {:?}",
                    self.fetcher.name(),
                    taker_token,
                    maker_token,
                    timeout
                );
                F::Value::default()
            }
        }
    }

    /// Cached value regardless of age, or the empty placeholder.
    pub fn get_cached_for_pair(&self, taker_token: Address, maker_token: Address) -> F::Value {
        match self.entries.get(&(taker_token, maker_token)) {
            Some(entry) => {
                metrics::increment_cache_hit(self.fetcher.name());
                entry.value.clone()
            }
            None => {
                metrics::increment_cache_miss(self.fetcher.name());
                F::Value::default()
            }
        }
    }

    pub fn get_unexpired_for_pair(
        &self,
        taker_token: Address,
        maker_token: Address,
    ) -> Option<F::Value> {
        self.entries
            .get(&(taker_token, maker_token))
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone())
    }

    pub fn is_fresh(&self, taker_token: Address, maker_token: Address) -> bool {
        self.get_unexpired_for_pair(taker_token, maker_token)
            .is_some()
    }

    /// Starts a background fetch for the pair without waiting on it. Does
    /// nothing outside a Tokio runtime.
    pub fn prefetch(&self, taker_token: Address, maker_token: Address) {
        if tokio::runtime::Handle::try_current().is_err() {
            debug!("{} prefetch skipped, no runtime", self.fetcher.name());
            return;
        }
        drop(self.spawn_fetch(taker_token, maker_token));
    }

    pub fn insert(&self, taker_token: Address, maker_token: Address, value: F::Value) {
        self.entries.insert(
            (taker_token, maker_token),
            CacheEntry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    fn spawn_fetch(
        &self,
        taker_token: Address,
        maker_token: Address,
    ) -> tokio::task::JoinHandle<Option<F::Value>> {
        let cache = self.clone();
        tokio::spawn(async move {
            match cache.fetcher.fetch_pair(taker_token, maker_token).await {
                Ok(value) => {
                    cache.insert(taker_token, maker_token, value.clone());
                    Some(value)
                }
                Err(e) => {
                    warn!(
                        "{} fetch for {:?}/{:?} failed: {:#}",
                        cache.fetcher.name(),
                        taker_token,
                        maker_token,
                        e
                    );
                    None
                }
            }
        })
    }
}
