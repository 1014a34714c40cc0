//! Keyed query cache with freshness flags and invalidation broadcast.
//!
//! Reads go through the cache; mutations mark entries stale. A stale entry
//! is kept but never served, so the next read refetches from the store.
//! Every invalidated key is broadcast to subscribers.
//!
//! Each invalidation bumps a generation counter. A read takes the generation
//! before it fetches and stores its result with [`QueryCache::put_fetched`];
//! if an invalidation ran in between, the result is stored stale so a
//! snapshot from before a mutation is never served after it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use crate::model::{ConversionTrackingEntry, Drive, DriveId, KamEmail, ResId, RestaurantWithDrives};

/// Channel capacity for invalidation broadcast.
const CHANNEL_CAPACITY: usize = 256;

/// Identifies one cached query result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Restaurants { viewer: KamEmail },
    Restaurant { viewer: KamEmail, res_id: ResId },
    ActiveDrives,
    Drive(DriveId),
    ConversionHistory(ResId),
}

impl QueryKey {
    /// Whether this key holds data about `res_id`.
    pub fn concerns_restaurant(&self, res_id: &ResId) -> bool {
        match self {
            QueryKey::Restaurants { .. } => true,
            QueryKey::Restaurant { res_id: key, .. } => key == res_id,
            QueryKey::ConversionHistory(key) => key == res_id,
            QueryKey::ActiveDrives | QueryKey::Drive(_) => false,
        }
    }
}

/// A cached query result.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    Restaurants(Vec<RestaurantWithDrives>),
    Restaurant(RestaurantWithDrives),
    Drives(Vec<Drive>),
    Drive(Drive),
    Conversions(Vec<ConversionTrackingEntry>),
}

/// Cache slot.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: CachedValue,
    pub fresh: bool,
    pub fetched_at: Instant,
}

impl CacheEntry {
    fn is_servable(&self, stale_after: Option<Duration>) -> bool {
        self.fresh && stale_after.map_or(true, |max| self.fetched_at.elapsed() < max)
    }
}

/// Query result cache shared by the query and mutation layers.
pub struct QueryCache {
    entries: RwLock<HashMap<QueryKey, CacheEntry>>,
    stale_after: Option<Duration>,
    generation: AtomicU64,
    sender: broadcast::Sender<QueryKey>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(None)
    }
}

impl QueryCache {
    /// Create a cache. With `stale_after`, entries older than that are not served.
    pub fn new(stale_after: Option<Duration>) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            entries: RwLock::new(HashMap::new()),
            stale_after,
            generation: AtomicU64::new(0),
            sender,
        }
    }

    /// Fresh value for `key`, if any.
    pub async fn get(&self, key: &QueryKey) -> Option<CachedValue> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.is_servable(self.stale_after))
            .map(|entry| entry.value.clone())
    }

    /// Store a freshly fetched value.
    pub async fn put(&self, key: QueryKey, value: CachedValue) {
        self.entries.write().await.insert(
            key,
            CacheEntry {
                value,
                fresh: true,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Invalidation generation. Read it before fetching from the store.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Store a value fetched after `generation` was read.
    ///
    /// The entry is fresh only if no invalidation ran since. Returns whether
    /// it was stored fresh.
    pub async fn put_fetched(&self, key: QueryKey, value: CachedValue, generation: u64) -> bool {
        let mut entries = self.entries.write().await;
        let fresh = self.generation.load(Ordering::Acquire) == generation;
        if !fresh {
            debug!(key = ?key, "Invalidated while fetching, storing stale");
        }
        entries.insert(
            key,
            CacheEntry {
                value,
                fresh,
                fetched_at: Instant::now(),
            },
        );
        fresh
    }

    /// Whether `key` has an entry that has been marked stale.
    pub async fn is_stale(&self, key: &QueryKey) -> bool {
        self.entries
            .read()
            .await
            .get(key)
            .is_some_and(|entry| !entry.fresh)
    }

    /// Mark `key` stale. Returns whether an entry existed.
    pub async fn invalidate(&self, key: &QueryKey) -> bool {
        self.invalidate_matching(|k| k == key).await > 0
    }

    /// Mark every key matching `predicate` stale. Returns how many entries matched.
    pub async fn invalidate_matching<F>(&self, predicate: F) -> usize
    where
        F: Fn(&QueryKey) -> bool,
    {
        let mut invalidated = Vec::new();
        {
            let mut entries = self.entries.write().await;
            // Bumped even when nothing is cached yet: a read may be in flight.
            self.generation.fetch_add(1, Ordering::AcqRel);
            for (key, entry) in entries.iter_mut().filter(|(k, _)| predicate(k)) {
                entry.fresh = false;
                invalidated.push(key.clone());
            }
        }

        for key in &invalidated {
            debug!(key = ?key, "Invalidated cache entry");
            // No receivers is fine.
            let _ = self.sender.send(key.clone());
        }
        invalidated.len()
    }

    /// Invalidate everything cached about one restaurant, including every
    /// viewer's restaurant list.
    pub async fn invalidate_restaurant(&self, res_id: &ResId) -> usize {
        self.invalidate_matching(|key| key.concerns_restaurant(res_id))
            .await
    }

    /// Receive every key invalidated from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<QueryKey> {
        self.sender.subscribe()
    }

    /// Number of entries, stale ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
