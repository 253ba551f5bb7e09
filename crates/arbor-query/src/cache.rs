//! LRU cache for community detection
//!
//! Leiden is the most expensive kernel, and module API re-runs it, so
//! results are kept in a small process-wide LRU. The key leads with the
//! graph's freeze timestamp: publishing a fresh graph changes the key, so no
//! explicit invalidation is needed. Reads take the read lock; inserts and
//! recency updates are serialized by the write lock.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, OnceLock, RwLock};

use crate::report::CommunitiesReport;

const CAPACITY: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct CacheKey {
    pub built_at_milli: i64,
    /// Resolution in thousandths, so the key stays hashable.
    pub resolution_milli: i64,
    pub min_size: usize,
}

impl CacheKey {
    pub fn new(built_at_milli: i64, resolution: f64, min_size: usize) -> Self {
        CacheKey {
            built_at_milli,
            resolution_milli: (resolution * 1000.0).round() as i64,
            min_size,
        }
    }
}

#[derive(Default)]
struct Inner {
    entries: HashMap<CacheKey, Arc<CommunitiesReport>>,
    recency: VecDeque<CacheKey>,
}

#[derive(Default)]
pub(crate) struct CommunityCache {
    inner: RwLock<Inner>,
}

impl CommunityCache {
    pub fn get(&self, key: &CacheKey) -> Option<Arc<CommunitiesReport>> {
        let inner = self.inner.read().ok()?;
        inner.entries.get(key).cloned()
    }

    pub fn insert(&self, key: CacheKey, report: Arc<CommunitiesReport>) {
        let Ok(mut inner) = self.inner.write() else {
            return;
        };
        inner.recency.retain(|k| k != &key);
        inner.recency.push_back(key.clone());
        inner.entries.insert(key, report);
        while inner.recency.len() > CAPACITY {
            if let Some(evicted) = inner.recency.pop_front() {
                inner.entries.remove(&evicted);
                tracing::debug!(?evicted, "community cache eviction");
            }
        }
    }

}

/// The only mutable process-wide state in the engine.
pub(crate) fn community_cache() -> &'static CommunityCache {
    static CACHE: OnceLock<CommunityCache> = OnceLock::new();
    CACHE.get_or_init(CommunityCache::default)
}
