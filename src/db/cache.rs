use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::models::MergedMetadataRecord;

/// Store for merged metadata keyed by normalized `title|author`.
///
/// Lookups and writes never fail the caller; backends log and move on.
#[async_trait::async_trait]
pub trait MetadataCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<MergedMetadataRecord>;

    async fn put(&self, key: &str, record: &MergedMetadataRecord);
}

struct CacheEntry {
    record: MergedMetadataRecord,
    inserted_at: Instant,
}

/// Bounded in-process cache with a fixed TTL.
///
/// Reads only peek, so recency tracks insertion and the entry evicted past
/// `capacity` is always the oldest write.
pub struct InMemoryMetadataCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
}

impl InMemoryMetadataCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    fn entries(&self) -> MutexGuard<'_, LruCache<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

#[async_trait::async_trait]
impl MetadataCache for InMemoryMetadataCache {
    async fn get(&self, key: &str) -> Option<MergedMetadataRecord> {
        let mut entries = self.entries();
        let expired = match entries.peek(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                return Some(entry.record.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.pop(key);
            tracing::debug!(key = %key, "Metadata cache entry expired");
        }
        None
    }

    async fn put(&self, key: &str, record: &MergedMetadataRecord) {
        let entry = CacheEntry {
            record: record.clone(),
            inserted_at: Instant::now(),
        };

        if let Some((evicted, _)) = self.entries().push(key.to_string(), entry) {
            if evicted != key {
                tracing::debug!(evicted = %evicted, "Metadata cache evicted oldest entry");
            }
        }
    }
}
