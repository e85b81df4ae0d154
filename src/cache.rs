//! Best-effort lookup cache keyed by retrieval code.
//!
//! The store stays authoritative: the engine treats every cache error as a
//! miss and ignores failed writes.

use crate::config::{CacheMode, CustodyConfig};
use crate::core::{CustodyError, LuggageItem, Result};
use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const KEY_PREFIX: &str = "luggage:code:";

fn cache_key(code: &str) -> String {
    format!("{}{}", KEY_PREFIX, code)
}

#[async_trait]
pub trait LookupCache: Send + Sync {
    async fn get(&self, code: &str) -> Result<Option<Vec<LuggageItem>>>;

    async fn set(&self, code: &str, items: &[LuggageItem], ttl: Duration) -> Result<()>;

    async fn delete(&self, code: &str) -> Result<()>;
}

/// Cache that never holds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

#[async_trait]
impl LookupCache for NoopCache {
    async fn get(&self, _code: &str) -> Result<Option<Vec<LuggageItem>>> {
        Ok(None)
    }

    async fn set(&self, _code: &str, _items: &[LuggageItem], _ttl: Duration) -> Result<()> {
        Ok(())
    }

    async fn delete(&self, _code: &str) -> Result<()> {
        Ok(())
    }
}

struct Entry {
    payload: String,
    expires_at: Instant,
}

/// In-process LRU cache. Entries are stored as JSON so a hit hands out fresh
/// copies, the same as a networked cache would.
pub struct LruLookupCache {
    entries: Mutex<LruCache<String, Entry>>,
}

impl LruLookupCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl LookupCache for LruLookupCache {
    async fn get(&self, code: &str) -> Result<Option<Vec<LuggageItem>>> {
        let key = cache_key(code);
        let mut entries = self.entries.lock()?;

        let expired = match entries.get(&key) {
            None => return Ok(None),
            Some(entry) if entry.expires_at > Instant::now() => {
                return Ok(Some(serde_json::from_str(&entry.payload)?));
            }
            Some(_) => true,
        };
        if expired {
            entries.pop(&key);
        }
        Ok(None)
    }

    async fn set(&self, code: &str, items: &[LuggageItem], ttl: Duration) -> Result<()> {
        let payload = serde_json::to_string(items)?;
        let entry = Entry {
            payload,
            expires_at: Instant::now() + ttl,
        };
        self.entries.lock()?.put(cache_key(code), entry);
        Ok(())
    }

    async fn delete(&self, code: &str) -> Result<()> {
        self.entries.lock()?.pop(&cache_key(code));
        Ok(())
    }
}

/// Picks the cache variant named by the configuration.
pub fn from_config(config: &CustodyConfig) -> Result<Arc<dyn LookupCache>> {
    match config.cache {
        CacheMode::Disabled => Ok(Arc::new(NoopCache)),
        CacheMode::InProcess { capacity } => {
            let capacity = NonZeroUsize::new(capacity)
                .ok_or_else(|| CustodyError::Config("cache capacity must be greater than 0".into()))?;
            Ok(Arc::new(LruLookupCache::new(capacity)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LuggageStatus;
    use chrono::Utc;
    use uuid::Uuid;

    fn item(id: i64, code: &str) -> LuggageItem {
        let now = Utc::now();
        LuggageItem {
            id,
            intake_id: Uuid::new_v4(),
            guest_name: "Alice".into(),
            contact_phone: Some("555-0100".into()),
            contact_email: None,
            description: "blue suitcase".into(),
            quantity: 1,
            notes: String::new(),
            photos: vec![],
            hotel_id: 1,
            storeroom_id: 5,
            retrieval_code: code.into(),
            qr_url: format!("/qr/{}", code),
            status: LuggageStatus::Stored,
            stored_by: "bob".into(),
            retrieved_by: None,
            retrieved_at: None,
            stored_at: now,
            updated_at: now,
        }
    }

    fn cache(capacity: usize) -> LruLookupCache {
        LruLookupCache::new(NonZeroUsize::new(capacity).unwrap())
    }

    #[tokio::test]
    async fn hit_returns_stored_items() {
        let cache = cache(4);
        let items = vec![item(1, "123456"), item(2, "123456")];
        cache.set("123456", &items, Duration::from_secs(60)).await.unwrap();

        assert_eq!(cache.get("123456").await.unwrap(), Some(items));
        assert_eq!(cache.get("654321").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_entries_are_dropped() {
        let cache = cache(4);
        cache
            .set("123456", &[item(1, "123456")], Duration::from_millis(10))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(cache.get("123456").await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn least_recently_used_entry_is_evicted() {
        let cache = cache(2);
        let ttl = Duration::from_secs(60);
        cache.set("111111", &[item(1, "111111")], ttl).await.unwrap();
        cache.set("222222", &[item(2, "222222")], ttl).await.unwrap();
        cache.get("111111").await.unwrap();
        cache.set("333333", &[item(3, "333333")], ttl).await.unwrap();

        assert!(cache.get("111111").await.unwrap().is_some());
        assert!(cache.get("222222").await.unwrap().is_none());
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn delete_invalidates() {
        let cache = cache(2);
        cache
            .set("123456", &[item(1, "123456")], Duration::from_secs(60))
            .await
            .unwrap();
        cache.delete("123456").await.unwrap();
        assert!(cache.get("123456").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn noop_cache_never_hits() {
        let cache = NoopCache;
        cache
            .set("123456", &[item(1, "123456")], Duration::from_secs(60))
            .await
            .unwrap();
        assert!(cache.get("123456").await.unwrap().is_none());
    }
}
