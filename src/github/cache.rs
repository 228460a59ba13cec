// src/github/cache.rs
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub const DEFAULT_TTL: Duration = Duration::from_secs(300);
pub const ISSUE_CACHE_CAPACITY: usize = 100;
pub const REPO_CACHE_CAPACITY: usize = 50;

struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
}

struct CacheState<V> {
    entries: HashMap<String, CacheEntry<V>>,
    // Keys in insertion order, oldest at the front. Always holds exactly the
    // keys present in `entries`.
    order: VecDeque<String>,
}

impl<V> CacheState<V> {
    fn remove(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.order.retain(|k| k != key);
        }
    }
}

/// Time-bounded response cache with first-in-first-out eviction.
///
/// Expired entries are only purged when they are looked up; there is no
/// background sweep. Values are cloned out so callers never alias the
/// cached copy.
pub struct ResponseCache<V> {
    state: Mutex<CacheState<V>>,
    ttl: Duration,
    capacity: usize,
}

impl<V: Clone> ResponseCache<V> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
            ttl,
            capacity: capacity.max(1),
        }
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        let mut state = self.state.lock().await;

        let expired = match state.entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => {
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            tracing::debug!("Cache entry expired: {}", key);
            state.remove(key);
        }
        None
    }

    pub async fn put(&self, key: String, value: V) {
        let mut state = self.state.lock().await;

        // An overwrite counts as a fresh insertion.
        state.remove(&key);
        state.order.push_back(key.clone());
        state.entries.insert(
            key,
            CacheEntry {
                value,
                stored_at: Instant::now(),
            },
        );

        while state.entries.len() > self.capacity {
            let Some(oldest) = state.order.pop_front() else {
                break;
            };
            tracing::debug!("Evicting oldest cache entry: {}", oldest);
            state.entries.remove(&oldest);
        }
    }

    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.entries.clear();
        state.order.clear();
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_entry_valid_until_ttl() {
        let cache = ResponseCache::new(10, DEFAULT_TTL);
        cache.put("issues|a".to_string(), vec![1, 2, 3]).await;

        tokio::time::advance(Duration::from_millis(299_999)).await;
        assert_eq!(cache.get("issues|a").await, Some(vec![1, 2, 3]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_is_removed_on_get() {
        let cache = ResponseCache::new(10, DEFAULT_TTL);
        cache.put("issues|a".to_string(), 7u32).await;

        tokio::time::advance(Duration::from_millis(300_001)).await;
        assert_eq!(cache.get("issues|a").await, None);
        assert_eq!(cache.len().await, 0);

        // Still absent without any intervening put
        assert_eq!(cache.get("issues|a").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_at_exact_ttl_is_expired() {
        let cache = ResponseCache::new(10, Duration::from_secs(1));
        cache.put("k".to_string(), 1u8).await;

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn test_evicts_oldest_inserted_not_least_recently_used() {
        let cache = ResponseCache::new(2, DEFAULT_TTL);
        cache.put("a".to_string(), 1).await;
        cache.put("b".to_string(), 2).await;

        // Reading "a" does not protect it from eviction
        assert_eq!(cache.get("a").await, Some(1));
        cache.put("c".to_string(), 3).await;

        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.get("a").await, None);
        assert_eq!(cache.get("b").await, Some(2));
        assert_eq!(cache.get("c").await, Some(3));
    }

    #[tokio::test]
    async fn test_overwrite_moves_key_to_back() {
        let cache = ResponseCache::new(2, DEFAULT_TTL);
        cache.put("a".to_string(), 1).await;
        cache.put("b".to_string(), 2).await;
        cache.put("a".to_string(), 10).await;
        cache.put("c".to_string(), 3).await;

        assert_eq!(cache.get("a").await, Some(10));
        assert_eq!(cache.get("b").await, None);
        assert_eq!(cache.get("c").await, Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_restamps_entry() {
        let cache = ResponseCache::new(4, Duration::from_secs(10));
        cache.put("a".to_string(), 1).await;

        tokio::time::advance(Duration::from_secs(8)).await;
        cache.put("a".to_string(), 2).await;

        tokio::time::advance(Duration::from_secs(8)).await;
        assert_eq!(cache.get("a").await, Some(2));
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = ResponseCache::new(4, DEFAULT_TTL);
        cache.put("a".to_string(), 1).await;
        cache.put("b".to_string(), 2).await;
        cache.clear().await;

        assert_eq!(cache.len().await, 0);
        assert_eq!(cache.get("a").await, None);
    }
}
