//! Total-count caching for paginated filters

use crate::config::CacheConfig;
use async_trait::async_trait;
use moka::future::Cache;
use serde_json::Value;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Key-value store shared by concurrent callers.
///
/// Entries expire after the implementation's standard TTL.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CountCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<Value>;

    async fn set(&self, key: String, value: Value);
}

/// moka-backed [`CountCache`] with a per-entry TTL
#[derive(Clone)]
pub struct MokaCountCache {
    cache: Cache<String, Value>,
    ttl: Duration,
}

impl MokaCountCache {
    pub fn new(ttl: Duration, max_entries: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self { cache, ttl }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.ttl(), config.max_entries)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn invalidate(&self, key: &str) {
        self.cache.invalidate(key).await;
    }

    pub fn clear(&self) {
        self.cache.invalidate_all();
    }

    /// Periodically evict expired entries.
    ///
    /// Expired entries are never served either way; the sweep only releases
    /// their memory. The task runs until the handle is aborted.
    pub fn spawn_cleanup(&self, interval: Duration) -> JoinHandle<()> {
        let cache = self.cache.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                cache.run_pending_tasks().await;
                debug!("Count cache sweep done, {} entries left", cache.entry_count());
            }
        })
    }
}

#[async_trait]
impl CountCache for MokaCountCache {
    async fn get(&self, key: &str) -> Option<Value> {
        self.cache.get(key).await
    }

    async fn set(&self, key: String, value: Value) {
        self.cache.insert(key, value).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = MokaCountCache::new(Duration::from_secs(300), 100);

        assert!(cache.get("User_1_read_Document_total").await.is_none());

        cache
            .set("User_1_read_Document_total".to_string(), Value::from(25u64))
            .await;
        assert_eq!(
            cache.get("User_1_read_Document_total").await,
            Some(Value::from(25u64))
        );

        cache.invalidate("User_1_read_Document_total").await;
        assert!(cache.get("User_1_read_Document_total").await.is_none());
    }

    #[tokio::test]
    async fn test_entries_expire_after_ttl() {
        let cache = MokaCountCache::new(Duration::from_millis(50), 100);
        cache.set("k".to_string(), Value::from(1u64)).await;

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(cache.get("k").await.is_none());
    }

    #[tokio::test]
    async fn test_from_config() {
        let cache = MokaCountCache::from_config(&CacheConfig::default());
        assert_eq!(cache.ttl(), Duration::from_secs(300));
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let cache = MokaCountCache::new(Duration::from_secs(1), 10);
        let handle = cache.spawn_cleanup(Duration::from_millis(10));

        tokio::time::sleep(Duration::from_millis(30)).await;
        handle.abort();

        assert!(handle.await.unwrap_err().is_cancelled());
    }
}
