// In-memory payload caches keyed by backend identifiers.
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::payload::{ContactPayload, MessagePayload};

/// Contacts keyed by `UserName`.
pub type ContactCache = PayloadCache<ContactPayload>;
/// Messages keyed by `MsgId`.
pub type MessageCache = PayloadCache<MessagePayload>;

/// Simple concurrent map for decoded payloads.
///
/// Entries are upserted by translation tasks and read back by the host; they
/// are never deleted for the life of the adapter, so there is no eviction.
///
/// ```
/// use padlink_puppet::PayloadCache;
///
/// let cache: PayloadCache<u32> = PayloadCache::new();
/// let rt = tokio::runtime::Runtime::new().expect("rt");
/// rt.block_on(async {
///     cache.store("k", 7).await;
///     assert_eq!(cache.load("k").await, Some(7));
/// });
/// ```
#[derive(Debug)]
pub struct PayloadCache<T> {
    // RwLock allows concurrent readers while upserts take exclusive access.
    inner: RwLock<HashMap<String, T>>,
}

impl<T: Clone> PayloadCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `key`. Latest value wins.
    pub async fn store(&self, key: impl Into<String>, value: T) {
        self.inner.write().await.insert(key.into(), value);
    }

    pub async fn load(&self, key: &str) -> Option<T> {
        self.inner.read().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

impl<T> Default for PayloadCache<T> {
    fn default() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::PayloadCache;
    use std::sync::Arc;

    #[tokio::test]
    async fn store_then_load() {
        let cache = PayloadCache::new();
        cache.store("m1", "first").await;
        assert_eq!(cache.load("m1").await, Some("first"));
        assert_eq!(cache.load("m2").await, None);
    }

    #[tokio::test]
    async fn upsert_is_latest_wins() {
        let cache = PayloadCache::new();
        cache.store("k", 1).await;
        cache.store("k", 2).await;
        assert_eq!(cache.load("k").await, Some(2));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn concurrent_upserts_lose_nothing() {
        let cache = Arc::new(PayloadCache::new());
        let mut tasks = Vec::new();
        for index in 0..64 {
            let cache = Arc::clone(&cache);
            tasks.push(tokio::spawn(async move {
                cache.store(format!("key-{index}"), index).await;
            }));
        }
        for task in tasks {
            task.await.expect("task join");
        }
        assert_eq!(cache.len().await, 64);
        for index in 0..64 {
            assert_eq!(cache.load(&format!("key-{index}")).await, Some(index));
        }
    }
}
