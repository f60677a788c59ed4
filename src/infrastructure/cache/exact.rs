use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::error;

use crate::domain::AgentReply;

struct Entry {
    reply: AgentReply,
    inserted_at: Instant,
    seq: u64,
}

struct Inner {
    entries: HashMap<String, Entry>,
    // Insertion order queue with lazy deletion. A queue slot whose seq no
    // longer matches the live entry belongs to an overwritten key.
    order: VecDeque<(String, u64)>,
    seq: u64,
}

/// Statistics snapshot for the exact tier.
///
/// Expired lookups are counted apart from misses so TTL churn is visible
/// separately from genuine novel traffic.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExactCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub expired: u64,
    pub evictions: u64,
    pub size: usize,
}

/// First cache tier: exact match on the canonical message+context key.
///
/// Bounded FIFO store with lazy TTL expiry. Entries are only removed on
/// lookup or when eviction makes room, never by a background task.
pub struct ExactMatchCache {
    inner: Mutex<Inner>,
    ttl: Duration,
    max_size: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    expired: AtomicU64,
    evictions: AtomicU64,
}

impl ExactMatchCache {
    pub fn new(ttl: Duration, max_size: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: VecDeque::new(),
                seq: 0,
            }),
            ttl,
            max_size,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            expired: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub async fn get(&self, key: &str) -> Option<AgentReply> {
        let mut inner = self.inner.lock().await;

        match inner.entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.reply.clone())
            }
            Some(_) => {
                inner.entries.remove(key);
                self.expired.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub async fn insert(&self, key: impl Into<String>, reply: AgentReply) {
        let key = key.into();
        let mut inner = self.inner.lock().await;

        let seq = inner.seq;
        inner.seq += 1;
        inner.order.push_back((key.clone(), seq));
        inner.entries.insert(
            key,
            Entry {
                reply,
                inserted_at: Instant::now(),
                seq,
            },
        );

        while inner.entries.len() > self.max_size {
            let Some((evict_key, evict_seq)) = inner.order.pop_front() else {
                break;
            };

            if inner.entries.get(&evict_key).map(|e| e.seq) == Some(evict_seq) {
                inner.entries.remove(&evict_key);
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }

        if inner.entries.len() > self.max_size {
            error!(
                size = inner.entries.len(),
                max_size = self.max_size,
                "Exact cache exceeded its capacity bound"
            );
        }
    }

    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        inner.entries.clear();
        inner.order.clear();
    }

    pub async fn stats(&self) -> ExactCacheStats {
        let inner = self.inner.lock().await;

        ExactCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size: inner.entries.len(),
        }
    }
}

impl std::fmt::Debug for ExactMatchCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExactMatchCache")
            .field("ttl", &self.ttl)
            .field("max_size", &self.max_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(text: &str) -> AgentReply {
        AgentReply {
            response: text.to_string(),
            ..AgentReply::default()
        }
    }

    #[tokio::test]
    async fn test_hit_and_miss() {
        let cache = ExactMatchCache::new(Duration::from_secs(60), 10);

        cache.insert("key-a", reply("cached answer")).await;

        assert_eq!(
            cache.get("key-a").await.map(|r| r.response),
            Some("cached answer".to_string())
        );
        assert!(cache.get("key-b").await.is_none());

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
    }

    #[tokio::test]
    async fn test_expired_entry_counts_separately() {
        let cache = ExactMatchCache::new(Duration::from_millis(0), 10);

        cache.insert("key-a", reply("stale")).await;
        assert!(cache.get("key-a").await.is_none());

        let stats = cache.stats().await;
        assert_eq!(stats.expired, 1);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.size, 0);
    }

    #[tokio::test]
    async fn test_fifo_eviction_removes_oldest() {
        let cache = ExactMatchCache::new(Duration::from_secs(60), 2);

        cache.insert("first", reply("1")).await;
        cache.insert("second", reply("2")).await;
        cache.insert("third", reply("3")).await;

        assert!(cache.get("first").await.is_none());
        assert!(cache.get("second").await.is_some());
        assert!(cache.get("third").await.is_some());

        let stats = cache.stats().await;
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.size, 2);
    }

    #[tokio::test]
    async fn test_overwrite_does_not_evict_newer_keys() {
        let cache = ExactMatchCache::new(Duration::from_secs(60), 2);

        cache.insert("a", reply("1")).await;
        cache.insert("b", reply("2")).await;
        // Overwriting "a" leaves a stale queue slot behind
        cache.insert("a", reply("1-updated")).await;
        cache.insert("c", reply("3")).await;

        // "b" was the oldest live insertion and goes first
        assert!(cache.get("b").await.is_none());
        assert_eq!(
            cache.get("a").await.map(|r| r.response),
            Some("1-updated".to_string())
        );
        assert!(cache.get("c").await.is_some());
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = ExactMatchCache::new(Duration::from_secs(60), 10);

        cache.insert("a", reply("1")).await;
        cache.clear().await;

        assert!(cache.get("a").await.is_none());
        assert_eq!(cache.stats().await.size, 0);
    }
}
