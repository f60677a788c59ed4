use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::{cosine_similarity, AgentReply, EmbeddingProvider};

struct Entry {
    context_hash: String,
    embedding: Vec<f32>,
    reply: AgentReply,
    inserted_at: Instant,
    seq: u64,
}

/// Statistics snapshot for the semantic tier
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SemanticCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub expired: u64,
    pub evictions: u64,
    pub embedding_computations: u64,
    pub embedding_failures: u64,
    pub size: usize,
    pub threshold: f32,
}

/// Second cache tier: embedding similarity within one context partition.
///
/// A lookup only considers entries whose context hash matches exactly, so a
/// paraphrase is never answered with a reply generated under different
/// captured context. Embedding failures degrade to a miss rather than
/// failing the request.
pub struct SemanticCache {
    embedder: Arc<dyn EmbeddingProvider>,
    entries: Mutex<Vec<Entry>>,
    seq: AtomicU64,
    threshold: f32,
    ttl: Duration,
    max_size: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    expired: AtomicU64,
    evictions: AtomicU64,
    embedding_computations: AtomicU64,
    embedding_failures: AtomicU64,
}

impl SemanticCache {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        threshold: f32,
        ttl: Duration,
        max_size: usize,
    ) -> Self {
        Self {
            embedder,
            entries: Mutex::new(Vec::new()),
            seq: AtomicU64::new(0),
            threshold,
            ttl,
            max_size,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            expired: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            embedding_computations: AtomicU64::new(0),
            embedding_failures: AtomicU64::new(0),
        }
    }

    /// Find a cached reply whose message is a close paraphrase of this one,
    /// captured under the same context.
    pub async fn lookup(&self, message: &str, context_hash: &str) -> Option<AgentReply> {
        let query = match self.embed(message).await {
            Some(vector) => vector,
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        let mut entries = self.entries.lock().await;

        let before = entries.len();
        entries.retain(|e| e.inserted_at.elapsed() < self.ttl);
        let purged = (before - entries.len()) as u64;
        if purged > 0 {
            self.expired.fetch_add(purged, Ordering::Relaxed);
        }

        let mut best: Option<(f32, u64, &Entry)> = None;

        for entry in entries.iter().filter(|e| e.context_hash == context_hash) {
            let similarity = cosine_similarity(&query, &entry.embedding);

            if similarity < self.threshold {
                continue;
            }

            // Ties go to the most recently inserted entry
            let better = match best {
                None => true,
                Some((best_sim, best_seq, _)) => {
                    similarity > best_sim || (similarity == best_sim && entry.seq > best_seq)
                }
            };

            if better {
                best = Some((similarity, entry.seq, entry));
            }
        }

        match best {
            Some((similarity, _, entry)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(similarity, "Semantic cache hit");
                Some(entry.reply.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a generated reply under its message embedding. Skipped with a
    /// warning when the embedding provider is unavailable.
    pub async fn insert(&self, message: &str, context_hash: impl Into<String>, reply: AgentReply) {
        let Some(embedding) = self.embed(message).await else {
            return;
        };

        let mut entries = self.entries.lock().await;

        entries.push(Entry {
            context_hash: context_hash.into(),
            embedding,
            reply,
            inserted_at: Instant::now(),
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
        });

        while entries.len() > self.max_size {
            // Entries are pushed in insertion order, so the front is oldest
            entries.remove(0);
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }

    async fn embed(&self, message: &str) -> Option<Vec<f32>> {
        self.embedding_computations.fetch_add(1, Ordering::Relaxed);

        match self.embedder.embed(message).await {
            Ok(vector) => Some(vector),
            Err(e) => {
                self.embedding_failures.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "Embedding unavailable, semantic tier degraded");
                None
            }
        }
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    pub async fn stats(&self) -> SemanticCacheStats {
        SemanticCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            embedding_computations: self.embedding_computations.load(Ordering::Relaxed),
            embedding_failures: self.embedding_failures.load(Ordering::Relaxed),
            size: self.entries.lock().await.len(),
            threshold: self.threshold,
        }
    }
}

impl std::fmt::Debug for SemanticCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticCache")
            .field("threshold", &self.threshold)
            .field("ttl", &self.ttl)
            .field("max_size", &self.max_size)
            .finish()
    }
}
