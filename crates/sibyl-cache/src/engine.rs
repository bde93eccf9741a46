use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sibyl_core::{CacheMetrics, Embeddings, SibylError};
use tokio::sync::RwLock;

use crate::index::FlatL2Index;
use crate::store::{CacheEntry, CacheStore};
use crate::SemanticCacheConfig;

/// Read-only snapshot of the cache configuration and size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub cache_size: usize,
    pub threshold: f32,
    pub embedding_dimension: usize,
    pub storage_path: String,
}

/// Store and index are guarded together: a `store` call mutates both under
/// one write lock, so row `i` in storage and ordinal `i` in the index can
/// never be observed out of step.
struct CacheState {
    store: CacheStore,
    index: FlatL2Index,
}

/// The semantic cache engine: embeds incoming questions, finds the nearest
/// cached question, and decides hit or miss by squared-L2 distance.
///
/// All failures degrade: a `search` that cannot embed or match reports a
/// miss, a `store` that cannot embed or persist reports `false`. Nothing in
/// the public API panics or propagates collaborator errors.
pub struct SemanticCache {
    config: SemanticCacheConfig,
    embeddings: Arc<dyn Embeddings>,
    state: RwLock<CacheState>,
}

impl SemanticCache {
    /// Load the persisted cache (or start empty) and rebuild the index from
    /// the stored embeddings. A stored embedding of the wrong dimension
    /// means the file belongs to a different configuration; the cache then
    /// starts empty rather than serving mismatched answers.
    pub async fn open(config: SemanticCacheConfig, embeddings: Arc<dyn Embeddings>) -> Self {
        let mut store = CacheStore::load(&config.path).await;
        let mut index = FlatL2Index::new(config.dimension);

        let mut rebuild_failed = false;
        for embedding in &store.records().embeddings {
            if let Err(e) = index.insert(embedding.clone()) {
                tracing::error!(
                    error = %e,
                    path = %config.path.display(),
                    "stored embedding does not fit the index, starting empty"
                );
                rebuild_failed = true;
                break;
            }
        }
        if rebuild_failed {
            store.reset_in_memory();
            index.reset();
        }

        tracing::info!(
            entries = store.len(),
            dimension = config.dimension,
            threshold = config.distance_threshold,
            "semantic cache ready"
        );

        Self {
            config,
            embeddings,
            state: RwLock::new(CacheState { store, index }),
        }
    }

    /// Look up a cached response for `question`.
    ///
    /// Returns the stored response payload when the nearest cached question
    /// is within the distance threshold, `None` otherwise. Embedding
    /// failures are logged and reported as a miss; the caller cannot tell a
    /// failure from a legitimate miss without consulting the logs.
    pub async fn search(&self, question: &str) -> (Option<Value>, CacheMetrics) {
        let started = Instant::now();

        let embedding = match self.embeddings.embed_query(question).await {
            Ok(embedding) => embedding,
            Err(e) => {
                tracing::warn!(error = %e, question, "embedding failed during cache search");
                let cache_size = self.state.read().await.store.len();
                return (
                    None,
                    CacheMetrics::miss(started.elapsed().as_secs_f64(), cache_size),
                );
            }
        };

        let state = self.state.read().await;
        let cache_size = state.store.len();

        if embedding.len() != self.config.dimension {
            tracing::warn!(
                expected = self.config.dimension,
                got = embedding.len(),
                question,
                "embedding has wrong dimension, treating as miss"
            );
            return (
                None,
                CacheMetrics::miss(started.elapsed().as_secs_f64(), cache_size),
            );
        }

        if let Some((ordinal, distance)) = state.index.nearest(&embedding) {
            if distance <= self.config.distance_threshold {
                // Distance-to-similarity conversion kept for compatibility:
                // a ranking signal, not a normalized similarity.
                let similarity = 1.0 - distance;
                match state.store.response_at(ordinal) {
                    Some(payload) => {
                        tracing::info!(
                            ordinal,
                            similarity,
                            matched = state.store.question_at(ordinal).unwrap_or(""),
                            "cache hit"
                        );
                        return (
                            Some(payload.clone()),
                            CacheMetrics::hit(
                                similarity,
                                started.elapsed().as_secs_f64(),
                                cache_size,
                            ),
                        );
                    }
                    None => {
                        // The write lock makes this unreachable; log rather
                        // than serve a payload that is not there.
                        tracing::error!(
                            ordinal,
                            entries = cache_size,
                            "index returned an ordinal the store does not have"
                        );
                    }
                }
            }
        }

        tracing::debug!(question, cache_size, "cache miss");
        (
            None,
            CacheMetrics::miss(started.elapsed().as_secs_f64(), cache_size),
        )
    }

    /// Cache `response_data` as the answer to `question`.
    ///
    /// Returns `false` without mutating anything when the question cannot be
    /// embedded, and `false` with the entry held only in memory when the
    /// rewrite to disk fails.
    pub async fn store(&self, question: &str, response_data: Value) -> bool {
        let embedding = match self.embeddings.embed_query(question).await {
            Ok(embedding) => embedding,
            Err(e) => {
                tracing::warn!(error = %e, question, "embedding failed during cache store");
                return false;
            }
        };
        if embedding.len() != self.config.dimension {
            tracing::warn!(
                expected = self.config.dimension,
                got = embedding.len(),
                question,
                "refusing to cache embedding of wrong dimension"
            );
            return false;
        }

        let mut state = self.state.write().await;

        if state.store.len() != state.index.len() {
            tracing::error!(
                store_len = state.store.len(),
                index_len = state.index.len(),
                "store and index are out of step, refusing to insert"
            );
            return false;
        }

        let answer = response_data
            .get("answer")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let entry = CacheEntry {
            question: question.to_string(),
            embedding: embedding.clone(),
            answer,
            response_data,
            created_at: unix_timestamp(),
        };

        // The dimension was checked above, so the index cannot reject the
        // vector; bail without touching the store if it somehow does.
        if let Err(e) = state.index.insert(embedding) {
            tracing::error!(error = %e, question, "index rejected embedding");
            return false;
        }

        match state.store.append(entry).await {
            Ok(()) => {
                tracing::info!(cache_size = state.store.len(), "stored new cache entry");
                true
            }
            Err(e) => {
                // The entry is in memory (store and index still aligned) but
                // not on disk; the caller sees the lost durability.
                tracing::error!(error = %e, question, "failed to persist cache entry");
                false
            }
        }
    }

    /// Current size and configuration. Pure read.
    pub async fn stats(&self) -> CacheStats {
        let state = self.state.read().await;
        CacheStats {
            cache_size: state.store.len(),
            threshold: self.config.distance_threshold,
            embedding_dimension: self.config.dimension,
            storage_path: self.config.path.display().to_string(),
        }
    }

    /// Drop every entry, reset the index, and persist the empty state.
    pub async fn clear(&self) -> Result<(), SibylError> {
        let mut state = self.state.write().await;
        state.index.reset();
        state.store.clear().await?;
        tracing::info!("semantic cache cleared");
        Ok(())
    }
}

fn unix_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
