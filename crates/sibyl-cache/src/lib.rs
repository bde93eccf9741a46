//! The semantic query cache.
//!
//! Cached question/answer pairs are held as five aligned sequences (question,
//! embedding, answer text, full response payload, timestamp) plus a flat
//! nearest-neighbor index over the embeddings. Position `i` in every sequence
//! and ordinal `i` in the index always refer to the same logical entry; every
//! mutation preserves that correspondence and rewrites the backing file.

mod engine;
mod index;
mod store;

pub use engine::{CacheStats, SemanticCache};
pub use index::FlatL2Index;
pub use store::{CacheEntry, CacheRecords, CacheStore};

use std::path::PathBuf;

/// Configuration for [`SemanticCache`].
#[derive(Debug, Clone)]
pub struct SemanticCacheConfig {
    /// Dimensionality of the embedding vectors.
    pub dimension: usize,
    /// Squared-L2 distance at or below which a lookup is a hit.
    pub distance_threshold: f32,
    /// Location of the persisted cache file.
    pub path: PathBuf,
}

impl SemanticCacheConfig {
    pub fn new() -> Self {
        Self {
            dimension: 768,
            distance_threshold: 0.8,
            path: PathBuf::from("./cache.json"),
        }
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    pub fn with_distance_threshold(mut self, threshold: f32) -> Self {
        self.distance_threshold = threshold;
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }
}

impl Default for SemanticCacheConfig {
    fn default() -> Self {
        Self::new()
    }
}
