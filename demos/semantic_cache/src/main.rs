use std::sync::Arc;

use serde_json::json;
use sibyl::cache::{SemanticCache, SemanticCacheConfig};
use sibyl::core::SibylError;
use sibyl::embeddings::FakeEmbeddings;

#[tokio::main]
async fn main() -> Result<(), SibylError> {
    tracing_subscriber::fmt::init();

    // --- Setup: deterministic embeddings + a cache file in temp ---
    let cache_file = std::env::temp_dir().join("sibyl_demo_cache.json");
    let _ = std::fs::remove_file(&cache_file);

    let embeddings = Arc::new(FakeEmbeddings::new(8));
    let config = SemanticCacheConfig::new()
        .with_dimension(8)
        .with_distance_threshold(0.05)
        .with_path(&cache_file);
    let cache = SemanticCache::open(config, embeddings).await;

    // --- First lookup: cache miss ---
    println!("=== Cache Miss (empty cache) ===");
    let (payload, metrics) = cache.search("What is the capital of France?").await;
    println!("hit: {}, cache size: {}", metrics.hit, metrics.cache_size);
    assert!(payload.is_none());

    // --- Store the generated answer ---
    println!("\n=== Store ===");
    let stored = cache
        .store(
            "What is the capital of France?",
            json!({
                "answer": "The capital of France is Paris.",
                "sources": [],
                "query_type": "WEB_QUERY",
                "routing_reason": "general knowledge"
            }),
        )
        .await;
    println!("stored: {stored}");

    // --- Same question again: cache hit ---
    println!("\n=== Cache Hit (same question) ===");
    let (payload, metrics) = cache.search("What is the capital of France?").await;
    println!(
        "hit: {}, similarity: {:?}, answer: {}",
        metrics.hit,
        metrics.similarity_score,
        payload.map(|p| p["answer"].to_string()).unwrap_or_default()
    );

    // --- Unrelated question: cache miss ---
    println!("\n=== Cache Miss (different question) ===");
    let (_, metrics) = cache.search("Who created Rust?").await;
    println!("hit: {}, cache size: {}", metrics.hit, metrics.cache_size);

    // --- Stats and clear ---
    println!("\n=== Stats ===");
    let stats = cache.stats().await;
    println!(
        "entries: {}, dimension: {}, threshold: {}, file: {}",
        stats.cache_size, stats.embedding_dimension, stats.threshold, stats.storage_path
    );

    println!("\n=== Clear ===");
    cache.clear().await?;
    println!("cache size after clear: {}", cache.stats().await.cache_size);

    println!("\nSemantic cache demo completed successfully!");
    Ok(())
}
