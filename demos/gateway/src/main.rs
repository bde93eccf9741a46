//! End-to-end pipeline demo on test doubles: routing, retrieval, generation
//! and the semantic cache, with no network or API keys required.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use sibyl::cache::{SemanticCache, SemanticCacheConfig};
use sibyl::core::{
    ChatResponse, DocumentRetriever, DocumentSource, Embeddings, Message, QueryType, SibylError,
    WebSearch, WebSearchResult,
};
use sibyl::embeddings::FakeEmbeddings;
use sibyl::gateway::Gateway;
use sibyl::models::ScriptedChatModel;
use sibyl::router::QueryRouter;

/// A tiny corpus standing in for the vector database.
struct DemoRetriever;

#[async_trait]
impl DocumentRetriever for DemoRetriever {
    async fn retrieve(
        &self,
        _query: &str,
        _query_type: QueryType,
        _embeddings: &dyn Embeddings,
    ) -> Result<Vec<DocumentSource>, SibylError> {
        Ok(vec![DocumentSource::new(
            "The embeddings endpoint accepts POST requests with a JSON body \
             containing the input text and the model name.",
            "docs_query",
        )
        .with_score(0.91)])
    }
}

struct DemoWeb;

#[async_trait]
impl WebSearch for DemoWeb {
    async fn search(&self, query: &str) -> Result<WebSearchResult, SibylError> {
        Ok(WebSearchResult {
            answer: format!("Live web answer for '{query}'."),
            raw: json!({"provider": "demo"}),
        })
    }
}

fn ai(text: &str) -> ChatResponse {
    ChatResponse {
        message: Message::ai(text),
        usage: None,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cache_file = std::env::temp_dir().join("sibyl_demo_gateway_cache.json");
    let _ = std::fs::remove_file(&cache_file);

    // Scripted model: one routing reply and one generation reply. A second
    // trip through the pipeline would exhaust it — the cache prevents that.
    let model = Arc::new(ScriptedChatModel::new(vec![
        ai(r#"{"action": "DOCS_QUERY", "reason": "API usage question", "answer": ""}"#),
        ai("Send a POST request with a JSON body containing the input text."),
    ]));
    let embeddings = Arc::new(FakeEmbeddings::new(8));

    let cache_config = SemanticCacheConfig::new()
        .with_dimension(8)
        .with_distance_threshold(0.05)
        .with_path(&cache_file);
    let cache = Arc::new(SemanticCache::open(cache_config, embeddings.clone()).await);

    let gateway = Gateway::new(
        cache.clone(),
        QueryRouter::new(model.clone()),
        Arc::new(DemoRetriever),
        Arc::new(DemoWeb),
        model,
        embeddings,
    );

    let question = "How do I call the embeddings endpoint?";

    println!("=== First query (full pipeline) ===");
    let first = gateway.answer(question, true).await;
    println!("answer:     {}", first.answer);
    println!("routed to:  {}", first.query_type);
    println!("sources:    {}", first.sources.len());
    println!(
        "cache hit:  {}",
        first.cache_metrics.as_ref().map(|m| m.hit).unwrap_or(false)
    );

    println!("\n=== Same query again (semantic cache) ===");
    let second = gateway.answer(question, true).await;
    println!("answer:     {}", second.answer);
    println!(
        "cache hit:  {} (similarity {:?})",
        second.cache_metrics.as_ref().map(|m| m.hit).unwrap_or(false),
        second
            .cache_metrics
            .as_ref()
            .and_then(|m| m.similarity_score)
    );

    println!("\n=== Cache stats ===");
    let stats = cache.stats().await;
    println!("entries: {}, file: {}", stats.cache_size, stats.storage_path);

    println!("\nGateway demo completed successfully!");
}
