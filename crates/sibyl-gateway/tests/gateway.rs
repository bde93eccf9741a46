use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use sibyl_cache::{SemanticCache, SemanticCacheConfig};
use sibyl_core::{
    ChatResponse, DocumentRetriever, DocumentSource, Embeddings, Message, QueryType, SibylError,
    WebSearch, WebSearchResult,
};
use sibyl_embeddings::FakeEmbeddings;
use sibyl_gateway::Gateway;
use sibyl_models::ScriptedChatModel;
use sibyl_router::QueryRouter;

/// Retriever double returning a fixed set of documents.
struct StaticRetriever {
    documents: Vec<DocumentSource>,
}

#[async_trait]
impl DocumentRetriever for StaticRetriever {
    async fn retrieve(
        &self,
        _query: &str,
        _query_type: QueryType,
        _embeddings: &dyn Embeddings,
    ) -> Result<Vec<DocumentSource>, SibylError> {
        Ok(self.documents.clone())
    }
}

/// Retriever double that always fails.
struct FailingRetriever;

#[async_trait]
impl DocumentRetriever for FailingRetriever {
    async fn retrieve(
        &self,
        _query: &str,
        _query_type: QueryType,
        _embeddings: &dyn Embeddings,
    ) -> Result<Vec<DocumentSource>, SibylError> {
        Err(SibylError::VectorStore("collection unavailable".to_string()))
    }
}

/// Web search double returning a fixed answer.
struct StaticWeb {
    answer: String,
}

#[async_trait]
impl WebSearch for StaticWeb {
    async fn search(&self, _query: &str) -> Result<WebSearchResult, SibylError> {
        Ok(WebSearchResult {
            answer: self.answer.clone(),
            raw: json!({"provider": "static"}),
        })
    }
}

fn reply(text: &str) -> ChatResponse {
    ChatResponse {
        message: Message::ai(text),
        usage: None,
    }
}

fn route_reply(action: &str, reason: &str) -> ChatResponse {
    reply(&format!(
        r#"{{"action": "{action}", "reason": "{reason}", "answer": ""}}"#
    ))
}

async fn fresh_cache() -> Arc<SemanticCache> {
    let config = SemanticCacheConfig::new()
        .with_dimension(8)
        .with_distance_threshold(0.0001)
        .with_path(tempdir().join("cache.json"));
    Arc::new(SemanticCache::open(config, Arc::new(FakeEmbeddings::new(8))).await)
}

fn gateway(
    cache: Arc<SemanticCache>,
    model: ScriptedChatModel,
    retriever: Arc<dyn DocumentRetriever>,
    web: Arc<dyn WebSearch>,
) -> Gateway {
    let model = Arc::new(model);
    Gateway::new(
        cache,
        QueryRouter::new(model.clone()),
        retriever,
        web,
        model,
        Arc::new(FakeEmbeddings::new(8)),
    )
}

#[tokio::test]
async fn document_query_is_answered_then_replayed_from_cache() {
    let cache = fresh_cache().await;
    let model = ScriptedChatModel::new(vec![
        route_reply("DOCS_QUERY", "api question"),
        reply("The endpoint accepts POST requests."),
    ]);
    let retriever = Arc::new(StaticRetriever {
        documents: vec![DocumentSource::new("endpoint docs chunk", "docs_query")],
    });
    let gateway = gateway(
        cache.clone(),
        model.clone(),
        retriever,
        Arc::new(StaticWeb {
            answer: "unused".to_string(),
        }),
    );

    let first = gateway.answer("how do I call the endpoint?", true).await;
    assert_eq!(first.answer, "The endpoint accepts POST requests.");
    assert_eq!(first.query_type, QueryType::Docs);
    assert_eq!(first.sources.len(), 1);
    assert!(!first.cache_metrics.as_ref().unwrap().hit);
    assert_eq!(cache.stats().await.cache_size, 1);

    // Second identical query: served from the cache, with the scripted model
    // exhausted so any further model call would have failed loudly.
    assert_eq!(model.remaining().await, 0);
    let second = gateway.answer("how do I call the endpoint?", true).await;
    assert_eq!(second.answer, first.answer);
    assert_eq!(second.query_type, QueryType::Docs);
    assert_eq!(second.sources.len(), 1);
    assert!(second.cache_metrics.as_ref().unwrap().hit);
}

#[tokio::test]
async fn web_query_uses_the_search_provider() {
    let cache = fresh_cache().await;
    let model = ScriptedChatModel::new(vec![route_reply("WEB_QUERY", "needs the internet")]);
    let gateway = gateway(
        cache,
        model,
        Arc::new(StaticRetriever { documents: vec![] }),
        Arc::new(StaticWeb {
            answer: "Live answer from the web.".to_string(),
        }),
    );

    let response = gateway.answer("latest rust release?", true).await;
    assert_eq!(response.answer, "Live answer from the web.");
    assert_eq!(response.query_type, QueryType::Web);
    assert_eq!(response.sources.len(), 1);
    assert_eq!(response.sources[0].source_type, "web_search");
}

#[tokio::test]
async fn disabled_web_search_returns_a_notice_and_caches_nothing() {
    let cache = fresh_cache().await;
    let model = ScriptedChatModel::new(vec![route_reply("WEB_QUERY", "needs the internet")]);
    let gateway = gateway(
        cache.clone(),
        model,
        Arc::new(StaticRetriever { documents: vec![] }),
        Arc::new(StaticWeb {
            answer: "should not be used".to_string(),
        }),
    );

    let response = gateway.answer("latest rust release?", false).await;
    assert!(response.answer.contains("Web search is disabled"));
    assert!(response.sources.is_empty());
    assert_eq!(cache.stats().await.cache_size, 0);
}

#[tokio::test]
async fn empty_retrieval_skips_generation() {
    let cache = fresh_cache().await;
    let model = ScriptedChatModel::new(vec![route_reply("REPORTS_QUERY", "report data")]);
    let gateway = gateway(
        cache,
        model.clone(),
        Arc::new(StaticRetriever { documents: vec![] }),
        Arc::new(StaticWeb {
            answer: "unused".to_string(),
        }),
    );

    let response = gateway.answer("revenue figures?", true).await;
    assert!(response.answer.contains("No relevant documents"));
    assert!(response.sources.is_empty());
    // Only the routing call was made.
    assert_eq!(model.remaining().await, 0);
}

#[tokio::test]
async fn retrieval_failure_degrades_to_an_error_answer() {
    let cache = fresh_cache().await;
    let model = ScriptedChatModel::new(vec![route_reply("DOCS_QUERY", "api question")]);
    let gateway = gateway(
        cache,
        model,
        Arc::new(FailingRetriever),
        Arc::new(StaticWeb {
            answer: "unused".to_string(),
        }),
    );

    let response = gateway.answer("how do I call the endpoint?", true).await;
    assert!(response.answer.contains("Error retrieving documents"));
    assert!(response.sources.is_empty());
}

#[tokio::test]
async fn compound_query_is_split_and_combined() {
    let cache = fresh_cache().await;
    let model = ScriptedChatModel::new(vec![
        reply(
            r#"{"subQuestions": ["What is the latest Rust release?", "What is the latest Cargo release?"]}"#,
        ),
        route_reply("WEB_QUERY", "current information"),
        route_reply("WEB_QUERY", "current information"),
    ]);
    let gateway = gateway(
        cache,
        model,
        Arc::new(StaticRetriever { documents: vec![] }),
        Arc::new(StaticWeb {
            answer: "a web answer".to_string(),
        }),
    );

    let response = gateway
        .answer_split("latest rust release and latest cargo release?", true)
        .await;
    assert!(response.answer.contains("Sub-question 1: What is the latest Rust release?"));
    assert!(response.answer.contains("Sub-question 2: What is the latest Cargo release?"));
    assert_eq!(response.sources.len(), 2);
    assert!(response.cache_metrics.is_none());
}

#[tokio::test]
async fn single_sub_question_is_answered_normally() {
    let cache = fresh_cache().await;
    let model = ScriptedChatModel::new(vec![
        reply(r#"{"subQuestions": ["What is the latest Rust release?"]}"#),
        route_reply("WEB_QUERY", "current information"),
    ]);
    let gateway = gateway(
        cache,
        model,
        Arc::new(StaticRetriever { documents: vec![] }),
        Arc::new(StaticWeb {
            answer: "a web answer".to_string(),
        }),
    );

    let response = gateway
        .answer_split("What is the latest Rust release?", true)
        .await;
    assert_eq!(response.answer, "a web answer");
    assert!(response.cache_metrics.is_some());
}

fn tempdir() -> std::path::PathBuf {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let id = COUNTER.fetch_add(1, Ordering::SeqCst);
    let dir = std::env::temp_dir().join(format!(
        "sibyl_test_gateway_{}_{}",
        std::process::id(),
        id,
    ));
    // Clean up any leftover from previous runs
    let _ = std::fs::remove_dir_all(&dir);
    dir
}
