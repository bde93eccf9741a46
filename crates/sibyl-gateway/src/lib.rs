//! The RAG orchestration pipeline.
//!
//! One [`Gateway`] owns the full answer path: semantic cache lookup, query
//! routing, document retrieval or live web search, LLM generation, and the
//! cache fill for the next caller. Collaborator failures degrade to
//! error-text answers; the pipeline itself never returns an error.

use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Value};
use sibyl_cache::SemanticCache;
use sibyl_core::{
    CacheMetrics, ChatModel, ChatRequest, DocumentRetriever, DocumentSource, Embeddings, Message,
    QueryType, SearchResponse, WebSearch,
};
use sibyl_router::QueryRouter;

const WEB_SEARCH_DISABLED_NOTICE: &str =
    "Web search is disabled. Please enable it to search for external information.";

/// The query-answering pipeline, explicitly wired from its collaborators.
pub struct Gateway {
    cache: Arc<SemanticCache>,
    router: QueryRouter,
    retriever: Arc<dyn DocumentRetriever>,
    web: Arc<dyn WebSearch>,
    model: Arc<dyn ChatModel>,
    embeddings: Arc<dyn Embeddings>,
}

impl Gateway {
    pub fn new(
        cache: Arc<SemanticCache>,
        router: QueryRouter,
        retriever: Arc<dyn DocumentRetriever>,
        web: Arc<dyn WebSearch>,
        model: Arc<dyn ChatModel>,
        embeddings: Arc<dyn Embeddings>,
    ) -> Self {
        Self {
            cache,
            router,
            retriever,
            web,
            model,
            embeddings,
        }
    }

    /// Answer one query.
    ///
    /// The semantic cache is consulted first; on a hit the stored response
    /// payload is replayed verbatim. On a miss the query is routed, answered
    /// from the chosen source, and the fresh response is cached for future
    /// callers.
    pub async fn answer(&self, query: &str, allow_web_search: bool) -> SearchResponse {
        let started = Instant::now();

        let (cached, cache_metrics) = self.cache.search(query).await;
        if let Some(payload) = cached {
            return replay_payload(payload, cache_metrics, started.elapsed().as_secs_f64());
        }

        let decision = self.router.route(query).await;

        if decision.action == QueryType::Web && !allow_web_search {
            return SearchResponse {
                answer: WEB_SEARCH_DISABLED_NOTICE.to_string(),
                sources: Vec::new(),
                query_type: decision.action,
                cache_metrics: Some(cache_metrics),
                processing_time: started.elapsed().as_secs_f64(),
            };
        }

        let (answer, sources) = match decision.action {
            QueryType::Docs | QueryType::Reports => {
                self.answer_from_documents(query, decision.action).await
            }
            QueryType::Web => self.answer_from_web(query).await,
        };

        let response = SearchResponse {
            answer,
            sources,
            query_type: decision.action,
            cache_metrics: Some(cache_metrics),
            processing_time: started.elapsed().as_secs_f64(),
        };

        let payload = build_payload(&response, &decision.reason);
        if !self.cache.store(query, payload).await {
            tracing::warn!(query, "response was not cached");
        }

        response
    }

    /// Answer a possibly compound query by dividing it into sub-questions
    /// and answering each independently.
    ///
    /// A query that does not divide is answered normally. Combined answers
    /// carry every sub-answer's sources and no cache metrics of their own
    /// (each sub-answer went through the cache individually).
    pub async fn answer_split(&self, query: &str, allow_web_search: bool) -> SearchResponse {
        let started = Instant::now();

        let sub_questions = self.router.split(query).await;
        if sub_questions.len() <= 1 {
            return self.answer(query, allow_web_search).await;
        }

        tracing::info!(count = sub_questions.len(), "answering sub-questions");

        let mut blocks = Vec::with_capacity(sub_questions.len());
        let mut all_sources = Vec::new();
        for (i, sub_question) in sub_questions.iter().enumerate() {
            let result = self.answer(sub_question, allow_web_search).await;
            blocks.push(format!(
                "Sub-question {}: {sub_question}\nAnswer: {}",
                i + 1,
                result.answer
            ));
            all_sources.extend(result.sources);
        }

        SearchResponse {
            answer: blocks.join("\n\n"),
            sources: all_sources,
            query_type: QueryType::Web,
            cache_metrics: None,
            processing_time: started.elapsed().as_secs_f64(),
        }
    }

    async fn answer_from_documents(
        &self,
        query: &str,
        query_type: QueryType,
    ) -> (String, Vec<DocumentSource>) {
        let documents = match self
            .retriever
            .retrieve(query, query_type, self.embeddings.as_ref())
            .await
        {
            Ok(documents) => documents,
            Err(e) => {
                tracing::error!(error = %e, query, "document retrieval failed");
                return (format!("Error retrieving documents: {e}"), Vec::new());
            }
        };

        if documents.is_empty() {
            return (
                "No relevant documents found in the database.".to_string(),
                Vec::new(),
            );
        }

        let context: Vec<&str> = documents.iter().map(|d| d.content.as_str()).collect();
        let answer = self.generate(query, &context).await;
        (answer, documents)
    }

    async fn answer_from_web(&self, query: &str) -> (String, Vec<DocumentSource>) {
        match self.web.search(query).await {
            Ok(result) => {
                let source = DocumentSource::new(result.answer.clone(), "web_search")
                    .with_metadata(json!({
                        "search_query": query,
                        "full_response": result.raw,
                    }));
                (result.answer, vec![source])
            }
            Err(e) => {
                tracing::error!(error = %e, query, "web search failed");
                (format!("Error performing web search: {e}"), Vec::new())
            }
        }
    }

    /// Generate an answer from retrieved context chunks.
    async fn generate(&self, query: &str, context: &[&str]) -> String {
        let prompt = format!(
            "Based on the given context, answer the user query: {query}\n\n\
             Context:\n{}\n\n\
             Provide a comprehensive answer using the provided context and \
             reference the relevant information sources where appropriate.",
            context.join("\n")
        );

        let request = ChatRequest::new(vec![Message::system(prompt)]);
        match self.model.chat(request).await {
            Ok(response) => response.message.content().to_string(),
            Err(e) => {
                tracing::error!(error = %e, query, "answer generation failed");
                format!("Error generating response: {e}")
            }
        }
    }
}

/// Rebuild a [`SearchResponse`] from a cached payload, keeping the answer,
/// sources and query type exactly as originally returned.
fn replay_payload(payload: Value, metrics: CacheMetrics, processing_time: f64) -> SearchResponse {
    let answer = payload["answer"].as_str().unwrap_or_default().to_string();
    let sources = payload
        .get("sources")
        .cloned()
        .and_then(|s| serde_json::from_value(s).ok())
        .unwrap_or_default();
    let query_type = payload
        .get("query_type")
        .cloned()
        .and_then(|q| serde_json::from_value(q).ok())
        .unwrap_or(QueryType::Web);

    SearchResponse {
        answer,
        sources,
        query_type,
        cache_metrics: Some(metrics),
        processing_time,
    }
}

/// The payload cached for replay: answer, sources, query classification and
/// the routing rationale.
fn build_payload(response: &SearchResponse, routing_reason: &str) -> Value {
    json!({
        "answer": response.answer,
        "sources": response.sources,
        "query_type": response.query_type,
        "routing_reason": routing_reason,
    })
}
