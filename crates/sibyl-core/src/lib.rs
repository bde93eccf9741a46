use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A chat message. Tagged enum with System, Human, and AI variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role")]
pub enum Message {
    #[serde(rename = "system")]
    System { content: String },
    #[serde(rename = "human")]
    Human { content: String },
    #[serde(rename = "assistant")]
    AI { content: String },
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message::System {
            content: content.into(),
        }
    }

    pub fn human(content: impl Into<String>) -> Self {
        Message::Human {
            content: content.into(),
        }
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Message::AI {
            content: content.into(),
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Message::System { content } | Message::Human { content } | Message::AI { content } => {
                content
            }
        }
    }

    pub fn is_ai(&self) -> bool {
        matches!(self, Message::AI { .. })
    }
}

// ---------------------------------------------------------------------------
// Chat request / response
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
}

impl ChatRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: Message,
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

// ---------------------------------------------------------------------------
// Query domain types
// ---------------------------------------------------------------------------

/// Which answer source a query should be served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryType {
    /// Documentation corpus held in the vector database.
    #[serde(rename = "DOCS_QUERY")]
    Docs,
    /// Structured report corpus held in the vector database.
    #[serde(rename = "REPORTS_QUERY")]
    Reports,
    /// Live internet search.
    #[serde(rename = "WEB_QUERY")]
    Web,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Docs => "DOCS_QUERY",
            QueryType::Reports => "REPORTS_QUERY",
            QueryType::Web => "WEB_QUERY",
        }
    }
}

impl std::fmt::Display for QueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of routing a query: the chosen source plus the model's rationale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterDecision {
    pub action: QueryType,
    pub reason: String,
    /// At most a five-word quick answer; empty for web queries.
    #[serde(default)]
    pub answer: String,
}

/// Per-call cache observation returned alongside every search result.
///
/// `similarity_score` is `1.0 - squared_l2_distance` — a relative ranking
/// signal, not a normalized similarity. It is only meaningful while vectors
/// are unit-length and distances stay below ~2.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMetrics {
    pub hit: bool,
    pub similarity_score: Option<f32>,
    /// Wall-clock duration of the cache lookup, in seconds.
    pub response_time: f64,
    /// Number of cached entries before this call's potential insertion.
    pub cache_size: usize,
}

impl CacheMetrics {
    pub fn hit(similarity_score: f32, response_time: f64, cache_size: usize) -> Self {
        Self {
            hit: true,
            similarity_score: Some(similarity_score),
            response_time,
            cache_size,
        }
    }

    pub fn miss(response_time: f64, cache_size: usize) -> Self {
        Self {
            hit: false,
            similarity_score: None,
            response_time,
            cache_size,
        }
    }
}

/// A supporting document returned with an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSource {
    pub content: String,
    #[serde(default)]
    pub metadata: Value,
    #[serde(default)]
    pub score: Option<f32>,
    pub source_type: String,
}

impl DocumentSource {
    pub fn new(content: impl Into<String>, source_type: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: Value::Null,
            score: None,
            source_type: source_type.into(),
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }
}

/// The gateway's answer to one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<DocumentSource>,
    pub query_type: QueryType,
    #[serde(default)]
    pub cache_metrics: Option<CacheMetrics>,
    /// End-to-end processing time in seconds.
    pub processing_time: f64,
}

/// Result of a live web search: the synthesized answer plus the raw
/// provider response for callers that want more than the text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebSearchResult {
    pub answer: String,
    #[serde(default)]
    pub raw: Value,
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SibylError {
    #[error("model error: {0}")]
    Model(String),
    #[error("embedding error: {0}")]
    Embedding(String),
    #[error("cache error: {0}")]
    Cache(String),
    #[error("store error: {0}")]
    Store(String),
    #[error("vector store error: {0}")]
    VectorStore(String),
    #[error("tool error: {0}")]
    Tool(String),
    #[error("router error: {0}")]
    Router(String),
    #[error("parsing error: {0}")]
    Parsing(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("timeout: {0}")]
    Timeout(String),
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Trait for chat completion models.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, SibylError>;
}

/// Trait for embedding text into vectors.
///
/// Implementations are expected to return unit-length vectors of a fixed
/// dimension; consumers that care (the semantic cache) verify the dimension
/// but not the norm.
#[async_trait]
pub trait Embeddings: Send + Sync {
    /// Embed multiple texts (for batch document embedding).
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, SibylError>;

    /// Embed a single query text.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, SibylError>;
}

/// Trait for retrieving supporting documents for a routed query.
#[async_trait]
pub trait DocumentRetriever: Send + Sync {
    async fn retrieve(
        &self,
        query: &str,
        query_type: QueryType,
        embeddings: &dyn Embeddings,
    ) -> Result<Vec<DocumentSource>, SibylError>;
}

/// Trait for live internet search providers.
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<WebSearchResult, SibylError>;
}
