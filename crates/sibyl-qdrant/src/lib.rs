//! Document retrieval backed by a [Qdrant](https://qdrant.tech/) instance.
//!
//! Each routable corpus maps to one Qdrant collection. Retrieval embeds the
//! query, searches the mapped collection, and converts the scored points
//! into [`DocumentSource`]s with the point payload carried as metadata.

use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::qdrant::{value::Kind, ScoredPoint, SearchPointsBuilder, Value as QdrantValue};
use qdrant_client::Qdrant;
use serde_json::Value as JsonValue;
use sibyl_core::{DocumentRetriever, DocumentSource, Embeddings, QueryType, SibylError};

// ---------------------------------------------------------------------------
// QdrantRetrieverConfig
// ---------------------------------------------------------------------------

/// Configuration for connecting to Qdrant and mapping query types to
/// collections.
#[derive(Debug, Clone)]
pub struct QdrantRetrieverConfig {
    /// Qdrant gRPC URL (e.g. `http://localhost:6334`).
    pub url: String,
    /// Optional API key for authentication.
    pub api_key: Option<String>,
    /// Collection holding the documentation corpus.
    pub docs_collection: String,
    /// Collection holding the structured report corpus.
    pub reports_collection: String,
    /// Number of documents to retrieve per query. Defaults to 3.
    pub limit: u64,
}

impl QdrantRetrieverConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: None,
            docs_collection: "docs_data".to_string(),
            reports_collection: "reports_data".to_string(),
            limit: 3,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_collections(
        mut self,
        docs: impl Into<String>,
        reports: impl Into<String>,
    ) -> Self {
        self.docs_collection = docs.into();
        self.reports_collection = reports.into();
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// The collection serving `query_type`, if any. Web queries have no
    /// backing collection.
    pub fn collection_for(&self, query_type: QueryType) -> Option<&str> {
        match query_type {
            QueryType::Docs => Some(&self.docs_collection),
            QueryType::Reports => Some(&self.reports_collection),
            QueryType::Web => None,
        }
    }
}

// ---------------------------------------------------------------------------
// QdrantRetriever
// ---------------------------------------------------------------------------

/// A [`DocumentRetriever`] over a Qdrant vector database.
pub struct QdrantRetriever {
    client: Qdrant,
    config: QdrantRetrieverConfig,
}

impl QdrantRetriever {
    /// Create a new retriever, connecting to Qdrant at the configured URL.
    pub fn new(config: QdrantRetrieverConfig) -> Result<Self, SibylError> {
        let mut builder = Qdrant::from_url(&config.url);
        if let Some(ref api_key) = config.api_key {
            builder = builder.api_key(api_key.clone());
        }
        let client = builder.build().map_err(|e| {
            SibylError::VectorStore(format!("failed to build Qdrant client: {e}"))
        })?;
        Ok(Self { client, config })
    }

    /// Create a retriever from an existing [`Qdrant`] client.
    pub fn from_client(client: Qdrant, config: QdrantRetrieverConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &QdrantRetrieverConfig {
        &self.config
    }

    /// Whether the Qdrant instance answers at all.
    pub async fn health_check(&self) -> bool {
        match self.client.list_collections().await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(error = %e, url = %self.config.url, "Qdrant health check failed");
                false
            }
        }
    }
}

#[async_trait]
impl DocumentRetriever for QdrantRetriever {
    async fn retrieve(
        &self,
        query: &str,
        query_type: QueryType,
        embeddings: &dyn Embeddings,
    ) -> Result<Vec<DocumentSource>, SibylError> {
        let Some(collection) = self.config.collection_for(query_type) else {
            tracing::warn!(%query_type, "no collection mapped for query type");
            return Ok(Vec::new());
        };

        let query_vec = embeddings.embed_query(query).await?;

        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(collection, query_vec, self.config.limit)
                    .with_payload(true),
            )
            .await
            .map_err(|e| SibylError::VectorStore(format!("search failed: {e}")))?;

        let documents: Vec<DocumentSource> = response
            .result
            .into_iter()
            .map(|point| scored_point_to_source(point, query_type))
            .collect();

        tracing::info!(
            count = documents.len(),
            collection,
            "retrieved documents"
        );
        Ok(documents)
    }
}

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

/// Extract a [`DocumentSource`] from a Qdrant [`ScoredPoint`]. The `content`
/// payload field becomes the document text; the whole payload rides along as
/// metadata.
fn scored_point_to_source(point: ScoredPoint, query_type: QueryType) -> DocumentSource {
    let content = point
        .payload
        .get("content")
        .and_then(|v| match &v.kind {
            Some(Kind::StringValue(s)) => Some(s.clone()),
            _ => None,
        })
        .unwrap_or_default();

    let metadata = payload_to_json(&point.payload);

    DocumentSource::new(content, query_type.as_str().to_lowercase())
        .with_metadata(metadata)
        .with_score(point.score)
}

fn payload_to_json(payload: &HashMap<String, QdrantValue>) -> JsonValue {
    let map: serde_json::Map<String, JsonValue> = payload
        .iter()
        .map(|(k, v)| (k.clone(), qdrant_to_json(v)))
        .collect();
    JsonValue::Object(map)
}

/// Convert a `qdrant_client::qdrant::Value` into a `serde_json::Value`.
fn qdrant_to_json(val: &QdrantValue) -> JsonValue {
    match &val.kind {
        None | Some(Kind::NullValue(_)) => JsonValue::Null,
        Some(Kind::BoolValue(b)) => JsonValue::Bool(*b),
        Some(Kind::IntegerValue(i)) => JsonValue::Number((*i).into()),
        Some(Kind::DoubleValue(d)) => serde_json::Number::from_f64(*d)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Some(Kind::StringValue(s)) => JsonValue::String(s.clone()),
        Some(Kind::ListValue(list)) => {
            JsonValue::Array(list.values.iter().map(qdrant_to_json).collect())
        }
        Some(Kind::StructValue(st)) => {
            let map: serde_json::Map<String, JsonValue> = st
                .fields
                .iter()
                .map(|(k, v)| (k.clone(), qdrant_to_json(v)))
                .collect();
            JsonValue::Object(map)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string_value(s: &str) -> QdrantValue {
        QdrantValue {
            kind: Some(Kind::StringValue(s.to_string())),
        }
    }

    #[test]
    fn collection_mapping() {
        let config = QdrantRetrieverConfig::new("http://localhost:6334");
        assert_eq!(config.collection_for(QueryType::Docs), Some("docs_data"));
        assert_eq!(
            config.collection_for(QueryType::Reports),
            Some("reports_data")
        );
        assert_eq!(config.collection_for(QueryType::Web), None);
    }

    #[test]
    fn builders_override_defaults() {
        let config = QdrantRetrieverConfig::new("http://localhost:6334")
            .with_api_key("secret")
            .with_collections("product_docs", "annual_reports")
            .with_limit(5);
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.collection_for(QueryType::Docs), Some("product_docs"));
        assert_eq!(config.limit, 5);
    }

    #[test]
    fn scored_point_extracts_content_and_score() {
        let point = ScoredPoint {
            payload: HashMap::from([
                ("content".to_string(), string_value("a chunk of text")),
                ("title".to_string(), string_value("doc title")),
            ]),
            score: 0.87,
            ..Default::default()
        };

        let source = scored_point_to_source(point, QueryType::Docs);
        assert_eq!(source.content, "a chunk of text");
        assert_eq!(source.score, Some(0.87));
        assert_eq!(source.source_type, "docs_query");
        assert_eq!(source.metadata["title"], "doc title");
    }

    #[test]
    fn scored_point_without_content_is_empty() {
        let point = ScoredPoint {
            payload: HashMap::new(),
            score: 0.5,
            ..Default::default()
        };
        let source = scored_point_to_source(point, QueryType::Reports);
        assert!(source.content.is_empty());
        assert_eq!(source.source_type, "reports_query");
    }

    #[test]
    fn qdrant_values_convert_to_json() {
        let val = QdrantValue {
            kind: Some(Kind::ListValue(qdrant_client::qdrant::ListValue {
                values: vec![
                    string_value("x"),
                    QdrantValue {
                        kind: Some(Kind::IntegerValue(3)),
                    },
                    QdrantValue {
                        kind: Some(Kind::BoolValue(true)),
                    },
                ],
            })),
        };
        assert_eq!(qdrant_to_json(&val), serde_json::json!(["x", 3, true]));
    }
}
