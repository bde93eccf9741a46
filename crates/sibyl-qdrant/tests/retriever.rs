use sibyl_qdrant::{QdrantRetriever, QdrantRetrieverConfig};

#[test]
fn config_new_sets_defaults() {
    let config = QdrantRetrieverConfig::new("http://localhost:6334");
    assert_eq!(config.url, "http://localhost:6334");
    assert!(config.api_key.is_none());
    assert_eq!(config.docs_collection, "docs_data");
    assert_eq!(config.reports_collection, "reports_data");
    assert_eq!(config.limit, 3);
}

#[test]
fn retriever_new_creates_client() {
    // The constructor builds a client without requiring a running instance.
    let config = QdrantRetrieverConfig::new("http://localhost:6334");
    let retriever = QdrantRetriever::new(config);
    assert!(retriever.is_ok());
}

#[test]
fn retriever_new_with_api_key() {
    let config = QdrantRetrieverConfig::new("http://localhost:6334").with_api_key("secret");
    let retriever = QdrantRetriever::new(config);
    assert!(retriever.is_ok());
}

#[test]
fn retriever_config_accessor() {
    let config = QdrantRetrieverConfig::new("http://localhost:6334").with_limit(7);
    let retriever = QdrantRetriever::new(config).unwrap();
    assert_eq!(retriever.config().limit, 7);
}
