use serde_json::json;
use sibyl_core::{CacheMetrics, DocumentSource, QueryType, RouterDecision, SearchResponse};

#[test]
fn query_type_wire_names() {
    assert_eq!(serde_json::to_value(QueryType::Docs).unwrap(), "DOCS_QUERY");
    assert_eq!(
        serde_json::to_value(QueryType::Reports).unwrap(),
        "REPORTS_QUERY"
    );
    assert_eq!(serde_json::to_value(QueryType::Web).unwrap(), "WEB_QUERY");

    let parsed: QueryType = serde_json::from_value(json!("WEB_QUERY")).unwrap();
    assert_eq!(parsed, QueryType::Web);
}

#[test]
fn router_decision_parses_without_answer_field() {
    let decision: RouterDecision =
        serde_json::from_value(json!({"action": "DOCS_QUERY", "reason": "api question"}))
            .unwrap();
    assert_eq!(decision.action, QueryType::Docs);
    assert!(decision.answer.is_empty());
}

#[test]
fn cache_metrics_constructors() {
    let hit = CacheMetrics::hit(0.93, 0.01, 5);
    assert!(hit.hit);
    assert_eq!(hit.similarity_score, Some(0.93));
    assert_eq!(hit.cache_size, 5);

    let miss = CacheMetrics::miss(0.02, 5);
    assert!(!miss.hit);
    assert!(miss.similarity_score.is_none());
}

#[test]
fn search_response_round_trips() {
    let response = SearchResponse {
        answer: "42".to_string(),
        sources: vec![DocumentSource::new("chunk", "docs_query")
            .with_metadata(json!({"page": 7}))
            .with_score(0.8)],
        query_type: QueryType::Docs,
        cache_metrics: Some(CacheMetrics::miss(0.1, 0)),
        processing_time: 1.5,
    };
    let json = serde_json::to_string(&response).unwrap();
    let back: SearchResponse = serde_json::from_str(&json).unwrap();
    assert_eq!(back, response);
}
