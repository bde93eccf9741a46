use serde_json::json;
use sibyl_cache::{CacheEntry, CacheStore};

fn entry(question: &str, embedding: Vec<f32>, answer: &str) -> CacheEntry {
    CacheEntry {
        question: question.to_string(),
        embedding,
        answer: answer.to_string(),
        response_data: json!({"answer": answer, "sources": []}),
        created_at: 1_700_000_000.0,
    }
}

#[tokio::test]
async fn load_missing_file_is_empty() {
    let path = tempdir().join("cache.json");
    let store = CacheStore::load(&path).await;
    assert!(store.is_empty());
}

#[tokio::test]
async fn load_malformed_file_falls_back_to_empty() {
    let dir = tempdir();
    let path = dir.join("cache.json");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(&path, "{ not json").unwrap();

    let store = CacheStore::load(&path).await;
    assert!(store.is_empty());
}

#[tokio::test]
async fn load_misaligned_sequences_falls_back_to_empty() {
    let dir = tempdir();
    let path = dir.join("cache.json");
    std::fs::create_dir_all(&dir).unwrap();
    // Two questions but only one embedding.
    std::fs::write(
        &path,
        r#"{"questions": ["a", "b"], "embeddings": [[1.0]], "answers": ["x", "y"],
            "response_data": [{}, {}], "timestamps": [1.0, 2.0]}"#,
    )
    .unwrap();

    let store = CacheStore::load(&path).await;
    assert!(store.is_empty());
}

#[tokio::test]
async fn append_persists_and_reloads_in_order() {
    let path = tempdir().join("cache.json");

    {
        let mut store = CacheStore::load(&path).await;
        store
            .append(entry("first", vec![1.0, 0.0], "one"))
            .await
            .unwrap();
        store
            .append(entry("second", vec![0.0, 1.0], "two"))
            .await
            .unwrap();
        assert_eq!(store.len(), 2);
    }

    let reloaded = CacheStore::load(&path).await;
    assert_eq!(reloaded.len(), 2);
    assert_eq!(reloaded.question_at(0), Some("first"));
    assert_eq!(reloaded.question_at(1), Some("second"));
    assert_eq!(reloaded.records().embeddings[1], vec![0.0, 1.0]);
    assert_eq!(reloaded.records().answers, vec!["one", "two"]);
}

#[tokio::test]
async fn nested_payloads_round_trip_losslessly() {
    let path = tempdir().join("cache.json");
    let payload = json!({
        "answer": "42",
        "sources": [{"content": "chunk", "metadata": {"page": 7, "tags": ["a", "b"]}}],
        "query_type": "DOCS_QUERY",
        "routing_reason": "api question"
    });

    {
        let mut store = CacheStore::load(&path).await;
        let mut e = entry("q", vec![0.5, 0.5], "42");
        e.response_data = payload.clone();
        store.append(e).await.unwrap();
    }

    let reloaded = CacheStore::load(&path).await;
    assert_eq!(reloaded.response_at(0), Some(&payload));
}

#[tokio::test]
async fn clear_persists_the_empty_state() {
    let path = tempdir().join("cache.json");

    let mut store = CacheStore::load(&path).await;
    store.append(entry("q", vec![1.0], "a")).await.unwrap();
    store.clear().await.unwrap();
    assert!(store.is_empty());

    let reloaded = CacheStore::load(&path).await;
    assert!(reloaded.is_empty());
}

#[tokio::test]
async fn persist_leaves_no_temp_file_behind() {
    let dir = tempdir();
    let path = dir.join("cache.json");

    let mut store = CacheStore::load(&path).await;
    store.append(entry("q", vec![1.0], "a")).await.unwrap();

    assert!(path.exists());
    assert!(!dir.join("cache.tmp").exists());
}

fn tempdir() -> std::path::PathBuf {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let id = COUNTER.fetch_add(1, Ordering::SeqCst);
    let dir = std::env::temp_dir().join(format!(
        "sibyl_test_cache_store_{}_{}",
        std::process::id(),
        id,
    ));
    // Clean up any leftover from previous runs
    let _ = std::fs::remove_dir_all(&dir);
    dir
}
