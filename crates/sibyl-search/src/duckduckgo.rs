//! DuckDuckGo Instant Answer search.
//!
//! Uses the free DuckDuckGo Instant Answer API — no API key required. The
//! answer is taken from the abstract (featured snippet), falling back to the
//! direct answer field and then to the first related topic.

use async_trait::async_trait;
use serde_json::Value;
use sibyl_core::{SibylError, WebSearch, WebSearchResult};

/// Keyless web search against the DuckDuckGo Instant Answer API.
pub struct DuckDuckGoSearch {
    client: reqwest::Client,
}

impl Default for DuckDuckGoSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl DuckDuckGoSearch {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl WebSearch for DuckDuckGoSearch {
    async fn search(&self, query: &str) -> Result<WebSearchResult, SibylError> {
        let encoded_query = urlencoding::encode(query);
        let url = format!(
            "https://api.duckduckgo.com/?q={encoded_query}&format=json&no_html=1&skip_disambig=1&no_redirect=1"
        );

        let response = self
            .client
            .get(&url)
            .header("User-Agent", "sibyl-gateway/0.1")
            .send()
            .await
            .map_err(|e| SibylError::Tool(format!("DuckDuckGo request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(SibylError::Tool(format!(
                "DuckDuckGo API error: HTTP {status}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SibylError::Tool(format!("DuckDuckGo parse error: {e}")))?;

        let answer = extract_answer(&body);
        Ok(WebSearchResult { answer, raw: body })
    }
}

fn extract_answer(body: &Value) -> String {
    for field in ["Abstract", "Answer"] {
        if let Some(text) = body[field].as_str() {
            if !text.is_empty() {
                return text.to_string();
            }
        }
    }

    body["RelatedTopics"]
        .as_array()
        .and_then(|topics| {
            topics
                .iter()
                .find_map(|t| t["Text"].as_str().filter(|s| !s.is_empty()))
        })
        .unwrap_or("No results found. Try a more specific query.")
        .to_string()
}
