use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use sibyl_core::{SibylError, WebSearch, WebSearchResult};
use sibyl_models::{ProviderBackend, ProviderRequest};

/// Configuration for [`AresSearch`].
#[derive(Debug, Clone)]
pub struct AresConfig {
    /// API key sent in the `x-api-key` header.
    pub api_key: String,
    /// Prediction endpoint. Defaults to the hosted live-search API.
    pub url: String,
}

impl AresConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            url: "https://api-ares.traversaal.ai/live/predict".to_string(),
        }
    }

    /// Point at a different endpoint (useful for testing with a mock server).
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

/// Live internet search via the Ares answer API: one query in, one
/// synthesized answer plus the raw response out.
pub struct AresSearch {
    config: AresConfig,
    backend: Arc<dyn ProviderBackend>,
}

impl AresSearch {
    pub fn new(config: AresConfig, backend: Arc<dyn ProviderBackend>) -> Self {
        Self { config, backend }
    }
}

#[async_trait]
impl WebSearch for AresSearch {
    async fn search(&self, query: &str) -> Result<WebSearchResult, SibylError> {
        tracing::info!(query, "fetching live search answer");

        let request = ProviderRequest {
            url: self.config.url.clone(),
            headers: vec![
                ("x-api-key".to_string(), self.config.api_key.clone()),
                ("content-type".to_string(), "application/json".to_string()),
            ],
            body: json!({ "query": [query] }),
        };

        let response = self.backend.send(request).await?;

        if response.status != 200 {
            return Err(SibylError::Tool(format!(
                "live search API error ({}): {}",
                response.status, response.body
            )));
        }

        let answer = response.body["data"]["response_text"]
            .as_str()
            .unwrap_or("No response received.")
            .to_string();

        Ok(WebSearchResult {
            answer,
            raw: response.body,
        })
    }
}
