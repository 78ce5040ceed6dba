//! Serper search provider
//!
//! Google results through the Serper API (`POST /search`).

use crate::search::{SearchError, SearchHit, SearchProvider};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

/// Serper never returns more than this many organic results per query
const MAX_RESULTS_PER_QUERY: usize = 20;

/// Serper provider configuration
#[derive(Clone)]
pub struct SerperConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for SerperConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerperConfig")
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for SerperConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://google.serper.dev".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Web search over the Serper API
pub struct SerperSearch {
    config: SerperConfig,
    client: reqwest::Client,
}

impl SerperSearch {
    pub fn new(config: SerperConfig) -> Result<Self, SearchError> {
        if config.api_key.is_empty() {
            return Err(SearchError::NotConfigured(
                "Serper API key is required".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SearchError::NotConfigured(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Build search payload (pure function)
    fn build_search_payload(query: &str, limit: usize) -> Value {
        json!({
            "q": query,
            "num": limit.clamp(1, MAX_RESULTS_PER_QUERY),
            "gl": "us",
            "hl": "en"
        })
    }

    /// Parse organic results (pure function)
    fn parse_search_response(search_result: &Value, limit: usize) -> Vec<SearchHit> {
        search_result
            .get("organic")
            .and_then(|o| o.as_array())
            .map(|organic| {
                organic
                    .iter()
                    .filter_map(|result| {
                        let title = result.get("title")?.as_str()?;
                        let url = result.get("link")?.as_str()?;
                        let snippet = result.get("snippet").and_then(|s| s.as_str()).unwrap_or("");
                        Some(SearchHit {
                            title: title.to_string(),
                            snippet: snippet.to_string(),
                            url: url.to_string(),
                            query: None,
                        })
                    })
                    .take(limit)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl SearchProvider for SerperSearch {
    fn name(&self) -> &str {
        "serper"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, SearchError> {
        let payload = Self::build_search_payload(query, limit);

        let response = self
            .client
            .post(format!("{}/search", self.config.base_url))
            .header("X-API-KEY", &self.config.api_key)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| SearchError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SearchError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let search_result: Value = response
            .json()
            .await
            .map_err(|e| SearchError::InvalidResponse(e.to_string()))?;

        Ok(Self::parse_search_response(&search_result, limit))
    }
}
