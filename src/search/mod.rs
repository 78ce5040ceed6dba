//! Web search capability used by the research stage
//!
//! The orchestrator never searches directly. The research stage's executor
//! calls [`SearchProvider::search_many`], which fans a topic out over a fixed
//! list of query templates and aggregates the hits, deduplicated by URL.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

pub mod serper;

pub use serper::{SerperConfig, SerperSearch};

/// Query templates issued by `search_many`, in order. `{topic}` is substituted.
pub const QUERY_TEMPLATES: [&str; 8] = [
    "{topic} latest trends",
    "{topic} breakthrough innovations",
    "{topic} industry impact",
    "{topic} best practices",
    "{topic} future predictions",
    "what's new in {topic}",
    "{topic} case studies",
    "{topic} expert insights",
];

/// A single search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
    pub url: String,
    /// Query that produced the hit; set by `search_many`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

/// Search errors
#[derive(Debug, Clone, Error)]
pub enum SearchError {
    #[error("Search provider not configured: {0}")]
    NotConfigured(String),
    #[error("Search request failed: {0}")]
    RequestFailed(String),
    #[error("Search API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Invalid search response: {0}")]
    InvalidResponse(String),
}

/// Expand the query templates for a topic, truncated to `count`
pub fn diverse_queries(topic: &str, count: usize) -> Vec<String> {
    QUERY_TEMPLATES
        .iter()
        .take(count)
        .map(|template| template.replace("{topic}", topic))
        .collect()
}

/// Web search trait for dependency injection and testing
#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Run one query, returning at most `limit` hits
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, SearchError>;

    /// Run the first `query_count` templates for `topic` in order and
    /// aggregate the results. First occurrence of a URL wins; hits without a
    /// URL are dropped. Any failed query fails the whole aggregate.
    async fn search_many(
        &self,
        topic: &str,
        query_count: usize,
        results_per_query: usize,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let mut seen_urls = HashSet::new();
        let mut aggregated = Vec::new();

        for query in diverse_queries(topic, query_count) {
            let hits = self.search(&query, results_per_query).await?;
            debug!(query = %query, hits = hits.len(), "Search query completed");

            for hit in hits {
                if hit.url.is_empty() || !seen_urls.insert(hit.url.clone()) {
                    continue;
                }
                aggregated.push(SearchHit {
                    query: Some(query.clone()),
                    ..hit
                });
            }
        }

        Ok(aggregated)
    }
}
