//! HTTP client for the external place-search provider

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{MesaError, Result};

/// Lightweight search-result stub returned by the provider.
///
/// Resolved to a full place candidate on selection.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Suggestion {
    pub id: String,
    pub name: String,
    pub address: String,
    pub location: Location,
    /// Which upstream backend produced this suggestion
    pub source: String,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SearchResponse {
    pub suggestions: Vec<Suggestion>,
}

/// Trait for suggestion backends (allows exercising the gateway without a
/// network)
#[async_trait::async_trait]
pub trait SuggestionProvider: Send + Sync {
    /// Return at most `limit` ranked suggestions for a free-text query
    async fn suggest(&self, query: &str, limit: usize) -> Result<Vec<Suggestion>>;
}

/// Configuration for the HTTP search client
#[derive(Debug, Clone)]
pub struct SearchClientConfig {
    /// Provider base URL
    pub base_url: String,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for SearchClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://search.mesa.dev".to_string(),
            timeout_ms: 30_000,
        }
    }
}

/// reqwest-backed suggestion provider
pub struct HttpSearchClient {
    config: SearchClientConfig,
    client: reqwest::Client,
}

impl HttpSearchClient {
    /// Create a new client with an explicit timeout (no hidden transport
    /// default)
    pub fn new(config: SearchClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| MesaError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }
}

#[async_trait::async_trait]
impl SuggestionProvider for HttpSearchClient {
    async fn suggest(&self, query: &str, limit: usize) -> Result<Vec<Suggestion>> {
        let url = format!("{}/search/suggestions", self.config.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("query", query),
                ("limit", &limit.to_string()),
                ("provider", "all"),
            ])
            .send()
            .await
            .map_err(|e| MesaError::Provider(format!("Search request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(MesaError::Provider(format!(
                "Search provider returned {}",
                response.status()
            )));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| MesaError::Provider(format!("Malformed search response: {}", e)))?;

        debug!(
            query = %query,
            count = body.suggestions.len(),
            "Search provider responded"
        );

        Ok(body.suggestions)
    }
}
