use super::config::SearchServiceConfig;
use super::errors::ConnectorError;
use actix_web::web;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

/// Body of a web search request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub num: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganicResult {
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub organic: Vec<OrganicResult>,
}

/// What the web search tool hands back to the model for each hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub link: String,
    pub snippet: String,
}

impl From<OrganicResult> for SearchHit {
    fn from(result: OrganicResult) -> Self {
        Self {
            title: result.title,
            link: result.link,
            snippet: result.snippet,
        }
    }
}

impl SearchResponse {
    pub fn into_hits(self) -> Vec<SearchHit> {
        self.organic.into_iter().map(SearchHit::from).collect()
    }
}

#[async_trait]
pub trait SearchConnector: Send + Sync {
    /// Dropping the returned future cancels the upstream request.
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, ConnectorError>;
}

/// Serper-compatible search API client
pub struct SearchServiceClient {
    base_url: String,
    api_key: Option<String>,
    http_client: reqwest::Client,
}

impl SearchServiceClient {
    pub fn new(config: &SearchServiceConfig) -> Result<Self, ConnectorError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| ConnectorError::Internal(format!("HTTP client: {}", err)))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            http_client,
        })
    }
}

#[async_trait]
impl SearchConnector for SearchServiceClient {
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, ConnectorError> {
        let span = tracing::info_span!("search_web", query = %query.q, num = query.num);

        let url = format!("{}/search", self.base_url);
        let mut req = self.http_client.post(&url).json(query);
        if let Some(key) = self.api_key.as_ref() {
            req = req.header("X-API-KEY", key);
        }

        let resp = req.send().instrument(span.clone()).await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(parent: &span, %status, "Search API rejected the query");
            return Err(ConnectorError::from_status(status, &body));
        }

        resp.json::<SearchResponse>()
            .instrument(span)
            .await
            .map_err(|err| ConnectorError::InvalidResponse(err.to_string()))
    }
}

pub fn init(config: &SearchServiceConfig) -> Result<web::Data<Arc<dyn SearchConnector>>, ConnectorError> {
    if config.api_key.is_none() {
        tracing::warn!("Search API key is not configured; requests go out unauthenticated");
    }
    let client: Arc<dyn SearchConnector> = Arc::new(SearchServiceClient::new(config)?);
    Ok(web::Data::new(client))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_response_tolerates_missing_fields() {
        let raw = serde_json::json!({
            "searchParameters": { "q": "rust", "num": 2 },
            "organic": [
                { "title": "Rust", "link": "https://www.rust-lang.org", "snippet": "A language", "position": 1 },
                { "title": "No snippet", "link": "https://example.com" }
            ]
        });

        let parsed: SearchResponse = serde_json::from_value(raw).unwrap();
        let hits = parsed.into_hits();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].link, "https://www.rust-lang.org");
        assert_eq!(hits[1].snippet, "");
    }

    #[test]
    fn empty_body_means_no_results() {
        let parsed: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.organic.is_empty());
    }
}
