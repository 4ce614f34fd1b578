//! Tavily Client - 网页搜索
//!
//! 外部 API:
//! POST {base_url}/search
//! Request: {"query": "...", "search_depth": "basic", "max_results": 5, ...}
//! Response: {"results": [{"title": "...", "content": "...", "url": "..."}]}

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::application::ports::{SearchError, SearchPort};
use crate::domain::SearchSnippet;

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    search_depth: &'a str,
    include_domains: Vec<String>,
    exclude_domains: Vec<String>,
    max_results: u32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    url: String,
}

impl From<SearchResult> for SearchSnippet {
    fn from(r: SearchResult) -> Self {
        Self {
            title: r.title,
            content: r.content,
            url: r.url,
        }
    }
}

/// Tavily 客户端配置
#[derive(Debug, Clone)]
pub struct TavilyClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub max_results: u32,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

impl TavilyClientConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            max_results: 5,
            timeout_secs: 30,
        }
    }
}

pub struct TavilyClient {
    client: Client,
    config: TavilyClientConfig,
}

impl TavilyClient {
    pub fn new(config: TavilyClientConfig) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SearchError::Network(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn search_url(&self) -> String {
        format!("{}/search", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl SearchPort for TavilyClient {
    async fn search(&self, query: &str) -> Result<Vec<SearchSnippet>, SearchError> {
        let request = SearchRequest {
            query,
            search_depth: "basic",
            include_domains: Vec::new(),
            exclude_domains: Vec::new(),
            max_results: self.config.max_results,
        };

        tracing::debug!(url = %self.search_url(), query, "Sending search request");

        let response = self
            .client
            .post(self.search_url())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SearchError::Service {
                status: status.as_u16(),
                message,
            });
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::InvalidResponse(e.to_string()))?;

        tracing::info!(results = body.results.len(), "Search completed");

        Ok(body.results.into_iter().map(SearchSnippet::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> TavilyClient {
        TavilyClient::new(TavilyClientConfig::new(server.uri(), "tvly-key")).unwrap()
    }

    #[tokio::test]
    async fn test_search_maps_results() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header("authorization", "Bearer tvly-key"))
            .and(body_partial_json(json!({
                "query": "BTC price 2025",
                "search_depth": "basic",
                "max_results": 5
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "query": "BTC price 2025",
                "results": [
                    { "title": "BTC hits ATH", "content": "Bitcoin rose...", "url": "https://news.example/btc", "score": 0.9 },
                    { "title": "Analysts", "content": "Forecasts...", "url": "https://news.example/analysts" }
                ]
            })))
            .mount(&server)
            .await;

        let results = client(&server).search("BTC price 2025").await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "BTC hits ATH");
        assert_eq!(results[1].url, "https://news.example/analysts");
    }

    #[tokio::test]
    async fn test_search_service_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(432).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let err = client(&server).search("q").await.unwrap_err();
        assert!(matches!(err, SearchError::Service { status: 432, .. }));
    }
}
