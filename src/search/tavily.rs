//! Tavily Search Backend
//!
//! Search backend using the Tavily REST API.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use super::{SearchBackend, SearchResponse};
use crate::config::SearchConfig;
use crate::constants::search::TAVILY_ENDPOINT;
use crate::types::{ErrorClassifier, Result, ScribeError};

const BACKEND: &str = "tavily";

/// Tavily search client with secure API key handling
pub struct TavilyBackend {
    api_key: SecretString,
    endpoint: String,
    max_results: usize,
    topic: String,
    include_raw_content: bool,
    client: reqwest::Client,
}

impl std::fmt::Debug for TavilyBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TavilyBackend")
            .field("api_key", &"[REDACTED]")
            .field("endpoint", &self.endpoint)
            .field("max_results", &self.max_results)
            .field("topic", &self.topic)
            .field("include_raw_content", &self.include_raw_content)
            .finish()
    }
}

impl TavilyBackend {
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("TAVILY_API_KEY").ok())
            .ok_or_else(|| {
                ScribeError::Config(
                    "Tavily API key not found. Set TAVILY_API_KEY env var or provide in config"
                        .to_string(),
                )
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ScribeError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: SecretString::from(api_key),
            endpoint: TAVILY_ENDPOINT.to_string(),
            max_results: config.max_results,
            topic: config.topic.clone(),
            include_raw_content: config.include_raw_content,
            client,
        })
    }

    /// Point the client at a different endpoint (proxies, test servers)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn build_request<'a>(&'a self, query: &'a str) -> TavilyRequest<'a> {
        TavilyRequest {
            api_key: self.api_key.expose_secret(),
            query,
            max_results: self.max_results,
            topic: &self.topic,
            include_raw_content: self.include_raw_content,
        }
    }
}

#[async_trait]
impl SearchBackend for TavilyBackend {
    async fn search(&self, query: &str) -> Result<SearchResponse> {
        debug!(query, "Tavily search");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&self.build_request(query))
            .send()
            .await
            .map_err(|e| ErrorClassifier::classify_reqwest(&e, BACKEND))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ErrorClassifier::classify_http_status(
                status.as_u16(),
                &format!("Tavily API error ({}): {}", status, body),
                BACKEND,
            )
            .into());
        }

        let mut parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| ErrorClassifier::classify_reqwest(&e, BACKEND))?;

        if parsed.query.is_empty() {
            parsed.query = query.to_string();
        }
        Ok(parsed)
    }

    fn name(&self) -> &str {
        BACKEND
    }
}

#[derive(Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: usize,
    topic: &'a str,
    include_raw_content: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> TavilyBackend {
        TavilyBackend::new(&SearchConfig {
            api_key: Some("tvly-secret".to_string()),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_request_body() {
        let backend = backend();
        let body = serde_json::to_value(backend.build_request("rust async")).unwrap();
        assert_eq!(body["query"], "rust async");
        assert_eq!(body["max_results"], 5);
        assert_eq!(body["topic"], "general");
    }

    #[test]
    fn test_debug_redacts_key() {
        assert!(!format!("{:?}", backend()).contains("tvly-secret"));
    }

    #[test]
    fn test_response_parsing_tolerates_extra_fields() {
        let json = r#"{
            "query": "q",
            "follow_up_questions": null,
            "answer": null,
            "images": [],
            "results": [
                {"title": "T", "url": "https://t.example", "content": "c", "score": 0.5, "raw_content": null}
            ],
            "response_time": 1.2
        }"#;
        let parsed: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.results.len(), 1);
        assert_eq!(parsed.results[0].raw_content, None);
    }
}
