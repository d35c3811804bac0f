//! Web Search
//!
//! [`SearchBackend`] issues one query against a search API. [`WebSearch`]
//! is the capability the workflow uses: it validates a query batch, runs all
//! queries concurrently under the retry policy, merges the results by
//! canonical URL, and optionally persists the raw responses.

mod dedup;
mod format;
mod tavily;

pub use dedup::{canonical_url, dedup_by_url};
pub use format::format_sources;
pub use tavily::TavilyBackend;

use async_trait::async_trait;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::ai::RetryPolicy;
use crate::config::SearchConfig;
use crate::types::{ErrorCategory, LlmError, Result, ScribeError, Source};

/// One search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    /// Most relevant snippet
    pub content: String,
    /// Full page content, when requested and available
    #[serde(default)]
    pub raw_content: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
}

impl SearchResult {
    pub fn source(&self) -> Source {
        Source::new(&self.title, &self.url)
    }
}

/// Backend reply for a single query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub results: Vec<SearchResult>,
}

/// A search API
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Run one query. Failures carry an [`ErrorCategory`] for retry decisions.
    async fn search(&self, query: &str) -> Result<SearchResponse>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

pub type SharedSearchBackend = Arc<dyn SearchBackend>;

/// Create a search backend from configuration
pub fn create_backend(config: &SearchConfig) -> Result<SharedSearchBackend> {
    match config.provider.as_str() {
        "tavily" => Ok(Arc::new(TavilyBackend::new(config)?)),
        other => Err(ScribeError::Config(format!(
            "Unknown search provider: {}. Supported: tavily",
            other
        ))),
    }
}

/// Concurrent, retried, deduplicated web search
pub struct WebSearch {
    backend: SharedSearchBackend,
    retry: RetryPolicy,
    save_dir: Option<PathBuf>,
}

impl WebSearch {
    pub fn new(backend: SharedSearchBackend, retry: RetryPolicy) -> Self {
        Self {
            backend,
            retry,
            save_dir: None,
        }
    }

    pub fn from_config(config: &SearchConfig, retry: RetryPolicy) -> Result<Self> {
        let search = Self::new(create_backend(config)?, retry);
        Ok(if config.save_results {
            search.with_save_dir(config.results_dir.clone())
        } else {
            search
        })
    }

    /// Persist every raw response as `search_<sha256(query)>.json` under `dir`
    pub fn with_save_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.save_dir = Some(dir.into());
        self
    }

    /// Run all queries concurrently and merge the results by canonical URL.
    ///
    /// An empty batch is a fatal caller error. Any query that still fails
    /// after retries fails the whole batch.
    #[instrument(skip_all, fields(backend = self.backend.name(), queries = queries.len()))]
    pub async fn search(&self, queries: &[String]) -> Result<Vec<SearchResult>> {
        if queries.is_empty() {
            return Err(ScribeError::Fatal {
                operation: "search".to_string(),
                source: Box::new(
                    LlmError::with_provider(
                        ErrorCategory::BadRequest,
                        "Search queries list cannot be empty",
                        self.backend.name(),
                    )
                    .into(),
                ),
            });
        }

        debug!(?queries, "Issuing search queries");

        let responses = try_join_all(queries.iter().map(|query| {
            self.retry
                .run("search", move || self.backend.search(query))
        }))
        .await?;

        if let Some(dir) = &self.save_dir {
            save_responses(dir, &responses)?;
        }

        let unique = dedup_by_url(responses.into_iter().flat_map(|r| r.results));
        info!(results = unique.len(), "Search complete");
        Ok(unique)
    }
}

/// File name used when persisting the response for `query`
pub fn response_file_name(query: &str) -> String {
    let digest = Sha256::digest(query.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    format!("search_{}.json", hex)
}

fn save_responses(dir: &Path, responses: &[SearchResponse]) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    for response in responses {
        let path = dir.join(response_file_name(&response.query));
        std::fs::write(&path, serde_json::to_string_pretty(response)?)?;
        debug!(path = %path.display(), "Saved search response");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Backend answering from a fixed table; the query "flaky" fails once
    struct TableBackend {
        table: HashMap<String, Vec<SearchResult>>,
        flaky_failures: AtomicU32,
        seen: Mutex<Vec<String>>,
    }

    impl TableBackend {
        fn new(table: Vec<(&str, Vec<SearchResult>)>) -> Self {
            Self {
                table: table
                    .into_iter()
                    .map(|(q, r)| (q.to_string(), r))
                    .collect(),
                flaky_failures: AtomicU32::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SearchBackend for TableBackend {
        async fn search(&self, query: &str) -> Result<SearchResponse> {
            self.seen.lock().unwrap().push(query.to_string());
            if query == "flaky" && self.flaky_failures.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(LlmError::new(ErrorCategory::Transient, "503").into());
            }
            Ok(SearchResponse {
                query: query.to_string(),
                answer: None,
                results: self.table.get(query).cloned().unwrap_or_default(),
            })
        }

        fn name(&self) -> &str {
            "table"
        }
    }

    fn hit(title: &str, url: &str) -> SearchResult {
        SearchResult {
            title: title.to_string(),
            url: url.to_string(),
            content: String::new(),
            raw_content: None,
            score: None,
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_empty_queries_is_fatal() {
        let search = WebSearch::new(Arc::new(TableBackend::new(vec![])), policy());
        let err = search.search(&[]).await.unwrap_err();
        assert!(matches!(err, ScribeError::Fatal { .. }));
    }

    #[tokio::test]
    async fn test_dedup_across_queries() {
        let backend = TableBackend::new(vec![
            (
                "q1",
                vec![hit("A", "https://a.example/"), hit("B", "https://b.example/")],
            ),
            (
                "q2",
                vec![hit("B2", "https://b.example/#x"), hit("C", "https://c.example/")],
            ),
        ]);
        let search = WebSearch::new(Arc::new(backend), policy());

        let results = search
            .search(&["q1".to_string(), "q2".to_string()])
            .await
            .unwrap();

        let titles: Vec<_> = results.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B2", "C"]);
    }

    #[tokio::test]
    async fn test_transient_failure_retried() {
        let backend = Arc::new(TableBackend::new(vec![(
            "flaky",
            vec![hit("F", "https://f.example/")],
        )]));
        let search = WebSearch::new(backend.clone(), policy());

        let results = search.search(&["flaky".to_string()]).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(backend.seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_saves_responses() {
        let dir = TempDir::new().unwrap();
        let backend = TableBackend::new(vec![("q1", vec![hit("A", "https://a.example/")])]);
        let search = WebSearch::new(Arc::new(backend), policy()).with_save_dir(dir.path());

        search.search(&["q1".to_string()]).await.unwrap();

        let path = dir.path().join(response_file_name("q1"));
        let saved: SearchResponse =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(saved.query, "q1");
        assert_eq!(saved.results.len(), 1);
    }

    #[test]
    fn test_response_file_name() {
        let name = response_file_name("rust");
        assert!(name.starts_with("search_"));
        assert!(name.ends_with(".json"));
        assert_eq!(name.len(), "search_".len() + 64 + ".json".len());
    }
}
