//! Scripted collaborators for workflow unit tests.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::Arc;
use std::time::Duration;

use super::context::{SourceFormat, WorkflowContext};
use crate::ai::{LlmProvider, LlmResponse, RetryPolicy, SharedProvider};
use crate::config::ResearchConfig;
use crate::search::{SearchBackend, SearchResponse, SearchResult, WebSearch};
use crate::types::Result;

/// One recorded generation call
#[derive(Debug, Clone)]
pub struct Call {
    pub system: String,
    pub user: String,
    pub schema_title: Option<String>,
}

type Handler = Box<dyn Fn(&Call) -> Result<Value> + Send + Sync>;
type Delay = Box<dyn Fn(&Call) -> Duration + Send + Sync>;

/// Provider answering through a closure
pub struct ScriptedProvider {
    handler: Handler,
    delay: Option<Delay>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedProvider {
    pub fn new(handler: impl Fn(&Call) -> Result<Value> + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: impl Fn(&Call) -> Duration + Send + Sync + 'static) -> Self {
        self.delay = Some(Box::new(delay));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_with_user(&self, user: &str) -> usize {
        self.calls().iter().filter(|c| c.user == user).count()
    }

    pub fn calls_with_schema(&self, title: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.schema_title.as_deref() == Some(title))
            .count()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn generate(&self, system: &str, user: &str, schema: Option<&Value>) -> Result<LlmResponse> {
        let call = Call {
            system: system.to_string(),
            user: user.to_string(),
            schema_title: schema.and_then(|s| s["title"].as_str().map(str::to_string)),
        };
        self.calls.lock().unwrap().push(call.clone());
        if let Some(delay) = &self.delay {
            tokio::time::sleep(delay(&call)).await;
        }
        (self.handler)(&call).map(LlmResponse::content_only)
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

/// Search backend answering from a fixed table
#[derive(Default)]
pub struct TableSearch {
    table: HashMap<String, Vec<SearchResult>>,
    seen: Mutex<Vec<String>>,
}

impl TableSearch {
    pub fn new(table: Vec<(&str, Vec<SearchResult>)>) -> Self {
        Self {
            table: table
                .into_iter()
                .map(|(q, r)| (q.to_string(), r))
                .collect(),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn queries_seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchBackend for TableSearch {
    async fn search(&self, query: &str) -> Result<SearchResponse> {
        self.seen.lock().unwrap().push(query.to_string());
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

pub fn hit(title: &str, url: &str) -> SearchResult {
    SearchResult {
        title: title.to_string(),
        url: url.to_string(),
        content: format!("about {}", title),
        raw_content: None,
        score: None,
    }
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(1))
}

/// Context over scripted collaborators with the given search depth
pub fn context_with(
    planner: SharedProvider,
    writer: SharedProvider,
    max_depth: u32,
    table: Vec<(&str, Vec<SearchResult>)>,
) -> (WorkflowContext, Arc<TableSearch>) {
    let backend = Arc::new(TableSearch::new(table));
    let research = ResearchConfig {
        max_search_depth: max_depth,
        ..Default::default()
    };
    let ctx = WorkflowContext::new(
        planner,
        writer,
        WebSearch::new(backend.clone(), fast_retry()),
        fast_retry(),
        research,
        SourceFormat {
            max_tokens_per_source: 100,
            include_raw_content: false,
        },
    );
    (ctx, backend)
}
