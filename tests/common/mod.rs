//! Scripted generation and search backends shared by the scenario tests.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use deepscribe::ai::{LlmProvider, LlmResponse, RetryPolicy, SharedProvider};
use deepscribe::config::ResearchConfig;
use deepscribe::search::{SearchBackend, SearchResponse, SearchResult, WebSearch};
use deepscribe::storage::SharedStore;
use deepscribe::workflow::{Engine, SourceFormat, WorkflowContext};
use deepscribe::Result;

#[derive(Debug, Clone)]
pub struct Call {
    pub system: String,
    pub user: String,
    pub schema_title: Option<String>,
}

type Handler = Box<dyn Fn(&Call) -> Result<Value> + Send + Sync>;
type Delay = Box<dyn Fn(&Call) -> Duration + Send + Sync>;

pub struct ScriptedLlm {
    handler: Handler,
    delay: Option<Delay>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedLlm {
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

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
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
        content: format!("notes on {}", title),
        raw_content: None,
        score: None,
    }
}

/// Three-section outline: intro, two researched bodies, conclusion
pub fn outline_json() -> Value {
    json!({
        "title": "Async Rust",
        "sections": [
            {"section_number": 1, "name": "Introduction", "description": "what async is", "research": false},
            {"section_number": 2, "name": "Executors", "description": "executor internals", "research": true},
            {"section_number": 3, "name": "Pinning", "description": "pinning rules", "research": true},
            {"section_number": 4, "name": "Conclusion", "description": "takeaways", "research": false}
        ]
    })
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(1))
}

pub struct Harness {
    pub engine: Engine,
    pub planner: Arc<ScriptedLlm>,
    pub writer: Arc<ScriptedLlm>,
    pub search: Arc<TableSearch>,
}

/// Engine over scripted backends and `store`
pub fn harness(
    store: SharedStore,
    planner: ScriptedLlm,
    writer: ScriptedLlm,
    search: TableSearch,
    max_depth: u32,
) -> Harness {
    let planner = Arc::new(planner);
    let writer = Arc::new(writer);
    let search = Arc::new(search);

    let research = ResearchConfig {
        max_search_depth: max_depth,
        ..Default::default()
    };
    let planner_dyn: SharedProvider = planner.clone();
    let writer_dyn: SharedProvider = writer.clone();
    let ctx = WorkflowContext::new(
        planner_dyn,
        writer_dyn,
        WebSearch::new(search.clone(), fast_retry()),
        fast_retry(),
        research,
        SourceFormat {
            max_tokens_per_source: 200,
            include_raw_content: false,
        },
    );

    Harness {
        engine: Engine::new(store, ctx),
        planner,
        writer,
        search,
    }
}
