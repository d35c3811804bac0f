//! Shared collaborators for every stage and section task.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::asset::{NoAsset, SharedAssetProvider};
use crate::ai::{RetryPolicy, SharedProvider, parse_structured, response_text};
use crate::config::{ResearchConfig, SearchConfig};
use crate::search::WebSearch;
use crate::types::{Result, ScribeError};

/// How search results are rendered into section prompts
#[derive(Debug, Clone, Copy)]
pub struct SourceFormat {
    pub max_tokens_per_source: usize,
    pub include_raw_content: bool,
}

impl From<&SearchConfig> for SourceFormat {
    fn from(config: &SearchConfig) -> Self {
        Self {
            max_tokens_per_source: config.max_tokens_per_source,
            include_raw_content: config.include_raw_content,
        }
    }
}

/// Read-only context handed to stages and section tasks
pub struct WorkflowContext {
    /// Query generation and outlining
    pub planner: SharedProvider,
    /// Section writing, grading, and review
    pub writer: SharedProvider,
    pub search: Arc<WebSearch>,
    pub retry: RetryPolicy,
    pub research: ResearchConfig,
    pub source_format: SourceFormat,
    pub assets: SharedAssetProvider,
}

impl WorkflowContext {
    pub fn new(
        planner: SharedProvider,
        writer: SharedProvider,
        search: WebSearch,
        retry: RetryPolicy,
        research: ResearchConfig,
        source_format: SourceFormat,
    ) -> Self {
        Self {
            planner,
            writer,
            search: Arc::new(search),
            retry,
            research,
            source_format,
            assets: Arc::new(NoAsset),
        }
    }

    pub fn with_assets(mut self, assets: SharedAssetProvider) -> Self {
        self.assets = assets;
        self
    }

    /// Structured generation under the retry policy.
    ///
    /// Parsing happens inside the retried operation, so a malformed reply is
    /// re-requested like any other transient failure.
    pub async fn structured<T: DeserializeOwned>(
        &self,
        provider: &SharedProvider,
        operation: &str,
        system: &str,
        user: &str,
        schema: &Value,
    ) -> Result<T> {
        self.retry
            .run(operation, || async move {
                let response = provider.generate(system, user, Some(schema)).await?;
                debug!(
                    operation,
                    model = %response.metadata.model,
                    tokens = response.usage.total(),
                    "Structured response received"
                );
                parse_structured(response.content, operation)
            })
            .await
    }

    /// Free-text generation under the retry policy. Blank replies are retried.
    pub async fn text(
        &self,
        provider: &SharedProvider,
        operation: &str,
        system: &str,
        user: &str,
    ) -> Result<String> {
        self.retry
            .run(operation, || async move {
                let response = provider.generate(system, user, None).await?;
                let text = response_text(&response.content);
                if text.is_empty() {
                    return Err(ScribeError::invalid_output(operation, "empty reply"));
                }
                Ok(text)
            })
            .await
    }
}
