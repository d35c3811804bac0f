//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/deepscribe/) and project (.deepscribe/) level configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::constants;
use crate::types::{Result, ScribeError};

pub const DEFAULT_REPORT_STRUCTURE: &str = "The article structure should focus on breaking-down the user-provided topic:

1. Introduction (no research needed)
    - Brief overview of the topic area
    - Include any key concepts and definitions

2. Main Body Sections:
   - Each section should focus on a sub-topic of the user-provided topic.
   - Main body sections should have a structured flow with clear and engaging headings.
   - Provide real-world examples or case studies where applicable
   - Aim for some structural elements (either a list or table) that distills the main body sections

3. Conclusion
   - Provide a concise summary of the article and key takeaways.";

pub const DEFAULT_WRITING_GUIDELINES: &str = "- Strict 200 word limit
- Start with your most important insight in **bold**
";

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Research loop settings
    pub research: ResearchConfig,

    /// Generation backend settings
    pub llm: LlmConfig,

    /// Search backend settings
    pub search: SearchConfig,

    /// Retry policy for remote calls
    pub retry: RetryConfig,

    /// Checkpoint store settings
    pub storage: StorageConfig,

    /// Document output settings
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            research: ResearchConfig::default(),
            llm: LlmConfig::default(),
            search: SearchConfig::default(),
            retry: RetryConfig::default(),
            storage: StorageConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `ScribeError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if self.research.number_of_queries == 0 {
            return Err(ScribeError::Config(
                "research.number_of_queries must be greater than 0".to_string(),
            ));
        }

        if self.research.max_search_depth == 0 {
            return Err(ScribeError::Config(
                "research.max_search_depth must be greater than 0".to_string(),
            ));
        }

        if self.research.max_section_concurrency == 0 {
            return Err(ScribeError::Config(
                "research.max_section_concurrency must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ScribeError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(ScribeError::Config(
                "LLM timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.search.max_results == 0 {
            return Err(ScribeError::Config(
                "search.max_results must be greater than 0".to_string(),
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(ScribeError::Config(
                "retry.max_attempts must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// Research Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// Number of search queries generated per round
    pub number_of_queries: usize,

    /// Maximum search/write/grade rounds per researched section
    pub max_search_depth: u32,

    /// Organization guidance handed to the outline planner
    pub report_structure: String,

    /// Style guidance handed to the section writer
    pub writing_guidelines: String,

    /// Upper bound on concurrently running section tasks
    pub max_section_concurrency: usize,

    /// Run an editor review over researched sections before final writing
    pub editor_review: bool,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            number_of_queries: constants::research::DEFAULT_NUMBER_OF_QUERIES,
            max_search_depth: constants::research::DEFAULT_MAX_SEARCH_DEPTH,
            report_structure: DEFAULT_REPORT_STRUCTURE.to_string(),
            writing_guidelines: DEFAULT_WRITING_GUIDELINES.to_string(),
            max_section_concurrency: constants::research::DEFAULT_MAX_SECTION_CONCURRENCY,
            editor_review: false,
        }
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name ("openai" or "ollama")
    pub provider: String,

    /// Model used for query generation and outline planning
    pub planner_model: String,

    /// Model used for section writing and grading
    pub writer_model: String,

    /// Maximum output tokens per call
    pub max_tokens: u32,

    /// Temperature for generation (0.0 = deterministic)
    pub temperature: f32,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Override for the provider's API base URL
    pub api_base: Option<String>,

    /// API key; falls back to `OPENAI_API_KEY`.
    /// Never serialized; providers wrap it in `SecretString`.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("planner_model", &self.planner_model)
            .field("writer_model", &self.writer_model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            planner_model: "gpt-4o".to_string(),
            writer_model: "gpt-4o-mini".to_string(),
            max_tokens: constants::llm::DEFAULT_MAX_TOKENS,
            temperature: constants::llm::DEFAULT_TEMPERATURE,
            timeout_secs: constants::llm::DEFAULT_TIMEOUT_SECS,
            api_base: None,
            api_key: None,
        }
    }
}

// =============================================================================
// Search Configuration
// =============================================================================

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Search backend ("tavily")
    pub provider: String,

    /// Results requested per query
    pub max_results: usize,

    /// Search topic passed to the backend
    pub topic: String,

    /// Request full page content alongside snippets
    pub include_raw_content: bool,

    /// Per-source budget when raw content is included in prompts
    pub max_tokens_per_source: usize,

    /// Persist raw search responses to `results_dir`
    pub save_results: bool,

    pub results_dir: PathBuf,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// API key; falls back to `TAVILY_API_KEY`. Never serialized.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

impl std::fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConfig")
            .field("provider", &self.provider)
            .field("max_results", &self.max_results)
            .field("topic", &self.topic)
            .field("include_raw_content", &self.include_raw_content)
            .field("max_tokens_per_source", &self.max_tokens_per_source)
            .field("save_results", &self.save_results)
            .field("results_dir", &self.results_dir)
            .field("timeout_secs", &self.timeout_secs)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: "tavily".to_string(),
            max_results: constants::search::DEFAULT_MAX_RESULTS,
            topic: constants::search::DEFAULT_TOPIC.to_string(),
            include_raw_content: false,
            max_tokens_per_source: constants::research::SECTION_TOKENS_PER_SOURCE,
            save_results: false,
            results_dir: PathBuf::from("search_results"),
            timeout_secs: constants::search::DEFAULT_TIMEOUT_SECS,
            api_key: None,
        }
    }
}

// =============================================================================
// Retry Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per call, including the first
    pub max_attempts: u32,

    /// Delay before the first retry in milliseconds
    pub initial_delay_ms: u64,
}

impl RetryConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: constants::retry::DEFAULT_MAX_ATTEMPTS,
            initial_delay_ms: constants::retry::DEFAULT_INITIAL_DELAY_MS,
        }
    }
}

// =============================================================================
// Storage Configuration
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Memory,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackend::Sqlite => write!(f, "sqlite"),
            StorageBackend::Memory => write!(f, "memory"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,

    /// SQLite database path (relative paths resolve from the working directory)
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            database_path: PathBuf::from(constants::paths::PROJECT_DIR)
                .join(constants::paths::DATABASE_FILE),
        }
    }
}

// =============================================================================
// Output Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving `<session>.md` documents
    pub dir: PathBuf,

    /// Existing image placed under the document title
    pub head_asset: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            head_asset: None,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.research.number_of_queries, 2);
        assert_eq!(config.research.max_search_depth, 2);
        assert_eq!(config.llm.max_tokens, 2048);
        assert_eq!(config.search.max_results, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_depth() {
        let mut config = Config::default();
        config.research.max_search_depth = 0;
        assert!(matches!(config.validate(), Err(ScribeError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_temperature() {
        let mut config = Config::default();
        config.llm.temperature = 3.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_not_serialized() {
        let mut config = Config::default();
        config.llm.api_key = Some("sk-secret".to_string());
        let rendered = toml::to_string_pretty(&config).unwrap();
        assert!(!rendered.contains("sk-secret"));
        assert!(!rendered.contains("api_key"));
        assert!(!format!("{:?}", config.llm).contains("sk-secret"));
    }

    #[test]
    fn test_storage_backend_display() {
        assert_eq!(StorageBackend::Sqlite.to_string(), "sqlite");
        assert_eq!(StorageBackend::Memory.to_string(), "memory");
    }
}
