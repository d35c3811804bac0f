//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Research loop defaults
pub mod research {
    /// Queries generated per planning or section round
    pub const DEFAULT_NUMBER_OF_QUERIES: usize = 2;

    /// Maximum search rounds per researched section
    pub const DEFAULT_MAX_SEARCH_DEPTH: u32 = 2;

    /// Upper bound on concurrently running section tasks
    pub const DEFAULT_MAX_SECTION_CONCURRENCY: usize = 8;

    /// Token budget per source used when formatting planning context
    pub const PLANNING_TOKENS_PER_SOURCE: usize = 1000;

    /// Token budget per source used when formatting section context
    pub const SECTION_TOKENS_PER_SOURCE: usize = 5000;
}

/// Retry policy constants
pub mod retry {
    /// Default maximum attempts (first call plus retries)
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 11;

    /// Initial delay before the first retry (milliseconds)
    pub const DEFAULT_INITIAL_DELAY_MS: u64 = 1000;

    /// Jitter upper bound as a fraction of the current delay
    pub const JITTER_FRACTION: f64 = 0.1;

    /// Backoff multiplier
    pub const BACKOFF_FACTOR: u32 = 2;
}

/// Generation backend constants
pub mod llm {
    /// Default maximum output tokens
    pub const DEFAULT_MAX_TOKENS: u32 = 2048;

    /// Default request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

    /// Default sampling temperature
    pub const DEFAULT_TEMPERATURE: f32 = 0.3;

    pub const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com/v1";
    pub const DEFAULT_OLLAMA_BASE: &str = "http://localhost:11434";
}

/// Search backend constants
pub mod search {
    /// Results requested per query
    pub const DEFAULT_MAX_RESULTS: usize = 5;

    /// Tavily search topic
    pub const DEFAULT_TOPIC: &str = "general";

    pub const TAVILY_ENDPOINT: &str = "https://api.tavily.com/search";

    /// Rough characters-per-token estimate used for source truncation
    pub const CHARS_PER_TOKEN: usize = 4;

    /// Marker appended to truncated raw content
    pub const TRUNCATION_MARKER: &str = "... [truncated]";

    /// Default request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
}

/// Checkpoint persistence constants
pub mod checkpoint {
    /// Checkpoint format version; bump on incompatible state changes
    pub const FORMAT_VERSION: u32 = 1;

    /// Database schema version stored in `PRAGMA user_version`
    pub const SCHEMA_VERSION: i32 = 1;
}

/// File-system layout
pub mod paths {
    /// Application directory name under the config root and project root
    pub const APP_DIR: &str = "deepscribe";

    /// Project-local directory
    pub const PROJECT_DIR: &str = ".deepscribe";

    pub const CONFIG_FILE: &str = "config.toml";

    pub const DATABASE_FILE: &str = "sessions.db";

    /// Environment variable prefix for configuration overrides
    pub const ENV_PREFIX: &str = "DEEPSCRIBE_";
}
