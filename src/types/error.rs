//! Unified Error Type System
//!
//! Centralized error types for the engine and its adapters.
//! Provides the explicit classification table used by the retry policy to
//! separate retryable (transient, throttling) failures from fatal ones.
//!
//! ## Error Categories
//!
//! - **RateLimit**: Backend throttling (wait and retry)
//! - **Network**: Connectivity issues (retry with backoff)
//! - **Transient**: Temporary server-side failures (retry)
//! - **ParseError**: Malformed model output (retry, the call is re-issuable)
//! - **Auth**: Credential failures (fatal)
//! - **BadRequest**: Malformed input such as an empty query list (fatal)
//! - **TokenLimit**: Context too large (fatal for this call)
//! - **Unavailable**: Backend missing or misconfigured (fatal)
//!
//! ## Engine Taxonomy
//!
//! `Fatal`, `RetryExhausted`, `ProtocolViolation` and `ConsistencyFault` are
//! the engine-level outcomes surfaced to callers of `start`/`resume`.

use std::time::Duration;
use thiserror::Error;

use crate::workflow::CheckpointError;

// =============================================================================
// Error Categories
// =============================================================================

/// Error categories driving retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rate limited - wait then retry
    RateLimit,
    /// Context/token limit exceeded - retrying the same request cannot help
    TokenLimit,
    /// Authentication failed - fail fast
    Auth,
    /// Network/connectivity issues - retry with backoff
    Network,
    /// Backend unavailable or not installed
    Unavailable,
    /// Invalid request - don't retry, fix request
    BadRequest,
    /// Parsing model output failed - retry with the same prompt
    ParseError,
    /// Temporary server issues - retry
    Transient,
    /// Unknown error - conservative retry
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimit => write!(f, "RATE_LIMIT"),
            Self::TokenLimit => write!(f, "TOKEN_LIMIT"),
            Self::Auth => write!(f, "AUTH"),
            Self::Network => write!(f, "NETWORK"),
            Self::Unavailable => write!(f, "UNAVAILABLE"),
            Self::BadRequest => write!(f, "BAD_REQUEST"),
            Self::ParseError => write!(f, "PARSE_ERROR"),
            Self::Transient => write!(f, "TRANSIENT"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl ErrorCategory {
    /// Check if this category may succeed when the same call is re-issued
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimit | Self::Network | Self::Transient | Self::ParseError | Self::Unknown
        )
    }
}

// =============================================================================
// LLM / Backend Error
// =============================================================================

/// Classified error from a generation or search backend
#[derive(Debug, Clone)]
pub struct LlmError {
    /// Error category for retry decisions
    pub category: ErrorCategory,
    /// Detailed error message
    pub message: String,
    /// Backend that produced the error
    pub provider: Option<String>,
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(provider) = &self.provider {
            write!(f, "[{}:{}] {}", provider, self.category, self.message)
        } else {
            write!(f, "[{}] {}", self.category, self.message)
        }
    }
}

impl std::error::Error for LlmError {}

impl LlmError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            provider: None,
        }
    }

    pub fn with_provider(
        category: ErrorCategory,
        message: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            category,
            message: message.into(),
            provider: Some(provider.into()),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.category.is_retryable()
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Maps backend failures onto [`ErrorCategory`].
///
/// The retryable set is a property of the backends in use, not of the engine,
/// so the table lives here next to the adapters' error type.
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify an error message from any backend
    pub fn classify(message: &str, provider: &str) -> LlmError {
        let lower = message.to_lowercase();

        if lower.contains("rate limit")
            || lower.contains("429")
            || lower.contains("too many requests")
            || lower.contains("throttl")
            || lower.contains("quota exceeded")
        {
            return LlmError::with_provider(ErrorCategory::RateLimit, message, provider);
        }

        if lower.contains("token")
            && (lower.contains("limit") || lower.contains("exceed") || lower.contains("maximum"))
            || lower.contains("context length")
            || lower.contains("too large")
        {
            return LlmError::with_provider(ErrorCategory::TokenLimit, message, provider);
        }

        if lower.contains("401")
            || lower.contains("403")
            || lower.contains("api key")
            || lower.contains("unauthorized")
            || lower.contains("forbidden")
            || lower.contains("credential")
            || lower.contains("access denied")
        {
            return LlmError::with_provider(ErrorCategory::Auth, message, provider);
        }

        if lower.contains("network")
            || lower.contains("connection")
            || lower.contains("dns")
            || lower.contains("timeout")
            || lower.contains("timed out")
            || lower.contains("unreachable")
        {
            return LlmError::with_provider(ErrorCategory::Network, message, provider);
        }

        if lower.contains("500")
            || lower.contains("502")
            || lower.contains("503")
            || lower.contains("504")
            || lower.contains("overloaded")
            || lower.contains("temporar")
            || lower.contains("service unavailable")
        {
            return LlmError::with_provider(ErrorCategory::Transient, message, provider);
        }

        if lower.contains("not found") || lower.contains("not installed") {
            return LlmError::with_provider(ErrorCategory::Unavailable, message, provider);
        }

        if lower.contains("400")
            || lower.contains("bad request")
            || lower.contains("invalid")
            || lower.contains("malformed")
            || lower.contains("cannot be empty")
        {
            return LlmError::with_provider(ErrorCategory::BadRequest, message, provider);
        }

        if lower.contains("parse")
            || lower.contains("json")
            || lower.contains("syntax")
            || lower.contains("unexpected token")
        {
            return LlmError::with_provider(ErrorCategory::ParseError, message, provider);
        }

        LlmError::with_provider(ErrorCategory::Unknown, message, provider)
    }

    /// Classify HTTP status code directly (more accurate than string matching)
    pub fn classify_http_status(status: u16, message: &str, provider: &str) -> LlmError {
        match status {
            429 => LlmError::with_provider(ErrorCategory::RateLimit, message, provider),
            401 | 403 => LlmError::with_provider(ErrorCategory::Auth, message, provider),
            400 | 422 => LlmError::with_provider(ErrorCategory::BadRequest, message, provider),
            408 => LlmError::with_provider(ErrorCategory::Network, message, provider),
            500 | 502 | 503 | 504 => {
                LlmError::with_provider(ErrorCategory::Transient, message, provider)
            }
            404 => LlmError::with_provider(ErrorCategory::Unavailable, message, provider),
            _ => LlmError::with_provider(ErrorCategory::Unknown, message, provider),
        }
    }

    /// Classify a transport-level `reqwest` failure
    pub fn classify_reqwest(err: &reqwest::Error, provider: &str) -> LlmError {
        if err.is_timeout() || err.is_connect() {
            return LlmError::with_provider(ErrorCategory::Network, err.to_string(), provider);
        }
        if let Some(status) = err.status() {
            return Self::classify_http_status(status.as_u16(), &err.to_string(), provider);
        }
        if err.is_decode() {
            return LlmError::with_provider(ErrorCategory::ParseError, err.to_string(), provider);
        }
        Self::classify(&err.to_string(), provider)
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum ScribeError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Backend Errors
    // -------------------------------------------------------------------------
    /// Classified generation/search failure
    #[error("Backend error: {0}")]
    Llm(LlmError),

    // -------------------------------------------------------------------------
    // Engine Errors
    // -------------------------------------------------------------------------
    /// Non-retryable failure surfaced immediately to the caller
    #[error("Fatal error in {operation}: {source}")]
    Fatal {
        operation: String,
        #[source]
        source: Box<ScribeError>,
    },

    /// Retryable failure that persisted through every allowed attempt
    #[error("{operation} failed after {attempts} attempts: {source}")]
    RetryExhausted {
        operation: String,
        attempts: u32,
        #[source]
        source: Box<ScribeError>,
    },

    /// Caller misused the suspend/resume protocol; no state was changed
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// Internal invariant broken (e.g. a section without completed content)
    #[error("Consistency fault: {0}")]
    ConsistencyFault(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Session {0} is already being driven by another caller")]
    SessionBusy(String),

    #[error("Checkpoint error: {0}")]
    Checkpoint(CheckpointError),

    /// Model output did not match the expected structure
    #[error("Invalid model output for {what}: {reason}")]
    InvalidOutput { what: String, reason: String },

    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<LlmError> for ScribeError {
    fn from(err: LlmError) -> Self {
        ScribeError::Llm(err)
    }
}

impl From<CheckpointError> for ScribeError {
    fn from(err: CheckpointError) -> Self {
        ScribeError::Checkpoint(err)
    }
}

pub type Result<T> = std::result::Result<T, ScribeError>;

// =============================================================================
// Helper Functions
// =============================================================================

impl ScribeError {
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::ProtocolViolation(message.into())
    }

    pub fn invalid_output(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOutput {
            what: what.into(),
            reason: reason.into(),
        }
    }

    /// Category used by the retry policy's default classifier
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Llm(e) => e.category,
            Self::InvalidOutput { .. } | Self::Json(_) => ErrorCategory::ParseError,
            Self::Timeout { .. } => ErrorCategory::Network,
            Self::Io(_) => ErrorCategory::Network,
            Self::Database(_) | Self::Storage(_) => ErrorCategory::Unavailable,
            Self::Config(_) => ErrorCategory::BadRequest,
            Self::Fatal { .. }
            | Self::RetryExhausted { .. }
            | Self::ProtocolViolation(_)
            | Self::ConsistencyFault(_)
            | Self::SessionNotFound(_)
            | Self::SessionBusy(_)
            | Self::Checkpoint(_) => ErrorCategory::BadRequest,
        }
    }

    /// Check if re-issuing the failed call may succeed
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// True for the terminal outcomes of the retry policy
    pub fn is_call_failure(&self) -> bool {
        matches!(self, Self::Fatal { .. } | Self::RetryExhausted { .. })
    }
}

/// Context extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn with_context<C: Into<String>>(self, context: C) -> Result<T>;

    /// Add context using a closure (lazy evaluation)
    fn with_context_fn<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<C: Into<String>>(self, context: C) -> Result<T> {
        self.map_err(|e| ScribeError::Storage(format!("{}: {}", context.into(), e)))
    }

    fn with_context_fn<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| ScribeError::Storage(format!("{}: {}", f().into(), e)))
    }
}

// =============================================================================
// Tests
// =============================================================================
