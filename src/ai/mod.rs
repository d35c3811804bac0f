//! AI Integration Layer
//!
//! Generation providers, the retry policy around remote calls, and parsing
//! of model output.

pub mod provider;
pub mod retry;
pub mod validation;

pub use provider::{
    ErrorCategory, ErrorClassifier, LlmError, LlmProvider, LlmResponse, OllamaProvider,
    OpenAiProvider, ProviderConfig, ResponseMetadata, ResponseTiming, SharedProvider, TokenUsage,
    create_provider,
};
pub use retry::{RetryPolicy, backoff_sleep, random_jitter};
pub use validation::{extract_json_from_response, parse_structured, response_text};
