//! deepscribe - Resumable Research-and-Write Workflow Engine
//!
//! Researches a topic on the web, proposes an outline for human review, then
//! researches and writes each section concurrently and compiles a single
//! markdown document. Every stage boundary is checkpointed, so a session
//! survives suspension, process restarts, and failed stages.
//!
//! ## Quick Start
//!
//! ```ignore
//! use deepscribe::{Config, Engine, ResumeValue, RunOutcome};
//!
//! let engine = Engine::from_config(&Config::default())?;
//! let outcome = engine.start(None, "Rust async runtimes").await?;
//! if let RunOutcome::Suspended { session_id, prompt } = outcome {
//!     println!("{prompt}");
//!     let done = engine.resume(&session_id, ResumeValue::Approve).await?;
//! }
//! ```
//!
//! ## Modules
//!
//! - [`workflow`]: Stage graph, executor, section research loop
//! - [`ai`]: Generation providers, retry policy, output parsing
//! - [`search`]: Web search backend, URL deduplication, source formatting
//! - [`storage`]: Checkpoint stores (SQLite and in-memory)
//! - [`config`]: Layered configuration

pub mod ai;
pub mod cli;
pub mod config;
pub mod constants;
pub mod search;
pub mod storage;
pub mod types;
pub mod workflow;

// =============================================================================
// Core Re-exports
// =============================================================================

pub use config::{Config, ConfigLoader};

pub use types::error::{ErrorCategory, Result, ResultExt, ScribeError};
pub use types::{CompletedSection, Section, SessionId};

pub use storage::{CheckpointStore, MemoryStore, SharedStore, SqliteStore};

pub use workflow::{
    Engine, ResumeValue, RunOutcome, SessionCheckpoint, SessionStatus, Stage, StageGraph,
    WorkflowContext,
};

pub use ai::{LlmProvider, LlmResponse, RetryPolicy};
pub use search::{SearchBackend, SearchResult, WebSearch};
