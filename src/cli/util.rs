//! CLI Common Utilities
//!
//! Shared configuration loading and document output for command handlers.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::{Config, ConfigLoader};
use crate::storage::{SharedStore, open_store};
use crate::types::{Result, SessionId};
use crate::workflow::{Engine, RunOutcome};

/// Command execution context
///
/// Holds the resolved configuration and the checkpoint store. The engine,
/// which needs backend credentials, is only built by commands that drive
/// sessions.
pub struct CommandContext {
    pub config: Config,
    pub store: SharedStore,
}

impl CommandContext {
    /// Load configuration (from `config_path` when given) and open the store
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = load_config(config_path)?;
        let store = open_store(&config.storage)?;
        Ok(Self { config, store })
    }

    /// Build an engine over this context's store
    pub fn engine(&self) -> Result<Engine> {
        Engine::with_store(&self.config, self.store.clone())
    }

    pub fn document_path(&self, session_id: &SessionId) -> PathBuf {
        document_path(&self.config.output.dir, session_id)
    }
}

pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    match config_path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// `<dir>/<session>.md`
pub fn document_path(dir: &Path, session_id: &SessionId) -> PathBuf {
    dir.join(format!("{}.md", session_id))
}

/// Write a completed document under `dir`, creating the directory if needed
pub fn write_document(dir: &Path, session_id: &SessionId, document: &str) -> Result<PathBuf> {
    session_id.validate()?;
    fs::create_dir_all(dir)?;
    let path = document_path(dir, session_id);
    fs::write(&path, document)?;
    info!(path = %path.display(), "Document written");
    Ok(path)
}

/// Persist the document of a completed outcome; suspended outcomes write nothing
pub fn persist_outcome(dir: &Path, outcome: &RunOutcome) -> Result<Option<PathBuf>> {
    match outcome {
        RunOutcome::Completed {
            session_id,
            document,
        } => write_document(dir, session_id, document).map(Some),
        RunOutcome::Suspended { .. } => Ok(None),
    }
}
