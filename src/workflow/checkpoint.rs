//! Session Checkpoint
//!
//! The unit of persistence: workflow state, the stage pointer naming the next
//! stage to run, and the pending interrupt if the session is suspended.
//!
//! ## Format Version 1
//!
//! - `version`: format version for compatibility checking
//! - `checksum`: CRC32 over the serialized content fields
//! - `stage` / `status`: resume point and caller-visible lifecycle
//! - `revision`: bumped on every save, used for optimistic inspection
//! - `state`: [`WorkflowState`]
//! - `pending_interrupt`: set only while suspended at human review

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::interrupt::PendingInterrupt;
use super::stage::Stage;
use super::state::{SessionStatus, WorkflowState};
use crate::constants::checkpoint::FORMAT_VERSION;
use crate::types::SessionId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionCheckpoint {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub checksum: u32,
    pub session_id: SessionId,
    pub stage: Stage,
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default)]
    pub revision: u64,
    pub state: WorkflowState,
    #[serde(default)]
    pub pending_interrupt: Option<PendingInterrupt>,
    /// Message of the failure that left the session in `Failed`
    #[serde(default)]
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_version() -> u32 {
    FORMAT_VERSION
}

/// Borrowed view of everything the checksum covers
#[derive(Serialize)]
struct ChecksumView<'a> {
    version: u32,
    session_id: &'a SessionId,
    stage: Stage,
    status: SessionStatus,
    revision: u64,
    state: &'a WorkflowState,
    pending_interrupt: &'a Option<PendingInterrupt>,
    last_error: &'a Option<String>,
    created_at: &'a DateTime<Utc>,
    updated_at: &'a DateTime<Utc>,
}

impl SessionCheckpoint {
    /// Fresh checkpoint positioned at the graph entry
    pub fn new(session_id: SessionId, topic: impl Into<String>) -> Self {
        let now = Utc::now();
        let mut checkpoint = Self {
            version: FORMAT_VERSION,
            checksum: 0,
            session_id,
            stage: Stage::InitialResearch,
            status: SessionStatus::Running,
            revision: 0,
            state: WorkflowState::new(topic),
            pending_interrupt: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        };
        checkpoint.finalize();
        checkpoint
    }

    /// Record a modification: bump revision and timestamp, refresh checksum
    pub fn touch(&mut self) {
        self.revision += 1;
        self.updated_at = Utc::now();
        self.finalize();
    }

    fn compute_checksum(&self) -> u32 {
        let view = ChecksumView {
            version: self.version,
            session_id: &self.session_id,
            stage: self.stage,
            status: self.status,
            revision: self.revision,
            state: &self.state,
            pending_interrupt: &self.pending_interrupt,
            last_error: &self.last_error,
            created_at: &self.created_at,
            updated_at: &self.updated_at,
        };
        let bytes = serde_json::to_vec(&view).unwrap_or_default();
        crc32fast::hash(&bytes)
    }

    /// Update checksum before serialization
    pub fn finalize(&mut self) {
        self.checksum = self.compute_checksum();
    }

    /// Validate integrity, version compatibility, and stage consistency
    pub fn validate(&self) -> Result<(), CheckpointError> {
        if self.version > FORMAT_VERSION {
            return Err(CheckpointError::IncompatibleVersion {
                found: self.version,
                expected: FORMAT_VERSION,
            });
        }

        let computed = self.compute_checksum();
        if self.checksum != computed {
            return Err(CheckpointError::ChecksumMismatch {
                expected: self.checksum,
                computed,
            });
        }

        if self.pending_interrupt.is_some() && self.stage != Stage::HumanReview {
            return Err(CheckpointError::InconsistentStage {
                stage: self.stage,
                reason: "pending interrupt outside human review",
            });
        }
        if self.status == SessionStatus::Suspended && self.pending_interrupt.is_none() {
            return Err(CheckpointError::InconsistentStage {
                stage: self.stage,
                reason: "suspended without a pending interrupt",
            });
        }
        if (self.status == SessionStatus::Completed) != (self.stage == Stage::Completed) {
            return Err(CheckpointError::InconsistentStage {
                stage: self.stage,
                reason: "completed status and stage disagree",
            });
        }
        if self.stage == Stage::Completed && self.state.document.is_none() {
            return Err(CheckpointError::MissingData {
                stage: self.stage,
                field: "document",
            });
        }

        Ok(())
    }

    /// Serialize with checksum for storage
    pub fn to_json(&mut self) -> Result<String, serde_json::Error> {
        self.finalize();
        serde_json::to_string(self)
    }

    /// Deserialize and validate
    pub fn from_json(json: &str) -> Result<Self, CheckpointError> {
        let checkpoint: Self =
            serde_json::from_str(json).map_err(|e| CheckpointError::ParseError(e.to_string()))?;
        checkpoint.validate()?;
        Ok(checkpoint)
    }
}

/// Checkpoint validation errors
#[derive(Debug, Clone)]
pub enum CheckpointError {
    /// Checkpoint version is newer than supported
    IncompatibleVersion { found: u32, expected: u32 },
    /// Checksum validation failed
    ChecksumMismatch { expected: u32, computed: u32 },
    /// Stage pointer contradicts the rest of the record
    InconsistentStage { stage: Stage, reason: &'static str },
    /// Required data missing for stage
    MissingData { stage: Stage, field: &'static str },
    /// JSON parse error
    ParseError(String),
}

impl std::fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IncompatibleVersion { found, expected } => {
                write!(
                    f,
                    "Checkpoint version {} is newer than supported version {}",
                    found, expected
                )
            }
            Self::ChecksumMismatch { expected, computed } => {
                write!(
                    f,
                    "Checkpoint corrupted: checksum mismatch (expected {}, got {})",
                    expected, computed
                )
            }
            Self::InconsistentStage { stage, reason } => {
                write!(f, "Inconsistent checkpoint at stage {}: {}", stage, reason)
            }
            Self::MissingData { stage, field } => {
                write!(f, "Stage {} requires {} but it's missing", stage, field)
            }
            Self::ParseError(msg) => {
                write!(f, "Failed to parse checkpoint: {}", msg)
            }
        }
    }
}

impl std::error::Error for CheckpointError {}
