//! Main Workflow Executor
//!
//! Drives a session stage by stage from its checkpointed stage pointer,
//! saving after every stage. Suspends at human review and re-enters from the
//! persisted state on `resume`.
//!
//! ## Failure handling
//!
//! A failing stage leaves the stage pointer where it was, marks the session
//! `Failed` with the error message, and returns the error. `continue_run`
//! re-drives from that stage; fan-out stages only re-run sections without a
//! completed entry.

use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use super::asset;
use super::checkpoint::SessionCheckpoint;
use super::context::{SourceFormat, WorkflowContext};
use super::interrupt::{PendingInterrupt, ResumeValue, RunOutcome};
use super::lease::SessionLeases;
use super::stage::{Stage, StageGraph};
use super::stages;
use super::state::{SessionStatus, WorkflowState};
use crate::ai::{ProviderConfig, RetryPolicy, create_provider};
use crate::config::Config;
use crate::search::WebSearch;
use crate::storage::{SessionSummary, SharedStore, open_store};
use crate::types::{Result, ScribeError, SessionId};

pub struct Engine {
    store: SharedStore,
    ctx: Arc<WorkflowContext>,
    leases: SessionLeases,
}

impl Engine {
    pub fn new(store: SharedStore, ctx: WorkflowContext) -> Self {
        Self {
            store,
            ctx: Arc::new(ctx),
            leases: SessionLeases::new(),
        }
    }

    /// Wire providers, search, assets, and storage from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_store(config, open_store(&config.storage)?)
    }

    /// Wire providers, search, and assets from configuration over `store`
    pub fn with_store(config: &Config, store: SharedStore) -> Result<Self> {
        let retry = RetryPolicy::from_config(&config.retry);
        let planner = create_provider(&ProviderConfig::planner(&config.llm))?;
        let writer = create_provider(&ProviderConfig::writer(&config.llm))?;
        let search = WebSearch::from_config(&config.search, retry)?;

        let ctx = WorkflowContext::new(
            planner,
            writer,
            search,
            retry,
            config.research.clone(),
            SourceFormat::from(&config.search),
        )
        .with_assets(asset::from_config(&config.output));

        Ok(Self::new(store, ctx))
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Create a session for `topic` and run it until it suspends or completes.
    ///
    /// Without an id a fresh one is generated. Reusing an existing id, or one
    /// that cannot serve as a file name, is a protocol violation.
    #[instrument(skip(self, topic), fields(session = tracing::field::Empty))]
    pub async fn start(&self, session_id: Option<SessionId>, topic: &str) -> Result<RunOutcome> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(ScribeError::protocol("topic cannot be empty"));
        }

        let id = session_id.unwrap_or_else(SessionId::generate);
        id.validate()?;
        tracing::Span::current().record("session", id.as_str());
        let _lease = self.leases.acquire(&id)?;

        let checkpoint = SessionCheckpoint::new(id, topic);
        self.store.create(&checkpoint)?;
        info!(topic, "Session started");

        self.drive(checkpoint).await
    }

    /// Apply a reviewer decision to a suspended session and keep driving.
    ///
    /// Rejected without any state change unless the session is suspended at
    /// human review.
    #[instrument(skip(self, value), fields(session = %id))]
    pub async fn resume(&self, id: &SessionId, value: ResumeValue) -> Result<RunOutcome> {
        let _lease = self.leases.acquire(id)?;

        let checkpoint = self
            .store
            .update(id, &mut |cp| apply_resume(cp, &value))?;
        info!(next = %checkpoint.stage, "Session resumed");

        self.drive(checkpoint).await
    }

    /// [`Engine::resume`] with a raw JSON value (`true` or feedback text)
    pub async fn resume_json(&self, id: &SessionId, value: &Value) -> Result<RunOutcome> {
        let value = ResumeValue::from_json(value)?;
        self.resume(id, value).await
    }

    /// Re-drive a session from its checkpointed stage.
    ///
    /// Completed sessions return their document and suspended sessions their
    /// prompt, without doing any work.
    #[instrument(skip(self), fields(session = %id))]
    pub async fn continue_run(&self, id: &SessionId) -> Result<RunOutcome> {
        let _lease = self.leases.acquire(id)?;
        let mut checkpoint = self.store.load(id)?;

        match checkpoint.status {
            SessionStatus::Completed => completed_outcome(&checkpoint),
            SessionStatus::Suspended => suspended_outcome(&checkpoint),
            SessionStatus::Running | SessionStatus::Failed => {
                if let Some(previous) = checkpoint.last_error.take() {
                    info!(stage = %checkpoint.stage, previous_error = %previous, "Retrying failed stage");
                }
                checkpoint.status = SessionStatus::Running;
                self.drive(checkpoint).await
            }
        }
    }

    pub fn status(&self, id: &SessionId) -> Result<SessionCheckpoint> {
        self.store.load(id)
    }

    pub fn list(&self) -> Result<Vec<SessionSummary>> {
        self.store.list()
    }

    /// Run stages until suspension, completion, or failure
    async fn drive(&self, mut checkpoint: SessionCheckpoint) -> Result<RunOutcome> {
        loop {
            match checkpoint.stage {
                Stage::Completed => return completed_outcome(&checkpoint),
                Stage::HumanReview => {
                    let interrupt = PendingInterrupt::for_outline(&checkpoint.state.sections);
                    let prompt = interrupt.prompt.clone();
                    checkpoint.pending_interrupt = Some(interrupt);
                    checkpoint.status = SessionStatus::Suspended;
                    checkpoint.touch();
                    self.store.save(&checkpoint)?;
                    info!(
                        session = %checkpoint.session_id,
                        sections = checkpoint.state.sections.len(),
                        "Suspended for outline review"
                    );
                    return Ok(RunOutcome::Suspended {
                        session_id: checkpoint.session_id,
                        prompt,
                    });
                }
                stage => {
                    info!(session = %checkpoint.session_id, stage = %stage, "Running stage");
                    let result = self.run_stage(stage, &mut checkpoint.state).await;

                    match result.and_then(|next| {
                        StageGraph::ensure_transition(stage, next)?;
                        Ok(next)
                    }) {
                        Ok(next) => {
                            checkpoint.stage = next;
                            if next.is_terminal() {
                                checkpoint.status = SessionStatus::Completed;
                            }
                            checkpoint.touch();
                            self.store.save(&checkpoint)?;
                        }
                        Err(e) => {
                            error!(session = %checkpoint.session_id, stage = %stage, error = %e, "Stage failed");
                            checkpoint.status = SessionStatus::Failed;
                            checkpoint.last_error = Some(e.to_string());
                            checkpoint.touch();
                            if let Err(save_err) = self.store.save(&checkpoint) {
                                warn!(error = %save_err, "Failed to record stage failure");
                            }
                            return Err(e);
                        }
                    }
                }
            }
        }
    }

    /// Execute one stage and name the next. Review and completion are handled
    /// by the driver and never reach here.
    async fn run_stage(&self, stage: Stage, state: &mut WorkflowState) -> Result<Stage> {
        let ctx = self.ctx.as_ref();
        match stage {
            Stage::InitialResearch => {
                stages::initial_research(ctx, state).await?;
                Ok(Stage::OutlineGeneration)
            }
            Stage::OutlineGeneration => {
                stages::generate_outline(ctx, state).await?;
                Ok(Stage::HumanReview)
            }
            Stage::SectionFanOut => {
                stages::research_sections(ctx, state).await?;
                Ok(Stage::SectionAggregation)
            }
            Stage::SectionAggregation => {
                stages::aggregate_sections(ctx, state).await?;
                Ok(Stage::FinalSectionFanOut)
            }
            Stage::FinalSectionFanOut => {
                stages::write_final_sections(ctx, state).await?;
                Ok(Stage::AssetGeneration)
            }
            Stage::AssetGeneration => {
                stages::generate_asset(ctx, state).await?;
                Ok(Stage::Compile)
            }
            Stage::Compile => {
                stages::compile(state)?;
                Ok(Stage::Completed)
            }
            Stage::HumanReview | Stage::Completed => Err(ScribeError::ConsistencyFault(format!(
                "stage {} is not executable",
                stage
            ))),
        }
    }
}

/// Transition out of human review. Any error leaves the checkpoint unwritten.
fn apply_resume(checkpoint: &mut SessionCheckpoint, value: &ResumeValue) -> Result<()> {
    if checkpoint.stage != Stage::HumanReview || checkpoint.pending_interrupt.is_none() {
        return Err(ScribeError::protocol(format!(
            "session {} is not waiting for review (stage {}, status {})",
            checkpoint.session_id, checkpoint.stage, checkpoint.status
        )));
    }

    let next = match value {
        ResumeValue::Approve => Stage::SectionFanOut,
        ResumeValue::Feedback(text) => {
            checkpoint.state.pending_feedback = Some(text.clone());
            Stage::OutlineGeneration
        }
    };
    StageGraph::ensure_transition(Stage::HumanReview, next)?;

    checkpoint.stage = next;
    checkpoint.pending_interrupt = None;
    checkpoint.status = SessionStatus::Running;
    Ok(())
}

fn completed_outcome(checkpoint: &SessionCheckpoint) -> Result<RunOutcome> {
    let document = checkpoint.state.document.clone().ok_or_else(|| {
        ScribeError::ConsistencyFault(format!(
            "session {} completed without a document",
            checkpoint.session_id
        ))
    })?;
    Ok(RunOutcome::Completed {
        session_id: checkpoint.session_id.clone(),
        document,
    })
}

fn suspended_outcome(checkpoint: &SessionCheckpoint) -> Result<RunOutcome> {
    let interrupt = checkpoint.pending_interrupt.as_ref().ok_or_else(|| {
        ScribeError::ConsistencyFault(format!(
            "session {} suspended without a pending review",
            checkpoint.session_id
        ))
    })?;
    Ok(RunOutcome::Suspended {
        session_id: checkpoint.session_id.clone(),
        prompt: interrupt.prompt.clone(),
    })
}
