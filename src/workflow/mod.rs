//! Research-and-write workflow
//!
//! A session moves through a fixed stage graph:
//!
//! ```text
//! InitialResearch -> OutlineGeneration -> HumanReview -+-> SectionFanOut
//!                         ^                            |        |
//!                         +--------- feedback ---------+        v
//!                                        SectionAggregation -> FinalSectionFanOut
//!                                                                 |
//!                                   Completed <- Compile <- AssetGeneration
//! ```
//!
//! Every stage boundary is checkpointed so a session can be suspended for
//! review, killed, or failed and then re-driven from where it stopped.

pub mod asset;
pub mod checkpoint;
pub mod compile;
pub mod context;
pub mod executor;
pub mod fanout;
pub mod interrupt;
pub mod lease;
pub mod prompts;
pub mod responses;
pub mod section;
pub mod stage;
pub mod stages;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use asset::{AssetProvider, NoAsset, SharedAssetProvider, StaticAsset};
pub use checkpoint::{CheckpointError, SessionCheckpoint};
pub use compile::{compile_document, research_digest};
pub use context::{SourceFormat, WorkflowContext};
pub use executor::Engine;
pub use fanout::{FanOutReport, fan_out};
pub use interrupt::{PendingInterrupt, ResumeValue, RunOutcome};
pub use lease::{SessionLease, SessionLeases};
pub use section::{SectionSubState, run_section};
pub use stage::{Edge, EdgeKind, Stage, StageGraph};
pub use state::{SessionStatus, WorkflowState};
