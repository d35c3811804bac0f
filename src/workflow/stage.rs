//! Stage Registry & Graph
//!
//! The closed set of top-level stages and the static graph connecting them.
//!
//! ```text
//! InitialResearch → OutlineGeneration → HumanReview ─┬─ feedback → OutlineGeneration
//!                                                    └─ approve  → SectionFanOut
//! SectionFanOut ⇉ SectionAggregation → FinalSectionFanOut ⇉ AssetGeneration → Compile → Completed
//! ```
//!
//! `⇉` marks the two dynamic fan-out points: one task per qualifying section,
//! joined by a barrier before the next stage starts.

use serde::{Deserialize, Serialize};

use crate::types::{Result, ScribeError};

/// Top-level workflow stage. The checkpointed stage pointer names the next
/// stage to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    InitialResearch,
    OutlineGeneration,
    HumanReview,
    SectionFanOut,
    SectionAggregation,
    FinalSectionFanOut,
    AssetGeneration,
    Compile,
    Completed,
}

impl Stage {
    /// All stages in execution order
    pub const ALL: [Stage; 9] = [
        Stage::InitialResearch,
        Stage::OutlineGeneration,
        Stage::HumanReview,
        Stage::SectionFanOut,
        Stage::SectionAggregation,
        Stage::FinalSectionFanOut,
        Stage::AssetGeneration,
        Stage::Compile,
        Stage::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InitialResearch => "initial_research",
            Self::OutlineGeneration => "outline_generation",
            Self::HumanReview => "human_review",
            Self::SectionFanOut => "section_fan_out",
            Self::SectionAggregation => "section_aggregation",
            Self::FinalSectionFanOut => "final_section_fan_out",
            Self::AssetGeneration => "asset_generation",
            Self::Compile => "compile",
            Self::Completed => "completed",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::InitialResearch => "Initial Research",
            Self::OutlineGeneration => "Outline Generation",
            Self::HumanReview => "Human Review",
            Self::SectionFanOut => "Section Research",
            Self::SectionAggregation => "Section Aggregation",
            Self::FinalSectionFanOut => "Final Sections",
            Self::AssetGeneration => "Asset Generation",
            Self::Compile => "Compile",
            Self::Completed => "Completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|stage| stage.as_str() == s)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an edge is taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// Always taken when the source stage succeeds
    Static,
    /// Chosen by the resume value at HumanReview
    Conditional,
    /// Taken after the source's per-section barrier completes
    FanIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub from: Stage,
    pub to: Stage,
    pub kind: EdgeKind,
    pub label: &'static str,
}

const EDGES: &[Edge] = &[
    Edge {
        from: Stage::InitialResearch,
        to: Stage::OutlineGeneration,
        kind: EdgeKind::Static,
        label: "",
    },
    Edge {
        from: Stage::OutlineGeneration,
        to: Stage::HumanReview,
        kind: EdgeKind::Static,
        label: "",
    },
    Edge {
        from: Stage::HumanReview,
        to: Stage::OutlineGeneration,
        kind: EdgeKind::Conditional,
        label: "feedback",
    },
    Edge {
        from: Stage::HumanReview,
        to: Stage::SectionFanOut,
        kind: EdgeKind::Conditional,
        label: "approve",
    },
    Edge {
        from: Stage::SectionFanOut,
        to: Stage::SectionAggregation,
        kind: EdgeKind::FanIn,
        label: "all researched sections",
    },
    Edge {
        from: Stage::SectionAggregation,
        to: Stage::FinalSectionFanOut,
        kind: EdgeKind::Static,
        label: "",
    },
    Edge {
        from: Stage::FinalSectionFanOut,
        to: Stage::AssetGeneration,
        kind: EdgeKind::FanIn,
        label: "all final sections",
    },
    Edge {
        from: Stage::AssetGeneration,
        to: Stage::Compile,
        kind: EdgeKind::Static,
        label: "",
    },
    Edge {
        from: Stage::Compile,
        to: Stage::Completed,
        kind: EdgeKind::Static,
        label: "",
    },
];

/// Static definition of the workflow graph
pub struct StageGraph;

impl StageGraph {
    pub const ENTRY: Stage = Stage::InitialResearch;

    pub fn edges() -> &'static [Edge] {
        EDGES
    }

    pub fn successors(stage: Stage) -> impl Iterator<Item = Stage> {
        EDGES.iter().filter(move |e| e.from == stage).map(|e| e.to)
    }

    pub fn allows(from: Stage, to: Stage) -> bool {
        EDGES.iter().any(|e| e.from == from && e.to == to)
    }

    /// Reject a transition the graph does not define
    pub fn ensure_transition(from: Stage, to: Stage) -> Result<()> {
        if Self::allows(from, to) {
            Ok(())
        } else {
            Err(ScribeError::ConsistencyFault(format!(
                "no edge from {} to {}",
                from, to
            )))
        }
    }

    /// Render the graph as a Mermaid flowchart
    pub fn to_mermaid() -> String {
        let mut out = String::from("flowchart TD\n");
        out.push_str("    START((start)) --> initial_research\n");
        for edge in EDGES {
            let arrow = match edge.kind {
                EdgeKind::Static => "-->".to_string(),
                EdgeKind::Conditional => format!("-. {} .->", edge.label),
                EdgeKind::FanIn => format!("== {} ==>", edge.label),
            };
            out.push_str(&format!(
                "    {}[{}] {} {}[{}]\n",
                edge.from.as_str(),
                edge.from.name(),
                arrow,
                edge.to.as_str(),
                edge.to.name()
            ));
        }
        out
    }
}
