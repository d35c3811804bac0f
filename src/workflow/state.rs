//! Workflow state threaded through every stage and persisted in checkpoints.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::types::{CompletedSection, Section};

/// Lifecycle of a session as seen by callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Running,
    /// Waiting on human input at the review stage
    Suspended,
    Completed,
    /// A stage failed; the stage pointer still names it
    Failed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Running => "running",
            SessionStatus::Suspended => "suspended",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "suspended" => SessionStatus::Suspended,
            "completed" => SessionStatus::Completed,
            "failed" => SessionStatus::Failed,
            _ => SessionStatus::Running,
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a session has produced so far
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub topic: String,
    #[serde(default)]
    pub title: String,
    /// Outline in ordinal order
    #[serde(default)]
    pub sections: Vec<Section>,
    /// Finished sections in arrival order. Append-only.
    #[serde(default)]
    pub completed_sections: Vec<CompletedSection>,
    /// Formatted sources gathered for outline planning
    #[serde(default)]
    pub source_context: String,
    /// Researched section text handed to the final writers
    #[serde(default)]
    pub research_digest: String,
    /// Reviewer feedback waiting for the next outline pass
    #[serde(default)]
    pub pending_feedback: Option<String>,
    /// Optional editorial notes produced after aggregation
    #[serde(default)]
    pub editor_feedback: Option<String>,
    #[serde(default)]
    pub head_asset: Option<String>,
    #[serde(default)]
    pub document: Option<String>,
    /// Number of outlines generated so far
    #[serde(default)]
    pub outline_revision: u32,
}

impl WorkflowState {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Default::default()
        }
    }

    pub fn research_sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter().filter(|s| s.research)
    }

    /// Names of sections that already have a completed entry
    pub fn completed_names(&self) -> HashSet<&str> {
        self.completed_sections.iter().map(|c| c.name()).collect()
    }

    /// Sections matching `filter` that have no completed entry yet.
    ///
    /// A fan-out stage re-driven after a partial failure only schedules these.
    pub fn outstanding<'a>(&'a self, filter: impl Fn(&Section) -> bool + 'a) -> Vec<Section> {
        let done = self.completed_names();
        self.sections
            .iter()
            .filter(|s| filter(s) && !done.contains(s.name.as_str()))
            .cloned()
            .collect()
    }

    /// Latest completed entry for a section name
    pub fn completed(&self, name: &str) -> Option<&CompletedSection> {
        self.completed_sections.iter().rev().find(|c| c.name() == name)
    }

    /// Replace the outline. Completed work from a previous outline is dropped.
    pub fn set_outline(&mut self, title: String, sections: Vec<Section>) {
        self.title = title;
        self.sections = sections;
        self.completed_sections.clear();
        self.research_digest.clear();
        self.outline_revision += 1;
    }
}
