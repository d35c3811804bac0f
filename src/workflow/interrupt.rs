//! Suspend/resume protocol values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{Result, ScribeError, Section, SessionId};

/// Suspension recorded in a checkpoint while waiting for a reviewer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingInterrupt {
    pub prompt: String,
    pub created_at: DateTime<Utc>,
}

impl PendingInterrupt {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            created_at: Utc::now(),
        }
    }

    /// Review prompt for an outline
    pub fn for_outline(sections: &[Section]) -> Self {
        Self::new(render_review_prompt(sections))
    }
}

/// Reviewer decision supplied to `resume`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeValue {
    Approve,
    Feedback(String),
}

impl ResumeValue {
    /// Classify a free-form resume value.
    ///
    /// Any boolean or the string `"true"` approves. Other non-blank text is
    /// feedback. Everything else is rejected.
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Bool(_) => Ok(Self::Approve),
            Value::String(text) => Self::from_text(text),
            other => Err(ScribeError::protocol(format!(
                "resume value must be a boolean or text, got {}",
                other
            ))),
        }
    }

    pub fn from_text(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        if trimmed.eq_ignore_ascii_case("true") {
            Ok(Self::Approve)
        } else if trimmed.is_empty() {
            Err(ScribeError::protocol("resume feedback cannot be blank"))
        } else {
            Ok(Self::Feedback(trimmed.to_string()))
        }
    }
}

/// Result of driving a session until it suspends or finishes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RunOutcome {
    Suspended {
        session_id: SessionId,
        prompt: String,
    },
    Completed {
        session_id: SessionId,
        document: String,
    },
}

impl RunOutcome {
    pub fn session_id(&self) -> &SessionId {
        match self {
            Self::Suspended { session_id, .. } | Self::Completed { session_id, .. } => session_id,
        }
    }

    pub fn is_suspended(&self) -> bool {
        matches!(self, Self::Suspended { .. })
    }
}

fn render_review_prompt(sections: &[Section]) -> String {
    let rendered: String = sections
        .iter()
        .map(|s| {
            format!(
                "Section: {}\nDescription: {}\nResearch needed: {}\n",
                s.name,
                s.description,
                if s.research { "Yes" } else { "No" }
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Please provide feedback on the following article outline. \n\n{}\n\n \
         Does the report plan meet your needs? Pass 'true' to approve the report plan \
         or provide feedback to regenerate the report plan:",
        rendered
    )
}
