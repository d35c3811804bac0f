//! Structured model outputs and their validation.

use serde::Deserialize;
use std::collections::HashSet;

use crate::types::{Result, ScribeError, Section};

/// A query given either as plain text or as `{"search_query": "..."}`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum QueryItem {
    Text(String),
    Object { search_query: String },
}

impl QueryItem {
    fn into_query(self) -> String {
        match self {
            Self::Text(q) | Self::Object { search_query: q } => q.trim().to_string(),
        }
    }
}

fn collect_queries(items: Vec<QueryItem>) -> Vec<String> {
    items
        .into_iter()
        .map(QueryItem::into_query)
        .filter(|q| !q.is_empty())
        .collect()
}

#[derive(Debug, Deserialize)]
struct RawQueries {
    #[serde(default)]
    queries: Vec<QueryItem>,
}

/// Generated search queries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Queries(pub Vec<String>);

impl<'de> Deserialize<'de> for Queries {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let raw = RawQueries::deserialize(d)?;
        Ok(Self(collect_queries(raw.queries)))
    }
}

impl Queries {
    /// Keep at most `limit` queries
    pub fn limited(mut self, limit: usize) -> Vec<String> {
        self.0.truncate(limit);
        self.0
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutlineSection {
    #[serde(default)]
    pub section_number: Option<usize>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub research: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Outline {
    pub title: String,
    pub sections: Vec<OutlineSection>,
}

impl Outline {
    /// Validate and convert to ordered sections.
    ///
    /// Sections are ordered by `section_number` when given, else by position.
    /// Names must be non-empty and unique since they are the fan-in join key.
    pub fn into_sections(self) -> Result<(String, Vec<Section>)> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(ScribeError::invalid_output("outline", "empty title"));
        }
        if self.sections.is_empty() {
            return Err(ScribeError::invalid_output("outline", "no sections"));
        }

        let mut ordered: Vec<(usize, OutlineSection)> = self
            .sections
            .into_iter()
            .enumerate()
            .map(|(i, s)| (s.section_number.unwrap_or(i + 1), s))
            .collect();
        ordered.sort_by_key(|(number, _)| *number);

        let mut seen = HashSet::new();
        let mut sections = Vec::with_capacity(ordered.len());
        for (ordinal, (_, raw)) in ordered.into_iter().enumerate() {
            let name = raw.name.trim().to_string();
            if name.is_empty() {
                return Err(ScribeError::invalid_output(
                    "outline",
                    format!("section {} has no name", ordinal + 1),
                ));
            }
            if !seen.insert(name.clone()) {
                return Err(ScribeError::invalid_output(
                    "outline",
                    format!("duplicate section name '{}'", name),
                ));
            }
            sections.push(Section::new(ordinal, name, raw.description, raw.research));
        }

        Ok((title, sections))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grade {
    Pass,
    Fail,
}

impl Grade {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "pass" | "passed" | "true" => Grade::Pass,
            _ => Grade::Fail,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawFeedback {
    grade: String,
    #[serde(default)]
    follow_up_queries: Vec<QueryItem>,
}

/// Grader verdict for a written section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionFeedback {
    pub grade: Grade,
    pub follow_up_queries: Vec<String>,
}

impl<'de> Deserialize<'de> for SectionFeedback {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let raw = RawFeedback::deserialize(d)?;
        Ok(Self {
            grade: Grade::parse(&raw.grade),
            follow_up_queries: collect_queries(raw.follow_up_queries),
        })
    }
}

impl SectionFeedback {
    /// Verdict used when grading itself failed
    pub fn failed() -> Self {
        Self {
            grade: Grade::Fail,
            follow_up_queries: Vec::new(),
        }
    }

    pub fn passed(&self) -> bool {
        self.grade == Grade::Pass
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EditorNote {
    pub feedback: String,
    #[serde(default)]
    pub section_number: Option<usize>,
    #[serde(default)]
    pub section_title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EditorFeedback {
    #[serde(default)]
    pub feedbacks: Vec<EditorNote>,
}

impl EditorFeedback {
    /// Render as text for the final writers; `None` when there is nothing to say
    pub fn render(&self) -> Option<String> {
        if self.feedbacks.is_empty() {
            return None;
        }
        Some(
            self.feedbacks
                .iter()
                .map(|note| match note.section_number {
                    Some(n) => format!("- Section {} ({}): {}", n, note.section_title, note.feedback),
                    None => format!("- {}: {}", note.section_title, note.feedback),
                })
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_queries_accept_both_shapes() {
        let parsed: Queries = serde_json::from_value(json!({
            "queries": ["rust ownership", {"search_query": "borrow checker"}, "  "]
        }))
        .unwrap();
        assert_eq!(parsed.0, vec!["rust ownership", "borrow checker"]);
        assert_eq!(parsed.limited(1), vec!["rust ownership"]);
    }

    #[test]
    fn test_outline_orders_by_section_number() {
        let outline: Outline = serde_json::from_value(json!({
            "title": "Rust",
            "sections": [
                {"section_number": 2, "name": "Body", "description": "b", "research": true},
                {"section_number": 1, "name": "Intro", "description": "a", "research": false},
                {"section_number": 3, "name": "Conclusion", "description": "c", "research": false}
            ]
        }))
        .unwrap();

        let (title, sections) = outline.into_sections().unwrap();
        assert_eq!(title, "Rust");
        let names: Vec<_> = sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Intro", "Body", "Conclusion"]);
        assert_eq!(sections[2].ordinal, 2);
    }

    #[test]
    fn test_outline_rejects_duplicates_and_empty() {
        let dup: Outline = serde_json::from_value(json!({
            "title": "T",
            "sections": [{"name": "A"}, {"name": "A"}]
        }))
        .unwrap();
        assert!(matches!(dup.into_sections(), Err(ScribeError::InvalidOutput { .. })));

        let empty: Outline = serde_json::from_value(json!({"title": "T", "sections": []})).unwrap();
        assert!(empty.into_sections().is_err());
    }

    #[test]
    fn test_feedback_grade_parsing() {
        let pass: SectionFeedback =
            serde_json::from_value(json!({"grade": "PASS", "follow_up_queries": []})).unwrap();
        assert!(pass.passed());

        let fail: SectionFeedback = serde_json::from_value(json!({
            "grade": "fail",
            "follow_up_queries": [{"search_query": "more detail"}]
        }))
        .unwrap();
        assert!(!fail.passed());
        assert_eq!(fail.follow_up_queries, vec!["more detail"]);
    }

    #[test]
    fn test_editor_feedback_render() {
        let empty = EditorFeedback { feedbacks: vec![] };
        assert_eq!(empty.render(), None);

        let notes: EditorFeedback = serde_json::from_value(json!({
            "feedbacks": [{"feedback": "Define RAII", "section_number": 2, "section_title": "Ownership"}]
        }))
        .unwrap();
        assert_eq!(
            notes.render().unwrap(),
            "- Section 2 (Ownership): Define RAII"
        );
    }
}
