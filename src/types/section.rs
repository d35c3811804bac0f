//! Document section types
//!
//! A [`Section`] is created by outline generation, mutated by exactly one
//! section task, and frozen once wrapped in a [`CompletedSection`].

use serde::{Deserialize, Serialize};

use crate::search::canonical_url;

/// A cited web source. Identity is the canonical form of `url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub url: String,
}

impl Source {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }

    /// Deduplication key
    pub fn key(&self) -> String {
        canonical_url(&self.url)
    }
}

/// One planned section of the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Position in the outline (0-based)
    pub ordinal: usize,
    /// Unique within a document; the fan-in join key
    pub name: String,
    pub description: String,
    /// Whether the section gets its own search/write/grade loop
    pub research: bool,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub sources: Vec<Source>,
}

impl Section {
    pub fn new(
        ordinal: usize,
        name: impl Into<String>,
        description: impl Into<String>,
        research: bool,
    ) -> Self {
        Self {
            ordinal,
            name: name.into(),
            description: description.into(),
            research,
            content: String::new(),
            sources: Vec::new(),
        }
    }

    /// Upsert sources by canonical URL: first position kept, last title wins
    pub fn merge_sources(&mut self, incoming: impl IntoIterator<Item = Source>) {
        for source in incoming {
            let key = source.key();
            match self.sources.iter_mut().find(|s| s.key() == key) {
                Some(existing) => *existing = source,
                None => self.sources.push(source),
            }
        }
    }
}

/// How a section finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionKind {
    /// Grader accepted the content
    Passed,
    /// Search depth reached before the grader passed it
    DepthExhausted,
    /// Written from the research digest without its own search
    Unresearched,
}

impl CompletionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::DepthExhausted => "depth_exhausted",
            Self::Unresearched => "unresearched",
        }
    }
}

/// Finished section published at a fan-in barrier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedSection {
    pub section: Section,
    pub completion: CompletionKind,
    /// Number of search rounds performed
    pub search_rounds: u32,
}

impl CompletedSection {
    pub fn name(&self) -> &str {
        &self.section.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_sources_dedups_by_canonical_url() {
        let mut section = Section::new(0, "Intro", "desc", true);
        section.merge_sources(vec![
            Source::new("A", "https://example.com/a"),
            Source::new("B", "https://example.com/b"),
        ]);
        section.merge_sources(vec![
            Source::new("A2", "https://example.com/a/"),
            Source::new("C", "https://example.com/c"),
        ]);

        let titles: Vec<_> = section.sources.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["A2", "B", "C"]);
    }

    #[test]
    fn test_completion_kind_serde() {
        let json = serde_json::to_string(&CompletionKind::DepthExhausted).unwrap();
        assert_eq!(json, "\"depth_exhausted\"");
    }
}
