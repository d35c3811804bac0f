//! Research digest and final document assembly.

use crate::types::{CompletedSection, Result, ScribeError};

use super::state::WorkflowState;

const RULE_WIDTH: usize = 60;

/// Render completed researched sections as context for the final writers.
///
/// Sections appear in ordinal order regardless of completion order.
pub fn research_digest(state: &WorkflowState) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut researched: Vec<&CompletedSection> = state
        .research_sections()
        .filter_map(|s| state.completed(&s.name))
        .collect();
    researched.sort_by_key(|c| c.section.ordinal);

    researched
        .iter()
        .map(|c| {
            let section = &c.section;
            let content = if section.content.is_empty() {
                "[Not yet written]"
            } else {
                section.content.as_str()
            };
            format!(
                "\n{rule}\nSection {}: {}\n{rule}\nDescription:\n{}\nRequires Research:\n{}\n\nContent:\n{}\n\n",
                section.ordinal + 1,
                section.name,
                section.description,
                section.research,
                content
            )
        })
        .collect()
}

/// Assemble the final document.
///
/// Every outline section must have a completed entry; when a name completed
/// more than once the latest entry wins.
pub fn compile_document(state: &WorkflowState) -> Result<String> {
    let mut ordered: Vec<_> = state.sections.iter().collect();
    ordered.sort_by_key(|s| s.ordinal);

    let mut parts = Vec::with_capacity(ordered.len());
    for section in ordered {
        let completed = state.completed(&section.name).ok_or_else(|| {
            ScribeError::ConsistencyFault(format!(
                "section '{}' has no completed content",
                section.name
            ))
        })?;
        parts.push(format!("## {}\n{}", section.name, completed.section.content));
    }

    let mut document = format!("# {}\n\n", state.title);
    if let Some(asset) = &state.head_asset {
        document.push_str(&format!("![{}]({})\n\n", state.title, asset));
    }
    document.push_str(&parts.join("\n\n"));
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CompletionKind, Section};

    fn state_with(sections: &[(&str, bool)]) -> WorkflowState {
        let mut state = WorkflowState::new("topic");
        state.set_outline(
            "Title".to_string(),
            sections
                .iter()
                .enumerate()
                .map(|(i, (name, research))| Section::new(i, *name, format!("{} desc", name), *research))
                .collect(),
        );
        state
    }

    fn complete(state: &mut WorkflowState, name: &str, content: &str) {
        let mut section = state
            .sections
            .iter()
            .find(|s| s.name == name)
            .unwrap()
            .clone();
        section.content = content.to_string();
        state.completed_sections.push(CompletedSection {
            section,
            completion: CompletionKind::Passed,
            search_rounds: 1,
        });
    }

    #[test]
    fn test_compile_uses_ordinal_order() {
        let mut state = state_with(&[("Intro", false), ("Body", true), ("End", false)]);
        complete(&mut state, "End", "bye");
        complete(&mut state, "Body", "middle");
        complete(&mut state, "Intro", "hello");

        let doc = compile_document(&state).unwrap();
        assert_eq!(doc, "# Title\n\n## Intro\nhello\n\n## Body\nmiddle\n\n## End\nbye");
    }

    #[test]
    fn test_compile_with_head_asset() {
        let mut state = state_with(&[("Intro", false)]);
        complete(&mut state, "Intro", "hello");
        state.head_asset = Some("head.png".to_string());

        let doc = compile_document(&state).unwrap();
        assert!(doc.starts_with("# Title\n\n![Title](head.png)\n\n## Intro"));
    }

    #[test]
    fn test_compile_missing_section_is_consistency_fault() {
        let mut state = state_with(&[("Intro", false), ("Body", true)]);
        complete(&mut state, "Intro", "hello");
        assert!(matches!(
            compile_document(&state),
            Err(ScribeError::ConsistencyFault(_))
        ));
    }

    #[test]
    fn test_duplicate_completion_last_wins() {
        let mut state = state_with(&[("Intro", false)]);
        complete(&mut state, "Intro", "first");
        complete(&mut state, "Intro", "second");
        assert!(compile_document(&state).unwrap().ends_with("## Intro\nsecond"));
    }

    #[test]
    fn test_digest_ordered_and_researched_only() {
        let mut state = state_with(&[("Intro", false), ("A", true), ("B", true)]);
        complete(&mut state, "B", "bee");
        complete(&mut state, "A", "");
        complete(&mut state, "Intro", "hi");

        let digest = research_digest(&state);
        let a = digest.find("Section 2: A").unwrap();
        let b = digest.find("Section 3: B").unwrap();
        assert!(a < b);
        assert!(digest.contains("[Not yet written]"));
        assert!(!digest.contains("Intro"));
    }
}
