//! Rendering of search results into prompt context.

use super::SearchResult;
use crate::constants::search::{CHARS_PER_TOKEN, TRUNCATION_MARKER};
use tracing::warn;

/// Format results as a "Sources:" block for generation prompts.
///
/// Raw page content, when requested, is cut at `max_tokens_per_source * 4`
/// characters and marked as truncated.
pub fn format_sources(
    results: &[SearchResult],
    max_tokens_per_source: usize,
    include_raw_content: bool,
) -> String {
    let char_limit = max_tokens_per_source * CHARS_PER_TOKEN;
    let mut out = String::from("Sources:\n\n");

    for result in results {
        out.push_str(&format!("Source {}:\n===\n", result.title));
        out.push_str(&format!("URL: {}\n===\n", result.url));
        out.push_str(&format!(
            "Most relevant content from source: {}\n===\n",
            result.content
        ));

        if include_raw_content {
            let raw = match result.raw_content.as_deref() {
                Some(raw) => raw,
                None => {
                    warn!(url = %result.url, "No raw content for source");
                    ""
                }
            };
            out.push_str(&format!(
                "Full source content limited to {} tokens: {}\n\n",
                max_tokens_per_source,
                truncate_chars(raw, char_limit)
            ));
        }
    }

    out.trim().to_string()
}

fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_index, _)) => format!("{}{}", &text[..byte_index], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(raw: Option<&str>) -> SearchResult {
        SearchResult {
            title: "Rust Book".to_string(),
            url: "https://doc.rust-lang.org/book/".to_string(),
            content: "Ownership explained".to_string(),
            raw_content: raw.map(str::to_string),
            score: Some(0.9),
        }
    }

    #[test]
    fn test_format_without_raw() {
        let text = format_sources(&[result(Some("ignored"))], 10, false);
        assert!(text.starts_with("Sources:"));
        assert!(text.contains("Source Rust Book:\n===\n"));
        assert!(text.contains("URL: https://doc.rust-lang.org/book/"));
        assert!(text.contains("Most relevant content from source: Ownership explained"));
        assert!(!text.contains("ignored"));
    }

    #[test]
    fn test_raw_content_truncated() {
        let raw = "x".repeat(50);
        let text = format_sources(&[result(Some(&raw))], 2, true);
        assert!(text.contains(&format!("{}... [truncated]", "x".repeat(8))));
        assert!(!text.contains(&"x".repeat(9)));
    }

    #[test]
    fn test_missing_raw_content_is_empty() {
        let text = format_sources(&[result(None)], 2, true);
        assert!(text.contains("Full source content limited to 2 tokens:"));
    }

    #[test]
    fn test_empty_results() {
        assert_eq!(format_sources(&[], 100, true), "Sources:");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé... [truncated]");
        assert_eq!(truncate_chars("hi", 2), "hi");
    }
}
