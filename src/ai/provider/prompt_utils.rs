//! Prompt building utilities for LLM providers.

use serde_json::Value;

/// Append JSON schema instructions to a system prompt.
///
/// Returns the original prompt when no schema is given.
pub fn with_schema_instructions(system: &str, schema: Option<&Value>) -> String {
    let Some(schema) = schema else {
        return system.to_string();
    };

    let schema_str =
        serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string());
    format!(
        "{}\n\n---\n\nRespond with valid JSON matching this schema:\n```json\n{}\n```\n\nRespond ONLY with valid JSON, no explanation.",
        system, schema_str
    )
}
