//! Model Output Parsing
//!
//! Extracts JSON from model replies and maps it onto typed structures.
//!
//! Handles the usual reply noise:
//! - Markdown code fence wrapping (```json ... ```)
//! - Trailing commas and unclosed brackets from truncated output
//! - JSON embedded in explanatory text
//!
//! Parse failures surface as [`ScribeError::InvalidOutput`], which the retry
//! policy treats as retryable: re-issuing the same call may produce valid output.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::types::{Result, ScribeError};

/// Extract and parse JSON from a model reply
pub fn extract_json_from_response(content: &str) -> Result<Value> {
    let cleaned = strip_code_fences(content.trim().trim_start_matches('\u{feff}'));

    if let Ok(value) = serde_json::from_str::<Value>(&cleaned) {
        return Ok(value);
    }

    debug!("Initial JSON parse failed, attempting repair");

    let repaired = balance_brackets(&fix_trailing_commas(&cleaned));
    if let Ok(value) = serde_json::from_str::<Value>(&repaired) {
        warn!("JSON repaired before parsing");
        return Ok(value);
    }

    if let Some(embedded) = extract_embedded(&cleaned)
        && let Ok(value) = serde_json::from_str::<Value>(&fix_trailing_commas(embedded))
    {
        warn!("JSON extracted from mixed content");
        return Ok(value);
    }

    Err(ScribeError::invalid_output(
        "json",
        format!(
            "no parseable JSON. Content preview: {}...",
            cleaned.chars().take(200).collect::<String>()
        ),
    ))
}

/// Deserialize a structured reply into `T`
pub fn parse_structured<T: DeserializeOwned>(value: Value, what: &str) -> Result<T> {
    // Providers without native structured output hand back raw text
    let value = match value {
        Value::String(text) => extract_json_from_response(&text)?,
        other => other,
    };
    serde_json::from_value(value).map_err(|e| ScribeError::invalid_output(what, e.to_string()))
}

/// Text content of a reply
pub fn response_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn strip_code_fences(s: &str) -> String {
    let mut result = s;

    if result.starts_with("```")
        && let Some(first_newline) = result.find('\n')
    {
        result = &result[first_newline + 1..];
    }

    if let Some(stripped) = result.trim_end().strip_suffix("```") {
        result = stripped;
    }

    result.trim().to_string()
}

fn fix_trailing_commas(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len());
    let mut in_string = false;
    let mut escape = false;

    for (i, &ch) in chars.iter().enumerate() {
        if escape {
            escape = false;
        } else if ch == '\\' && in_string {
            escape = true;
        } else if ch == '"' {
            in_string = !in_string;
        } else if ch == ',' && !in_string {
            let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
            if matches!(next, Some(']') | Some('}')) {
                continue;
            }
        }
        result.push(ch);
    }

    result
}

fn balance_brackets(s: &str) -> String {
    let mut closers = Vec::new();
    let mut in_string = false;
    let mut escape = false;

    for ch in s.chars() {
        if escape {
            escape = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            '{' if !in_string => closers.push('}'),
            '[' if !in_string => closers.push(']'),
            '}' | ']' if !in_string => {
                closers.pop();
            }
            _ => {}
        }
    }

    let mut result = s.to_string();
    if in_string {
        result.push('"');
    }
    while let Some(closer) = closers.pop() {
        result.push(closer);
    }
    result
}

/// First balanced `{...}` or `[...]` inside surrounding prose
fn extract_embedded(s: &str) -> Option<&str> {
    let start = s.find(['{', '['])?;
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape = false;

    for (i, ch) in s[start..].char_indices() {
        if escape {
            escape = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            '{' | '[' if !in_string => depth += 1,
            '}' | ']' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Queries {
        queries: Vec<String>,
    }

    #[test]
    fn test_parse_valid_json() {
        let value = extract_json_from_response(r#"{"key": "value"}"#).unwrap();
        assert_eq!(value["key"], "value");
    }

    #[test]
    fn test_strip_code_fences() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        let value = extract_json_from_response(input).unwrap();
        assert_eq!(value["key"], "value");
    }

    #[test]
    fn test_fix_trailing_comma() {
        let value = extract_json_from_response(r#"{"queries": ["a", "b",]}"#).unwrap();
        assert_eq!(value["queries"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_balance_brackets() {
        let value = extract_json_from_response(r#"{"sections": [{"name": "Intro"}"#).unwrap();
        assert!(value["sections"].is_array());
    }

    #[test]
    fn test_extract_from_mixed() {
        let input = "Here is the outline:\n{\"title\": \"T\", \"sections\": []}\nHope this helps!";
        let value = extract_json_from_response(input).unwrap();
        assert_eq!(value["title"], "T");
    }

    #[test]
    fn test_garbage_is_invalid_output() {
        let err = extract_json_from_response("no json here").unwrap_err();
        assert!(matches!(err, ScribeError::InvalidOutput { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_parse_structured_from_text() {
        let value = Value::String("```json\n{\"queries\": [\"q1\"]}\n```".to_string());
        let parsed: Queries = parse_structured(value, "queries").unwrap();
        assert_eq!(parsed.queries, vec!["q1"]);
    }

    #[test]
    fn test_parse_structured_shape_mismatch() {
        let err = parse_structured::<Queries>(serde_json::json!({"q": 1}), "queries").unwrap_err();
        assert!(matches!(err, ScribeError::InvalidOutput { what, .. } if what == "queries"));
    }
}
