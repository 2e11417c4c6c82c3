//! JSON parsing utilities for LLM responses.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;

use crate::error::{ErrorCode, KgError, KgResult};

static CODE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json|JSON)?\s*\n?([\s\S]*?)\n?\s*```").unwrap());

static THINK_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<think>.*?</think>").unwrap());

static TRAILING_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*([\]}])").unwrap());

/// Extract JSON from potentially wrapped response (code blocks, prose around
/// an object).
pub fn extract_json(text: &str) -> &str {
    let text = text.trim();

    if let Some(content) = CODE_BLOCK.captures(text).and_then(|c| c.get(1)) {
        return content.as_str().trim();
    }

    // Prose before or after a bare object
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

/// Remove thinking tags from response.
pub fn remove_think_tags(content: &str) -> String {
    THINK_TAGS.replace_all(content, "").trim().to_string()
}

/// Fix the usual small-model JSON slips: single quotes and trailing commas.
fn repair(json_str: &str) -> String {
    let fixed = json_str.replace('\'', "\"");
    TRAILING_COMMA.replace_all(&fixed, "$1").into_owned()
}

/// Parse a structured LLM response into `T`.
///
/// Tries the response as-is first, then a repaired version. An empty
/// response is a parse error like any other unusable output.
pub fn parse_structured<T: DeserializeOwned>(response: &str) -> KgResult<T> {
    let cleaned = remove_think_tags(response);
    let json_str = extract_json(&cleaned);
    if json_str.is_empty() {
        return Err(KgError::Parse {
            message: "Empty model response".to_string(),
            code: ErrorCode::ParseMissingField,
        });
    }

    match serde_json::from_str(json_str) {
        Ok(parsed) => Ok(parsed),
        Err(e) => serde_json::from_str(&repair(json_str))
            .map_err(|_| KgError::parse(format!("Failed to parse model JSON: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Names {
        names: Vec<String>,
    }

    #[test]
    fn test_extract_json_from_code_block() {
        let input = "```json\n{\"names\": [\"Apple\"]}\n```";
        assert_eq!(extract_json(input), r#"{"names": ["Apple"]}"#);
    }

    #[test]
    fn test_extract_json_from_prose() {
        let input = "Here you go: {\"names\": []} Hope this helps.";
        assert_eq!(extract_json(input), r#"{"names": []}"#);
    }

    #[test]
    fn test_remove_think_tags() {
        let input = "<think>\nthe user wants\nnames\n</think>\n{\"names\": []}";
        assert_eq!(remove_think_tags(input), r#"{"names": []}"#);
    }

    #[test]
    fn test_parse_structured_plain() {
        let parsed: Names = parse_structured(r#"{"names": ["Apple", "Steve Jobs"]}"#).unwrap();
        assert_eq!(parsed.names, vec!["Apple", "Steve Jobs"]);
    }

    #[test]
    fn test_parse_structured_repairs_quotes_and_commas() {
        let parsed: Names = parse_structured("{'names': ['Apple', 'California',],}").unwrap();
        assert_eq!(parsed.names, vec!["Apple", "California"]);
    }

    #[test]
    fn test_parse_structured_keeps_apostrophes_when_valid() {
        let parsed: Names = parse_structured(r#"{"names": ["O'Brien"]}"#).unwrap();
        assert_eq!(parsed.names, vec!["O'Brien"]);
    }

    #[test]
    fn test_parse_structured_errors() {
        let empty = parse_structured::<Names>("   ");
        assert!(matches!(empty, Err(KgError::Parse { .. })));

        let garbage = parse_structured::<Names>("not json at all");
        assert!(garbage.is_err());
        assert!(garbage.unwrap_err().is_item_recoverable());
    }
}
