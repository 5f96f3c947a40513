//! Tagged parse result for LLM responses

use serde::de::DeserializeOwned;

/// Outcome of parsing an LLM response into an expected shape.
///
/// Providers guarantee closest-effort schema adherence only, so every call
/// site must handle the raw-text fallback explicitly rather than assuming
/// the shape.
#[derive(Debug, Clone, PartialEq)]
pub enum LlmParse<T> {
    /// The response deserialized into the expected shape
    Parsed(T),
    /// The response did not match; the raw text is preserved
    Unparsed(String),
}

impl<T: DeserializeOwned> LlmParse<T> {
    /// Parse a response, stripping a markdown code fence if the model
    /// wrapped its JSON in one.
    pub fn from_response(raw: &str) -> Self {
        let json = strip_code_fence(raw);
        match serde_json::from_str(&json) {
            Ok(value) => LlmParse::Parsed(value),
            Err(_) => LlmParse::Unparsed(raw.to_string()),
        }
    }
}

impl<T> LlmParse<T> {
    /// True when the response parsed into the expected shape
    pub fn is_parsed(&self) -> bool {
        matches!(self, LlmParse::Parsed(_))
    }

    /// The parsed value, discarding the raw-text fallback
    pub fn parsed(self) -> Option<T> {
        match self {
            LlmParse::Parsed(value) => Some(value),
            LlmParse::Unparsed(_) => None,
        }
    }
}

/// Extract JSON from a response, handling markdown code blocks
fn strip_code_fence(response: &str) -> String {
    let trimmed = response.trim();

    if trimmed.starts_with("```json") || trimmed.starts_with("```") {
        let lines: Vec<&str> = trimmed.lines().collect();
        if lines.len() < 2 {
            return String::new();
        }
        // Skip first line (```json or ```) and last line (```)
        lines[1..lines.len().saturating_sub(1)].join("\n")
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::ClusterTable;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Summary {
        summary: String,
    }

    #[test]
    fn test_parse_plain_json() {
        let result: LlmParse<Summary> =
            LlmParse::from_response(r#"{"summary": "a short chat about rust"}"#);
        assert_eq!(
            result,
            LlmParse::Parsed(Summary {
                summary: "a short chat about rust".to_string()
            })
        );
    }

    #[test]
    fn test_parse_with_markdown_wrapper() {
        let response = "```json\n{\"summary\": \"fenced\"}\n```";
        let result: LlmParse<Summary> = LlmParse::from_response(response);
        assert!(result.is_parsed());
    }

    #[test]
    fn test_parse_with_bare_fence() {
        let response = "```\n{\"summary\": \"fenced\"}\n```";
        let result: LlmParse<Summary> = LlmParse::from_response(response);
        assert!(result.is_parsed());
    }

    #[test]
    fn test_unparsed_keeps_raw_text() {
        let result: LlmParse<Summary> = LlmParse::from_response("not json at all");
        assert_eq!(result, LlmParse::Unparsed("not json at all".to_string()));
        assert!(result.parsed().is_none());
    }

    #[test]
    fn test_wrong_shape_is_unparsed() {
        // Valid JSON, wrong fields
        let result: LlmParse<ClusterTable> = LlmParse::from_response(r#"{"clusters": []}"#);
        assert!(!result.is_parsed());
    }

    #[test]
    fn test_empty_code_block() {
        let result: LlmParse<Summary> = LlmParse::from_response("```");
        assert!(!result.is_parsed());
    }
}
