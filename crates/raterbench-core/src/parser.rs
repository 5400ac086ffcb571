//! Response parsing for free-text rater output.
//!
//! Raters are asked for a bare integer, a JSON array or a JSON object, and
//! routinely wrap the answer in prose or markdown. Extraction is split into
//! two steps so each can be checked on its own:
//!
//! 1. [`extract_span`] finds the first greedy bracket/brace span
//! 2. [`parse`] decodes that span
//!
//! Nothing here returns an error: anything that does not decode is `None`.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value as JsonValue};

lazy_static! {
    /// First `[` through last `]`, across newlines
    static ref ARRAY_SPAN: Regex = Regex::new(r"(?s)\[.*\]").unwrap();

    /// First `{` through last `}`, across newlines
    static ref OBJECT_SPAN: Regex = Regex::new(r"(?s)\{.*\}").unwrap();

    /// Whichever of the two shapes starts first
    static ref ANY_SPAN: Regex = Regex::new(r"(?s)\[.*\]|\{.*\}").unwrap();
}

/// The shape a caller expects a rater reply to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedShape {
    /// A bare integer, e.g. a Likert answer
    Integer,
    /// A JSON array somewhere in the text
    JsonArray,
    /// A JSON object somewhere in the text
    JsonObject,
    /// Either a JSON array or a JSON object, whichever comes first
    JsonAny,
}

/// A structured value extracted from rater text.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedValue {
    Integer(i64),
    Array(Vec<JsonValue>),
    Object(Map<String, JsonValue>),
}

impl ParsedValue {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            ParsedValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn into_array(self) -> Option<Vec<JsonValue>> {
        match self {
            ParsedValue::Array(values) => Some(values),
            _ => None,
        }
    }

    pub fn into_object(self) -> Option<Map<String, JsonValue>> {
        match self {
            ParsedValue::Object(map) => Some(map),
            _ => None,
        }
    }
}

/// Parse rater text into the expected shape.
///
/// Returns `None` when the text holds no value of that shape.
pub fn parse(raw_text: &str, shape: ExpectedShape) -> Option<ParsedValue> {
    if shape == ExpectedShape::Integer {
        return parse_integer(raw_text).map(ParsedValue::Integer);
    }

    let span = extract_span(raw_text, shape)?;
    match serde_json::from_str::<JsonValue>(span).ok()? {
        JsonValue::Array(values) if shape != ExpectedShape::JsonObject => {
            Some(ParsedValue::Array(values))
        }
        JsonValue::Object(map) if shape != ExpectedShape::JsonArray => {
            Some(ParsedValue::Object(map))
        }
        _ => None,
    }
}

/// Strict integer conversion of the trimmed text.
///
/// "4" and " +4\n" parse; "4." or "Answer: 4" do not.
pub fn parse_integer(raw_text: &str) -> Option<i64> {
    raw_text.trim().parse::<i64>().ok()
}

/// Find the first bracket or brace span for a JSON shape.
///
/// The match is greedy: it runs from the first opening delimiter to the last
/// closing one. Only that first match is ever considered. Returns `None` for
/// [`ExpectedShape::Integer`].
pub fn extract_span(text: &str, shape: ExpectedShape) -> Option<&str> {
    let pattern: &Regex = match shape {
        ExpectedShape::Integer => return None,
        ExpectedShape::JsonArray => &ARRAY_SPAN,
        ExpectedShape::JsonObject => &OBJECT_SPAN,
        ExpectedShape::JsonAny => &ANY_SPAN,
    };

    pattern.find(text).map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_trimmed() {
        assert_eq!(parse_integer("4"), Some(4));
        assert_eq!(parse_integer("  3\n"), Some(3));
        assert_eq!(parse_integer("+2"), Some(2));
    }

    #[test]
    fn test_integer_no_scraping() {
        assert_eq!(parse_integer("Answer: 4"), None);
        assert_eq!(parse_integer("4."), None);
        assert_eq!(parse_integer("four"), None);
        assert_eq!(parse_integer(""), None);
    }

    #[test]
    fn test_array_inside_prose() {
        let text = "Here is my ranking:\n{\"ranking\": [3, 1, 2]}\nThanks!";
        let parsed = parse(text, ExpectedShape::JsonArray);
        assert_eq!(
            parsed,
            Some(ParsedValue::Array(vec![json!(3), json!(1), json!(2)]))
        );
    }

    #[test]
    fn test_array_span_across_newlines() {
        let text = "```json\n[\n  1,\n  2\n]\n```";
        assert_eq!(
            extract_span(text, ExpectedShape::JsonArray),
            Some("[\n  1,\n  2\n]")
        );
    }

    #[test]
    fn test_greedy_span_covers_every_bracket() {
        let text = "first [1, 2] then [3]";
        assert_eq!(
            extract_span(text, ExpectedShape::JsonArray),
            Some("[1, 2] then [3]")
        );
        // The greedy span is not valid JSON and no later span is tried
        assert_eq!(parse(text, ExpectedShape::JsonArray), None);
    }

    #[test]
    fn test_object_with_markdown_fence() {
        let text = "```json\n{\"mapping\": [5, 4, 3, 2, 1]}\n```";
        let map = parse(text, ExpectedShape::JsonObject)
            .and_then(ParsedValue::into_object)
            .unwrap();
        assert_eq!(map["mapping"], json!([5, 4, 3, 2, 1]));
    }

    #[test]
    fn test_missing_span_is_absent() {
        assert_eq!(parse("no json here", ExpectedShape::JsonObject), None);
        assert_eq!(parse("no json here", ExpectedShape::JsonArray), None);
    }

    #[test]
    fn test_invalid_json_is_absent() {
        assert_eq!(parse("{mapping: [1,2]}", ExpectedShape::JsonObject), None);
        assert_eq!(parse("[1, 2,]", ExpectedShape::JsonArray), None);
    }

    #[test]
    fn test_any_takes_first_shape() {
        let array = parse("[{\"question\": \"a\"}]", ExpectedShape::JsonAny);
        assert!(matches!(array, Some(ParsedValue::Array(_))));

        let object = parse("{\"question\": \"a\"}", ExpectedShape::JsonAny);
        assert!(matches!(object, Some(ParsedValue::Object(_))));
    }

    #[test]
    fn test_integer_shape_has_no_span() {
        assert_eq!(extract_span("[1]", ExpectedShape::Integer), None);
        assert_eq!(
            parse("5", ExpectedShape::Integer).and_then(|v| v.as_integer()),
            Some(5)
        );
    }
}
