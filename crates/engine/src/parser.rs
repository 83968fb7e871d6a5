//! Record parser: untrusted engine text -> raw row records.
//!
//! The engine is asked for a bare JSON array but routinely wraps it in
//! markdown fences or prose. The parse candidate is the span from the first
//! `[` to the last `]`. Output with two separate arrays, or a truncated
//! array, therefore fails to parse instead of being guessed at.

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{ParseError, ParseErrorKind};

/// One row as the engine produced it, before column mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRecord {
    /// `{"HORA": "07:00", "vapor_tot": 100}`
    Keyed(Map<String, Value>),
    /// `["07:00", 100, 524]`
    Positional(Vec<Value>),
}

impl RawRecord {
    pub fn len(&self) -> usize {
        match self {
            Self::Keyed(map) => map.len(),
            Self::Positional(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The `[` .. `]` span treated as the sole parse candidate.
pub fn locate_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Parse the engine's raw response into row records.
///
/// Never panics on bad input: every failure comes back as a [`ParseError`]
/// holding the original text. An empty array parses to an empty vector.
pub fn parse_response(text: &str) -> Result<Vec<RawRecord>, ParseError> {
    let candidate =
        locate_array(text).ok_or_else(|| ParseError::new(ParseErrorKind::NoArray, text))?;

    let elements: Vec<Value> = serde_json::from_str(candidate)
        .map_err(|e| ParseError::new(ParseErrorKind::Malformed(e.to_string()), text))?;

    let mut records = Vec::with_capacity(elements.len());
    for (index, element) in elements.into_iter().enumerate() {
        match element {
            Value::Object(map) => records.push(RawRecord::Keyed(map)),
            Value::Array(values) => records.push(RawRecord::Positional(values)),
            _ => {
                return Err(ParseError::new(
                    ParseErrorKind::UnexpectedElement { index },
                    text,
                ))
            }
        }
    }

    debug!(records = records.len(), candidate_bytes = candidate.len(), "parsed engine response");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BARE_POSITIONAL: &str = r#"[["07:00", 52863.5, 524, 84], ["08:00", 52901.0, 522, 85]]"#;

    #[test]
    fn parse_keyed_rows() {
        let text = r#"[{"HORA":"07:00","vapor_tot":100},{"HORA":"08:00","vapor_tot":150}]"#;
        let records = parse_response(text).unwrap();
        assert_eq!(records.len(), 2);
        match &records[1] {
            RawRecord::Keyed(map) => {
                assert_eq!(map["HORA"], Value::from("08:00"));
                assert_eq!(map["vapor_tot"], Value::from(150));
            }
            other => panic!("expected keyed record, got {:?}", other),
        }
    }

    #[test]
    fn fenced_prose_parses_like_bare_array() {
        let wrapped = format!("Here is your data:\n```json\n{}\n```", BARE_POSITIONAL);
        let bare = parse_response(BARE_POSITIONAL).unwrap();
        let fenced = parse_response(&wrapped).unwrap();
        assert_eq!(bare, fenced);
        assert!(matches!(fenced[0], RawRecord::Positional(ref v) if v.len() == 4));
    }

    #[test]
    fn trailing_prose_is_ignored() {
        let text = "```\n[{\"HORA\": \"07:00\"}]\n```\nEspero que sea útil.";
        assert_eq!(parse_response(text).unwrap().len(), 1);
    }

    #[test]
    fn no_brackets_is_parse_error_with_raw_text() {
        let text = "No pude leer la imagen.";
        let err = parse_response(text).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::NoArray);
        assert_eq!(err.raw, text);
    }

    #[test]
    fn reversed_brackets_is_no_array() {
        let err = parse_response("] nothing here [").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::NoArray);
    }

    #[test]
    fn truncated_output_is_malformed() {
        let text = r#"[{"HORA": "07:00"}, {"HORA": "08:00", "vapor_tot": 15"#;
        // Last `]` is missing entirely; no candidate span closes.
        let err = parse_response(text).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::NoArray);

        let text = r#"[{"HORA": "07:00", "lecturas": [1, 2]}, {"HORA": "08:00""#;
        let err = parse_response(text).unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::Malformed(_)));
        assert_eq!(err.raw, text);
    }

    #[test]
    fn two_arrays_do_not_parse() {
        let text = "Turno A: [[\"07:00\", 1]]\nTurno B: [[\"15:00\", 2]]";
        let err = parse_response(text).unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::Malformed(_)));
    }

    #[test]
    fn scalar_elements_are_rejected() {
        let err = parse_response("[1, 2, 3]").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnexpectedElement { index: 0 });

        let err = parse_response(r#"[{"HORA": "07:00"}, "08:00"]"#).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnexpectedElement { index: 1 });
    }

    #[test]
    fn empty_array_is_ok_and_empty() {
        assert!(parse_response("```json\n[]\n```").unwrap().is_empty());
    }

    #[test]
    fn locate_array_span() {
        assert_eq!(locate_array("x [1] y"), Some("[1]"));
        assert_eq!(locate_array("[[1],[2]] tail"), Some("[[1],[2]]"));
        assert_eq!(locate_array("nada"), None);
    }
}
