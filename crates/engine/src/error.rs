use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::model::Column;

/// The extraction engine's response could not be recovered as a row array.
///
/// Always carries the untouched response text so the operator can see what
/// the engine actually said.
#[derive(Debug, Clone, Error)]
#[error("{kind}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub raw: String,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, raw: impl Into<String>) -> Self {
        Self { kind, raw: raw.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    /// No `[` ... `]` span in the response.
    #[error("no JSON array found in engine response")]
    NoArray,
    /// The bracketed span is not valid JSON.
    #[error("malformed JSON array: {0}")]
    Malformed(String),
    /// An array element is a scalar instead of an object or a row array.
    #[error("element {index} is neither an object nor an array")]
    UnexpectedElement { index: usize },
    /// The array parsed but holds no rows.
    #[error("engine response contained an empty array")]
    Empty,
}

/// Extraction schema descriptor errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// TOML parse / deserialization error.
    #[error("schema parse error: {0}")]
    Parse(String),
    /// Descriptor is well-formed but inconsistent (duplicates, too many columns...).
    #[error("schema validation error: {0}")]
    Validation(String),
    /// A column or alias target that names no canonical column.
    #[error("unknown column '{0}'")]
    UnknownColumn(String),
    #[error("unknown schema preset '{0}' (expected named, short_codes or positional)")]
    UnknownPreset(String),
}

/// A cell that failed numeric coercion and was defaulted to 0.
///
/// Non-fatal: the row is kept and the value is visible to the reviewer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoercionWarning {
    pub row: usize,
    pub column: Column,
    pub raw: String,
}

impl fmt::Display for CoercionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "row {}, '{}': cannot read '{}' as a number, using 0",
            self.row + 1,
            self.column.key(),
            self.raw
        )
    }
}
