//! Column mapper: raw records -> canonical rows.
//!
//! Every output row has every canonical column. Unknown engine keys are
//! dropped, missing columns stay 0 (or empty for `HORA`), and cells that do
//! not read as numbers become 0 with a [`CoercionWarning`].

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::CoercionWarning;
use crate::model::{Column, Row};
use crate::parser::RawRecord;
use crate::schema::ExtractionSchema;

/// Mapper output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappedTable {
    pub rows: Vec<Row>,
    pub warnings: Vec<CoercionWarning>,
    /// Engine keys no alias matched, in first-seen order.
    pub dropped_keys: Vec<String>,
}

/// Map parsed records onto the canonical schema.
pub fn map_records(records: &[RawRecord], schema: &ExtractionSchema) -> MappedTable {
    let mut table = MappedTable { rows: Vec::with_capacity(records.len()), ..Default::default() };

    for (index, record) in records.iter().enumerate() {
        let mut row = Row::default();
        let mut assigned: Vec<Column> = Vec::new();

        match record {
            RawRecord::Positional(values) => {
                // Extra trailing values have no column and are ignored.
                for (position, value) in values.iter().enumerate() {
                    let Some(column) = schema.column_at(position) else { break };
                    assign(&mut row, column, value, index, &mut table.warnings);
                }
            }
            RawRecord::Keyed(fields) => {
                for (key, value) in fields {
                    match schema.resolve(key) {
                        Some(column) if !assigned.contains(&column) => {
                            assign(&mut row, column, value, index, &mut table.warnings);
                            assigned.push(column);
                        }
                        Some(_) => {
                            debug!(row = index, key = %key, "duplicate field for column, keeping first");
                        }
                        None => {
                            if !table.dropped_keys.iter().any(|k| k == key) {
                                table.dropped_keys.push(key.clone());
                            }
                        }
                    }
                }
            }
        }

        table.rows.push(row);
    }

    if !table.dropped_keys.is_empty() {
        debug!(keys = ?table.dropped_keys, "dropped unknown engine keys");
    }
    table
}

fn assign(
    row: &mut Row,
    column: Column,
    value: &Value,
    index: usize,
    warnings: &mut Vec<CoercionWarning>,
) {
    if column == Column::Hora {
        row.hora = text_value(value);
        return;
    }

    match coerce_number(value) {
        Some(n) => row.readings.set(column, n),
        None => {
            let warning = CoercionWarning { row: index, column, raw: text_value(value) };
            warn!("{}", warning);
            warnings.push(warning);
            row.readings.set(column, 0.0);
        }
    }
}

/// Read a JSON cell as a finite number.
///
/// `null` and blank strings are an absent reading and read as 0. Returns
/// `None` only for a present value that is not a usable number.
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Null => Some(0.0),
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => coerce_str(s),
        Value::Bool(_) | Value::Array(_) | Value::Object(_) => None,
    }
}

/// String form of [`coerce_number`].
pub fn coerce_str(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    trimmed.parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Text of a JSON scalar without JSON quoting.
fn text_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}
