//! Response text -> fully computed session table, all or nothing.

use chrono::NaiveDate;
use tracing::debug;

use crate::delta::{self, DeltaAnomaly};
use crate::error::{CoercionWarning, ParseError, ParseErrorKind};
use crate::mapper;
use crate::model::CarryIn;
use crate::parser;
use crate::schema::ExtractionSchema;
use crate::session::SessionTable;

/// Context applied to an ingested response.
#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    pub carry_in: CarryIn,
    /// Stamped on every row as `FECHA`.
    pub report_date: Option<NaiveDate>,
    pub source: Option<String>,
}

/// A table ready to be installed in the Row Store, plus what the reviewer
/// should look at.
#[derive(Debug, Clone)]
pub struct Ingested {
    pub table: SessionTable,
    pub warnings: Vec<CoercionWarning>,
    pub dropped_keys: Vec<String>,
    pub anomalies: Vec<DeltaAnomaly>,
}

/// Parse, map, date-stamp and delta-compute one engine response.
///
/// Returns a value only when every stage succeeded; callers install the
/// table or keep the previous one. An empty array is an error.
pub fn ingest(
    raw: &str,
    schema: &ExtractionSchema,
    options: &IngestOptions,
) -> Result<Ingested, ParseError> {
    let records = parser::parse_response(raw)?;
    if records.is_empty() {
        return Err(ParseError::new(ParseErrorKind::Empty, raw));
    }

    let mapped = mapper::map_records(&records, schema);
    let mut rows = mapped.rows;
    for row in &mut rows {
        row.date = options.report_date;
    }

    let mut table = SessionTable::new(rows, options.carry_in);
    table.report_date = options.report_date;
    table.source = options.source.clone();

    let anomalies = delta::negative_deltas(&table.rows);
    debug!(
        rows = table.rows.len(),
        warnings = mapped.warnings.len(),
        anomalies = anomalies.len(),
        schema = %schema.name,
        "ingested response"
    );

    Ok(Ingested { table, warnings: mapped.warnings, dropped_keys: mapped.dropped_keys, anomalies })
}
