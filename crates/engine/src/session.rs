//! Row Store: the authoritative table of one editing session.
//!
//! The store is an explicit value owned by the caller. Every mutation of
//! inputs replaces the table wholesale with a full delta recompute.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::delta;
use crate::model::{CarryIn, Row};

/// The table plus the context its deltas were computed against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionTable {
    pub rows: Vec<Row>,
    #[serde(default)]
    pub carry_in: CarryIn,
    #[serde(default)]
    pub report_date: Option<NaiveDate>,
    /// Where the rows came from (image path, response file), informational.
    #[serde(default)]
    pub source: Option<String>,
}

impl SessionTable {
    /// Build a table and compute its deltas.
    pub fn new(rows: Vec<Row>, carry_in: CarryIn) -> Self {
        let mut table = Self { rows, carry_in, report_date: None, source: None };
        table.recompute();
        table
    }

    pub fn recompute(&mut self) {
        delta::recompute_in_place(&mut self.rows, &self.carry_in);
    }

    pub fn last_row(&self) -> Option<&Row> {
        self.rows.last()
    }
}

/// Session state. Empty until the first successful ingest or replace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowStore {
    table: Option<SessionTable>,
}

impl RowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_table(table: SessionTable) -> Self {
        let mut table = table;
        table.recompute();
        Self { table: Some(table) }
    }

    pub fn table(&self) -> Option<&SessionTable> {
        self.table.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_none()
    }

    /// Current rows; empty when no table exists.
    pub fn get(&self) -> &[Row] {
        self.table.as_ref().map(|t| t.rows.as_slice()).unwrap_or(&[])
    }

    /// Carry-in of the current table, or zero when none exists.
    pub fn carry_in(&self) -> CarryIn {
        self.table.as_ref().map(|t| t.carry_in).unwrap_or_default()
    }

    /// Install a freshly ingested table, discarding the previous one.
    pub fn install(&mut self, table: SessionTable) {
        let mut table = table;
        table.recompute();
        info!(rows = table.rows.len(), source = ?table.source, "session table installed");
        self.table = Some(table);
    }

    /// Replace the rows (a bulk edit). Deltas are always recomputed from the
    /// given inputs against the current carry-in; any deltas on `rows` are
    /// ignored. Creates the table when none exists.
    pub fn replace(&mut self, rows: Vec<Row>) {
        let changed = self.inputs_changed(&rows);
        let table = self.table.get_or_insert_with(SessionTable::default);
        table.rows = rows;
        table.recompute();
        info!(rows = table.rows.len(), inputs_changed = changed, "session table replaced");
    }

    /// Set the carry-in and recompute. Returns true when it differed.
    pub fn set_carry_in(&mut self, carry_in: CarryIn) -> bool {
        let table = self.table.get_or_insert_with(SessionTable::default);
        let changed = table.carry_in != carry_in;
        table.carry_in = carry_in;
        table.recompute();
        debug!(?carry_in, changed, "carry-in updated");
        changed
    }

    /// Value comparison of the input fields of `rows` against the stored
    /// table. Derived deltas are not compared.
    pub fn inputs_changed(&self, rows: &[Row]) -> bool {
        let current = self.get();
        current.len() != rows.len() || current.iter().zip(rows).any(|(a, b)| !a.same_inputs(b))
    }

    /// Discard the table. The next ingest starts from scratch.
    pub fn reset(&mut self) {
        if self.table.take().is_some() {
            info!("session reset");
        }
    }
}
