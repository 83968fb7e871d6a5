use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Canonical columns
// ---------------------------------------------------------------------------

/// One canonical input column of a logsheet row.
///
/// `Hora` is the free-text time of day; every other column is numeric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Hora,
    SteamTotal,
    SteamTemp,
    SteamPressure,
    WaterTotal,
    WaterTemp,
    WaterPressure,
    BagasseInTotal,
    BagasseOutTotal,
    ChopperTotal,
}

impl Column {
    pub const ALL: [Column; 10] = [
        Column::Hora,
        Column::SteamTotal,
        Column::SteamTemp,
        Column::SteamPressure,
        Column::WaterTotal,
        Column::WaterTemp,
        Column::WaterPressure,
        Column::BagasseInTotal,
        Column::BagasseOutTotal,
        Column::ChopperTotal,
    ];

    /// Canonical key, also the spreadsheet header.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Hora => "HORA",
            Self::SteamTotal => "Totalizador de Vapor",
            Self::SteamTemp => "Temperatura de vapor",
            Self::SteamPressure => "Presión de Vapor",
            Self::WaterTotal => "Totalizador agua alimentación",
            Self::WaterTemp => "Temperatura agua alimentación",
            Self::WaterPressure => "Presión agua de alimentación",
            Self::BagasseInTotal => "Totalizador de báscula ingreso",
            Self::BagasseOutTotal => "Totalizador de báscula de retorno",
            Self::ChopperTotal => "Totalizador báscula de picadoras",
        }
    }

    /// Short code used by the compact extraction prompt.
    pub fn short_code(&self) -> &'static str {
        match self {
            Self::Hora => "hora",
            Self::SteamTotal => "vapor_tot",
            Self::SteamTemp => "vapor_temp",
            Self::SteamPressure => "vapor_pres",
            Self::WaterTotal => "agua_tot",
            Self::WaterTemp => "agua_temp",
            Self::WaterPressure => "agua_pres",
            Self::BagasseInTotal => "bagazo_in",
            Self::BagasseOutTotal => "bagazo_ret",
            Self::ChopperTotal => "picadoras",
        }
    }

    /// Stable identifier (matches the serde representation).
    pub fn id(&self) -> &'static str {
        match self {
            Self::Hora => "hora",
            Self::SteamTotal => "steam_total",
            Self::SteamTemp => "steam_temp",
            Self::SteamPressure => "steam_pressure",
            Self::WaterTotal => "water_total",
            Self::WaterTemp => "water_temp",
            Self::WaterPressure => "water_pressure",
            Self::BagasseInTotal => "bagasse_in_total",
            Self::BagasseOutTotal => "bagasse_out_total",
            Self::ChopperTotal => "chopper_total",
        }
    }

    /// Human description used in the extraction prompt.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Hora => "Hora de la lectura (Ej: 07:00)",
            Self::SteamTotal => "Totalizador de Vapor",
            Self::SteamTemp => "Temperatura de vapor",
            Self::SteamPressure => "Presión de Vapor",
            Self::WaterTotal => "Totalizador agua alimentación",
            Self::WaterTemp => "Temperatura agua alimentación",
            Self::WaterPressure => "Presión agua de alimentación",
            Self::BagasseInTotal => "Totalizador de báscula ingreso (Entrada Caña/Bagazo)",
            Self::BagasseOutTotal => "Totalizador de báscula de retorno (Si existe)",
            Self::ChopperTotal => "Totalizador báscula de picadoras (Si existe)",
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, Self::Hora)
    }

    /// The cumulative meter this column reads, if it is a tracked totalizer.
    pub fn totalizer(&self) -> Option<Totalizer> {
        match self {
            Self::SteamTotal => Some(Totalizer::Steam),
            Self::WaterTotal => Some(Totalizer::Water),
            Self::BagasseInTotal => Some(Totalizer::BagasseIn),
            Self::BagasseOutTotal => Some(Totalizer::BagasseOut),
            _ => None,
        }
    }

    /// Look up a column by canonical key, short code or id (exact match).
    pub fn from_name(name: &str) -> Option<Column> {
        Self::ALL
            .into_iter()
            .find(|c| c.key() == name || c.short_code() == name || c.id() == name)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// ---------------------------------------------------------------------------
// Totalizers
// ---------------------------------------------------------------------------

/// The four cumulative meters whose consumption is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Totalizer {
    Steam,
    Water,
    BagasseIn,
    BagasseOut,
}

impl Totalizer {
    pub const ALL: [Totalizer; 4] = [
        Totalizer::Steam,
        Totalizer::Water,
        Totalizer::BagasseIn,
        Totalizer::BagasseOut,
    ];

    pub fn reading_column(&self) -> Column {
        match self {
            Self::Steam => Column::SteamTotal,
            Self::Water => Column::WaterTotal,
            Self::BagasseIn => Column::BagasseInTotal,
            Self::BagasseOut => Column::BagasseOutTotal,
        }
    }

    /// Header of the derived consumption column.
    pub fn delta_header(&self) -> &'static str {
        match self {
            Self::Steam => "Tons. Vapor",
            Self::Water => "Tons. Agua",
            Self::BagasseIn => "Toneladas biomasa Alimentación",
            Self::BagasseOut => "Toneladas Biomasa retorno",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Steam => "steam",
            Self::Water => "water",
            Self::BagasseIn => "bagasse_in",
            Self::BagasseOut => "bagasse_out",
        }
    }
}

impl fmt::Display for Totalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Carry-in
// ---------------------------------------------------------------------------

/// Prior period closing readings, one per totalizer.
///
/// Only the first row's delta looks at these. A value of 0 (or anything not
/// strictly positive) means "no baseline".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarryIn {
    pub steam: f64,
    pub water: f64,
    pub bagasse_in: f64,
    pub bagasse_out: f64,
}

impl CarryIn {
    pub fn get(&self, totalizer: Totalizer) -> f64 {
        match totalizer {
            Totalizer::Steam => self.steam,
            Totalizer::Water => self.water,
            Totalizer::BagasseIn => self.bagasse_in,
            Totalizer::BagasseOut => self.bagasse_out,
        }
    }

    pub fn set(&mut self, totalizer: Totalizer, value: f64) {
        match totalizer {
            Totalizer::Steam => self.steam = value,
            Totalizer::Water => self.water = value,
            Totalizer::BagasseIn => self.bagasse_in = value,
            Totalizer::BagasseOut => self.bagasse_out = value,
        }
    }

    /// The baseline for `totalizer`, if one was supplied.
    pub fn baseline(&self, totalizer: Totalizer) -> Option<f64> {
        let value = self.get(totalizer);
        (value.is_finite() && value > 0.0).then_some(value)
    }
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// Numeric readings of one row. Unreadable cells are already 0 here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Readings {
    pub steam_total: f64,
    pub steam_temp: f64,
    pub steam_pressure: f64,
    pub water_total: f64,
    pub water_temp: f64,
    pub water_pressure: f64,
    pub bagasse_in_total: f64,
    pub bagasse_out_total: f64,
    pub chopper_total: f64,
}

impl Readings {
    /// Value for a numeric column; `None` for `Hora`.
    pub fn get(&self, column: Column) -> Option<f64> {
        match column {
            Column::Hora => None,
            Column::SteamTotal => Some(self.steam_total),
            Column::SteamTemp => Some(self.steam_temp),
            Column::SteamPressure => Some(self.steam_pressure),
            Column::WaterTotal => Some(self.water_total),
            Column::WaterTemp => Some(self.water_temp),
            Column::WaterPressure => Some(self.water_pressure),
            Column::BagasseInTotal => Some(self.bagasse_in_total),
            Column::BagasseOutTotal => Some(self.bagasse_out_total),
            Column::ChopperTotal => Some(self.chopper_total),
        }
    }

    /// Set a numeric column. Setting `Hora` is a no-op.
    pub fn set(&mut self, column: Column, value: f64) {
        match column {
            Column::Hora => {}
            Column::SteamTotal => self.steam_total = value,
            Column::SteamTemp => self.steam_temp = value,
            Column::SteamPressure => self.steam_pressure = value,
            Column::WaterTotal => self.water_total = value,
            Column::WaterTemp => self.water_temp = value,
            Column::WaterPressure => self.water_pressure = value,
            Column::BagasseInTotal => self.bagasse_in_total = value,
            Column::BagasseOutTotal => self.bagasse_out_total = value,
            Column::ChopperTotal => self.chopper_total = value,
        }
    }

    pub fn totalizer(&self, totalizer: Totalizer) -> f64 {
        self.get(totalizer.reading_column()).unwrap_or(0.0)
    }
}

/// Derived per-row consumption. `None` means "no prior reading".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Deltas {
    pub steam: Option<f64>,
    pub water: Option<f64>,
    pub bagasse_in: Option<f64>,
    pub bagasse_out: Option<f64>,
}

impl Deltas {
    pub fn get(&self, totalizer: Totalizer) -> Option<f64> {
        match totalizer {
            Totalizer::Steam => self.steam,
            Totalizer::Water => self.water,
            Totalizer::BagasseIn => self.bagasse_in,
            Totalizer::BagasseOut => self.bagasse_out,
        }
    }

    pub fn set(&mut self, totalizer: Totalizer, value: Option<f64>) {
        match totalizer {
            Totalizer::Steam => self.steam = value,
            Totalizer::Water => self.water = value,
            Totalizer::BagasseIn => self.bagasse_in = value,
            Totalizer::BagasseOut => self.bagasse_out = value,
        }
    }
}

/// One time-stamped logsheet entry. Position in the table is its identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Time of day as read from the sheet; not parsed.
    pub hora: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub readings: Readings,
    #[serde(default)]
    pub deltas: Deltas,
}

impl Row {
    pub fn new(hora: impl Into<String>) -> Self {
        Self { hora: hora.into(), ..Self::default() }
    }

    pub fn with_reading(mut self, column: Column, value: f64) -> Self {
        self.readings.set(column, value);
        self
    }

    /// True when every non-derived field matches.
    pub fn same_inputs(&self, other: &Row) -> bool {
        self.hora == other.hora && self.date == other.date && self.readings == other.readings
    }

    /// Value of one table cell.
    pub fn cell(&self, column: TableColumn) -> CellValue {
        match column {
            TableColumn::Fecha => self.date.map(CellValue::Date).unwrap_or(CellValue::Empty),
            TableColumn::Input(Column::Hora) => {
                if self.hora.is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::Text(self.hora.clone())
                }
            }
            TableColumn::Input(col) => {
                self.readings.get(col).map(CellValue::Number).unwrap_or(CellValue::Empty)
            }
            TableColumn::Delta(t) => {
                self.deltas.get(t).map(CellValue::Number).unwrap_or(CellValue::Empty)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Table layout
// ---------------------------------------------------------------------------

/// A column of the rendered session table (inputs interleaved with deltas).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableColumn {
    Fecha,
    Input(Column),
    Delta(Totalizer),
}

impl TableColumn {
    pub fn header(&self) -> &'static str {
        match self {
            Self::Fecha => "FECHA",
            Self::Input(col) => col.key(),
            Self::Delta(t) => t.delta_header(),
        }
    }

    pub fn is_derived(&self) -> bool {
        matches!(self, Self::Delta(_))
    }

    pub fn from_header(header: &str) -> Option<TableColumn> {
        let header = header.trim();
        TABLE_COLUMNS.iter().copied().find(|c| c.header() == header)
    }
}

/// Canonical order of the session table.
pub const TABLE_COLUMNS: [TableColumn; 15] = [
    TableColumn::Fecha,
    TableColumn::Input(Column::Hora),
    TableColumn::Input(Column::SteamTotal),
    TableColumn::Delta(Totalizer::Steam),
    TableColumn::Input(Column::SteamTemp),
    TableColumn::Input(Column::SteamPressure),
    TableColumn::Input(Column::WaterTotal),
    TableColumn::Delta(Totalizer::Water),
    TableColumn::Input(Column::WaterTemp),
    TableColumn::Input(Column::WaterPressure),
    TableColumn::Input(Column::BagasseInTotal),
    TableColumn::Delta(Totalizer::BagasseIn),
    TableColumn::Input(Column::BagasseOutTotal),
    TableColumn::Delta(Totalizer::BagasseOut),
    TableColumn::Input(Column::ChopperTotal),
];

/// Columns written to the spreadsheet export. The chopper placeholder is
/// kept in the session but not exported.
pub const EXPORT_COLUMNS: [TableColumn; 14] = [
    TableColumn::Fecha,
    TableColumn::Input(Column::Hora),
    TableColumn::Input(Column::SteamTotal),
    TableColumn::Delta(Totalizer::Steam),
    TableColumn::Input(Column::SteamTemp),
    TableColumn::Input(Column::SteamPressure),
    TableColumn::Input(Column::WaterTotal),
    TableColumn::Delta(Totalizer::Water),
    TableColumn::Input(Column::WaterTemp),
    TableColumn::Input(Column::WaterPressure),
    TableColumn::Input(Column::BagasseInTotal),
    TableColumn::Delta(Totalizer::BagasseIn),
    TableColumn::Input(Column::BagasseOutTotal),
    TableColumn::Delta(Totalizer::BagasseOut),
];

/// A rendered table cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl CellValue {
    /// Plain-text rendering used by CSV and terminal output.
    pub fn display(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }
}

/// Shortest decimal rendering without float noise (`52863.5`, `-10`, `0.25`).
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        let s = format!("{:.6}", n);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_lookup_by_any_name() {
        assert_eq!(Column::from_name("HORA"), Some(Column::Hora));
        assert_eq!(Column::from_name("vapor_tot"), Some(Column::SteamTotal));
        assert_eq!(Column::from_name("water_pressure"), Some(Column::WaterPressure));
        assert_eq!(Column::from_name("Totalizador de báscula de retorno"), Some(Column::BagasseOutTotal));
        assert_eq!(Column::from_name("caudal"), None);
    }

    #[test]
    fn totalizers_map_to_reading_columns() {
        for t in Totalizer::ALL {
            assert_eq!(t.reading_column().totalizer(), Some(t));
        }
        assert_eq!(Column::SteamTemp.totalizer(), None);
        assert_eq!(Column::ChopperTotal.totalizer(), None);
    }

    #[test]
    fn carry_in_baseline_requires_positive_value() {
        let carry = CarryIn { steam: 80.0, water: 0.0, bagasse_in: -5.0, bagasse_out: f64::NAN };
        assert_eq!(carry.baseline(Totalizer::Steam), Some(80.0));
        assert_eq!(carry.baseline(Totalizer::Water), None);
        assert_eq!(carry.baseline(Totalizer::BagasseIn), None);
        assert_eq!(carry.baseline(Totalizer::BagasseOut), None);
    }

    #[test]
    fn same_inputs_ignores_deltas() {
        let a = Row::new("07:00").with_reading(Column::SteamTotal, 100.0);
        let mut b = a.clone();
        b.deltas.steam = Some(20.0);
        assert!(a.same_inputs(&b));

        b.readings.steam_total = 101.0;
        assert!(!a.same_inputs(&b));
    }

    #[test]
    fn table_layout_interleaves_deltas() {
        let headers: Vec<&str> = EXPORT_COLUMNS.iter().map(|c| c.header()).collect();
        assert_eq!(headers[0], "FECHA");
        assert_eq!(headers[1], "HORA");
        assert_eq!(headers[2], "Totalizador de Vapor");
        assert_eq!(headers[3], "Tons. Vapor");
        assert_eq!(headers[13], "Toneladas Biomasa retorno");
        assert_eq!(&TABLE_COLUMNS[..14], &EXPORT_COLUMNS[..]);
    }

    #[test]
    fn header_lookup_round_trips() {
        for col in TABLE_COLUMNS {
            assert_eq!(TableColumn::from_header(col.header()), Some(col));
        }
        assert_eq!(TableColumn::from_header(" Tons. Agua "), Some(TableColumn::Delta(Totalizer::Water)));
    }

    #[test]
    fn cells_render_missing_delta_as_empty() {
        let mut row = Row::new("08:00").with_reading(Column::WaterTotal, 55320.7);
        assert_eq!(row.cell(TableColumn::Delta(Totalizer::Water)), CellValue::Empty);
        row.deltas.water = Some(-10.0);
        assert_eq!(row.cell(TableColumn::Delta(Totalizer::Water)), CellValue::Number(-10.0));
        assert_eq!(row.cell(TableColumn::Fecha), CellValue::Empty);
        assert_eq!(row.cell(TableColumn::Input(Column::Hora)).display(), "08:00");
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(52863.5), "52863.5");
        assert_eq!(format_number(-10.0), "-10");
        assert_eq!(format_number(0.1 + 0.2), "0.3");
        assert_eq!(format_number(0.0), "0");
    }
}
