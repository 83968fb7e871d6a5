// CSV dump/apply of the session table (the bulk-edit surface)
//
// `write_table` emits every table column, derived ones included for
// reference. `read_table` locates columns by header and ignores derived
// and unknown columns; the caller recomputes deltas from what it returns.

use std::io::Read;
use std::path::{Path, PathBuf};

use bitacora_engine::mapper::coerce_str;
use bitacora_engine::model::{Column, Row, TableColumn, TABLE_COLUMNS};
use bitacora_engine::CoercionWarning;
use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum TableReadError {
    #[error("cannot read '{}': {source}", .path.display())]
    Io { path: PathBuf, source: std::io::Error },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("file is empty, expected a header row")]
    MissingHeader,
    #[error("no editable columns found in header (expected e.g. 'HORA', 'Totalizador de Vapor')")]
    NoInputColumns,
    #[error("line {line}: cannot read '{value}' as a date (use YYYY-MM-DD or DD/MM/YYYY)")]
    InvalidDate { line: usize, value: String },
}

/// Rows read from an edited CSV.
#[derive(Debug, Default)]
pub struct TableReadResult {
    pub rows: Vec<Row>,
    pub warnings: Vec<CoercionWarning>,
    /// Header cells that were not used (derived or unknown columns).
    pub ignored_columns: Vec<String>,
}

// ---------------------------------------------------------------------------
// Write
// ---------------------------------------------------------------------------

pub fn write_table(rows: &[Row], path: &Path) -> Result<(), csv::Error> {
    let mut writer = csv::WriterBuilder::new().from_path(path)?;
    write_records(rows, &mut writer)?;
    writer.flush()?;
    debug!(path = %path.display(), rows = rows.len(), "wrote table csv");
    Ok(())
}

pub fn table_to_string(rows: &[Row]) -> Result<String, csv::Error> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    write_records(rows, &mut writer)?;
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn write_records<W: std::io::Write>(rows: &[Row], writer: &mut csv::Writer<W>) -> Result<(), csv::Error> {
    writer.write_record(TABLE_COLUMNS.iter().map(|c| c.header()))?;
    for row in rows {
        writer.write_record(TABLE_COLUMNS.iter().map(|c| row.cell(*c).display()))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

pub fn read_table(path: &Path) -> Result<TableReadResult, TableReadError> {
    let content = read_file_as_utf8(path)?;
    read_table_from_str(&content)
}

/// Read file and convert to UTF-8 if needed (spreadsheet apps on Windows
/// save CSV as Windows-1252).
pub fn read_file_as_utf8(path: &Path) -> Result<String, TableReadError> {
    let mut file =
        std::fs::File::open(path).map_err(|source| TableReadError::Io { path: path.to_path_buf(), source })?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|source| TableReadError::Io { path: path.to_path_buf(), source })?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

pub fn read_table_from_str(content: &str) -> Result<TableReadResult, TableReadError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let delimiter = sniff_delimiter(content);
    // Locales that save with `;` write decimals with `,`.
    let decimal_comma = delimiter == b';';

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = reader.records();
    let header = match records.next() {
        Some(record) => record?,
        None => return Err(TableReadError::MissingHeader),
    };

    let mut result = TableReadResult::default();
    let mut layout: Vec<(usize, TableColumn)> = Vec::new();
    for (idx, name) in header.iter().enumerate() {
        match locate_column(name) {
            Some(column) if !column.is_derived() && !layout.iter().any(|(_, c)| *c == column) => {
                layout.push((idx, column));
            }
            _ => {
                if !name.trim().is_empty() {
                    result.ignored_columns.push(name.trim().to_string());
                }
            }
        }
    }
    if !layout.iter().any(|(_, c)| matches!(c, TableColumn::Input(_))) {
        return Err(TableReadError::NoInputColumns);
    }

    for (line_idx, record) in records.enumerate() {
        let record = record?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        let line = line_idx + 2;
        let row_idx = result.rows.len();
        let mut row = Row::default();

        for (field_idx, column) in &layout {
            let raw = record.get(*field_idx).unwrap_or("").trim();
            match column {
                TableColumn::Fecha => row.date = parse_date(raw, line)?,
                TableColumn::Input(Column::Hora) => row.hora = raw.to_string(),
                TableColumn::Input(col) => {
                    let value = coerce_cell(raw, decimal_comma).unwrap_or_else(|| {
                        let warning = CoercionWarning { row: row_idx, column: *col, raw: raw.to_string() };
                        warn!("{}", warning);
                        result.warnings.push(warning);
                        0.0
                    });
                    row.readings.set(*col, value);
                }
                TableColumn::Delta(_) => {}
            }
        }
        result.rows.push(row);
    }

    debug!(
        rows = result.rows.len(),
        ignored = ?result.ignored_columns,
        delimiter = %(delimiter as char),
        "read table csv"
    );
    Ok(result)
}

fn locate_column(header: &str) -> Option<TableColumn> {
    TableColumn::from_header(header).or_else(|| Column::from_name(header.trim()).map(TableColumn::Input))
}

/// In decimal-comma files `.` groups thousands: `52.863,5` and `1.234` read
/// as 52863.5 and 1234. A lone `.` outside a thousands pattern (`84.5`) is
/// still a decimal point.
fn coerce_cell(raw: &str, decimal_comma: bool) -> Option<f64> {
    if !decimal_comma {
        return coerce_str(raw);
    }
    let trimmed = raw.trim();
    if trimmed.contains(',') {
        coerce_str(&trimmed.replace('.', "").replace(',', "."))
    } else if is_thousands_grouped(trimmed) {
        coerce_str(&trimmed.replace('.', ""))
    } else {
        coerce_str(trimmed)
    }
}

/// `1.234`, `-12.345.678`: a leading group of 1-3 digits (no leading zero)
/// followed by one or more `.ddd` groups.
fn is_thousands_grouped(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    let mut groups = digits.split('.');
    let head_ok = groups
        .next()
        .is_some_and(|g| (1..=3).contains(&g.len()) && !g.starts_with('0') && g.bytes().all(|b| b.is_ascii_digit()));
    let mut tail = 0;
    let tail_ok = groups.all(|g| {
        tail += 1;
        g.len() == 3 && g.bytes().all(|b| b.is_ascii_digit())
    });
    head_ok && tail_ok && tail > 0
}

fn parse_date(raw: &str, line: usize) -> Result<Option<NaiveDate>, TableReadError> {
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d/%m/%Y"))
        .map(Some)
        .map_err(|_| TableReadError::InvalidDate { line, value: raw.to_string() })
}

/// Pick the delimiter that yields the most consistent multi-field split over
/// the first lines. Comma wins ties.
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b',', b';', b'\t'];
    let sample: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).take(10).collect();

    let mut best = b',';
    let mut best_score = 0usize;

    for &delim in candidates {
        let counts: Vec<usize> = sample
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        let Some(&target) = counts.first() else { continue };
        if target <= 1 {
            continue;
        }
        let score = counts.iter().filter(|&&c| c == target).count() * target;
        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitacora_engine::delta;
    use bitacora_engine::model::CarryIn;
    use std::fs;
    use tempfile::tempdir;

    fn sample() -> Vec<Row> {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let mut rows = vec![
            Row::new("07:00").with_reading(Column::SteamTotal, 100.0),
            Row::new("08:00").with_reading(Column::SteamTotal, 150.5),
        ];
        for row in &mut rows {
            row.date = Some(date);
        }
        delta::compute(&rows, &CarryIn::default())
    }

    #[test]
    fn test_write_table_layout() {
        let text = table_to_string(&sample()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("FECHA,HORA,Totalizador de Vapor,Tons. Vapor,"));
        assert!(lines[0].ends_with("Totalizador báscula de picadoras"));
        // No prior reading: blank delta, not 0.
        assert!(lines[1].starts_with("2024-03-05,07:00,100,,"));
        assert!(lines[2].starts_with("2024-03-05,08:00,150.5,50.5,"));
    }

    #[test]
    fn test_dump_then_apply_preserves_inputs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tabla.csv");
        let rows = sample();
        write_table(&rows, &path).unwrap();

        let read = read_table(&path).unwrap();
        assert!(read.warnings.is_empty());
        assert_eq!(read.rows.len(), 2);
        for (a, b) in rows.iter().zip(&read.rows) {
            assert!(a.same_inputs(b));
        }
        assert!(read.ignored_columns.contains(&"Tons. Vapor".to_string()));
    }

    #[test]
    fn test_derived_columns_are_ignored() {
        let input = "HORA,Totalizador de Vapor,Tons. Vapor\n07:00,100,999\n08:00,120,-1\n";
        let read = read_table_from_str(input).unwrap();
        assert_eq!(read.rows[1].readings.steam_total, 120.0);
        assert_eq!(read.rows[1].deltas.steam, None);
        assert_eq!(read.ignored_columns, vec!["Tons. Vapor".to_string()]);
    }

    #[test]
    fn test_unparseable_number_becomes_zero_with_warning() {
        let input = "HORA,vapor_tot,agua_tot\n07:00,abc,\n";
        let read = read_table_from_str(input).unwrap();
        assert_eq!(read.rows[0].readings.steam_total, 0.0);
        assert_eq!(read.rows[0].readings.water_total, 0.0);
        assert_eq!(read.warnings.len(), 1);
        assert_eq!(read.warnings[0].column, Column::SteamTotal);
        assert_eq!(read.warnings[0].raw, "abc");
    }

    #[test]
    fn test_semicolon_with_decimal_comma() {
        let input = "FECHA;HORA;Totalizador de Vapor\n05/03/2024;07:00;52863,5\n";
        let read = read_table_from_str(input).unwrap();
        assert_eq!(read.rows[0].readings.steam_total, 52863.5);
        assert_eq!(read.rows[0].date, NaiveDate::from_ymd_opt(2024, 3, 5));
    }

    #[test]
    fn test_semicolon_thousands_separators() {
        let input = "HORA;Totalizador de Vapor;Totalizador agua alimentación;Presión de Vapor;Temperatura de vapor\n\
                     07:00;52.863,5;1.234;84.5;0.125\n\
                     08:00;1.234.567,25;-12.345;;\n";
        let read = read_table_from_str(input).unwrap();
        assert!(read.warnings.is_empty(), "{:?}", read.warnings);
        assert_eq!(read.rows[0].readings.steam_total, 52863.5);
        assert_eq!(read.rows[0].readings.water_total, 1234.0);
        assert_eq!(read.rows[0].readings.steam_pressure, 84.5);
        assert_eq!(read.rows[0].readings.steam_temp, 0.125);
        assert_eq!(read.rows[1].readings.steam_total, 1234567.25);
        assert_eq!(read.rows[1].readings.water_total, -12345.0);
    }

    #[test]
    fn test_comma_file_keeps_dot_decimals() {
        let read = read_table_from_str("HORA,Totalizador de Vapor\n07:00,1.234\n").unwrap();
        assert_eq!(read.rows[0].readings.steam_total, 1.234);
    }

    #[test]
    fn test_thousands_pattern() {
        assert!(is_thousands_grouped("1.234"));
        assert!(is_thousands_grouped("-12.345.678"));
        assert!(!is_thousands_grouped("1234"));
        assert!(!is_thousands_grouped("84.5"));
        assert!(!is_thousands_grouped("0.125"));
        assert!(!is_thousands_grouped("1.23"));
        assert!(!is_thousands_grouped("1234.567"));
    }

    #[test]
    fn test_windows_1252_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin.csv");
        let (encoded, _, _) = encoding_rs::WINDOWS_1252.encode("HORA,Presión de Vapor\n07:00,84\n");
        fs::write(&path, &encoded).unwrap();

        let read = read_table(&path).unwrap();
        assert_eq!(read.rows[0].readings.steam_pressure, 84.0);
    }

    #[test]
    fn test_rows_added_and_blank_lines_skipped() {
        let input = "HORA,Totalizador de Vapor\n07:00,1\n\n,\n08:00,2\n09:00,3\n";
        let read = read_table_from_str(input).unwrap();
        let horas: Vec<&str> = read.rows.iter().map(|r| r.hora.as_str()).collect();
        assert_eq!(horas, vec!["07:00", "08:00", "09:00"]);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(read_table_from_str(""), Err(TableReadError::MissingHeader)));
        assert!(matches!(
            read_table_from_str("Tons. Vapor,nota\n1,2\n"),
            Err(TableReadError::NoInputColumns)
        ));
        let err = read_table_from_str("FECHA,HORA\nmarzo,07:00\n").unwrap_err();
        assert!(matches!(err, TableReadError::InvalidDate { line: 2, .. }));

        let dir = tempdir().unwrap();
        assert!(matches!(read_table(&dir.path().join("missing.csv")), Err(TableReadError::Io { .. })));
    }

    #[test]
    fn test_sniff_delimiter() {
        assert_eq!(sniff_delimiter("a,b,c\n1,2,3\n"), b',');
        assert_eq!(sniff_delimiter("a;b;c\n1;2,5;3\n"), b';');
        assert_eq!(sniff_delimiter("a\tb\n1\t2\n"), b'\t');
        assert_eq!(sniff_delimiter(""), b',');
    }
}
