// Excel export of the session table (xlsx only)
//
// Export is a presentation snapshot for the plant's master records: one
// worksheet, fixed column order, Spanish headers. Nothing is read back.

use std::path::{Path, PathBuf};
use std::time::Instant;

use bitacora_engine::model::{CellValue, Row, TableColumn, EXPORT_COLUMNS};
use chrono::{Datelike, NaiveDate};
use rust_xlsxwriter::{
    Color, ExcelDateTime, Format, FormatAlign, FormatBorder, Workbook as XlsxWorkbook, Worksheet,
    XlsxError,
};
use thiserror::Error;
use tracing::{debug, info};

/// Default worksheet name.
pub const DEFAULT_SHEET_NAME: &str = "Bitacora";
/// Default file name when the table has no report date.
pub const FALLBACK_FILE_NAME: &str = "Bitacora_Digitada.xlsx";

const HEADER_FILL: u32 = 0xC6EFCE;
const NUMBER_FORMAT: &str = "#,##0.00";
const DATE_FORMAT: &str = "dd/mm/yyyy";
const DATE_WIDTH: f64 = 12.0;
const HOUR_WIDTH: f64 = 8.0;
const DATA_WIDTH: f64 = 16.0;
const HEADER_HEIGHT: f64 = 45.0;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("invalid sheet name '{name}': {reason}")]
    SheetName { name: String, reason: String },
    #[error("failed to write cell ({row}, {col}): {source}")]
    Cell { row: u32, col: u16, source: XlsxError },
    #[error("invalid report date {0}")]
    Date(NaiveDate),
    #[error("failed to apply layout: {0}")]
    Layout(XlsxError),
    #[error("failed to save '{}': {source}", .path.display())]
    Save { path: PathBuf, source: XlsxError },
    #[error("failed to build workbook: {0}")]
    Buffer(XlsxError),
}

/// Export settings.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub sheet_name: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self { sheet_name: DEFAULT_SHEET_NAME.to_string() }
    }
}

/// Result of an Excel export operation
#[derive(Debug, Default)]
pub struct ExportResult {
    pub sheet_name: String,
    /// Data rows written (header excluded)
    pub rows_exported: usize,
    /// Non-blank cells written, header included
    pub cells_exported: usize,
    /// Delta cells left blank for lack of a prior reading
    pub blank_deltas: usize,
    /// Delta cells holding a negative value
    pub negative_deltas: usize,
    pub export_duration_ms: u128,
}

impl ExportResult {
    /// Returns a summary message suitable for display
    pub fn summary(&self) -> String {
        let mut parts = vec![
            format!("{} row{}", self.rows_exported, if self.rows_exported == 1 { "" } else { "s" }),
            format!("{} cells", self.cells_exported),
        ];
        if self.negative_deltas > 0 {
            parts.push(format!("{} negative deltas", self.negative_deltas));
        }
        format!("{} to sheet '{}'", parts.join(", "), self.sheet_name)
    }

    pub fn has_warnings(&self) -> bool {
        self.negative_deltas > 0
    }
}

/// `Bitacora_<YYYY-MM-DD>.xlsx` for a dated table, else the fixed fallback.
///
/// `prefix` replaces `Bitacora` in the dated form.
pub fn default_file_name(report_date: Option<NaiveDate>, prefix: &str) -> String {
    match report_date {
        Some(date) => format!("{}_{}.xlsx", prefix, date.format("%Y-%m-%d")),
        None => FALLBACK_FILE_NAME.to_string(),
    }
}

/// Export the table to an xlsx file at `path`.
///
/// The table is only borrowed; deltas are written as they are stored.
pub fn export(rows: &[Row], path: &Path, options: &ExportOptions) -> Result<ExportResult, ExportError> {
    let start_time = Instant::now();
    let (mut workbook, mut result) = build_workbook(rows, options)?;

    workbook
        .save(path)
        .map_err(|source| ExportError::Save { path: path.to_path_buf(), source })?;

    result.export_duration_ms = start_time.elapsed().as_millis();
    info!(path = %path.display(), rows = result.rows_exported, ms = result.export_duration_ms, "exported xlsx");
    Ok(result)
}

/// Export the table to an in-memory xlsx file.
pub fn export_to_buffer(
    rows: &[Row],
    options: &ExportOptions,
) -> Result<(Vec<u8>, ExportResult), ExportError> {
    let start_time = Instant::now();
    let (mut workbook, mut result) = build_workbook(rows, options)?;
    let buffer = workbook.save_to_buffer().map_err(ExportError::Buffer)?;
    result.export_duration_ms = start_time.elapsed().as_millis();
    Ok((buffer, result))
}

fn build_workbook(rows: &[Row], options: &ExportOptions) -> Result<(XlsxWorkbook, ExportResult), ExportError> {
    let mut workbook = XlsxWorkbook::new();
    let mut result = ExportResult { sheet_name: options.sheet_name.clone(), ..Default::default() };

    let worksheet = workbook
        .add_worksheet()
        .set_name(&options.sheet_name)
        .map_err(|e| ExportError::SheetName { name: options.sheet_name.clone(), reason: e.to_string() })?;

    write_header(worksheet, &mut result)?;
    write_rows(worksheet, rows, &mut result)?;
    apply_layout(worksheet)?;

    debug!(cells = result.cells_exported, blank_deltas = result.blank_deltas, "worksheet built");
    Ok((workbook, result))
}

fn header_format() -> Format {
    Format::new()
        .set_bold()
        .set_text_wrap()
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_background_color(Color::RGB(HEADER_FILL))
        .set_border(FormatBorder::Thin)
}

fn write_header(worksheet: &mut Worksheet, result: &mut ExportResult) -> Result<(), ExportError> {
    let format = header_format();
    for (col, column) in EXPORT_COLUMNS.iter().enumerate() {
        let col = col as u16;
        worksheet
            .write_string_with_format(0, col, column.header(), &format)
            .map_err(|source| ExportError::Cell { row: 0, col, source })?;
        result.cells_exported += 1;
    }
    Ok(())
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Row], result: &mut ExportResult) -> Result<(), ExportError> {
    let number_format = Format::new().set_num_format(NUMBER_FORMAT);
    let date_format = Format::new().set_num_format(DATE_FORMAT).set_align(FormatAlign::Center);
    let text_format = Format::new().set_align(FormatAlign::Center);

    for (idx, row) in rows.iter().enumerate() {
        let row32 = idx as u32 + 1;
        for (col, column) in EXPORT_COLUMNS.iter().enumerate() {
            let col16 = col as u16;
            let cell = |e: XlsxError| ExportError::Cell { row: row32, col: col16, source: e };

            match row.cell(*column) {
                CellValue::Empty => {
                    if matches!(column, TableColumn::Delta(_)) {
                        result.blank_deltas += 1;
                    }
                    continue;
                }
                CellValue::Text(text) => {
                    worksheet.write_string_with_format(row32, col16, &text, &text_format).map_err(cell)?;
                }
                CellValue::Number(n) => {
                    if matches!(column, TableColumn::Delta(_)) && n < 0.0 {
                        result.negative_deltas += 1;
                    }
                    worksheet.write_number_with_format(row32, col16, n, &number_format).map_err(cell)?;
                }
                CellValue::Date(date) => {
                    let excel_date = excel_date(date)?;
                    worksheet
                        .write_datetime_with_format(row32, col16, &excel_date, &date_format)
                        .map_err(cell)?;
                }
            }
            result.cells_exported += 1;
        }
        result.rows_exported += 1;
    }
    Ok(())
}

fn excel_date(date: NaiveDate) -> Result<ExcelDateTime, ExportError> {
    let year = u16::try_from(date.year()).map_err(|_| ExportError::Date(date))?;
    ExcelDateTime::from_ymd(year, date.month() as u8, date.day() as u8).map_err(|_| ExportError::Date(date))
}

/// Fixed column widths, a tall wrapped header row, header frozen.
fn apply_layout(worksheet: &mut Worksheet) -> Result<(), ExportError> {
    for (col, column) in EXPORT_COLUMNS.iter().enumerate() {
        let width = match column {
            TableColumn::Fecha => DATE_WIDTH,
            TableColumn::Input(c) if !c.is_numeric() => HOUR_WIDTH,
            _ => DATA_WIDTH,
        };
        worksheet.set_column_width(col as u16, width).map_err(ExportError::Layout)?;
    }
    worksheet.set_row_height(0, HEADER_HEIGHT).map_err(ExportError::Layout)?;
    worksheet.set_freeze_panes(1, 0).map_err(ExportError::Layout)?;
    Ok(())
}
