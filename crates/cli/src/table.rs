//! Terminal rendering of the session table.

use bitacora_engine::model::{CellValue, Row, TableColumn, TABLE_COLUMNS, EXPORT_COLUMNS};
use unicode_width::UnicodeWidthStr;

/// Headers wider than this are truncated; values never are.
const MAX_HEADER_WIDTH: usize = 14;

/// Display width of a string, accounting for accents and double-width glyphs.
pub(crate) fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Truncate a string to fit within `width` display columns, adding ".." if truncated.
pub(crate) fn truncate_display(s: &str, width: usize) -> String {
    if width < 3 {
        for ch in s.chars() {
            let cw = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
            if cw <= width {
                return ch.to_string();
            }
        }
        return String::new();
    }

    if display_width(s) <= width {
        return s.to_string();
    }

    let budget = width - 2;
    let mut used = 0;
    let mut end_byte = 0;
    for (i, ch) in s.char_indices() {
        let cw = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + cw > budget {
            end_byte = i;
            break;
        }
        used += cw;
        end_byte = i + ch.len_utf8();
    }

    format!("{}..", &s[..end_byte])
}

/// Pad or truncate to exactly `width` display columns.
pub(crate) fn pad_right(s: &str, width: usize) -> String {
    let sw = display_width(s);
    if sw > width {
        truncate_display(s, width)
    } else {
        format!("{}{}", s, " ".repeat(width - sw))
    }
}

fn pad_left(s: &str, width: usize) -> String {
    let sw = display_width(s);
    if sw >= width {
        s.to_string()
    } else {
        format!("{}{}", " ".repeat(width - sw), s)
    }
}

fn render_cell(cell: &CellValue) -> String {
    match cell {
        CellValue::Empty => String::new(),
        CellValue::Date(d) => d.format("%d/%m/%Y").to_string(),
        other => other.display(),
    }
}

/// Fixed-width text table: a row number column, then every session column.
/// Numbers are right aligned.
pub fn render(rows: &[Row]) -> String {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| TABLE_COLUMNS.iter().map(|c| render_cell(&row.cell(*c))).collect())
        .collect();

    let widths: Vec<usize> = TABLE_COLUMNS
        .iter()
        .enumerate()
        .map(|(i, col)| {
            let header = display_width(col.header()).min(MAX_HEADER_WIDTH);
            cells.iter().map(|r| display_width(&r[i])).fold(header, usize::max)
        })
        .collect();
    let index_width = rows.len().to_string().len().max(1);

    let mut out = String::new();
    out.push_str(&" ".repeat(index_width));
    for (col, width) in TABLE_COLUMNS.iter().zip(&widths) {
        out.push_str("  ");
        out.push_str(&pad_right(col.header(), *width));
    }
    out.push('\n');

    out.push_str(&"-".repeat(index_width));
    for width in &widths {
        out.push_str("  ");
        out.push_str(&"-".repeat(*width));
    }
    out.push('\n');

    for (n, row_cells) in cells.iter().enumerate() {
        out.push_str(&pad_left(&(n + 1).to_string(), index_width));
        for ((col, cell), width) in TABLE_COLUMNS.iter().zip(row_cells).zip(&widths) {
            out.push_str("  ");
            if is_right_aligned(*col) {
                out.push_str(&pad_left(cell, *width));
            } else {
                out.push_str(&pad_right(cell, *width));
            }
        }
        out.push('\n');
    }

    // Trailing spaces from padding the last column are noise in a terminal.
    out.lines().map(str::trim_end).collect::<Vec<_>>().join("\n") + "\n"
}

fn is_right_aligned(col: TableColumn) -> bool {
    !matches!(col, TableColumn::Fecha | TableColumn::Input(bitacora_engine::Column::Hora))
}

/// The last row as tab-separated export columns, missing cells as `0`.
pub fn last_row_tsv(rows: &[Row]) -> Option<String> {
    let row = rows.last()?;
    let cells: Vec<String> = EXPORT_COLUMNS
        .iter()
        .map(|col| match row.cell(*col) {
            CellValue::Empty => "0".to_string(),
            cell => render_cell(&cell),
        })
        .collect();
    Some(cells.join("\t"))
}
