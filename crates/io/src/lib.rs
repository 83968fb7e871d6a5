// File I/O: spreadsheet export and the CSV bulk-edit surface

pub mod csv;
pub mod xlsx;

pub use self::csv::{read_table, write_table, TableReadError, TableReadResult};
pub use self::xlsx::{default_file_name, export, export_to_buffer, ExportError, ExportOptions, ExportResult};
