//! `bitacora-engine`: logsheet digitization core.
//!
//! Pure engine crate: receives the extraction engine's raw text, returns a
//! typed, delta-computed session table. No network, CLI or file IO.

pub mod delta;
pub mod error;
pub mod mapper;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod prompt;
pub mod schema;
pub mod session;

pub use error::{CoercionWarning, ParseError, ParseErrorKind, SchemaError};
pub use model::{CarryIn, CellValue, Column, Row, TableColumn, Totalizer};
pub use pipeline::{ingest, IngestOptions, Ingested};
pub use schema::{ExtractionSchema, KeyStyle};
pub use session::{RowStore, SessionTable};
