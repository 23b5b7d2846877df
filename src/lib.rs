//! sheetconv - Typed spreadsheet tables to configuration files
//!
//! Reads workbook sheets (Excel, CSV) laid out as a header row, a `*` type
//! row, optional `@` validator rows and data rows, checks every cell against
//! its column type and writes the tables through pluggable backends.

pub mod config;
pub mod error;
pub mod export;
pub mod extract;
pub mod filter;
pub mod grammar;
pub mod grid;
pub mod model;
pub mod runner;
pub mod session;

pub use config::{Config, ExportConfig};
pub use error::{ConvertError, ErrorLog, Result};
pub use extract::Extractor;
pub use model::{Table, Value};
pub use runner::{run, RunReport};
pub use session::{RunStatus, Session};
