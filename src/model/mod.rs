//! Data model for extracted tables

mod coord;
mod schema;
mod table;
mod value;

pub use coord::{cell_name, column_index, column_name, CellRef};
pub use schema::{RowKind, TypeHeader};
pub use table::{RowRecord, Table};
pub use value::Value;
