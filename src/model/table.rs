//! Table and row structures produced by the extractor

use std::path::PathBuf;

use indexmap::IndexMap;

use super::schema::{RowKind, TypeHeader};
use super::value::Value;

/// A stored row, addressed by source column index
#[derive(Debug, Clone)]
pub struct RowRecord {
    pub kind: RowKind,
    /// Source row index (0-based)
    pub source_row: usize,
    /// Sparse values keyed by source column index
    pub values: IndexMap<usize, Value>,
}

impl RowRecord {
    pub fn new(kind: RowKind, source_row: usize) -> Self {
        Self {
            kind,
            source_row,
            values: IndexMap::new(),
        }
    }

    /// Get a value by source column index
    pub fn get(&self, column: usize) -> Option<&Value> {
        self.values.get(&column).filter(|v| !v.is_null())
    }

    pub fn is_data(&self) -> bool {
        self.kind == RowKind::Data
    }
}

/// A typed table extracted from one sheet
#[derive(Debug, Clone)]
pub struct Table {
    /// Table name (the sheet name)
    pub name: String,
    /// File the sheet came from
    pub source_file: PathBuf,
    /// Retained columns in header order
    pub headers: Vec<TypeHeader>,
    /// Column name to source column index
    pub header_index: IndexMap<String, usize>,
    /// Header, type and data rows in scan order
    pub rows: Vec<RowRecord>,
    /// Free-form text read from the custom data cell
    pub custom_data: Option<String>,
}

impl Table {
    /// Create a new empty table
    pub fn new(name: impl Into<String>, source_file: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            source_file: source_file.into(),
            headers: Vec::new(),
            header_index: IndexMap::new(),
            rows: Vec::new(),
            custom_data: None,
        }
    }

    /// Replace the header list and rebuild the name lookup
    pub fn set_headers(&mut self, headers: Vec<TypeHeader>) {
        self.header_index = headers.iter().map(|h| (h.name.clone(), h.column)).collect();
        self.headers = headers;
    }

    /// Get source column index by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header_index.get(name).copied()
    }

    /// Data rows in scan order
    pub fn data_rows(&self) -> impl Iterator<Item = &RowRecord> {
        self.rows.iter().filter(|r| r.is_data())
    }

    /// Number of data rows
    pub fn row_count(&self) -> usize {
        self.data_rows().count()
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Look up a data row cell by column name
    pub fn value<'a>(&self, row: &'a RowRecord, column: &str) -> Option<&'a Value> {
        self.column_index(column).and_then(|idx| row.get(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{BuiltinGrammar, TypeGrammar};

    #[test]
    fn test_value_by_column_name() {
        let grammar = BuiltinGrammar::default();
        let mut table = Table::new("Items", "items.xlsx");
        table.set_headers(vec![
            TypeHeader::new("Id", 0, 2, grammar.build("int").unwrap()),
            TypeHeader::new("Name", 1, 5, grammar.build("string").unwrap()),
        ]);

        let mut row = RowRecord::new(RowKind::Data, 3);
        row.values.insert(2, Value::Int(7));
        row.values.insert(5, Value::Null);

        // the returned value borrows the row, not the table
        let value = {
            let lookup = &table;
            lookup.value(&row, "Id")
        };
        assert_eq!(value, Some(&Value::Int(7)));
        assert_eq!(table.value(&row, "Name"), None);
        assert_eq!(table.value(&row, "Missing"), None);
        assert_eq!(table.column_index("Name"), Some(5));
    }
}
