//! Backend-agnostic record model for one table

use indexmap::IndexMap;
use tracing::warn;

use crate::config::ExportConfig;
use crate::model::{Table, TypeHeader, Value};

use super::Backend;

/// Key under which the ordered key list is emitted
pub const IDS_KEY: &str = "_ids";

/// Records of one table keyed by its first column
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableRecords {
    pub records: IndexMap<String, Value>,
    /// Record keys in first-seen order, as typed values
    pub ids: Vec<Value>,
}

impl TableRecords {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Object form handed to backends
    pub fn into_value(self, emit_ids: bool) -> Value {
        let mut object = self.records;
        if emit_ids {
            object.insert(IDS_KEY.to_string(), Value::Array(self.ids));
        }
        Value::Object(object)
    }
}

/// Build the records of one table from its exported headers
///
/// Records are keyed by the table's first column even when the group filter
/// leaves that column out of the records.
pub fn build_records(
    table: &Table,
    headers: &[&TypeHeader],
    config: &ExportConfig,
    backend: &dyn Backend,
) -> TableRecords {
    let mut out = TableRecords::default();
    if headers.is_empty() {
        return out;
    }
    let Some(key_header) = table.headers.first() else {
        return out;
    };
    let names: Vec<String> = headers
        .iter()
        .map(|h| backend.translate_column_name(&h.name))
        .collect();

    for row in table.data_rows() {
        let Some(key) = row.get(key_header.column).cloned() else {
            warn!(
                table = %table.name,
                row = row.source_row + 1,
                column = %key_header.name,
                "row has no key, skipped"
            );
            continue;
        };

        let mut record = IndexMap::new();
        for (header, name) in headers.iter().zip(&names) {
            let value = match row.get(header.column) {
                Some(value) => Some(value.clone()),
                None if config.use_default_value_if_empty => header.parser.default_value(),
                None => None,
            };
            if let Some(value) = value {
                record.insert(name.clone(), value);
            }
        }

        let key_text = key.display().into_owned();
        if out
            .records
            .insert(key_text.clone(), Value::Object(record))
            .is_some()
        {
            warn!(table = %table.name, key = %key_text, row = row.source_row + 1, "duplicate key replaces earlier record");
        } else {
            out.ids.push(key);
        }
    }
    out
}
