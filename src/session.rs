//! Run-scoped state: the table registry and the error log

use std::path::PathBuf;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::{ConvertError, ErrorLog, Result};
use crate::model::Table;

/// Outcome of a run that did not hit a hard error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Clean,
    /// Rows were dropped; the count is the number of recorded errors
    CompletedWithErrors(usize),
}

impl RunStatus {
    /// Process exit code: 0 clean, 1 with recorded errors
    pub fn exit_code(&self) -> u8 {
        match self {
            RunStatus::Clean => 0,
            RunStatus::CompletedWithErrors(_) => 1,
        }
    }
}

/// Tables and errors accumulated over one run
///
/// Table names are unique across every input of the run. A fresh session per
/// run keeps repeated runs in one process independent.
#[derive(Debug, Default)]
pub struct Session {
    registry: FxHashMap<String, PathBuf>,
    tables: Vec<Table>,
    errors: ErrorLog,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table, failing if another file already defined its name
    pub fn register(&mut self, table: Table) -> Result<()> {
        if let Some(first) = self.registry.get(&table.name) {
            return Err(ConvertError::DuplicateTable {
                name: table.name.clone(),
                first: first.clone(),
                second: table.source_file.clone(),
            });
        }
        debug!(table = %table.name, file = %table.source_file.display(), "registered table");
        self.registry
            .insert(table.name.clone(), table.source_file.clone());
        self.tables.push(table);
        Ok(())
    }

    /// Tables in registration order
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn errors(&self) -> &ErrorLog {
        &self.errors
    }

    pub fn errors_mut(&mut self) -> &mut ErrorLog {
        &mut self.errors
    }

    pub fn status(&self) -> RunStatus {
        if self.errors.is_empty() {
            RunStatus::Clean
        } else {
            RunStatus::CompletedWithErrors(self.errors.len())
        }
    }

    /// Split into tables and errors
    pub fn into_parts(self) -> (Vec<Table>, ErrorLog) {
        (self.tables, self.errors)
    }
}
