//! Error types for table conversion

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Where in a workbook something went wrong
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellLocation {
    pub file: PathBuf,
    pub sheet: String,
    /// Cell reference such as `B7`, when the problem is tied to one cell
    pub cell: Option<String>,
}

impl CellLocation {
    pub fn sheet(file: impl Into<PathBuf>, sheet: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            sheet: sheet.into(),
            cell: None,
        }
    }

    pub fn at(mut self, cell: impl Into<String>) -> Self {
        self.cell = Some(cell.into());
        self
    }
}

impl fmt::Display for CellLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file \"{}\" sheet \"{}\"", self.file.display(), self.sheet)?;
        if let Some(ref cell) = self.cell {
            write!(f, " cell {}", cell)?;
        }
        Ok(())
    }
}

/// Error raised by a type grammar or validator factory while building from spec text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct GrammarError(pub String);

impl GrammarError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Hard errors: any of these aborts the whole run
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("{location}: header color \"{color}\" does not map to any column group")]
    UnknownColorGroup { location: CellLocation, color: String },

    #[error("{location}: duplicate column name \"{column}\"")]
    DuplicateColumn {
        location: CellLocation,
        column: String,
    },

    #[error("{location}: header row not found")]
    HeaderRowMissing { location: CellLocation },

    #[error("{location}: type row not found")]
    TypeRowMissing { location: CellLocation },

    #[error("{location}: column \"{column}\" has no type")]
    MissingType {
        location: CellLocation,
        column: String,
    },

    #[error("{location}: column \"{column}\" type \"{spec}\" format error: {source}")]
    MalformedType {
        location: CellLocation,
        column: String,
        spec: String,
        #[source]
        source: GrammarError,
    },

    #[error("{location}: column \"{column}\" validator \"{spec}\" format error: {source}")]
    MalformedValidator {
        location: CellLocation,
        column: String,
        spec: String,
        #[source]
        source: GrammarError,
    },

    #[error("duplicate table \"{name}\" at \"{second}\" and \"{first}\"")]
    DuplicateTable {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("export template is missing the \"{placeholder}\" placeholder")]
    MissingPlaceholder { placeholder: &'static str },

    #[error("cannot export non-finite number {0}")]
    NonFiniteFloat(f64),

    #[error("unknown export type \"{0}\"")]
    UnknownBackend(String),

    #[error("invalid cell reference \"{0}\"")]
    InvalidCellRef(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to load \"{path}\": {message}")]
    Load { path: PathBuf, message: String },

    #[error("IO error for \"{path}\": {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("extraction task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, ConvertError>;

/// A row-level failure: the row is dropped, the run goes on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedError {
    pub location: CellLocation,
    /// Source row (0-based) of the dropped row
    pub row: usize,
    pub message: String,
}

impl fmt::Display for RecordedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

/// Row-level failures collected during a run
#[derive(Debug, Clone, Default)]
pub struct ErrorLog {
    entries: Vec<RecordedError>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure and report it
    pub fn record(&mut self, location: CellLocation, row: usize, message: impl Into<String>) {
        let entry = RecordedError {
            location,
            row,
            message: message.into(),
        };
        tracing::error!("{}", entry);
        self.entries.push(entry);
    }

    /// Move every entry of `other` into this log
    pub fn merge(&mut self, other: ErrorLog) {
        self.entries.extend(other.entries);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RecordedError> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_display() {
        let loc = CellLocation::sheet("items.xlsx", "Items").at("B7");
        assert_eq!(loc.to_string(), "file \"items.xlsx\" sheet \"Items\" cell B7");

        let loc = CellLocation::sheet("items.xlsx", "Items");
        assert_eq!(loc.to_string(), "file \"items.xlsx\" sheet \"Items\"");
    }

    #[test]
    fn test_duplicate_table_names_both_files() {
        let err = ConvertError::DuplicateTable {
            name: "Foo".into(),
            first: PathBuf::from("a.xlsx"),
            second: PathBuf::from("b.xlsx"),
        };
        let msg = err.to_string();
        assert!(msg.contains("a.xlsx"));
        assert!(msg.contains("b.xlsx"));
        assert!(msg.contains("Foo"));
    }
}
