//! Grid layer: sheets of raw cell text read from workbooks and CSV files

mod csv;
mod excel;

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use rustc_hash::FxHashMap;

pub use self::csv::CsvLoader;
pub use self::excel::ExcelLoader;

/// Smallest rectangle holding every non-empty cell (inclusive, 0-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub min_col: usize,
    pub min_row: usize,
    pub max_col: usize,
    pub max_row: usize,
}

/// Read access to one sheet's cells
pub trait GridSource: Send + Sync {
    /// Raw text of a cell, `None` when the cell is empty
    fn cell(&self, col: usize, row: usize) -> Option<&str>;

    /// Fill color of a cell as hex, when the source records one
    fn cell_color(&self, _col: usize, _row: usize) -> Option<&str> {
        None
    }

    fn used_range(&self) -> Option<CellRange>;

    fn sheet_name(&self) -> &str;

    fn source_file(&self) -> &Path;
}

#[derive(Debug, Clone, Default)]
struct GridCell {
    text: String,
    color: Option<String>,
}

/// Sparse in-memory sheet, the common output of every loader
#[derive(Debug, Clone)]
pub struct Sheet {
    name: String,
    source_file: PathBuf,
    cells: FxHashMap<(usize, usize), GridCell>,
    range: Option<CellRange>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, source_file: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            source_file: source_file.into(),
            cells: FxHashMap::default(),
            range: None,
        }
    }

    /// Build a sheet from rows of text; empty strings are empty cells
    pub fn from_rows(
        name: impl Into<String>,
        source_file: impl Into<PathBuf>,
        rows: &[&[&str]],
    ) -> Self {
        let mut sheet = Self::new(name, source_file);
        for (row, cells) in rows.iter().enumerate() {
            for (col, text) in cells.iter().enumerate() {
                sheet.set(col, row, *text);
            }
        }
        sheet
    }

    /// Set a cell's text; empty text leaves the cell empty
    pub fn set(&mut self, col: usize, row: usize, text: impl Into<String>) -> &mut Self {
        let text = text.into();
        if text.is_empty() {
            return self;
        }
        self.cells.entry((col, row)).or_default().text = text;
        self.range = Some(match self.range {
            None => CellRange {
                min_col: col,
                min_row: row,
                max_col: col,
                max_row: row,
            },
            Some(r) => CellRange {
                min_col: r.min_col.min(col),
                min_row: r.min_row.min(row),
                max_col: r.max_col.max(col),
                max_row: r.max_row.max(row),
            },
        });
        self
    }

    /// Set the fill color of a non-empty cell
    pub fn set_color(&mut self, col: usize, row: usize, color: impl Into<String>) -> &mut Self {
        if let Some(cell) = self.cells.get_mut(&(col, row)) {
            cell.color = Some(color.into());
        }
        self
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}

impl GridSource for Sheet {
    fn cell(&self, col: usize, row: usize) -> Option<&str> {
        self.cells
            .get(&(col, row))
            .map(|c| c.text.as_str())
            .filter(|t| !t.is_empty())
    }

    fn cell_color(&self, col: usize, row: usize) -> Option<&str> {
        self.cells.get(&(col, row)).and_then(|c| c.color.as_deref())
    }

    fn used_range(&self) -> Option<CellRange> {
        self.range
    }

    fn sheet_name(&self) -> &str {
        &self.name
    }

    fn source_file(&self) -> &Path {
        &self.source_file
    }
}

/// Trait for turning file bytes into sheets
pub trait GridLoader: Send + Sync {
    /// Decode a file's bytes into its sheets
    fn load(&self, path: &Path, bytes: Vec<u8>) -> Result<Vec<Sheet>>;

    /// Check if this loader can handle the given file extension
    fn supports_extension(&self, ext: &str) -> bool;
}

/// Factory for selecting loaders based on file extension
pub struct LoaderFactory {
    loaders: Vec<Box<dyn GridLoader>>,
}

impl Default for LoaderFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl LoaderFactory {
    /// Create a factory with all supported loaders
    pub fn new() -> Self {
        Self {
            loaders: vec![Box::new(ExcelLoader), Box::new(CsvLoader)],
        }
    }

    /// Whether any loader handles this path
    pub fn supports(&self, path: &Path) -> bool {
        self.get_loader(path).is_ok()
    }

    /// Get a loader for the given file path
    pub fn get_loader(&self, path: &Path) -> Result<&dyn GridLoader> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match self.loaders.iter().find(|l| l.supports_extension(&ext)) {
            Some(loader) => Ok(loader.as_ref()),
            None if ext.is_empty() => {
                bail!("{}: no sheet loader for files without an extension", path.display())
            }
            None => bail!("{}: no sheet loader for \".{}\" grids", path.display(), ext),
        }
    }

    /// Load a file using the appropriate loader
    pub fn load(&self, path: &Path, bytes: Vec<u8>) -> Result<Vec<Sheet>> {
        let loader = self.get_loader(path)?;
        loader.load(path, bytes)
    }
}

/// Marker office applications put in lock-file names
pub const LOCK_FILE_MARKER: &str = "~$";

/// Files starting with `!` and office lock files never reach extraction
pub fn is_excluded_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|name| name.starts_with('!') || name.contains(LOCK_FILE_MARKER))
        .unwrap_or(true)
}
