//! Excel file loader (xlsx, xls, ods)

use std::io::Cursor;
use std::path::Path;

use anyhow::{Context, Result};
use calamine::{open_workbook_auto_from_rs, Data, DataType, Range, Reader};
use tracing::debug;

use super::{GridLoader, Sheet};

/// Loader for workbook files; every worksheet becomes a sheet
pub struct ExcelLoader;

impl GridLoader for ExcelLoader {
    fn load(&self, path: &Path, bytes: Vec<u8>) -> Result<Vec<Sheet>> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
            .with_context(|| format!("Failed to open Excel file: {}", path.display()))?;

        let mut sheets = Vec::new();
        for sheet_name in workbook.sheet_names().to_vec() {
            let range: Range<Data> = workbook
                .worksheet_range(&sheet_name)
                .with_context(|| format!("Failed to read sheet: {}", sheet_name))?;
            debug!(file = %path.display(), sheet = %sheet_name, "read worksheet");
            sheets.push(range_to_sheet(&sheet_name, path, &range));
        }

        Ok(sheets)
    }

    fn supports_extension(&self, ext: &str) -> bool {
        matches!(ext.to_lowercase().as_str(), "xlsx" | "xls" | "ods" | "xlsm" | "xlsb")
    }
}

fn range_to_sheet(name: &str, path: &Path, range: &Range<Data>) -> Sheet {
    let mut sheet = Sheet::new(name, path);
    // used_cells() is relative to the range start
    let (row0, col0) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));
    for (row, col, cell) in range.used_cells() {
        sheet.set(col0 + col, row0 + row, cell_to_string(cell));
    }
    sheet
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => {
            // Integral floats print as integers
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(_) => match cell.as_datetime() {
            Some(dt) if dt.time() == chrono::NaiveTime::MIN => dt.format("%Y/%m/%d").to_string(),
            Some(dt) => dt.format("%Y/%m/%d %H:%M:%S").to_string(),
            None => String::new(),
        },
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("#{:?}", e),
    }
}
