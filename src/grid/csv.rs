//! CSV file loader

use std::path::Path;

use anyhow::{Context, Result};

use super::{GridLoader, Sheet};

/// Loader for CSV files; the file stem becomes the sheet name
pub struct CsvLoader;

impl GridLoader for CsvLoader {
    fn load(&self, path: &Path, bytes: Vec<u8>) -> Result<Vec<Sheet>> {
        let sheet_name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();

        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(bytes.as_slice());

        let mut sheet = Sheet::new(sheet_name, path);
        for (row, result) in csv_reader.records().enumerate() {
            let record = result
                .with_context(|| format!("Failed to read CSV row {} of {}", row + 1, path.display()))?;
            for (col, field) in record.iter().enumerate() {
                sheet.set(col, row, field);
            }
        }

        Ok(vec![sheet])
    }

    fn supports_extension(&self, ext: &str) -> bool {
        matches!(ext.to_lowercase().as_str(), "csv")
    }
}
