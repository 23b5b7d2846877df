//! Table extraction: turns one sheet's grid into a typed [`Table`]
//!
//! Rows are scanned top to bottom through a fixed sequence of phases:
//!
//! ```text
//! MetadataProbe → HeaderDiscovery → ValidatorRows(before) → TypeRow
//!               → ValidatorRows(after) → DataHarvest → Done
//! ```
//!
//! Every phase after header discovery classifies a row by one cell only, the
//! sentinel (first retained header column). Blank and `#` rows are skipped
//! everywhere, even if other columns hold text.

mod row;

use std::sync::Arc;

use tracing::debug;

use crate::error::{CellLocation, ConvertError, ErrorLog, Result};
use crate::grammar::{GroupResolver, TypeGrammar, Validator, ValidatorFactory, DEFAULT_COLOR};
use crate::grid::{CellRange, GridSource};
use crate::model::{cell_name, RowKind, RowRecord, Table, TypeHeader, Value};

pub use row::RowClass;

/// Extraction phases, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    MetadataProbe,
    HeaderDiscovery,
    ValidatorRows(Stage),
    TypeRow,
    DataHarvest,
    Done,
}

/// Which side of the type row a run of `@` rows sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    BeforeType,
    AfterType,
}

/// A header found in phase 2, waiting for its type
struct PendingColumn {
    column: usize,
    name: String,
    color: String,
    group: String,
    validator: Option<Arc<dyn Validator>>,
}

/// Cursor and partial results of one sheet scan
struct Scan<'g> {
    grid: &'g dyn GridSource,
    range: CellRange,
    cursor: usize,
    table: Table,
    columns: Vec<PendingColumn>,
    headers: Vec<TypeHeader>,
}

impl<'g> Scan<'g> {
    fn new(grid: &'g dyn GridSource, range: CellRange) -> Self {
        Self {
            grid,
            range,
            cursor: 0,
            table: Table::new(grid.sheet_name(), grid.source_file()),
            columns: Vec::new(),
            headers: Vec::new(),
        }
    }

    fn sheet_location(&self) -> CellLocation {
        CellLocation::sheet(self.grid.source_file(), self.grid.sheet_name())
    }

    fn location(&self, col: usize, row: usize) -> CellLocation {
        self.sheet_location().at(cell_name(col, row))
    }

    /// First retained header column, or the leftmost used column before headers exist
    fn sentinel_column(&self) -> usize {
        self.columns
            .first()
            .map(|c| c.column)
            .unwrap_or(self.range.min_col)
    }

    fn classify(&self, row: usize) -> RowClass<'g> {
        let grid = self.grid;
        RowClass::of(grid.cell(self.sentinel_column(), row))
    }

    /// Move the cursor past blank and comment rows without consuming the next row
    fn next_significant(&mut self) -> Option<usize> {
        while self.cursor <= self.range.max_row {
            if !self.classify(self.cursor).is_skipped() {
                return Some(self.cursor);
            }
            self.cursor += 1;
        }
        None
    }

    fn into_table(mut self) -> Table {
        self.table.set_headers(self.headers);
        self.table
    }
}

/// Drives a grid through the extraction phases
pub struct Extractor<'a> {
    grammar: &'a dyn TypeGrammar,
    validators: &'a dyn ValidatorFactory,
    groups: &'a dyn GroupResolver,
    check_content: bool,
}

impl<'a> Extractor<'a> {
    pub fn new(
        grammar: &'a dyn TypeGrammar,
        validators: &'a dyn ValidatorFactory,
        groups: &'a dyn GroupResolver,
    ) -> Self {
        Self {
            grammar,
            validators,
            groups,
            check_content: true,
        }
    }

    /// Enable or disable type and validator checks on data cells
    pub fn with_content_check(mut self, enabled: bool) -> Self {
        self.check_content = enabled;
        self
    }

    /// Extract a table from one sheet
    ///
    /// `Ok(None)` means the sheet holds no table: its name is empty or starts
    /// with `!`, or it has no used range. A used range without a header row is
    /// a hard error. Row-level failures go to `log` and drop only their row.
    pub fn extract(&self, grid: &dyn GridSource, log: &mut ErrorLog) -> Result<Option<Table>> {
        let sheet_name = grid.sheet_name();
        if sheet_name.is_empty() || sheet_name.starts_with('!') {
            debug!(file = %grid.source_file().display(), sheet = sheet_name, "pass sheet");
            return Ok(None);
        }
        let Some(range) = grid.used_range() else {
            debug!(file = %grid.source_file().display(), sheet = sheet_name, "pass empty sheet");
            return Ok(None);
        };

        let mut scan = Scan::new(grid, range);
        let mut phase = Phase::MetadataProbe;
        while phase != Phase::Done {
            phase = match phase {
                Phase::MetadataProbe => {
                    self.probe_metadata(&mut scan);
                    Phase::HeaderDiscovery
                }
                Phase::HeaderDiscovery => {
                    self.discover_headers(&mut scan)?;
                    Phase::ValidatorRows(Stage::BeforeType)
                }
                Phase::ValidatorRows(stage) => {
                    for (index, validator) in self.validator_rows(&mut scan)? {
                        match stage {
                            Stage::BeforeType => scan.columns[index].validator = Some(validator),
                            Stage::AfterType => scan.headers[index].validator = Some(validator),
                        }
                    }
                    match stage {
                        Stage::BeforeType => Phase::TypeRow,
                        Stage::AfterType => Phase::DataHarvest,
                    }
                }
                Phase::TypeRow => {
                    self.type_row(&mut scan)?;
                    Phase::ValidatorRows(Stage::AfterType)
                }
                Phase::DataHarvest => {
                    self.harvest(&mut scan, log);
                    Phase::Done
                }
                Phase::Done => Phase::Done,
            };
        }

        let table = scan.into_table();
        debug!(
            table = %table.name,
            columns = table.column_count(),
            rows = table.row_count(),
            "extracted table"
        );
        Ok(Some(table))
    }

    /// Phase 1: read the custom data cell and start below it
    fn probe_metadata(&self, scan: &mut Scan<'_>) {
        let Some(cell) = self.grammar.custom_data_cell() else {
            return;
        };
        if let Some(text) = scan.grid.cell(cell.col, cell.row) {
            scan.table.custom_data = Some(text.to_string());
            scan.cursor = cell.row + 1;
        }
    }

    /// Phase 2: the first significant row names the columns
    fn discover_headers(&self, scan: &mut Scan<'_>) -> Result<()> {
        let Some(row) = scan.next_significant() else {
            return Err(ConvertError::HeaderRowMissing {
                location: scan.sheet_location(),
            });
        };

        let mut record = RowRecord::new(RowKind::Header, row);
        for col in scan.range.min_col..=scan.range.max_col {
            let Some(text) = scan.grid.cell(col, row) else {
                continue;
            };
            let name = text.trim();
            if name.is_empty() || name.starts_with('#') {
                continue;
            }

            let color = scan.grid.cell_color(col, row).unwrap_or(DEFAULT_COLOR);
            let group = self
                .groups
                .group_for(color)
                .ok_or_else(|| ConvertError::UnknownColorGroup {
                    location: scan.location(col, row),
                    color: color.to_string(),
                })?;
            if scan.columns.iter().any(|c| c.name == name) {
                return Err(ConvertError::DuplicateColumn {
                    location: scan.location(col, row),
                    column: name.to_string(),
                });
            }

            scan.columns.push(PendingColumn {
                column: col,
                name: name.to_string(),
                color: color.to_string(),
                group: group.to_string(),
                validator: None,
            });
            record.values.insert(col, Value::String(name.to_string()));
        }

        scan.table.rows.push(record);
        scan.cursor = row + 1;
        Ok(())
    }

    /// Phase 3a: consume consecutive `@` rows, returning `(header index, validator)` pairs
    fn validator_rows(&self, scan: &mut Scan<'_>) -> Result<Vec<(usize, Arc<dyn Validator>)>> {
        let mut found = Vec::new();
        while let Some(row) = scan.next_significant() {
            if !matches!(scan.classify(row), RowClass::Validator(_)) {
                break;
            }
            for (index, column) in scan.columns.iter().enumerate() {
                let raw = scan.grid.cell(column.column, row).unwrap_or("");
                let spec = if index == 0 {
                    raw.strip_prefix('@').unwrap_or(raw)
                } else {
                    raw
                }
                .trim();
                if spec.is_empty() {
                    continue;
                }
                let validator =
                    self.validators
                        .build(spec)
                        .map_err(|source| ConvertError::MalformedValidator {
                            location: scan.location(column.column, row),
                            column: column.name.clone(),
                            spec: spec.to_string(),
                            source,
                        })?;
                found.push((index, validator));
            }
            scan.cursor = row + 1;
        }
        Ok(found)
    }

    /// Phase 3b: exactly one `*` row types every column
    fn type_row(&self, scan: &mut Scan<'_>) -> Result<()> {
        let sentinel = scan.sentinel_column();
        let row = match scan.next_significant() {
            Some(row) if matches!(scan.classify(row), RowClass::Type(_)) => row,
            Some(row) => {
                return Err(ConvertError::TypeRowMissing {
                    location: scan.location(sentinel, row),
                })
            }
            None => {
                return Err(ConvertError::TypeRowMissing {
                    location: scan.sheet_location(),
                })
            }
        };

        let mut record = RowRecord::new(RowKind::Type, row);
        let mut headers = Vec::with_capacity(scan.columns.len());
        for (index, column) in scan.columns.iter().enumerate() {
            let raw = scan.grid.cell(column.column, row).unwrap_or("");
            let text = if index == 0 {
                raw.strip_prefix('*').unwrap_or(raw)
            } else {
                raw
            }
            .trim();
            if text.is_empty() {
                return Err(ConvertError::MissingType {
                    location: scan.location(column.column, row),
                    column: column.name.clone(),
                });
            }

            let (spec, is_comment) = match text.strip_prefix('#') {
                Some(rest) if rest.trim().is_empty() => ("string", true),
                Some(rest) => (rest.trim(), true),
                None => (text, false),
            };
            let parser = self
                .grammar
                .build(spec)
                .map_err(|source| ConvertError::MalformedType {
                    location: scan.location(column.column, row),
                    column: column.name.clone(),
                    spec: spec.to_string(),
                    source,
                })?;

            record
                .values
                .insert(column.column, Value::String(parser.spec().to_string()));
            headers.push(
                TypeHeader::new(&column.name, index, column.column, parser)
                    .with_group(&column.color, &column.group)
                    .with_validator(column.validator.clone())
                    .with_comment(is_comment),
            );
        }

        scan.headers = headers;
        scan.table.rows.push(record);
        scan.cursor = row + 1;
        Ok(())
    }

    /// Phase 4: parse every remaining row whose sentinel cell has content
    fn harvest(&self, scan: &mut Scan<'_>, log: &mut ErrorLog) {
        let sentinel = scan.sentinel_column();
        for row in scan.cursor..=scan.range.max_row {
            if RowClass::of(scan.grid.cell(sentinel, row)).is_skipped() {
                continue;
            }
            match self.data_row(scan, row) {
                Ok(record) => scan.table.rows.push(record),
                Err((col, message)) => log.record(scan.location(col, row), row, message),
            }
        }
        scan.cursor = scan.range.max_row + 1;
    }

    /// Parse one data row; the error names the failing source column
    fn data_row(&self, scan: &Scan<'_>, row: usize) -> std::result::Result<RowRecord, (usize, String)> {
        let mut record = RowRecord::new(RowKind::Data, row);
        for header in &scan.headers {
            let Some(text) = scan
                .grid
                .cell(header.column, row)
                .filter(|t| !t.trim().is_empty())
            else {
                continue;
            };

            let value = header.parser.parse(text).map_err(|e| {
                (
                    header.column,
                    format!("cannot parse \"{}\" as {}: {}", text, header.type_spec, e),
                )
            })?;

            if self.check_content {
                if !header.parser.is_valid(&value) {
                    return Err((
                        header.column,
                        format!("\"{}\" does not match type {}", text, header.type_spec),
                    ));
                }
                if let Some(ref validator) = header.validator {
                    validator.check(&value).map_err(|msg| {
                        (
                            header.column,
                            format!("\"{}\" rejected by {}: {}", text, validator.spec(), msg),
                        )
                    })?;
                }
            }

            record.values.insert(header.column, value);
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{BuiltinGrammar, BuiltinValidators, ColorGroups, GrammarOptions};
    use crate::grid::Sheet;
    use crate::model::CellRef;

    fn groups() -> ColorGroups {
        ColorGroups::new()
            .with_group(DEFAULT_COLOR, "all")
            .with_group("FF0000", "server")
    }

    fn run(sheet: &Sheet) -> (Result<Option<Table>>, ErrorLog) {
        let grammar = BuiltinGrammar::default();
        let groups = groups();
        let extractor = Extractor::new(&grammar, &BuiltinValidators, &groups);
        let mut log = ErrorLog::new();
        let result = extractor.extract(sheet, &mut log);
        (result, log)
    }

    fn extract_rows(rows: &[&[&str]]) -> (Result<Option<Table>>, ErrorLog) {
        run(&Sheet::from_rows("Items", "items.xlsx", rows))
    }

    fn table(rows: &[&[&str]]) -> Table {
        extract_rows(rows).0.unwrap().unwrap()
    }

    #[test]
    fn test_basic_table() {
        let t = table(&[
            &["Id", "Name", "Value"],
            &["*int", "string", "float"],
            &["1", "sword", "2.5"],
            &["2", "shield", ""],
        ]);

        assert_eq!(t.name, "Items");
        assert_eq!(t.column_count(), 3);
        assert_eq!(t.row_count(), 2);
        assert_eq!(t.rows[0].kind, RowKind::Header);
        assert_eq!(t.rows[1].kind, RowKind::Type);

        let rows: Vec<_> = t.data_rows().collect();
        assert_eq!(t.value(rows[0], "Name"), Some(&Value::from("sword")));
        assert_eq!(t.value(rows[0], "Value"), Some(&Value::Float(2.5)));
        assert_eq!(t.value(rows[1], "Value"), None);
        assert_eq!(rows[1].source_row, 3);
    }

    #[test]
    fn test_short_names_follow_retained_position() {
        let mut sheet = Sheet::new("Items", "items.xlsx");
        for (col, name, ty, val) in [(2, "Id", "*int", "7"), (5, "Name", "string", "x"), (9, "Value", "int", "3")] {
            sheet.set(col, 0, name).set(col, 1, ty).set(col, 2, val);
        }
        let t = run(&sheet).0.unwrap().unwrap();

        let short: Vec<_> = t.headers.iter().map(|h| h.short_name.as_str()).collect();
        assert_eq!(short, vec!["A", "B", "C"]);
        let cols: Vec<_> = t.headers.iter().map(|h| h.column).collect();
        assert_eq!(cols, vec![2, 5, 9]);
        assert_eq!(t.column_index("Value"), Some(9));

        let row = t.data_rows().next().unwrap();
        assert_eq!(row.get(9), Some(&Value::Int(3)));
    }

    #[test]
    fn test_sentinel_only_blank_rows() {
        let t = table(&[
            &["Id", "Name"],
            &["*int", "string"],
            &["1", "a"],
            &["", "ignored even with text"],
            &["#2", "commented"],
            &["3", "c"],
        ]);
        let ids: Vec<_> = t.data_rows().map(|r| r.get(0).cloned()).collect();
        assert_eq!(ids, vec![Some(Value::Int(1)), Some(Value::Int(3))]);
    }

    #[test]
    fn test_comment_rows_and_cells_before_header() {
        let t = table(&[
            &["# generated by the design team"],
            &[""],
            &["Id", "#memo", "Name"],
            &["*int", "whatever", "string"],
            &["1", "x", "a"],
        ]);
        let names: Vec<_> = t.headers.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec!["Id", "Name"]);
        assert_eq!(t.rows[0].source_row, 2);
    }

    #[test]
    fn test_type_row_without_star_fails() {
        let (result, _) = extract_rows(&[
            &["Id", "Name"],
            &["int", "string"],
            &["1", "a"],
        ]);
        match result {
            Err(ConvertError::TypeRowMissing { location }) => {
                assert_eq!(location.cell.as_deref(), Some("A2"));
            }
            other => panic!("expected TypeRowMissing, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_type_row_at_end_fails() {
        let (result, _) = extract_rows(&[&["Id", "Name"], &["#", "only comments"]]);
        assert!(matches!(result, Err(ConvertError::TypeRowMissing { .. })));
    }

    #[test]
    fn test_malformed_type_names_column() {
        let (result, _) = extract_rows(&[&["Id", "Name"], &["*int", "strnig"]]);
        match result {
            Err(ConvertError::MalformedType {
                location, column, ..
            }) => {
                assert_eq!(column, "Name");
                assert_eq!(location.cell.as_deref(), Some("B2"));
            }
            other => panic!("expected MalformedType, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_type_cell_fails() {
        let (result, _) = extract_rows(&[&["Id", "Name"], &["*int", ""]]);
        assert!(matches!(result, Err(ConvertError::MissingType { .. })));
    }

    #[test]
    fn test_excluded_sheets() {
        let rows: &[&[&str]] = &[&["Id"], &["*int"], &["1"]];
        assert!(run(&Sheet::from_rows("!Draft", "a.xlsx", rows)).0.unwrap().is_none());
        assert!(run(&Sheet::from_rows("", "a.xlsx", rows)).0.unwrap().is_none());
        assert!(run(&Sheet::new("Empty", "a.xlsx")).0.unwrap().is_none());
    }

    #[test]
    fn test_used_range_without_header_fails() {
        let (result, _) = extract_rows(&[&["# only a note"]]);
        assert!(matches!(result, Err(ConvertError::HeaderRowMissing { .. })));

        // The leftmost used column decides: its blank and comment cells hide the rest
        let (result, _) = extract_rows(&[&["# note", "Id"], &["#x", "*int"], &["", "1"]]);
        match result {
            Err(ConvertError::HeaderRowMissing { location }) => {
                assert_eq!(location.sheet, "Items");
                assert_eq!(location.cell, None);
            }
            other => panic!("expected HeaderRowMissing, got {:?}", other),
        }
    }

    #[test]
    fn test_consecutive_validator_rows() {
        let t = table(&[
            &["Id", "Level", "Name"],
            &["@range(1,100)", "range(1,5)", ""],
            &["# replaced below", "", ""],
            &["@", "range(1,10)", "len(1,3)"],
            &["*int", "int", "string"],
            &["@range(1,50)", "", ""],
            &["@", "", "oneof(a|b)"],
            &["1", "7", "a"],
            &["60", "7", "a"],
        ]);
        assert_eq!(t.headers[0].validator.as_ref().map(|v| v.spec()), Some("range(1,50)"));
        assert_eq!(t.headers[1].validator.as_ref().map(|v| v.spec()), Some("range(1,10)"));
        assert_eq!(t.headers[2].validator.as_ref().map(|v| v.spec()), Some("oneof(a|b)"));
        assert_eq!(t.row_count(), 1);
    }

    #[test]
    fn test_unknown_color_fails() {
        let mut sheet = Sheet::from_rows("Items", "items.xlsx", &[&["Id", "Name"], &["*int", "string"]]);
        sheet.set_color(1, 0, "00FF00");
        match run(&sheet).0 {
            Err(ConvertError::UnknownColorGroup { location, color }) => {
                assert_eq!(color, "00FF00");
                assert_eq!(location.cell.as_deref(), Some("B1"));
            }
            other => panic!("expected UnknownColorGroup, got {:?}", other),
        }
    }

    #[test]
    fn test_color_resolves_group() {
        let mut sheet = Sheet::from_rows("Items", "items.xlsx", &[&["Id", "Hp"], &["*int", "int"]]);
        sheet.set_color(1, 0, "FF0000");
        let t = run(&sheet).0.unwrap().unwrap();
        assert_eq!(t.headers[0].group, "all");
        assert_eq!(t.headers[1].group, "server");
        assert_eq!(t.headers[1].color, "FF0000");
    }

    #[test]
    fn test_duplicate_column_fails() {
        let (result, _) = extract_rows(&[&["Id", "Id"], &["*int", "int"]]);
        assert!(matches!(result, Err(ConvertError::DuplicateColumn { .. })));
    }

    #[test]
    fn test_validator_rows_around_type_row() {
        let t = table(&[
            &["Id", "Level", "Name"],
            &["@range(1,100)", "", ""],
            &["#", "", ""],
            &["*int", "int", "string"],
            &["@", "range(1,10)", "len(1,3)"],
            &["1", "5", "abc"],
        ]);
        assert_eq!(t.headers[0].validator.as_ref().map(|v| v.spec()), Some("range(1,100)"));
        assert_eq!(t.headers[1].validator.as_ref().map(|v| v.spec()), Some("range(1,10)"));
        assert_eq!(t.headers[2].validator.as_ref().map(|v| v.spec()), Some("len(1,3)"));
        assert_eq!(t.row_count(), 1);
    }

    #[test]
    fn test_malformed_validator_fails() {
        let (result, _) = extract_rows(&[&["Id"], &["@range(1)"], &["*int"]]);
        assert!(matches!(result, Err(ConvertError::MalformedValidator { .. })));
    }

    #[test]
    fn test_row_failures_are_recorded() {
        let (result, log) = extract_rows(&[
            &["Id", "Level"],
            &["*int", "uint8"],
            &["@", "range(1,50)"],
            &["1", "abc"],
            &["2", "300"],
            &["3", "60"],
            &["4", "7"],
        ]);
        let t = result.unwrap().unwrap();
        let ids: Vec<_> = t.data_rows().map(|r| r.get(0).cloned()).collect();
        assert_eq!(ids, vec![Some(Value::Int(4))]);

        let cells: Vec<_> = log.iter().map(|e| e.location.cell.clone().unwrap()).collect();
        assert_eq!(cells, vec!["B4", "B5", "B6"]);
        assert!(log.iter().all(|e| e.location.sheet == "Items"));
    }

    #[test]
    fn test_content_check_disabled() {
        let sheet = Sheet::from_rows(
            "Items",
            "items.xlsx",
            &[&["Id", "Level"], &["*int", "uint8"], &["1", "300"]],
        );
        let grammar = BuiltinGrammar::default();
        let groups = groups();
        let extractor =
            Extractor::new(&grammar, &BuiltinValidators, &groups).with_content_check(false);
        let mut log = ErrorLog::new();
        let t = extractor.extract(&sheet, &mut log).unwrap().unwrap();
        assert!(log.is_empty());
        assert_eq!(t.row_count(), 1);
    }

    #[test]
    fn test_comment_column() {
        let t = table(&[&["Id", "Memo"], &["*int", "#"], &["1", "free text"]]);
        assert!(t.headers[1].is_comment);
        assert_eq!(t.headers[1].type_spec, "string");
    }

    #[test]
    fn test_custom_data_cell() {
        let grammar = BuiltinGrammar::new(GrammarOptions {
            custom_data_cell: Some(CellRef { col: 0, row: 0 }),
            ..Default::default()
        });
        let groups = groups();
        let extractor = Extractor::new(&grammar, &BuiltinValidators, &groups);
        let mut log = ErrorLog::new();

        let sheet = Sheet::from_rows(
            "Items",
            "items.xlsx",
            &[&["version 3"], &["Id"], &["*int"], &["1"]],
        );
        let t = extractor.extract(&sheet, &mut log).unwrap().unwrap();
        assert_eq!(t.custom_data.as_deref(), Some("version 3"));
        assert_eq!(t.headers[0].name, "Id");

        // An empty custom cell leaves the scan at row 0
        let sheet = Sheet::from_rows("Items", "items.xlsx", &[&["", "Id"], &["", "*int"], &["", "1"]]);
        let t = extractor.extract(&sheet, &mut log).unwrap().unwrap();
        assert_eq!(t.custom_data, None);
        assert_eq!(t.row_count(), 1);
    }

    #[test]
    fn test_type_row_records_canonical_specs() {
        let t = table(&[&["Id", "Tags"], &["* INT", "String []"], &["1", "a,b"]]);
        let type_row = &t.rows[1];
        assert_eq!(type_row.get(0), Some(&Value::from("int")));
        assert_eq!(type_row.get(1), Some(&Value::from("string[]")));
        assert_eq!(
            t.data_rows().next().unwrap().get(1),
            Some(&Value::from(vec!["a", "b"]))
        );
    }
}
