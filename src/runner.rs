//! Conversion run: discover inputs, extract in parallel, merge and export in order

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tabled::Tabled;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{ConvertError, ErrorLog, Result};
use crate::export::Exporter;
use crate::extract::Extractor;
use crate::grammar::{BuiltinGrammar, BuiltinValidators, ColorGroups, GrammarOptions};
use crate::grid::{is_excluded_file, LoaderFactory};
use crate::model::Table;
use crate::session::{RunStatus, Session};

/// Version-control directories never walked into
const SKIPPED_DIRS: &[&str] = &[".git", ".svn"];

/// One row of the run summary
#[derive(Debug, Clone, PartialEq, Eq, Tabled)]
pub struct TableSummary {
    #[tabled(rename = "Table")]
    pub name: String,
    #[tabled(rename = "File")]
    pub file: String,
    #[tabled(rename = "Columns")]
    pub columns: usize,
    #[tabled(rename = "Rows")]
    pub rows: usize,
}

impl From<&Table> for TableSummary {
    fn from(table: &Table) -> Self {
        Self {
            name: table.name.clone(),
            file: table.source_file.display().to_string(),
            columns: table.column_count(),
            rows: table.row_count(),
        }
    }
}

/// Result of a run that hit no hard error
#[derive(Debug)]
pub struct RunReport {
    pub tables: Vec<TableSummary>,
    pub errors: ErrorLog,
    /// Every file written by the export targets
    pub artifacts: Vec<PathBuf>,
    pub status: RunStatus,
}

/// Tables and row errors of one input file
struct FileOutput {
    tables: Vec<Table>,
    log: ErrorLog,
}

/// Collect loadable input files in path order
pub fn discover_inputs(paths: &[PathBuf], loaders: &LoaderFactory) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for root in paths {
        if !root.exists() {
            return Err(ConvertError::Load {
                path: root.clone(),
                message: "no such file or directory".to_string(),
            });
        }
        for entry in WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| !is_skipped_dir(e.path()))
        {
            let entry = entry.map_err(|e| ConvertError::Load {
                path: root.clone(),
                message: format!("failed to read directory entry: {}", e),
            })?;
            let path = entry.path();
            if !entry.file_type().is_file() {
                continue;
            }
            if is_excluded_file(path) || !loaders.supports(path) {
                debug!(path = %path.display(), "pass file");
                continue;
            }
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn is_skipped_dir(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| SKIPPED_DIRS.contains(&name))
}

/// Run a whole conversion
///
/// Hard errors abort with `Err`; row-level failures end up in the report.
pub async fn run(config: &Config) -> Result<RunReport> {
    // Template and backend problems surface before any input is read
    let mut exporters = config
        .export
        .iter()
        .map(|export| Exporter::new(export.clone(), config.line_break))
        .collect::<Result<Vec<_>>>()?;

    let loaders = LoaderFactory::new();
    let files = discover_inputs(&config.include_files_and_path, &loaders)?;
    info!(files = files.len(), "discovered inputs");

    let mut inputs = Vec::with_capacity(files.len());
    for path in files {
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|source| ConvertError::Io {
                path: path.clone(),
                source,
            })?;
        inputs.push((path, bytes));
    }

    let options = config.grammar_options()?;
    let groups = config.color_groups();
    let check_content = config.enable_type_check;
    let outputs = tokio::task::spawn_blocking(move || {
        extract_all(loaders, inputs, options, groups, check_content)
    })
    .await?;

    let mut session = Session::new();
    for output in outputs {
        let output = output?;
        session.errors_mut().merge(output.log);
        for table in output.tables {
            session.register(table)?;
        }
    }
    info!(tables = session.tables().len(), "extracted tables");

    let mut artifacts = Vec::new();
    for exporter in exporters.iter_mut() {
        for table in session.tables() {
            exporter.export_table(table).await?;
        }
    }
    for exporter in exporters {
        artifacts.extend(exporter.finish().await?);
    }

    let status = session.status();
    let tables = session.tables().iter().map(TableSummary::from).collect();
    let (_, errors) = session.into_parts();
    Ok(RunReport {
        tables,
        errors,
        artifacts,
        status,
    })
}

/// Load and extract every file in parallel; results keep input order
fn extract_all(
    loaders: LoaderFactory,
    inputs: Vec<(PathBuf, Vec<u8>)>,
    options: GrammarOptions,
    groups: ColorGroups,
    check_content: bool,
) -> Vec<Result<FileOutput>> {
    let grammar = BuiltinGrammar::new(options);
    let extractor =
        Extractor::new(&grammar, &BuiltinValidators, &groups).with_content_check(check_content);
    inputs
        .into_par_iter()
        .map(|(path, bytes)| extract_file(&loaders, &extractor, &path, bytes))
        .collect()
}

fn extract_file(
    loaders: &LoaderFactory,
    extractor: &Extractor<'_>,
    path: &Path,
    bytes: Vec<u8>,
) -> Result<FileOutput> {
    let sheets = loaders
        .load(path, bytes)
        .map_err(|e| ConvertError::Load {
            path: path.to_path_buf(),
            message: format!("{:#}", e),
        })?;

    let mut log = ErrorLog::new();
    let mut tables = Vec::new();
    for sheet in &sheets {
        if let Some(table) = extractor.extract(sheet, &mut log)? {
            tables.push(table);
        }
    }
    debug!(path = %path.display(), tables = tables.len(), errors = log.len(), "extracted file");
    Ok(FileOutput { tables, log })
}
