//! Serialization of extracted tables through pluggable backends

mod js;
mod json;
mod records;

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::config::{ExportConfig, LineBreak};
use crate::error::{ConvertError, Result};
use crate::filter::filter_headers;
use crate::model::{Table, Value};

pub use js::JsBackend;
pub use json::JsonBackend;
pub use records::{build_records, TableRecords, IDS_KEY};

/// Where the output of one export target goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportMode {
    /// One artifact per table inside the output directory
    PerFile,
    /// One artifact holding every table under its name
    Aggregated,
}

/// A serialization format
pub trait Backend: Send + Sync {
    fn id(&self) -> &'static str;

    /// Extension of per-table files, including the dot
    fn default_extension(&self) -> &'static str;

    /// Template used when the export target sets none
    fn default_template(&self, mode: ExportMode) -> &'static str;

    /// Name a column is written under
    fn translate_column_name(&self, name: &str) -> String {
        name.to_string()
    }

    /// Render a value recursively, skipping `Null` at every level
    fn write_value(&self, value: &Value, out: &mut String) -> Result<()>;
}

/// Create a backend by id
pub fn create_backend(id: &str) -> Result<Box<dyn Backend>> {
    backend_for(id, false)
}

fn backend_for(id: &str, pretty: bool) -> Result<Box<dyn Backend>> {
    match id.to_ascii_lowercase().as_str() {
        "js" => Ok(Box::new(JsBackend)),
        "json" if pretty => Ok(Box::new(JsonBackend::pretty())),
        "json" => Ok(Box::new(JsonBackend::new())),
        _ => Err(ConvertError::UnknownBackend(id.to_string())),
    }
}

/// Runs one export target over the tables of a run
pub struct Exporter {
    config: ExportConfig,
    backend: Box<dyn Backend>,
    mode: ExportMode,
    template: String,
    extension: String,
    line_break: LineBreak,
    aggregate: IndexMap<String, Value>,
    written: Vec<PathBuf>,
}

impl Exporter {
    /// Resolve the backend and check the template for the output mode
    pub fn new(config: ExportConfig, line_break: LineBreak) -> Result<Self> {
        let backend = backend_for(&config.backend, config.pretty)?;
        let mode = if config.is_aggregated() {
            ExportMode::Aggregated
        } else {
            ExportMode::PerFile
        };

        let template = match config.export_template {
            Some(ref template) => {
                check_template(template, mode)?;
                template.clone()
            }
            None => backend.default_template(mode).to_string(),
        };

        let extension = match config.ext_name.as_deref().map(str::trim) {
            Some("") => String::new(),
            Some(ext) if ext.starts_with('.') => ext.to_string(),
            Some(ext) => format!(".{}", ext),
            None => backend.default_extension().to_string(),
        };

        Ok(Self {
            config,
            backend,
            mode,
            template,
            extension,
            line_break,
            aggregate: IndexMap::new(),
            written: Vec::new(),
        })
    }

    pub fn mode(&self) -> ExportMode {
        self.mode
    }

    /// Export one table; returns `false` when no column survives the group filter
    pub async fn export_table(&mut self, table: &Table) -> Result<bool> {
        let headers = filter_headers(&table.name, &table.headers, self.config.group_filter.as_ref());
        if headers.is_empty() {
            debug!(table = %table.name, backend = self.backend.id(), "no column to export");
            return Ok(false);
        }

        let records = build_records(table, &headers, &self.config, self.backend.as_ref());
        let value = records.into_value(self.config.emit_ids);

        match self.mode {
            ExportMode::Aggregated => {
                self.aggregate.insert(table.name.clone(), value);
            }
            ExportMode::PerFile => {
                let mut data = String::new();
                self.backend.write_value(&value, &mut data)?;
                let text = self
                    .template
                    .replacen("{name}", &table.name, 1)
                    .replacen("{data}", &data, 1);
                let path = self
                    .config
                    .output_dir
                    .join(format!("{}{}", table.name, self.extension));
                self.write(path, &text).await?;
            }
        }
        Ok(true)
    }

    /// Write the aggregated artifact, if any, and return every written path
    pub async fn finish(mut self) -> Result<Vec<PathBuf>> {
        if self.mode == ExportMode::Aggregated {
            let value = Value::Object(std::mem::take(&mut self.aggregate));
            let mut data = String::new();
            self.backend.write_value(&value, &mut data)?;
            let text = self.template.replacen("{data}", &data, 1);
            let path = self.config.output_dir.clone();
            self.write(path, &text).await?;
        }
        Ok(self.written)
    }

    async fn write(&mut self, path: PathBuf, text: &str) -> Result<()> {
        let text = self.line_break.apply(text);
        write_artifact(&path, &text).await?;
        info!(path = %path.display(), backend = self.backend.id(), "wrote");
        self.written.push(path);
        Ok(())
    }
}

fn check_template(template: &str, mode: ExportMode) -> Result<()> {
    if !template.contains("{data}") {
        return Err(ConvertError::MissingPlaceholder {
            placeholder: "{data}",
        });
    }
    if mode == ExportMode::PerFile && !template.contains("{name}") {
        return Err(ConvertError::MissingPlaceholder {
            placeholder: "{name}",
        });
    }
    Ok(())
}

async fn write_artifact(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| ConvertError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
    }
    tokio::fs::write(path, text)
        .await
        .map_err(|source| ConvertError::Io {
            path: path.to_path_buf(),
            source,
        })
}
