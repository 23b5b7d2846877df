//! Configuration handling for sheetconv
//!
//! The configuration file is JSON with PascalCase keys. Every key is optional;
//! missing keys take the defaults below.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::{ConvertError, Result};
use crate::export::create_backend;
use crate::filter::GroupFilter;
use crate::grammar::{ColorGroups, GrammarOptions, DEFAULT_COLOR};
use crate::model::CellRef;

/// Line break style of written artifacts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum LineBreak {
    #[default]
    #[serde(rename = "\n", alias = "lf", alias = "LF")]
    Lf,
    #[serde(rename = "\r\n", alias = "crlf", alias = "CRLF")]
    CrLf,
}

impl std::str::FromStr for LineBreak {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lf" | "\n" => Ok(LineBreak::Lf),
            "crlf" | "\r\n" => Ok(LineBreak::CrLf),
            _ => Err(format!("Unknown line break: {:?}", s)),
        }
    }
}

impl LineBreak {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineBreak::Lf => "\n",
            LineBreak::CrLf => "\r\n",
        }
    }

    /// Rewrite every line break in `text` to this style
    pub fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
        match self {
            LineBreak::Lf if text.contains("\r\n") => Cow::Owned(text.replace("\r\n", "\n")),
            LineBreak::CrLf if text.contains('\n') => {
                Cow::Owned(text.replace("\r\n", "\n").replace('\n', "\r\n"))
            }
            _ => Cow::Borrowed(text),
        }
    }
}

/// One export target
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ExportConfig {
    /// Backend id, e.g. `js` or `json`
    #[serde(rename = "Type")]
    pub backend: String,
    /// Directory for per-table files, or a file path for one aggregated artifact
    pub output_dir: PathBuf,
    /// Table-name pattern → groups to export; absent exports every group
    pub group_filter: Option<GroupFilter>,
    /// Wrapper text with `{name}` / `{data}` placeholders
    #[serde(alias = "ExportTemple")]
    pub export_template: Option<String>,
    /// Fill empty cells with the column type's default
    pub use_default_value_if_empty: bool,
    /// Extension of per-table files; the backend's default when absent
    pub ext_name: Option<String>,
    /// Emit the ordered key list as `_ids`
    pub emit_ids: bool,
    /// Pretty-print backends that support it
    pub pretty: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            backend: "js".to_string(),
            output_dir: PathBuf::new(),
            group_filter: None,
            export_template: None,
            use_default_value_if_empty: false,
            ext_name: None,
            emit_ids: true,
            pretty: false,
        }
    }
}

impl ExportConfig {
    /// Create an export target for a backend and output path
    pub fn new(backend: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            backend: backend.into(),
            output_dir: output_dir.into(),
            ..Default::default()
        }
    }

    /// Set the wrapping template
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.export_template = Some(template.into());
        self
    }

    /// Set the group filter
    pub fn with_group_filter(mut self, filter: GroupFilter) -> Self {
        self.group_filter = Some(filter);
        self
    }

    /// Enable default values for empty cells
    pub fn with_defaults_if_empty(mut self, enabled: bool) -> Self {
        self.use_default_value_if_empty = enabled;
        self
    }

    /// Set the per-table file extension
    pub fn with_ext_name(mut self, ext: impl Into<String>) -> Self {
        self.ext_name = Some(ext.into());
        self
    }

    /// Enable or disable the `_ids` key list
    pub fn with_ids(mut self, emit: bool) -> Self {
        self.emit_ids = emit;
        self
    }

    /// Enable pretty printing
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Aggregated mode when the output path names a file
    pub fn is_aggregated(&self) -> bool {
        self.output_dir.extension().is_some()
    }
}

/// Configuration for a conversion run
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Config {
    /// Input files and directories
    pub include_files_and_path: Vec<PathBuf>,
    pub line_break: LineBreak,
    /// Output format of `date` values
    pub date_fmt: String,
    /// Output format of `tinydate` values
    pub tiny_date_fmt: String,
    #[serde(rename = "TimeStampUseMS")]
    pub timestamp_use_ms: bool,
    /// Round floats to this many fraction digits
    pub fraction_digits: Option<u32>,
    /// Cell holding per-sheet custom data, e.g. `A1`
    pub custom_data_cell: Option<String>,
    /// Check parsed values against their type and validators
    pub enable_type_check: bool,
    /// Header color → group name
    pub color_to_group_map: IndexMap<String, String>,
    pub export: Vec<ExportConfig>,
}

impl Default for Config {
    fn default() -> Self {
        let options = GrammarOptions::default();
        let mut color_to_group_map = IndexMap::new();
        color_to_group_map.insert(DEFAULT_COLOR.to_string(), "default".to_string());
        Self {
            include_files_and_path: Vec::new(),
            line_break: LineBreak::default(),
            date_fmt: options.date_fmt,
            tiny_date_fmt: options.tiny_date_fmt,
            timestamp_use_ms: false,
            fraction_digits: None,
            custom_data_cell: None,
            enable_type_check: true,
            color_to_group_map,
            export: Vec::new(),
        }
    }
}

impl Config {
    /// Read and validate a JSON configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ConvertError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Parse and validate configuration text
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the settings that would otherwise fail mid-run
    pub fn validate(&self) -> Result<()> {
        if self.color_to_group_map.is_empty() {
            return Err(ConvertError::Config(
                "ColorToGroupMap must map at least one color".to_string(),
            ));
        }
        for (i, export) in self.export.iter().enumerate() {
            if export.output_dir.as_os_str().is_empty() {
                return Err(ConvertError::Config(format!(
                    "Export[{}] ({}) has no OutputDir",
                    i, export.backend
                )));
            }
            create_backend(&export.backend)?;
        }
        self.custom_data_ref()?;
        Ok(())
    }

    /// Parsed custom data cell
    pub fn custom_data_ref(&self) -> Result<Option<CellRef>> {
        self.custom_data_cell
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(str::parse::<CellRef>)
            .transpose()
    }

    /// Options for the built-in type grammar
    pub fn grammar_options(&self) -> Result<GrammarOptions> {
        Ok(GrammarOptions {
            date_fmt: self.date_fmt.clone(),
            tiny_date_fmt: self.tiny_date_fmt.clone(),
            timestamp_ms: self.timestamp_use_ms,
            fraction_digits: self.fraction_digits,
            custom_data_cell: self.custom_data_ref()?,
        })
    }

    /// Color → group resolver
    pub fn color_groups(&self) -> ColorGroups {
        self.color_to_group_map.iter().collect()
    }

    /// Set input files and directories
    pub fn with_inputs(mut self, inputs: Vec<PathBuf>) -> Self {
        self.include_files_and_path = inputs;
        self
    }

    /// Add an export target
    pub fn with_export(mut self, export: ExportConfig) -> Self {
        self.export.push(export);
        self
    }

    /// Enable or disable content validation
    pub fn with_type_check(mut self, enabled: bool) -> Self {
        self.enable_type_check = enabled;
        self
    }

    /// Set the custom data cell
    pub fn with_custom_data_cell(mut self, cell: impl Into<String>) -> Self {
        self.custom_data_cell = Some(cell.into());
        self
    }

    /// Set the line break style
    pub fn with_line_break(mut self, line_break: LineBreak) -> Self {
        self.line_break = line_break;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::GroupResolver;

    #[test]
    fn test_defaults_from_empty_object() {
        let config = Config::from_json("{}").unwrap();
        assert!(config.enable_type_check);
        assert_eq!(config.line_break, LineBreak::Lf);
        assert_eq!(config.color_groups().group_for("000000"), Some("default"));
        assert!(config.export.is_empty());
    }

    #[test]
    fn test_full_config() {
        let text = r#"{
            "IncludeFilesAndPath": ["data"],
            "LineBreak": "\r\n",
            "TimeStampUseMS": true,
            "FractionDigits": 2,
            "CustomDataCell": "A1",
            "EnableTypeCheck": false,
            "ColorToGroupMap": {"FF0000": "server", "000000": "all"},
            "Export": [{
                "Type": "json",
                "OutputDir": "out/all.json",
                "GroupFilter": {"*": ["all"]},
                "ExportTemple": "{data}",
                "UseDefaultValueIfEmpty": true
            }]
        }"#;
        let config = Config::from_json(text).unwrap();
        assert_eq!(config.line_break, LineBreak::CrLf);
        assert_eq!(config.custom_data_ref().unwrap(), Some(CellRef { col: 0, row: 0 }));
        assert!(!config.enable_type_check);

        let export = &config.export[0];
        assert_eq!(export.backend, "json");
        assert!(export.is_aggregated());
        assert!(export.emit_ids);
        assert_eq!(export.export_template.as_deref(), Some("{data}"));
        assert!(export.group_filter.is_some());
    }

    #[test]
    fn test_missing_output_dir_rejected() {
        let err = Config::from_json(r#"{"Export": [{"Type": "js"}]}"#).unwrap_err();
        assert!(err.to_string().contains("OutputDir"));
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let err = Config::from_json(r#"{"Export": [{"Type": "xml", "OutputDir": "out"}]}"#)
            .unwrap_err();
        assert!(matches!(err, ConvertError::UnknownBackend(_)));
    }

    #[test]
    fn test_bad_custom_cell_rejected() {
        assert!(Config::from_json(r#"{"CustomDataCell": "1A"}"#).is_err());
    }

    #[test]
    fn test_output_mode() {
        assert!(!ExportConfig::new("js", "out/tables").is_aggregated());
        assert!(ExportConfig::new("js", "out/all.js").is_aggregated());
    }

    #[test]
    fn test_line_break_apply() {
        assert_eq!(LineBreak::CrLf.apply("a\nb\r\nc"), "a\r\nb\r\nc");
        assert_eq!(LineBreak::Lf.apply("a\r\nb"), "a\nb");
        assert_eq!(LineBreak::Lf.apply("a\nb"), "a\nb");
    }
}
