//! Column type grammar, high-level validators and color groups
//!
//! The extractor only talks to the traits in this module; the built-in
//! implementations are what the command line tool wires in.

mod types;
mod validators;

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::GrammarError;
use crate::model::{CellRef, Value};

pub use self::types::{BuiltinGrammar, GrammarOptions};
pub use self::validators::BuiltinValidators;

/// Converts the raw text of one column's cells into typed values
pub trait ColumnParser: Send + Sync + fmt::Debug {
    /// Parse non-empty cell text
    fn parse(&self, text: &str) -> Result<Value, GrammarError>;

    /// Check a parsed value against the type's constraints
    fn is_valid(&self, value: &Value) -> bool;

    /// Value used for empty cells when defaults are requested
    fn default_value(&self) -> Option<Value>;

    /// Canonical spec text
    fn spec(&self) -> &str;
}

/// Builds column parsers from type spec strings
pub trait TypeGrammar: Send + Sync {
    fn build(&self, spec: &str) -> Result<Arc<dyn ColumnParser>, GrammarError>;

    /// Cell holding free-form per-sheet data, if the grammar declares one
    fn custom_data_cell(&self) -> Option<CellRef> {
        None
    }
}

/// Extra per-column check attached through an `@` row
pub trait Validator: Send + Sync + fmt::Debug {
    fn check(&self, value: &Value) -> Result<(), String>;

    fn spec(&self) -> &str;
}

/// Builds validators from the text of `@` row cells
pub trait ValidatorFactory: Send + Sync {
    fn build(&self, spec: &str) -> Result<Arc<dyn Validator>, GrammarError>;
}

/// Resolves a header cell color to a column group name
pub trait GroupResolver: Send + Sync {
    fn group_for(&self, color: &str) -> Option<&str>;
}

/// Color used for cells whose source carries no fill color
pub const DEFAULT_COLOR: &str = "000000";

/// Color → group table, usually loaded from configuration
#[derive(Debug, Clone, Default)]
pub struct ColorGroups {
    groups: FxHashMap<String, String>,
}

impl ColorGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mapping; colors are matched case-insensitively
    pub fn with_group(mut self, color: &str, group: impl Into<String>) -> Self {
        self.groups.insert(normalize_color(color), group.into());
        self
    }
}

impl<K, V> FromIterator<(K, V)> for ColorGroups
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            groups: iter
                .into_iter()
                .map(|(k, v)| (normalize_color(k.as_ref()), v.into()))
                .collect(),
        }
    }
}

impl GroupResolver for ColorGroups {
    fn group_for(&self, color: &str) -> Option<&str> {
        self.groups.get(&normalize_color(color)).map(String::as_str)
    }
}

/// Uppercase hex without `#`; ARGB values drop their alpha byte
fn normalize_color(color: &str) -> String {
    let hex = color.trim().trim_start_matches('#').to_ascii_uppercase();
    if hex.len() == 8 {
        hex[2..].to_string()
    } else {
        hex
    }
}
