//! Column metadata and type information

use std::sync::Arc;

use crate::grammar::{ColumnParser, Validator};

use super::coord::column_name;

/// One retained column of a table
#[derive(Debug, Clone)]
pub struct TypeHeader {
    /// Column name (from the header row)
    pub name: String,
    /// Letter code of the retained position: `A`, `B`, ... `AA`
    pub short_name: String,
    /// Source column index (0-based)
    pub column: usize,
    /// Canonical type spec
    pub type_spec: String,
    pub parser: Arc<dyn ColumnParser>,
    /// Validator attached through an `@` row
    pub validator: Option<Arc<dyn Validator>>,
    /// Header cell color
    pub color: String,
    /// Group resolved from the color
    pub group: String,
    /// Comment columns stay in the table but are never exported
    pub is_comment: bool,
}

impl TypeHeader {
    /// Create a header at retained position `position`
    pub fn new(
        name: impl Into<String>,
        position: usize,
        column: usize,
        parser: Arc<dyn ColumnParser>,
    ) -> Self {
        Self {
            name: name.into(),
            short_name: column_name(position),
            column,
            type_spec: parser.spec().to_string(),
            parser,
            validator: None,
            color: crate::grammar::DEFAULT_COLOR.to_string(),
            group: String::new(),
            is_comment: false,
        }
    }

    pub fn with_group(mut self, color: impl Into<String>, group: impl Into<String>) -> Self {
        self.color = color.into();
        self.group = group.into();
        self
    }

    pub fn with_validator(mut self, validator: Option<Arc<dyn Validator>>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_comment(mut self, is_comment: bool) -> Self {
        self.is_comment = is_comment;
        self
    }
}

/// Role of a stored row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowKind {
    Header,
    Type,
    Data,
}
