//! Row classification by the sentinel cell

/// Role of a row as told by its sentinel cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowClass<'a> {
    /// Empty or whitespace-only sentinel
    Blank,
    /// `#` prefix
    Comment,
    /// `@` prefix, with the prefix stripped
    Validator(&'a str),
    /// `*` prefix, with the prefix stripped
    Type(&'a str),
    Content(&'a str),
}

impl<'a> RowClass<'a> {
    pub fn of(sentinel: Option<&'a str>) -> Self {
        let Some(text) = sentinel else {
            return RowClass::Blank;
        };
        if text.trim().is_empty() {
            return RowClass::Blank;
        }
        if text.starts_with('#') {
            return RowClass::Comment;
        }
        if let Some(rest) = text.strip_prefix('@') {
            return RowClass::Validator(rest);
        }
        if let Some(rest) = text.strip_prefix('*') {
            return RowClass::Type(rest);
        }
        RowClass::Content(text)
    }

    /// Blank and comment rows are skipped in every phase
    pub fn is_skipped(&self) -> bool {
        matches!(self, RowClass::Blank | RowClass::Comment)
    }
}
