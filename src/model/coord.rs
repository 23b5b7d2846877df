//! Spreadsheet coordinate helpers (base-26 column letters, `A1` references)

use std::fmt;
use std::str::FromStr;

use crate::error::ConvertError;

/// Base-26 letter code for a zero-based index: 0 → `A`, 25 → `Z`, 26 → `AA`
pub fn column_name(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Inverse of [`column_name`]; letters are case-insensitive
pub fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    let mut n: usize = 0;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let digit = (ch.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        n = n.checked_mul(26)?.checked_add(digit)?;
    }
    Some(n - 1)
}

/// Cell name for zero-based coordinates, e.g. `(1, 6)` → `B7`
pub fn cell_name(col: usize, row: usize) -> String {
    format!("{}{}", column_name(col), row + 1)
}

/// A zero-based cell coordinate parsed from `A1` notation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRef {
    pub col: usize,
    pub row: usize,
}

impl FromStr for CellRef {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let split = trimmed
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| ConvertError::InvalidCellRef(s.to_string()))?;
        let (letters, digits) = trimmed.split_at(split);
        let col = column_index(letters).ok_or_else(|| ConvertError::InvalidCellRef(s.to_string()))?;
        let row: usize = digits
            .parse()
            .map_err(|_| ConvertError::InvalidCellRef(s.to_string()))?;
        if row == 0 {
            return Err(ConvertError::InvalidCellRef(s.to_string()));
        }
        Ok(CellRef { col, row: row - 1 })
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", cell_name(self.col, self.row))
    }
}
