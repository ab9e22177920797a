/// Column Resolution Module
///
/// Finds a column of the current row by name, the way the owning database
/// would spell that name.

use crate::core::db::driver::{RawValue, ReadAs, ResultCursor};
use crate::core::db::value::Value;
use crate::core::{Result, WalkError};

/// Identifier case policy of a database.
///
/// Unquoted identifiers are folded the way the database stores them; quoted
/// identifiers keep their spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentifierCase {
    /// Unquoted names are stored upper case (H2, Oracle, DB2)
    Upper,
    /// Unquoted names are stored lower case (PostgreSQL)
    Lower,
    /// Names are stored as written (SQLite, SQL Server)
    #[default]
    Preserve,
}

impl IdentifierCase {
    /// Corrects `name` to the spelling the database uses for it.
    pub fn correct(self, name: &str) -> String {
        let trimmed = name.trim();
        if let Some(unquoted) = strip_quotes(trimmed) {
            return unquoted.to_string();
        }
        match self {
            IdentifierCase::Upper => trimmed.to_uppercase(),
            IdentifierCase::Lower => trimmed.to_lowercase(),
            IdentifierCase::Preserve => trimmed.to_string(),
        }
    }
}

fn strip_quotes(name: &str) -> Option<&str> {
    [('"', '"'), ('`', '`'), ('[', ']')]
        .iter()
        .find_map(|&(open, close)| name.strip_prefix(open)?.strip_suffix(close))
}

/// Returns the text of the column labelled `name` in the cursor's current row.
///
/// `normalize` is the database's identifier correction; labels are then
/// compared case-insensitively. A missing column and a NULL cell both yield
/// `Ok(None)`.
///
/// # Errors
///
/// Returns `WalkError::ValueRead` only when the matching cell cannot be read.
pub fn resolve<C, F>(cursor: &C, name: &str, normalize: F) -> Result<Option<String>>
where
    C: ResultCursor + ?Sized,
    F: Fn(&str) -> String,
{
    let corrected = normalize(name).to_lowercase();
    let Some(column) = cursor
        .columns()
        .iter()
        .find(|column| column.label.to_lowercase() == corrected)
    else {
        return Ok(None);
    };

    let raw = cursor
        .read(column.position, ReadAs::Text)
        .map_err(|source| WalkError::ValueRead {
            column: column.position,
            source,
        })?;
    Ok(match raw {
        RawValue::Null => None,
        RawValue::Text(text) => Some(text.into_owned()),
        other => Some(Value::detach(other).to_string()),
    })
}
