/// Value Normalization Module
///
/// Converts one cell from whatever the driver hands out into a detached
/// [`Value`] typed purely by its domain meaning.

use crate::core::db::driver::{DriverError, RawValue, ReadAs, ResultCursor};
use crate::core::db::quirks::QuirkTable;
use crate::core::{Result, WalkError};
use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;
use tracing::debug;

/// Display format for timestamps
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
/// Display format for dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A normalized cell value with no ties to the cursor that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(NaiveDateTime),
    Date(NaiveDate),
}

impl Value {
    /// Detaches a raw value from its row.
    ///
    /// Large objects are copied out of the row buffer. Vendor wrappers that
    /// no quirk corrected fall back to their textual form.
    pub fn detach(raw: RawValue<'_>) -> Value {
        match raw {
            RawValue::Null => Value::Null,
            RawValue::Boolean(b) => Value::Boolean(b),
            RawValue::Integer(i) => Value::Integer(i),
            RawValue::Real(f) => Value::Real(f),
            RawValue::Text(t) => Value::Text(t.into_owned()),
            RawValue::Bytes(b) => Value::Bytes(b),
            RawValue::Blob(b) => Value::Bytes(b.to_vec()),
            RawValue::Clob(s) => Value::Text(s.to_owned()),
            RawValue::Timestamp(ts) => Value::Timestamp(ts),
            RawValue::Date(d) => Value::Date(d),
            RawValue::Vendor { text, .. } => Value::Text(text.to_owned()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Renders the value for a text table, spelling NULL as `null_text`.
    pub fn render(&self, null_text: &str) -> String {
        match self {
            Value::Null => null_text.to_string(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Text(t) => write!(f, "{}", t),
            Value::Bytes(b) => write!(f, "<BLOB: {} bytes>", b.len()),
            Value::Timestamp(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
            Value::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
        }
    }
}

/// Reads the cell at the 1-based `index` of the cursor's current row and
/// normalizes it.
///
/// The steps run in order:
/// 1. a native read; a failure a read-failure quirk explains is retried with
///    the quirk's read, anything else (including a failed retry) is an error
/// 2. large objects are copied out while the cursor is still on the row
/// 3. the first matching value quirk re-reads the cell; when that read fails
///    the driver's value is kept
/// 4. the value is detached from the row
///
/// # Errors
///
/// Returns `WalkError::ValueRead` when the driver read fails for a reason no
/// quirk accounts for.
pub fn normalize<C>(cursor: &C, index: usize, quirks: &QuirkTable) -> Result<Value>
where
    C: ResultCursor + ?Sized,
{
    let value_read = |source: DriverError| WalkError::ValueRead { column: index, source };

    let raw = match cursor.read(index, ReadAs::Native) {
        Ok(raw) => raw,
        Err(err) => match quirks.read_failure(&err) {
            Some(quirk) => {
                debug!(column = index, quirk = quirk.name, "retrying read after known driver failure");
                cursor.read(index, quirk.retry_as).map_err(value_read)?
            }
            None => return Err(value_read(err)),
        },
    };

    if matches!(raw, RawValue::Blob(_) | RawValue::Clob(_)) {
        return Ok(Value::detach(raw));
    }

    let column = cursor.columns().iter().find(|c| c.position == index);
    let raw = match column.and_then(|column| quirks.value(&raw, column).map(|q| (q, column))) {
        Some((quirk, column)) => match cursor.read(index, (quirk.reread_as)(column)) {
            Ok(corrected) => {
                debug!(column = index, quirk = quirk.name, "corrected driver value");
                corrected
            }
            Err(err) => {
                debug!(
                    column = index,
                    quirk = quirk.name,
                    error = %err,
                    "correction failed, keeping driver value"
                );
                raw
            }
        },
        None => raw,
    };

    Ok(Value::detach(raw))
}
