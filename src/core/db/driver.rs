/// Driver Seam Module
///
/// This module defines the contract every database backend implements so the
/// result walker can drain outcomes without knowing which vendor it talks to.
/// Column positions are 1-based throughout, matching result metadata.

use crate::core::db::warning::Warning;
use chrono::{NaiveDate, NaiveDateTime};
use std::borrow::Cow;
use thiserror::Error;

/// Result type returned by driver calls.
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// A failure reported by the underlying driver.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct DriverError {
    /// Vendor error code (0 when the driver reports none)
    pub code: i32,
    /// Five character SQL state, when the driver reports one
    pub sql_state: Option<String>,
    /// Driver message
    pub message: String,
}

impl DriverError {
    /// Creates an error carrying only a message
    pub fn new(message: impl Into<String>) -> Self {
        DriverError {
            code: 0,
            sql_state: None,
            message: message.into(),
        }
    }

    pub fn with_code(mut self, code: i32) -> Self {
        self.code = code;
        self
    }

    pub fn with_sql_state(mut self, sql_state: impl Into<String>) -> Self {
        self.sql_state = Some(sql_state.into());
        self
    }
}

/// Portable column type codes derived from the driver-reported class name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Bit,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Real,
    Float,
    Double,
    Decimal,
    Numeric,
    Boolean,
    Text,
    Clob,
    Binary,
    Blob,
    Date,
    Timestamp,
    Other,
}

impl SqlType {
    /// Classifies a declared type or implementation class name.
    ///
    /// The upper-cased name is split into alphanumeric words, so `DATETIME`,
    /// `TIMESTAMP WITH TIME ZONE` and `java.sql.Timestamp` all land on
    /// [`SqlType::Timestamp`] while `POINT` or `INTERVAL` stay
    /// [`SqlType::Other`]. The order of the checks matters.
    pub fn from_class_name(name: &str) -> Self {
        let upper = name.to_ascii_uppercase();
        let words: Vec<&str> = upper
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|word| !word.is_empty())
            .collect();
        let any = |pred: fn(&str) -> bool| words.iter().any(|word| pred(word));

        if any(|w| w.starts_with("TIMESTAMP") || w.contains("DATETIME")) {
            SqlType::Timestamp
        } else if any(|w| w == "DATE") {
            SqlType::Date
        } else if any(|w| matches!(w, "BIGINT" | "INT8" | "BIGSERIAL")) {
            SqlType::BigInt
        } else if any(|w| matches!(w, "SMALLINT" | "INT2")) {
            SqlType::SmallInt
        } else if any(|w| w == "TINYINT") {
            SqlType::TinyInt
        } else if any(|w| matches!(w, "INT" | "INTEGER" | "INT4" | "MEDIUMINT" | "SERIAL")) {
            SqlType::Integer
        } else if any(|w| matches!(w, "BOOL" | "BOOLEAN")) {
            SqlType::Boolean
        } else if any(|w| w == "BIT") {
            SqlType::Bit
        } else if any(|w| w == "DOUBLE" || w == "FLOAT8") {
            SqlType::Double
        } else if any(|w| w == "FLOAT" || w == "FLOAT4") {
            SqlType::Float
        } else if any(|w| w == "REAL") {
            SqlType::Real
        } else if any(|w| w == "DECIMAL" || w == "DEC") {
            SqlType::Decimal
        } else if any(|w| w == "NUMERIC" || w == "NUMBER") {
            SqlType::Numeric
        } else if any(|w| w.ends_with("CLOB")) {
            SqlType::Clob
        } else if any(|w| w.ends_with("BLOB")) {
            SqlType::Blob
        } else if any(|w| w.ends_with("BINARY") || w == "BYTEA") {
            SqlType::Binary
        } else if any(|w| {
            w.starts_with("CHAR") || w.ends_with("CHAR") || w.ends_with("TEXT") || w == "STRING"
        }) {
            SqlType::Text
        } else {
            SqlType::Other
        }
    }

    /// Returns whether values of this type are numeric.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            SqlType::Bit
                | SqlType::TinyInt
                | SqlType::SmallInt
                | SqlType::Integer
                | SqlType::BigInt
                | SqlType::Real
                | SqlType::Float
                | SqlType::Double
                | SqlType::Decimal
                | SqlType::Numeric
        )
    }
}

/// Metadata for one column of one result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    /// 1-based column position
    pub position: usize,
    /// Declared column label
    pub label: String,
    /// Driver-reported implementation class or declared type, if any
    pub class_name: Option<String>,
}

impl ColumnDescriptor {
    pub fn new(position: usize, label: impl Into<String>, class_name: Option<&str>) -> Self {
        ColumnDescriptor {
            position,
            label: label.into(),
            class_name: class_name.map(str::to_string),
        }
    }

    /// The portable type the column metadata declares.
    pub fn sql_type(&self) -> SqlType {
        self.class_name
            .as_deref()
            .map(SqlType::from_class_name)
            .unwrap_or(SqlType::Other)
    }

    /// True when the metadata says this column really holds timestamps.
    pub fn declares_timestamp(&self) -> bool {
        self.sql_type() == SqlType::Timestamp
    }
}

/// How a cell should be read from the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadAs {
    /// Whatever the driver considers the natural representation
    Native,
    Text,
    Bytes,
    Timestamp,
    Date,
}

/// One cell as the driver hands it out.
///
/// Borrowed variants point into the cursor's current row and cannot outlive
/// it, which is exactly the lifetime of a large-object handle.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue<'row> {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Text(Cow<'row, str>),
    Bytes(Vec<u8>),
    /// Binary large object positioned on the current row
    Blob(&'row [u8]),
    /// Character large object positioned on the current row
    Clob(&'row str),
    Timestamp(NaiveDateTime),
    Date(NaiveDate),
    /// A vendor-specific wrapper the driver could not map to a standard type
    Vendor { type_name: &'row str, text: &'row str },
}

impl RawValue<'_> {
    /// Name of the concrete representation, used by quirk predicates.
    pub fn type_name(&self) -> &str {
        match self {
            RawValue::Null => "null",
            RawValue::Boolean(_) => "boolean",
            RawValue::Integer(_) => "integer",
            RawValue::Real(_) => "real",
            RawValue::Text(_) => "text",
            RawValue::Bytes(_) => "bytes",
            RawValue::Blob(_) => "blob",
            RawValue::Clob(_) => "clob",
            RawValue::Timestamp(_) => "timestamp",
            RawValue::Date(_) => "date",
            RawValue::Vendor { type_name, .. } => type_name,
        }
    }
}

/// A positioned, forward-only cursor over one result set.
pub trait ResultCursor {
    /// Column metadata for this result set
    fn columns(&self) -> &[ColumnDescriptor];

    /// Moves to the next row, returning false once the rows are exhausted
    fn advance(&mut self) -> DriverResult<bool>;

    /// Reads the cell at the 1-based `index` of the current row
    fn read(&self, index: usize, read_as: ReadAs) -> DriverResult<RawValue<'_>>;

    /// Releases the cursor; further calls fail
    fn close(&mut self) -> DriverResult<()>;
}

/// An execution-capable statement handle.
///
/// After [`Statement::execute`] the statement is positioned on its first
/// outcome; [`Statement::more_results`] moves to the next one. An update
/// count of -1 means no outcome is left.
pub trait Statement {
    /// True when the statement carries its own SQL and ignores the literal
    fn is_prepared(&self) -> bool {
        false
    }

    /// Runs the statement and reports whether the first outcome is a result set
    fn execute(&mut self, sql: Option<&str>) -> DriverResult<bool>;

    /// Opens the current outcome as a result set
    fn result_set(&mut self) -> DriverResult<Box<dyn ResultCursor + '_>>;

    /// Update count of the current outcome, or -1 when none remains
    fn update_count(&mut self) -> DriverResult<i64>;

    /// Moves to the next outcome and reports whether it is a result set
    fn more_results(&mut self) -> DriverResult<bool>;

    /// Hands out the warning chain of the last step and clears it
    fn take_warnings(&mut self) -> Option<Warning>;

    /// Releases the statement
    fn close(&mut self) -> DriverResult<()>;
}
