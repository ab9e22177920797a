/// Driver Quirk Tables
///
/// Drivers disagree on how they hand out the same logical value. Instead of
/// sprinkling vendor checks through the normalizer, each backend supplies an
/// ordered table of predicates and the corrective read to perform when one
/// matches. The first matching entry wins.

use crate::core::db::driver::{ColumnDescriptor, DriverError, RawValue, ReadAs, SqlType};
use serde::Deserialize;
use std::fmt;

/// Message SQL Server's JDBC-era drivers raise when a CHAR column is read
/// through a SMALLINT accessor.
pub const CHAR_TO_SMALLINT_MESSAGE: &str = "The conversion from char to SMALLINT is unsupported.";

/// Known database backends with a dedicated quirk table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// No vendor quirks, only the portable corrections
    Standard,
    #[default]
    Sqlite,
    Oracle,
    SqlServer,
}

/// A read failure the driver is known to raise for representable values.
#[derive(Clone, Copy)]
pub struct ReadFailureQuirk {
    pub name: &'static str,
    pub matches: fn(&DriverError) -> bool,
    /// How to read the cell again instead of failing
    pub retry_as: ReadAs,
}

/// A value the driver hands out in the wrong shape.
#[derive(Clone, Copy)]
pub struct ValueQuirk {
    pub name: &'static str,
    pub matches: fn(&RawValue<'_>, &ColumnDescriptor) -> bool,
    /// Picks the corrective read, possibly from column metadata
    pub reread_as: fn(&ColumnDescriptor) -> ReadAs,
}

impl fmt::Debug for ReadFailureQuirk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadFailureQuirk")
            .field("name", &self.name)
            .field("retry_as", &self.retry_as)
            .finish()
    }
}

impl fmt::Debug for ValueQuirk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueQuirk").field("name", &self.name).finish()
    }
}

/// Ordered quirk entries for one backend.
#[derive(Debug, Clone, Default)]
pub struct QuirkTable {
    read_failures: Vec<ReadFailureQuirk>,
    values: Vec<ValueQuirk>,
}

impl QuirkTable {
    /// An empty table: every value is returned as the driver reads it.
    pub fn empty() -> Self {
        QuirkTable::default()
    }

    /// Portable corrections every backend shares.
    pub fn standard() -> Self {
        QuirkTable::empty().with_value_quirk(ValueQuirk {
            name: "date_in_timestamp_column",
            matches: |raw, column| matches!(raw, RawValue::Date(_)) && column.declares_timestamp(),
            reread_as: |_| ReadAs::Timestamp,
        })
    }

    /// Oracle returns its own TIMESTAMP and DATE wrappers, and DATE columns
    /// carry a time portion the standard date type drops.
    pub fn oracle() -> Self {
        let mut table = QuirkTable::empty()
            .with_value_quirk(ValueQuirk {
                name: "oracle_timestamp",
                matches: |raw, _| raw.type_name().starts_with("oracle.sql.TIMESTAMP"),
                reread_as: |_| ReadAs::Timestamp,
            })
            .with_value_quirk(ValueQuirk {
                name: "oracle_date",
                matches: |raw, _| raw.type_name().starts_with("oracle.sql.DATE"),
                reread_as: |column| {
                    if column.declares_timestamp() {
                        ReadAs::Timestamp
                    } else {
                        ReadAs::Date
                    }
                },
            });
        table.extend(QuirkTable::standard());
        table
    }

    /// SQL Server drivers refuse to coerce CHAR metadata columns to SMALLINT.
    pub fn sql_server() -> Self {
        let mut table = QuirkTable::empty().with_read_failure_quirk(ReadFailureQuirk {
            name: "sqlserver_char_to_smallint",
            matches: |err| err.message == CHAR_TO_SMALLINT_MESSAGE,
            retry_as: ReadAs::Text,
        });
        table.extend(QuirkTable::standard());
        table
    }

    /// SQLite stores dates and timestamps as text in columns declared with a
    /// date-like type.
    pub fn sqlite() -> Self {
        let mut table = QuirkTable::empty()
            .with_value_quirk(ValueQuirk {
                name: "sqlite_text_timestamp",
                matches: |raw, column| matches!(raw, RawValue::Text(_)) && column.declares_timestamp(),
                reread_as: |_| ReadAs::Timestamp,
            })
            .with_value_quirk(ValueQuirk {
                name: "sqlite_text_date",
                matches: |raw, column| {
                    matches!(raw, RawValue::Text(_)) && column.sql_type() == SqlType::Date
                },
                reread_as: |_| ReadAs::Date,
            });
        table.extend(QuirkTable::standard());
        table
    }

    pub fn for_backend(backend: Backend) -> Self {
        match backend {
            Backend::Standard => QuirkTable::standard(),
            Backend::Sqlite => QuirkTable::sqlite(),
            Backend::Oracle => QuirkTable::oracle(),
            Backend::SqlServer => QuirkTable::sql_server(),
        }
    }

    /// Appends a read-failure quirk after the existing ones
    pub fn with_read_failure_quirk(mut self, quirk: ReadFailureQuirk) -> Self {
        self.read_failures.push(quirk);
        self
    }

    /// Appends a value quirk after the existing ones
    pub fn with_value_quirk(mut self, quirk: ValueQuirk) -> Self {
        self.values.push(quirk);
        self
    }

    /// Appends every entry of `other`, keeping its order
    pub fn extend(&mut self, other: QuirkTable) {
        self.read_failures.extend(other.read_failures);
        self.values.extend(other.values);
    }

    /// First read-failure quirk that explains `err`
    pub fn read_failure(&self, err: &DriverError) -> Option<&ReadFailureQuirk> {
        self.read_failures.iter().find(|quirk| (quirk.matches)(err))
    }

    /// First value quirk that applies to `raw` in `column`
    pub fn value(&self, raw: &RawValue<'_>, column: &ColumnDescriptor) -> Option<&ValueQuirk> {
        self.values.iter().find(|quirk| (quirk.matches)(raw, column))
    }

    /// Names of all entries, read failures first
    pub fn names(&self) -> Vec<&'static str> {
        self.read_failures
            .iter()
            .map(|q| q.name)
            .chain(self.values.iter().map(|q| q.name))
            .collect()
    }
}
