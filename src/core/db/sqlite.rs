/// SQLite Backend Module
///
/// Implements the driver seam on top of rusqlite. A script is split into its
/// statements with [`rusqlite::Batch`] one statement at a time: `execute` runs
/// the first, every `more_results` prepares and runs the next. A statement
/// that returns columns is a result set whose rows are stepped on demand; any
/// other statement yields its change count.

use crate::core::db::driver::{
    ColumnDescriptor, DriverError, DriverResult, RawValue, ReadAs, ResultCursor, Statement,
};
use crate::core::db::warning::Warning;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::{FromSql, FromSqlError, Value as SqlValue, ValueRef};
use rusqlite::{Batch, Connection, Rows};
use std::borrow::Cow;
use tracing::debug;

impl From<rusqlite::Error> for DriverError {
    fn from(err: rusqlite::Error) -> Self {
        let code = match &err {
            rusqlite::Error::SqliteFailure(failure, _) => failure.extended_code,
            _ => 0,
        };
        DriverError::new(err.to_string()).with_code(code)
    }
}

impl From<FromSqlError> for DriverError {
    fn from(err: FromSqlError) -> Self {
        DriverError::new(err.to_string())
    }
}

/// The outcome the statement is currently positioned on.
enum Step<'conn> {
    /// A query not yet stepped; rows are fetched through the cursor
    Rows(rusqlite::Statement<'conn>),
    Changes(usize),
}

/// A SQLite script bound to a connection.
///
/// The script is part of the statement, so the SQL passed to `execute` is
/// ignored.
pub struct SqliteStatement<'conn, 'sql> {
    conn: &'conn Connection,
    sql: &'sql str,
    batch: Batch<'conn, 'sql>,
    current: Option<Step<'conn>>,
    steps: usize,
    closed: bool,
}

impl<'conn, 'sql> SqliteStatement<'conn, 'sql> {
    pub fn new(conn: &'conn Connection, sql: &'sql str) -> Self {
        SqliteStatement {
            conn,
            sql,
            batch: Batch::new(conn, sql),
            current: None,
            steps: 0,
            closed: false,
        }
    }

    /// Prepares and runs the next statement of the script.
    ///
    /// Returns true when it is a result set.
    fn step(&mut self) -> DriverResult<bool> {
        // Release the previous statement before the next one is prepared
        self.current = None;
        let Some(mut stmt) = self.batch.next()? else {
            debug!(steps = self.steps, "SQLite script finished");
            return Ok(false);
        };
        self.steps += 1;

        if stmt.column_count() > 0 {
            self.current = Some(Step::Rows(stmt));
            return Ok(true);
        }

        let changed = stmt.execute([])?;
        let counted = stmt
            .expanded_sql()
            .map(|text| counts_changes(&text))
            .unwrap_or(false);
        self.current = Some(Step::Changes(if counted { changed } else { 0 }));
        Ok(false)
    }
}

fn describe(stmt: &rusqlite::Statement<'_>) -> Vec<ColumnDescriptor> {
    stmt.columns()
        .iter()
        .enumerate()
        .map(|(i, column)| ColumnDescriptor::new(i + 1, column.name(), column.decl_type()))
        .collect()
}

/// True when the statement's change count belongs to it.
///
/// SQLite only resets the change counter for DML, so other statements would
/// report the count of the last DML statement.
fn counts_changes(sql: &str) -> bool {
    let keyword = leading_keyword(sql).to_ascii_uppercase();
    matches!(
        keyword.as_str(),
        "INSERT" | "UPDATE" | "DELETE" | "REPLACE" | "WITH"
    )
}

fn leading_keyword(sql: &str) -> &str {
    let mut rest = sql.trim_start();
    loop {
        if let Some(comment) = rest.strip_prefix("--") {
            rest = comment.split_once('\n').map(|(_, tail)| tail).unwrap_or("").trim_start();
        } else if let Some(comment) = rest.strip_prefix("/*") {
            rest = comment.split_once("*/").map(|(_, tail)| tail).unwrap_or("").trim_start();
        } else {
            break;
        }
    }
    let end = rest
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(rest.len());
    &rest[..end]
}

impl Statement for SqliteStatement<'_, '_> {
    fn is_prepared(&self) -> bool {
        true
    }

    fn execute(&mut self, _sql: Option<&str>) -> DriverResult<bool> {
        if self.closed {
            return Err(DriverError::new("statement is closed"));
        }
        self.batch = Batch::new(self.conn, self.sql);
        self.steps = 0;
        let is_result_set = self.step()?;
        if self.current.is_none() {
            return Err(DriverError::new("no SQL to execute"));
        }
        Ok(is_result_set)
    }

    fn result_set(&mut self) -> DriverResult<Box<dyn ResultCursor + '_>> {
        match self.current.as_mut() {
            Some(Step::Rows(stmt)) => {
                let columns = describe(stmt);
                let rows = stmt.query([])?;
                Ok(Box::new(SqliteCursor {
                    columns,
                    rows,
                    current: None,
                    closed: false,
                }))
            }
            _ => Err(DriverError::new("current outcome is not a result set")),
        }
    }

    fn update_count(&mut self) -> DriverResult<i64> {
        match self.current {
            Some(Step::Changes(count)) => i64::try_from(count)
                .map_err(|_| DriverError::new(format!("change count {} out of range", count))),
            _ => Ok(-1),
        }
    }

    fn more_results(&mut self) -> DriverResult<bool> {
        if self.closed {
            return Err(DriverError::new("statement is closed"));
        }
        self.step()
    }

    fn take_warnings(&mut self) -> Option<Warning> {
        // SQLite reports no warning chain
        None
    }

    fn close(&mut self) -> DriverResult<()> {
        self.closed = true;
        self.current = None;
        Ok(())
    }
}

/// Cursor stepping the rows of one SQLite query.
///
/// Only the row the cursor is positioned on is held in memory.
pub struct SqliteCursor<'stmt> {
    columns: Vec<ColumnDescriptor>,
    rows: Rows<'stmt>,
    current: Option<Vec<SqlValue>>,
    closed: bool,
}

impl ResultCursor for SqliteCursor<'_> {
    fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    fn advance(&mut self) -> DriverResult<bool> {
        if self.closed {
            return Err(DriverError::new("result set is closed"));
        }
        let width = self.columns.len();
        self.current = match self.rows.next()? {
            Some(row) => Some(
                (0..width)
                    .map(|i| row.get_ref(i).map(SqlValue::from))
                    .collect::<rusqlite::Result<Vec<_>>>()?,
            ),
            None => None,
        };
        Ok(self.current.is_some())
    }

    fn read(&self, index: usize, read_as: ReadAs) -> DriverResult<RawValue<'_>> {
        let row = self
            .current
            .as_ref()
            .ok_or_else(|| DriverError::new("cursor is not positioned on a row"))?;
        let value = index
            .checked_sub(1)
            .and_then(|i| row.get(i))
            .ok_or_else(|| DriverError::new(format!("invalid column index {}", index)))?;
        read_value(value, read_as)
    }

    fn close(&mut self) -> DriverResult<()> {
        self.closed = true;
        self.current = None;
        Ok(())
    }
}

fn read_value(value: &SqlValue, read_as: ReadAs) -> DriverResult<RawValue<'_>> {
    if let SqlValue::Null = value {
        return Ok(RawValue::Null);
    }
    let raw = match read_as {
        ReadAs::Native => match value {
            SqlValue::Integer(i) => RawValue::Integer(*i),
            SqlValue::Real(f) => RawValue::Real(*f),
            SqlValue::Text(t) => RawValue::Text(Cow::Borrowed(t.as_str())),
            SqlValue::Blob(b) => RawValue::Blob(b.as_slice()),
            SqlValue::Null => RawValue::Null,
        },
        ReadAs::Text => match value {
            SqlValue::Integer(i) => RawValue::Text(Cow::Owned(i.to_string())),
            SqlValue::Real(f) => RawValue::Text(Cow::Owned(f.to_string())),
            SqlValue::Text(t) => RawValue::Text(Cow::Borrowed(t.as_str())),
            SqlValue::Blob(b) => RawValue::Text(String::from_utf8_lossy(b)),
            SqlValue::Null => RawValue::Null,
        },
        ReadAs::Bytes => match value {
            SqlValue::Blob(b) => RawValue::Bytes(b.clone()),
            SqlValue::Text(t) => RawValue::Bytes(t.as_bytes().to_vec()),
            other => return Err(DriverError::new(format!("cannot read {:?} as bytes", other))),
        },
        ReadAs::Timestamp => RawValue::Timestamp(NaiveDateTime::column_result(ValueRef::from(value))?),
        ReadAs::Date => RawValue::Date(NaiveDate::column_result(ValueRef::from(value))?),
    };
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "
            CREATE TABLE events (
                id INTEGER PRIMARY KEY,
                name TEXT,
                happened_at DATETIME,
                happened_on DATE,
                payload BLOB
            );
            INSERT INTO events (name, happened_at, happened_on, payload)
                VALUES ('launch', '2024-03-01 12:30:45.250', '2024-03-01', X'CAFE');
        ",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_outcomes_follow_script_order() {
        let conn = conn();
        let mut stmt = SqliteStatement::new(
            &conn,
            "UPDATE events SET name = 'liftoff'; SELECT id FROM events; CREATE TABLE t (x);",
        );

        assert!(!stmt.execute(None).unwrap());
        assert_eq!(stmt.update_count().unwrap(), 1);
        assert!(stmt.more_results().unwrap());
        {
            let mut cursor = stmt.result_set().unwrap();
            assert_eq!(cursor.columns()[0].label, "id");
            assert!(cursor.advance().unwrap());
            assert_eq!(cursor.read(1, ReadAs::Native).unwrap(), RawValue::Integer(1));
            assert!(!cursor.advance().unwrap());
        }
        assert!(!stmt.more_results().unwrap());
        // DDL keeps the stale DML counter out of its outcome
        assert_eq!(stmt.update_count().unwrap(), 0);
        assert!(!stmt.more_results().unwrap());
        assert_eq!(stmt.update_count().unwrap(), -1);
    }

    #[test]
    fn test_later_statements_run_only_when_reached() {
        let conn = conn();
        let mut stmt = SqliteStatement::new(
            &conn,
            "UPDATE events SET name = 'first'; UPDATE events SET name = 'second';",
        );

        assert!(!stmt.execute(None).unwrap());
        let name: String = conn
            .query_row("SELECT name FROM events", [], |row| row.get(0))
            .unwrap();
        assert_eq!(name, "first");

        assert!(!stmt.more_results().unwrap());
        let name: String = conn
            .query_row("SELECT name FROM events", [], |row| row.get(0))
            .unwrap();
        assert_eq!(name, "second");
    }

    #[test]
    fn test_later_failure_surfaces_from_more_results() {
        let conn = conn();
        let mut stmt =
            SqliteStatement::new(&conn, "UPDATE events SET name = 'x'; SELECT * FROM missing");

        assert!(!stmt.execute(None).unwrap());
        assert_eq!(stmt.update_count().unwrap(), 1);
        let err = stmt.more_results().unwrap_err();
        assert!(err.message.contains("no such table"));
    }

    #[test]
    fn test_declared_types_are_reported() {
        let conn = conn();
        let mut stmt =
            SqliteStatement::new(&conn, "SELECT happened_at, happened_on, 1 AS one FROM events");
        assert!(stmt.execute(None).unwrap());
        let cursor = stmt.result_set().unwrap();
        let classes: Vec<_> = cursor
            .columns()
            .iter()
            .map(|c| c.class_name.as_deref())
            .collect();
        assert_eq!(classes, vec![Some("DATETIME"), Some("DATE"), None]);
    }

    #[test]
    fn test_corrective_reads() {
        let conn = conn();
        let mut stmt =
            SqliteStatement::new(&conn, "SELECT happened_at, happened_on, payload FROM events");
        stmt.execute(None).unwrap();
        let mut cursor = stmt.result_set().unwrap();
        cursor.advance().unwrap();

        let expected = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_milli_opt(12, 30, 45, 250)
            .unwrap();
        assert_eq!(cursor.read(1, ReadAs::Timestamp).unwrap(), RawValue::Timestamp(expected));
        assert_eq!(cursor.read(2, ReadAs::Date).unwrap(), RawValue::Date(expected.date()));
        assert_eq!(cursor.read(3, ReadAs::Native).unwrap(), RawValue::Blob(&[0xCA, 0xFE]));
        assert!(cursor.read(4, ReadAs::Native).is_err());
    }

    #[test]
    fn test_script_ignores_literal() {
        let conn = conn();
        let mut stmt = SqliteStatement::new(&conn, "DELETE FROM events");
        assert!(stmt.is_prepared());
        assert!(!stmt.execute(Some("SELECT 1")).unwrap());
        assert_eq!(stmt.update_count().unwrap(), 1);
    }

    #[test]
    fn test_execute_failure() {
        let conn = conn();
        let mut stmt = SqliteStatement::new(&conn, "SELECT * FROM nonexistent_table");
        let err = stmt.execute(None).unwrap_err();
        assert!(err.message.contains("no such table"));
        assert!(SqliteStatement::new(&conn, "  -- nothing\n").execute(None).is_err());
    }

    #[test]
    fn test_leading_keyword() {
        assert_eq!(leading_keyword("  insert into t values (1)"), "insert");
        assert_eq!(leading_keyword("-- note\nDELETE FROM t"), "DELETE");
        assert_eq!(leading_keyword("/* hint */ UPDATE t SET x = 1"), "UPDATE");
        assert!(counts_changes("with x as (select 1) delete from t"));
        assert!(!counts_changes("CREATE TABLE t (x)"));
    }
}
