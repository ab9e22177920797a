/// Scripted Database Driver Module
///
/// Replays a queue of outcomes, warnings and per-cell read failures so the
/// walker and normalizer can be exercised against vendor behaviour (Oracle
/// wrappers, SQL Server coercion failures, warning chains) without the
/// vendor's database.

use crate::core::db::driver::{
    ColumnDescriptor, DriverError, DriverResult, RawValue, ReadAs, ResultCursor, Statement,
};
use crate::core::db::value::Value;
use crate::core::db::warning::Warning;
use chrono::{NaiveDate, NaiveDateTime};
use std::borrow::Cow;
use std::cell::Cell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

/// What a scripted cell returns from a native read.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Clob(String),
    Timestamp(NaiveDateTime),
    Date(NaiveDate),
    Vendor { type_name: String, text: String },
}

/// One scripted cell: its native read plus optional corrective reads.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptedCell {
    native: std::result::Result<CellValue, DriverError>,
    text: Option<String>,
    timestamp: Option<NaiveDateTime>,
    date: Option<NaiveDate>,
}

impl ScriptedCell {
    pub fn new(value: CellValue) -> Self {
        ScriptedCell {
            native: Ok(value),
            text: None,
            timestamp: None,
            date: None,
        }
    }

    /// A cell whose native read fails with `err`
    pub fn failing(err: DriverError) -> Self {
        ScriptedCell {
            native: Err(err),
            text: None,
            timestamp: None,
            date: None,
        }
    }

    /// What a text read returns
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// What a timestamp read returns
    pub fn timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// What a date read returns
    pub fn date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    fn read(&self, read_as: ReadAs) -> DriverResult<RawValue<'_>> {
        let native = self.native.as_ref();
        match read_as {
            ReadAs::Native => native.map(native_raw).map_err(Clone::clone),
            ReadAs::Text => match (&self.text, native) {
                (Some(text), _) => Ok(RawValue::Text(Cow::Borrowed(text.as_str()))),
                (None, Ok(CellValue::Null)) => Ok(RawValue::Null),
                (None, Ok(value)) => Ok(RawValue::Text(Cow::Owned(
                    Value::detach(native_raw(value)).to_string(),
                ))),
                (None, Err(err)) => Err(err.clone()),
            },
            ReadAs::Bytes => match native {
                Ok(CellValue::Blob(bytes)) => Ok(RawValue::Bytes(bytes.clone())),
                Ok(CellValue::Text(text)) | Ok(CellValue::Clob(text)) => {
                    Ok(RawValue::Bytes(text.as_bytes().to_vec()))
                }
                Ok(CellValue::Null) => Ok(RawValue::Null),
                _ => Err(DriverError::new("value cannot be read as bytes")),
            },
            ReadAs::Timestamp => match (self.timestamp, native) {
                (Some(ts), _) => Ok(RawValue::Timestamp(ts)),
                (None, Ok(CellValue::Timestamp(ts))) => Ok(RawValue::Timestamp(*ts)),
                (None, Ok(CellValue::Date(d))) => d
                    .and_hms_opt(0, 0, 0)
                    .map(RawValue::Timestamp)
                    .ok_or_else(|| DriverError::new("date out of range")),
                (None, Ok(CellValue::Null)) => Ok(RawValue::Null),
                _ => Err(DriverError::new("value cannot be read as a timestamp")),
            },
            ReadAs::Date => match (self.date, native) {
                (Some(d), _) => Ok(RawValue::Date(d)),
                (None, Ok(CellValue::Date(d))) => Ok(RawValue::Date(*d)),
                (None, Ok(CellValue::Timestamp(ts))) => Ok(RawValue::Date(ts.date())),
                (None, Ok(CellValue::Null)) => Ok(RawValue::Null),
                _ => Err(DriverError::new("value cannot be read as a date")),
            },
        }
    }
}

impl From<CellValue> for ScriptedCell {
    fn from(value: CellValue) -> Self {
        ScriptedCell::new(value)
    }
}

fn native_raw(value: &CellValue) -> RawValue<'_> {
    match value {
        CellValue::Null => RawValue::Null,
        CellValue::Boolean(b) => RawValue::Boolean(*b),
        CellValue::Integer(i) => RawValue::Integer(*i),
        CellValue::Real(f) => RawValue::Real(*f),
        CellValue::Text(t) => RawValue::Text(Cow::Borrowed(t.as_str())),
        CellValue::Blob(b) => RawValue::Blob(b.as_slice()),
        CellValue::Clob(c) => RawValue::Clob(c.as_str()),
        CellValue::Timestamp(ts) => RawValue::Timestamp(*ts),
        CellValue::Date(d) => RawValue::Date(*d),
        CellValue::Vendor { type_name, text } => RawValue::Vendor {
            type_name: type_name.as_str(),
            text: text.as_str(),
        },
    }
}

/// A scripted result set.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptedResultSet {
    columns: Vec<ColumnDescriptor>,
    rows: Vec<Vec<ScriptedCell>>,
    fail_close: bool,
}

impl ScriptedResultSet {
    /// Creates a result set with untyped columns labelled `labels`
    pub fn new(labels: &[&str]) -> Self {
        let columns = labels
            .iter()
            .enumerate()
            .map(|(i, label)| ColumnDescriptor::new(i + 1, *label, None))
            .collect();
        ScriptedResultSet::with_columns(columns)
    }

    pub fn with_columns(columns: Vec<ColumnDescriptor>) -> Self {
        ScriptedResultSet {
            columns,
            rows: Vec::new(),
            fail_close: false,
        }
    }

    pub fn row<I, C>(mut self, cells: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ScriptedCell>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
        self
    }

    /// Makes closing this result set fail
    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }
}

/// What the scripted statement produces next.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedOutcome {
    Rows(ScriptedResultSet),
    UpdateCount(i64),
}

/// Forward-only cursor over scripted rows.
#[derive(Debug)]
pub struct ScriptedCursor {
    columns: Vec<ColumnDescriptor>,
    rows: std::vec::IntoIter<Vec<ScriptedCell>>,
    current: Option<Vec<ScriptedCell>>,
    fail_close: bool,
    closed: bool,
    close_count: Rc<Cell<usize>>,
}

impl ScriptedCursor {
    pub fn new(columns: Vec<ColumnDescriptor>, rows: Vec<Vec<ScriptedCell>>) -> Self {
        ScriptedCursor {
            columns,
            rows: rows.into_iter(),
            current: None,
            fail_close: false,
            closed: false,
            close_count: Rc::new(Cell::new(0)),
        }
    }

    fn from_result_set(result_set: ScriptedResultSet, close_count: Rc<Cell<usize>>) -> Self {
        let mut cursor = ScriptedCursor::new(result_set.columns, result_set.rows);
        cursor.fail_close = result_set.fail_close;
        cursor.close_count = close_count;
        cursor
    }
}

impl ResultCursor for ScriptedCursor {
    fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    fn advance(&mut self) -> DriverResult<bool> {
        if self.closed {
            return Err(DriverError::new("result set is closed"));
        }
        self.current = self.rows.next();
        Ok(self.current.is_some())
    }

    fn read(&self, index: usize, read_as: ReadAs) -> DriverResult<RawValue<'_>> {
        let row = self
            .current
            .as_ref()
            .ok_or_else(|| DriverError::new("cursor is not positioned on a row"))?;
        let cell = index
            .checked_sub(1)
            .and_then(|i| row.get(i))
            .ok_or_else(|| DriverError::new(format!("invalid column index {}", index)))?;
        cell.read(read_as)
    }

    fn close(&mut self) -> DriverResult<()> {
        self.closed = true;
        self.current = None;
        self.close_count.set(self.close_count.get() + 1);
        if self.fail_close {
            Err(DriverError::new("scripted close failure"))
        } else {
            Ok(())
        }
    }
}

/// A statement that replays scripted outcomes in order.
#[derive(Debug, Default)]
pub struct ScriptedStatement {
    script: VecDeque<ScriptedOutcome>,
    current: Option<ScriptedOutcome>,
    warnings: HashMap<usize, Warning>,
    pending_warnings: Option<Warning>,
    step: usize,
    execute_error: Option<DriverError>,
    prepared: bool,
    executed_sql: Option<String>,
    closed_result_sets: Rc<Cell<usize>>,
    closed: bool,
}

impl ScriptedStatement {
    pub fn new() -> Self {
        ScriptedStatement::default()
    }

    /// Queues a result set outcome
    pub fn then_result_set(mut self, result_set: ScriptedResultSet) -> Self {
        self.script.push_back(ScriptedOutcome::Rows(result_set));
        self
    }

    /// Queues an update count outcome
    pub fn then_update_count(mut self, count: i64) -> Self {
        self.script.push_back(ScriptedOutcome::UpdateCount(count));
        self
    }

    /// Attaches a warning chain to an execution step (0 is `execute`, then
    /// one step per `more_results`)
    pub fn warning_at(mut self, step: usize, warning: Warning) -> Self {
        self.warnings.insert(step, warning);
        self
    }

    /// Makes `execute` fail with `err`
    pub fn failing_execute(mut self, err: DriverError) -> Self {
        self.execute_error = Some(err);
        self
    }

    /// Marks the statement as carrying its own SQL
    pub fn prepared(mut self) -> Self {
        self.prepared = true;
        self
    }

    /// SQL passed to `execute`, if any
    pub fn executed_sql(&self) -> Option<&str> {
        self.executed_sql.as_deref()
    }

    /// Number of result sets that have been closed
    pub fn closed_result_sets(&self) -> usize {
        self.closed_result_sets.get()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn next_step(&mut self) -> bool {
        self.current = self.script.pop_front();
        self.pending_warnings = self.warnings.remove(&self.step);
        self.step += 1;
        matches!(self.current, Some(ScriptedOutcome::Rows(_)))
    }
}

impl Statement for ScriptedStatement {
    fn is_prepared(&self) -> bool {
        self.prepared
    }

    fn execute(&mut self, sql: Option<&str>) -> DriverResult<bool> {
        if let Some(err) = self.execute_error.take() {
            return Err(err);
        }
        self.executed_sql = sql.map(str::to_string);
        Ok(self.next_step())
    }

    fn result_set(&mut self) -> DriverResult<Box<dyn ResultCursor + '_>> {
        match self.current.take() {
            Some(ScriptedOutcome::Rows(result_set)) => Ok(Box::new(ScriptedCursor::from_result_set(
                result_set,
                Rc::clone(&self.closed_result_sets),
            ))),
            other => {
                self.current = other;
                Err(DriverError::new("current outcome is not a result set"))
            }
        }
    }

    fn update_count(&mut self) -> DriverResult<i64> {
        match self.current {
            Some(ScriptedOutcome::UpdateCount(count)) => Ok(count),
            _ => Ok(-1),
        }
    }

    fn more_results(&mut self) -> DriverResult<bool> {
        if self.closed {
            return Err(DriverError::new("statement is closed"));
        }
        Ok(self.next_step())
    }

    fn take_warnings(&mut self) -> Option<Warning> {
        self.pending_warnings.take()
    }

    fn close(&mut self) -> DriverResult<()> {
        self.closed = true;
        self.current = None;
        self.script.clear();
        Ok(())
    }
}
