/// Result Walker Module
///
/// Executes a statement and drains every outcome the driver produces, in
/// driver order: result sets are rendered into a text table, update counts
/// into a one-line summary, and warnings are reported after every step.

use crate::core::db::driver::{DriverError, ResultCursor, Statement};
use crate::core::db::quirks::QuirkTable;
use crate::core::db::resource::CursorGuard;
use crate::core::db::value::normalize;
use crate::core::db::warning::{report_warnings, Notice};
use crate::core::{Result, WalkError};
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

/// Separator placed between the cells of a rendered row
pub const DEFAULT_SEPARATOR: &str = "\t";
/// Text rendered for SQL NULL
pub const DEFAULT_NULL_TEXT: &str = "NULL";

/// One rendered outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderedOutcome {
    /// A result set: header line, one line per row
    Table {
        header: String,
        rows: Vec<String>,
        /// False when rendering stopped on a read failure
        complete: bool,
    },
    UpdateCount { count: u64 },
}

impl RenderedOutcome {
    /// Rows rendered (tables) or rows affected (update counts)
    pub fn row_count(&self) -> u64 {
        match self {
            RenderedOutcome::Table { rows, .. } => rows.len() as u64,
            RenderedOutcome::UpdateCount { count } => *count,
        }
    }
}

impl fmt::Display for RenderedOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderedOutcome::Table {
                header,
                rows,
                complete,
            } => {
                write!(f, "{}", header)?;
                for row in rows {
                    write!(f, "\n{}", row)?;
                }
                if *complete {
                    write!(f, "\n{} row(s) affected", rows.len())?;
                }
                Ok(())
            }
            RenderedOutcome::UpdateCount { count } => write!(f, "{} row(s) affected", count),
        }
    }
}

/// Everything a walk produced, in order.
///
/// Output already recorded stays when a walk fails part way.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Transcript {
    pub outcomes: Vec<RenderedOutcome>,
    pub notices: Vec<Notice>,
}

impl Transcript {
    pub fn new() -> Self {
        Transcript::default()
    }

    /// Rendered text blocks joined by newlines
    pub fn render(&self) -> String {
        self.outcomes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn begin_table(&mut self, header: String) {
        self.outcomes.push(RenderedOutcome::Table {
            header,
            rows: Vec::new(),
            complete: false,
        });
    }

    fn push_row(&mut self, line: String) {
        if let Some(RenderedOutcome::Table { rows, .. }) = self.outcomes.last_mut() {
            rows.push(line);
        }
    }

    fn finish_table(&mut self) {
        if let Some(RenderedOutcome::Table { complete, .. }) = self.outcomes.last_mut() {
            *complete = true;
        }
        if let Some(table) = self.outcomes.last() {
            info!("\n{}", table);
        }
    }

    fn push_update_count(&mut self, count: u64) {
        let outcome = RenderedOutcome::UpdateCount { count };
        info!("{}", outcome);
        self.outcomes.push(outcome);
    }
}

/// Drives a statement through all of its outcomes.
#[derive(Debug, Clone)]
pub struct ResultWalker {
    quirks: QuirkTable,
    separator: String,
    null_text: String,
}

impl Default for ResultWalker {
    fn default() -> Self {
        ResultWalker::new(QuirkTable::standard())
    }
}

impl ResultWalker {
    pub fn new(quirks: QuirkTable) -> Self {
        ResultWalker {
            quirks,
            separator: DEFAULT_SEPARATOR.to_string(),
            null_text: DEFAULT_NULL_TEXT.to_string(),
        }
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn with_null_text(mut self, null_text: impl Into<String>) -> Self {
        self.null_text = null_text.into();
        self
    }

    pub fn quirks(&self) -> &QuirkTable {
        &self.quirks
    }

    /// Executes `statement` and returns everything it produced.
    ///
    /// Prepared statements run their own SQL; others run `sql`.
    ///
    /// # Errors
    ///
    /// `WalkError::Execution` when the initial execution fails,
    /// `WalkError::ValueRead` when a cell cannot be read and
    /// `WalkError::Driver` when the driver fails while moving between outcomes.
    pub fn execute(&self, statement: &mut dyn Statement, sql: Option<&str>) -> Result<Transcript> {
        let mut transcript = Transcript::new();
        self.walk(statement, sql, &mut transcript)?;
        Ok(transcript)
    }

    /// Like [`ResultWalker::execute`], recording into `transcript` as it goes
    /// so that partial output survives a failure.
    pub fn walk(
        &self,
        statement: &mut dyn Statement,
        sql: Option<&str>,
        transcript: &mut Transcript,
    ) -> Result<()> {
        let literal = if statement.is_prepared() { None } else { sql };
        let mut is_result_set = statement.execute(literal).map_err(WalkError::Execution)?;
        transcript.notices.extend(report_warnings(statement));

        loop {
            if is_result_set {
                let mut cursor = CursorGuard::new(statement.result_set()?);
                self.render_rows(&mut *cursor, transcript)?;
            } else {
                let count = statement.update_count()?;
                if count == -1 {
                    break;
                }
                let count = u64::try_from(count)
                    .map_err(|_| DriverError::new(format!("invalid update count {}", count)))?;
                transcript.push_update_count(count);
            }

            is_result_set = statement.more_results()?;
            transcript.notices.extend(report_warnings(statement));
        }

        debug!(outcomes = transcript.outcomes.len(), "walk finished");
        Ok(())
    }

    fn render_rows<C>(&self, cursor: &mut C, transcript: &mut Transcript) -> Result<()>
    where
        C: ResultCursor + ?Sized,
    {
        let columns = cursor.columns().to_vec();
        let header = columns
            .iter()
            .map(|column| column.label.as_str())
            .collect::<Vec<_>>()
            .join(&self.separator);
        transcript.begin_table(header);

        while cursor.advance()? {
            let mut cells = Vec::with_capacity(columns.len());
            for column in &columns {
                let value = normalize(&*cursor, column.position, &self.quirks)?;
                cells.push(value.render(&self.null_text));
            }
            transcript.push_row(cells.join(&self.separator));
        }

        transcript.finish_table();
        Ok(())
    }
}
