/// Database Module
///
/// This module provides the driver-agnostic execution layer of resultwalk,
/// organized into focused submodules.
///
/// ## Architecture
///
/// - **Driver Seam** (`driver.rs`): the `Statement`/`ResultCursor` contract backends implement
/// - **Value Normalization** (`value.rs`, `quirks.rs`): detached values and per-backend quirk tables
/// - **Column Resolution** (`column.rs`): case-insensitive lookup of a column by name
/// - **Warning Chains** (`warning.rs`): classification of driver notices
/// - **Result Walking** (`walker.rs`): drains every outcome of an execution into a transcript
/// - **Resource Release** (`resource.rs`): close helpers and RAII guards that never fail
/// - **Backends** (`sqlite.rs`, `mock.rs`): rusqlite and a scripted in-memory driver
///
/// ## Error Handling
///
/// All fallible operations return the crate's `WalkError`; driver calls return `DriverError`.
pub mod column;
pub mod driver;
pub mod mock;
pub mod quirks;
pub mod resource;
pub mod rows;
pub mod sqlite;
pub mod value;
pub mod walker;
pub mod warning;

pub use column::{resolve, IdentifierCase};
pub use driver::{
    ColumnDescriptor, DriverError, DriverResult, RawValue, ReadAs, ResultCursor, SqlType,
    Statement,
};
pub use quirks::{Backend, QuirkTable};
pub use resource::{close_result_set, close_statement, CursorGuard, StatementGuard};
pub use rows::required_single_result;
pub use sqlite::SqliteStatement;
pub use value::{normalize, Value};
pub use walker::{RenderedOutcome, ResultWalker, Transcript};
pub use warning::{report, report_warnings, Notice, Warning};
