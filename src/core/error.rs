/// Error Module
///
/// This module defines the error type shared by the result walker, the value
/// normalizer and the driver backends.
use crate::core::db::driver::DriverError;
use thiserror::Error;

/// Comprehensive error type for resultwalk.
///
/// Only genuine failures end up here. Close failures, missing optional
/// columns and known driver coercion quirks are absorbed where they happen.
#[derive(Error, Debug)]
pub enum WalkError {
    /// Errors raised directly by rusqlite (opening a database, pragmas)
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A driver call failed while walking outcomes
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// The initial statement execution failed; no outcome was produced
    #[error("Execution error: {0}")]
    Execution(#[source] DriverError),

    /// Reading a cell failed for a reason no quirk accounts for
    #[error("Could not read column {column}: {source}")]
    ValueRead {
        column: usize,
        #[source]
        source: DriverError,
    },

    /// A single row was required but the result was empty
    #[error("Empty result set, expected one row")]
    EmptyResult,

    /// A single row was required but several were returned
    #[error("Result set larger than one row ({0} rows)")]
    TooManyResults(usize),

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON export errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Type alias for Result to use WalkError as the error type.
pub type Result<T> = std::result::Result<T, WalkError>;
