/// Core Module for resultwalk
///
/// This module contains the driver seam, the value normalization layer and the
/// result walker, together with the shared error type.

pub mod db;
pub mod error;

// Re-export commonly used types for convenience
pub use error::{Result, WalkError};
