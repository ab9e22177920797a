/// Row Helpers
///
/// Small helpers for callers that collect rows out of a walk or a query.

use crate::core::{Result, WalkError};

/// Returns the only element of `results`.
///
/// # Errors
///
/// `WalkError::EmptyResult` when there is no element and
/// `WalkError::TooManyResults` when there is more than one.
pub fn required_single_result<T>(results: Vec<T>) -> Result<T> {
    let count = results.len();
    let mut results = results.into_iter();
    match (results.next(), count) {
        (None, _) => Err(WalkError::EmptyResult),
        (Some(only), 1) => Ok(only),
        (Some(_), count) => Err(WalkError::TooManyResults(count)),
    }
}
