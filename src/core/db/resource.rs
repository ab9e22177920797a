/// Resource Release Module
///
/// Closing a handle must never mask the real result of a call, so close
/// failures are logged and dropped here. The guards release on every exit
/// path, including early returns through `?`.

use crate::core::db::driver::{ResultCursor, Statement};
use std::ops::{Deref, DerefMut};
use tracing::debug;

/// Closes a result set, ignoring any failure.
pub fn close_result_set(cursor: &mut (dyn ResultCursor + '_)) {
    if let Err(err) = cursor.close() {
        debug!(error = %err, "Could not close result set");
    }
}

/// Closes a statement, ignoring any failure.
pub fn close_statement(statement: &mut (dyn Statement + '_)) {
    if let Err(err) = statement.close() {
        debug!(error = %err, "Could not close statement");
    }
}

/// Owns an open result set and closes it when dropped.
pub struct CursorGuard<'a> {
    cursor: Box<dyn ResultCursor + 'a>,
}

impl<'a> CursorGuard<'a> {
    pub fn new(cursor: Box<dyn ResultCursor + 'a>) -> Self {
        CursorGuard { cursor }
    }
}

impl<'a> Deref for CursorGuard<'a> {
    type Target = dyn ResultCursor + 'a;

    fn deref(&self) -> &Self::Target {
        self.cursor.as_ref()
    }
}

impl<'a> DerefMut for CursorGuard<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.cursor.as_mut()
    }
}

impl Drop for CursorGuard<'_> {
    fn drop(&mut self) {
        close_result_set(self.cursor.as_mut());
    }
}

/// Borrows a statement and closes it when dropped.
pub struct StatementGuard<'s, S: Statement + ?Sized> {
    statement: &'s mut S,
}

impl<'s, S: Statement + ?Sized> StatementGuard<'s, S> {
    pub fn new(statement: &'s mut S) -> Self {
        StatementGuard { statement }
    }
}

impl<S: Statement + ?Sized> Deref for StatementGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.statement
    }
}

impl<S: Statement + ?Sized> DerefMut for StatementGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.statement
    }
}

impl<S: Statement + ?Sized> Drop for StatementGuard<'_, S> {
    fn drop(&mut self) {
        if let Err(err) = self.statement.close() {
            debug!(error = %err, "Could not close statement");
        }
    }
}
