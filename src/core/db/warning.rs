/// Warning Chain Module
///
/// Drivers attach a linked chain of advisory notices to each execution step
/// (`PRINT` output, informational messages, non-fatal diagnostics). This
/// module walks such a chain and classifies every entry.

use crate::core::db::driver::Statement;
use serde::Serialize;
use std::fmt;
use tracing::info;

/// One notice in a driver warning chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// Vendor error code, 0 when absent
    pub code: i32,
    pub sql_state: Option<String>,
    pub message: String,
    next: Option<Box<Warning>>,
}

impl Warning {
    pub fn new(message: impl Into<String>) -> Self {
        Warning {
            code: 0,
            sql_state: None,
            message: message.into(),
            next: None,
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

    /// Appends `warning` at the end of this chain.
    pub fn chain(mut self, warning: Warning) -> Self {
        let mut tail = &mut self.next;
        while let Some(node) = tail {
            tail = &mut node.next;
        }
        *tail = Some(Box::new(warning));
        self
    }

    /// The next warning in the chain
    pub fn next_warning(&self) -> Option<&Warning> {
        self.next.as_deref()
    }

    /// Iterates the chain starting at this warning
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            current: Some(self),
        }
    }

    /// Builds a chain from a sequence, keeping its order.
    pub fn from_chain<I>(warnings: I) -> Option<Warning>
    where
        I: IntoIterator<Item = Warning>,
        I::IntoIter: DoubleEndedIterator,
    {
        warnings.into_iter().rev().fold(None, |next, mut warning| {
            warning.next = next.map(Box::new);
            Some(warning)
        })
    }
}

// Unlink iteratively so long chains do not recurse on drop.
impl Drop for Warning {
    fn drop(&mut self) {
        let mut next = self.next.take();
        while let Some(mut node) = next {
            next = node.next.take();
        }
    }
}

/// Borrowing iterator over a warning chain.
pub struct Iter<'a> {
    current: Option<&'a Warning>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Warning;

    fn next(&mut self) -> Option<Self::Item> {
        let warning = self.current?;
        self.current = warning.next.as_deref();
        Some(warning)
    }
}

/// Consuming iterator over a warning chain.
pub struct IntoIter {
    current: Option<Warning>,
}

impl Iterator for IntoIter {
    type Item = Warning;

    fn next(&mut self) -> Option<Self::Item> {
        let mut warning = self.current.take()?;
        self.current = warning.next.take().map(|next| *next);
        Some(warning)
    }
}

impl IntoIterator for Warning {
    type Item = Warning;
    type IntoIter = IntoIter;

    fn into_iter(self) -> IntoIter {
        IntoIter {
            current: Some(self),
        }
    }
}

/// A classified warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// Plain driver output such as `PRINT` text
    Output { message: String },
    /// A structured database message
    Diagnostic {
        code: i32,
        message: String,
        sql_state: Option<String>,
    },
}

impl Notice {
    /// Warnings with neither code nor SQL state are plain output.
    pub fn classify(warning: &Warning) -> Notice {
        if warning.code == 0 && warning.sql_state.is_none() {
            Notice::Output {
                message: warning.message.clone(),
            }
        } else {
            Notice::Diagnostic {
                code: warning.code,
                message: warning.message.clone(),
                sql_state: warning.sql_state.clone(),
            }
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Output { message } => write!(f, "SQLOUT: {}", message),
            Notice::Diagnostic {
                code,
                message,
                sql_state,
            } => write!(
                f,
                "***** Database Message *****\nCode:     {}\nMessage:  {}\nSQLState: {}",
                code,
                message,
                sql_state.as_deref().unwrap_or("-")
            ),
        }
    }
}

/// Classifies every warning of a chain, in chain order.
pub fn report(chain: Option<Warning>) -> Vec<Notice> {
    chain
        .into_iter()
        .flatten()
        .map(|warning| {
            let notice = Notice::classify(&warning);
            info!("{}", notice);
            notice
        })
        .collect()
}

/// Takes the statement's pending warnings, clearing them, and classifies them.
///
/// A second call for the same execution step yields nothing.
pub fn report_warnings(statement: &mut dyn Statement) -> Vec<Notice> {
    report(statement.take_warnings())
}
