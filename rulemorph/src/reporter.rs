//! Reporting of contained failures
//!
//! Failures inside a rule never stop a transformation. Each one is handed to
//! the engine's [`Reporter`] instead, with enough position information to
//! find the rule, action and record involved.

use crate::TransformError;
use std::fmt;
use std::sync::Mutex;
use tracing::warn;

/// A failure that was contained during a transformation
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// Index of the record in the input sequence
    pub record: usize,
    pub rule: usize,
    /// `None` when the rule's condition failed
    pub action: Option<usize>,
    /// Set when the record is a list and the action failed on one element
    pub element: Option<usize>,
    pub error: TransformError,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "record {}, rule {}", self.record, self.rule)?;
        match self.action {
            Some(action) => write!(f, ", action {}", action)?,
            None => write!(f, ", condition")?,
        }
        if let Some(element) = self.element {
            write!(f, ", element {}", element)?;
        }
        write!(f, ": {}", self.error)
    }
}

pub trait Reporter: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Logs every diagnostic as a `tracing` warning
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, diagnostic: Diagnostic) {
        warn!(
            record = diagnostic.record,
            rule = diagnostic.rule,
            action = ?diagnostic.action,
            element = ?diagnostic.element,
            error = %diagnostic.error,
            "rule step failed and was skipped"
        );
    }
}

/// Collects diagnostics in memory
#[derive(Debug, Default)]
pub struct MemoryReporter {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of everything reported so far
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.lock().clone()
    }

    /// Remove and return everything reported so far
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Diagnostic>> {
        self.diagnostics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Reporter for MemoryReporter {
    fn report(&self, diagnostic: Diagnostic) {
        self.lock().push(diagnostic);
    }
}
