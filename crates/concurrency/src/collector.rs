//! Aggregate error collection
//!
//! An [`ErrorCollector`] is an append-only sink shared by the pieces of one
//! composition. Failures keep their unit attribution; nothing is collapsed
//! into a single opaque error. [`ErrorCollector::finish`] hands the ordered
//! list to the caller and the collector is discarded with the composition.

use p4runner_core::Error;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// One failed unit.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitFailure<K> {
    /// Unit the failure belongs to
    pub unit: K,
    /// What went wrong
    pub error: Error,
}

impl<K: fmt::Display> fmt::Display for UnitFailure<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.unit, self.error)
    }
}

/// Ordered list of failures from one composition.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorList<K> {
    failures: Vec<UnitFailure<K>>,
}

impl<K> Default for ErrorList<K> {
    fn default() -> Self {
        Self {
            failures: Vec::new(),
        }
    }
}

impl<K> ErrorList<K> {
    /// Whether every unit succeeded
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of failed units
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Failures in collection order
    pub fn iter(&self) -> std::slice::Iter<'_, UnitFailure<K>> {
        self.failures.iter()
    }

    /// Failure recorded for `unit`, if any
    pub fn for_unit(&self, unit: &K) -> Option<&Error>
    where
        K: PartialEq,
    {
        self.failures
            .iter()
            .find(|f| &f.unit == unit)
            .map(|f| &f.error)
    }

    /// `Ok(())` when empty, the list itself otherwise
    pub fn into_result(self) -> std::result::Result<(), Self> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl<K> IntoIterator for ErrorList<K> {
    type Item = UnitFailure<K>;
    type IntoIter = std::vec::IntoIter<UnitFailure<K>>;

    fn into_iter(self) -> Self::IntoIter {
        self.failures.into_iter()
    }
}

impl<K: fmt::Display> fmt::Display for ErrorList<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} unit(s) failed", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "\n  {}", failure)?;
        }
        Ok(())
    }
}

/// Thread-safe, append-only failure sink.
#[derive(Debug)]
pub struct ErrorCollector<K> {
    failures: Arc<Mutex<Vec<UnitFailure<K>>>>,
}

impl<K> Clone for ErrorCollector<K> {
    fn clone(&self) -> Self {
        Self {
            failures: Arc::clone(&self.failures),
        }
    }
}

impl<K> Default for ErrorCollector<K> {
    fn default() -> Self {
        Self {
            failures: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<K: Clone> ErrorCollector<K> {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a failure
    pub fn push(&self, unit: K, error: Error) {
        self.failures.lock().push(UnitFailure { unit, error });
    }

    /// Number of failures collected so far
    pub fn len(&self) -> usize {
        self.failures.lock().len()
    }

    /// Whether nothing has failed so far
    pub fn is_empty(&self) -> bool {
        self.failures.lock().is_empty()
    }

    /// Snapshot of everything collected so far.
    pub fn finish(&self) -> ErrorList<K> {
        ErrorList {
            failures: self.failures.lock().clone(),
        }
    }
}
