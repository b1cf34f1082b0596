//! Unit-of-work idempotency guard
//!
//! Tracks, for one composition, which logical units have been dispatched.
//! Membership moves `Absent -> Reserved -> {Succeeded, Failed}`; the
//! check for absence and the reservation happen under one lock, so two
//! concurrently evaluated paths can never both win the same unit.
//!
//! A guard belongs to exactly one composition. Clones share the same set
//! (so completion hooks can settle entries); independent compositions must
//! each create their own guard.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tracing::debug;

/// Membership state of one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    /// Never reserved
    Absent,
    /// Reserved and dispatched, outcome not known yet
    Reserved,
    /// Dispatched and resolved
    Succeeded,
    /// Dispatched and failed
    Failed,
}

impl UnitState {
    /// Whether the unit has reached an outcome
    pub fn is_terminal(self) -> bool {
        matches!(self, UnitState::Succeeded | UnitState::Failed)
    }
}

/// Set of reserved units for one composition.
#[derive(Debug)]
pub struct IdempotencyGuard<K> {
    units: Arc<Mutex<HashMap<K, UnitState>>>,
}

impl<K> Clone for IdempotencyGuard<K> {
    fn clone(&self) -> Self {
        Self {
            units: Arc::clone(&self.units),
        }
    }
}

impl<K: Eq + Hash + Clone + std::fmt::Debug> Default for IdempotencyGuard<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Clone + std::fmt::Debug> IdempotencyGuard<K> {
    /// Create an empty guard
    pub fn new() -> Self {
        Self {
            units: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Reserve `key` if nobody has yet.
    ///
    /// Returns `true` when this call moved the key from absent to reserved,
    /// `false` when the key was already present in any state.
    pub fn try_reserve(&self, key: &K) -> bool {
        let mut units = self.units.lock();
        if units.contains_key(key) {
            return false;
        }
        units.insert(key.clone(), UnitState::Reserved);
        true
    }

    /// Record the outcome of a reserved unit.
    ///
    /// Terminal states are final; settling an absent or already settled key
    /// is ignored.
    pub fn settle(&self, key: &K, succeeded: bool) {
        let mut units = self.units.lock();
        match units.get_mut(key) {
            Some(state @ UnitState::Reserved) => {
                *state = if succeeded {
                    UnitState::Succeeded
                } else {
                    UnitState::Failed
                };
            }
            other => debug!(?key, state = ?other, "ignoring settle of non-reserved unit"),
        }
    }

    /// Current state of `key`.
    pub fn state(&self, key: &K) -> UnitState {
        self.units
            .lock()
            .get(key)
            .copied()
            .unwrap_or(UnitState::Absent)
    }

    /// Number of units that were ever reserved
    pub fn len(&self) -> usize {
        self.units.lock().len()
    }

    /// Whether no unit was reserved yet
    pub fn is_empty(&self) -> bool {
        self.units.lock().is_empty()
    }
}
