//! Shared findings aggregate.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::types::{Crossing, Direction, EdgeId};

/// Crossings classified as dangerous during one run.
///
/// Cloning yields another handle to the same set. Every insertion holds the
/// lock for its whole read-modify-write, so concurrent workers can neither
/// lose an insertion nor record the same crossing twice.
#[derive(Debug, Clone, Default)]
pub struct FindingsSet {
    inner: Arc<Mutex<BTreeMap<(EdgeId, Direction), Crossing>>>,
}

impl FindingsSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a dangerous crossing.
    ///
    /// Returns `false` if the same crossing was already recorded.
    pub fn insert(&self, crossing: Crossing) -> bool {
        let mut inner = self.inner.lock();
        let key = crossing.key();
        if inner.contains_key(&key) {
            return false;
        }
        inner.insert(key, crossing);
        true
    }

    /// Number of findings.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether there are no findings.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Copy of all findings, ordered by edge id then direction.
    pub fn snapshot(&self) -> Vec<Crossing> {
        self.inner.lock().values().cloned().collect()
    }
}
