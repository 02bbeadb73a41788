//! Shared, copy-on-write holder of the active rule sets.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::schema::{BlockRules, IgnoreRules};

/// A consistent view of both rule sets.
///
/// Cloning is cheap; readers keep their snapshot even if a reload swaps in
/// newer rules mid-decision.
#[derive(Debug, Clone, Default)]
pub struct RuleSnapshot {
    pub ignore: Option<Arc<IgnoreRules>>,
    pub block: Option<Arc<BlockRules>>,
}

/// The only mutable state on the decision path.
///
/// Rule sets are never edited in place: writers replace the `Arc` under the
/// write lock. A poisoned lock is recovered rather than propagated, so a
/// panicking writer can't turn every later decision into an error.
#[derive(Debug, Default)]
pub struct RuleStore {
    inner: RwLock<RuleSnapshot>,
}

impl RuleStore {
    pub fn new(ignore: Option<IgnoreRules>, block: Option<BlockRules>) -> Self {
        Self {
            inner: RwLock::new(RuleSnapshot {
                ignore: ignore.map(Arc::new),
                block: block.map(Arc::new),
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, RuleSnapshot> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, RuleSnapshot> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current rule sets. The read lock is held only for the clone.
    pub fn snapshot(&self) -> RuleSnapshot {
        self.read().clone()
    }

    pub fn ignore(&self) -> Option<Arc<IgnoreRules>> {
        self.read().ignore.clone()
    }

    pub fn block(&self) -> Option<Arc<BlockRules>> {
        self.read().block.clone()
    }

    pub fn replace_ignore(&self, rules: IgnoreRules) {
        self.write().ignore = Some(Arc::new(rules));
    }

    pub fn replace_block(&self, rules: BlockRules) {
        self.write().block = Some(Arc::new(rules));
    }
}
