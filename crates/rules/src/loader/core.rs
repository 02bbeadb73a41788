//! Core [`RuleLoader`] struct: reads the two rule documents from disk.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::schema::{parse_rule_set, BlockRules, IgnoreRules};

use super::error::Result;
use super::store::RuleStore;

/// File name of the ignore rule document inside the rules directory.
pub const IGNORE_CONFIG_FILE: &str = "ignore-config";
/// File name of the block rule document inside the rules directory.
pub const BLOCK_CONFIG_FILE: &str = "block-config";

/// Outcome of reloading a single rule document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// New rules parsed and swapped in.
    Updated,
    /// File parsed to the rules already active; nothing swapped.
    Unchanged,
    /// File absent; previous rules kept.
    Missing,
    /// Read or parse failed; previous rules kept.
    Kept { error: String },
}

/// Per-file outcomes of one reload pass.
#[derive(Debug, Clone)]
pub struct ReloadReport {
    pub ignore: ReloadOutcome,
    pub block: ReloadOutcome,
}

/// Reads `ignore-config` and `block-config` from a mounted directory into a
/// shared [`RuleStore`].
pub struct RuleLoader {
    rules_dir: PathBuf,
    store: Arc<RuleStore>,
}

impl RuleLoader {
    pub fn new(rules_dir: PathBuf, store: Arc<RuleStore>) -> Self {
        Self { rules_dir, store }
    }

    /// Get the rules directory path.
    pub fn rules_dir(&self) -> &Path {
        &self.rules_dir
    }

    /// Get the shared store this loader writes into.
    pub fn store(&self) -> Arc<RuleStore> {
        Arc::clone(&self.store)
    }

    /// Re-read both documents and swap in whatever parsed.
    pub fn reload(&self) -> ReloadReport {
        let ignore = self.reload_one::<IgnoreRules>(
            IGNORE_CONFIG_FILE,
            |current| self.store.ignore().is_some_and(|active| *active == *current),
            |rules| self.store.replace_ignore(rules),
        );
        let block = self.reload_one::<BlockRules>(
            BLOCK_CONFIG_FILE,
            |current| self.store.block().is_some_and(|active| *active == *current),
            |rules| self.store.replace_block(rules),
        );
        ReloadReport { ignore, block }
    }

    fn reload_one<T: DeserializeOwned>(
        &self,
        file: &str,
        is_active: impl Fn(&T) -> bool,
        swap: impl Fn(T),
    ) -> ReloadOutcome {
        let path = self.rules_dir.join(file);
        let rules = match load_file::<T>(&path) {
            Ok(Some(rules)) => rules,
            Ok(None) => {
                debug!(path = %path.display(), "rule file not present, keeping current rules");
                return ReloadOutcome::Missing;
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to load rule file, keeping previous version"
                );
                return ReloadOutcome::Kept { error: e.to_string() };
            }
        };

        if is_active(&rules) {
            return ReloadOutcome::Unchanged;
        }
        swap(rules);
        info!(path = %path.display(), "reloaded rule file");
        ReloadOutcome::Updated
    }
}

/// Read and parse a rule document; `Ok(None)` when the file does not exist.
pub(super) fn load_file<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    parse_rule_set(&contents).map(Some)
}
