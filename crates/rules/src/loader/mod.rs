//! Rule-file loading and hot-reload.
//!
//! The mounted rules directory holds two documents, `ignore-config` and
//! `block-config`. A background task re-reads them on a fixed interval and
//! swaps successfully parsed rule sets into the shared [`RuleStore`].
//! A missing or unparseable file never clears the active configuration.

mod core;
mod error;
mod reloader;
mod store;

#[cfg(test)]
mod tests;

pub use self::core::{ReloadOutcome, ReloadReport, RuleLoader, BLOCK_CONFIG_FILE, IGNORE_CONFIG_FILE};
pub use self::error::{Result, RuleError};
pub use self::reloader::spawn_reloader;
pub use self::store::{RuleSnapshot, RuleStore};
