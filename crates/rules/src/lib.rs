//! Ignore/block rule engine.
//!
//! This crate provides:
//! - `*` wildcard pattern matching over plain strings
//! - Ignore and block rule sets deserialized from JSON (YAML accepted)
//! - Evaluation of a change event against both rule sets
//! - A shared copy-on-write rule store with periodic hot-reload from disk

pub mod evaluator;
pub mod loader;
pub mod pattern;
pub mod schema;

pub use evaluator::{should_block, should_ignore, BlockMatch, Dimension};
pub use loader::{spawn_reloader, ReloadOutcome, RuleError, RuleLoader, RuleSnapshot, RuleStore};
pub use pattern::{matches, matches_any};
pub use schema::{parse_rule_set, BlockRules, IgnoreRules, DEFAULT_BLOCK_MESSAGE};
