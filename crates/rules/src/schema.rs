//! Ignore and block rule sets.
//!
//! Rule sets are immutable once built. A reload replaces the whole value.
//! Every dimension is a list of `*` glob patterns; an empty list does not
//! constrain anything.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::loader::RuleError;

/// Denial message used when a block rule set does not configure one.
pub const DEFAULT_BLOCK_MESSAGE: &str = "This operation is blocked by cluster change policy";

/// Events matching any pattern here are allowed but not recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IgnoreRules {
    #[serde(default)]
    pub namespace_patterns: Vec<String>,
    #[serde(default)]
    pub name_patterns: Vec<String>,
    #[serde(default)]
    pub resource_kind_patterns: Vec<String>,
}

impl IgnoreRules {
    pub fn pattern_count(&self) -> usize {
        self.namespace_patterns.len() + self.name_patterns.len() + self.resource_kind_patterns.len()
    }
}

/// Events matching here are denied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlockRules {
    #[serde(default)]
    pub namespace_patterns: Vec<String>,
    #[serde(default)]
    pub name_patterns: Vec<String>,
    #[serde(default)]
    pub resource_kind_patterns: Vec<String>,
    /// Operation gate, compared case-insensitively. Empty means every
    /// operation is eligible.
    #[serde(default)]
    pub operation_patterns: Vec<String>,
    #[serde(default)]
    pub message: String,
}

impl BlockRules {
    pub fn pattern_count(&self) -> usize {
        self.namespace_patterns.len() + self.name_patterns.len() + self.resource_kind_patterns.len()
    }

    /// The configured denial message, or [`DEFAULT_BLOCK_MESSAGE`].
    pub fn effective_message(&self) -> &str {
        if self.message.is_empty() {
            DEFAULT_BLOCK_MESSAGE
        } else {
            &self.message
        }
    }
}

/// Parse a rule set document.
///
/// JSON is the primary format. Documents that are not JSON objects are
/// retried as YAML, since mounted config maps are often written that way.
pub fn parse_rule_set<T: DeserializeOwned>(text: &str) -> Result<T, RuleError> {
    match serde_json::from_str(text) {
        Ok(rules) => Ok(rules),
        Err(json_err) if text.trim_start().starts_with('{') => Err(json_err.into()),
        Err(_) => Ok(serde_yaml::from_str(text)?),
    }
}
