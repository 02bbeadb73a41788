//! Rule evaluation against a candidate change event.
//!
//! Both checks are pure functions of the event and the rule set. Within a
//! rule set the dimensions are OR'd: one matching pattern in any dimension
//! is enough.

use kubetrail_core::ChangeEvent;

use crate::pattern::{first_match, matches_any};
use crate::schema::{BlockRules, IgnoreRules};

/// Which event field a block pattern matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Namespace,
    Name,
    ResourceKind,
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dimension::Namespace => write!(f, "namespace"),
            Dimension::Name => write!(f, "name"),
            Dimension::ResourceKind => write!(f, "resource_kind"),
        }
    }
}

/// A block rule hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockMatch {
    /// The pattern that matched, verbatim from the rule set.
    pub pattern: String,
    pub dimension: Dimension,
    /// Denial message returned to the caller.
    pub message: String,
}

/// Whether the event should be skipped (allowed, not recorded).
pub fn should_ignore(event: &ChangeEvent, rules: Option<&IgnoreRules>) -> bool {
    let Some(rules) = rules else {
        return false;
    };
    matches_any(&event.namespace, &rules.namespace_patterns)
        || matches_any(&event.name, &rules.name_patterns)
        || matches_any(&event.resource_kind, &rules.resource_kind_patterns)
}

/// Check the event against the block rules.
///
/// A non-empty operation list gates the whole rule set. Dimensions are then
/// tried in the fixed order namespace, name, resource kind, and the first
/// matching pattern wins.
pub fn should_block(event: &ChangeEvent, rules: Option<&BlockRules>) -> Option<BlockMatch> {
    let rules = rules?;

    if !rules.operation_patterns.is_empty()
        && !rules
            .operation_patterns
            .iter()
            .any(|op| op.eq_ignore_ascii_case(event.operation.as_str()))
    {
        return None;
    }

    let checks = [
        (Dimension::Namespace, event.namespace.as_str(), &rules.namespace_patterns),
        (Dimension::Name, event.name.as_str(), &rules.name_patterns),
        (Dimension::ResourceKind, event.resource_kind.as_str(), &rules.resource_kind_patterns),
    ];

    checks.into_iter().find_map(|(dimension, value, patterns)| {
        first_match(value, patterns).map(|pattern| BlockMatch {
            pattern: pattern.to_string(),
            dimension,
            message: rules.effective_message().to_string(),
        })
    })
}
