//! Result types for extraction output.

use serde::{Deserialize, Serialize};

use crate::scope::Scope;

/// How a requested scope was resolved to the scope actually applied.
///
/// Emitted alongside every extraction so callers (and the `--debug` CLI
/// flag) can see what happened, in particular whether an `auto` scope
/// was replaced by a handler's scope or degraded to `main`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeResolution {
    /// The scope the caller asked for.
    pub requested: Scope,
    /// The scope that was actually applied.
    pub used: Scope,
    /// True iff resolution replaced the requested scope.
    pub resolved: bool,
    /// The handler id, when a handler was consulted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler_id: Option<String>,
}

impl ScopeResolution {
    /// A resolution record for a scope applied exactly as requested.
    #[must_use]
    pub fn direct(scope: Scope) -> Self {
        Self {
            requested: scope.clone(),
            used: scope,
            resolved: false,
            handler_id: None,
        }
    }
}

/// Result of a scoped extraction: the formatted content plus the
/// resolution record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub content: String,
    pub resolution: ScopeResolution,
}
