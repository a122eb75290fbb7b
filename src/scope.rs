//! Scope specifications and their parsing.
//!
//! A [`Scope`] names the region of a document to extract. It arrives as
//! a CLI string (`main`, `selector:h1,.post`, inline JSON) or as a JSON
//! object on the wire; both funnel through the same validation. The
//! enum is deliberately a tagged variant with exhaustive dispatch in
//! the engine, not a trait hierarchy.

use serde::{Deserialize, Serialize};

use crate::error::{ExtractError, Result};

/// Timeout bounds for function scopes, in milliseconds.
pub const MIN_FUNCTION_TIMEOUT_MS: u64 = 1;
pub const MAX_FUNCTION_TIMEOUT_MS: u64 = 60_000;

/// Default wall-clock timeout for function scopes, in milliseconds.
pub const DEFAULT_FUNCTION_TIMEOUT_MS: u64 = 5000;

/// A specification of which region of an HTML document to extract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Scope {
    /// The page's primary content region, after noise removal.
    Main,
    /// Everything under `<body>`, after minimal cleanup.
    Full,
    /// Defer to a handler lookup for the page URL; degrade to `Main`.
    Auto,
    /// One or more CSS selectors, with optional excludes applied inside
    /// each match.
    Selector {
        include: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exclude: Option<Vec<String>>,
    },
    /// A user-supplied JavaScript extraction function, evaluated in the
    /// sandbox. A missing timeout inherits the configured default.
    Function {
        code: String,
        #[serde(default, rename = "timeout", skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
    /// A named handler, resolved through the handler collaborator.
    Handler { id: String },
}

impl Scope {
    /// Construct a validated selector scope.
    pub fn selector<I, S>(include: I, exclude: Option<Vec<String>>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let scope = Self::Selector {
            include: include.into_iter().map(Into::into).collect(),
            exclude,
        };
        scope.validate()?;
        Ok(scope)
    }

    /// Construct a validated function scope with the default timeout.
    pub fn function(code: impl Into<String>) -> Result<Self> {
        let scope = Self::Function {
            code: code.into(),
            timeout_ms: None,
        };
        scope.validate()?;
        Ok(scope)
    }

    /// Check the per-variant invariants.
    ///
    /// Serde enforces shapes; this enforces the value constraints that
    /// JSON cannot express (non-empty include list, timeout range).
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Main | Self::Full | Self::Auto => Ok(()),
            Self::Selector { include, exclude } => {
                if include.iter().all(|s| s.trim().is_empty()) {
                    return Err(ExtractError::InvalidScope(
                        "selector scope requires at least one include selector".to_string(),
                    ));
                }
                if let Some(exclude) = exclude {
                    if exclude.iter().any(|s| s.trim().is_empty()) {
                        return Err(ExtractError::InvalidScope(
                            "exclude selectors must be non-empty strings".to_string(),
                        ));
                    }
                }
                Ok(())
            }
            Self::Function { code, timeout_ms } => {
                if code.trim().is_empty() {
                    return Err(ExtractError::InvalidScope(
                        "function scope requires a non-empty code string".to_string(),
                    ));
                }
                if let Some(timeout_ms) = timeout_ms {
                    if !(MIN_FUNCTION_TIMEOUT_MS..=MAX_FUNCTION_TIMEOUT_MS).contains(timeout_ms) {
                        return Err(ExtractError::InvalidScope(format!(
                            "function timeout must be between {MIN_FUNCTION_TIMEOUT_MS} and \
                             {MAX_FUNCTION_TIMEOUT_MS} ms, got {timeout_ms}"
                        )));
                    }
                }
                Ok(())
            }
            Self::Handler { id } => {
                if id.trim().is_empty() {
                    return Err(ExtractError::InvalidScope(
                        "handler scope requires a non-empty id".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }
}

/// Parse a scope argument as it appears on the CLI or in a request.
///
/// Accepted forms:
/// - the literals `main`, `full`, `auto`
/// - `selector:` followed by a comma-separated include list
/// - a JSON object (`{"type": ...}`) in the wire format
///
/// `exclude_arg` is a comma-separated exclude list that only combines
/// with the `selector:` form; it is ignored for the other forms.
pub fn parse_scope(arg: &str, exclude_arg: Option<&str>) -> Result<Scope> {
    let arg = arg.trim();
    if arg.is_empty() {
        return Err(ExtractError::InvalidScope("scope is empty".to_string()));
    }

    let scope = match arg {
        "main" => Scope::Main,
        "full" => Scope::Full,
        "auto" => Scope::Auto,
        _ if arg.starts_with("selector:") => {
            let include = split_selector_list(&arg["selector:".len()..]);
            if include.is_empty() {
                return Err(ExtractError::InvalidScope(
                    "selector scope requires at least one include selector".to_string(),
                ));
            }
            let exclude = exclude_arg
                .map(split_selector_list)
                .filter(|list| !list.is_empty());
            Scope::Selector { include, exclude }
        }
        _ if arg.starts_with('{') => serde_json::from_str::<Scope>(arg)
            .map_err(|err| ExtractError::InvalidScope(format!("invalid scope JSON: {err}")))?,
        other => {
            return Err(ExtractError::InvalidScope(format!(
                "unknown scope {other:?}; expected main, full, auto, selector:..., or a JSON object"
            )));
        }
    };

    scope.validate()?;
    Ok(scope)
}

/// Parse a scope from an already-decoded JSON value (the HTTP layer's
/// request body path).
pub fn scope_from_value(value: &serde_json::Value) -> Result<Scope> {
    let scope: Scope = serde_json::from_value(value.clone())
        .map_err(|err| ExtractError::InvalidScope(format!("invalid scope object: {err}")))?;
    scope.validate()?;
    Ok(scope)
}

/// Render a scope back to its argument form, for logging and for the
/// resolution record.
///
/// `main`/`full`/`auto` come back as their literals; the structured
/// variants come back as wire-format JSON, so everything this function
/// emits round-trips through [`parse_scope`].
#[must_use]
pub fn scope_to_string(scope: &Scope) -> String {
    match scope {
        Scope::Main => "main".to_string(),
        Scope::Full => "full".to_string(),
        Scope::Auto => "auto".to_string(),
        other => serde_json::to_string(other).unwrap_or_else(|_| "{}".to_string()),
    }
}

fn split_selector_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}
