//! Capability-restricted JavaScript sandbox.
//!
//! Evaluates a user-supplied `(api, url) => ...` function against a
//! pre-materialized copy of the DOM (see [`cache`]). The engine is a
//! fresh QuickJS runtime per invocation with no host functions
//! installed, so the code has no ambient authority: no network, no
//! filesystem, no timers, no state carried between calls. Wall-clock
//! preemption runs at the engine level through the interrupt handler,
//! and the heap is capped per invocation.

pub(crate) mod cache;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use regex::Regex;
use rquickjs::{Context, Runtime};
use tracing::debug;

use crate::bridge::DomBridge;
use crate::scope::{MAX_FUNCTION_TIMEOUT_MS, MIN_FUNCTION_TIMEOUT_MS};

const PRELUDE: &str = include_str!("prelude.js");

/// Why a sandbox invocation failed. Folded into
/// [`crate::ExtractError::FunctionScope`] at the module boundary.
#[derive(Debug, thiserror::Error)]
pub enum SandboxFailure {
    /// The code failed the cheap syntactic pre-checks.
    #[error("{0}")]
    Rejected(String),

    /// Evaluation exceeded its wall-clock budget and was preempted.
    #[error("evaluation timed out after {0} ms")]
    Timeout(u64),

    /// The code threw (or failed to compile).
    #[error("{0}")]
    Exception(String),

    /// The engine itself misbehaved.
    #[error("engine error: {0}")]
    Engine(String),
}

/// `(...) =>` at the start of the code.
#[allow(clippy::expect_used)]
static ARROW_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\([^)]*\)\s*=>").expect("valid regex"));

/// Pre-evaluation checks: shape first, then a defense-in-depth scan for
/// APIs the sandbox will never provide. The real boundary is the
/// engine's isolation; these exist to give authors a pointed message
/// instead of a null deref.
pub fn validate_source(code: &str) -> Result<(), SandboxFailure> {
    let trimmed = code.trim();
    if trimmed.is_empty() {
        return Err(SandboxFailure::Rejected(
            "function scope code is empty".to_string(),
        ));
    }

    let is_function_expr = ARROW_PREFIX_RE.is_match(trimmed)
        || trimmed.starts_with("function(")
        || trimmed.starts_with("function (")
        || trimmed.starts_with("(function");
    if !is_function_expr {
        return Err(SandboxFailure::Rejected(
            "code must be a function expression taking (api, url), e.g. \
             (api, url) => api.$('h1').text"
                .to_string(),
        ));
    }

    if trimmed.contains("document.") {
        return Err(SandboxFailure::Rejected(
            "document is not available in the sandbox; query through api.$() / api.$$()"
                .to_string(),
        ));
    }
    if trimmed.contains("fetch(") || trimmed.contains("await fetch") {
        return Err(SandboxFailure::Rejected(
            "network access is not available in the sandbox; the page HTML is api.html"
                .to_string(),
        ));
    }

    Ok(())
}

/// Evaluate user code against the bridge.
///
/// On success returns the function's result coerced to a string:
/// strings pass through, null/undefined become empty, everything else
/// is pretty-printed JSON.
pub fn evaluate(
    bridge: &DomBridge,
    code: &str,
    html: &str,
    url: &str,
    timeout_ms: u64,
    memory_limit: usize,
) -> Result<String, SandboxFailure> {
    validate_source(code)?;

    if !(MIN_FUNCTION_TIMEOUT_MS..=MAX_FUNCTION_TIMEOUT_MS).contains(&timeout_ms) {
        return Err(SandboxFailure::Rejected(format!(
            "timeout must be between {MIN_FUNCTION_TIMEOUT_MS} and {MAX_FUNCTION_TIMEOUT_MS} ms, \
             got {timeout_ms}"
        )));
    }

    let dom_cache = cache::build(bridge, code);
    let cache_json = serde_json::to_string(&dom_cache)
        .map_err(|err| SandboxFailure::Engine(err.to_string()))?;
    let html_json =
        serde_json::to_string(html).map_err(|err| SandboxFailure::Engine(err.to_string()))?;
    let url_json =
        serde_json::to_string(url).map_err(|err| SandboxFailure::Engine(err.to_string()))?;

    // The closing paren sits on its own line so a trailing line comment
    // in the user code cannot swallow it.
    let script = format!(
        "{PRELUDE}\n__pagescope_run({cache_json}, {html_json}, {url_json}, ({code}\n));"
    );

    debug!(
        timeout_ms,
        cached_nodes = dom_cache.nodes.len(),
        "evaluating function scope"
    );

    let runtime = Runtime::new().map_err(|err| SandboxFailure::Engine(err.to_string()))?;
    runtime.set_memory_limit(memory_limit);

    let timed_out = Arc::new(AtomicBool::new(false));
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    {
        let timed_out = Arc::clone(&timed_out);
        runtime.set_interrupt_handler(Some(Box::new(move || {
            if Instant::now() >= deadline {
                timed_out.store(true, Ordering::SeqCst);
                true
            } else {
                false
            }
        })));
    }

    let context =
        Context::full(&runtime).map_err(|err| SandboxFailure::Engine(err.to_string()))?;

    let outcome = context.with(|ctx| match ctx.eval::<String, _>(script) {
        Ok(value) => Ok(value),
        Err(rquickjs::Error::Exception) => {
            let caught = ctx.catch();
            let message = caught
                .as_exception()
                .and_then(rquickjs::Exception::message)
                .or_else(|| {
                    caught
                        .as_string()
                        .and_then(|s| s.to_string().ok())
                })
                .unwrap_or_else(|| "uncaught exception".to_string());
            Err(SandboxFailure::Exception(message))
        }
        Err(err) => Err(SandboxFailure::Engine(err.to_string())),
    });

    if timed_out.load(Ordering::SeqCst) {
        return Err(SandboxFailure::Timeout(timeout_ms));
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse;

    fn run(html: &str, code: &str) -> Result<String, SandboxFailure> {
        let doc = parse(html);
        let bridge = DomBridge::new(&doc);
        evaluate(&bridge, code, html, "https://example.com/", 5000, 32 * 1024 * 1024)
    }

    #[test]
    fn accepts_function_expression_shapes() {
        assert!(validate_source("(api, url) => api.html").is_ok());
        assert!(validate_source("function(api, url) { return api.url; }").is_ok());
        assert!(validate_source("(function(api, url) { return 1; })").is_ok());
    }

    #[test]
    fn rejects_non_function_code() {
        assert!(matches!(
            validate_source("return 42;"),
            Err(SandboxFailure::Rejected(_))
        ));
        assert!(matches!(validate_source("  "), Err(SandboxFailure::Rejected(_))));
    }

    #[test]
    fn rejects_document_and_fetch() {
        let err = validate_source("(api, u) => document.title").unwrap_err();
        assert!(err.to_string().contains("api.$"));
        let err = validate_source("(api, u) => fetch(u)").unwrap_err();
        assert!(err.to_string().contains("network"));
    }

    #[test]
    fn string_results_pass_through() {
        let out = run("<p>x</p>", "(api, url) => 'plain'").unwrap();
        assert_eq!(out, "plain");
    }

    #[test]
    fn null_and_undefined_become_empty() {
        assert_eq!(run("<p>x</p>", "(api, url) => null").unwrap(), "");
        assert_eq!(run("<p>x</p>", "(api, url) => undefined").unwrap(), "");
    }

    #[test]
    fn objects_become_pretty_json() {
        let out = run("<p>x</p>", "(api, url) => ({a: 1})").unwrap();
        assert_eq!(out, "{\n  \"a\": 1\n}");
    }

    #[test]
    fn api_exposes_html_and_url() {
        let out = run("<p>x</p>", "(api, url) => api.url + '|' + api.html.length").unwrap();
        assert!(out.starts_with("https://example.com/|"));
    }

    #[test]
    fn cached_query_returns_node_fields() {
        let out = run(
            "<div class='a' data-k='v'><h1> Title </h1></div>",
            "(api, url) => { const h = api.$('h1'); return h.tag + ':' + h.text; }",
        )
        .unwrap();
        assert_eq!(out, "h1:Title");
    }

    #[test]
    fn uncached_selector_returns_null() {
        let out = run(
            "<h1>T</h1>",
            "(api, url) => { const sel = 'h' + '1'; return api.$(sel) === null ? 'null' : 'hit'; }",
        )
        .unwrap();
        assert_eq!(out, "null");
    }

    #[test]
    fn thrown_exceptions_surface_with_message() {
        let err = run("<p>x</p>", "(api, url) => { throw new Error('boom'); }").unwrap_err();
        assert!(matches!(err, SandboxFailure::Exception(_)));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn syntax_errors_surface_as_exceptions() {
        let err = run("<p>x</p>", "(api, url) => {{{").unwrap_err();
        assert!(matches!(err, SandboxFailure::Exception(_) | SandboxFailure::Engine(_)));
    }

    #[test]
    fn infinite_loops_are_preempted() {
        let doc = parse("<p>x</p>");
        let bridge = DomBridge::new(&doc);
        let started = Instant::now();
        let err = evaluate(
            &bridge,
            "(api, url) => { while (true) {} }",
            "<p>x</p>",
            "",
            50,
            32 * 1024 * 1024,
        )
        .unwrap_err();
        assert!(matches!(err, SandboxFailure::Timeout(50)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn out_of_range_timeout_is_rejected() {
        let doc = parse("<p>x</p>");
        let bridge = DomBridge::new(&doc);
        let err = evaluate(&bridge, "(api, url) => 1", "", "", 0, 32 * 1024 * 1024).unwrap_err();
        assert!(matches!(err, SandboxFailure::Rejected(_)));
    }

    #[test]
    fn invocations_are_isolated() {
        let code = "(api, url) => {
            globalThis.counter = (globalThis.counter === undefined) ? 1 : globalThis.counter + 1;
            return String(globalThis.counter);
        }";
        assert_eq!(run("<p>x</p>", code).unwrap(), "1");
        assert_eq!(run("<p>x</p>", code).unwrap(), "1");
    }
}
