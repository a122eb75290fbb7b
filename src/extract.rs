//! The extraction engine.
//!
//! Resolves a [`Scope`] against one parsed document and emits formatted
//! content plus a [`ScopeResolution`] record. Each scope variant is a
//! leaf: the built-in scopes produce an HTML fragment directly, the
//! function scope delegates to the sandbox, and `auto`/`handler` are
//! rewritten to a concrete scope before extraction starts.

use std::collections::HashSet;

use dom_query::{Document, Selection};
use tracing::{debug, warn};

use crate::bridge::{self, DomBridge};
use crate::dom;
use crate::encoding;
use crate::error::{ExtractError, Result};
use crate::format::{self, Format};
use crate::handler::HandlerLookup;
use crate::options::Options;
use crate::result::{ExtractionResult, ScopeResolution};
use crate::sandbox;
use crate::scope::Scope;

/// Removed for every scope: active content, embeds, and tracking-pixel
/// style inline images.
const BASE_REMOVALS: &str = r#"script, style, noscript, iframe, svg, img[src^="data:"]"#;

/// Additional noise removed for `main` scope: structural chrome by tag
/// and by ARIA role.
const NOISE_REMOVALS: &str = "nav, header, footer, aside, form, \
     [role=navigation], [role=banner], [role=contentinfo], [role=complementary]";

/// Noise matched by id or class name. Plain selector semantics, so
/// nested occurrences are removed too.
const NOISE_NAME_REMOVALS: &str = "#nav, .nav, #navbar, .navbar, #header, .header, \
     #footer, .footer, #sidebar, .sidebar, #menu, .menu, \
     #advertisement, .advertisement, #ads, .ads, #ad, .ad";

/// Containers tried for `main` scope, in preference order.
const MAIN_CONTAINERS: &[&str] = &[
    "main",
    "[role=main]",
    "article",
    ".content",
    ".post",
    ".article",
    ".entry",
    "#content",
    "#main",
    ".main",
];

/// Extract content from an HTML string using default options.
///
/// # Example
///
/// ```rust
/// use pagescope::{extract_with_scope, Format, Scope};
///
/// let html = "<html><body><nav>Skip</nav>\
///             <main><h1>Hello</h1><p>World</p></main></body></html>";
/// let result = extract_with_scope(html, &Scope::Main, Format::Markdown, None)?;
/// assert_eq!(result.content, "# Hello\n\nWorld");
/// assert!(!result.resolution.resolved);
/// # Ok::<(), pagescope::ExtractError>(())
/// ```
pub fn extract_with_scope(
    html: &str,
    scope: &Scope,
    format: Format,
    url: Option<&str>,
) -> Result<ExtractionResult> {
    let options = Options {
        format,
        url: url.map(ToString::to_string),
        ..Options::default()
    };
    extract_with_options(html, scope, &options, None)
}

/// Extract content from raw bytes, sniffing the charset first.
pub fn extract_bytes_with_scope(
    html: &[u8],
    scope: &Scope,
    format: Format,
    url: Option<&str>,
) -> Result<ExtractionResult> {
    let html = encoding::transcode_to_utf8(html);
    extract_with_scope(&html, scope, format, url)
}

/// Extract content with full control over options and an optional
/// handler collaborator.
pub fn extract_with_options(
    html: &str,
    scope: &Scope,
    options: &Options,
    handlers: Option<&dyn HandlerLookup>,
) -> Result<ExtractionResult> {
    scope.validate()?;

    let (used, resolved, handler_id) = resolve_scope(scope, options, handlers)?;
    debug!(
        requested = %crate::scope::scope_to_string(scope),
        used = %crate::scope::scope_to_string(&used),
        resolved,
        "extracting"
    );

    let extracted = run_scope(html, &used, options)?;
    let content = match extracted {
        Extracted::Fragment { html, text } => {
            format::apply(&html, options.format, text.as_deref())
        }
        Extracted::Verbatim(value) => value,
    };

    Ok(ExtractionResult {
        content,
        resolution: ScopeResolution {
            requested: scope.clone(),
            used,
            resolved,
            handler_id,
        },
    })
}

/// Bytes variant of [`extract_with_options`].
pub fn extract_bytes_with_options(
    html: &[u8],
    scope: &Scope,
    options: &Options,
    handlers: Option<&dyn HandlerLookup>,
) -> Result<ExtractionResult> {
    let html = encoding::transcode_to_utf8(html);
    extract_with_options(&html, scope, options, handlers)
}

/// Rewrite `auto`/`handler` to the concrete scope that will actually
/// run, consulting the collaborator when present.
fn resolve_scope(
    scope: &Scope,
    options: &Options,
    handlers: Option<&dyn HandlerLookup>,
) -> Result<(Scope, bool, Option<String>)> {
    match scope {
        Scope::Auto => {
            if let (Some(url), Some(handlers)) = (options.url.as_deref(), handlers) {
                if let Some(found) = handlers.lookup_url(url) {
                    debug!(handler = %found.id, "auto scope resolved by handler");
                    return Ok((concrete(found.scope), true, Some(found.id)));
                }
            }
            debug!("auto scope degraded to main");
            Ok((Scope::Main, true, None))
        }
        Scope::Handler { id } => {
            let handlers = handlers.ok_or(ExtractError::HandlerUnavailable)?;
            let resolved = handlers.lookup_id(id).ok_or(ExtractError::HandlerUnavailable)?;
            Ok((concrete(resolved), true, Some(id.clone())))
        }
        other => Ok((other.clone(), false, None)),
    }
}

/// Collaborators must answer with a concrete scope; indirection through
/// another `auto`/`handler` is cut off at `main`.
fn concrete(scope: Scope) -> Scope {
    match scope {
        Scope::Auto | Scope::Handler { .. } => {
            warn!("handler answered with a non-concrete scope, using main");
            Scope::Main
        }
        other => other,
    }
}

/// What a scope produced before formatting.
enum Extracted {
    /// An HTML fragment, with optional pre-computed block text for the
    /// text format.
    Fragment { html: String, text: Option<String> },
    /// A function-scope result that does not look like HTML; it skips
    /// the format pipeline entirely.
    Verbatim(String),
}

fn run_scope(html: &str, scope: &Scope, options: &Options) -> Result<Extracted> {
    match scope {
        Scope::Main | Scope::Auto | Scope::Handler { .. } => Ok(extract_main(html, options)),
        Scope::Full => Ok(extract_full(html)),
        Scope::Selector { include, exclude } => {
            Ok(extract_selector(html, include, exclude.as_deref()))
        }
        Scope::Function { code, timeout_ms } => {
            extract_function(html, code, *timeout_ms, options)
        }
    }
}

fn extract_main(html: &str, options: &Options) -> Extracted {
    let doc = dom::parse(html);
    remove_all(&doc, BASE_REMOVALS);
    remove_all(&doc, NOISE_REMOVALS);
    remove_all(&doc, NOISE_NAME_REMOVALS);

    let fragment = match select_main_container(&doc, options) {
        Some(container) => dom::inner_html(&container),
        None => body_inner_html(&doc),
    };
    Extracted::Fragment { html: fragment, text: None }
}

fn extract_full(html: &str) -> Extracted {
    let doc = dom::parse(html);
    remove_all(&doc, BASE_REMOVALS);
    Extracted::Fragment { html: body_inner_html(&doc), text: None }
}

fn extract_selector(html: &str, include: &[String], exclude: Option<&[String]>) -> Extracted {
    let doc = dom::parse(html);
    remove_all(&doc, BASE_REMOVALS);

    // Collect matches across all include selectors, de-duplicated by
    // element identity so overlapping selectors count each element
    // once, in first-match order.
    let mut seen: HashSet<dom_query::NodeId> = HashSet::new();
    let mut matched: Vec<dom_query::NodeRef> = Vec::new();
    for selector in include {
        let Some(sel) = dom::try_select(&doc, selector) else {
            continue;
        };
        for node in sel.nodes() {
            if seen.insert(node.id) {
                matched.push(node.clone());
            }
        }
    }

    if let Some(excludes) = exclude {
        for node in &matched {
            let scope = Selection::from(node.clone());
            for selector in excludes {
                if let Some(hits) = dom::guarded_subtree_select(&doc, &scope, selector) {
                    hits.remove();
                }
            }
        }
    }

    let fragment = matched
        .iter()
        .map(|node| dom::inner_html(&Selection::from(node.clone())))
        .collect::<Vec<_>>()
        .join("\n");
    let text = matched
        .iter()
        .map(bridge::block_text)
        .collect::<Vec<_>>()
        .join("\n");

    Extracted::Fragment { html: fragment, text: Some(text) }
}

fn extract_function(
    html: &str,
    code: &str,
    timeout_ms: Option<u64>,
    options: &Options,
) -> Result<Extracted> {
    let doc = dom::parse(html);
    let bridge = DomBridge::new(&doc);
    let url = options.url.as_deref().unwrap_or("");
    let timeout_ms = timeout_ms.unwrap_or(options.sandbox_default_timeout_ms);

    let value = sandbox::evaluate(
        &bridge,
        code,
        html,
        url,
        timeout_ms,
        options.sandbox_memory_limit,
    )
    .map_err(|failure| ExtractError::FunctionScope(failure.to_string()))?;

    if looks_like_html(&value) {
        Ok(Extracted::Fragment { html: value, text: None })
    } else {
        Ok(Extracted::Verbatim(value))
    }
}

/// The heuristic the pipeline uses to decide whether a function-scope
/// result should be treated as markup.
fn looks_like_html(value: &str) -> bool {
    value.contains('<') && value.contains('>')
}

fn remove_all(doc: &Document, selectors: &str) {
    if let Some(sel) = dom::try_select(doc, selectors) {
        sel.remove();
    }
}

/// Try each preferred container in order and accept the first whose
/// post-removal text is long enough to be a plausible content region.
fn select_main_container<'a>(doc: &'a Document, options: &Options) -> Option<Selection<'a>> {
    for selector in MAIN_CONTAINERS {
        let Some(sel) = dom::try_select(doc, selector) else {
            continue;
        };
        for node in sel.nodes() {
            let text = bridge::block_text(node);
            if text.chars().count() >= options.min_main_text_len {
                debug!(selector, "main container selected");
                return Some(Selection::from(node.clone()));
            }
        }
    }
    None
}

fn body_inner_html(doc: &Document) -> String {
    let body = doc.select("body");
    if body.exists() {
        dom::inner_html(&body)
    } else {
        doc.html().to_string()
    }
}
