//! # pagescope
//!
//! Scoped web-content extraction: given HTML, return a normalized view
//! of the page — metadata, and the content of a chosen *scope* in one
//! of three textual formats.
//!
//! A scope names the region to extract: the heuristic `main` content
//! region, the `full` body, an explicit CSS `selector` set, a
//! sandboxed JavaScript `function`, or an `auto`/`handler` lookup
//! delegated to a collaborator. The library performs no I/O of its own;
//! callers fetch pages and hand the HTML in.
//!
//! ## Quick Start
//!
//! ```rust
//! use pagescope::{extract_with_scope, Format, Scope};
//!
//! let html = r#"<html><body><nav>Skip</nav>
//! <main><h1>Hello</h1><p>World</p></main></body></html>"#;
//!
//! let result = extract_with_scope(html, &Scope::Main, Format::Markdown, None)?;
//! assert_eq!(result.content, "# Hello\n\nWorld");
//! # Ok::<(), pagescope::ExtractError>(())
//! ```
//!
//! ## Scopes
//!
//! - **Content Scopes**: `main` applies noise removal and a container
//!   heuristic; `full` keeps everything under `<body>`; `selector`
//!   extracts explicit regions with optional excludes
//! - **Function Scopes**: user-supplied `(api, url) => ...` JavaScript
//!   runs in a capability-free sandbox with bounded time and memory
//! - **Handler Scopes**: `auto` and `handler` defer to a caller-supplied
//!   lookup, degrading predictably when none is registered

mod error;
mod extract;
mod options;
mod result;

/// DOM operations adapter over `dom_query`.
pub mod dom;

/// Host DOM bridge: stable node ids, snapshots, traversal.
pub mod bridge;

/// Character encoding detection and transcoding.
pub mod encoding;

/// Output formats and the format pipeline.
pub mod format;

/// Handler collaborator interface.
pub mod handler;

/// HTML to Markdown conversion.
pub mod markdown;

/// Page metadata extraction.
pub mod metadata;

/// Scope specifications and their parsing.
pub mod scope;

mod sandbox;

// Public API - re-exports
pub use error::{ExtractError, Result};
pub use extract::{
    extract_bytes_with_options, extract_bytes_with_scope, extract_with_options,
    extract_with_scope,
};
pub use format::Format;
pub use handler::{HandlerLookup, HandlerMatch};
pub use metadata::{parse_meta, Hreflang, OpenGraph, PageMeta};
pub use options::Options;
pub use result::{ExtractionResult, ScopeResolution};
pub use scope::{parse_scope, scope_from_value, scope_to_string, Scope};
