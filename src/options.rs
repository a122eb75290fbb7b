//! Configuration options for scoped extraction.
//!
//! `Options` is plain data: every field is public and carries a
//! documented default. Use `Default::default()` for standard settings
//! and struct update syntax to override individual fields.

use crate::format::Format;
use crate::scope::DEFAULT_FUNCTION_TIMEOUT_MS;

/// Configuration options for scoped extraction.
///
/// # Example
///
/// ```rust
/// use pagescope::{Format, Options};
///
/// let options = Options {
///     format: Format::Markdown,
///     url: Some("https://example.com/post".to_string()),
///     ..Options::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct Options {
    /// Output format for extracted content.
    ///
    /// Default: [`Format::Html`]
    pub format: Format,

    /// Source URL of the document.
    ///
    /// Passed through to function scopes as `api.url` and used for
    /// `auto` scope handler lookup. The core never fetches it.
    ///
    /// Default: `None`
    pub url: Option<String>,

    /// Minimum trimmed text length for a `main` scope container
    /// candidate to be accepted before falling back to `<body>`.
    ///
    /// Default: `100`
    pub min_main_text_len: usize,

    /// Heap cap for a single sandbox invocation, in bytes.
    ///
    /// Default: `32 MiB`
    pub sandbox_memory_limit: usize,

    /// Wall-clock timeout for function scopes that do not specify one,
    /// in milliseconds.
    ///
    /// Default: `5000`
    pub sandbox_default_timeout_ms: u64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            format: Format::Html,
            url: None,
            min_main_text_len: 100,
            sandbox_memory_limit: 32 * 1024 * 1024,
            sandbox_default_timeout_ms: DEFAULT_FUNCTION_TIMEOUT_MS,
        }
    }
}
