//! Output formats and the format pipeline.
//!
//! Every extracted fragment passes through exactly one of three paths:
//! HTML is returned unchanged, Markdown goes through the converter in
//! [`crate::markdown`], and Text is normalized plain text. This module
//! is the sole place where format conversion happens.

use serde::{Deserialize, Serialize};

use crate::markdown;

/// Output format for extracted content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Raw HTML fragment, unchanged.
    #[default]
    Html,
    /// Markdown conversion of the fragment.
    Markdown,
    /// Normalized plain text.
    Text,
}

impl Format {
    /// Parse a format name as it appears on the CLI / wire.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "html" => Some(Self::Html),
            "markdown" | "md" => Some(Self::Markdown),
            "text" | "txt" => Some(Self::Text),
            _ => None,
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Html => f.write_str("html"),
            Self::Markdown => f.write_str("markdown"),
            Self::Text => f.write_str("text"),
        }
    }
}

/// Apply the format pipeline to an HTML fragment.
///
/// `text_fallback` is used for [`Format::Text`] when the caller already
/// computed block-aware text for the fragment (the selector scope does,
/// to avoid reparsing); when absent the text is derived from the
/// fragment itself.
#[must_use]
pub fn apply(fragment: &str, format: Format, text_fallback: Option<&str>) -> String {
    match format {
        Format::Html => fragment.to_string(),
        Format::Markdown => markdown::convert(fragment),
        Format::Text => {
            let text = match text_fallback {
                Some(t) => t.to_string(),
                None => fragment_text(fragment),
            };
            normalize_text(&text)
        }
    }
}

/// Block-aware text of a fragment, via a throwaway parse.
fn fragment_text(fragment: &str) -> String {
    let doc = dom_query::Document::from(fragment);
    let body = doc.select("body");
    match body.nodes().first() {
        Some(node) => crate::bridge::block_text(node),
        None => String::new(),
    }
}

/// Normalize plain text: collapse horizontal whitespace runs to a
/// single space, collapse blank-line runs to a single blank line, drop
/// spaces adjacent to newlines, and trim. Idempotent.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_spaces = false;
    let mut newline_run = 0usize;

    for ch in text.chars() {
        if ch == '\n' || ch == '\r' {
            if ch == '\r' {
                continue;
            }
            newline_run += 1;
            pending_spaces = false;
            continue;
        }
        if ch.is_whitespace() {
            pending_spaces = true;
            continue;
        }
        if newline_run > 0 {
            if !out.is_empty() {
                out.push('\n');
                if newline_run > 1 {
                    out.push('\n');
                }
            }
            newline_run = 0;
            pending_spaces = false;
        } else if pending_spaces {
            if !out.is_empty() {
                out.push(' ');
            }
            pending_spaces = false;
        }
        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_known_names() {
        assert_eq!(Format::parse("html"), Some(Format::Html));
        assert_eq!(Format::parse("Markdown"), Some(Format::Markdown));
        assert_eq!(Format::parse("md"), Some(Format::Markdown));
        assert_eq!(Format::parse(" text "), Some(Format::Text));
        assert_eq!(Format::parse("xml"), None);
    }

    #[test]
    fn html_format_is_passthrough() {
        let fragment = "<p>unchanged   <b>markup</b></p>";
        assert_eq!(apply(fragment, Format::Html, None), fragment);
    }

    #[test]
    fn text_format_uses_fallback_when_given() {
        let out = apply("<p>ignored</p>", Format::Text, Some("given  text"));
        assert_eq!(out, "given text");
    }

    #[test]
    fn normalize_collapses_space_runs() {
        assert_eq!(normalize_text("a   b\t\tc"), "a b c");
    }

    #[test]
    fn normalize_collapses_blank_line_runs() {
        assert_eq!(normalize_text("a\n\n\n\nb"), "a\n\nb");
        assert_eq!(normalize_text("a\nb"), "a\nb");
    }

    #[test]
    fn normalize_drops_space_adjacent_to_newline() {
        assert_eq!(normalize_text("a  \n  b"), "a\nb");
    }

    #[test]
    fn normalize_trims_ends() {
        assert_eq!(normalize_text("  \n a \n "), "a");
    }

    #[test]
    fn normalize_is_idempotent() {
        let inputs = ["a   b\n\n\n\nc  \n d", " x ", "", "one\ntwo\n\nthree"];
        for input in inputs {
            let once = normalize_text(input);
            assert_eq!(normalize_text(&once), once, "not idempotent for {input:?}");
        }
    }
}
