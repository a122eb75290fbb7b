//! HTML to Markdown conversion.
//!
//! Walks a parsed fragment and emits Markdown by hand: ATX headings,
//! fenced code blocks, emphasis, lists, blockquotes, images, pipe
//! tables. Anchors whose text is empty or whitespace-only are dropped
//! entirely. Trailing whitespace is trimmed per line.

use dom_query::{Document, NodeRef, Selection};

use crate::dom;

/// Convert an HTML fragment to Markdown.
#[must_use]
pub fn convert(fragment: &str) -> String {
    let doc = Document::from(fragment);
    let body = doc.select("body");
    let Some(root) = body.nodes().first().cloned() else {
        return String::new();
    };

    let mut out = String::new();
    walk_children(&root, &mut out, &BlockContext::default());
    finish(&out)
}

#[derive(Debug, Clone, Default)]
struct BlockContext {
    /// Nesting depth inside lists, for indentation.
    list_depth: usize,
    /// Some(counter) inside an ordered list.
    ordered: Option<u32>,
}

fn walk_children(node: &NodeRef, out: &mut String, ctx: &BlockContext) {
    for child in node.children() {
        if child.is_text() {
            push_inline_text(&child.text(), out);
        } else if child.is_element() {
            element(&child, out, ctx);
        }
    }
}

/// Append text content with whitespace runs collapsed, suppressing the
/// space at line starts.
fn push_inline_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !(out.is_empty() || out.ends_with(' ') || out.ends_with('\n')) {
                out.push(' ');
            }
        } else {
            out.push(ch);
        }
    }
}

fn element(node: &NodeRef, out: &mut String, ctx: &BlockContext) {
    let tag = dom::tag_name(node);
    match tag.as_str() {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = tag.as_bytes()[1] - b'0';
            let text = inline_text(node);
            if !text.is_empty() {
                block_break(out, ctx);
                for _ in 0..level {
                    out.push('#');
                }
                out.push(' ');
                out.push_str(&text);
                block_break(out, ctx);
            }
        }
        "p" => {
            block_break(out, ctx);
            walk_children(node, out, ctx);
            block_break(out, ctx);
        }
        "br" => out.push('\n'),
        "hr" => {
            block_break(out, ctx);
            out.push_str("---");
            block_break(out, ctx);
        }
        "strong" | "b" => emphasis(node, out, ctx, "**"),
        "em" | "i" => emphasis(node, out, ctx, "*"),
        "code" => {
            // Inline code only; code inside <pre> is handled there.
            let text = inline_text(node);
            if !text.is_empty() {
                out.push('`');
                out.push_str(&text);
                out.push('`');
            }
        }
        "pre" => {
            let sel = Selection::from(node.clone());
            let text = sel.text();
            block_break(out, ctx);
            out.push_str("```\n");
            out.push_str(text.trim_matches('\n'));
            out.push_str("\n```");
            block_break(out, ctx);
        }
        "a" => {
            let text = inline_text(node);
            // Anchors with no visible text are dropped entirely.
            if text.trim().is_empty() {
                return;
            }
            let sel = Selection::from(node.clone());
            match sel.attr("href") {
                Some(href) if !href.trim().is_empty() => {
                    out.push('[');
                    out.push_str(&text);
                    out.push_str("](");
                    out.push_str(href.trim());
                    out.push(')');
                }
                _ => out.push_str(&text),
            }
        }
        "img" => {
            let sel = Selection::from(node.clone());
            if let Some(src) = sel.attr("src") {
                let alt = sel.attr("alt").map(|a| a.to_string()).unwrap_or_default();
                out.push_str("![");
                out.push_str(alt.trim());
                out.push_str("](");
                out.push_str(src.trim());
                out.push(')');
            }
        }
        "ul" | "ol" => {
            block_break(out, ctx);
            let items = BlockContext {
                list_depth: ctx.list_depth + 1,
                ordered: (tag == "ol").then_some(1),
            };
            list_items(node, out, &items);
            block_break(out, ctx);
        }
        "blockquote" => {
            block_break(out, ctx);
            let mut inner = String::new();
            walk_children(node, &mut inner, ctx);
            for line in finish(&inner).lines() {
                out.push_str("> ");
                out.push_str(line);
                out.push('\n');
            }
            block_break(out, ctx);
        }
        "table" => {
            block_break(out, ctx);
            out.push_str(&table(node));
            block_break(out, ctx);
        }
        "script" | "style" | "noscript" | "head" | "title" => {}
        _ => {
            // Unknown and structural elements: recurse; block-level
            // ones separate their content from siblings.
            let is_block = matches!(
                tag.as_str(),
                "div" | "section" | "article" | "main" | "aside" | "header" | "footer"
                    | "nav" | "figure" | "figcaption" | "address" | "dl" | "dd" | "dt"
                    | "li" | "tr"
            );
            if is_block {
                block_break(out, ctx);
            }
            walk_children(node, out, ctx);
            if is_block {
                block_break(out, ctx);
            }
        }
    }
}

fn emphasis(node: &NodeRef, out: &mut String, _ctx: &BlockContext, marker: &str) {
    let text = inline_text(node);
    if text.is_empty() {
        return;
    }
    out.push_str(marker);
    out.push_str(&text);
    out.push_str(marker);
}

fn list_items(node: &NodeRef, out: &mut String, ctx: &BlockContext) {
    let mut counter = ctx.ordered;
    for child in node.children() {
        if !child.is_element() {
            continue;
        }
        let tag = dom::tag_name(&child);
        if tag == "li" {
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            for _ in 1..ctx.list_depth {
                out.push_str("  ");
            }
            match counter.as_mut() {
                Some(n) => {
                    out.push_str(&format!("{n}. "));
                    *n += 1;
                }
                None => out.push_str("- "),
            }
            let mut item = String::new();
            walk_children(&child, &mut item, ctx);
            out.push_str(item.trim());
            out.push('\n');
        } else if tag == "ul" || tag == "ol" {
            let nested = BlockContext {
                list_depth: ctx.list_depth + 1,
                ordered: (tag == "ol").then_some(1),
            };
            list_items(&child, out, &nested);
        }
    }
}

/// Flatten an element to single-line inline text: child text collapsed,
/// `<br>` as a space, nested markup recursed into.
fn inline_text(node: &NodeRef) -> String {
    let mut out = String::new();
    collect_inline(node, &mut out);
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collect_inline(node: &NodeRef, out: &mut String) {
    for child in node.children() {
        if child.is_text() {
            out.push_str(&child.text());
        } else if child.is_element() {
            if dom::tag_name(&child) == "br" {
                out.push(' ');
            } else {
                collect_inline(&child, out);
            }
        }
    }
}

fn table(node: &NodeRef) -> String {
    let sel = Selection::from(node.clone());
    let mut rows: Vec<Vec<String>> = Vec::new();
    for tr in sel.select("tr").iter() {
        let mut row = Vec::new();
        for cell in tr.select("th, td").iter() {
            row.push(cell.text().split_whitespace().collect::<Vec<_>>().join(" "));
        }
        if !row.is_empty() {
            rows.push(row);
        }
    }
    if rows.is_empty() {
        return String::new();
    }

    let cols = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut out = String::new();
    for (idx, row) in rows.iter().enumerate() {
        out.push('|');
        for col in 0..cols {
            out.push(' ');
            out.push_str(row.get(col).map(String::as_str).unwrap_or(""));
            out.push_str(" |");
        }
        out.push('\n');
        if idx == 0 {
            out.push('|');
            for _ in 0..cols {
                out.push_str(" --- |");
            }
            out.push('\n');
        }
    }
    out.trim_end().to_string()
}

fn block_break(out: &mut String, _ctx: &BlockContext) {
    if out.is_empty() {
        return;
    }
    while out.ends_with(' ') {
        out.pop();
    }
    if out.ends_with("\n\n") {
        return;
    }
    if out.ends_with('\n') {
        out.push('\n');
    } else {
        out.push_str("\n\n");
    }
}

/// Final cleanup: trim trailing whitespace per line, collapse runs of
/// blank lines, trim the ends.
fn finish(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut blank_run = 0usize;
    for line in raw.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
            if blank_run > 0 {
                out.push('\n');
            }
        }
        blank_run = 0;
        out.push_str(line);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headings_become_atx() {
        assert_eq!(convert("<h1>Title</h1>"), "# Title");
        assert_eq!(convert("<h3>Deep</h3>"), "### Deep");
    }

    #[test]
    fn heading_then_paragraph() {
        let md = convert("<h1>Hello</h1><p>World</p>");
        assert_eq!(md, "# Hello\n\nWorld");
    }

    #[test]
    fn paragraphs_are_separated_by_blank_lines() {
        let md = convert("<p>one</p><p>two</p>");
        assert_eq!(md, "one\n\ntwo");
    }

    #[test]
    fn pre_becomes_fenced_code_block() {
        let md = convert("<pre><code>let x = 1;\nlet y = 2;</code></pre>");
        assert_eq!(md, "```\nlet x = 1;\nlet y = 2;\n```");
    }

    #[test]
    fn inline_code_uses_backticks() {
        let md = convert("<p>call <code>f()</code> now</p>");
        assert_eq!(md, "call `f()` now");
    }

    #[test]
    fn links_render_with_href() {
        let md = convert(r#"<p><a href="/x">label</a></p>"#);
        assert_eq!(md, "[label](/x)");
    }

    #[test]
    fn empty_links_are_dropped() {
        let md = convert(r#"<p>before <a href="/x">  </a>after</p>"#);
        assert_eq!(md, "before after");
    }

    #[test]
    fn link_without_href_keeps_text() {
        let md = convert("<p><a>just text</a></p>");
        assert_eq!(md, "just text");
    }

    #[test]
    fn emphasis_markers() {
        assert_eq!(convert("<p><strong>bold</strong> and <em>soft</em></p>"), "**bold** and *soft*");
    }

    #[test]
    fn unordered_list() {
        let md = convert("<ul><li>a</li><li>b</li></ul>");
        assert_eq!(md, "- a\n- b");
    }

    #[test]
    fn ordered_list_counts() {
        let md = convert("<ol><li>a</li><li>b</li><li>c</li></ol>");
        assert_eq!(md, "1. a\n2. b\n3. c");
    }

    #[test]
    fn blockquote_prefixes_lines() {
        let md = convert("<blockquote><p>quoted</p></blockquote>");
        assert_eq!(md, "> quoted");
    }

    #[test]
    fn image_renders_alt_and_src() {
        let md = convert(r#"<p><img src="/i.png" alt="pic"></p>"#);
        assert_eq!(md, "![pic](/i.png)");
    }

    #[test]
    fn simple_table() {
        let md = convert("<table><tr><th>A</th><th>B</th></tr><tr><td>1</td><td>2</td></tr></table>");
        assert_eq!(md, "| A | B |\n| --- | --- |\n| 1 | 2 |");
    }

    #[test]
    fn scripts_are_ignored() {
        let md = convert("<p>keep</p><script>alert(1)</script>");
        assert_eq!(md, "keep");
    }

    #[test]
    fn empty_fragment_is_empty() {
        assert_eq!(convert(""), "");
    }
}
