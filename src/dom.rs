//! DOM operations adapter.
//!
//! Thin wrappers over the `dom_query` crate covering the operations the
//! bridge and the metadata extractor need. Selectors reaching this
//! layer may come from untrusted user code, so every query is guarded:
//! a selector that fails to parse behaves as "no match" instead of
//! panicking.

use std::collections::BTreeMap;

pub use dom_query::{Document, NodeRef, Selection};

/// Parse an HTML string into a document. Never fails; malformed input
/// yields whatever structure can be salvaged.
#[inline]
#[must_use]
pub fn parse(html: &str) -> Document {
    Document::from(html)
}

// === Guarded querying ===

/// Query the whole document, absorbing invalid selectors.
#[must_use]
pub fn try_select<'a>(doc: &'a Document, selector: &str) -> Option<Selection<'a>> {
    doc.try_select(selector)
}

/// True iff the selector parses and matches at least once in the
/// document. Used both as a match test and as a validity guard before
/// scoped queries: a selector with no document-level match cannot match
/// inside any subtree either.
#[must_use]
pub fn selector_matches_somewhere(doc: &Document, selector: &str) -> bool {
    try_select(doc, selector).is_some_and(|sel| sel.exists())
}

/// Query within an element's subtree, absorbing invalid selectors.
///
/// The guard runs the selector at document level first; only if it
/// parses and matches there is the scoped query executed.
#[must_use]
pub fn guarded_subtree_select<'a>(
    doc: &Document,
    scope: &Selection<'a>,
    selector: &str,
) -> Option<Selection<'a>> {
    if !selector_matches_somewhere(doc, selector) {
        return None;
    }
    Some(scope.select(selector))
}

// === Attribute operations ===

/// Get any attribute value.
#[inline]
#[must_use]
pub fn get_attribute(sel: &Selection, name: &str) -> Option<String> {
    sel.attr(name).map(|s| s.to_string())
}

/// All attributes of the selection's first node, sorted by name.
#[must_use]
pub fn attribute_map(node: &NodeRef) -> BTreeMap<String, String> {
    node.attrs()
        .iter()
        .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
        .collect()
}

/// The `data-*` subset of an attribute map, prefix stripped.
#[must_use]
pub fn data_attribute_map(attrs: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    attrs
        .iter()
        .filter_map(|(k, v)| {
            k.strip_prefix("data-")
                .map(|stripped| (stripped.to_string(), v.clone()))
        })
        .collect()
}

/// Class-name tokens in attribute order.
#[must_use]
pub fn class_list(attrs: &BTreeMap<String, String>) -> Vec<String> {
    attrs
        .get("class")
        .map(|class| class.split_whitespace().map(ToString::to_string).collect())
        .unwrap_or_default()
}

// === Tag / serialization ===

/// Lowercase tag name of a node, empty for non-elements.
#[must_use]
pub fn tag_name(node: &NodeRef) -> String {
    node.node_name()
        .map(|t| t.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Inner HTML of a selection.
#[inline]
#[must_use]
pub fn inner_html(sel: &Selection) -> String {
    sel.inner_html().to_string()
}

/// Outer HTML of a selection.
#[inline]
#[must_use]
pub fn outer_html(sel: &Selection) -> String {
    sel.html().to_string()
}

// === Tree navigation ===

/// Direct element children, in document order.
#[must_use]
pub fn element_children<'a>(node: &NodeRef<'a>) -> Vec<NodeRef<'a>> {
    node.children()
        .into_iter()
        .filter(dom_query::NodeRef::is_element)
        .collect()
}

/// Parent element, skipping any non-element ancestors.
#[must_use]
pub fn parent_element<'a>(node: &NodeRef<'a>) -> Option<NodeRef<'a>> {
    let mut current = node.parent();
    while let Some(parent) = current {
        if parent.is_element() {
            return Some(parent);
        }
        current = parent.parent();
    }
    None
}

/// Next element sibling, skipping text nodes.
#[must_use]
pub fn next_element_sibling<'a>(node: &NodeRef<'a>) -> Option<NodeRef<'a>> {
    let mut sibling = node.next_sibling();
    while let Some(s) = sibling {
        if s.is_element() {
            return Some(s);
        }
        sibling = s.next_sibling();
    }
    None
}

/// Previous element sibling, skipping text nodes.
#[must_use]
pub fn prev_element_sibling<'a>(node: &NodeRef<'a>) -> Option<NodeRef<'a>> {
    let mut sibling = node.prev_sibling();
    while let Some(s) = sibling {
        if s.is_element() {
            return Some(s);
        }
        sibling = s.prev_sibling();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_selector_is_absorbed() {
        let doc = parse("<div><p>text</p></div>");
        assert!(try_select(&doc, "p[").is_none());
        assert!(!selector_matches_somewhere(&doc, ":::nonsense"));
    }

    #[test]
    fn guarded_subtree_select_scopes_to_descendants() {
        let doc = parse(r#"<div id="a"><span>in</span></div><span>out</span>"#);
        let div = doc.select("#a");
        let spans = guarded_subtree_select(&doc, &div, "span").unwrap();
        assert_eq!(spans.length(), 1);
        assert_eq!(spans.text().to_string(), "in");
    }

    #[test]
    fn guarded_subtree_select_absorbs_invalid() {
        let doc = parse("<div><p>text</p></div>");
        let div = doc.select("div");
        assert!(guarded_subtree_select(&doc, &div, "p[").is_none());
    }

    #[test]
    fn attribute_map_is_sorted_and_complete() {
        let doc = parse(r#"<a href="/x" class="link" data-kind="nav">t</a>"#);
        let a = doc.select("a");
        let node = a.nodes().first().cloned().unwrap();

        let attrs = attribute_map(&node);
        assert_eq!(attrs.len(), 3);
        assert_eq!(attrs.get("href").map(String::as_str), Some("/x"));

        let data = data_attribute_map(&attrs);
        assert_eq!(data.get("kind").map(String::as_str), Some("nav"));

        let classes = class_list(&attrs);
        assert_eq!(classes, vec!["link".to_string()]);
    }

    #[test]
    fn element_sibling_walks_skip_text_nodes() {
        let doc = parse("<div><p id='a'>A</p> middle <p id='b'>B</p></div>");
        let a = doc.select("#a");
        let node = a.nodes().first().cloned().unwrap();

        let next = next_element_sibling(&node).unwrap();
        assert_eq!(tag_name(&next), "p");
        assert!(prev_element_sibling(&node).is_none());
    }

    #[test]
    fn element_children_excludes_text() {
        let doc = parse("<ul>text<li>1</li><li>2</li></ul>");
        let ul = doc.select("ul");
        let node = ul.nodes().first().cloned().unwrap();
        assert_eq!(element_children(&node).len(), 2);
    }
}
