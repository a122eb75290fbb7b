//! Host DOM bridge.
//!
//! The bridge owns the single authoritative view of a parsed document
//! and hands out [`NodeSnapshot`] values addressed by stable numeric
//! ids. Ids are interned monotonically from 1 the first time an element
//! is returned from any query; asking again for the same element yields
//! the same id. The id registry is the only mutable state here, and a
//! bridge is only ever owned by one extraction request.
//!
//! The DOM graph is cyclic (parent and child point at each other), so
//! nothing here exposes raw node references across the crate boundary:
//! snapshots are by-value copies and traversal goes back through the
//! bridge with an id.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::dom::{self, Document, NodeRef, Selection};

/// Stable identifier for an element within one bridge's lifetime.
pub type NodeId = u32;

/// A by-value record describing one element at serialization time.
///
/// Snapshots may be cloned freely and outlive their source element
/// textually, but the `id` is meaningless against any other bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSnapshot {
    pub id: NodeId,
    /// Lowercase tag name.
    pub tag: String,
    /// Block-aware normalized text content.
    pub text: String,
    /// innerHTML.
    pub html: String,
    /// outerHTML.
    pub outer_html: String,
    /// All attributes, keyed by name.
    pub attrs: BTreeMap<String, String>,
    /// `data-*` attributes with the prefix stripped.
    pub data_attrs: BTreeMap<String, String>,
    /// Class-name tokens in attribute order.
    pub classes: Vec<String>,
}

struct Registry<'a> {
    by_identity: HashMap<dom_query::NodeId, NodeId>,
    nodes: Vec<NodeRef<'a>>,
}

/// Query and traversal surface over one parsed document.
///
/// The caller owns the [`Document`]; the bridge borrows it for the
/// duration of one extraction request.
pub struct DomBridge<'a> {
    doc: &'a Document,
    registry: RefCell<Registry<'a>>,
}

impl<'a> DomBridge<'a> {
    /// Wrap a parsed document. Parsing itself never fails, so neither
    /// does this.
    #[must_use]
    pub fn new(doc: &'a Document) -> Self {
        Self {
            doc,
            registry: RefCell::new(Registry {
                by_identity: HashMap::new(),
                nodes: Vec::new(),
            }),
        }
    }

    /// The underlying document.
    #[must_use]
    pub fn document(&self) -> &'a Document {
        self.doc
    }

    /// Assign (or look up) the stable id for an element.
    fn intern(&self, node: NodeRef<'a>) -> NodeId {
        let mut registry = self.registry.borrow_mut();
        if let Some(&id) = registry.by_identity.get(&node.id) {
            return id;
        }
        registry.nodes.push(node.clone());
        let id = registry.nodes.len() as NodeId;
        registry.by_identity.insert(node.id, id);
        id
    }

    fn node_of(&self, id: NodeId) -> Option<NodeRef<'a>> {
        let registry = self.registry.borrow();
        registry.nodes.get(id.checked_sub(1)? as usize).cloned()
    }

    /// Serialize an element into a snapshot, interning its id.
    #[must_use]
    pub fn snapshot(&self, node: NodeRef<'a>) -> NodeSnapshot {
        let id = self.intern(node.clone());
        let sel = Selection::from(node.clone());
        let attrs = dom::attribute_map(&node);
        let data_attrs = dom::data_attribute_map(&attrs);
        let classes = dom::class_list(&attrs);
        NodeSnapshot {
            id,
            tag: dom::tag_name(&node),
            text: block_text(&node),
            html: dom::inner_html(&sel),
            outer_html: dom::outer_html(&sel),
            attrs,
            data_attrs,
            classes,
        }
    }

    /// Re-serialize an already-interned element by id.
    #[must_use]
    pub fn snapshot_of(&self, id: NodeId) -> Option<NodeSnapshot> {
        self.node_of(id).map(|n| self.snapshot(n))
    }

    // === Document-level queries ===

    /// First element matching the selector, or none. Invalid selectors
    /// are absorbed.
    #[must_use]
    pub fn query(&self, selector: &str) -> Option<NodeSnapshot> {
        self.query_nodes(selector).into_iter().next().map(|n| self.snapshot(n))
    }

    /// All elements matching the selector, in document order. Invalid
    /// selectors yield an empty list.
    #[must_use]
    pub fn query_all(&self, selector: &str) -> Vec<NodeSnapshot> {
        self.query_nodes(selector)
            .into_iter()
            .map(|n| self.snapshot(n))
            .collect()
    }

    pub(crate) fn query_nodes(&self, selector: &str) -> Vec<NodeRef<'a>> {
        match dom::try_select(self.doc, selector) {
            Some(sel) => sel.nodes().to_vec(),
            None => Vec::new(),
        }
    }

    // === Scoped queries ===

    /// First match within the subtree of the element `id`.
    #[must_use]
    pub fn child_query(&self, id: NodeId, selector: &str) -> Option<NodeSnapshot> {
        self.child_query_nodes(id, selector)
            .into_iter()
            .next()
            .map(|n| self.snapshot(n))
    }

    /// All matches within the subtree of the element `id`, in document
    /// order.
    #[must_use]
    pub fn child_query_all(&self, id: NodeId, selector: &str) -> Vec<NodeSnapshot> {
        self.child_query_nodes(id, selector)
            .into_iter()
            .map(|n| self.snapshot(n))
            .collect()
    }

    pub(crate) fn child_query_nodes(&self, id: NodeId, selector: &str) -> Vec<NodeRef<'a>> {
        let Some(node) = self.node_of(id) else {
            return Vec::new();
        };
        let scope = Selection::from(node);
        match dom::guarded_subtree_select(self.doc, &scope, selector) {
            Some(sel) => sel.nodes().to_vec(),
            None => Vec::new(),
        }
    }

    /// Nearest ancestor matching the selector, starting from the
    /// element itself.
    #[must_use]
    pub fn closest(&self, id: NodeId, selector: &str) -> Option<NodeSnapshot> {
        let start = self.node_of(id)?;
        if !dom::selector_matches_somewhere(self.doc, selector) {
            return None;
        }
        let matches: std::collections::HashSet<dom_query::NodeId> = self
            .query_nodes(selector)
            .into_iter()
            .map(|n| n.id)
            .collect();
        let mut current = Some(start);
        while let Some(node) = current {
            if matches.contains(&node.id) {
                return Some(self.snapshot(node));
            }
            current = dom::parent_element(&node);
        }
        None
    }

    /// Parent element, optionally filtered by a selector.
    #[must_use]
    pub fn parent(&self, id: NodeId, selector: Option<&str>) -> Option<NodeSnapshot> {
        let node = self.node_of(id)?;
        let parent = dom::parent_element(&node)?;
        if let Some(selector) = selector {
            let matches: std::collections::HashSet<dom_query::NodeId> = self
                .query_nodes(selector)
                .into_iter()
                .map(|n| n.id)
                .collect();
            if !matches.contains(&parent.id) {
                return None;
            }
        }
        Some(self.snapshot(parent))
    }

    /// Direct element children, in document order.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Vec<NodeSnapshot> {
        let Some(node) = self.node_of(id) else {
            return Vec::new();
        };
        dom::element_children(&node)
            .into_iter()
            .map(|n| self.snapshot(n))
            .collect()
    }

    /// First element child.
    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeSnapshot> {
        let node = self.node_of(id)?;
        dom::element_children(&node).into_iter().next().map(|n| self.snapshot(n))
    }

    /// Last element child.
    #[must_use]
    pub fn last_child(&self, id: NodeId) -> Option<NodeSnapshot> {
        let node = self.node_of(id)?;
        dom::element_children(&node).into_iter().last().map(|n| self.snapshot(n))
    }

    /// Next element sibling, skipping text nodes.
    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeSnapshot> {
        let node = self.node_of(id)?;
        dom::next_element_sibling(&node).map(|n| self.snapshot(n))
    }

    /// Previous element sibling, skipping text nodes.
    #[must_use]
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeSnapshot> {
        let node = self.node_of(id)?;
        dom::prev_element_sibling(&node).map(|n| self.snapshot(n))
    }
}

/// Tags whose closing boundary inserts a newline in block-aware text.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "h1", "h2", "h3", "h4", "h5", "h6", "li", "tr", "hr", "article", "section",
    "header", "footer", "blockquote", "pre", "ul", "ol", "table", "thead", "tbody", "tfoot",
    "nav", "aside", "main", "figure", "figcaption", "address", "dd", "dt", "dl",
];

fn is_block_tag(tag: &str) -> bool {
    BLOCK_TAGS.contains(&tag)
}

/// Block-aware normalized text of an element's subtree.
///
/// Text node content is appended with whitespace runs collapsed; `<br>`
/// becomes a newline; every other element recurses, and block elements
/// append a newline after their content. The accumulated string is then
/// normalized: newline runs collapse to one newline, space runs to one
/// space, spaces adjacent to a newline are dropped, and the ends are
/// trimmed.
#[must_use]
pub fn block_text(node: &NodeRef) -> String {
    let mut out = String::new();
    collect_block_text(node, &mut out);
    normalize_block_text(&out)
}

fn collect_block_text(node: &NodeRef, out: &mut String) {
    for child in node.children() {
        if child.is_text() {
            push_collapsed(&child.text(), out);
        } else if child.is_element() {
            let tag = dom::tag_name(&child);
            if tag == "br" {
                out.push('\n');
                continue;
            }
            collect_block_text(&child, out);
            if is_block_tag(&tag) {
                out.push('\n');
            }
        }
    }
}

fn push_collapsed(text: &str, out: &mut String) {
    let mut in_whitespace = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                out.push(' ');
                in_whitespace = true;
            }
        } else {
            out.push(ch);
            in_whitespace = false;
        }
    }
}

fn normalize_block_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;
    let mut pending_newline = false;

    for ch in raw.chars() {
        if ch == '\n' {
            pending_newline = true;
            pending_space = false;
        } else if ch == ' ' {
            pending_space = true;
        } else {
            if pending_newline {
                if !out.is_empty() {
                    out.push('\n');
                }
                pending_newline = false;
                pending_space = false;
            } else if pending_space {
                if !out.is_empty() {
                    out.push(' ');
                }
                pending_space = false;
            }
            out.push(ch);
        }
    }

    out
}
