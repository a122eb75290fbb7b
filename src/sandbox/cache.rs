//! Pre-materialized bridge cache.
//!
//! The sandbox never touches the host DOM. Before evaluation, the user
//! code is scanned for literal selector arguments; each one is executed
//! against the bridge up front, and the resulting nodes (plus their
//! parents, children and siblings, transitively up to a budget) are
//! serialized as plain data. The JS prelude rebuilds proxy objects from
//! this cache; any lookup the scan did not anticipate returns
//! null/empty.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::bridge::{DomBridge, NodeId, NodeSnapshot};

/// Hard cap on the number of nodes materialized for one invocation.
/// Lookups past the budget behave like any other uncached lookup.
const MAX_CACHE_NODES: usize = 2048;

/// Literal string arguments to the query entry points: `$('…')`,
/// `$$("…")`, `querySelector`, `querySelectorAll`, `closest`.
#[allow(clippy::expect_used)]
static SELECTOR_LITERAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?:querySelectorAll|querySelector|closest|\$\$?)\s*\(\s*(?:'([^']+)'|"([^"]+)")"#,
    )
    .expect("valid regex")
});

/// One cached element: its snapshot plus relative links by id.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedNode {
    #[serde(flatten)]
    pub snapshot: NodeSnapshot,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub first_child: Option<NodeId>,
    pub last_child: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    pub prev_sibling: Option<NodeId>,
}

/// The full serialized cache handed to the sandbox.
#[derive(Debug, Default, Serialize)]
pub struct BridgeCache {
    /// Materialized nodes keyed by id.
    pub nodes: BTreeMap<NodeId, CachedNode>,
    /// Document-level match lists per scanned selector, document order.
    pub doc: BTreeMap<String, Vec<NodeId>>,
    /// Subtree match lists per (node, selector).
    pub scoped: BTreeMap<NodeId, BTreeMap<String, Vec<NodeId>>>,
}

/// Scan user code for literal selector arguments.
pub fn scan_selectors(code: &str) -> BTreeSet<String> {
    SELECTOR_LITERAL_RE
        .captures_iter(code)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Execute the scanned selectors and expand the result set into a
/// self-contained cache.
#[must_use]
pub fn build(bridge: &DomBridge, code: &str) -> BridgeCache {
    let selectors = scan_selectors(code);
    let mut cache = BridgeCache::default();
    let mut queue: VecDeque<NodeId> = VecDeque::new();

    for selector in &selectors {
        let ids: Vec<NodeId> = bridge
            .query_all(selector)
            .into_iter()
            .map(|snap| snap.id)
            .collect();
        queue.extend(ids.iter().copied());
        cache.doc.insert(selector.clone(), ids);
    }

    let mut visited: HashSet<NodeId> = HashSet::new();
    while let Some(id) = queue.pop_front() {
        if visited.contains(&id) {
            continue;
        }
        if visited.len() >= MAX_CACHE_NODES {
            break;
        }
        visited.insert(id);

        let Some(snapshot) = bridge.snapshot_of(id) else {
            continue;
        };

        let children: Vec<NodeId> = bridge.children(id).into_iter().map(|s| s.id).collect();
        let parent = bridge.parent(id, None).map(|s| s.id);
        let next_sibling = bridge.next_sibling(id).map(|s| s.id);
        let prev_sibling = bridge.prev_sibling(id).map(|s| s.id);

        queue.extend(children.iter().copied());
        queue.extend(parent);
        queue.extend(next_sibling);
        queue.extend(prev_sibling);

        let mut scoped = BTreeMap::new();
        for selector in &selectors {
            let ids: Vec<NodeId> = bridge
                .child_query_all(id, selector)
                .into_iter()
                .map(|snap| snap.id)
                .collect();
            queue.extend(ids.iter().copied());
            scoped.insert(selector.clone(), ids);
        }
        if !scoped.is_empty() {
            cache.scoped.insert(id, scoped);
        }

        cache.nodes.insert(
            id,
            CachedNode {
                snapshot,
                parent,
                first_child: children.first().copied(),
                last_child: children.last().copied(),
                children,
                next_sibling,
                prev_sibling,
            },
        );
    }

    cache
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse;

    #[test]
    fn scans_all_query_entry_points() {
        let code = r#"(api, url) => {
            const a = api.$('h1');
            const b = api.$$("p.note");
            const c = api.querySelector('#root');
            const d = api.querySelectorAll(".item");
            return a.closest('article');
        }"#;
        let selectors = scan_selectors(code);
        for expected in ["h1", "p.note", "#root", ".item", "article"] {
            assert!(selectors.contains(expected), "missing {expected}");
        }
    }

    #[test]
    fn non_literal_arguments_are_ignored() {
        let selectors = scan_selectors("(api, u) => api.$(someVariable)");
        assert!(selectors.is_empty());
    }

    #[test]
    fn cache_includes_matches_and_relatives() {
        let doc = parse("<div id='wrap'><h1>T</h1><p>body</p></div>");
        let bridge = DomBridge::new(&doc);
        let cache = build(&bridge, "(api, u) => api.$('h1').text");

        let ids = cache.doc.get("h1").expect("h1 match list");
        assert_eq!(ids.len(), 1);
        let h1 = &cache.nodes[&ids[0]];
        assert_eq!(h1.snapshot.tag, "h1");

        // The h1's parent and next sibling were pulled in transitively.
        let wrap = h1.parent.expect("parent cached");
        assert_eq!(cache.nodes[&wrap].snapshot.tag, "div");
        let p = h1.next_sibling.expect("sibling cached");
        assert_eq!(cache.nodes[&p].snapshot.tag, "p");
    }

    #[test]
    fn scoped_lists_cover_cached_nodes() {
        let doc = parse("<div id='a'><span>one</span></div><span>two</span>");
        let bridge = DomBridge::new(&doc);
        let cache = build(&bridge, "(api, u) => api.$('#a').$$('span')");

        let a_id = cache.doc.get("#a").unwrap()[0];
        let scoped = cache.scoped.get(&a_id).unwrap().get("span").unwrap();
        assert_eq!(scoped.len(), 1, "subtree query must not see outside spans");
        // Document-level list still sees both.
        assert_eq!(cache.doc.get("span").unwrap().len(), 2);
    }

    #[test]
    fn unknown_selector_yields_empty_doc_list() {
        let doc = parse("<p>x</p>");
        let bridge = DomBridge::new(&doc);
        let cache = build(&bridge, "(api, u) => api.$('article')");
        assert_eq!(cache.doc.get("article").unwrap().len(), 0);
    }
}
