//! Page metadata extraction.
//!
//! `parse_meta` reads the document head in one pass and never errors:
//! anything missing is an explicit null in the serialized form, lists
//! default to empty.

use dom_query::{Document, Selection};
use serde::{Deserialize, Serialize};

use crate::dom;

/// An alternate-language link from `<link rel="alternate" hreflang>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hreflang {
    pub lang: String,
    pub url: String,
}

/// Open Graph properties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenGraph {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub site_name: Option<String>,
}

/// Metadata extracted from an HTML document head.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub title: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<String>,
    pub canonical: Option<String>,
    pub robots: Option<String>,
    /// False iff `robots` contains `noindex`.
    pub index: bool,
    /// First `<h1>` text.
    pub heading: Option<String>,
    #[serde(default)]
    pub hreflang: Vec<Hreflang>,
    #[serde(default)]
    pub opengraph: OpenGraph,
}

/// Extract all metadata from an HTML document. Never errors; missing
/// fields stay `None`.
#[must_use]
pub fn parse_meta(html: &str) -> PageMeta {
    let doc = dom::parse(html);
    let mut meta = PageMeta { index: true, ..PageMeta::default() };

    meta.title = first_text(&doc, "title");
    meta.heading = first_text(&doc, "h1");

    for node in doc.select("meta").nodes() {
        let tag = Selection::from(node.clone());
        let Some(content) = dom::get_attribute(&tag, "content") else {
            continue;
        };
        if content.is_empty() {
            continue;
        }

        if let Some(name) = dom::get_attribute(&tag, "name") {
            match name.to_ascii_lowercase().as_str() {
                "description" => fill(&mut meta.description, &content),
                "keywords" => fill(&mut meta.keywords, &content),
                "robots" => fill(&mut meta.robots, &content),
                _ => {}
            }
        }

        if let Some(property) = dom::get_attribute(&tag, "property") {
            match property.to_ascii_lowercase().as_str() {
                "og:title" => fill(&mut meta.opengraph.title, &content),
                "og:description" => fill(&mut meta.opengraph.description, &content),
                "og:image" => fill(&mut meta.opengraph.image, &content),
                "og:url" => fill(&mut meta.opengraph.url, &content),
                "og:type" => fill(&mut meta.opengraph.kind, &content),
                "og:site_name" => fill(&mut meta.opengraph.site_name, &content),
                _ => {}
            }
        }
    }

    for node in doc.select("link").nodes() {
        let link = Selection::from(node.clone());
        let rel = dom::get_attribute(&link, "rel")
            .map(|r| r.to_ascii_lowercase())
            .unwrap_or_default();
        match rel.as_str() {
            "canonical" => {
                if let Some(href) = dom::get_attribute(&link, "href") {
                    fill(&mut meta.canonical, &href);
                }
            }
            "alternate" => {
                let lang = dom::get_attribute(&link, "hreflang");
                let href = dom::get_attribute(&link, "href");
                if let (Some(lang), Some(url)) = (lang, href) {
                    let lang = lang.trim().to_string();
                    let url = url.trim().to_string();
                    if !lang.is_empty() && !url.is_empty() {
                        meta.hreflang.push(Hreflang { lang, url });
                    }
                }
            }
            _ => {}
        }
    }

    meta.index = !meta
        .robots
        .as_deref()
        .is_some_and(|robots| robots.to_ascii_lowercase().contains("noindex"));

    meta
}

fn first_text(doc: &Document, selector: &str) -> Option<String> {
    let sel = doc.select(selector);
    let node = sel.nodes().first()?;
    let text = Selection::from(node.clone()).text().trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// First value wins; later duplicates are ignored.
fn fill(slot: &mut Option<String>, value: &str) {
    if slot.is_none() {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            *slot = Some(trimmed.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_nulls() {
        let meta = parse_meta("");
        assert!(meta.title.is_none());
        assert!(meta.description.is_none());
        assert!(meta.canonical.is_none());
        assert!(meta.heading.is_none());
        assert!(meta.hreflang.is_empty());
        assert!(meta.opengraph.title.is_none());
        assert!(meta.index);
    }

    #[test]
    fn first_title_and_heading_win() {
        let meta = parse_meta(
            "<title> First </title><title>Second</title><h1> Top </h1><h1>Other</h1>",
        );
        assert_eq!(meta.title.as_deref(), Some("First"));
        assert_eq!(meta.heading.as_deref(), Some("Top"));
    }

    #[test]
    fn noindex_clears_index_flag() {
        let meta = parse_meta(r#"<meta name="robots" content="NoIndex, nofollow">"#);
        assert_eq!(meta.robots.as_deref(), Some("NoIndex, nofollow"));
        assert!(!meta.index);

        let meta = parse_meta(r#"<meta name="robots" content="all">"#);
        assert!(meta.index);
    }

    #[test]
    fn duplicate_meta_keeps_first() {
        let meta = parse_meta(
            r#"<meta name="description" content="one"><meta name="description" content="two">"#,
        );
        assert_eq!(meta.description.as_deref(), Some("one"));
    }

    #[test]
    fn hreflang_requires_both_attributes() {
        let meta = parse_meta(
            r#"<link rel="alternate" hreflang="de" href="/de">
               <link rel="alternate" hreflang="fr">
               <link rel="alternate" href="/nolang">"#,
        );
        assert_eq!(meta.hreflang.len(), 1);
        assert_eq!(meta.hreflang[0].lang, "de");
        assert_eq!(meta.hreflang[0].url, "/de");
    }

    #[test]
    fn serialized_form_round_trips() {
        let meta = parse_meta(
            r#"<title>T</title>
               <meta name="description" content="D">
               <meta property="og:site_name" content="S">
               <link rel="canonical" href="https://example.com/a">"#,
        );
        let json = serde_json::to_string(&meta).unwrap();
        let back: PageMeta = serde_json::from_str(&json).unwrap();
        assert_eq!(back, meta);
    }

    #[test]
    fn missing_fields_serialize_as_null() {
        let meta = parse_meta("<title>T</title>");
        let value = serde_json::to_value(&meta).unwrap();
        assert!(value.get("description").unwrap().is_null());
        assert!(value.get("opengraph").unwrap().get("image").unwrap().is_null());
        assert_eq!(value.get("index").unwrap(), &serde_json::Value::Bool(true));
    }
}
