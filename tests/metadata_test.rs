use pagescope::{parse_meta, PageMeta};

const FULL_HEAD: &str = r#"<html><head>
    <title> Example Page </title>
    <meta name="description" content="A page about examples">
    <meta name="keywords" content="example, page, test">
    <meta name="robots" content="index, follow">
    <link rel="canonical" href="https://example.com/page">
    <link rel="alternate" hreflang="de" href="https://example.com/de/page">
    <link rel="alternate" hreflang="fr" href="https://example.com/fr/page">
    <meta property="og:title" content="Example OG Title">
    <meta property="og:description" content="OG description">
    <meta property="og:image" content="https://example.com/og.png">
    <meta property="og:url" content="https://example.com/page">
    <meta property="og:type" content="article">
    <meta property="og:site_name" content="Example Site">
</head><body><h1> Main Heading </h1><p>Body</p></body></html>"#;

#[test]
fn full_head_extracts_every_field() {
    let meta = parse_meta(FULL_HEAD);

    assert_eq!(meta.title.as_deref(), Some("Example Page"));
    assert_eq!(meta.description.as_deref(), Some("A page about examples"));
    assert_eq!(meta.keywords.as_deref(), Some("example, page, test"));
    assert_eq!(meta.robots.as_deref(), Some("index, follow"));
    assert_eq!(meta.canonical.as_deref(), Some("https://example.com/page"));
    assert!(meta.index);
    assert_eq!(meta.heading.as_deref(), Some("Main Heading"));

    assert_eq!(meta.hreflang.len(), 2);
    assert_eq!(meta.hreflang[0].lang, "de");
    assert_eq!(meta.hreflang[1].url, "https://example.com/fr/page");

    assert_eq!(meta.opengraph.title.as_deref(), Some("Example OG Title"));
    assert_eq!(meta.opengraph.kind.as_deref(), Some("article"));
    assert_eq!(meta.opengraph.site_name.as_deref(), Some("Example Site"));
}

#[test]
fn bare_document_has_nulls_and_defaults() {
    let meta = parse_meta("<html><body><p>no head to speak of</p></body></html>");

    assert!(meta.title.is_none());
    assert!(meta.description.is_none());
    assert!(meta.keywords.is_none());
    assert!(meta.canonical.is_none());
    assert!(meta.robots.is_none());
    assert!(meta.heading.is_none());
    assert!(meta.hreflang.is_empty());
    assert_eq!(meta.opengraph, Default::default());
    assert!(meta.index, "index defaults to true without robots");
}

#[test]
fn noindex_flips_index() {
    let meta = parse_meta(r#"<head><meta name="robots" content="NOINDEX"></head>"#);
    assert!(!meta.index);
}

#[test]
fn parse_meta_never_errors_on_garbage() {
    for input in ["", "<<<>>>", "<title>", "plain words", "<meta content=x>"] {
        let _ = parse_meta(input);
    }
}

#[test]
fn serialized_meta_round_trips() {
    let meta = parse_meta(FULL_HEAD);
    let json = serde_json::to_string(&meta).unwrap();
    let back: PageMeta = serde_json::from_str(&json).unwrap();
    assert_eq!(back, meta);
}

#[test]
fn wire_shape_uses_explicit_nulls_and_camel_case() {
    let meta = parse_meta("<title>Only</title>");
    let value = serde_json::to_value(&meta).unwrap();

    assert_eq!(value["title"], "Only");
    assert!(value["description"].is_null());
    assert!(value["opengraph"]["siteName"].is_null());
    assert!(value["hreflang"].as_array().unwrap().is_empty());
}
