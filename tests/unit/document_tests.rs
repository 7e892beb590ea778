/*!
 * Tests for front matter handling and code protection
 */

use vault_translator::translation::{ContentGuard, Document, MetaValue, SpanKind, compose, extract_front_matter};

#[test]
fn test_front_matter_round_trip_should_be_byte_exact() {
    let samples = [
        "",
        "Just a body\n",
        "---\ntitle: A note\ntags: [one, two]\n---\n# Heading\n\nText\n",
        "---\n# comment kept verbatim\nalias:   spaced\n---\nBody",
        "---\r\ntitle: Windows\r\n---\r\nBody\r\n",
        "---\n---\nOnly an empty block\n",
        "--- not a marker\nbody",
        "---\n- a list\n- not a mapping\n---\nbody",
    ];
    for raw in samples {
        let (front_matter, body) = extract_front_matter(raw);
        assert_eq!(compose(&front_matter, &body), raw, "{raw:?}");
    }
}

#[test]
fn test_front_matter_should_be_typed() {
    let doc = Document::parse(
        "---\ntitle: Trip\ncount: 3\nratio: 0.5\ndraft: true\ntags:\n  - travel\n  - notes\nmeta:\n  author: me\n---\nBody",
    );
    let fm = &doc.front_matter;
    assert_eq!(fm.get("title"), Some(&MetaValue::Text("Trip".to_string())));
    assert_eq!(fm.get("count"), Some(&MetaValue::Integer(3)));
    assert_eq!(fm.get("ratio"), Some(&MetaValue::Float(0.5)));
    assert_eq!(fm.get("draft"), Some(&MetaValue::Bool(true)));
    assert_eq!(
        fm.get("tags"),
        Some(&MetaValue::List(vec!["travel".to_string(), "notes".to_string()]))
    );
    assert_eq!(
        fm.get("meta").and_then(MetaValue::as_map).and_then(|m| m.get("author")),
        Some(&MetaValue::Text("me".to_string()))
    );
    assert_eq!(doc.body, "Body");
}

#[test]
fn test_missing_or_unclosed_block_should_leave_body_whole() {
    let doc = Document::parse("---\ntitle: never closed\nBody");
    assert!(doc.front_matter.is_empty());
    assert_eq!(doc.body, "---\ntitle: never closed\nBody");
}

#[test]
fn test_modified_front_matter_should_reparse_with_new_key() {
    let mut doc = Document::parse("---\ntitle: A\n---\nBody");
    doc.front_matter.insert("lang", MetaValue::from("fr"));

    let reparsed = Document::parse(&doc.compose());
    assert_eq!(reparsed.front_matter.get("title").and_then(MetaValue::as_text), Some("A"));
    assert_eq!(reparsed.front_matter.get("lang").and_then(MetaValue::as_text), Some("fr"));
    assert_eq!(reparsed.body, "Body");
}

#[test]
fn test_guard_should_restore_every_kind_of_body() {
    let bodies = [
        "",
        "no code at all",
        "one `inline` span",
        "```\nfenced\n```",
        "```rust\nfn main() {}\n```\ntext `a` and `b`\n```\nsecond\n```",
        "```\nblock\n``````\nadjacent\n```",
        "```\n`inline inside fence`\n```",
        "unclosed ``` fence with `span`",
        "`a``b` back to back",
    ];
    for body in bodies {
        let guarded = ContentGuard::protect(body);
        let restored = ContentGuard::restore(&guarded.text, &guarded.spans);
        assert!(restored.is_complete(), "{body:?}");
        assert_eq!(restored.text, body);
    }
}

#[test]
fn test_guard_should_not_double_protect_inline_inside_fence() {
    let guarded = ContentGuard::protect("```\n`x`\n```\nand `y`");
    let kinds: Vec<SpanKind> = guarded.spans.iter().map(|s| s.kind).collect();
    assert_eq!(kinds, vec![SpanKind::FencedBlock, SpanKind::InlineCode]);
    assert!(!guarded.text.contains('`'));
}

#[test]
fn test_guard_should_leave_links_in_text() {
    let guarded = ContentGuard::protect("See [[Other Note]] and [docs](https://example.com) plus `code`");
    assert!(guarded.text.contains("[[Other Note]]"));
    assert!(guarded.text.contains("[docs](https://example.com)"));
    assert_eq!(guarded.spans.len(), 1);
}

#[test]
fn test_span_ranges_should_index_original_body() {
    let body = "start `mid` end";
    let guarded = ContentGuard::protect(body);
    let span = &guarded.spans[0];
    assert_eq!(&body[span.range.clone()], "`mid`");
    assert_eq!(span.original, "`mid`");
}
