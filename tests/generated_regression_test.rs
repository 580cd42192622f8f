use markweave::core::ast::{BlockNode, InlineNode, ListItem, TableRow};
use markweave::{parse, render, Document, ParseOptions};
use pretty_assertions::assert_eq;

fn parse_default(text: &str) -> Document {
    parse(text, &ParseOptions::default())
}

fn paragraph_children(block: &BlockNode) -> &[InlineNode] {
    match block {
        BlockNode::Paragraph { children } => children,
        other => panic!("expected paragraph, got {other:?}"),
    }
}

fn list_items(block: &BlockNode) -> &[ListItem] {
    match block {
        BlockNode::UnorderedList { items } | BlockNode::OrderedList { items, .. } => items,
        other => panic!("expected list, got {other:?}"),
    }
}

fn contains_strong(nodes: &[InlineNode]) -> bool {
    nodes.iter().any(|node| {
        matches!(node, InlineNode::Strong { .. } | InlineNode::StrongEmphasis { .. })
            || node.children().is_some_and(contains_strong)
    })
}

fn strong_in_strong(nodes: &[InlineNode]) -> bool {
    nodes.iter().any(|node| match node {
        InlineNode::Strong { children } => contains_strong(children),
        other => other.children().is_some_and(strong_in_strong),
    })
}

#[test]
fn regression_plain_text_is_one_escaped_paragraph() {
    let document = parse_default("a < b & c > d");
    assert_eq!(
        document.children,
        vec![BlockNode::Paragraph {
            children: vec![InlineNode::text("a < b & c > d")]
        }]
    );
    assert_eq!(render(&document).html, "<p>a &lt; b &amp; c &gt; d</p>\n");
}

#[test]
fn regression_code_span_hides_emphasis() {
    let document = parse_default("`**not bold**`");
    assert_eq!(
        paragraph_children(&document.children[0]),
        &[InlineNode::Code {
            value: "**not bold**".to_string()
        }]
    );
}

#[test]
fn regression_no_strong_inside_strong() {
    let document = parse_default("**outer **inner** outer**");
    let children = paragraph_children(&document.children[0]);
    assert!(matches!(children[0], InlineNode::Strong { .. }));
    assert!(!strong_in_strong(children));
}

#[test]
fn regression_table_rows_are_padded() {
    let document = parse_default("| a | b | c |\n|---|:-:|---|\n| 1 |");
    let rows: &[TableRow] = match &document.children[0] {
        BlockNode::Table { rows } => rows,
        other => panic!("expected table, got {other:?}"),
    };
    assert_eq!(rows.len(), 2);
    assert!(rows[0].is_header);
    assert_eq!(rows[1].cells.len(), 3);
    assert_eq!(rows[1].cells[0].children, vec![InlineNode::text("1")]);
    assert!(rows[1].cells[1].children.is_empty());
    assert!(rows[1].cells[2].children.is_empty());
}

#[test]
fn regression_forward_link_reference_resolves() {
    let document = parse_default("See [the docs][ref].\n\n[ref]: https://example.com \"Docs\"");
    assert_eq!(document.children.len(), 1);
    assert_eq!(
        paragraph_children(&document.children[0]),
        &[
            InlineNode::text("See "),
            InlineNode::Link {
                url: "https://example.com".to_string(),
                title: Some("Docs".to_string()),
                children: vec![InlineNode::text("the docs")],
            },
            InlineNode::text("."),
        ]
    );
}

#[test]
fn regression_unresolved_reference_stays_text() {
    let document = parse_default("[text][missing]");
    assert_eq!(
        paragraph_children(&document.children[0]),
        &[InlineNode::text("[text][missing]")]
    );
}

#[test]
fn regression_list_depths_follow_nesting() {
    let document = parse_default("1. top\n   - middle\n     - bottom");
    let top = list_items(&document.children[0]);
    assert_eq!(top[0].depth, 0);
    let middle = list_items(&top[0].children[1]);
    assert_eq!(middle[0].depth, 1);
    let bottom = list_items(&middle[0].children[1]);
    assert_eq!(bottom[0].depth, 2);
    assert!(matches!(document.children[0], BlockNode::OrderedList { start: 1, .. }));
    assert!(matches!(top[0].children[1], BlockNode::UnorderedList { .. }));
}

#[test]
fn regression_footnote_reference_emitted_without_definition() {
    let document = parse_default("Claim[^missing].");
    assert_eq!(
        paragraph_children(&document.children[0])[1],
        InlineNode::FootnoteReference {
            label: "missing".to_string()
        }
    );
    assert!(document.footnotes.is_empty());
    assert!(render(&document).html.contains("href=\"#fn-missing\""));
}

// Nested containers get their own reference tables.

#[test]
fn regression_footnote_inside_blockquote_is_not_collected() {
    let document = parse_default("> quote[^q]\n>\n> [^q]: inner note");
    assert!(document.footnotes.is_empty());
    match &document.children[0] {
        BlockNode::BlockQuote { level, children } => {
            assert_eq!(*level, 1);
            assert_eq!(children.len(), 1);
        }
        other => panic!("expected blockquote, got {other:?}"),
    }
}

#[test]
fn regression_top_level_reference_not_visible_in_container() {
    let document = parse_default(":::note\n[x][top]\n:::\n\n[top]: https://a.example");
    match &document.children[0] {
        BlockNode::CustomContainer {
            class_name,
            children,
        } => {
            assert_eq!(class_name, "note");
            assert_eq!(paragraph_children(&children[0]), &[InlineNode::text("[x][top]")]);
        }
        other => panic!("expected container, got {other:?}"),
    }
}

#[test]
fn regression_top_level_reference_not_visible_in_list_item() {
    let document = parse_default("- [x][top]\n\n[top]: https://top.example\n\n[y][top]");
    assert_eq!(document.children.len(), 2);
    let items = list_items(&document.children[0]);
    assert_eq!(
        paragraph_children(&items[0].children[0]),
        &[InlineNode::text("[x][top]")]
    );
    assert!(matches!(
        paragraph_children(&document.children[1])[0],
        InlineNode::Link { ref url, .. } if url == "https://top.example"
    ));
}

#[test]
fn regression_unterminated_fence_runs_to_end() {
    let document = parse_default("```\ncode\n# not a heading");
    assert_eq!(
        document.children,
        vec![BlockNode::FencedCodeBlock {
            content: "code\n# not a heading".to_string(),
            language: None,
            meta: None,
        }]
    );
}

#[test]
fn regression_ordered_list_not_starting_at_one_does_not_interrupt() {
    let document = parse_default("para\n2. not a list");
    assert_eq!(
        document.children,
        vec![BlockNode::Paragraph {
            children: vec![
                InlineNode::text("para"),
                InlineNode::SoftLineBreak,
                InlineNode::text("2. not a list"),
            ]
        }]
    );
}

#[test]
fn regression_currency_is_not_math() {
    let document = parse_default("costs $5 and $6");
    assert_eq!(
        paragraph_children(&document.children[0]),
        &[InlineNode::text("costs $5 and $6")]
    );
}

#[test]
fn regression_nesting_limit_flattens_to_text() {
    let options = ParseOptions {
        max_nesting_depth: 1,
        ..ParseOptions::default()
    };
    let document = parse("> > deep", &options);
    assert_eq!(
        document.children,
        vec![BlockNode::BlockQuote {
            level: 1,
            children: vec![BlockNode::Paragraph {
                children: vec![InlineNode::text("> deep")]
            }],
        }]
    );
}

#[test]
fn regression_sentinel_characters_are_scrubbed() {
    let document = parse_default("a\u{E000}b\u{E001}c");
    assert_eq!(
        paragraph_children(&document.children[0]),
        &[InlineNode::text("abc")]
    );
}
