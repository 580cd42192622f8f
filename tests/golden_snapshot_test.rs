use markweave::{parse, render, ParseOptions};
use pretty_assertions::assert_eq;

fn render_default(text: &str) -> String {
    render(&parse(text, &ParseOptions::default())).html
}

#[test]
fn golden_snapshot_basic_document() {
    let markdown = include_str!("golden/basic.md");
    let expected = include_str!("golden/basic.html");
    assert_eq!(render_default(markdown), expected);
}

#[test]
fn golden_snapshot_extended_syntax() {
    let markdown = include_str!("golden/extended.md");
    let expected = include_str!("golden/extended.html");
    assert_eq!(render_default(markdown), expected);
}

#[test]
fn golden_snapshot_is_deterministic() {
    let markdown = include_str!("golden/extended.md");
    assert_eq!(render_default(markdown), render_default(markdown));
}
