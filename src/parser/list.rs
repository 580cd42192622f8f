//! Ordered and unordered lists, with nesting, task items and lazy
//! continuation lines.

use super::block::{starts_block, BlockParser, BlockStep};
use super::context::ParseContext;
use super::precedence::{
    heading_marker, is_blank, is_horizontal_rule, leading_indent, list_marker, strip_indent,
    ListMarker,
};
use super::preprocess::is_link_definition;
use crate::core::ast::{BlockNode, InlineNode, ListItem};
use regex::Regex;
use std::sync::LazyLock;

static FOOTNOTE_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\[\^[^\]\s]+\]:").unwrap());

/// Lines that end a list at any indentation.
fn terminates_list(line: &str) -> bool {
    heading_marker(line.trim_start()).is_some()
        || FOOTNOTE_START.is_match(line)
        || is_link_definition(line.trim_start())
        || is_horizontal_rule(line)
}

/// Splits a `[ ]`/`[x]`/`[X]` prefix off item text.
fn task_state(text: &str) -> (Option<bool>, &str) {
    for (prefix, checked) in [("[ ]", false), ("[x]", true), ("[X]", true)] {
        if let Some(rest) = text.strip_prefix(prefix) {
            if rest.is_empty() || rest.starts_with([' ', '\t']) {
                return (Some(checked), rest.trim_start());
            }
        }
    }
    (None, text)
}

struct ItemSource {
    lines: Vec<String>,
    checked: Option<bool>,
}

pub struct ListParser;

impl ListParser {
    pub fn parse(lines: &[String], pos: usize, context: &ParseContext<'_>) -> Option<BlockStep> {
        let first = list_marker(&lines[pos])?;
        let mut sources = Vec::new();
        let mut index = pos;
        loop {
            let marker = match list_marker(&lines[index]) {
                Some(marker) if Self::is_sibling(&first, &marker) => marker,
                _ => break,
            };
            let (source, next) = Self::collect_item(lines, index, &marker, context);
            sources.push(source);
            index = next;

            let mut look = index;
            while lines.get(look).is_some_and(|line| is_blank(line)) {
                look += 1;
            }
            match lines.get(look).and_then(|line| list_marker(line)) {
                Some(marker) if Self::is_sibling(&first, &marker) => index = look,
                _ => break,
            }
        }

        if !context.can_nest() {
            let text = lines[pos..index].join("\n");
            let node = BlockNode::Paragraph {
                children: vec![InlineNode::text(text)],
            };
            return Some((Some(node), index));
        }

        let items = sources
            .into_iter()
            .map(|source| ListItem {
                children: BlockParser::parse_document(
                    &source.lines,
                    &mut context.nested_list_item(),
                ),
                depth: context.list_depth(),
                checked: source.checked,
            })
            .collect();
        let node = if first.ordered {
            BlockNode::OrderedList {
                start: first.start,
                items,
            }
        } else {
            BlockNode::UnorderedList { items }
        };
        Some((Some(node), index))
    }

    fn is_sibling(first: &ListMarker, marker: &ListMarker) -> bool {
        marker.ordered == first.ordered && marker.indent < first.content_indent
    }

    /// Collects the lines of the item whose marker is on `lines[pos]`.
    /// Returns the item body and the index of the first line after it.
    fn collect_item(
        lines: &[String],
        pos: usize,
        marker: &ListMarker,
        context: &ParseContext<'_>,
    ) -> (ItemSource, usize) {
        let (checked, first_text) = task_state(&lines[pos][marker.content_offset..]);
        let mut body: Vec<String> = Vec::new();
        let mut next = pos + 1;

        while let Some(line) = lines.get(next) {
            if is_blank(line) {
                let mut look = next;
                while lines.get(look).is_some_and(|l| is_blank(l)) {
                    look += 1;
                }
                match lines.get(look) {
                    Some(following)
                        if leading_indent(following) > marker.indent
                            && !terminates_list(following) =>
                    {
                        body.resize(body.len() + (look - next), String::new());
                        next = look;
                        continue;
                    }
                    _ => break,
                }
            }
            if terminates_list(line) {
                break;
            }
            if list_marker(line).is_some_and(|m| m.indent <= marker.indent) {
                break;
            }
            if leading_indent(line) > marker.indent {
                body.push(line.clone());
            } else if !starts_block(lines, next, context) {
                body.push(format!(
                    "{}{}",
                    " ".repeat(marker.content_indent),
                    line.trim_start()
                ));
            } else {
                break;
            }
            next += 1;
        }

        let common = body
            .iter()
            .filter(|line| !is_blank(line))
            .map(|line| leading_indent(line))
            .min()
            .unwrap_or(0);
        let mut item_lines = Vec::with_capacity(body.len() + 1);
        item_lines.push(first_text.to_string());
        item_lines.extend(body.iter().map(|line| strip_indent(line, common).to_string()));

        (
            ItemSource {
                lines: item_lines,
                checked,
            },
            next,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::context::ParseSession;
    use crate::plugins::PluginRegistry;
    use crate::ParseOptions;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> Vec<BlockNode> {
        let options = ParseOptions::default();
        let registry = PluginRegistry::new();
        let session = ParseSession::new(&options, &registry);
        let mut context = ParseContext::new(&session);
        let lines: Vec<String> = text.lines().map(str::to_string).collect();
        BlockParser::parse_document(&lines, &mut context)
    }

    fn paragraph(text: &str) -> BlockNode {
        BlockNode::Paragraph {
            children: vec![InlineNode::text(text)],
        }
    }

    fn items(block: &BlockNode) -> &[ListItem] {
        match block {
            BlockNode::UnorderedList { items } | BlockNode::OrderedList { items, .. } => items,
            other => panic!("expected a list, got {other:?}"),
        }
    }

    #[test]
    fn test_nested_depths() {
        let blocks = parse("- a\n  - b\n    - c\n- d");
        assert_eq!(blocks.len(), 1);
        let top = items(&blocks[0]);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].depth, 0);
        assert_eq!(top[0].children[0], paragraph("a"));

        let second = items(&top[0].children[1]);
        assert_eq!(second[0].depth, 1);
        let third = items(&second[0].children[1]);
        assert_eq!(third[0].depth, 2);
        assert_eq!(third[0].children, vec![paragraph("c")]);
        assert_eq!(top[1].children, vec![paragraph("d")]);
    }

    #[test]
    fn test_ordered_start_and_kind_switch() {
        let blocks = parse("3. three\n4. four\n- other");
        assert_eq!(blocks.len(), 2);
        match &blocks[0] {
            BlockNode::OrderedList { start, items } => {
                assert_eq!(*start, 3);
                assert_eq!(items.len(), 2);
            }
            other => panic!("expected ordered list, got {other:?}"),
        }
        assert!(matches!(blocks[1], BlockNode::UnorderedList { .. }));
    }

    #[test]
    fn test_task_items() {
        let blocks = parse("- [ ] todo\n- [x] done\n- plain");
        let checked: Vec<_> = items(&blocks[0]).iter().map(|i| i.checked).collect();
        assert_eq!(checked, vec![Some(false), Some(true), None]);
        assert_eq!(items(&blocks[0])[0].children, vec![paragraph("todo")]);
    }

    #[test]
    fn test_lazy_continuation_joins_paragraph() {
        let blocks = parse("- first line\nlazy line");
        assert_eq!(
            items(&blocks[0])[0].children,
            vec![BlockNode::Paragraph {
                children: vec![
                    InlineNode::text("first line"),
                    InlineNode::SoftLineBreak,
                    InlineNode::text("lazy line"),
                ]
            }]
        );
    }

    #[test]
    fn test_blank_line_then_indented_continues_item() {
        let blocks = parse("- a\n\n  second para\n- b\n\nafter");
        assert_eq!(blocks.len(), 2);
        let list = items(&blocks[0]);
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].children, vec![paragraph("a"), paragraph("second para")]);
        assert_eq!(blocks[1], paragraph("after"));
    }

    #[test]
    fn test_heading_terminates_list() {
        let blocks = parse("- a\n  # heading");
        assert_eq!(blocks.len(), 2);
        assert!(matches!(blocks[1], BlockNode::Heading { level: 1, .. }));
    }
}
