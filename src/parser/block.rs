//! Block parser: a cursor over lines, dispatched through the block
//! precedence table.

use super::context::ParseContext;
use super::html::{is_block_tag, is_raw_text_tag, parse_open_tag, TagBalance};
use super::inline::InlineParser;
use super::list::ListParser;
use super::precedence::{
    heading_marker, is_blank, is_fence_end, is_horizontal_rule, is_indented_code,
    leading_indent, list_marker, parse_fence_marker, strip_indent, BlockKind, BLOCK_PRECEDENCE,
    HARD_BREAK,
};
use super::preprocess::{collect_link_references, is_link_definition};
use super::table::{is_table_start, TableParser};
use crate::core::ast::{BlockNode, HtmlContent, HtmlElement, InlineNode};
use crate::plugins::Rendered;
use regex::Regex;
use std::sync::LazyLock;
use tracing::trace;

static FOOTNOTE_DEFINITION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[\^([^\]\s]+)\]:[ \t]*(.*)$").unwrap());
static CONTAINER_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:::[ \t]*([A-Za-z0-9_-]+)[ \t]*$").unwrap());
static PLUGIN_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{\{([A-Za-z0-9_-]+)").unwrap());

/// The node a block construct produced (None for definitions that only
/// populate a table) and the index of the first line after it.
pub type BlockStep = (Option<BlockNode>, usize);

pub struct BlockParser;

impl BlockParser {
    /// Runs the link-reference pre-pass over `lines`, then parses them.
    pub fn parse_document(lines: &[String], context: &mut ParseContext<'_>) -> Vec<BlockNode> {
        collect_link_references(lines, context);
        Self::parse(lines, context)
    }

    pub fn parse(lines: &[String], context: &mut ParseContext<'_>) -> Vec<BlockNode> {
        trace!(precedence = ?BLOCK_PRECEDENCE, lines = lines.len(), "block parse");
        let mut blocks = Vec::new();
        let mut pos = 0;
        while pos < lines.len() {
            if is_blank(&lines[pos]) {
                pos += 1;
                continue;
            }
            let (node, next) = Self::parse_block(lines, pos, context);
            blocks.extend(node);
            pos = next.max(pos + 1);
        }
        blocks
    }

    fn parse_block(lines: &[String], pos: usize, context: &mut ParseContext<'_>) -> BlockStep {
        for kind in BLOCK_PRECEDENCE {
            let step = match kind {
                BlockKind::MathBlock => math_block(lines, pos, context),
                BlockKind::Plugin => block_plugin(lines, pos, context),
                BlockKind::Heading => heading(lines, pos, context),
                BlockKind::FencedCode => fenced_code(lines, pos),
                BlockKind::IndentedCode => indented_code(lines, pos),
                BlockKind::BlockQuote => block_quote(lines, pos, context),
                BlockKind::List => ListParser::parse(lines, pos, context),
                BlockKind::Table => TableParser::parse(lines, pos, context),
                BlockKind::FootnoteDefinition => footnote_definition(lines, pos, context),
                BlockKind::LinkReferenceDefinition => {
                    is_link_definition(&lines[pos]).then_some((None, pos + 1))
                }
                BlockKind::HorizontalRule => is_horizontal_rule(&lines[pos])
                    .then_some((Some(BlockNode::HorizontalRule), pos + 1)),
                BlockKind::CustomContainer => custom_container(lines, pos, context),
                BlockKind::HtmlComment => html_comment(lines, pos, context),
                BlockKind::HtmlBlock => html_block(lines, pos, context),
                BlockKind::Paragraph => Some(paragraph(lines, pos, context)),
            };
            if let Some(step) = step {
                return step;
            }
        }
        (None, pos + 1)
    }
}

/// Whether `lines[pos]` opens a construct that interrupts a paragraph.
pub fn starts_block(lines: &[String], pos: usize, context: &ParseContext<'_>) -> bool {
    let line = &lines[pos];
    let options = context.options();
    let trimmed = line.trim_start();
    let indent = leading_indent(line);

    heading_marker(line).is_some()
        || parse_fence_marker(line).is_some()
        || (indent <= 3 && trimmed.starts_with('>'))
        || list_marker(line).is_some_and(|m| {
            m.indent <= 3 && (!m.ordered || m.start == 1) && !is_blank(&line[m.content_offset..])
        })
        || is_horizontal_rule(line)
        || (trimmed.starts_with("$$") && math_block(lines, pos, context).is_some())
        || (options.enable_plugins && block_plugin_name(trimmed, context).is_some())
        || (options.enable_custom_containers && CONTAINER_OPEN.is_match(line.trim()))
        || (options.enable_html && indent <= 3 && starts_html_block(trimmed))
        || (options.enable_footnotes && FOOTNOTE_DEFINITION.is_match(line))
        || is_table_start(lines, pos)
}

fn starts_html_block(trimmed: &str) -> bool {
    trimmed.starts_with("<!--")
        || parse_open_tag(trimmed).is_some_and(|tag| is_block_tag(&tag.name))
}

/// Paragraph holding the raw text of a container past the nesting limit.
fn flattened(lines: &[String]) -> BlockNode {
    BlockNode::Paragraph {
        children: vec![InlineNode::text(lines.join("\n"))],
    }
}

fn math_block(lines: &[String], pos: usize, context: &ParseContext<'_>) -> Option<BlockStep> {
    if !context.options().enable_math {
        return None;
    }
    let body = lines[pos].trim().strip_prefix("$$")?;
    if let Some(end) = body.find("$$") {
        let content = body[..end].trim();
        if content.is_empty() || !body[end + 2..].trim().is_empty() {
            return None;
        }
        let node = BlockNode::MathBlock {
            content: content.to_string(),
        };
        return Some((Some(node), pos + 1));
    }

    let mut content = vec![body];
    for (index, line) in lines.iter().enumerate().skip(pos + 1) {
        if let Some(last) = line.trim().strip_suffix("$$") {
            content.push(last);
            let node = BlockNode::MathBlock {
                content: content.join("\n").trim().to_string(),
            };
            return Some((Some(node), index + 1));
        }
        content.push(line);
    }
    None
}

/// Name of a registered block-parsed plugin opening `trimmed`.
fn block_plugin_name<'l>(trimmed: &'l str, context: &ParseContext<'_>) -> Option<&'l str> {
    let caps = PLUGIN_OPEN.captures(trimmed)?;
    let name = caps.get(1)?.as_str();
    context
        .registry()
        .get(name)
        .is_some_and(|plugin| plugin.is_block_parsed())
        .then_some(name)
}

fn block_plugin(lines: &[String], pos: usize, context: &ParseContext<'_>) -> Option<BlockStep> {
    if !context.options().enable_plugins {
        return None;
    }
    let first = lines[pos].trim();
    block_plugin_name(first, context)?;

    let (text, next) = if first.ends_with("}}") {
        (first.to_string(), pos + 1)
    } else if first.contains("}}") {
        return None;
    } else {
        let close = lines
            .iter()
            .enumerate()
            .skip(pos + 1)
            .find(|(_, line)| line.trim_end().ends_with("}}"))
            .map(|(index, _)| index)?;
        let mut text = first.to_string();
        for line in &lines[pos + 1..=close] {
            text.push('\n');
            text.push_str(line.trim_end());
        }
        (text, close + 1)
    };

    let node = match context.dispatch_block_plugin(&text)? {
        Rendered::Html(html) => BlockNode::HtmlBlock {
            html: HtmlContent::Raw(html),
        },
        Rendered::Text(value) => BlockNode::Paragraph {
            children: vec![InlineNode::text(value)],
        },
    };
    Some((Some(node), next))
}

fn heading(lines: &[String], pos: usize, context: &ParseContext<'_>) -> Option<BlockStep> {
    let (level, text) = heading_marker(&lines[pos])?;
    let node = BlockNode::Heading {
        level,
        children: InlineParser::parse(text, context),
    };
    Some((Some(node), pos + 1))
}

fn fenced_code(lines: &[String], pos: usize) -> Option<BlockStep> {
    let marker = parse_fence_marker(&lines[pos])?;
    let mut content = Vec::new();
    let mut next = lines.len();
    for (index, line) in lines.iter().enumerate().skip(pos + 1) {
        if is_fence_end(line, &marker) {
            next = index + 1;
            break;
        }
        content.push(strip_indent(line, marker.indent));
    }
    let node = BlockNode::FencedCodeBlock {
        content: content.join("\n"),
        language: marker.language,
        meta: marker.meta,
    };
    Some((Some(node), next))
}

fn indented_code(lines: &[String], pos: usize) -> Option<BlockStep> {
    if !is_indented_code(&lines[pos]) {
        return None;
    }
    let mut content = Vec::new();
    let mut next = pos;
    while let Some(line) = lines.get(next) {
        if !is_indented_code(line) && !is_blank(line) {
            break;
        }
        content.push(strip_indent(line, 4));
        next += 1;
    }
    while content.last().is_some_and(|line| is_blank(line)) {
        content.pop();
    }
    let node = BlockNode::CodeBlock {
        content: content.join("\n"),
    };
    Some((Some(node), next))
}

fn is_quote_line(line: &str) -> bool {
    leading_indent(line) <= 3 && line.trim_start().starts_with('>')
}

/// Removes one `>` and a single following space.
fn strip_quote_marker(line: &str) -> &str {
    let rest = &line.trim_start()[1..];
    rest.strip_prefix(' ').unwrap_or(rest)
}

fn block_quote(lines: &[String], pos: usize, context: &ParseContext<'_>) -> Option<BlockStep> {
    if !is_quote_line(&lines[pos]) {
        return None;
    }
    let mut body = Vec::new();
    let mut next = pos;
    while let Some(line) = lines.get(next) {
        if is_quote_line(line) {
            body.push(strip_quote_marker(line).to_string());
        } else if is_blank(line) && lines.get(next + 1).is_some_and(|l| is_quote_line(l)) {
            body.push(String::new());
        } else {
            break;
        }
        next += 1;
    }

    if !context.can_nest() {
        return Some((Some(flattened(&lines[pos..next])), next));
    }
    let mut nested = context.nested_quote();
    let node = BlockNode::BlockQuote {
        level: context.quote_level() + 1,
        children: BlockParser::parse_document(&body, &mut nested),
    };
    Some((Some(node), next))
}

fn footnote_definition(
    lines: &[String],
    pos: usize,
    context: &mut ParseContext<'_>,
) -> Option<BlockStep> {
    if !context.options().enable_footnotes {
        return None;
    }
    let caps = FOOTNOTE_DEFINITION.captures(&lines[pos])?;
    let label = caps[1].to_string();
    let mut body = vec![caps[2].to_string()];
    let mut next = pos + 1;
    while let Some(line) = lines.get(next) {
        if is_indented_code(line) {
            body.push(strip_indent(line, 4).to_string());
        } else if is_blank(line) && lines.get(next + 1).is_some_and(|l| is_indented_code(l)) {
            body.push(String::new());
        } else {
            break;
        }
        next += 1;
    }

    let children = if context.can_nest() {
        BlockParser::parse_document(&body, &mut context.nested())
    } else {
        vec![flattened(&body)]
    };
    context.register_footnote(&label, children);
    Some((None, next))
}

fn custom_container(lines: &[String], pos: usize, context: &ParseContext<'_>) -> Option<BlockStep> {
    if !context.options().enable_custom_containers {
        return None;
    }
    let caps = CONTAINER_OPEN.captures(lines[pos].trim())?;
    let class_name = caps[1].to_string();

    let mut depth = 1;
    let mut body = Vec::new();
    let mut next = lines.len();
    for (index, line) in lines.iter().enumerate().skip(pos + 1) {
        let trimmed = line.trim();
        if trimmed == ":::" {
            depth -= 1;
            if depth == 0 {
                next = index + 1;
                break;
            }
        } else if CONTAINER_OPEN.is_match(trimmed) {
            depth += 1;
        }
        body.push(line.clone());
    }

    if !context.can_nest() {
        return Some((Some(flattened(&lines[pos..next])), next));
    }
    let node = BlockNode::CustomContainer {
        class_name,
        children: BlockParser::parse_document(&body, &mut context.nested()),
    };
    Some((Some(node), next))
}

fn html_comment(lines: &[String], pos: usize, context: &ParseContext<'_>) -> Option<BlockStep> {
    if !context.options().enable_html {
        return None;
    }
    let first = lines[pos].trim_start();
    if leading_indent(&lines[pos]) > 3 || !first.starts_with("<!--") {
        return None;
    }
    let mut text = first.to_string();
    let mut index = pos;
    loop {
        if let Some(end) = text[4..].find("-->") {
            let end = end + 4;
            if !text[end + 3..].trim().is_empty() {
                return None;
            }
            let node = BlockNode::HtmlCommentBlock {
                content: text[4..end].to_string(),
            };
            return Some((Some(node), index + 1));
        }
        index += 1;
        let line = lines.get(index)?;
        text.push('\n');
        text.push_str(line);
    }
}

fn html_block(lines: &[String], pos: usize, context: &ParseContext<'_>) -> Option<BlockStep> {
    if !context.options().enable_html || leading_indent(&lines[pos]) > 3 {
        return None;
    }
    let first = lines[pos].trim_start();
    let tag = parse_open_tag(first)?;
    if !is_block_tag(&tag.name) {
        return None;
    }

    if tag.self_closing {
        if !first[tag.len..].trim().is_empty() {
            return None;
        }
        let element = HtmlElement {
            tag: tag.name,
            attributes: tag.attributes,
            children: Vec::new(),
            self_closing: true,
        };
        let node = BlockNode::HtmlBlock {
            html: HtmlContent::Element(element),
        };
        return Some((Some(node), pos + 1));
    }

    let mut balance = TagBalance::new(&tag.name);
    let after_open = &first[tag.len..];
    let mut inner = Vec::new();
    let mut next = lines.len();
    match balance.feed(after_open) {
        Some((start, end)) => {
            if !after_open[end..].trim().is_empty() {
                return None;
            }
            inner.push(after_open[..start].to_string());
            next = pos + 1;
        }
        None => {
            inner.push(after_open.to_string());
            for (index, line) in lines.iter().enumerate().skip(pos + 1) {
                if let Some((start, end)) = balance.feed(line) {
                    if !line[end..].trim().is_empty() {
                        return None;
                    }
                    inner.push(line[..start].to_string());
                    next = index + 1;
                    break;
                }
                inner.push(line.clone());
            }
        }
    }

    let html = if is_raw_text_tag(&tag.name) {
        HtmlContent::Raw(lines[pos..next].join("\n"))
    } else if !context.can_nest() {
        return Some((Some(flattened(&lines[pos..next])), next));
    } else {
        let children = BlockParser::parse_document(&inner, &mut context.nested());
        HtmlContent::Element(HtmlElement {
            tag: tag.name,
            attributes: tag.attributes,
            children,
            self_closing: false,
        })
    };
    Some((Some(BlockNode::HtmlBlock { html }), next))
}

fn paragraph(lines: &[String], pos: usize, context: &ParseContext<'_>) -> BlockStep {
    let mut text = String::new();
    let mut next = pos;
    while let Some(line) = lines.get(next) {
        if is_blank(line) || (next > pos && starts_block(lines, next, context)) {
            break;
        }
        if next > pos {
            let previous = &lines[next - 1];
            let hard = context.quote_line_breaks()
                || previous.ends_with("  ")
                || (previous.trim_end().ends_with('\\') && !previous.trim_end().ends_with("\\\\"));
            if text.ends_with('\\') && !text.ends_with("\\\\") {
                text.pop();
            }
            text.push(if hard { HARD_BREAK } else { '\n' });
        }
        text.push_str(line.trim());
        next += 1;
    }
    let node = BlockNode::Paragraph {
        children: InlineParser::parse(&text, context),
    };
    (Some(node), next)
}
