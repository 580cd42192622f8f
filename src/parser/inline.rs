//! Inline parser: turns protected paragraph text into inline nodes.

use super::context::ParseContext;
use super::html::{find_matching_close, parse_open_tag};
use super::link::{
    matching_bracket, parse_autolink, parse_destination, parse_reference_suffix,
};
use super::precedence::{
    is_inline_special, InlineKind, WrapKind, HARD_BREAK, INLINE_PRECEDENCE, SENTINELS,
};
use super::protect::{
    placeholder_len, protect, restore_line_breaks, ProtectedText, ProtectionKind,
};
use crate::core::ast::{Attributes, HtmlContent, HtmlElement, InlineNode};
use crate::plugins::Rendered;
use regex::Regex;
use std::sync::LazyLock;

static CUSTOM_SPAN_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^::([A-Za-z0-9_-]+)\[").unwrap());
static FOOTNOTE_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[\^([^\]\s]+)\]").unwrap());

/// Parser for inline text.
pub struct InlineParser;

impl InlineParser {
    /// Parses `text` at the top inline level.
    pub fn parse(text: &str, context: &ParseContext<'_>) -> Vec<InlineNode> {
        Self::parse_wrapped(text, context, None, 0)
    }

    /// Parses text that has already been through the protection passes.
    pub fn parse_protected(
        protected: &ProtectedText,
        context: &ParseContext<'_>,
        wrapping: Option<WrapKind>,
    ) -> Vec<InlineNode> {
        Scanner::new(protected, context, wrapping, 0).run()
    }

    fn parse_wrapped(
        text: &str,
        context: &ParseContext<'_>,
        wrapping: Option<WrapKind>,
        depth: usize,
    ) -> Vec<InlineNode> {
        let protected = protect(text, context.options());
        Scanner::new(&protected, context, wrapping, depth).run()
    }
}

/// A matched construct: the nodes it produced and the bytes it consumed.
type Step = (Vec<InlineNode>, usize);

struct Scanner<'p, 'c, 'a> {
    protected: &'p ProtectedText,
    src: &'p str,
    context: &'c ParseContext<'a>,
    wrapping: Option<WrapKind>,
    depth: usize,
    nodes: Vec<InlineNode>,
    text: String,
}

impl<'p, 'c, 'a> Scanner<'p, 'c, 'a> {
    fn new(
        protected: &'p ProtectedText,
        context: &'c ParseContext<'a>,
        wrapping: Option<WrapKind>,
        depth: usize,
    ) -> Self {
        Self {
            protected,
            src: &protected.processed,
            context,
            wrapping,
            depth,
            nodes: Vec::new(),
            text: String::new(),
        }
    }

    fn run(mut self) -> Vec<InlineNode> {
        let mut pos = 0;
        while pos < self.src.len() {
            let rest = &self.src[pos..];
            let Some(ch) = rest.chars().next() else {
                break;
            };

            if !is_inline_special(ch) {
                let len = rest
                    .char_indices()
                    .skip(1)
                    .find(|&(_, c)| is_inline_special(c))
                    .map(|(idx, _)| idx)
                    .unwrap_or(rest.len());
                self.text.push_str(&rest[..len]);
                pos += len;
                continue;
            }

            match self.dispatch(pos) {
                Some((nodes, len)) => {
                    for node in nodes {
                        self.push(node);
                    }
                    pos += len;
                }
                None => {
                    if !SENTINELS.contains(&ch) {
                        self.text.push(ch);
                    }
                    pos += ch.len_utf8();
                }
            }
        }
        self.flush();
        self.nodes
    }

    fn push(&mut self, node: InlineNode) {
        match node {
            InlineNode::Text { value } => self.text.push_str(&value),
            other => {
                self.flush();
                self.nodes.push(other);
            }
        }
    }

    fn flush(&mut self) {
        if !self.text.is_empty() {
            self.nodes.push(InlineNode::Text {
                value: std::mem::take(&mut self.text),
            });
        }
    }

    fn dispatch(&self, pos: usize) -> Option<Step> {
        let rest = &self.src[pos..];
        INLINE_PRECEDENCE.iter().find_map(|kind| match kind {
            InlineKind::Placeholder => self.placeholder(rest),
            InlineKind::LineBreak => line_break(rest),
            InlineKind::Emphasis => self.emphasis(pos),
            InlineKind::LinkOrImage => self.link_or_image(rest),
            InlineKind::Strikethrough => self.delimited(rest, "~~", WrapKind::Strikethrough),
            InlineKind::Underline => self.delimited(rest, "++", WrapKind::Underline),
            InlineKind::Highlight => self.delimited(rest, "==", WrapKind::Highlight),
            InlineKind::Superscript => self.delimited(rest, "^", WrapKind::Superscript),
            InlineKind::Subscript => self.subscript(rest),
            InlineKind::CustomSpan => self.custom_span(rest),
            InlineKind::FootnoteReference => self.footnote_reference(rest),
            InlineKind::HtmlComment => self.html_comment(rest),
            InlineKind::HtmlTag => self.html_tag(rest),
        })
    }

    /// Parses enclosed content one level deeper under `kind`.
    fn children(&self, inner: &str, kind: WrapKind) -> Vec<InlineNode> {
        let restored = self.protected.restore(inner);
        InlineParser::parse_wrapped(&restored, self.context, Some(kind), self.depth + 1)
    }

    /// Children of an inline HTML element keep the current wrapping kind.
    fn element_children(&self, inner: &str) -> Vec<InlineNode> {
        let restored = self.protected.restore(inner);
        InlineParser::parse_wrapped(&restored, self.context, self.wrapping, self.depth + 1)
    }

    fn can_open(&self) -> bool {
        self.depth < self.context.options().max_nesting_depth
    }

    fn plain(&self, text: &str) -> String {
        self.protected.restore_plain(text)
    }

    fn placeholder(&self, rest: &str) -> Option<Step> {
        let len = placeholder_len(rest)?;
        let protection = self.protected.get(&rest[..len])?;
        let node = match protection.kind {
            ProtectionKind::Escaped => InlineNode::text(protection.content.clone()),
            ProtectionKind::Code => InlineNode::Code {
                value: protection.content.clone(),
            },
            ProtectionKind::BlockMath => InlineNode::InlineBlockMath {
                content: protection.content.clone(),
            },
            ProtectionKind::Math => InlineNode::InlineMath {
                content: protection.content.clone(),
            },
            ProtectionKind::Plugin => {
                match self.context.dispatch_inline_plugin(&protection.original) {
                    Some(Rendered::Text(text)) => InlineNode::text(text),
                    Some(Rendered::Html(html)) => InlineNode::HtmlInline {
                        html: HtmlContent::Raw(html),
                    },
                    None => InlineNode::text(protection.original.clone()),
                }
            }
        };
        Some((vec![node], len))
    }

    fn emphasis(&self, pos: usize) -> Option<Step> {
        let rest = &self.src[pos..];
        let delim = match rest.as_bytes().first()? {
            b'*' => '*',
            b'_' => '_',
            _ => return None,
        };
        if delim == '_' && self.src[..pos].ends_with(char::is_alphanumeric) {
            return None;
        }
        let run = rest.bytes().take_while(|&b| b == delim as u8).count();
        let widest = run.min(3);
        if self.wrapping == Some(emphasis_kind(widest)) {
            return Some((vec![InlineNode::text(&rest[..widest])], widest));
        }
        if !self.can_open() {
            return None;
        }
        (1..=widest)
            .rev()
            .filter(|&width| self.wrapping != Some(emphasis_kind(width)))
            .find_map(|width| {
                let close = find_emphasis_close(rest, delim, width)?;
                let kind = emphasis_kind(width);
                let children = self.children(&rest[width..close], kind);
                let node = match kind {
                    WrapKind::StrongEmphasis => InlineNode::StrongEmphasis { children },
                    WrapKind::Strong => InlineNode::Strong { children },
                    _ => InlineNode::Emphasis { children },
                };
                Some((vec![node], close + width))
            })
    }

    fn delimited(&self, rest: &str, delim: &str, kind: WrapKind) -> Option<Step> {
        if !rest.starts_with(delim) {
            return None;
        }
        if self.wrapping == Some(kind) {
            return Some((vec![InlineNode::text(delim)], delim.len()));
        }
        if !self.can_open() {
            return None;
        }
        let body = &rest[delim.len()..];
        let close = body.find(delim)?;
        let inner = &body[..close];
        if inner.trim().is_empty() || inner.starts_with(char::is_whitespace) {
            return None;
        }
        if delim.len() == 1 && inner.contains('\n') {
            return None;
        }
        let children = self.children(inner, kind);
        let node = match kind {
            WrapKind::Strikethrough => InlineNode::Strikethrough { children },
            WrapKind::Underline => InlineNode::Underline { children },
            WrapKind::Highlight => InlineNode::Highlight { children },
            _ => InlineNode::Superscript { children },
        };
        Some((vec![node], delim.len() + close + delim.len()))
    }

    fn subscript(&self, rest: &str) -> Option<Step> {
        if !rest.starts_with('~') || rest.starts_with("~~") {
            return None;
        }
        if self.wrapping == Some(WrapKind::Subscript) {
            return Some((vec![InlineNode::text("~")], 1));
        }
        if !self.can_open() {
            return None;
        }
        let body = &rest[1..];
        let close = body.find('~')?;
        let inner = &body[..close];
        if inner.trim().is_empty() || inner.contains('\n') || body[close..].starts_with("~~") {
            return None;
        }
        let children = self.children(inner, WrapKind::Subscript);
        Some((vec![InlineNode::Subscript { children }], close + 2))
    }

    fn custom_span(&self, rest: &str) -> Option<Step> {
        if !self.context.options().enable_custom_containers || !rest.starts_with("::") {
            return None;
        }
        let caps = CUSTOM_SPAN_OPEN.captures(rest)?;
        if self.wrapping == Some(WrapKind::CustomSpan) {
            return Some((vec![InlineNode::text("::")], 2));
        }
        if !self.can_open() {
            return None;
        }
        let open = caps[0].len();
        let close = rest[open..].find("]::")?;
        let inner = &rest[open..open + close];
        let children = self.children(inner, WrapKind::CustomSpan);
        Some((
            vec![InlineNode::CustomSpan {
                class_name: caps[1].to_string(),
                children,
            }],
            open + close + 3,
        ))
    }

    fn footnote_reference(&self, rest: &str) -> Option<Step> {
        if !self.context.options().enable_footnotes {
            return None;
        }
        let caps = FOOTNOTE_REFERENCE.captures(rest)?;
        Some((
            vec![InlineNode::FootnoteReference {
                label: self.plain(&caps[1]),
            }],
            caps[0].len(),
        ))
    }

    fn html_comment(&self, rest: &str) -> Option<Step> {
        if !self.context.options().enable_html || !rest.starts_with("<!--") {
            return None;
        }
        let close = rest[4..].find("-->")?;
        Some((
            vec![InlineNode::HtmlComment {
                content: restore_line_breaks(self.protected.restore(&rest[4..4 + close])),
            }],
            4 + close + 3,
        ))
    }

    fn html_tag(&self, rest: &str) -> Option<Step> {
        if !self.context.options().enable_html || !rest.starts_with('<') {
            return None;
        }
        let tag = parse_open_tag(rest)?;
        let attributes = self.plain_attributes(&tag.attributes);
        if tag.self_closing {
            let element = HtmlElement {
                tag: tag.name,
                attributes,
                children: Vec::new(),
                self_closing: true,
            };
            return Some((
                vec![InlineNode::HtmlInline {
                    html: HtmlContent::Element(element),
                }],
                tag.len,
            ));
        }
        if !self.can_open() {
            return None;
        }
        let body = &rest[tag.len..];
        let (close_start, close_end) = find_matching_close(body, &tag.name)?;
        let children = self.element_children(&body[..close_start]);
        let element = HtmlElement {
            tag: tag.name,
            attributes,
            children,
            self_closing: false,
        };
        Some((
            vec![InlineNode::HtmlInline {
                html: HtmlContent::Element(element),
            }],
            tag.len + close_end,
        ))
    }

    fn plain_attributes(&self, attributes: &Attributes) -> Attributes {
        attributes
            .iter()
            .map(|(key, value)| (key.clone(), self.plain(value)))
            .collect()
    }

    fn link_or_image(&self, rest: &str) -> Option<Step> {
        if rest.starts_with('<') {
            let autolink = parse_autolink(rest)?;
            return Some((
                vec![InlineNode::Link {
                    url: autolink.url,
                    title: None,
                    children: vec![InlineNode::text(autolink.text)],
                }],
                autolink.len,
            ));
        }
        if rest.starts_with("![") {
            return self.image(rest);
        }
        if rest.starts_with('[') {
            return self.link(rest);
        }
        None
    }

    fn image(&self, rest: &str) -> Option<Step> {
        let close = matching_bracket(rest, 1)?;
        let alt = self.plain(&rest[2..close]);
        let after = &rest[close + 1..];

        if let Some(dest) = parse_destination(after) {
            let mut consumed = close + 1 + dest.len;
            let mut attributes = Attributes::new();
            let trailing = &rest[consumed..];
            if let Some(comment) = trailing.strip_prefix("<!--") {
                if let Some(end) = comment.find("-->") {
                    attributes = self.plain_attributes(&super::html::parse_attributes(
                        comment[..end].trim(),
                    ));
                    consumed += 4 + end + 3;
                }
            }
            let node = InlineNode::Image {
                url: self.plain(dest.url),
                alt,
                title: dest.title.map(|t| self.plain(t)),
                attributes,
            };
            return Some((vec![node], consumed));
        }

        let (label, len) = parse_reference_suffix(after)?;
        let label = label.map(|l| self.plain(l)).unwrap_or_else(|| alt.clone());
        let reference = self.context.link_reference(&label)?;
        let node = InlineNode::Image {
            url: reference.url.clone(),
            alt,
            title: reference.title.clone(),
            attributes: Attributes::new(),
        };
        Some((vec![node], close + 1 + len))
    }

    fn link(&self, rest: &str) -> Option<Step> {
        if self.wrapping == Some(WrapKind::Link) {
            return None;
        }
        if rest.starts_with("[^") && self.context.options().enable_footnotes {
            return None;
        }
        if !self.can_open() {
            return None;
        }
        let close = matching_bracket(rest, 0)?;
        let inner = &rest[1..close];
        if inner.trim().is_empty() {
            return None;
        }
        let after = &rest[close + 1..];

        let (url, title, consumed) = if let Some(dest) = parse_destination(after) {
            (
                self.plain(dest.url),
                dest.title.map(|t| self.plain(t)),
                close + 1 + dest.len,
            )
        } else {
            let (label, len) = parse_reference_suffix(after)?;
            let label = label
                .map(|l| self.plain(l))
                .unwrap_or_else(|| self.plain(inner));
            let reference = self.context.link_reference(&label)?;
            (
                reference.url.clone(),
                reference.title.clone(),
                close + 1 + len,
            )
        };

        let children = self.children(inner, WrapKind::Link);
        Some((
            vec![InlineNode::Link {
                url,
                title,
                children,
            }],
            consumed,
        ))
    }
}

fn line_break(rest: &str) -> Option<Step> {
    if rest.starts_with(HARD_BREAK) {
        Some((vec![InlineNode::HardLineBreak], HARD_BREAK.len_utf8()))
    } else if rest.starts_with('\n') {
        Some((vec![InlineNode::SoftLineBreak], 1))
    } else {
        None
    }
}

fn emphasis_kind(width: usize) -> WrapKind {
    match width {
        3 => WrapKind::StrongEmphasis,
        2 => WrapKind::Strong,
        _ => WrapKind::Emphasis,
    }
}

/// Forward search for a closing run for an opener of `width` delimiters.
///
/// A run closes when it is exactly `width` long, or is a triple run whose
/// trailing `width` characters close this opener and whose leading ones
/// close a nested opener. The closer may not follow whitespace, and `_`
/// may not close inside a word.
fn find_emphasis_close(rest: &str, delim: char, width: usize) -> Option<usize> {
    let bytes = rest.as_bytes();
    let marker = delim as u8;
    if rest[width..].starts_with(char::is_whitespace) {
        return None;
    }
    let mut pos = width;
    while pos < bytes.len() {
        if bytes[pos] != marker {
            pos += 1;
            continue;
        }
        let run = bytes[pos..].iter().take_while(|&&b| b == marker).count();
        let preceded_by_space = rest[..pos].ends_with(char::is_whitespace);
        let after = &rest[pos + run..];
        let intraword = delim == '_' && after.starts_with(char::is_alphanumeric);
        if pos > width && !preceded_by_space && !intraword {
            if run == width {
                return Some(pos);
            }
            if run == 3 && width < 3 {
                return Some(pos + run - width);
            }
            if run > 3 && width == 3 {
                return Some(pos + run - width);
            }
        }
        pos += run;
    }
    None
}
