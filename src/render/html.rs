//! HTML rendering of a parsed [`Document`].

use super::escape::escape_html;
use super::math::{MathRenderer, PlainMathRenderer};
use super::toc::{build_toc, is_toc_marker, slugify, SlugRegistry, TocEntry, TOC_MARKER};
use super::{RenderOutput, Renderer};
use crate::core::ast::{
    plain_text, Attributes, BlockNode, Document, HtmlContent, InlineNode, ListItem, TableRow,
};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Shallowest heading level listed in a table of contents.
    pub toc_min_level: u8,
    /// Deepest heading level listed in a table of contents.
    pub toc_max_level: u8,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            toc_min_level: 1,
            toc_max_level: 3,
        }
    }
}

#[derive(Clone)]
pub struct HtmlRenderer {
    options: RenderOptions,
    math: Arc<dyn MathRenderer>,
}

impl fmt::Debug for HtmlRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HtmlRenderer")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Default for HtmlRenderer {
    fn default() -> Self {
        Self::new(RenderOptions::default())
    }
}

impl HtmlRenderer {
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            math: Arc::new(PlainMathRenderer),
        }
    }

    pub fn with_math_renderer(mut self, math: Arc<dyn MathRenderer>) -> Self {
        self.math = math;
        self
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }
}

impl Renderer for HtmlRenderer {
    fn render(&self, document: &Document) -> RenderOutput {
        let mut writer = HtmlWriter::new(self);
        writer.blocks(&document.children);
        writer.footnotes(document);

        let HtmlWriter {
            mut out,
            headings,
            has_toc,
            ..
        } = writer;
        if has_toc {
            let toc = build_toc(
                &headings,
                self.options.toc_min_level,
                self.options.toc_max_level,
            );
            out = out.replace(TOC_MARKER, &toc);
        }
        debug!(bytes = out.len(), headings = headings.len(), "rendered document");
        RenderOutput { html: out }
    }
}

/// Per-render state. Nothing here outlives one call to `render`.
struct HtmlWriter<'r> {
    renderer: &'r HtmlRenderer,
    out: String,
    slugs: SlugRegistry,
    headings: Vec<TocEntry>,
    /// Footnote labels in order of first reference.
    footnote_order: Vec<String>,
    reference_counts: HashMap<String, usize>,
    has_toc: bool,
}

impl<'r> HtmlWriter<'r> {
    fn new(renderer: &'r HtmlRenderer) -> Self {
        Self {
            renderer,
            out: String::new(),
            slugs: SlugRegistry::default(),
            headings: Vec::new(),
            footnote_order: Vec::new(),
            reference_counts: HashMap::new(),
            has_toc: false,
        }
    }

    fn blocks(&mut self, blocks: &[BlockNode]) {
        for block in blocks {
            self.block(block);
        }
    }

    fn block(&mut self, block: &BlockNode) {
        match block {
            BlockNode::Paragraph { children } => {
                if is_toc_marker(children) {
                    self.has_toc = true;
                    self.out.push_str(TOC_MARKER);
                    return;
                }
                self.out.push_str("<p>");
                self.inlines(children);
                self.out.push_str("</p>\n");
            }
            BlockNode::Heading { level, children } => {
                let text = plain_text(children);
                let id = self.slugs.unique(&slugify(&text));
                self.out
                    .push_str(&format!("<h{} id=\"{}\">", level, escape_html(&id)));
                self.inlines(children);
                self.out.push_str(&format!("</h{}>\n", level));
                self.headings.push(TocEntry {
                    level: *level,
                    id,
                    text,
                });
            }
            BlockNode::HorizontalRule => self.out.push_str("<hr />\n"),
            BlockNode::BlockQuote { children, .. } => {
                self.out.push_str("<blockquote>\n");
                self.blocks(children);
                self.out.push_str("</blockquote>\n");
            }
            BlockNode::UnorderedList { items } => {
                self.out.push_str("<ul>\n");
                self.list_items(items);
                self.out.push_str("</ul>\n");
            }
            BlockNode::OrderedList { start, items } => {
                if *start == 1 {
                    self.out.push_str("<ol>\n");
                } else {
                    self.out.push_str(&format!("<ol start=\"{}\">\n", start));
                }
                self.list_items(items);
                self.out.push_str("</ol>\n");
            }
            BlockNode::CodeBlock { content } => {
                self.out
                    .push_str(&format!("<pre><code>{}</code></pre>\n", escape_html(content)));
            }
            BlockNode::FencedCodeBlock {
                content, language, ..
            } => {
                let class = language
                    .as_deref()
                    .map(|lang| format!(" class=\"language-{}\"", escape_html(lang)))
                    .unwrap_or_default();
                self.out.push_str(&format!(
                    "<pre><code{}>{}</code></pre>\n",
                    class,
                    escape_html(content)
                ));
            }
            BlockNode::Table { rows } => self.table(rows),
            BlockNode::CustomContainer {
                class_name,
                children,
            } => {
                self.out
                    .push_str(&format!("<section class=\"{}\">\n", escape_html(class_name)));
                self.blocks(children);
                self.out.push_str("</section>\n");
            }
            BlockNode::HtmlBlock { html } => self.html_block(html),
            BlockNode::HtmlCommentBlock { content } => {
                self.out.push_str(&format!("<!--{}-->\n", content));
            }
            BlockNode::MathBlock { content } => {
                match self.renderer.math.render_math(content, true) {
                    Ok(html) => self
                        .out
                        .push_str(&format!("<div class=\"math-block\">\n{}\n</div>\n", html)),
                    Err(err) => {
                        debug!(error = %err, "math block fell back to source");
                        self.out.push_str(&format!(
                            "<div class=\"math-block-error\"><pre>{}</pre></div>\n",
                            escape_html(content)
                        ));
                    }
                }
            }
        }
    }

    fn list_items(&mut self, items: &[ListItem]) {
        for item in items {
            match item.checked {
                Some(checked) => {
                    self.out.push_str("<li class=\"task-list-item\">");
                    self.out.push_str(if checked {
                        "<input type=\"checkbox\" disabled checked /> "
                    } else {
                        "<input type=\"checkbox\" disabled /> "
                    });
                }
                None => self.out.push_str("<li>"),
            }

            let tight = item
                .children
                .iter()
                .filter(|child| matches!(child, BlockNode::Paragraph { .. }))
                .count()
                == 1;
            for child in &item.children {
                match child {
                    BlockNode::Paragraph { children } if tight && !is_toc_marker(children) => {
                        self.inlines(children);
                    }
                    _ => {
                        if !self.out.ends_with('\n') {
                            self.out.push('\n');
                        }
                        self.block(child);
                    }
                }
            }
            self.out.push_str("</li>\n");
        }
    }

    fn table(&mut self, rows: &[TableRow]) {
        self.out.push_str("<table>\n");
        let (header, body): (Vec<&TableRow>, Vec<&TableRow>) =
            rows.iter().partition(|row| row.is_header);
        if !header.is_empty() {
            self.out.push_str("<thead>\n");
            for row in header {
                self.table_row(row, "th");
            }
            self.out.push_str("</thead>\n");
        }
        if !body.is_empty() {
            self.out.push_str("<tbody>\n");
            for row in body {
                self.table_row(row, "td");
            }
            self.out.push_str("</tbody>\n");
        }
        self.out.push_str("</table>\n");
    }

    fn table_row(&mut self, row: &TableRow, cell_tag: &str) {
        self.out.push_str("<tr>\n");
        for cell in &row.cells {
            match cell.align {
                Some(align) => self.out.push_str(&format!(
                    "<{} style=\"text-align:{}\">",
                    cell_tag,
                    align.as_str()
                )),
                None => self.out.push_str(&format!("<{}>", cell_tag)),
            }
            self.inlines(&cell.children);
            self.out.push_str(&format!("</{}>\n", cell_tag));
        }
        self.out.push_str("</tr>\n");
    }

    fn html_block(&mut self, html: &HtmlContent<BlockNode>) {
        let element = match html {
            HtmlContent::Raw(raw) => {
                self.out.push_str(raw);
                self.out.push('\n');
                return;
            }
            HtmlContent::Element(element) => element,
        };
        let open = open_tag(&element.tag, &element.attributes, element.self_closing);
        self.out.push_str(&open);
        if element.self_closing {
            self.out.push('\n');
            return;
        }
        match element.children.as_slice() {
            [BlockNode::Paragraph { children }] if !is_toc_marker(children) => {
                self.inlines(children);
            }
            children => {
                self.out.push('\n');
                self.blocks(children);
            }
        }
        self.out.push_str(&format!("</{}>\n", element.tag));
    }

    fn footnotes(&mut self, document: &Document) {
        if document.footnotes.is_empty() {
            return;
        }
        self.out
            .push_str("<section class=\"footnotes\">\n<ol>\n");
        let mut rendered = HashSet::new();
        let mut index = 0;
        // Bodies may reference further footnotes, which extends the order.
        while index < self.footnote_order.len() {
            let label = self.footnote_order[index].clone();
            index += 1;
            if let Some(definition) = document.footnotes.get(&label) {
                rendered.insert(label.clone());
                self.footnote_item(&label, &definition.children);
            }
        }
        for (label, definition) in &document.footnotes {
            if !rendered.contains(label) {
                self.footnote_item(label, &definition.children);
            }
        }
        self.out.push_str("</ol>\n</section>\n");
    }

    fn footnote_item(&mut self, label: &str, children: &[BlockNode]) {
        let label = escape_html(label);
        self.out.push_str(&format!("<li id=\"fn-{}\">", label));
        self.blocks(children);
        self.out.push_str(&format!(
            "<a href=\"#ref-{}\" class=\"footnote-backref\">↩</a></li>\n",
            label
        ));
    }

    fn inlines(&mut self, nodes: &[InlineNode]) {
        for node in nodes {
            self.inline(node);
        }
    }

    fn wrapped(&mut self, open: &str, children: &[InlineNode], close: &str) {
        self.out.push_str(open);
        self.inlines(children);
        self.out.push_str(close);
    }

    fn inline(&mut self, node: &InlineNode) {
        match node {
            InlineNode::Text { value } => self.out.push_str(&escape_html(value)),
            InlineNode::SoftLineBreak => self.out.push(' '),
            InlineNode::HardLineBreak => self.out.push_str("<br />\n"),
            InlineNode::Emphasis { children } => self.wrapped("<em>", children, "</em>"),
            InlineNode::Strong { children } => self.wrapped("<strong>", children, "</strong>"),
            InlineNode::StrongEmphasis { children } => {
                self.wrapped("<strong><em>", children, "</em></strong>")
            }
            InlineNode::Code { value } => {
                self.out
                    .push_str(&format!("<code>{}</code>", escape_html(value)));
            }
            InlineNode::Link {
                url,
                title,
                children,
            } => {
                let open = format!(
                    "<a href=\"{}\"{}>",
                    escape_html(url),
                    title_attribute(title.as_deref())
                );
                self.wrapped(&open, children, "</a>");
            }
            InlineNode::Image {
                url,
                alt,
                title,
                attributes,
            } => {
                self.out.push_str(&format!(
                    "<img src=\"{}\" alt=\"{}\"{}{} />",
                    escape_html(url),
                    escape_html(alt),
                    title_attribute(title.as_deref()),
                    attribute_list(attributes)
                ));
            }
            InlineNode::Strikethrough { children } => self.wrapped("<del>", children, "</del>"),
            InlineNode::Underline { children } => self.wrapped("<u>", children, "</u>"),
            InlineNode::Highlight { children } => self.wrapped("<mark>", children, "</mark>"),
            InlineNode::Superscript { children } => self.wrapped("<sup>", children, "</sup>"),
            InlineNode::Subscript { children } => self.wrapped("<sub>", children, "</sub>"),
            InlineNode::CustomSpan {
                class_name,
                children,
            } => {
                let open = format!("<span class=\"{}\">", escape_html(class_name));
                self.wrapped(&open, children, "</span>");
            }
            InlineNode::HtmlInline { html } => match html {
                HtmlContent::Raw(raw) => self.out.push_str(raw),
                HtmlContent::Element(element) => {
                    let open = open_tag(&element.tag, &element.attributes, element.self_closing);
                    if element.self_closing {
                        self.out.push_str(&open);
                    } else {
                        let close = format!("</{}>", element.tag);
                        self.wrapped(&open, &element.children, &close);
                    }
                }
            },
            InlineNode::HtmlComment { content } => {
                self.out.push_str(&format!("<!--{}-->", content));
            }
            InlineNode::FootnoteReference { label } => self.footnote_reference(label),
            InlineNode::InlineMath { content } => self.inline_math(content, false),
            InlineNode::InlineBlockMath { content } => self.inline_math(content, true),
        }
    }

    fn footnote_reference(&mut self, label: &str) {
        let count = self.reference_counts.entry(label.to_string()).or_insert(0);
        *count += 1;
        let escaped = escape_html(label);
        let id = if *count == 1 {
            self.footnote_order.push(label.to_string());
            format!("ref-{}", escaped)
        } else {
            format!("ref-{}-{}", escaped, count)
        };
        self.out.push_str(&format!(
            "<sup><a href=\"#fn-{}\" id=\"{}\">[{}]</a></sup>",
            escaped, id, escaped
        ));
    }

    fn inline_math(&mut self, content: &str, display: bool) {
        match self.renderer.math.render_math(content, display) {
            Ok(html) => self.out.push_str(&html),
            Err(err) => {
                debug!(error = %err, "inline math fell back to source");
                self.out.push_str(&format!(
                    "<span class=\"math-error\" title=\"Math rendering failed\">{}</span>",
                    escape_html(content)
                ));
            }
        }
    }
}

fn title_attribute(title: Option<&str>) -> String {
    title
        .map(|title| format!(" title=\"{}\"", escape_html(title)))
        .unwrap_or_default()
}

/// ` key="value"` pairs in source order. Empty values render bare.
fn attribute_list(attributes: &Attributes) -> String {
    let mut out = String::new();
    for (key, value) in attributes {
        if value.is_empty() {
            out.push_str(&format!(" {}", key));
        } else {
            out.push_str(&format!(" {}=\"{}\"", key, escape_html(value)));
        }
    }
    out
}

fn open_tag(tag: &str, attributes: &Attributes, self_closing: bool) -> String {
    if self_closing {
        format!("<{}{} />", tag, attribute_list(attributes))
    } else {
        format!("<{}{}>", tag, attribute_list(attributes))
    }
}
