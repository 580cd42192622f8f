//! Typed document tree produced by the parser and consumed by renderers.

use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;

/// Ordered HTML attribute map. Source order is preserved.
pub type Attributes = IndexMap<String, String>;

/// Root of a parsed document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Document {
    pub children: Vec<BlockNode>,
    /// Footnote definitions keyed by their label as written.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub footnotes: BTreeMap<String, FootnoteDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BlockNode {
    Paragraph {
        children: Vec<InlineNode>,
    },
    Heading {
        level: u8,
        children: Vec<InlineNode>,
    },
    HorizontalRule,
    BlockQuote {
        level: usize,
        children: Vec<BlockNode>,
    },
    UnorderedList {
        items: Vec<ListItem>,
    },
    OrderedList {
        start: u64,
        items: Vec<ListItem>,
    },
    CodeBlock {
        content: String,
    },
    FencedCodeBlock {
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        language: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        meta: Option<String>,
    },
    Table {
        rows: Vec<TableRow>,
    },
    CustomContainer {
        class_name: String,
        children: Vec<BlockNode>,
    },
    HtmlBlock {
        html: HtmlContent<BlockNode>,
    },
    HtmlCommentBlock {
        content: String,
    },
    MathBlock {
        content: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListItem {
    pub children: Vec<BlockNode>,
    /// Zero for top-level items, plus one per enclosing list.
    pub depth: usize,
    /// Task-list state: `Some(false)` for `[ ]`, `Some(true)` for `[x]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
    pub is_header: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableCell {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub align: Option<Alignment>,
    pub children: Vec<InlineNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Center,
    Right,
}

impl Alignment {
    pub fn as_str(self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
        }
    }
}

/// Raw HTML, either kept verbatim or parsed into an element whose children
/// were themselves parsed as markdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HtmlContent<C> {
    Raw(String),
    Element(HtmlElement<C>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HtmlElement<C> {
    pub tag: String,
    pub attributes: Attributes,
    pub children: Vec<C>,
    pub self_closing: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum InlineNode {
    Text {
        value: String,
    },
    SoftLineBreak,
    HardLineBreak,
    Emphasis {
        children: Vec<InlineNode>,
    },
    Strong {
        children: Vec<InlineNode>,
    },
    StrongEmphasis {
        children: Vec<InlineNode>,
    },
    Code {
        value: String,
    },
    Link {
        url: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        children: Vec<InlineNode>,
    },
    Image {
        url: String,
        alt: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(skip_serializing_if = "IndexMap::is_empty")]
        attributes: Attributes,
    },
    Strikethrough {
        children: Vec<InlineNode>,
    },
    Underline {
        children: Vec<InlineNode>,
    },
    Highlight {
        children: Vec<InlineNode>,
    },
    Superscript {
        children: Vec<InlineNode>,
    },
    Subscript {
        children: Vec<InlineNode>,
    },
    CustomSpan {
        class_name: String,
        children: Vec<InlineNode>,
    },
    HtmlInline {
        html: HtmlContent<InlineNode>,
    },
    HtmlComment {
        content: String,
    },
    FootnoteReference {
        label: String,
    },
    InlineMath {
        content: String,
    },
    InlineBlockMath {
        content: String,
    },
}

impl InlineNode {
    pub fn text(value: impl Into<String>) -> Self {
        InlineNode::Text {
            value: value.into(),
        }
    }

    /// Child nodes of formatting wrappers, links and inline HTML elements.
    pub fn children(&self) -> Option<&[InlineNode]> {
        match self {
            InlineNode::Emphasis { children }
            | InlineNode::Strong { children }
            | InlineNode::StrongEmphasis { children }
            | InlineNode::Link { children, .. }
            | InlineNode::Strikethrough { children }
            | InlineNode::Underline { children }
            | InlineNode::Highlight { children }
            | InlineNode::Superscript { children }
            | InlineNode::Subscript { children }
            | InlineNode::CustomSpan { children, .. } => Some(children),
            InlineNode::HtmlInline {
                html: HtmlContent::Element(element),
            } => Some(&element.children),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FootnoteDefinition {
    pub label: String,
    pub children: Vec<BlockNode>,
}

/// Concatenates the visible text of a run of inline nodes.
pub fn plain_text(nodes: &[InlineNode]) -> String {
    let mut out = String::new();
    collect_text(nodes, &mut out);
    out
}

fn collect_text(nodes: &[InlineNode], out: &mut String) {
    for node in nodes {
        match node {
            InlineNode::Text { value } | InlineNode::Code { value } => out.push_str(value),
            InlineNode::InlineMath { content } | InlineNode::InlineBlockMath { content } => {
                out.push_str(content)
            }
            InlineNode::Image { alt, .. } => out.push_str(alt),
            InlineNode::SoftLineBreak | InlineNode::HardLineBreak => out.push(' '),
            other => {
                if let Some(children) = other.children() {
                    collect_text(children, out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_serializes_with_kebab_tag() {
        let block = BlockNode::FencedCodeBlock {
            content: "x".to_string(),
            language: Some("rust".to_string()),
            meta: None,
        };
        let json = serde_json::to_value(&block).expect("serialize");
        assert_eq!(json["type"], "fenced-code-block");
        assert_eq!(json["language"], "rust");
        assert!(json.get("meta").is_none());
    }

    #[test]
    fn test_plain_text_flattens_nested_nodes() {
        let nodes = vec![
            InlineNode::text("Hello "),
            InlineNode::Strong {
                children: vec![InlineNode::text("big")],
            },
            InlineNode::Code {
                value: "x".to_string(),
            },
        ];
        assert_eq!(plain_text(&nodes), "Hello bigx");
    }
}
