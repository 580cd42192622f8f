//! Raw HTML tag scanning shared by the block and inline parsers.

use crate::core::ast::Attributes;
use regex::Regex;
use std::sync::LazyLock;

static OPEN_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^<([A-Za-z][A-Za-z0-9-]*)((?:\s+[^\s"'>/=]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'=<>`]+))?)*)\s*(/?)>"#,
    )
    .unwrap()
});

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([^\s"'>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#).unwrap()
});

static CLOSE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^</([A-Za-z][A-Za-z0-9-]*)\s*>").unwrap());

/// Elements that start an HTML block when they open a line.
pub const BLOCK_TAGS: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "center",
    "details",
    "dialog",
    "div",
    "dl",
    "fieldset",
    "figcaption",
    "figure",
    "footer",
    "form",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "main",
    "nav",
    "ol",
    "p",
    "pre",
    "script",
    "section",
    "style",
    "summary",
    "table",
    "textarea",
    "ul",
];

/// Elements whose content is kept verbatim instead of parsed as markdown.
pub const RAW_TEXT_TAGS: &[&str] = &["pre", "script", "style", "textarea"];

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

pub fn is_block_tag(name: &str) -> bool {
    BLOCK_TAGS.contains(&name)
}

pub fn is_raw_text_tag(name: &str) -> bool {
    RAW_TEXT_TAGS.contains(&name)
}

pub fn is_void_tag(name: &str) -> bool {
    VOID_TAGS.contains(&name)
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenTag {
    /// Lowercased element name.
    pub name: String,
    pub attributes: Attributes,
    /// Written as `<tag />` or a void element.
    pub self_closing: bool,
    /// Byte length of the tag in the source.
    pub len: usize,
}

/// Parses an opening tag at the start of `text`.
pub fn parse_open_tag(text: &str) -> Option<OpenTag> {
    let caps = OPEN_TAG.captures(text)?;
    let name = caps[1].to_ascii_lowercase();
    let self_closing = !caps[3].is_empty() || is_void_tag(&name);
    Some(OpenTag {
        attributes: parse_attributes(&caps[2]),
        self_closing,
        len: caps[0].len(),
        name,
    })
}

/// Parses `key="value" key='value' key=value flag` into an ordered map.
/// Valueless attributes map to an empty string.
pub fn parse_attributes(text: &str) -> Attributes {
    ATTRIBUTE
        .captures_iter(text)
        .map(|caps| {
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            (caps[1].to_string(), value)
        })
        .collect()
}

/// Length of a closing tag for `name` at the start of `text`.
fn closing_tag_len(text: &str, name: &str) -> Option<usize> {
    let caps = CLOSE_TAG.captures(text)?;
    caps[1]
        .eq_ignore_ascii_case(name)
        .then(|| caps[0].len())
}

/// Tracks open/close nesting of one element name across text segments.
#[derive(Debug, Clone)]
pub struct TagBalance<'a> {
    name: &'a str,
    depth: usize,
}

impl<'a> TagBalance<'a> {
    /// Starts just after an opening tag for `name`.
    pub fn new(name: &'a str) -> Self {
        Self { name, depth: 1 }
    }

    /// Scans `segment`; returns the byte range of the closing tag that
    /// brings the depth back to zero.
    pub fn feed(&mut self, segment: &str) -> Option<(usize, usize)> {
        let mut pos = 0;
        while let Some(offset) = segment[pos..].find('<') {
            let at = pos + offset;
            let rest = &segment[at..];
            if let Some(len) = closing_tag_len(rest, self.name) {
                self.depth -= 1;
                if self.depth == 0 {
                    return Some((at, at + len));
                }
                pos = at + len;
                continue;
            }
            if let Some(tag) = parse_open_tag(rest) {
                if tag.name == self.name && !tag.self_closing {
                    self.depth += 1;
                }
                pos = at + tag.len;
                continue;
            }
            pos = at + 1;
        }
        None
    }
}

/// Finds the closing tag matching an already-consumed opening tag.
pub fn find_matching_close(text: &str, name: &str) -> Option<(usize, usize)> {
    TagBalance::new(name).feed(text)
}
