//! Heading ids and table-of-contents expansion.

use super::escape::escape_html;
use crate::core::ast::InlineNode;
use std::collections::HashSet;

/// Stand-in emitted for a TOC paragraph; replaced once all headings are
/// known. Built from characters that are scrubbed from parser input.
pub const TOC_MARKER: &str = "\u{E000}toc\u{E001}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub level: u8,
    pub id: String,
    pub text: String,
}

/// A paragraph consisting only of `[[toc]]` or `[toc]`, any case.
pub fn is_toc_marker(children: &[InlineNode]) -> bool {
    match children {
        [InlineNode::Text { value }] => {
            let value = value.trim().to_ascii_lowercase();
            value == "[[toc]]" || value == "[toc]"
        }
        _ => false,
    }
}

/// Lowercases, strips everything but alphanumerics, whitespace and `-`,
/// then joins words with `-`.
pub fn slugify(text: &str) -> String {
    let kept: String = text
        .to_lowercase()
        .chars()
        .filter(|ch| ch.is_alphanumeric() || ch.is_whitespace() || *ch == '-')
        .collect();
    let slug = kept.split_whitespace().collect::<Vec<_>>().join("-");
    if slug.is_empty() {
        "heading".to_string()
    } else {
        slug
    }
}

/// Hands out ids unique within one document, suffixing `-1`, `-2`, ...
#[derive(Debug, Default)]
pub struct SlugRegistry {
    used: HashSet<String>,
}

impl SlugRegistry {
    pub fn unique(&mut self, base: &str) -> String {
        let mut id = base.to_string();
        let mut suffix = 0;
        while self.used.contains(&id) {
            suffix += 1;
            id = format!("{}-{}", base, suffix);
        }
        self.used.insert(id.clone());
        id
    }
}

/// Nested `<ul>` of links to the headings within `min..=max`.
pub fn build_toc(entries: &[TocEntry], min: u8, max: u8) -> String {
    let mut out = String::from("<nav class=\"toc\">\n");
    let mut open: Vec<u8> = Vec::new();

    for entry in entries.iter().filter(|e| (min..=max).contains(&e.level)) {
        match open.last() {
            None => {
                out.push_str("<ul>\n");
                open.push(entry.level);
            }
            Some(&last) if entry.level > last => {
                out.push_str("\n<ul>\n");
                open.push(entry.level);
            }
            Some(_) => {
                out.push_str("</li>\n");
                while open.len() > 1 && open.last().is_some_and(|&l| entry.level < l) {
                    open.pop();
                    out.push_str("</ul>\n</li>\n");
                }
            }
        }
        out.push_str(&format!(
            "<li><a href=\"#{}\">{}</a>",
            escape_html(&entry.id),
            escape_html(&entry.text)
        ));
    }

    if !open.is_empty() {
        out.push_str("</li>\n");
        for _ in 1..open.len() {
            out.push_str("</ul>\n</li>\n");
        }
        out.push_str("</ul>\n");
    }
    out.push_str("</nav>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(level: u8, id: &str) -> TocEntry {
        TocEntry {
            level,
            id: id.to_string(),
            text: id.to_uppercase(),
        }
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  Déjà   vu  "), "déjà-vu");
        assert_eq!(slugify("a - b"), "a---b");
        assert_eq!(slugify("!!!"), "heading");
    }

    #[test]
    fn test_unique_ids() {
        let mut slugs = SlugRegistry::default();
        assert_eq!(slugs.unique("intro"), "intro");
        assert_eq!(slugs.unique("intro"), "intro-1");
        assert_eq!(slugs.unique("intro"), "intro-2");
        assert_eq!(slugs.unique("intro-1"), "intro-1-1");
    }

    #[test]
    fn test_toc_marker_detection() {
        assert!(is_toc_marker(&[InlineNode::text("[[TOC]]")]));
        assert!(is_toc_marker(&[InlineNode::text("[toc]")]));
        assert!(!is_toc_marker(&[InlineNode::text("see [toc]")]));
    }

    #[test]
    fn test_build_toc_nests_and_filters() {
        let entries = vec![
            entry(1, "a"),
            entry(2, "b"),
            entry(4, "skipped"),
            entry(2, "c"),
            entry(1, "d"),
        ];
        assert_eq!(
            build_toc(&entries, 1, 3),
            "<nav class=\"toc\">\n<ul>\n<li><a href=\"#a\">A</a>\n<ul>\n<li><a href=\"#b\">B</a></li>\n<li><a href=\"#c\">C</a></li>\n</ul>\n</li>\n<li><a href=\"#d\">D</a></li>\n</ul>\n</nav>\n"
        );
        assert_eq!(build_toc(&[], 1, 3), "<nav class=\"toc\">\n</nav>\n");
    }
}
