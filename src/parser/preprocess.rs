//! Whole-document passes that run before block parsing.

use super::context::ParseContext;
use super::precedence::{
    is_fence_end, is_indented_code, parse_fence_marker, SENTINELS, WRAPPER_END, WRAPPER_START,
};
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

static WRAPPER_HINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<(?:!doctype|/?html|head|/?body)").unwrap());
static DOCTYPE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<!DOCTYPE[^>]*>").unwrap());
static HEAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<head(?:\s[^>]*)?>.*?</head\s*>").unwrap());
static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</?html(?:\s[^>]*)?>").unwrap());
static BODY_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</?body(?:\s[^>]*)?>").unwrap());

static LINK_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^ {0,3}\[([^\]]+)\]:[ \t]*<?([^\s>]+)>?(?:[ \t]+(?:"([^"]*)"|'([^']*)'|\(([^)]*)\)))?[ \t]*$"#,
    )
    .unwrap()
});

/// Removes private-use characters that carry internal meaning.
pub fn scrub_sentinels(text: &str) -> Cow<'_, str> {
    if text.contains(SENTINELS) {
        Cow::Owned(text.chars().filter(|c| !SENTINELS.contains(c)).collect())
    } else {
        Cow::Borrowed(text)
    }
}

/// Strips `<!DOCTYPE>`, `<html>`, `<head>...</head>` and `<body>` wrappers
/// pasted around a document. Code blocks and code spans are left intact.
pub fn strip_html_wrappers(text: &str) -> Cow<'_, str> {
    if !WRAPPER_HINT.is_match(text) {
        return Cow::Borrowed(text);
    }

    let mut saved: Vec<String> = Vec::new();
    let mut protected = String::with_capacity(text.len());
    let mut fence = None;
    for (index, line) in text.split('\n').enumerate() {
        if index > 0 {
            protected.push('\n');
        }
        let in_code = match &fence {
            Some(open) => {
                if is_fence_end(line, open) {
                    fence = None;
                }
                true
            }
            None => match parse_fence_marker(line) {
                Some(open) => {
                    fence = Some(open);
                    true
                }
                None => is_indented_code(line),
            },
        };
        if in_code {
            protected.push_str(&stash(&mut saved, line));
        } else {
            protect_code_spans(line, &mut saved, &mut protected);
        }
    }

    let stripped = DOCTYPE.replace_all(&protected, "");
    let stripped = HEAD.replace_all(&stripped, "");
    let stripped = HTML_TAG.replace_all(&stripped, "");
    let stripped = BODY_TAG.replace_all(&stripped, "");

    Cow::Owned(unstash(&stripped, &saved))
}

fn stash(saved: &mut Vec<String>, fragment: &str) -> String {
    saved.push(fragment.to_string());
    format!("{}{}{}", WRAPPER_START, saved.len() - 1, WRAPPER_END)
}

fn protect_code_spans(line: &str, saved: &mut Vec<String>, out: &mut String) {
    let mut pos = 0;
    while let Some(offset) = line[pos..].find('`') {
        let open = pos + offset;
        let run = line[open..].bytes().take_while(|&b| b == b'`').count();
        let body = open + run;
        let mut search = body;
        let mut close = None;
        while let Some(rel) = line[search..].find('`') {
            let at = search + rel;
            let len = line[at..].bytes().take_while(|&b| b == b'`').count();
            if len == run {
                close = Some(at);
                break;
            }
            search = at + len;
        }
        match close {
            Some(at) => {
                out.push_str(&line[pos..open]);
                out.push_str(&stash(saved, &line[open..at + run]));
                pos = at + run;
            }
            None => {
                out.push_str(&line[pos..body]);
                pos = body;
            }
        }
    }
    out.push_str(&line[pos..]);
}

fn unstash(text: &str, saved: &[String]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    while let Some(offset) = text[pos..].find(WRAPPER_START) {
        let start = pos + offset;
        out.push_str(&text[pos..start]);
        let digits_start = start + WRAPPER_START.len_utf8();
        let restored = text[digits_start..].find(WRAPPER_END).and_then(|len| {
            let index: usize = text[digits_start..digits_start + len].parse().ok()?;
            Some((saved.get(index)?, digits_start + len + WRAPPER_END.len_utf8()))
        });
        match restored {
            Some((fragment, end)) => {
                out.push_str(fragment);
                pos = end;
            }
            None => pos = digits_start,
        }
    }
    out.push_str(&text[pos..]);
    out
}

/// A parsed `[label]: url "title"` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkDefinition {
    pub label: String,
    pub url: String,
    pub title: Option<String>,
}

pub fn parse_link_definition(line: &str) -> Option<LinkDefinition> {
    let caps = LINK_REFERENCE.captures(line)?;
    let label = caps[1].to_string();
    if label.starts_with('^') || label.trim().is_empty() {
        return None;
    }
    let title = caps
        .get(3)
        .or_else(|| caps.get(4))
        .or_else(|| caps.get(5))
        .map(|m| m.as_str().to_string());
    Some(LinkDefinition {
        label,
        url: caps[2].to_string(),
        title,
    })
}

pub fn is_link_definition(line: &str) -> bool {
    parse_link_definition(line).is_some()
}

/// Populates the context's link-reference table from every line outside
/// fenced code, so references may precede their definitions.
pub fn collect_link_references<S: AsRef<str>>(lines: &[S], context: &mut ParseContext<'_>) {
    let mut fence = None;
    for line in lines.iter().map(AsRef::as_ref) {
        match &fence {
            Some(open) => {
                if is_fence_end(line, open) {
                    fence = None;
                }
            }
            None => {
                if let Some(open) = parse_fence_marker(line) {
                    fence = Some(open);
                } else if let Some(def) = parse_link_definition(line) {
                    context.register_link_reference(&def.label, def.url, def.title);
                }
            }
        }
    }
}
