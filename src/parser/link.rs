//! Bracket, destination and autolink scanning for links and images.

use regex::Regex;
use std::sync::LazyLock;

static AUTOLINK_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^<([A-Za-z][A-Za-z0-9+.-]*://[^\s<>\x{E000}-\x{E004}]+)>").unwrap()
});
static AUTOLINK_EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^<([A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+)>",
    )
    .unwrap()
});

/// Byte index of the `]` matching the `[` at `open`, counting nested
/// brackets.
pub fn matching_bracket(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, ch) in text[open..].char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + idx);
                }
            }
            '\n' if text[open + idx..].starts_with("\n\n") => return None,
            _ => {}
        }
    }
    None
}

/// Destination and optional title of an inline link, as written between
/// the parentheses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination<'a> {
    pub url: &'a str,
    pub title: Option<&'a str>,
    /// Bytes consumed, including both parentheses.
    pub len: usize,
}

/// Parses `(url "title")` at the start of `text`.
pub fn parse_destination(text: &str) -> Option<Destination<'_>> {
    if !text.starts_with('(') {
        return None;
    }
    let mut depth = 0usize;
    let mut close = None;
    let mut quote: Option<char> = None;
    for (idx, ch) in text.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') if depth == 1 && text[..idx].ends_with(char::is_whitespace) => {
                quote = Some('"')
            }
            (None, '\'') if depth == 1 && text[..idx].ends_with(char::is_whitespace) => {
                quote = Some('\'')
            }
            (None, '(') => depth += 1,
            (None, ')') => {
                depth -= 1;
                if depth == 0 {
                    close = Some(idx);
                    break;
                }
            }
            (None, '\n') if depth == 1 && text[..idx].ends_with('\n') => return None,
            _ => {}
        }
    }
    let close = close?;
    let inner = text[1..close].trim();
    let (url, rest) = if let Some(stripped) = inner.strip_prefix('<') {
        let end = stripped.find('>')?;
        (&stripped[..end], stripped[end + 1..].trim())
    } else {
        match inner.find(char::is_whitespace) {
            Some(split) => (&inner[..split], inner[split..].trim()),
            None => (inner, ""),
        }
    };
    let title = if rest.is_empty() {
        None
    } else {
        Some(strip_title_quotes(rest)?)
    };
    Some(Destination {
        url,
        title,
        len: close + 1,
    })
}

fn strip_title_quotes(text: &str) -> Option<&str> {
    let first = text.chars().next()?;
    let last = text.chars().last()?;
    let matched = matches!((first, last), ('"', '"') | ('\'', '\'') | ('(', ')'));
    (matched && text.len() >= 2).then(|| &text[1..text.len() - 1])
}

/// A `<scheme://...>` or `<user@host>` autolink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Autolink {
    pub url: String,
    pub text: String,
    pub len: usize,
}

pub fn parse_autolink(text: &str) -> Option<Autolink> {
    if let Some(caps) = AUTOLINK_URL.captures(text) {
        return Some(Autolink {
            url: caps[1].to_string(),
            text: caps[1].to_string(),
            len: caps[0].len(),
        });
    }
    let caps = AUTOLINK_EMAIL.captures(text)?;
    Some(Autolink {
        url: format!("mailto:{}", &caps[1]),
        text: caps[1].to_string(),
        len: caps[0].len(),
    })
}

/// Reference suffix after link text: `[label]` or the collapsed `[]`.
/// Returns the label (None when collapsed) and the bytes consumed.
pub fn parse_reference_suffix(text: &str) -> Option<(Option<&str>, usize)> {
    if !text.starts_with('[') {
        return None;
    }
    let close = text.find(']')?;
    let label = &text[1..close];
    if label.contains('[') || label.contains('\n') {
        return None;
    }
    let label = (!label.trim().is_empty()).then_some(label);
    Some((label, close + 1))
}
