//! Escaping and protection preprocessor.
//!
//! Before inline dispatch, constructs whose content must not be parsed as
//! markup are replaced by opaque placeholder tokens. Passes run in a fixed
//! order, each over the output of the previous one: escapes, code spans,
//! block math, inline math, plugin spans.

use super::precedence::{is_escapable, HARD_BREAK, PLACEHOLDER_END, PLACEHOLDER_START};
use crate::ParseOptions;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionKind {
    Escaped,
    Code,
    BlockMath,
    Math,
    Plugin,
}

impl ProtectionKind {
    fn tag(self) -> char {
        match self {
            ProtectionKind::Escaped => 'E',
            ProtectionKind::Code => 'C',
            ProtectionKind::BlockMath => 'B',
            ProtectionKind::Math => 'M',
            ProtectionKind::Plugin => 'P',
        }
    }
}

/// A protected fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Protection {
    pub kind: ProtectionKind,
    /// Full source fragment, used when the placeholder is restored.
    pub original: String,
    /// Payload: escaped char, code body, math body or plugin text.
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProtectedText {
    pub processed: String,
    pub protections: HashMap<String, Protection>,
}

impl ProtectedText {
    pub fn get(&self, token: &str) -> Option<&Protection> {
        self.protections.get(token)
    }

    /// Replaces every placeholder in `text` with its original fragment.
    pub fn restore(&self, text: &str) -> String {
        restore_with(text, &self.protections)
    }

    /// Like [`restore`](Self::restore), but escapes become the character
    /// they protect. Used for URLs, titles, alt text and attribute values.
    pub fn restore_plain(&self, text: &str) -> String {
        let restored = restore_mapped(text, &self.protections, |protection| {
            match protection.kind {
                ProtectionKind::Escaped => protection.content.as_str(),
                _ => protection.original.as_str(),
            }
        });
        restore_line_breaks(restored)
    }
}

/// Runs the protection passes over `text`.
pub struct Protector<'a> {
    options: &'a ParseOptions,
    counter: usize,
    protections: HashMap<String, Protection>,
}

impl<'a> Protector<'a> {
    pub fn new(options: &'a ParseOptions) -> Self {
        Self {
            options,
            counter: 0,
            protections: HashMap::new(),
        }
    }

    pub fn protect(mut self, text: &str) -> ProtectedText {
        let mut processed = self.protect_escapes(text);
        processed = self.protect_code_spans(&processed);
        if self.options.enable_math {
            processed = self.protect_block_math(&processed);
            processed = self.protect_inline_math(&processed);
        }
        if self.options.enable_plugins {
            processed = self.protect_plugins(&processed);
        }
        ProtectedText {
            processed,
            protections: self.protections,
        }
    }

    fn placeholder(&mut self, kind: ProtectionKind, original: String, content: String) -> String {
        let original = restore_line_breaks(original);
        let content = restore_line_breaks(content);
        self.counter += 1;
        let token = format!(
            "{}{}{}{}",
            PLACEHOLDER_START,
            kind.tag(),
            self.counter,
            PLACEHOLDER_END
        );
        self.protections.insert(
            token.clone(),
            Protection {
                kind,
                original,
                content,
            },
        );
        token
    }

    fn protect_escapes(&mut self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut chars = text.chars().peekable();
        while let Some(ch) = chars.next() {
            if ch == '\\' {
                if let Some(&next) = chars.peek() {
                    if is_escapable(next) {
                        chars.next();
                        let token = self.placeholder(
                            ProtectionKind::Escaped,
                            format!("\\{}", next),
                            next.to_string(),
                        );
                        out.push_str(&token);
                        continue;
                    }
                }
            }
            out.push(ch);
        }
        out
    }

    fn protect_code_spans(&mut self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut pos = 0;
        while let Some(offset) = text[pos..].find('`') {
            let open = pos + offset;
            let run = backtick_run(&text[open..]);
            let body_start = open + run;
            match find_closing_backticks(text, body_start, run) {
                Some(close) if !text[body_start..close].trim().is_empty() => {
                    let body = restore_with(&text[body_start..close], &self.protections);
                    let original =
                        restore_with(&text[open..close + run], &self.protections);
                    out.push_str(&text[pos..open]);
                    let token =
                        self.placeholder(ProtectionKind::Code, original, trim_code_padding(&body));
                    out.push_str(&token);
                    pos = close + run;
                }
                _ => {
                    out.push_str(&text[pos..body_start]);
                    pos = body_start;
                }
            }
        }
        out.push_str(&text[pos..]);
        out
    }

    fn protect_block_math(&mut self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut pos = 0;
        while let Some(offset) = text[pos..].find("$$") {
            let open = pos + offset;
            let body_start = open + 2;
            match text[body_start..].find("$$") {
                Some(rel) if !text[body_start..body_start + rel].trim().is_empty() => {
                    let close = body_start + rel;
                    let body = restore_with(&text[body_start..close], &self.protections);
                    let original = restore_with(&text[open..close + 2], &self.protections);
                    out.push_str(&text[pos..open]);
                    let token = self.placeholder(
                        ProtectionKind::BlockMath,
                        original,
                        body.trim().to_string(),
                    );
                    out.push_str(&token);
                    pos = close + 2;
                }
                _ => {
                    out.push_str(&text[pos..body_start]);
                    pos = body_start;
                }
            }
        }
        out.push_str(&text[pos..]);
        out
    }

    /// `$...$` on a single line. The opener must not be followed by
    /// whitespace and the closer must not be preceded by whitespace or
    /// followed by a digit, so prices like `$5 and $6` stay text.
    fn protect_inline_math(&mut self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut pos = 0;
        while let Some(offset) = text[pos..].find('$') {
            let open = pos + offset;
            let body_start = open + 1;
            match find_inline_math_close(text, body_start) {
                Some(close) => {
                    let body = restore_with(&text[body_start..close], &self.protections);
                    let original = restore_with(&text[open..close + 1], &self.protections);
                    out.push_str(&text[pos..open]);
                    let token = self.placeholder(ProtectionKind::Math, original, body);
                    out.push_str(&token);
                    pos = close + 1;
                }
                None => {
                    out.push_str(&text[pos..body_start]);
                    pos = body_start;
                }
            }
        }
        out.push_str(&text[pos..]);
        out
    }

    fn protect_plugins(&mut self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut pos = 0;
        while let Some(offset) = text[pos..].find("{{") {
            let open = pos + offset;
            let body_start = open + 2;
            match text[body_start..].find("}}") {
                Some(rel) if !text[body_start..body_start + rel].trim().is_empty() => {
                    let close = body_start + rel;
                    let original = restore_with(&text[open..close + 2], &self.protections);
                    let body = restore_with(&text[body_start..close], &self.protections);
                    out.push_str(&text[pos..open]);
                    let token = self.placeholder(ProtectionKind::Plugin, original, body);
                    out.push_str(&token);
                    pos = close + 2;
                }
                _ => {
                    out.push_str(&text[pos..body_start]);
                    pos = body_start;
                }
            }
        }
        out.push_str(&text[pos..]);
        out
    }
}

/// Convenience wrapper around [`Protector`].
pub fn protect(text: &str, options: &ParseOptions) -> ProtectedText {
    Protector::new(options).protect(text)
}

/// Length in bytes of the placeholder token starting at `text[0]`, if any.
pub fn placeholder_len(text: &str) -> Option<usize> {
    if !text.starts_with(PLACEHOLDER_START) {
        return None;
    }
    let end = text.find(PLACEHOLDER_END)?;
    Some(end + PLACEHOLDER_END.len_utf8())
}

/// Turns hard-break markers back into plain newlines, for payloads that
/// are emitted verbatim instead of being parsed as inline content.
pub fn restore_line_breaks(text: String) -> String {
    if text.contains(HARD_BREAK) {
        text.replace(HARD_BREAK, "\n")
    } else {
        text
    }
}

fn restore_with(text: &str, protections: &HashMap<String, Protection>) -> String {
    restore_mapped(text, protections, |protection| protection.original.as_str())
}

fn restore_mapped(
    text: &str,
    protections: &HashMap<String, Protection>,
    fragment: impl Fn(&Protection) -> &str,
) -> String {
    if !text.contains(PLACEHOLDER_START) {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    while let Some(offset) = text[pos..].find(PLACEHOLDER_START) {
        let start = pos + offset;
        out.push_str(&text[pos..start]);
        match placeholder_len(&text[start..]) {
            Some(len) => {
                let token = &text[start..start + len];
                if let Some(protection) = protections.get(token) {
                    out.push_str(fragment(protection));
                }
                pos = start + len;
            }
            None => {
                pos = start + PLACEHOLDER_START.len_utf8();
            }
        }
    }
    out.push_str(&text[pos..]);
    out
}

fn backtick_run(text: &str) -> usize {
    text.bytes().take_while(|&b| b == b'`').count()
}

/// Byte index of a backtick run of exactly `len` at or after `from`.
fn find_closing_backticks(text: &str, from: usize, len: usize) -> Option<usize> {
    let mut pos = from;
    while let Some(offset) = text[pos..].find('`') {
        let start = pos + offset;
        let run = backtick_run(&text[start..]);
        if run == len {
            return Some(start);
        }
        pos = start + run;
    }
    None
}

fn trim_code_padding(body: &str) -> String {
    if body.len() >= 2 && body.starts_with(' ') && body.ends_with(' ') && !body.trim().is_empty()
    {
        body[1..body.len() - 1].to_string()
    } else {
        body.to_string()
    }
}

fn find_inline_math_close(text: &str, body_start: usize) -> Option<usize> {
    let rest = &text[body_start..];
    let first = rest.chars().next()?;
    if first.is_whitespace() || first == '$' {
        return None;
    }
    let line_end = rest.find(['\n', HARD_BREAK]).unwrap_or(rest.len());
    let close = rest[..line_end].find('$')?;
    if close == 0 || rest[..close].ends_with(char::is_whitespace) {
        return None;
    }
    if rest[close + 1..].starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    Some(body_start + close)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(protected: &ProtectedText) -> Vec<ProtectionKind> {
        let mut kinds: Vec<_> = protected.protections.values().map(|p| p.kind).collect();
        kinds.sort_by_key(|k| k.tag());
        kinds
    }

    #[test]
    fn test_escape_is_protected_first() {
        let options = ParseOptions::default();
        let protected = protect(r"\*not emphasis\*", &options);
        assert!(!protected.processed.contains('*'));
        assert_eq!(protected.protections.len(), 2);
        assert!(protected
            .protections
            .values()
            .all(|p| p.kind == ProtectionKind::Escaped && p.content == "*"));
        assert_eq!(protected.restore(&protected.processed), r"\*not emphasis\*");
    }

    #[test]
    fn test_code_span_restores_escapes_inside() {
        let options = ParseOptions::default();
        let protected = protect(r"`a\*b` and **x**", &options);
        let code = protected
            .protections
            .values()
            .find(|p| p.kind == ProtectionKind::Code)
            .expect("code protection");
        assert_eq!(code.content, r"a\*b");
        assert!(protected.processed.ends_with(" and **x**"));
    }

    #[test]
    fn test_code_span_requires_equal_length_closer() {
        let options = ParseOptions::default();
        let protected = protect("``a ` b``", &options);
        let code = protected.protections.values().next().expect("code");
        assert_eq!(code.content, "a ` b");

        let unmatched = protect("`open only", &options);
        assert!(unmatched.protections.is_empty());
        assert_eq!(unmatched.processed, "`open only");
    }

    #[test]
    fn test_math_and_plugin_passes() {
        let options = ParseOptions::default();
        let protected = protect("$$x^2$$ then $a_b$ and {{emoji smile}}", &options);
        assert_eq!(
            kinds(&protected),
            vec![
                ProtectionKind::BlockMath,
                ProtectionKind::Math,
                ProtectionKind::Plugin
            ]
        );
        assert!(!protected.processed.contains('$'));
        assert!(!protected.processed.contains("{{"));
    }

    #[test]
    fn test_prices_are_not_math() {
        let options = ParseOptions::default();
        let protected = protect("costs $5 and $6 today", &options);
        assert!(protected.protections.is_empty());
    }

    #[test]
    fn test_disabled_math_is_not_protected() {
        let options = ParseOptions {
            enable_math: false,
            ..ParseOptions::default()
        };
        let protected = protect("$x$", &options);
        assert!(protected.protections.is_empty());
    }

    #[test]
    fn test_restore_plain_unescapes() {
        let options = ParseOptions::default();
        let protected = protect(r"a\_b `c\_d`", &options);
        assert_eq!(protected.restore_plain(&protected.processed), r"a_b `c\_d`");
    }

    #[test]
    fn test_hard_breaks_become_newlines_in_payloads() {
        let options = ParseOptions::default();
        let text = format!("`a{HARD_BREAK}b` {{{{emoji{HARD_BREAK}smile}}}}");
        let protected = protect(&text, &options);
        assert_eq!(protected.protections.len(), 2);
        assert!(protected
            .protections
            .values()
            .all(|p| !p.content.contains(HARD_BREAK) && !p.original.contains(HARD_BREAK)));
        let code = protected
            .protections
            .values()
            .find(|p| p.kind == ProtectionKind::Code)
            .expect("code protection");
        assert_eq!(code.content, "a\nb");
    }

    #[test]
    fn test_inline_math_stops_at_hard_break() {
        let options = ParseOptions::default();
        let protected = protect(&format!("cost $x{HARD_BREAK}y$ end"), &options);
        assert!(protected.protections.is_empty());
        assert_eq!(protected.restore_plain(&format!("a{HARD_BREAK}b")), "a\nb");
    }

    #[test]
    fn test_placeholder_tokens_are_unique() {
        let options = ParseOptions::default();
        let protected = protect(r"\* \* \* `a` `a`", &options);
        assert_eq!(protected.protections.len(), 5);
    }
}
