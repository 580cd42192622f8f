//! Dispatch order and delimiter grammar shared by the block and inline parsers.

/// Block constructs in the order they are tried at the start of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    MathBlock,
    Plugin,
    Heading,
    FencedCode,
    IndentedCode,
    BlockQuote,
    List,
    Table,
    FootnoteDefinition,
    LinkReferenceDefinition,
    HorizontalRule,
    CustomContainer,
    HtmlComment,
    HtmlBlock,
    Paragraph,
}

pub const BLOCK_PRECEDENCE: [BlockKind; 15] = [
    BlockKind::MathBlock,
    BlockKind::Plugin,
    BlockKind::Heading,
    BlockKind::FencedCode,
    BlockKind::IndentedCode,
    BlockKind::BlockQuote,
    BlockKind::List,
    BlockKind::Table,
    BlockKind::FootnoteDefinition,
    BlockKind::LinkReferenceDefinition,
    BlockKind::HorizontalRule,
    BlockKind::CustomContainer,
    BlockKind::HtmlComment,
    BlockKind::HtmlBlock,
    BlockKind::Paragraph,
];

/// Inline constructs in the order they are tried at each position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineKind {
    Placeholder,
    LineBreak,
    Emphasis,
    LinkOrImage,
    Strikethrough,
    Underline,
    Highlight,
    Superscript,
    Subscript,
    CustomSpan,
    FootnoteReference,
    HtmlComment,
    HtmlTag,
}

pub const INLINE_PRECEDENCE: [InlineKind; 13] = [
    InlineKind::Placeholder,
    InlineKind::LineBreak,
    InlineKind::Emphasis,
    InlineKind::LinkOrImage,
    InlineKind::Strikethrough,
    InlineKind::Underline,
    InlineKind::Highlight,
    InlineKind::Superscript,
    InlineKind::Subscript,
    InlineKind::CustomSpan,
    InlineKind::FootnoteReference,
    InlineKind::HtmlComment,
    InlineKind::HtmlTag,
];

/// Formatting kinds subject to the same-type nesting rule: while parsing the
/// content of one of these, an opener of the same kind is literal text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapKind {
    Emphasis,
    Strong,
    StrongEmphasis,
    Strikethrough,
    Underline,
    Highlight,
    Superscript,
    Subscript,
    CustomSpan,
    Link,
}

/// Characters that may follow a backslash to be taken literally.
pub const ESCAPABLE_CHARS: &[char] = &[
    '\\', '`', '*', '_', '{', '}', '[', ']', '(', ')', '#', '+', '-', '.', '!', '|', '~', '=', '^',
    ':', '$',
];

pub fn is_escapable(ch: char) -> bool {
    ESCAPABLE_CHARS.contains(&ch)
}

/// Opens a protection placeholder.
pub const PLACEHOLDER_START: char = '\u{E000}';
/// Closes a protection placeholder.
pub const PLACEHOLDER_END: char = '\u{E001}';
/// Explicit hard line break inserted by the block parser.
pub const HARD_BREAK: char = '\u{E002}';
/// Opens and closes preprocessor placeholders used while stripping wrappers.
pub const WRAPPER_START: char = '\u{E003}';
pub const WRAPPER_END: char = '\u{E004}';

/// Private-use characters with internal meaning, removed from user input.
pub const SENTINELS: [char; 5] = [
    PLACEHOLDER_START,
    PLACEHOLDER_END,
    HARD_BREAK,
    WRAPPER_START,
    WRAPPER_END,
];

/// Characters that can start an inline construct; a text run stops at them.
pub fn is_inline_special(ch: char) -> bool {
    matches!(
        ch,
        '\n' | '*'
            | '_'
            | '['
            | '!'
            | '<'
            | '~'
            | '+'
            | '='
            | '^'
            | ':'
            | PLACEHOLDER_START
            | HARD_BREAK
    )
}

/// Width of leading whitespace, counting a tab as four columns.
pub fn leading_indent(line: &str) -> usize {
    let mut width = 0;
    for ch in line.chars() {
        match ch {
            ' ' => width += 1,
            '\t' => width += 4,
            _ => break,
        }
    }
    width
}

/// Removes up to `width` columns of leading whitespace.
pub fn strip_indent(line: &str, width: usize) -> &str {
    let mut removed = 0;
    for (idx, ch) in line.char_indices() {
        if removed >= width {
            return &line[idx..];
        }
        match ch {
            ' ' => removed += 1,
            '\t' => removed += 4,
            _ => return &line[idx..],
        }
    }
    ""
}

pub fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Three or more of the same rule character (`-`, `*`, `_`) and nothing else.
pub fn is_horizontal_rule(line: &str) -> bool {
    let trimmed = line.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first @ ('-' | '*' | '_')) => {
            trimmed.chars().count() >= 3 && chars.all(|ch| ch == first)
        }
        _ => false,
    }
}

pub fn is_indented_code(line: &str) -> bool {
    line.starts_with("    ") || line.starts_with('\t')
}

/// Opening fence of a fenced code block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FenceMarker {
    pub ch: char,
    pub len: usize,
    pub indent: usize,
    pub language: Option<String>,
    pub meta: Option<String>,
}

pub fn parse_fence_marker(line: &str) -> Option<FenceMarker> {
    let indent = leading_indent(line);
    if indent > 3 {
        return None;
    }
    let trimmed = line.trim();
    let ch = trimmed.chars().next()?;
    if ch != '`' && ch != '~' {
        return None;
    }
    let len = trimmed.chars().take_while(|&c| c == ch).count();
    if len < 3 {
        return None;
    }
    let info = trimmed[len..].trim();
    if ch == '`' && info.contains('`') {
        return None;
    }
    let (language, meta) = match info.split_once(char::is_whitespace) {
        Some((lang, rest)) => (lang, rest.trim()),
        None => (info, ""),
    };
    Some(FenceMarker {
        ch,
        len,
        indent,
        language: (!language.is_empty()).then(|| language.to_string()),
        meta: (!meta.is_empty()).then(|| meta.to_string()),
    })
}

pub fn is_fence_end(line: &str, open: &FenceMarker) -> bool {
    let trimmed = line.trim();
    let len = trimmed.chars().take_while(|&c| c == open.ch).count();
    len >= open.len && len == trimmed.chars().count()
}

/// List marker found at the start of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListMarker {
    pub ordered: bool,
    pub start: u64,
    /// Column of the marker.
    pub indent: usize,
    /// Byte offset where the item text begins.
    pub content_offset: usize,
    /// Column where the item text begins.
    pub content_indent: usize,
}

pub fn list_marker(line: &str) -> Option<ListMarker> {
    let indent = leading_indent(line);
    let body = line.trim_start_matches([' ', '\t']);
    let lead = line.len() - body.len();
    let (ordered, start, marker_len) = match body.chars().next()? {
        '-' | '+' | '*' => (false, 1, 1),
        '0'..='9' => {
            let digits = body.chars().take_while(char::is_ascii_digit).count();
            if digits > 9 || !body[digits..].starts_with('.') {
                return None;
            }
            (true, body[..digits].parse().ok()?, digits + 1)
        }
        _ => return None,
    };
    let rest = &body[marker_len..];
    let spaces = rest.len() - rest.trim_start_matches([' ', '\t']).len();
    if spaces == 0 {
        return None;
    }
    let pad = if spaces > 4 { 1 } else { spaces };
    Some(ListMarker {
        ordered,
        start,
        indent,
        content_offset: lead + marker_len + pad,
        content_indent: indent + marker_len + pad,
    })
}

/// `#` through `######` followed by whitespace; returns the level and the
/// heading text with any closing `#` run removed.
pub fn heading_marker(line: &str) -> Option<(u8, &str)> {
    if leading_indent(line) > 3 {
        return None;
    }
    let trimmed = line.trim();
    let level = trimmed.chars().take_while(|&c| c == '#').count();
    if !(1..=6).contains(&level) {
        return None;
    }
    let rest = &trimmed[level..];
    if !rest.starts_with([' ', '\t']) {
        return None;
    }
    let mut text = rest.trim();
    let without_closing = text.trim_end_matches('#');
    if without_closing.is_empty() || without_closing.ends_with([' ', '\t']) {
        text = without_closing.trim_end();
    }
    Some((level as u8, text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizontal_rule_requires_three_identical_chars() {
        assert!(is_horizontal_rule("---"));
        assert!(is_horizontal_rule("  *****  "));
        assert!(is_horizontal_rule("___"));
        assert!(!is_horizontal_rule("--"));
        assert!(!is_horizontal_rule("-*-"));
        assert!(!is_horizontal_rule("- - -"));
    }

    #[test]
    fn test_fence_marker_splits_language_and_meta() {
        let marker = parse_fence_marker("```rust title=\"main.rs\"").expect("fence");
        assert_eq!(marker.ch, '`');
        assert_eq!(marker.len, 3);
        assert_eq!(marker.language.as_deref(), Some("rust"));
        assert_eq!(marker.meta.as_deref(), Some("title=\"main.rs\""));
        assert!(is_fence_end("````", &marker));
        assert!(!is_fence_end("~~~", &marker));
        assert!(parse_fence_marker("``").is_none());
    }

    #[test]
    fn test_list_marker_columns() {
        let marker = list_marker("  - item").expect("marker");
        assert!(!marker.ordered);
        assert_eq!(marker.indent, 2);
        assert_eq!(marker.content_indent, 4);
        assert_eq!(&"  - item"[marker.content_offset..], "item");

        let ordered = list_marker("12. twelve").expect("ordered");
        assert!(ordered.ordered);
        assert_eq!(ordered.start, 12);
        assert_eq!(ordered.content_indent, 4);

        let empty = list_marker("-  ").expect("empty item");
        assert_eq!(empty.content_offset, 3);
        assert_eq!(&"-  "[empty.content_offset..], "");

        assert!(list_marker("-item").is_none());
        assert!(list_marker("-").is_none());
        assert!(list_marker("**bold**").is_none());
        assert!(list_marker("1.5 apples").is_none());
    }

    #[test]
    fn test_heading_marker_strips_closing_hashes() {
        assert_eq!(heading_marker("## Title ##"), Some((2, "Title")));
        assert_eq!(heading_marker("# C#"), Some((1, "C#")));
        assert_eq!(heading_marker("####### seven"), None);
        assert_eq!(heading_marker("#hashtag"), None);
    }

    #[test]
    fn test_strip_indent_counts_tabs() {
        assert_eq!(strip_indent("\tcode", 4), "code");
        assert_eq!(strip_indent("      x", 4), "  x");
        assert_eq!(leading_indent("  \tx"), 6);
    }
}
