use crate::core::ast::{BlockNode, FootnoteDefinition};
use crate::plugins::{PluginCall, PluginRegistry, Rendered};
use crate::ParseOptions;
use std::cell::Cell;
use std::collections::{BTreeMap, HashMap};

/// State shared by every invocation within one call to the parse entry
/// point, including recursive sub-parses.
pub struct ParseSession<'a> {
    options: &'a ParseOptions,
    registry: &'a PluginRegistry,
    sequence: Cell<usize>,
}

impl<'a> ParseSession<'a> {
    pub fn new(options: &'a ParseOptions, registry: &'a PluginRegistry) -> Self {
        Self {
            options,
            registry,
            sequence: Cell::new(0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkReference {
    pub url: String,
    pub title: Option<String>,
}

/// Per-invocation parse state: reference tables plus nesting position.
pub struct ParseContext<'a> {
    session: &'a ParseSession<'a>,
    link_references: HashMap<String, LinkReference>,
    footnotes: BTreeMap<String, FootnoteDefinition>,
    depth: usize,
    list_depth: usize,
    quote_level: usize,
    quote_line_breaks: bool,
}

impl<'a> ParseContext<'a> {
    pub fn new(session: &'a ParseSession<'a>) -> Self {
        Self {
            session,
            link_references: HashMap::new(),
            footnotes: BTreeMap::new(),
            depth: 0,
            list_depth: 0,
            quote_level: 0,
            quote_line_breaks: false,
        }
    }

    /// Context for a recursive sub-parse. Reference tables start empty.
    pub fn nested(&self) -> ParseContext<'a> {
        Self {
            session: self.session,
            link_references: HashMap::new(),
            footnotes: BTreeMap::new(),
            depth: self.depth + 1,
            list_depth: self.list_depth,
            quote_level: self.quote_level,
            quote_line_breaks: false,
        }
    }

    /// Context for a blockquote body.
    pub fn nested_quote(&self) -> ParseContext<'a> {
        let mut context = self.nested();
        context.quote_level += 1;
        context.quote_line_breaks = true;
        context
    }

    /// Context for a list item body, one list level deeper.
    pub fn nested_list_item(&self) -> ParseContext<'a> {
        let mut context = self.nested();
        context.list_depth += 1;
        context
    }

    pub fn options(&self) -> &'a ParseOptions {
        self.session.options
    }

    pub fn registry(&self) -> &'a PluginRegistry {
        self.session.registry
    }

    /// Whether another container level may be opened.
    pub fn can_nest(&self) -> bool {
        self.depth < self.options().max_nesting_depth
    }

    pub fn list_depth(&self) -> usize {
        self.list_depth
    }

    pub fn quote_level(&self) -> usize {
        self.quote_level
    }

    pub fn quote_line_breaks(&self) -> bool {
        self.quote_line_breaks
    }

    pub fn next_sequence(&self) -> usize {
        let next = self.session.sequence.get() + 1;
        self.session.sequence.set(next);
        next
    }

    /// Records a link reference definition. The first definition wins.
    pub fn register_link_reference(&mut self, label: &str, url: String, title: Option<String>) {
        self.link_references
            .entry(normalize_label(label))
            .or_insert(LinkReference { url, title });
    }

    pub fn link_reference(&self, label: &str) -> Option<&LinkReference> {
        self.link_references.get(&normalize_label(label))
    }

    /// Records a footnote definition. The first definition wins.
    pub fn register_footnote(&mut self, label: &str, children: Vec<BlockNode>) {
        self.footnotes
            .entry(label.to_string())
            .or_insert_with(|| FootnoteDefinition {
                label: label.to_string(),
                children,
            });
    }

    pub fn take_footnotes(&mut self) -> BTreeMap<String, FootnoteDefinition> {
        std::mem::take(&mut self.footnotes)
    }

    /// Offers a protected `{{...}}` span to the plugin registry.
    pub fn dispatch_inline_plugin(&self, text: &str) -> Option<Rendered> {
        let call = PluginCall {
            text,
            sequence: self.next_sequence(),
        };
        self.registry().dispatch_inline(&call)
    }

    /// Offers a standalone `{{...}}` block to the plugin registry.
    pub fn dispatch_block_plugin(&self, text: &str) -> Option<Rendered> {
        let call = PluginCall {
            text,
            sequence: self.next_sequence(),
        };
        self.registry().dispatch_block(&call)
    }
}

/// Link labels compare trimmed and case-insensitively.
pub fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_link_definition_wins() {
        let options = ParseOptions::default();
        let registry = PluginRegistry::new();
        let session = ParseSession::new(&options, &registry);
        let mut context = ParseContext::new(&session);
        context.register_link_reference(" Docs ", "https://a".to_string(), None);
        context.register_link_reference("docs", "https://b".to_string(), None);
        assert_eq!(
            context.link_reference("DOCS").map(|r| r.url.as_str()),
            Some("https://a")
        );
    }

    #[test]
    fn test_nested_context_has_fresh_tables_but_shared_sequence() {
        let options = ParseOptions::default();
        let registry = PluginRegistry::new();
        let session = ParseSession::new(&options, &registry);
        let mut context = ParseContext::new(&session);
        context.register_link_reference("a", "https://a".to_string(), None);
        assert_eq!(context.next_sequence(), 1);

        let nested = context.nested();
        assert!(nested.link_reference("a").is_none());
        assert_eq!(nested.next_sequence(), 2);
    }

    #[test]
    fn test_nesting_limit() {
        let options = ParseOptions {
            max_nesting_depth: 1,
            ..ParseOptions::default()
        };
        let registry = PluginRegistry::new();
        let session = ParseSession::new(&options, &registry);
        let context = ParseContext::new(&session);
        assert!(context.can_nest());
        assert!(!context.nested().can_nest());
    }
}
