//! Markdown parsing: preprocessing, block and inline dispatch.

pub mod block;
pub mod context;
pub mod html;
pub mod inline;
pub mod link;
pub mod list;
pub mod precedence;
pub mod preprocess;
pub mod protect;
pub mod table;

use crate::core::ast::Document;
use crate::plugins::PluginRegistry;
use crate::ParseOptions;
use block::BlockParser;
use context::{ParseContext, ParseSession};
use preprocess::{scrub_sentinels, strip_html_wrappers};
use std::collections::BTreeMap;
use tracing::debug;

/// Parser bound to a set of options and a plugin registry.
#[derive(Debug, Clone)]
pub struct MarkdownParser {
    options: ParseOptions,
    registry: PluginRegistry,
}

impl MarkdownParser {
    /// Uses the built-in plugins, with `options.plugin_overrides` applied.
    pub fn new(options: ParseOptions) -> Self {
        Self::with_registry(options, PluginRegistry::with_builtins())
    }

    pub fn with_registry(options: ParseOptions, mut registry: PluginRegistry) -> Self {
        registry.apply_overrides(&options.plugin_overrides);
        Self { options, registry }
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut PluginRegistry {
        &mut self.registry
    }

    pub fn parse(&self, text: &str) -> Document {
        let scrubbed = scrub_sentinels(text);
        let source = strip_html_wrappers(&scrubbed);
        let lines: Vec<String> = source.lines().map(str::to_string).collect();

        let session = ParseSession::new(&self.options, &self.registry);
        let mut context = ParseContext::new(&session);
        let children = BlockParser::parse_document(&lines, &mut context);
        let footnotes = if self.options.enable_footnotes {
            context.take_footnotes()
        } else {
            BTreeMap::new()
        };

        debug!(
            lines = lines.len(),
            blocks = children.len(),
            footnotes = footnotes.len(),
            "parsed document"
        );
        Document {
            children,
            footnotes,
        }
    }
}

impl Default for MarkdownParser {
    fn default() -> Self {
        Self::new(ParseOptions::default())
    }
}
