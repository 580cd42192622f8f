//! # markweave
//!
//! Extended markdown to HTML: a typed AST, a plugin system for
//! `{{name ...}}` syntax, and an async pass for plugins that fetch content.
//!
//! ## Example
//!
//! ```
//! use markweave::{parse, render, ParseOptions};
//!
//! let document = parse("# Hello\n\nSome **bold** text.", &ParseOptions::default());
//! let output = render(&document);
//! assert!(output.html.contains("<strong>bold</strong>"));
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod parser;
pub mod plugins;
pub mod render;
pub mod resolve;

pub use crate::core::ast::{BlockNode, Document, InlineNode};
pub use config::Config;
pub use error::{Error, Result};
pub use parser::MarkdownParser;
pub use plugins::{
    Plugin, PluginCall, PluginHandler, PluginOutcome, PluginRegistry, Rendered, Shape,
};
pub use render::{HtmlRenderer, MathRenderer, RenderOptions, RenderOutput, Renderer};
pub use resolve::{
    resolve_deferred_plugins, AsyncPluginProcessor, DeferredResolver, ResolverConfig,
};

use std::collections::HashMap;
use std::fmt;

/// Options for markdown parsing.
#[derive(Clone)]
pub struct ParseOptions {
    /// Recognise `$...$` and `$$...$$`.
    pub enable_math: bool,
    /// Recognise `:::name` containers and `::name[...]::` spans.
    pub enable_custom_containers: bool,
    /// Recognise `[^label]` references and definitions.
    pub enable_footnotes: bool,
    /// Recognise raw HTML blocks, tags and comments.
    pub enable_html: bool,
    /// Recognise `{{name ...}}` plugin syntax.
    pub enable_plugins: bool,
    /// Maximum recursion depth for nested containers and inline formatting.
    pub max_nesting_depth: usize,
    /// Handler replacements keyed by plugin name or alias.
    pub plugin_overrides: HashMap<String, PluginHandler>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            enable_math: true,
            enable_custom_containers: true,
            enable_footnotes: true,
            enable_html: true,
            enable_plugins: true,
            max_nesting_depth: 10,
            plugin_overrides: HashMap::new(),
        }
    }
}

impl fmt::Debug for ParseOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseOptions")
            .field("enable_math", &self.enable_math)
            .field("enable_custom_containers", &self.enable_custom_containers)
            .field("enable_footnotes", &self.enable_footnotes)
            .field("enable_html", &self.enable_html)
            .field("enable_plugins", &self.enable_plugins)
            .field("max_nesting_depth", &self.max_nesting_depth)
            .field(
                "plugin_overrides",
                &self.plugin_overrides.keys().collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Parses `text` with the built-in plugin registry.
pub fn parse(text: &str, options: &ParseOptions) -> Document {
    MarkdownParser::new(options.clone()).parse(text)
}

/// Renders a document to HTML with default render options.
pub fn render(document: &Document) -> RenderOutput {
    HtmlRenderer::default().render(document)
}
