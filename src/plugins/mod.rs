//! Plugin registry for `{{name ...}}` extension syntax.
//!
//! Plugins are classified on two axes: the shape of their input (found
//! inside a paragraph, or standing alone as a block) and the shape of their
//! output. A plugin is *block-parsed* if either shape is block, otherwise it
//! is *inline-parsed*.

pub mod builtin;

use crate::{Error, Result};
use indexmap::IndexMap;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Inline,
    Block,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Inline => f.write_str("inline"),
            Shape::Block => f.write_str("block"),
        }
    }
}

/// What a handler produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    /// Plain text, escaped by the renderer.
    Text(String),
    /// Trusted HTML fragment, emitted verbatim.
    Html(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginOutcome {
    Rendered(Rendered),
    /// Declines the match; dispatch continues with the next candidate.
    Fallthrough,
}

/// Arguments passed to a plugin handler.
#[derive(Debug, Clone, Copy)]
pub struct PluginCall<'a> {
    /// The full matched source, e.g. `{{emoji smile}}`.
    pub text: &'a str,
    /// Number unique within one parse, for minting element ids.
    pub sequence: usize,
}

pub type PluginHandler = Arc<dyn Fn(&PluginCall<'_>) -> PluginOutcome + Send + Sync>;

#[derive(Clone)]
pub struct Plugin {
    pub name: String,
    pub aliases: Vec<String>,
    pub input: Shape,
    pub output: Shape,
    pub pattern: Regex,
    pub handler: PluginHandler,
    /// Output is a placeholder finished by the async post-processor.
    pub deferred: bool,
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("input", &self.input)
            .field("output", &self.output)
            .field("pattern", &self.pattern.as_str())
            .field("deferred", &self.deferred)
            .finish()
    }
}

impl Plugin {
    /// Creates a plugin, compiling `pattern`.
    pub fn new<F>(
        name: &str,
        input: Shape,
        output: Shape,
        pattern: &str,
        handler: F,
    ) -> Result<Self>
    where
        F: Fn(&PluginCall<'_>) -> PluginOutcome + Send + Sync + 'static,
    {
        Ok(Self::from_regex(
            name,
            input,
            output,
            Regex::new(pattern)?,
            handler,
        ))
    }

    pub fn from_regex<F>(
        name: &str,
        input: Shape,
        output: Shape,
        pattern: Regex,
        handler: F,
    ) -> Self
    where
        F: Fn(&PluginCall<'_>) -> PluginOutcome + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            aliases: Vec::new(),
            input,
            output,
            pattern,
            handler: Arc::new(handler),
            deferred: false,
        }
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|alias| alias.to_string()).collect();
        self
    }

    pub fn deferred(mut self) -> Self {
        self.deferred = true;
        self
    }

    /// The parse category this plugin belongs to.
    pub fn category(&self) -> Shape {
        if self.input == Shape::Block || self.output == Shape::Block {
            Shape::Block
        } else {
            Shape::Inline
        }
    }

    pub fn is_block_parsed(&self) -> bool {
        self.category() == Shape::Block
    }

    /// Runs the handler if the pattern matches `call.text`.
    pub fn apply(&self, call: &PluginCall<'_>) -> PluginOutcome {
        if !self.pattern.is_match(call.text) {
            return PluginOutcome::Fallthrough;
        }
        (self.handler)(call)
    }
}

/// Plugins keyed by name, in registration order.
#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
    plugins: IndexMap<String, Plugin>,
    aliases: HashMap<String, String>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the built-in plugins.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for plugin in builtin::builtin_plugins() {
            registry.register(plugin);
        }
        registry
    }

    /// Registers `plugin` under the category derived from its shapes.
    /// A plugin with the same name is replaced.
    pub fn register(&mut self, plugin: Plugin) {
        self.remove(&plugin.name);
        for alias in &plugin.aliases {
            self.aliases.insert(alias.clone(), plugin.name.clone());
        }
        tracing::debug!(
            plugin = %plugin.name,
            category = %plugin.category(),
            "registered plugin"
        );
        self.plugins.insert(plugin.name.clone(), plugin);
    }

    /// Registers an inline-parsed plugin; fails if either shape is block.
    pub fn register_inline(&mut self, plugin: Plugin) -> Result<()> {
        self.register_checked(plugin, Shape::Inline)
    }

    /// Registers a block-parsed plugin; fails if both shapes are inline.
    pub fn register_block(&mut self, plugin: Plugin) -> Result<()> {
        self.register_checked(plugin, Shape::Block)
    }

    fn register_checked(&mut self, plugin: Plugin, expected: Shape) -> Result<()> {
        if plugin.category() != expected {
            return Err(Error::PluginCategory {
                name: plugin.name,
                expected,
            });
        }
        self.register(plugin);
        Ok(())
    }

    /// Looks a plugin up by name or alias.
    pub fn get(&self, name: &str) -> Option<&Plugin> {
        let canonical = self.aliases.get(name).map(String::as_str).unwrap_or(name);
        self.plugins.get(canonical)
    }

    /// Removes a plugin (by name or alias) together with its aliases.
    pub fn remove(&mut self, name: &str) -> Option<Plugin> {
        let canonical = self
            .aliases
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string());
        let plugin = self.plugins.shift_remove(&canonical)?;
        self.aliases.retain(|_, target| *target != canonical);
        Some(plugin)
    }

    pub fn clear(&mut self) {
        self.plugins.clear();
        self.aliases.clear();
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn list_inline_parsed(&self) -> Vec<&Plugin> {
        self.plugins
            .values()
            .filter(|plugin| !plugin.is_block_parsed())
            .collect()
    }

    pub fn list_block_parsed(&self) -> Vec<&Plugin> {
        self.plugins
            .values()
            .filter(|plugin| plugin.is_block_parsed())
            .collect()
    }

    /// Replaces handlers of registered plugins. Unknown names are ignored.
    pub fn apply_overrides(&mut self, overrides: &HashMap<String, PluginHandler>) {
        for (name, handler) in overrides {
            let canonical = self
                .aliases
                .get(name)
                .cloned()
                .unwrap_or_else(|| name.clone());
            match self.plugins.get_mut(&canonical) {
                Some(plugin) => plugin.handler = Arc::clone(handler),
                None => tracing::debug!(plugin = %name, "override for unregistered plugin ignored"),
            }
        }
    }

    /// Dispatch for a plugin span found inside inline text: inline-parsed
    /// plugins first, then block-parsed plugins whose input is inline.
    pub fn dispatch_inline(&self, call: &PluginCall<'_>) -> Option<Rendered> {
        let inline = self.plugins.values().filter(|p| !p.is_block_parsed());
        let block_with_inline_input = self
            .plugins
            .values()
            .filter(|p| p.is_block_parsed() && p.input == Shape::Inline);
        inline
            .chain(block_with_inline_input)
            .find_map(|plugin| match plugin.apply(call) {
                PluginOutcome::Rendered(rendered) => {
                    tracing::debug!(plugin = %plugin.name, "inline plugin rendered");
                    Some(rendered)
                }
                PluginOutcome::Fallthrough => None,
            })
    }

    /// Dispatch for a plugin standing alone at block level.
    pub fn dispatch_block(&self, call: &PluginCall<'_>) -> Option<Rendered> {
        self.plugins
            .values()
            .filter(|p| p.is_block_parsed())
            .find_map(|plugin| match plugin.apply(call) {
                PluginOutcome::Rendered(rendered) => {
                    tracing::debug!(plugin = %plugin.name, "block plugin rendered");
                    Some(rendered)
                }
                PluginOutcome::Fallthrough => None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shout(input: Shape, output: Shape) -> Plugin {
        Plugin::new("shout", input, output, r"^\{\{shout\s+(.+)\}\}$", |call| {
            PluginOutcome::Rendered(Rendered::Text(call.text.to_uppercase()))
        })
        .expect("valid pattern")
    }

    #[test]
    fn test_category_is_block_if_either_shape_is_block() {
        assert_eq!(shout(Shape::Inline, Shape::Inline).category(), Shape::Inline);
        assert_eq!(shout(Shape::Inline, Shape::Block).category(), Shape::Block);
        assert_eq!(shout(Shape::Block, Shape::Inline).category(), Shape::Block);
    }

    #[test]
    fn test_misregistration_is_reported() {
        let mut registry = PluginRegistry::new();
        let err = registry
            .register_inline(shout(Shape::Inline, Shape::Block))
            .expect_err("block output cannot be inline-parsed");
        assert!(matches!(
            err,
            Error::PluginCategory {
                expected: Shape::Inline,
                ..
            }
        ));
        assert!(registry.is_empty());

        assert!(registry
            .register_block(shout(Shape::Inline, Shape::Inline))
            .is_err());
        assert!(registry
            .register_block(shout(Shape::Block, Shape::Block))
            .is_ok());
    }

    #[test]
    fn test_alias_lookup_and_removal() {
        let mut registry = PluginRegistry::with_builtins();
        let by_alias = registry.get("md").expect("md alias");
        assert_eq!(by_alias.name, "markdown");
        assert!(registry.get("yml").is_some());

        registry.remove("md");
        assert!(registry.get("markdown").is_none());
        assert!(registry.get("md").is_none());
    }

    #[test]
    fn test_lists_exclude_alias_duplicates() {
        let registry = PluginRegistry::with_builtins();
        let inline: Vec<_> = registry
            .list_inline_parsed()
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        let block: Vec<_> = registry
            .list_block_parsed()
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(inline, vec!["emoji", "badge", "smiles", "reaction"]);
        assert_eq!(block, vec!["youtube", "markdown", "diagram", "yaml"]);
    }

    #[test]
    fn test_fallthrough_continues_dispatch() {
        let mut registry = PluginRegistry::new();
        registry.register(
            Plugin::new("first", Shape::Inline, Shape::Inline, r"^\{\{", |_| {
                PluginOutcome::Fallthrough
            })
            .expect("pattern"),
        );
        registry.register(shout(Shape::Inline, Shape::Inline));
        let call = PluginCall {
            text: "{{shout hi}}",
            sequence: 1,
        };
        assert_eq!(
            registry.dispatch_inline(&call),
            Some(Rendered::Text("{{SHOUT HI}}".to_string()))
        );
    }

    #[test]
    fn test_clear_empties_registry() {
        let mut registry = PluginRegistry::with_builtins();
        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.get("emoji").is_none());
    }
}
