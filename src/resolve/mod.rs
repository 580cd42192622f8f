//! Async post-processing of deferred plugin placeholders.
//!
//! Deferred plugins render a `<div class="async-plugin-placeholder">` at
//! parse time. This pass finds those placeholders in the rendered HTML,
//! runs the resolver registered for each plugin, and splices the results
//! back in document order. A failing resolver only affects its own
//! placeholder.

mod embed;
mod fetch;

pub use embed::MarkdownEmbedResolver;
pub use fetch::fetch_text;

use crate::core::ast::Attributes;
use crate::parser::html::{find_matching_close, parse_open_tag};
use crate::render::{escape_html, unescape_html};
use crate::{Error, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const PLACEHOLDER_CLASS: &str = "async-plugin-placeholder";

/// Limits applied to every deferred resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Per-placeholder time budget, also used as the HTTP client timeout.
    pub timeout_secs: u64,
    /// Largest fetched payload accepted, in bytes.
    pub max_fetch_bytes: usize,
    /// Placeholders resolved at the same time.
    pub concurrency: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_fetch_bytes: 100_000,
            concurrency: 4,
        }
    }
}

/// A placeholder found in rendered HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    /// Value of `data-plugin`.
    pub plugin: String,
    pub id: String,
    /// Remaining `data-*` attributes with the prefix removed, unescaped.
    pub params: Attributes,
    /// Byte range of the whole `<div>...</div>` element.
    pub range: Range<usize>,
}

/// Scans `html` for placeholder elements, in document order.
///
/// Nested `<div>`s inside a placeholder are balanced, so the range always
/// covers the complete element. Placeholders never overlap.
pub fn find_placeholders(html: &str) -> Vec<Placeholder> {
    let mut found = Vec::new();
    let mut pos = 0;

    while let Some(offset) = html[pos..].find("<div") {
        let start = pos + offset;
        let rest = &html[start..];
        let Some(tag) = parse_open_tag(rest).filter(|tag| tag.name == "div") else {
            pos = start + 4;
            continue;
        };
        let is_placeholder = tag
            .attributes
            .get("class")
            .is_some_and(|class| class.split_whitespace().any(|c| c == PLACEHOLDER_CLASS));
        let plugin = tag.attributes.get("data-plugin");
        let (Some(plugin), true, false) = (plugin, is_placeholder, tag.self_closing) else {
            pos = start + tag.len;
            continue;
        };
        let Some((_, close_end)) = find_matching_close(&rest[tag.len..], "div") else {
            pos = start + tag.len;
            continue;
        };

        let end = start + tag.len + close_end;
        let params = tag
            .attributes
            .iter()
            .filter(|(key, _)| key.as_str() != "data-plugin")
            .filter_map(|(key, value)| {
                key.strip_prefix("data-")
                    .map(|name| (name.to_string(), unescape_html(value)))
            })
            .collect();
        found.push(Placeholder {
            plugin: unescape_html(plugin),
            id: tag
                .attributes
                .get("id")
                .map(|id| unescape_html(id))
                .unwrap_or_default(),
            params,
            range: start..end,
        });
        pos = end;
    }
    found
}

/// Produces the final markup for one placeholder.
#[async_trait]
pub trait DeferredResolver: Send + Sync {
    async fn resolve(&self, placeholder: &Placeholder) -> Result<String>;
}

/// Resolvers keyed by plugin id, plus the limits they run under.
#[derive(Clone, Default)]
pub struct AsyncPluginProcessor {
    resolvers: HashMap<String, Arc<dyn DeferredResolver>>,
    config: ResolverConfig,
}

impl fmt::Debug for AsyncPluginProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncPluginProcessor")
            .field("resolvers", &self.resolvers.keys().collect::<Vec<_>>())
            .field("config", &self.config)
            .finish()
    }
}

impl AsyncPluginProcessor {
    /// A processor with no resolvers registered.
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            resolvers: HashMap::new(),
            config,
        }
    }

    /// A processor with the built-in `markdown` resolver.
    pub fn with_defaults(config: ResolverConfig) -> Result<Self> {
        let mut processor = Self::new(config);
        processor.register("markdown", Arc::new(MarkdownEmbedResolver::new(&config)?));
        Ok(processor)
    }

    pub fn register(&mut self, plugin: impl Into<String>, resolver: Arc<dyn DeferredResolver>) {
        self.resolvers.insert(plugin.into(), resolver);
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Replaces every placeholder in `html`.
    ///
    /// Placeholders for plugins with no resolver are left as they are.
    pub async fn process(&self, html: &str) -> String {
        let placeholders = find_placeholders(html);
        if placeholders.is_empty() {
            return html.to_string();
        }
        debug!(count = placeholders.len(), "resolving deferred plugins");

        let replacements: Vec<Option<String>> = stream::iter(&placeholders)
            .map(|placeholder| self.resolve_one(placeholder))
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        let mut out = String::with_capacity(html.len());
        let mut cursor = 0;
        for (placeholder, replacement) in placeholders.iter().zip(replacements) {
            if let Some(replacement) = replacement {
                out.push_str(&html[cursor..placeholder.range.start]);
                out.push_str(&replacement);
                cursor = placeholder.range.end;
            }
        }
        out.push_str(&html[cursor..]);
        out
    }

    async fn resolve_one(&self, placeholder: &Placeholder) -> Option<String> {
        let Some(resolver) = self.resolvers.get(&placeholder.plugin) else {
            warn!(plugin = %placeholder.plugin, id = %placeholder.id, "no resolver for deferred plugin");
            return None;
        };

        let budget = Duration::from_secs(self.config.timeout_secs);
        let result = match tokio::time::timeout(budget, resolver.resolve(placeholder)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout {
                seconds: self.config.timeout_secs,
            }),
        };

        match result {
            Ok(html) => {
                debug!(plugin = %placeholder.plugin, id = %placeholder.id, "resolved placeholder");
                Some(html)
            }
            Err(err) => {
                warn!(plugin = %placeholder.plugin, id = %placeholder.id, error = %err, "deferred plugin failed");
                Some(error_fragment(placeholder, &err))
            }
        }
    }
}

fn error_fragment(placeholder: &Placeholder, err: &Error) -> String {
    format!(
        "<div id=\"{}\" class=\"async-plugin-error\"><strong>Error loading {}:</strong> {}</div>",
        escape_html(&placeholder.id),
        escape_html(&placeholder.plugin),
        escape_html(&err.to_string())
    )
}

/// Runs the default processor over `html`.
pub async fn resolve_deferred_plugins(html: &str) -> Result<String> {
    let processor = AsyncPluginProcessor::with_defaults(ResolverConfig::default())?;
    Ok(processor.process(html).await)
}
