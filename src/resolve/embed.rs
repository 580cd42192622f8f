use super::fetch::{build_client, fetch_text};
use super::{DeferredResolver, Placeholder, ResolverConfig};
use crate::render::escape_html;
use crate::{Error, ParseOptions, Result};
use async_trait::async_trait;
use reqwest::Client;

/// Fetches the markdown behind a `{{markdown URL}}` placeholder and
/// renders it in place.
///
/// Embedded documents are parsed with plugins disabled, so an embed can
/// never pull in further embeds.
#[derive(Debug, Clone)]
pub struct MarkdownEmbedResolver {
    client: Client,
    max_fetch_bytes: usize,
}

impl MarkdownEmbedResolver {
    pub fn new(config: &ResolverConfig) -> Result<Self> {
        Ok(Self::with_client(build_client(config)?, config.max_fetch_bytes))
    }

    pub fn with_client(client: Client, max_fetch_bytes: usize) -> Self {
        Self {
            client,
            max_fetch_bytes,
        }
    }
}

#[async_trait]
impl DeferredResolver for MarkdownEmbedResolver {
    async fn resolve(&self, placeholder: &Placeholder) -> Result<String> {
        let url = placeholder
            .params
            .get("markdown-url")
            .ok_or_else(|| Error::InvalidUrl("missing data-markdown-url".to_string()))?;
        let text = fetch_text(&self.client, url, self.max_fetch_bytes).await?;

        let options = ParseOptions {
            enable_plugins: false,
            ..ParseOptions::default()
        };
        let document = crate::parse(&text, &options);
        let html = crate::render(&document).html;
        Ok(format!(
            "<div id=\"{}\" class=\"markdown-embed\">\n{}</div>",
            escape_html(&placeholder.id),
            html
        ))
    }
}
