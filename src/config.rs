//! TOML configuration shared by the library and the CLI.

use crate::render::RenderOptions;
use crate::resolve::ResolverConfig;
use crate::{ParseOptions, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Top-level configuration file. Every field is optional.
///
/// ```toml
/// max_input_bytes = 1000000
///
/// [parser]
/// enable_math = false
///
/// [render]
/// toc_max_level = 2
///
/// [resolver]
/// timeout_secs = 5
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Inputs larger than this are rejected before parsing.
    pub max_input_bytes: usize,
    pub parser: ParserConfig,
    pub render: RenderOptions,
    pub resolver: ResolverConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_input_bytes: 1_000_000,
            parser: ParserConfig::default(),
            render: RenderOptions::default(),
            resolver: ResolverConfig::default(),
        }
    }
}

/// The serializable subset of [`ParseOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub enable_math: bool,
    pub enable_custom_containers: bool,
    pub enable_footnotes: bool,
    pub enable_html: bool,
    pub enable_plugins: bool,
    pub max_nesting_depth: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        let options = ParseOptions::default();
        Self {
            enable_math: options.enable_math,
            enable_custom_containers: options.enable_custom_containers,
            enable_footnotes: options.enable_footnotes,
            enable_html: options.enable_html,
            enable_plugins: options.enable_plugins,
            max_nesting_depth: options.max_nesting_depth,
        }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&text)?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            enable_math: self.parser.enable_math,
            enable_custom_containers: self.parser.enable_custom_containers,
            enable_footnotes: self.parser.enable_footnotes,
            enable_html: self.parser.enable_html,
            enable_plugins: self.parser.enable_plugins,
            max_nesting_depth: self.parser.max_nesting_depth,
            ..ParseOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.resolver.max_fetch_bytes, 100_000);
        assert_eq!(config.render.toc_max_level, 3);
    }

    #[test]
    fn test_partial_sections_merge_with_defaults() {
        let config = Config::from_toml(
            r#"
max_input_bytes = 42

[parser]
enable_math = false
max_nesting_depth = 3

[render]
toc_min_level = 2

[resolver]
concurrency = 1
"#,
        )
        .unwrap();

        assert_eq!(config.max_input_bytes, 42);
        let options = config.parse_options();
        assert!(!options.enable_math);
        assert!(options.enable_html);
        assert_eq!(options.max_nesting_depth, 3);
        assert_eq!(config.render.toc_min_level, 2);
        assert_eq!(config.render.toc_max_level, 3);
        assert_eq!(config.resolver.concurrency, 1);
        assert_eq!(config.resolver.timeout_secs, 10);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = Config::from_toml("max_input_bytes = \"lots\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = Config::load_from_path(Path::new("/nonexistent/markweave.toml")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
