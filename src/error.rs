//! Error types for markweave.

use crate::plugins::Shape;
use thiserror::Error;

/// Result type for markweave operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur outside of parsing.
///
/// Parsing itself never fails: malformed markup degrades to literal text.
/// These errors come from plugin registration, configuration loading and
/// the async post-processing pass.
#[derive(Error, Debug)]
pub enum Error {
    /// Error occurred during file I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A plugin was registered under a category its shapes do not match.
    #[error("Plugin '{name}' cannot be registered as {expected}-parsed")]
    PluginCategory { name: String, expected: Shape },

    /// A plugin matching pattern failed to compile.
    #[error("Invalid plugin pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote resource answered with a non-success status.
    #[error("HTTP {status}: failed to fetch {url}")]
    FetchStatus { url: String, status: u16 },

    /// Fetched payload exceeded the configured size cap.
    #[error("Content too large (limit {limit} bytes)")]
    ContentTooLarge { limit: usize },

    #[error("Timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// URL rejected before fetching.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Input document exceeded the configured size limit.
    #[error("Input too large: {size} bytes (limit {limit})")]
    InputTooLarge { size: usize, limit: usize },
}
