//! Pluggable math typesetting.

use super::escape::escape_html;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("math rendering failed: {reason}")]
pub struct MathError {
    pub reason: String,
}

impl MathError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Turns TeX source into HTML. Failures are rendered as escaped fallbacks
/// by the caller, so an implementation never has to produce partial output.
pub trait MathRenderer: Send + Sync {
    fn render_math(&self, tex: &str, display: bool) -> Result<String, MathError>;
}

/// Emits TeX wrapped in `\(...\)` or `\[...\]` delimiters for a client-side
/// typesetter. Rejects unbalanced braces.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainMathRenderer;

impl MathRenderer for PlainMathRenderer {
    fn render_math(&self, tex: &str, display: bool) -> Result<String, MathError> {
        check_braces(tex)?;
        let escaped = escape_html(tex);
        Ok(if display {
            format!(r#"<span class="math math-display">\[{}\]</span>"#, escaped)
        } else {
            format!(r#"<span class="math math-inline">\({}\)</span>"#, escaped)
        })
    }
}

fn check_braces(tex: &str) -> Result<(), MathError> {
    let mut depth = 0usize;
    let mut chars = tex.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                chars.next();
            }
            '{' => depth += 1,
            '}' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| MathError::new("unexpected '}'"))?;
            }
            _ => {}
        }
    }
    if depth == 0 {
        Ok(())
    } else {
        Err(MathError::new("unclosed '{'"))
    }
}
