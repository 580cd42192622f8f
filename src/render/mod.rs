mod escape;
pub mod html;
pub mod math;
pub mod toc;

use crate::core::ast::Document;
use serde::Serialize;

pub use escape::{escape_html, unescape_html};
pub use html::{HtmlRenderer, RenderOptions};
pub use math::{MathError, MathRenderer, PlainMathRenderer};

/// Result of rendering a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenderOutput {
    pub html: String,
}

pub trait Renderer {
    fn render(&self, document: &Document) -> RenderOutput;
}
