//! weft-editor-blocks: a markdown block grammar for `weft-editor-core`.
//!
//! - [`MarkdownParser`]: line-oriented, lossless block parser
//! - [`markdown_renderer`]: render functions for every kind it produces
//! - [`TablePlugin`]: editing inside tables, which the default plugin
//!   treats as opaque
//!
//! [`markdown_editor`] wires the three together.

pub mod inline;
pub mod parser;
pub mod renderer;
pub mod table_plugin;

pub use parser::MarkdownParser;
pub use renderer::markdown_renderer;
pub use table_plugin::TablePlugin;

use weft_editor_core::{Editor, EditorBuilder};

/// Builder for a markdown editor with table editing enabled.
pub fn markdown_editor() -> EditorBuilder {
    Editor::builder(MarkdownParser::new(), markdown_renderer()).prior_plugin(TablePlugin::new())
}
