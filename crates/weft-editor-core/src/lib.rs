//! weft-editor-core: model/view synchronization for a block-structured editor.
//!
//! This crate provides:
//! - the document model (`Block`, `Node`) with identity-based sharing
//! - `ViewTree` - an arena standing in for the rendered DOM
//! - text metrics mapping model offsets to view points and back
//! - block-range resolution and state transitions for edits
//! - the `Reconciler`, which updates the view while keeping the rendered
//!   subtrees of untouched blocks
//! - caret relocation across block merges
//! - the plugin pipeline and the built-in `DefaultPlugin`
//!
//! Block grammar and markup are supplied from outside through the
//! `BlockParser` and `BlockRenderer` traits.

pub mod config;
pub mod default_plugin;
pub mod editor;
pub mod error;
pub mod event;
pub mod metrics;
pub mod model;
pub mod plugin;
pub mod reconcile;
pub mod relocate;
pub mod render;
pub mod resolve;
pub mod text;
pub mod transition;
pub mod types;
pub mod view;

#[cfg(test)]
mod test_support;

pub use config::EditorConfig;
pub use default_plugin::DefaultPlugin;
pub use editor::{DispatchOutcome, Editor, EditorBuilder, EditorCore, NativeSelection, NativeSurface};
pub use error::{EditorError, PluginError, RenderError};
pub use event::{
    Direction, EditEvent, EventKind, EventTarget, Granularity, InputType, Key, Modifiers,
};
pub use metrics::{
    Located, flattened_len, flattened_text, locate, locate_in_block, measure, measure_in_block,
    serialize, source_len, source_text, view_source_text, view_text,
};
pub use model::{Block, Content, Node, block_key, same_block};
pub use plugin::{Handled, PendingCommit, Pipeline, Plugin};
pub use reconcile::{CommitReport, Reconciler};
pub use relocate::{relocate, relocate_caret};
pub use render::{BlockParser, BlockRenderer, RenderContext, RenderFn, RendererRegistry};
pub use resolve::{Abstain, BlockRange, resolve_block_range};
pub use smol_str::SmolStr;
pub use text::{EditorRope, TextBuffer};
pub use transition::{TextEdit, Transition, apply_text_edit, merge_at_boundary, replace_range};
pub use types::{Caret, CaretBasis, OrderedSelection, Position, Selection, TrackedId, order_selection};
pub use view::{BlockMeta, Element, Fragment, Leaf, ReplaceMode, ViewData, ViewId, ViewPoint, ViewTree};
