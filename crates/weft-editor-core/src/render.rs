//! Parsing and rendering seams.
//!
//! The editor core knows nothing about block grammar or markup. It is handed:
//! - a [`BlockParser`] turning text into top-level blocks
//! - a [`BlockRenderer`] turning one block into a detached view fragment
//!
//! [`RendererRegistry`] is the usual renderer: a map from node kind to a
//! render function, with children rendered before their parent.

use std::collections::HashMap;

use smol_str::SmolStr;

use crate::error::RenderError;
use crate::metrics;
use crate::model::{Block, Content, Node};
use crate::view::Fragment;

/// Turns document text into blocks.
///
/// Parsing must be lossless for the reconciler's contract to hold: joining
/// the source text of the produced blocks with `'\n'` gives back the input.
pub trait BlockParser {
    fn parse<'a>(&'a self, text: &'a str) -> Box<dyn Iterator<Item = Block> + 'a>;

    /// Collect all blocks.
    fn parse_all(&self, text: &str) -> Vec<Block> {
        self.parse(text).collect()
    }
}

/// Renders one block to a detached fragment.
pub trait BlockRenderer {
    fn render(&self, node: &Node) -> Result<Fragment, RenderError>;
}

impl<T: BlockParser + ?Sized> BlockParser for &T {
    fn parse<'a>(&'a self, text: &'a str) -> Box<dyn Iterator<Item = Block> + 'a> {
        (**self).parse(text)
    }
}

impl<T: BlockParser + ?Sized> BlockParser for Box<T> {
    fn parse<'a>(&'a self, text: &'a str) -> Box<dyn Iterator<Item = Block> + 'a> {
        (**self).parse(text)
    }
}

impl<T: BlockRenderer + ?Sized> BlockRenderer for &T {
    fn render(&self, node: &Node) -> Result<Fragment, RenderError> {
        (**self).render(node)
    }
}

impl<T: BlockRenderer + ?Sized> BlockRenderer for Box<T> {
    fn render(&self, node: &Node) -> Result<Fragment, RenderError> {
        (**self).render(node)
    }
}

/// Rendered children handed to a render function, in content order.
pub struct RenderContext<'a> {
    pub node: &'a Node,
    pub children: Vec<Fragment>,
}

impl RenderContext<'_> {
    /// Take the rendered children, leaving the context empty.
    pub fn take_children(&mut self) -> Vec<Fragment> {
        std::mem::take(&mut self.children)
    }

    pub fn flattened_text(&self) -> String {
        metrics::flattened_text(self.node)
    }
}

/// A render function for one node kind.
pub type RenderFn = Box<dyn Fn(RenderContext<'_>) -> Result<Fragment, RenderError>>;

/// Map from node kind to render function.
///
/// Text entries render to text fragments. Node entries render through the
/// registry first, except for decorative nodes, whose children are never
/// shown and are therefore skipped.
#[derive(Default)]
pub struct RendererRegistry {
    renderers: HashMap<SmolStr, RenderFn>,
    fallback: Option<RenderFn>,
}

impl RendererRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, kind: impl Into<SmolStr>, render: F) -> &mut Self
    where
        F: Fn(RenderContext<'_>) -> Result<Fragment, RenderError> + 'static,
    {
        self.renderers.insert(kind.into(), Box::new(render));
        self
    }

    pub fn with<F>(mut self, kind: impl Into<SmolStr>, render: F) -> Self
    where
        F: Fn(RenderContext<'_>) -> Result<Fragment, RenderError> + 'static,
    {
        self.register(kind, render);
        self
    }

    /// Render function used for kinds without their own entry.
    pub fn with_fallback<F>(mut self, render: F) -> Self
    where
        F: Fn(RenderContext<'_>) -> Result<Fragment, RenderError> + 'static,
    {
        self.fallback = Some(Box::new(render));
        self
    }

    fn render_node(&self, node: &Node) -> Result<Fragment, RenderError> {
        let render = self
            .renderers
            .get(node.kind.as_str())
            .or(self.fallback.as_ref())
            .ok_or_else(|| RenderError::UnknownKind {
                kind: node.kind.clone(),
            })?;

        let children = if node.is_decorative() {
            Vec::new()
        } else {
            node.content
                .iter()
                .map(|entry| match entry {
                    Content::Text(t) => Ok(Fragment::Text(t.clone())),
                    Content::Node(child) => self.render_node(child),
                })
                .collect::<Result<Vec<_>, _>>()?
        };

        render(RenderContext { node, children })
    }
}

impl BlockRenderer for RendererRegistry {
    fn render(&self, node: &Node) -> Result<Fragment, RenderError> {
        self.render_node(node)
    }
}
