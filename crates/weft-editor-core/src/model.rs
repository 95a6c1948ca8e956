//! Document model: top-level blocks and the inline nodes beneath them.
//!
//! Blocks are immutable and shared by reference. Two blocks are "the same
//! block" only when they are the same allocation, see [`same_block`]; this
//! identity is what lets the reconciler keep rendered output for blocks a
//! transition did not touch.
//!
//! A node's *flattened text* is the concatenation of its text content, with
//! decorative nodes contributing their decorative text instead of their
//! children. Its *source text* wraps that in the block's prefix and suffix.

use std::rc::Rc;

use smol_str::SmolStr;

/// A top-level document node. Identity is the allocation, not the value.
pub type Block = Rc<Node>;

/// One entry of a node's content list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(SmolStr),
    Node(Rc<Node>),
}

/// A document node, either a block or an inline node within one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Node {
    /// Kind tag used to pick a render function (`paragraph`, `table`, ...).
    pub kind: SmolStr,
    pub content: Vec<Content>,
    /// Text the node stands for in the model while rendering as a
    /// non-textual element (checkbox, rule).
    pub decorative_text: Option<SmolStr>,
    /// Source markup in front of the rendered content (e.g. `"## "`).
    pub prefix: Option<SmolStr>,
    pub suffix: Option<SmolStr>,
    pub href: Option<SmolStr>,
}

impl Node {
    pub fn new(kind: impl Into<SmolStr>) -> Self {
        Self {
            kind: kind.into(),
            ..Default::default()
        }
    }

    /// Append a text entry. Empty strings are skipped.
    pub fn text(mut self, text: impl Into<SmolStr>) -> Self {
        let text = text.into();
        if !text.is_empty() {
            self.content.push(Content::Text(text));
        }
        self
    }

    pub fn child(mut self, node: Node) -> Self {
        self.content.push(Content::Node(Rc::new(node)));
        self
    }

    pub fn children(mut self, nodes: impl IntoIterator<Item = Node>) -> Self {
        self.content
            .extend(nodes.into_iter().map(|n| Content::Node(Rc::new(n))));
        self
    }

    pub fn with_decorative_text(mut self, text: impl Into<SmolStr>) -> Self {
        self.decorative_text = Some(text.into());
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<SmolStr>) -> Self {
        let prefix = prefix.into();
        self.prefix = (!prefix.is_empty()).then_some(prefix);
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<SmolStr>) -> Self {
        let suffix = suffix.into();
        self.suffix = (!suffix.is_empty()).then_some(suffix);
        self
    }

    pub fn with_href(mut self, href: impl Into<SmolStr>) -> Self {
        self.href = Some(href.into());
        self
    }

    /// Wrap into a fresh block allocation.
    pub fn into_block(self) -> Block {
        Rc::new(self)
    }

    pub fn is_decorative(&self) -> bool {
        self.decorative_text.is_some()
    }

    /// Child nodes, skipping text entries.
    pub fn child_nodes(&self) -> impl Iterator<Item = &Rc<Node>> {
        self.content.iter().filter_map(|c| match c {
            Content::Node(n) => Some(n),
            Content::Text(_) => None,
        })
    }
}

/// Whether two blocks are the same allocation.
#[inline]
pub fn same_block(a: &Block, b: &Block) -> bool {
    Rc::ptr_eq(a, b)
}

/// Identity key for a block, usable in hash maps.
#[inline]
pub fn block_key(block: &Block) -> *const Node {
    Rc::as_ptr(block)
}
