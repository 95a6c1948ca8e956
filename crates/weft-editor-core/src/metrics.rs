//! Text metrics over the model and the view.
//!
//! Two coordinate systems meet here:
//! - model offsets: char offsets into a block's flattened text
//!   (or source text, once the prefix is accounted for)
//! - view points: `(node, offset)` pairs in the rendered tree
//!
//! [`locate`] and [`measure`] convert between them. Leaves are text nodes and
//! decorative elements; a decorative element is addressed from its parent
//! as `(parent, index)` at its start and `(parent, index + 1)` at its end,
//! because it has no text node to point into.
//!
//! Canonical points (what `locate` returns) survive a round trip through
//! `measure`. At a boundary between two leaves the start of the following
//! leaf is preferred.

use crate::model::{Content, Node};
use crate::view::{Leaf, ViewId, ViewPoint, ViewTree};

/// Flattened text of a model node.
pub fn flattened_text(node: &Node) -> String {
    let mut out = String::new();
    push_flattened(node, &mut out);
    out
}

fn push_flattened(node: &Node, out: &mut String) {
    if let Some(text) = &node.decorative_text {
        out.push_str(text);
        return;
    }
    for entry in &node.content {
        match entry {
            Content::Text(t) => out.push_str(t),
            Content::Node(child) => push_flattened(child, out),
        }
    }
}

/// Char length of a node's flattened text.
pub fn flattened_len(node: &Node) -> usize {
    if let Some(text) = &node.decorative_text {
        return text.chars().count();
    }
    node.content
        .iter()
        .map(|entry| match entry {
            Content::Text(t) => t.chars().count(),
            Content::Node(child) => flattened_len(child),
        })
        .sum()
}

/// Source text of a block: prefix, flattened text, suffix.
pub fn source_text(node: &Node) -> String {
    let mut out = String::new();
    if let Some(prefix) = &node.prefix {
        out.push_str(prefix);
    }
    push_flattened(node, &mut out);
    if let Some(suffix) = &node.suffix {
        out.push_str(suffix);
    }
    out
}

pub fn prefix_len(node: &Node) -> usize {
    node.prefix.as_ref().map_or(0, |p| p.chars().count())
}

pub fn suffix_len(node: &Node) -> usize {
    node.suffix.as_ref().map_or(0, |s| s.chars().count())
}

/// Char length of a block's source text.
pub fn source_len(node: &Node) -> usize {
    prefix_len(node) + flattened_len(node) + suffix_len(node)
}

/// Serialize blocks to document text, one block per line group.
pub fn serialize<'a>(blocks: impl IntoIterator<Item = &'a crate::model::Block>) -> String {
    let mut out = String::new();
    for (i, block) in blocks.into_iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&source_text(block));
    }
    out
}

/// Flattened text of a rendered subtree.
pub fn view_text(tree: &ViewTree, root: ViewId) -> String {
    let mut out = String::new();
    for leaf in tree.leaves(root) {
        out.push_str(leaf_text(tree, &leaf));
    }
    out
}

/// Char length of a rendered subtree's flattened text.
pub fn view_len(tree: &ViewTree, root: ViewId) -> usize {
    tree.leaves(root).map(|l| l.len).sum()
}

fn leaf_text<'t>(tree: &'t ViewTree, leaf: &Leaf) -> &'t str {
    if leaf.decorative {
        tree.element(leaf.id)
            .and_then(|el| el.decorative_text.as_deref())
            .unwrap_or("")
    } else {
        tree.text(leaf.id).unwrap_or("")
    }
}

/// Result of [`locate`]: the point, plus how far the requested offset ran
/// past the end of the subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Located {
    pub point: ViewPoint,
    /// Zero unless the offset exceeded the subtree's text, in which case the
    /// point is clamped to the end.
    pub overflow: usize,
}

/// Map a char offset within `root`'s flattened text to a view point.
pub fn locate(tree: &ViewTree, root: ViewId, offset: usize) -> Located {
    let leaves: Vec<Leaf> = tree.leaves(root).collect();
    let mut pos = 0;
    for (i, leaf) in leaves.iter().enumerate() {
        let end = pos + leaf.len;
        let is_last = i + 1 == leaves.len();
        if offset < end || (offset == end && is_last) {
            return Located {
                point: point_in_leaf(tree, leaf, offset - pos, root),
                overflow: 0,
            };
        }
        pos = end;
    }

    match leaves.last() {
        Some(leaf) => Located {
            point: point_in_leaf(tree, leaf, leaf.len, root),
            overflow: offset - pos,
        },
        None => Located {
            point: ViewPoint::new(root, 0),
            overflow: offset,
        },
    }
}

fn point_in_leaf(tree: &ViewTree, leaf: &Leaf, local: usize, root: ViewId) -> ViewPoint {
    if !leaf.decorative {
        return ViewPoint::new(leaf.id, local);
    }
    let (Some(parent), Some(index)) = (tree.parent(leaf.id), tree.index_in_parent(leaf.id)) else {
        return ViewPoint::new(root, 0);
    };
    if local < leaf.len || leaf.len == 0 {
        ViewPoint::new(parent, index)
    } else {
        ViewPoint::new(parent, index + 1)
    }
}

/// Map a view point inside `root` to a char offset in its flattened text.
///
/// Returns `None` when the point is not inside `root`, or lies inside a
/// decorative element's hidden children.
pub fn measure(tree: &ViewTree, root: ViewId, point: ViewPoint) -> Option<usize> {
    if !tree.contains(root, point.node) {
        return None;
    }

    if let Some(leaf) = tree.leaf(point.node) {
        let start = text_before(tree, root, point.node)?;
        let local = if leaf.decorative {
            if point.offset == 0 { 0 } else { leaf.len }
        } else {
            point.offset.min(leaf.len)
        };
        return Some(start + local);
    }

    let children = tree.children(point.node);
    match children.get(point.offset) {
        Some(child) => text_before(tree, root, *child),
        None => Some(text_before(tree, root, point.node)? + view_len(tree, point.node)),
    }
}

/// Text length of all leaves preceding `node` in `root`'s walk.
fn text_before(tree: &ViewTree, root: ViewId, node: ViewId) -> Option<usize> {
    let mut acc = 0;
    for id in tree.walk(root) {
        if id == node {
            return Some(acc);
        }
        if let Some(leaf) = tree.leaf(id) {
            acc += leaf.len;
        }
    }
    None
}

/// Like [`locate`], for a block root and a document-level offset (prefix
/// included). Offsets inside the prefix map to the start of the content and
/// offsets inside the suffix to its end.
pub fn locate_in_block(tree: &ViewTree, block_root: ViewId, offset: usize) -> Located {
    let (prefix, suffix) = tree
        .block_meta(block_root)
        .map_or((0, 0), |m| (m.prefix_len(), m.suffix_len()));
    let mut located = locate(tree, block_root, offset.saturating_sub(prefix));
    located.overflow = located.overflow.saturating_sub(suffix);
    located
}

/// Like [`measure`], returning a document-level offset (prefix included).
pub fn measure_in_block(tree: &ViewTree, block_root: ViewId, point: ViewPoint) -> Option<usize> {
    let prefix = tree.block_meta(block_root).map_or(0, |m| m.prefix_len());
    measure(tree, block_root, point).map(|o| o + prefix)
}

/// Block source text as currently shown in the view: the stamped prefix and
/// suffix around the rendered flattened text.
pub fn view_source_text(tree: &ViewTree, block_root: ViewId) -> String {
    let mut out = String::new();
    let meta = tree.block_meta(block_root);
    if let Some(prefix) = meta.and_then(|m| m.prefix.as_ref()) {
        out.push_str(prefix);
    }
    out.push_str(&view_text(tree, block_root));
    if let Some(suffix) = meta.and_then(|m| m.suffix.as_ref()) {
        out.push_str(suffix);
    }
    out
}
