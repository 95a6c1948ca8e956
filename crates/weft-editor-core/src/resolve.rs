//! Block-range resolution: which top-level blocks an input event touched.

use smol_str::SmolStr;

use crate::event::EventTarget;
use crate::model::Block;
use crate::types::Selection;
use crate::view::ViewTree;

/// Inclusive range of top-level block indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRange {
    pub first: usize,
    pub last: usize,
}

impl BlockRange {
    pub fn new(first: usize, last: usize) -> Self {
        Self {
            first: first.min(last),
            last: first.max(last),
        }
    }

    pub fn single(index: usize) -> Self {
        Self::new(index, index)
    }

    pub fn len(&self) -> usize {
        self.last - self.first + 1
    }

    pub fn contains(&self, index: usize) -> bool {
        (self.first..=self.last).contains(&index)
    }

    pub fn iter(&self) -> std::ops::RangeInclusive<usize> {
        self.first..=self.last
    }
}

/// Why the generic input path declined an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Abstain {
    /// The range touches a block whose kind must not be rewritten from
    /// view text.
    OpaqueBlock { index: usize, kind: SmolStr },
    /// There are no blocks to edit.
    EmptyDocument,
}

/// Resolve the block range touched by an input event.
///
/// An event on a node inside the view touches the block containing it.
/// Events on the root or outside the view touch the span between the
/// selection's endpoints. Indices are clamped to the document.
pub fn resolve_block_range(
    tree: &ViewTree,
    blocks: &[Block],
    target: EventTarget,
    selection: &Selection,
    is_opaque: impl Fn(&str) -> bool,
) -> Result<BlockRange, Abstain> {
    if blocks.is_empty() {
        return Err(Abstain::EmptyDocument);
    }
    let max = blocks.len() - 1;

    let from_node = match target {
        EventTarget::Node(id) => tree.block_index_of(id),
        EventTarget::Root | EventTarget::Outside => None,
    };
    let range = match from_node {
        Some(index) => BlockRange::single(index.min(max)),
        None => BlockRange::new(
            selection.anchor_block.min(max),
            selection.focus_block.min(max),
        ),
    };

    if let Some(index) = range.iter().find(|i| is_opaque(&blocks[*i].kind)) {
        return Err(Abstain::OpaqueBlock {
            index,
            kind: blocks[index].kind.clone(),
        });
    }
    Ok(range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Node;
    use crate::view::Fragment;

    fn setup(kinds: &[&str]) -> (ViewTree, Vec<Block>) {
        let mut tree = ViewTree::new();
        let root = tree.root();
        let blocks: Vec<Block> = kinds
            .iter()
            .map(|k| Node::new(*k).text("x").into_block())
            .collect();
        for (i, _) in blocks.iter().enumerate() {
            tree.insert_subtree(
                root,
                i,
                Fragment::element("p").child(Fragment::element("em").child(Fragment::text("x"))),
            );
        }
        (tree, blocks)
    }

    fn never(_: &str) -> bool {
        false
    }

    #[test]
    fn test_node_target_uses_containing_block() {
        let (tree, blocks) = setup(&["paragraph", "paragraph", "paragraph"]);
        let block = tree.children(tree.root())[1];
        let deep = tree.children(tree.children(block)[0])[0];
        let range = resolve_block_range(
            &tree,
            &blocks,
            EventTarget::Node(deep),
            &Selection::collapsed(0, 0),
            never,
        );
        assert_eq!(range, Ok(BlockRange::single(1)));
    }

    #[test]
    fn test_root_target_uses_selection_span() {
        let (tree, blocks) = setup(&["paragraph", "paragraph", "paragraph"]);
        let selection = Selection {
            anchor_block: 2,
            anchor_offset: Some(0),
            focus_block: 0,
            focus_offset: Some(1),
        };
        let range = resolve_block_range(&tree, &blocks, EventTarget::Root, &selection, never);
        assert_eq!(range, Ok(BlockRange::new(0, 2)));
    }

    #[test]
    fn test_indices_are_clamped() {
        let (tree, blocks) = setup(&["paragraph", "paragraph"]);
        let range = resolve_block_range(
            &tree,
            &blocks,
            EventTarget::Outside,
            &Selection::collapsed(9, 0),
            never,
        );
        assert_eq!(range, Ok(BlockRange::single(1)));
    }

    #[test]
    fn test_opaque_block_abstains() {
        let (tree, blocks) = setup(&["paragraph", "table", "paragraph"]);
        let selection = Selection {
            anchor_block: 0,
            anchor_offset: Some(0),
            focus_block: 2,
            focus_offset: Some(0),
        };
        let range = resolve_block_range(&tree, &blocks, EventTarget::Root, &selection, |k| {
            k == "table"
        });
        assert_eq!(
            range,
            Err(Abstain::OpaqueBlock {
                index: 1,
                kind: "table".into()
            })
        );
    }

    #[test]
    fn test_empty_document_abstains() {
        let tree = ViewTree::new();
        let range = resolve_block_range(
            &tree,
            &[],
            EventTarget::Root,
            &Selection::collapsed(0, 0),
            never,
        );
        assert_eq!(range, Err(Abstain::EmptyDocument));
    }
}
