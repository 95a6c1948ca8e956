//! State transitions: new block lists built from old ones.
//!
//! Every function here returns a fresh list in which blocks outside the
//! edited range are the very same allocations as before. Blocks inside the
//! range are replaced by whatever the parser produces for the new text.

use tracing::trace;

use crate::event::Direction;
use crate::metrics::{serialize, source_len};
use crate::model::Block;
use crate::render::BlockParser;
use crate::resolve::BlockRange;
use crate::text::{EditorRope, TextBuffer};
use crate::types::{Caret, Position};

/// A proposed next state with the caret to restore after applying it.
#[derive(Debug, Clone)]
pub struct Transition {
    pub blocks: Vec<Block>,
    pub caret: Caret,
}

/// Replace the blocks in `range` with the parse of `text`.
///
/// `range` is clamped to the list. An empty `text` still parses to at least
/// whatever the parser yields for the empty string.
pub fn replace_range(
    blocks: &[Block],
    range: BlockRange,
    text: &str,
    parser: &dyn BlockParser,
) -> Vec<Block> {
    if blocks.is_empty() {
        return parser.parse_all(text);
    }
    let last = range.last.min(blocks.len() - 1);
    let first = range.first.min(last);

    let mut next = Vec::with_capacity(blocks.len());
    next.extend(blocks[..first].iter().cloned());
    next.extend(parser.parse(text));
    next.extend(blocks[last + 1..].iter().cloned());
    trace!(
        target: "weft::transition",
        first,
        last,
        before = blocks.len(),
        after = next.len(),
        "replaced block range"
    );
    next
}

/// A text edit spanning blocks: replace `start..end` (document positions)
/// with `insert`.
#[derive(Debug, Clone, Copy)]
pub struct TextEdit<'a> {
    pub start: Position,
    pub end: Position,
    pub insert: &'a str,
}

/// Apply a text edit across block boundaries.
///
/// The touched blocks are serialized into one buffer, edited, and reparsed
/// in place. The caret lands right after the inserted text.
pub fn apply_text_edit(blocks: &[Block], edit: TextEdit<'_>, parser: &dyn BlockParser) -> Transition {
    if blocks.is_empty() {
        let next = parser.parse_all(edit.insert);
        let caret = caret_in(&next, 0, next.len(), edit.insert.chars().count());
        return Transition { blocks: next, caret };
    }

    let max = blocks.len() - 1;
    let (start, end) = if edit.start <= edit.end {
        (edit.start, edit.end)
    } else {
        (edit.end, edit.start)
    };
    let range = BlockRange::new(start.block.min(max), end.block.min(max));
    let span = &blocks[range.first..=range.last];

    let mut buffer = EditorRope::from(serialize(span));
    let from = linear_offset(span, range.first, start);
    let to = linear_offset(span, range.first, end).max(from);
    buffer.replace(from..to, edit.insert);

    let caret_linear = from + edit.insert.chars().count();
    let next = replace_range(blocks, range, &buffer.to_string(), parser);
    let produced = next.len() + range.len() - blocks.len();
    let caret = caret_in(&next, range.first, produced, caret_linear);
    Transition { blocks: next, caret }
}

/// Replace the text between two positions with `text`.
pub fn replace_selection(
    blocks: &[Block],
    first: Position,
    last: Position,
    text: &str,
    parser: &dyn BlockParser,
) -> Transition {
    apply_text_edit(
        blocks,
        TextEdit {
            start: first,
            end: last,
            insert: text,
        },
        parser,
    )
}

/// Join the block at `at` with its neighbour across the boundary `at` sits on.
///
/// `at` must be at the start (backward) or end (forward) of its block.
/// Returns `None` at the document edges, where there is nothing to join.
pub fn merge_at_boundary(
    blocks: &[Block],
    at: Position,
    direction: Direction,
    parser: &dyn BlockParser,
) -> Option<Transition> {
    let block = at.block;
    if block >= blocks.len() {
        return None;
    }
    let (start, end) = match direction {
        Direction::Backward => {
            let prev = block.checked_sub(1)?;
            (Position::new(prev, source_len(&blocks[prev])), Position::new(block, 0))
        }
        Direction::Forward => {
            if block + 1 >= blocks.len() {
                return None;
            }
            (Position::new(block, source_len(&blocks[block])), Position::new(block + 1, 0))
        }
    };
    Some(apply_text_edit(
        blocks,
        TextEdit {
            start,
            end,
            insert: "",
        },
        parser,
    ))
}

/// Offset of `pos` within the serialization of `span`, whose first block
/// has index `first`. Offsets are clamped to their block.
fn linear_offset(span: &[Block], first: usize, pos: Position) -> usize {
    let local = pos.block.saturating_sub(first).min(span.len().saturating_sub(1));
    let before: usize = span[..local].iter().map(|b| source_len(b) + 1).sum();
    before + pos.offset.min(source_len(&span[local]))
}

/// Map a linear offset into the `produced` blocks starting at `first` back
/// to a position. Clamps when the parser did not preserve all text.
fn caret_in(blocks: &[Block], first: usize, produced: usize, mut linear: usize) -> Caret {
    if blocks.is_empty() {
        return Caret::collapsed((0, 0));
    }
    let end = (first + produced).min(blocks.len());
    for index in first..end {
        let len = source_len(&blocks[index]);
        if linear <= len {
            return Caret::collapsed((index, linear));
        }
        linear -= len + 1;
    }
    let index = end.saturating_sub(1).max(first).min(blocks.len() - 1);
    Caret::collapsed((index, source_len(&blocks[index])))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::source_text;
    use crate::model::same_block;
    use crate::test_support::LineParser;

    fn parse(text: &str) -> Vec<Block> {
        LineParser.parse_all(text)
    }

    fn texts(blocks: &[Block]) -> Vec<String> {
        blocks.iter().map(|b| source_text(b)).collect()
    }

    #[test]
    fn test_replace_range_preserves_outside_blocks() {
        let blocks = parse("a\nb\nc\nd");
        let next = replace_range(&blocks, BlockRange::new(1, 2), "x", &LineParser);
        assert_eq!(texts(&next), vec!["a", "x", "d"]);
        assert!(same_block(&next[0], &blocks[0]));
        assert!(same_block(&next[2], &blocks[3]));
    }

    #[test]
    fn test_split_block() {
        let blocks = parse("ab");
        let t = replace_selection(
            &blocks,
            Position::new(0, 1),
            Position::new(0, 1),
            "\n",
            &LineParser,
        );
        assert_eq!(texts(&t.blocks), vec!["a", "b"]);
        assert_eq!(t.caret, Caret::collapsed((1, 0)));
    }

    #[test]
    fn test_replace_across_blocks() {
        let blocks = parse("one\ntwo\nthree");
        let t = replace_selection(
            &blocks,
            Position::new(0, 2),
            Position::new(2, 2),
            "X",
            &LineParser,
        );
        assert_eq!(texts(&t.blocks), vec!["onXree"]);
        assert_eq!(t.caret, Caret::collapsed((0, 3)));
    }

    #[test]
    fn test_merge_backward() {
        let blocks = parse("a\nb\nc");
        let t = merge_at_boundary(&blocks, Position::new(1, 0), Direction::Backward, &LineParser)
            .unwrap();
        assert_eq!(texts(&t.blocks), vec!["ab", "c"]);
        assert_eq!(t.caret, Caret::collapsed((0, 1)));
        assert!(same_block(&t.blocks[1], &blocks[2]));
    }

    #[test]
    fn test_merge_forward() {
        let blocks = parse("ab\ncd");
        let t = merge_at_boundary(&blocks, Position::new(0, 2), Direction::Forward, &LineParser)
            .unwrap();
        assert_eq!(texts(&t.blocks), vec!["abcd"]);
        assert_eq!(t.caret, Caret::collapsed((0, 2)));
    }

    #[test]
    fn test_merge_at_edges_is_none() {
        let blocks = parse("a\nb");
        assert!(merge_at_boundary(&blocks, Position::new(0, 0), Direction::Backward, &LineParser).is_none());
        assert!(merge_at_boundary(&blocks, Position::new(1, 1), Direction::Forward, &LineParser).is_none());
    }

    #[test]
    fn test_prefixed_blocks_use_source_offsets() {
        let blocks = parse("# Title\nbody");
        let t = replace_selection(
            &blocks,
            Position::new(0, 7),
            Position::new(0, 7),
            "!",
            &LineParser,
        );
        assert_eq!(texts(&t.blocks), vec!["# Title!", "body"]);
        assert_eq!(t.caret, Caret::collapsed((0, 8)));
        assert!(same_block(&t.blocks[1], &blocks[1]));
    }

    #[test]
    fn test_delete_whole_block_and_break() {
        let blocks = parse("|a\nx\n|b");
        let t = replace_selection(
            &blocks,
            Position::new(1, 0),
            Position::new(2, 0),
            "",
            &LineParser,
        );
        // Only the touched span is reparsed, so the tables stay separate.
        assert_eq!(texts(&t.blocks), vec!["|a", "|b"]);
        assert_eq!(t.caret, Caret::collapsed((1, 0)));
        assert!(same_block(&t.blocks[0], &blocks[0]));
    }
}
