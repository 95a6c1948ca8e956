//! Caret relocation across a transition that changed the block count.
//!
//! A caret expressed against the pre-edit state can point at the wrong
//! block once blocks before it merge (e.g. lines collapsing into one code
//! block). Relocation maps it to the block that now holds the same text:
//! - positions before the first changed block stay put
//! - positions in the untouched tail shift by the change in block count
//! - positions inside the edited region are found again by absolute line
//!   and column
//!
//! A caret is only ever moved to an earlier block.

use tracing::trace;

use crate::metrics::{source_len, source_text};
use crate::model::{Block, same_block};
use crate::text::{EditorRope, TextBuffer};
use crate::types::{Caret, CaretBasis, Position};

/// Relocate one position from `prev` to `next`. `None` if it stays put.
pub fn relocate(prev: &[Block], next: &[Block], pos: Position) -> Option<Position> {
    if next.is_empty() {
        return None;
    }
    let last = next.len() - 1;

    if pos.block >= prev.len() {
        // Stale index; clamp to the last block.
        return (pos.block > last).then(|| clamp(next, Position::new(last, pos.offset)));
    }

    let head = prev
        .iter()
        .zip(next)
        .take_while(|(a, b)| same_block(a, b))
        .count();
    if pos.block < head {
        return None;
    }

    let tail = prev[head..]
        .iter()
        .rev()
        .zip(next[head..].iter().rev())
        .take_while(|(a, b)| same_block(a, b))
        .count();

    if pos.block >= prev.len() - tail {
        let moved = pos.block + next.len() - prev.len();
        return (moved < pos.block).then_some(Position::new(moved, pos.offset));
    }

    let (line, column) = line_and_column(prev, pos);
    let (index, offset) = find_line(next, line, column);
    trace!(
        target: "weft::relocate",
        from_block = pos.block,
        to_block = index,
        line,
        column,
        "relocated by line"
    );
    (index < pos.block).then_some(Position::new(index, offset))
}

/// Relocate both endpoints of a caret. `None` when neither moves.
///
/// The result is expressed against `next`.
pub fn relocate_caret(prev: &[Block], next: &[Block], caret: &Caret) -> Option<Caret> {
    let anchor = relocate(prev, next, caret.anchor);
    let focus = relocate(prev, next, caret.focus);
    if anchor.is_none() && focus.is_none() {
        return None;
    }
    Some(Caret {
        anchor: anchor.unwrap_or(caret.anchor),
        focus: focus.unwrap_or(caret.focus),
        basis: CaretBasis::Committed,
    })
}

fn clamp(blocks: &[Block], pos: Position) -> Position {
    let block = pos.block.min(blocks.len().saturating_sub(1));
    let len = blocks.get(block).map_or(0, |b| source_len(b));
    Position::new(block, pos.offset.min(len))
}

/// Absolute line and column of `pos` in the serialized document.
fn line_and_column(blocks: &[Block], pos: Position) -> (usize, usize) {
    let lines_before: usize = blocks[..pos.block]
        .iter()
        .map(|b| EditorRope::from(source_text(b)).len_lines())
        .sum();
    let rope = EditorRope::from(source_text(&blocks[pos.block]));
    let offset = pos.offset.min(rope.len_chars());
    let line = rope.char_to_line(offset);
    (lines_before + line, offset - rope.line_to_char(line))
}

/// Block and offset holding absolute `line`, clamping `column` to the line.
fn find_line(blocks: &[Block], line: usize, column: usize) -> (usize, usize) {
    let mut remaining = line;
    for (index, block) in blocks.iter().enumerate() {
        let rope = EditorRope::from(source_text(block));
        let count = rope.len_lines();
        if remaining < count {
            let start = rope.line_to_char(remaining);
            return (index, start + column.min(rope.line_len(remaining)));
        }
        remaining -= count;
    }
    let last = blocks.len() - 1;
    (last, source_len(&blocks[last]))
}
