//! Caret and selection types.
//!
//! Offsets here are document-level: char offsets into a block's source text
//! (prefix included). `None` offsets mean the selection endpoint lies outside
//! the editor's view.

use std::cmp::Ordering;

/// Selection as reported by the platform, in document coordinates.
///
/// The anchor is where the selection started, the focus is where the caret
/// is now. They may be in any order; use [`Selection::ordered`].
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub struct Selection {
    pub anchor_block: usize,
    pub anchor_offset: Option<usize>,
    pub focus_block: usize,
    pub focus_offset: Option<usize>,
}

impl Selection {
    /// Collapsed selection at `(block, offset)`.
    pub fn collapsed(block: usize, offset: usize) -> Self {
        Self {
            anchor_block: block,
            anchor_offset: Some(offset),
            focus_block: block,
            focus_offset: Some(offset),
        }
    }

    /// Selection with no endpoint inside the view.
    pub fn outside() -> Self {
        Self {
            anchor_block: 0,
            anchor_offset: None,
            focus_block: 0,
            focus_offset: None,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor_block == self.focus_block && self.anchor_offset == self.focus_offset
    }

    /// Normalize so the first endpoint precedes the last.
    pub fn ordered(&self) -> OrderedSelection {
        order_selection(self)
    }
}

/// A selection whose first endpoint precedes (or equals) its last.
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub struct OrderedSelection {
    pub first_block: usize,
    pub first_offset: Option<usize>,
    pub last_block: usize,
    pub last_offset: Option<usize>,
}

impl OrderedSelection {
    pub fn is_collapsed(&self) -> bool {
        self.first_block == self.last_block && self.first_offset == self.last_offset
    }

    pub fn first(&self) -> Position {
        Position::new(self.first_block, self.first_offset.unwrap_or(0))
    }

    pub fn last(&self) -> Position {
        Position::new(self.last_block, self.last_offset.unwrap_or(0))
    }
}

/// Order a selection by block index, then by offset within the block.
///
/// Identity when the anchor already precedes the focus; a swap otherwise.
/// Only the two endpoints are compared; offsets in different blocks are
/// never compared against each other.
pub fn order_selection(sel: &Selection) -> OrderedSelection {
    let swap = match sel.anchor_block.cmp(&sel.focus_block) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => sel.anchor_offset > sel.focus_offset,
    };

    if swap {
        OrderedSelection {
            first_block: sel.focus_block,
            first_offset: sel.focus_offset,
            last_block: sel.anchor_block,
            last_offset: sel.anchor_offset,
        }
    } else {
        OrderedSelection {
            first_block: sel.anchor_block,
            first_offset: sel.anchor_offset,
            last_block: sel.focus_block,
            last_offset: sel.focus_offset,
        }
    }
}

/// A caret endpoint: block index plus char offset into its source text.
#[derive(Clone, Debug, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub block: usize,
    pub offset: usize,
}

impl Position {
    pub fn new(block: usize, offset: usize) -> Self {
        Self { block, offset }
    }
}

impl From<(usize, usize)> for Position {
    fn from((block, offset): (usize, usize)) -> Self {
        Self::new(block, offset)
    }
}

/// Handle to a position the editor keeps current across commits.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Hash)]
pub struct TrackedId(pub(crate) usize);

/// Which state a caret's block indices refer to.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Default)]
pub enum CaretBasis {
    /// Indices already refer to the state being committed.
    #[default]
    Committed,
    /// Indices refer to the state before the edit and may need relocating.
    PreEdit,
}

/// Caret carried by a transition.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Default)]
pub struct Caret {
    pub anchor: Position,
    pub focus: Position,
    pub basis: CaretBasis,
}

impl Caret {
    pub fn new(anchor: impl Into<Position>, focus: impl Into<Position>) -> Self {
        Self {
            anchor: anchor.into(),
            focus: focus.into(),
            basis: CaretBasis::Committed,
        }
    }

    pub fn collapsed(at: impl Into<Position>) -> Self {
        let at = at.into();
        Self::new(at, at)
    }

    /// Mark the caret as expressed against the pre-edit state.
    pub fn pre_edit(mut self) -> Self {
        self.basis = CaretBasis::PreEdit;
        self
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }
}

impl From<Position> for Caret {
    fn from(at: Position) -> Self {
        Self::collapsed(at)
    }
}

impl From<(usize, usize)> for Caret {
    fn from(at: (usize, usize)) -> Self {
        Self::collapsed(at)
    }
}

impl From<Selection> for Caret {
    /// Endpoints outside the view collapse to the block start.
    fn from(sel: Selection) -> Self {
        Self::new(
            (sel.anchor_block, sel.anchor_offset.unwrap_or(0)),
            (sel.focus_block, sel.focus_offset.unwrap_or(0)),
        )
        .pre_edit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_selection_is_unchanged() {
        let sel = Selection {
            anchor_block: 1,
            anchor_offset: Some(4),
            focus_block: 3,
            focus_offset: Some(0),
        };
        let ordered = sel.ordered();
        assert_eq!(ordered.first(), Position::new(1, 4));
        assert_eq!(ordered.last(), Position::new(3, 0));
    }

    #[test]
    fn test_backward_selection_is_swapped() {
        let sel = Selection {
            anchor_block: 3,
            anchor_offset: Some(0),
            focus_block: 1,
            focus_offset: Some(4),
        };
        let ordered = sel.ordered();
        assert_eq!(ordered.first(), Position::new(1, 4));
        assert_eq!(ordered.last(), Position::new(3, 0));
    }

    #[test]
    fn test_same_block_orders_by_offset() {
        let sel = Selection {
            anchor_block: 2,
            anchor_offset: Some(7),
            focus_block: 2,
            focus_offset: Some(3),
        };
        let ordered = sel.ordered();
        assert_eq!(ordered.first_offset, Some(3));
        assert_eq!(ordered.last_offset, Some(7));
    }

    #[test]
    fn test_offsets_across_blocks_are_not_compared() {
        // Larger first offset but earlier block: no swap.
        let sel = Selection {
            anchor_block: 0,
            anchor_offset: Some(50),
            focus_block: 1,
            focus_offset: Some(1),
        };
        assert_eq!(sel.ordered().first_block, 0);
        assert_eq!(sel.ordered().first_offset, Some(50));
    }

    #[test]
    fn test_outside_offsets_sort_first() {
        let sel = Selection {
            anchor_block: 0,
            anchor_offset: Some(2),
            focus_block: 0,
            focus_offset: None,
        };
        let ordered = sel.ordered();
        assert_eq!(ordered.first_offset, None);
        assert_eq!(ordered.first(), Position::new(0, 0));
    }

    #[test]
    fn test_caret_from_selection_is_pre_edit() {
        let caret = Caret::from(Selection::collapsed(4, 2));
        assert_eq!(caret.basis, CaretBasis::PreEdit);
        assert_eq!(caret.anchor, Position::new(4, 2));
        assert!(caret.is_collapsed());
    }
}
