//! Built-in editing behavior.
//!
//! - input: reparse the touched blocks from view text, unless composing or
//!   the range touches an opaque block
//! - beforeinput: paragraph and line breaks, deletions across block
//!   boundaries, selection replacement
//! - paste, copy, drag start
//! - selection changes: record the native selection
//! - precommit: relocate carets expressed against the pre-edit state, and
//!   tracked positions

use tracing::{debug, trace};

use crate::editor::EditorCore;
use crate::error::PluginError;
use crate::event::{Direction, EditEvent, EventKind, EventTarget, Granularity, InputType};
use crate::metrics::{prefix_len, serialize, source_len, suffix_len};
use crate::plugin::{Handled, PendingCommit, Plugin};
use crate::relocate::{relocate, relocate_caret};
use crate::resolve::BlockRange;
use crate::transition;
use crate::types::{CaretBasis, Position};

#[derive(Debug, Default)]
pub struct DefaultPlugin;

impl DefaultPlugin {
    pub fn new() -> Self {
        Self
    }
}

impl Plugin for DefaultPlugin {
    fn name(&self) -> &str {
        "default"
    }

    fn handles(&self, kind: EventKind) -> bool {
        matches!(
            kind,
            EventKind::Input
                | EventKind::BeforeInput
                | EventKind::CompositionStart
                | EventKind::CompositionEnd
                | EventKind::Paste
                | EventKind::Copy
                | EventKind::DragStart
                | EventKind::SelectionChange
        )
    }

    fn handle(&mut self, editor: &mut EditorCore, event: &EditEvent) -> Result<Handled, PluginError> {
        match event.kind {
            EventKind::CompositionStart => {
                editor.set_composing(true);
                Ok(Handled::NotHandled)
            }
            EventKind::CompositionEnd => {
                editor.set_composing(false);
                on_input(editor, event.target)
            }
            EventKind::Input => on_input(editor, event.target),
            EventKind::BeforeInput => on_before_input(editor, event),
            EventKind::Paste => {
                let text = event.data.as_deref().unwrap_or("");
                replace_selection(editor, text)
            }
            EventKind::Copy => on_copy(editor),
            // Dragging text out of the editor would edit the view behind the
            // model's back.
            EventKind::DragStart => Ok(Handled::Handled),
            EventKind::SelectionChange => {
                if let Some((anchor, focus)) = event.selection {
                    let root = editor.view().root();
                    if editor.view().contains(root, anchor.node) {
                        editor.set_native_selection(anchor, focus);
                    }
                }
                Ok(Handled::NotHandled)
            }
            _ => Ok(Handled::NotHandled),
        }
    }

    fn precommit(
        &mut self,
        editor: &EditorCore,
        pending: &PendingCommit,
    ) -> Result<Option<PendingCommit>, PluginError> {
        let prev = editor.blocks();
        let caret = match pending.caret.basis {
            CaretBasis::PreEdit => relocate_caret(prev, &pending.blocks, &pending.caret),
            CaretBasis::Committed => None,
        };
        let moved: Vec<Option<Position>> = pending
            .tracked
            .iter()
            .map(|pos| relocate(prev, &pending.blocks, *pos))
            .collect();
        if caret.is_none() && moved.iter().all(Option::is_none) {
            return Ok(None);
        }

        if let Some(caret) = &caret {
            trace!(target: "weft::relocate", ?caret, "caret relocated");
        }
        let tracked = pending
            .tracked
            .iter()
            .zip(moved)
            .map(|(pos, moved)| moved.unwrap_or(*pos))
            .collect();
        Ok(Some(PendingCommit {
            blocks: pending.blocks.clone(),
            caret: caret.unwrap_or(pending.caret),
            tracked,
        }))
    }
}

/// Rebuild the touched blocks from the text the view now shows.
fn on_input(editor: &mut EditorCore, target: EventTarget) -> Result<Handled, PluginError> {
    if editor.composing() {
        return Ok(Handled::NotHandled);
    }

    let range = match editor.resolve_block_range(target) {
        Ok(range) => range,
        Err(reason) => {
            debug!(target: "weft::pipeline", ?reason, "input left to other plugins");
            return Ok(Handled::Abstain);
        }
    };

    let mut text = String::new();
    for index in range.iter() {
        if index > range.first {
            text.push('\n');
        }
        match editor.view_block_text(index) {
            Some(block_text) => text.push_str(&block_text),
            None => return Ok(Handled::NotHandled),
        }
    }

    let selection = editor.selection();
    let offset = if selection.anchor_block == range.first {
        selection.anchor_offset.unwrap_or(0)
    } else {
        0
    };
    let next = transition::replace_range(editor.blocks(), range, &text, editor.parser());
    editor.schedule(next, (range.first, offset))?;
    Ok(Handled::Handled)
}

fn on_before_input(editor: &mut EditorCore, event: &EditEvent) -> Result<Handled, PluginError> {
    let Some(input_type) = &event.input_type else {
        return Ok(Handled::NotHandled);
    };
    match input_type {
        t if t.is_break() => replace_selection(editor, "\n"),
        t if t.is_deletion() => on_delete(editor, t),
        InputType::InsertFromPaste | InputType::InsertFromDrop => match event.data.as_deref() {
            Some(text) => replace_selection(editor, text),
            None => Ok(Handled::NotHandled),
        },
        _ => Ok(Handled::NotHandled),
    }
}

/// Deletions the platform cannot do natively: anything with a selection,
/// and joins across block boundaries.
fn on_delete(editor: &mut EditorCore, input_type: &InputType) -> Result<Handled, PluginError> {
    let sel = editor.ordered_selection();
    if !sel.is_collapsed() {
        return replace_selection(editor, "");
    }

    let blocks = editor.blocks();
    if blocks.is_empty() {
        return Ok(Handled::NotHandled);
    }
    let last_index = blocks.len() - 1;
    let block = sel.first_block.min(last_index);
    let len = source_len(&blocks[block]);
    let offset = sel.first_offset.unwrap_or(0).min(len);
    let direction = input_type.direction();

    // Hidden prefix and suffix are not editable, so the visible content's
    // edges are the block boundaries.
    let content_start = prefix_len(&blocks[block]);
    let content_end = len.saturating_sub(suffix_len(&blocks[block]));
    let at_boundary = match direction {
        Direction::Backward => offset <= content_start,
        Direction::Forward => offset >= content_end,
    };
    if !at_boundary {
        return Ok(Handled::NotHandled);
    }

    let at_document_edge = match direction {
        Direction::Backward => block == 0,
        Direction::Forward => block == last_index,
    };
    if at_document_edge {
        return Ok(Handled::NotHandled);
    }

    if input_type.granularity() != Granularity::Character {
        return Ok(Handled::Handled);
    }

    let neighbour = match direction {
        Direction::Backward => block - 1,
        Direction::Forward => block + 1,
    };
    if editor.is_opaque(block) || editor.is_opaque(neighbour) {
        debug!(target: "weft::pipeline", block, neighbour, "join with opaque block suppressed");
        return Ok(Handled::Handled);
    }

    let Some(t) = transition::merge_at_boundary(
        editor.blocks(),
        Position::new(block, offset),
        direction,
        editor.parser(),
    ) else {
        return Ok(Handled::NotHandled);
    };
    editor.schedule(t.blocks, t.caret)?;
    Ok(Handled::Handled)
}

/// Replace the current selection with `text`.
fn replace_selection(editor: &mut EditorCore, text: &str) -> Result<Handled, PluginError> {
    let blocks = editor.blocks();
    if blocks.is_empty() {
        let next = editor.parse(text);
        editor.schedule(next, (0, 0))?;
        return Ok(Handled::Handled);
    }

    let sel = editor.ordered_selection();
    let max = blocks.len() - 1;
    let first = Position::new(sel.first_block.min(max), sel.first_offset.unwrap_or(0));
    let last = Position::new(sel.last_block.min(max), sel.last_offset.unwrap_or(0));

    if editor.is_opaque(first.block) || editor.is_opaque(last.block) {
        let range = BlockRange::new(first.block, last.block);
        let next = transition::replace_range(blocks, range, text, editor.parser());
        editor.schedule(next, (first.block, 0))?;
        return Ok(Handled::Handled);
    }

    let t = transition::replace_selection(blocks, first, last, text, editor.parser());
    editor.schedule(t.blocks, t.caret)?;
    Ok(Handled::Handled)
}

fn on_copy(editor: &mut EditorCore) -> Result<Handled, PluginError> {
    let sel = editor.ordered_selection();
    if sel.is_collapsed() || editor.blocks().is_empty() {
        return Ok(Handled::NotHandled);
    }
    let max = editor.blocks().len() - 1;
    let first = sel.first().block.min(max);
    let last = sel.last().block.min(max);
    let span = &editor.blocks()[first..=last];

    let text = serialize(span);
    let last_len = source_len(&span[span.len() - 1]);
    let total: usize = text.chars().count();
    let start = sel.first().offset.min(total);
    let end = (total - last_len + sel.last().offset.min(last_len)).max(start);
    let copied: String = text.chars().skip(start).take(end - start).collect();

    editor.set_clipboard(copied);
    Ok(Handled::Handled)
}
