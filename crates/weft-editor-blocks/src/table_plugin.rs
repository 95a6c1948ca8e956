//! Editing inside tables.
//!
//! Tables are opaque to the default plugin, which leaves them alone. This
//! plugin runs before it and takes over where a table is involved:
//! - input inside a cell rebuilds the table block from the view's text
//! - Enter inside a table is swallowed, as are the keys that would move or
//!   join cells natively
//! - Enter right after a table at the end of the document opens an empty
//!   paragraph below it
//!
//! Enter may arrive as a key press or as a break `beforeinput`, whichever
//! the platform reports; both are treated the same.

use tracing::debug;
use weft_editor_core::{
    BlockRange, EditEvent, EditorCore, EventKind, EventTarget, Handled, Key, Plugin, PluginError,
    ViewId, replace_range, source_len,
};

use crate::parser::TABLE;

const CELL_TAGS: &[&str] = &["td", "th"];

#[derive(Debug, Default)]
pub struct TablePlugin;

impl TablePlugin {
    pub fn new() -> Self {
        Self
    }
}

impl Plugin for TablePlugin {
    fn name(&self) -> &str {
        "table"
    }

    fn handles(&self, kind: EventKind) -> bool {
        matches!(
            kind,
            EventKind::Input
                | EventKind::BeforeInput
                | EventKind::KeyDown
                | EventKind::KeyPress
                | EventKind::CompositionStart
                | EventKind::CompositionEnd
        )
    }

    fn handle(&mut self, editor: &mut EditorCore, event: &EditEvent) -> Result<Handled, PluginError> {
        let cell = table_cell(editor, event);
        match event.kind {
            EventKind::Input => match cell {
                Some(index) => rebuild_table(editor, index),
                None => Ok(Handled::NotHandled),
            },
            EventKind::CompositionStart if cell.is_some() => {
                editor.set_composing(true);
                Ok(Handled::Handled)
            }
            EventKind::CompositionEnd => match cell {
                Some(index) => {
                    editor.set_composing(false);
                    rebuild_table(editor, index)
                }
                None => Ok(Handled::NotHandled),
            },
            EventKind::KeyDown if cell.is_some() => {
                let swallowed = matches!(
                    event.key,
                    Some(Key::Enter | Key::Tab | Key::Backspace | Key::Delete)
                );
                Ok(if swallowed {
                    Handled::Handled
                } else {
                    Handled::NotHandled
                })
            }
            EventKind::KeyPress if event.key == Some(Key::Enter) => on_enter(editor, cell),
            EventKind::BeforeInput => {
                let Some(input_type) = &event.input_type else {
                    return Ok(Handled::NotHandled);
                };
                if input_type.is_break() {
                    on_enter(editor, cell)
                } else if input_type.is_deletion() && cell.is_some() {
                    // Within a cell the platform deletes; the input event
                    // that follows rebuilds the table.
                    Ok(Handled::Handled)
                } else {
                    Ok(Handled::NotHandled)
                }
            }
            _ => Ok(Handled::NotHandled),
        }
    }
}

/// Block index of the table whose cell holds the event target or, failing
/// that, the selection anchor.
fn table_cell(editor: &EditorCore, event: &EditEvent) -> Option<usize> {
    let node = match event.target {
        EventTarget::Node(node) => node,
        _ => editor.native_selection()?.anchor.node,
    };
    let index = editor.view().block_index_of(node)?;
    if !is_table(editor, index) || !inside_cell(editor, index, node) {
        return None;
    }
    Some(index)
}

fn is_table(editor: &EditorCore, index: usize) -> bool {
    editor.blocks().get(index).is_some_and(|b| b.kind == TABLE)
}

fn inside_cell(editor: &EditorCore, index: usize, node: ViewId) -> bool {
    let view = editor.view();
    let Some(block_root) = editor.block_view(index) else {
        return false;
    };
    let mut current = Some(node);
    while let Some(id) = current {
        if id == block_root {
            return false;
        }
        if view
            .element(id)
            .is_some_and(|e| CELL_TAGS.contains(&e.tag.as_str()))
        {
            return true;
        }
        current = view.parent(id);
    }
    false
}

/// Reparse the table block from the text its view shows.
fn rebuild_table(editor: &mut EditorCore, index: usize) -> Result<Handled, PluginError> {
    if editor.composing() {
        return Ok(Handled::Handled);
    }
    let Some(text) = editor.view_block_text(index) else {
        return Ok(Handled::NotHandled);
    };
    let sel = editor.selection();
    let offset = if sel.anchor_block == index {
        sel.anchor_offset.unwrap_or(0)
    } else {
        0
    };
    let next = replace_range(editor.blocks(), BlockRange::single(index), &text, editor.parser());
    debug!(target: "weft::table", index, blocks = next.len(), "table rebuilt from view");
    editor.schedule(next, (index, offset))?;
    Ok(Handled::Handled)
}

fn on_enter(editor: &mut EditorCore, cell: Option<usize>) -> Result<Handled, PluginError> {
    if cell.is_some() {
        return Ok(Handled::Handled);
    }
    let sel = editor.ordered_selection();
    let count = editor.blocks().len();
    if count == 0 || !sel.is_collapsed() {
        return Ok(Handled::NotHandled);
    }
    let block = sel.first_block.min(count - 1);
    if !is_table(editor, block) {
        return Ok(Handled::NotHandled);
    }

    let last = count - 1;
    let at_end = block == last && sel.first_offset == Some(source_len(&editor.blocks()[last]));
    if !at_end {
        // Elsewhere in a table, Enter would split it.
        return Ok(Handled::Handled);
    }

    let mut next = editor.blocks().to_vec();
    next.extend(editor.parse(""));
    editor.schedule(next, (last + 1, 0))?;
    Ok(Handled::Handled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_editor_core::{Editor, InputType, Selection, ViewPoint, same_block};

    use crate::{MarkdownParser, markdown_renderer};

    const TABLE_DOC: &str = "intro\n| a | b |\n|---|---|\n| 1 | 2 |";

    fn editor(text: &str) -> Editor {
        Editor::builder(MarkdownParser, markdown_renderer())
            .prior_plugin(TablePlugin::new())
            .text(text)
            .build()
    }

    /// Text nodes of every `td` in the block, in order.
    fn cell_texts(editor: &Editor, index: usize) -> Vec<ViewId> {
        let view = editor.view();
        let root = editor.core().block_view(index).unwrap();
        view.walk(root)
            .filter(|&id| view.element(id).is_some_and(|e| e.tag == "td"))
            .filter_map(|td| view.leaves(td).find(|l| !l.decorative).map(|l| l.id))
            .collect()
    }

    #[test]
    fn test_input_in_cell_rebuilds_table() {
        let mut editor = editor(TABLE_DOC);
        let intro = editor.blocks()[0].clone();
        let cells = cell_texts(&editor, 1);
        assert_eq!(cells.len(), 4);

        let mut native = editor.native();
        native.set_text(cells[3], " 22 ");
        native.select(ViewPoint::new(cells[3], 3), ViewPoint::new(cells[3], 3));

        let outcome = editor.dispatch(EditEvent::input(EventTarget::Root));
        assert_eq!(outcome.handled_by.as_deref(), Some("table"));
        assert_eq!(editor.get_text(), "intro\n| a | b |\n|---|---|\n| 1 | 22 |");
        assert_eq!(editor.blocks()[1].kind, TABLE);
        assert!(same_block(&editor.blocks()[0], &intro));
    }

    #[test]
    fn test_input_outside_tables_falls_through() {
        let mut editor = editor(TABLE_DOC);
        editor.set_caret((0, 2));
        let outcome = editor.dispatch(EditEvent::input(EventTarget::Root));
        assert_eq!(outcome.handled_by.as_deref(), Some("default"));
    }

    #[test]
    fn test_enter_in_cell_is_swallowed() {
        let mut editor = editor(TABLE_DOC);
        let cells = cell_texts(&editor, 1);
        editor
            .native()
            .select(ViewPoint::new(cells[0], 1), ViewPoint::new(cells[0], 1));

        let outcome = editor.dispatch(EditEvent::key_press(Key::Enter));
        assert_eq!(outcome.status, Handled::Handled);
        assert!(outcome.commit.is_none());

        let outcome = editor.dispatch(EditEvent::before_input(InputType::InsertParagraph));
        assert_eq!(outcome.handled_by.as_deref(), Some("table"));
        assert_eq!(editor.get_text(), TABLE_DOC);
    }

    #[test]
    fn test_enter_after_trailing_table_adds_paragraph() {
        let mut editor = editor(TABLE_DOC);
        let root = editor.view().root();
        editor.native().select(ViewPoint::new(root, 2), ViewPoint::new(root, 2));

        let outcome = editor.dispatch(EditEvent::key_press(Key::Enter));
        assert!(outcome.commit.is_some());
        assert_eq!(editor.get_text(), format!("{TABLE_DOC}\n"));
        assert_eq!(editor.blocks().len(), 3);
        assert_eq!(editor.selection(), Selection::collapsed(2, 0));
    }

    #[test]
    fn test_cell_keys_are_swallowed() {
        let mut editor = editor(TABLE_DOC);
        let cells = cell_texts(&editor, 1);
        editor
            .native()
            .select(ViewPoint::new(cells[1], 0), ViewPoint::new(cells[1], 0));
        for key in [Key::Tab, Key::Backspace] {
            let outcome = editor.dispatch(EditEvent::key_down(key));
            assert_eq!(outcome.status, Handled::Handled);
        }
        let outcome = editor.dispatch(EditEvent::key_down(Key::ArrowLeft));
        assert_eq!(outcome.status, Handled::NotHandled);
    }
}
