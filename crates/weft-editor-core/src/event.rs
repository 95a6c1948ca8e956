//! Editing events and input types.
//!
//! Platform-agnostic definitions of what the host delivers to the editor.
//! `InputType` carries the semantic intent of a `beforeinput`-style event;
//! `EditEvent` bundles it with the event kind, target and payload.

use smol_str::SmolStr;

use crate::view::{ViewId, ViewPoint};

/// Kind of an editing event. Plugins are dispatched by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    BeforeInput,
    Input,
    CompositionStart,
    CompositionEnd,
    KeyDown,
    KeyPress,
    Paste,
    Copy,
    DragStart,
    Drop,
    SelectionChange,
}

/// Where an event was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventTarget {
    /// The editor root itself.
    #[default]
    Root,
    /// A node inside the view.
    Node(ViewId),
    /// Somewhere outside the editor.
    Outside,
}

/// Semantic input types, after the W3C Input Events specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputType {
    // === Insertion ===
    InsertText,
    InsertCompositionText,
    /// Insert a line break (Shift+Enter).
    InsertLineBreak,
    /// Insert a paragraph break (Enter).
    InsertParagraph,
    InsertFromPaste,
    InsertFromDrop,
    InsertReplacementText,

    // === Deletion ===
    /// Delete content backward (Backspace).
    DeleteContentBackward,
    /// Delete content forward (Delete key).
    DeleteContentForward,
    DeleteWordBackward,
    DeleteWordForward,
    DeleteSoftLineBackward,
    DeleteSoftLineForward,
    DeleteHardLineBackward,
    DeleteHardLineForward,
    DeleteByCut,
    DeleteByDrag,
    DeleteContent,

    // === History ===
    HistoryUndo,
    HistoryRedo,

    /// Unrecognized input type.
    Unknown(SmolStr),
}

/// How much a deletion removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Character,
    Word,
    Line,
    Selection,
}

/// Direction of a deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Backward,
    Forward,
}

impl InputType {
    /// Parse a W3C `inputType` string.
    pub fn from_w3c(s: &str) -> Self {
        match s {
            "insertText" => Self::InsertText,
            "insertCompositionText" => Self::InsertCompositionText,
            "insertLineBreak" => Self::InsertLineBreak,
            "insertParagraph" => Self::InsertParagraph,
            "insertFromPaste" => Self::InsertFromPaste,
            "insertFromDrop" => Self::InsertFromDrop,
            "insertReplacementText" => Self::InsertReplacementText,
            "deleteContentBackward" => Self::DeleteContentBackward,
            "deleteContentForward" => Self::DeleteContentForward,
            "deleteWordBackward" => Self::DeleteWordBackward,
            "deleteWordForward" => Self::DeleteWordForward,
            "deleteSoftLineBackward" => Self::DeleteSoftLineBackward,
            "deleteSoftLineForward" => Self::DeleteSoftLineForward,
            "deleteHardLineBackward" => Self::DeleteHardLineBackward,
            "deleteHardLineForward" => Self::DeleteHardLineForward,
            "deleteByCut" => Self::DeleteByCut,
            "deleteByDrag" => Self::DeleteByDrag,
            "deleteContent" => Self::DeleteContent,
            "historyUndo" => Self::HistoryUndo,
            "historyRedo" => Self::HistoryRedo,
            other => Self::Unknown(other.into()),
        }
    }

    /// Whether this input type is a deletion operation.
    pub fn is_deletion(&self) -> bool {
        matches!(
            self,
            Self::DeleteContentBackward
                | Self::DeleteContentForward
                | Self::DeleteWordBackward
                | Self::DeleteWordForward
                | Self::DeleteSoftLineBackward
                | Self::DeleteSoftLineForward
                | Self::DeleteHardLineBackward
                | Self::DeleteHardLineForward
                | Self::DeleteByCut
                | Self::DeleteByDrag
                | Self::DeleteContent
        )
    }

    /// Whether this input type splits a block.
    pub fn is_break(&self) -> bool {
        matches!(self, Self::InsertParagraph | Self::InsertLineBreak)
    }

    /// Direction of a deletion. Non-directional deletions count as backward.
    pub fn direction(&self) -> Direction {
        match self {
            Self::DeleteContentForward
            | Self::DeleteWordForward
            | Self::DeleteSoftLineForward
            | Self::DeleteHardLineForward => Direction::Forward,
            _ => Direction::Backward,
        }
    }

    /// How much text a deletion removes. Anything that is not a character,
    /// word or line deletion acts on the selection.
    pub fn granularity(&self) -> Granularity {
        match self {
            Self::DeleteContentBackward | Self::DeleteContentForward => Granularity::Character,
            Self::DeleteWordBackward | Self::DeleteWordForward => Granularity::Word,
            Self::DeleteSoftLineBackward
            | Self::DeleteSoftLineForward
            | Self::DeleteHardLineBackward
            | Self::DeleteHardLineForward => Granularity::Line,
            _ => Granularity::Selection,
        }
    }
}

/// Key values for keyboard events.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Character(SmolStr),
    Enter,
    Tab,
    Backspace,
    Delete,
    Escape,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Other(SmolStr),
}

impl Key {
    pub fn character(s: impl Into<SmolStr>) -> Self {
        Self::Character(s.into())
    }
}

/// Modifier key state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        ctrl: false,
        alt: false,
        shift: false,
        meta: false,
    };

    pub fn any(&self) -> bool {
        self.ctrl || self.alt || self.shift || self.meta
    }
}

/// An event delivered to the plugin pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditEvent {
    pub kind: EventKind,
    pub target: EventTarget,
    pub input_type: Option<InputType>,
    /// Text payload: inserted or pasted text.
    pub data: Option<String>,
    pub key: Option<Key>,
    pub modifiers: Modifiers,
    /// New native selection `(anchor, focus)` for selection changes.
    pub selection: Option<(ViewPoint, ViewPoint)>,
}

impl EditEvent {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            target: EventTarget::Root,
            input_type: None,
            data: None,
            key: None,
            modifiers: Modifiers::NONE,
            selection: None,
        }
    }

    pub fn input(target: EventTarget) -> Self {
        Self::new(EventKind::Input).with_target(target)
    }

    pub fn before_input(input_type: InputType) -> Self {
        let mut event = Self::new(EventKind::BeforeInput);
        event.input_type = Some(input_type);
        event
    }

    pub fn composition_start() -> Self {
        Self::new(EventKind::CompositionStart)
    }

    pub fn composition_end(target: EventTarget) -> Self {
        Self::new(EventKind::CompositionEnd).with_target(target)
    }

    pub fn key_down(key: Key) -> Self {
        Self::new(EventKind::KeyDown).with_key(key)
    }

    pub fn key_press(key: Key) -> Self {
        Self::new(EventKind::KeyPress).with_key(key)
    }

    pub fn paste(text: impl Into<String>) -> Self {
        Self::new(EventKind::Paste).with_data(text)
    }

    pub fn copy() -> Self {
        Self::new(EventKind::Copy)
    }

    pub fn drag_start() -> Self {
        Self::new(EventKind::DragStart)
    }

    pub fn selection_change(anchor: ViewPoint, focus: ViewPoint) -> Self {
        let mut event = Self::new(EventKind::SelectionChange);
        event.selection = Some((anchor, focus));
        event
    }

    pub fn with_target(mut self, target: EventTarget) -> Self {
        self.target = target;
        self
    }

    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn with_key(mut self, key: Key) -> Self {
        self.key = Some(key);
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_w3c() {
        assert_eq!(InputType::from_w3c("insertParagraph"), InputType::InsertParagraph);
        assert_eq!(
            InputType::from_w3c("formatBold"),
            InputType::Unknown("formatBold".into())
        );
    }

    #[test]
    fn test_deletion_classification() {
        let backspace = InputType::DeleteContentBackward;
        assert!(backspace.is_deletion());
        assert_eq!(backspace.direction(), Direction::Backward);
        assert_eq!(backspace.granularity(), Granularity::Character);

        let word = InputType::DeleteWordForward;
        assert_eq!(word.direction(), Direction::Forward);
        assert_eq!(word.granularity(), Granularity::Word);
        assert_eq!(InputType::DeleteHardLineBackward.granularity(), Granularity::Line);
        assert_eq!(InputType::DeleteByCut.granularity(), Granularity::Selection);

        assert!(!InputType::InsertText.is_deletion());
        assert!(InputType::InsertLineBreak.is_break());
    }
}
