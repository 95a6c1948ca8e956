//! Error types for rendering, plugins and editor operations.

use miette::Diagnostic;
use smol_str::SmolStr;

/// A block could not be rendered. The reconciler shows a placeholder.
#[derive(thiserror::Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RenderError {
    /// No render function is registered for the block kind.
    #[error("no renderer registered for kind `{kind}`")]
    #[diagnostic(
        code(weft::render::unknown_kind),
        help("register a render function for every kind the parser produces")
    )]
    UnknownKind { kind: SmolStr },

    /// The block's content does not satisfy its renderer's expectations.
    #[error("malformed `{kind}` block: {reason}")]
    #[diagnostic(code(weft::render::malformed))]
    Malformed { kind: SmolStr, reason: String },

    /// The render function panicked.
    #[error("renderer for `{kind}` panicked: {message}")]
    #[diagnostic(code(weft::render::panicked))]
    Panicked { kind: SmolStr, message: String },
}

impl RenderError {
    pub fn malformed(kind: impl Into<SmolStr>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            kind: kind.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised by the editor itself.
#[derive(thiserror::Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EditorError {
    /// A handler scheduled a second transition during one dispatch.
    #[error("a transition is already scheduled for this event")]
    #[diagnostic(
        code(weft::editor::duplicate_transition),
        help("handlers may schedule at most one transition per event")
    )]
    DuplicateTransition,

    /// A caret pointed past the document. Recovered by clamping.
    #[error("caret at block {block}, offset {offset} is outside the document")]
    #[diagnostic(code(weft::editor::caret_out_of_range))]
    CaretOutOfRange { block: usize, offset: usize },
}

/// A plugin handler or hook failed. The pipeline logs it and moves on.
#[derive(thiserror::Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum PluginError {
    #[error("plugin `{plugin}` failed: {message}")]
    #[diagnostic(code(weft::plugin::failed))]
    Failed { plugin: SmolStr, message: String },

    #[error("plugin `{plugin}` panicked: {message}")]
    #[diagnostic(code(weft::plugin::panicked))]
    Panicked { plugin: SmolStr, message: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Editor(#[from] EditorError),
}

impl PluginError {
    pub fn failed(plugin: impl Into<SmolStr>, message: impl Into<String>) -> Self {
        Self::Failed {
            plugin: plugin.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_error_display() {
        let err = RenderError::malformed("table", "expected at least 2 rows, found 1");
        assert_eq!(
            err.to_string(),
            "malformed `table` block: expected at least 2 rows, found 1"
        );
        assert_eq!(
            err.code().map(|c| c.to_string()).as_deref(),
            Some("weft::render::malformed")
        );
    }

    #[test]
    fn test_render_panic_display() {
        let err = RenderError::Panicked {
            kind: "heading".into(),
            message: "boom".into(),
        };
        assert_eq!(err.to_string(), "renderer for `heading` panicked: boom");
        assert_eq!(
            err.code().map(|c| c.to_string()).as_deref(),
            Some("weft::render::panicked")
        );
    }

    #[test]
    fn test_editor_error_converts_into_plugin_error() {
        let err: PluginError = EditorError::DuplicateTransition.into();
        assert!(matches!(err, PluginError::Editor(EditorError::DuplicateTransition)));
        assert_eq!(
            err.code().map(|c| c.to_string()).as_deref(),
            Some("weft::editor::duplicate_transition")
        );
    }
}
