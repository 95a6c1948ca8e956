//! Editor configuration.

use smol_str::SmolStr;

/// Tunables fixed when the editor is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorConfig {
    /// Block kinds the default input handler must not rewrite from view
    /// text. Edits touching them are left to a dedicated plugin.
    pub opaque_kinds: Vec<SmolStr>,
    /// Patch a changed block's existing view in place instead of rebuilding
    /// it when the reconciler swaps one block for another at the same index.
    pub morph_changed_blocks: bool,
    /// Class attribute set on placeholder elements.
    pub placeholder_class: SmolStr,
    /// Label shown in front of the render error message.
    pub placeholder_label: SmolStr,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            opaque_kinds: vec![SmolStr::new_static("table")],
            morph_changed_blocks: true,
            placeholder_class: SmolStr::new_static("weft-render-error"),
            placeholder_label: SmolStr::new_static("Could not render block"),
        }
    }
}

impl EditorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_opaque_kind(mut self, kind: impl Into<SmolStr>) -> Self {
        let kind = kind.into();
        if !self.is_opaque(&kind) {
            self.opaque_kinds.push(kind);
        }
        self
    }

    /// Replace the opaque kind list.
    pub fn with_opaque_kinds<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        self.opaque_kinds = kinds.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_morph(mut self, morph: bool) -> Self {
        self.morph_changed_blocks = morph;
        self
    }

    pub fn with_placeholder_label(mut self, label: impl Into<SmolStr>) -> Self {
        self.placeholder_label = label.into();
        self
    }

    pub fn with_placeholder_class(mut self, class: impl Into<SmolStr>) -> Self {
        self.placeholder_class = class.into();
        self
    }

    pub fn is_opaque(&self, kind: &str) -> bool {
        self.opaque_kinds.iter().any(|k| k == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EditorConfig::default();
        assert!(config.is_opaque("table"));
        assert!(!config.is_opaque("paragraph"));
        assert!(config.morph_changed_blocks);
    }

    #[test]
    fn test_builders() {
        let config = EditorConfig::new()
            .with_opaque_kind("code_block")
            .with_opaque_kind("table")
            .with_morph(false);
        assert_eq!(config.opaque_kinds.len(), 2);
        assert!(config.is_opaque("code_block"));
        assert!(!config.morph_changed_blocks);

        let none = config.with_opaque_kinds(Vec::<&str>::new());
        assert!(!none.is_opaque("table"));
    }
}
