//! Reconciliation of the view against a new block list.
//!
//! For each position `i` of the new list, in order:
//! 1. if the block already has a rendered subtree (same allocation, still
//!    attached), that subtree is moved to `i` if needed and left untouched
//! 2. otherwise, if the subtree previously at `i` belongs to a block that
//!    is gone from the new list, it is reused in place: rebuilt, or morphed
//!    when the config allows it
//! 3. otherwise a fresh subtree is rendered and inserted at `i`
//!
//! Root children past the new length are removed at the end. After step `i`
//! the first `i + 1` root children are final.
//!
//! A block that fails to render, by error or by panic, gets a placeholder
//! element carrying the block's text, so offsets into it still resolve.

use std::collections::{HashMap, HashSet};
use std::panic::{AssertUnwindSafe, catch_unwind};

use smol_str::{SmolStr, format_smolstr};
use tracing::{debug, error, trace, warn};
use web_time::Instant;

use crate::config::EditorConfig;
use crate::error::RenderError;
use crate::metrics::flattened_text;
use crate::model::{Block, Node, block_key};
use crate::plugin::panic_message;
use crate::render::BlockRenderer;
use crate::view::{BlockMeta, Fragment, ReplaceMode, ViewId, ViewTree};

/// What a commit did to the view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReport {
    /// Subtrees kept exactly where they were.
    pub reused: usize,
    /// Subtrees kept but moved to a new index.
    pub moved: usize,
    /// Fresh subtrees inserted.
    pub inserted: usize,
    /// Subtrees of removed blocks rewritten in place for new blocks.
    pub replaced: usize,
    /// Subtrees dropped from the end.
    pub removed: usize,
    /// Blocks shown as placeholders after a render error.
    pub placeholders: usize,
}

impl CommitReport {
    /// Number of render calls the commit made.
    pub fn rendered(&self) -> usize {
        self.inserted + self.replaced
    }
}

/// Owns the committed block list and the subtree rendered for each block.
#[derive(Debug, Default)]
pub struct Reconciler {
    blocks: Vec<Block>,
    owners: Vec<ViewId>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// The committed block list.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Root subtree of the block at `index`.
    pub fn view_of(&self, index: usize) -> Option<ViewId> {
        self.owners.get(index).copied()
    }

    pub fn views(&self) -> &[ViewId] {
        &self.owners
    }

    /// Bring `tree` in line with `next`.
    pub fn apply(
        &mut self,
        tree: &mut ViewTree,
        renderer: &dyn BlockRenderer,
        config: &EditorConfig,
        next: Vec<Block>,
    ) -> CommitReport {
        let started = Instant::now();

        let report = self.reconcile(tree, renderer, config, &next);
        self.blocks = next;
        self.owners = tree.children(tree.root()).to_vec();

        self.check_shape(tree);
        debug!(
            target: "weft::reconcile",
            blocks = self.blocks.len(),
            reused = report.reused,
            moved = report.moved,
            inserted = report.inserted,
            replaced = report.replaced,
            removed = report.removed,
            placeholders = report.placeholders,
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "commit applied"
        );
        report
    }

    fn reconcile(
        &self,
        tree: &mut ViewTree,
        renderer: &dyn BlockRenderer,
        config: &EditorConfig,
        next: &[Block],
    ) -> CommitReport {
        let root = tree.root();
        let old = &self.blocks;
        let mut report = CommitReport::default();

        let mut old_index: HashMap<*const Node, usize> = HashMap::with_capacity(old.len());
        for (j, block) in old.iter().enumerate() {
            old_index.entry(block_key(block)).or_insert(j);
        }
        let next_keys: HashSet<*const Node> = next.iter().map(block_key).collect();
        let mut claimed = vec![false; old.len()];

        for (i, block) in next.iter().enumerate() {
            let current = tree.children(root).get(i).copied();

            if let Some(&j) = old_index.get(&block_key(block)) {
                let view = self.owners.get(j).copied();
                if let Some(view) = view.filter(|v| !claimed[j] && owns(tree, *v, block)) {
                    claimed[j] = true;
                    if current == Some(view) {
                        report.reused += 1;
                    } else {
                        tree.move_subtree(view, root, i);
                        report.moved += 1;
                    }
                    trace!(target: "weft::reconcile", index = i, from = j, "kept block view");
                    continue;
                }
            }

            let (fragment, placeholder) = build(block, renderer, config);
            if placeholder {
                report.placeholders += 1;
            }

            let reusable = (i < old.len()
                && !claimed[i]
                && !next_keys.contains(&block_key(&old[i])))
            .then(|| self.owners.get(i).copied())
            .flatten()
            .filter(|v| tree.parent(*v) == Some(root));

            match reusable {
                Some(view) => {
                    claimed[i] = true;
                    if current != Some(view) {
                        tree.move_subtree(view, root, i);
                    }
                    let mode = if config.morph_changed_blocks {
                        ReplaceMode::Morph
                    } else {
                        ReplaceMode::Rebuild
                    };
                    tree.replace_subtree(view, fragment, mode);
                    report.replaced += 1;
                    trace!(target: "weft::reconcile", index = i, ?mode, "replaced block view");
                }
                None => {
                    tree.insert_subtree(root, i, fragment);
                    report.inserted += 1;
                    trace!(target: "weft::reconcile", index = i, "inserted block view");
                }
            }
        }

        while tree.children(root).len() > next.len() {
            let Some(&extra) = tree.children(root).last() else {
                break;
            };
            tree.remove_subtree(extra);
            report.removed += 1;
        }
        report
    }

    fn check_shape(&self, tree: &ViewTree) {
        let mismatch = self
            .blocks
            .iter()
            .zip(&self.owners)
            .position(|(block, view)| {
                tree.block_meta(*view).map(|m| &m.kind) != Some(&block.kind)
            });
        if self.blocks.len() != self.owners.len() || mismatch.is_some() {
            warn!(
                target: "weft::reconcile",
                blocks = self.blocks.len(),
                views = self.owners.len(),
                first_mismatch = ?mismatch,
                "view does not match committed blocks"
            );
        }
    }
}

/// Whether `view` is an attached block subtree rendered for `block`'s kind.
fn owns(tree: &ViewTree, view: ViewId, block: &Block) -> bool {
    tree.parent(view) == Some(tree.root())
        && tree.block_meta(view).is_some_and(|m| m.kind == block.kind)
}

/// Render a block and stamp its metadata. The flag is set for placeholders.
fn build(block: &Node, renderer: &dyn BlockRenderer, config: &EditorConfig) -> (Fragment, bool) {
    let rendered = catch_unwind(AssertUnwindSafe(|| renderer.render(block))).unwrap_or_else(|payload| {
        let err = RenderError::Panicked {
            kind: block.kind.clone(),
            message: panic_message(payload.as_ref()),
        };
        error!(target: "weft::reconcile", error = %err, "renderer panicked");
        Err(err)
    });
    let (mut fragment, placeholder) = match rendered {
        Ok(Fragment::Text(text)) => (Fragment::element("span").child(Fragment::Text(text)), false),
        Ok(fragment) => (fragment, false),
        Err(err) => {
            warn!(
                target: "weft::reconcile",
                kind = %block.kind,
                error = %err,
                "block failed to render, showing placeholder"
            );
            (placeholder_for(block, &err, config), true)
        }
    };
    fragment.set_meta(BlockMeta {
        kind: block.kind.clone(),
        prefix: block.prefix.clone(),
        suffix: block.suffix.clone(),
        placeholder,
    });
    (fragment, placeholder)
}

fn placeholder_for(block: &Node, err: &RenderError, config: &EditorConfig) -> Fragment {
    let message: SmolStr = format_smolstr!("{}: {}", config.placeholder_label, err);
    Fragment::element("div")
        .attr("class", config.placeholder_class.clone())
        .attr("title", message)
        .non_editable()
        .child(Fragment::element("span").decorative(flattened_text(block)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{serialize, view_source_text};
    use crate::render::BlockParser;
    use crate::test_support::{CountingRenderer, LineParser};

    struct Harness {
        tree: ViewTree,
        reconciler: Reconciler,
        renderer: CountingRenderer,
        config: EditorConfig,
    }

    impl Harness {
        fn new(config: EditorConfig) -> Self {
            Self {
                tree: ViewTree::new(),
                reconciler: Reconciler::new(),
                renderer: CountingRenderer::new(),
                config,
            }
        }

        fn commit(&mut self, blocks: Vec<Block>) -> CommitReport {
            self.reconciler
                .apply(&mut self.tree, &self.renderer, &self.config, blocks)
        }

        fn view_text(&self) -> String {
            self.reconciler
                .views()
                .iter()
                .map(|v| view_source_text(&self.tree, *v))
                .collect::<Vec<_>>()
                .join("\n")
        }
    }

    fn parse(text: &str) -> Vec<Block> {
        LineParser.parse_all(text)
    }

    #[test]
    fn test_initial_commit_renders_everything() {
        let mut h = Harness::new(EditorConfig::default());
        let blocks = parse("# Title\na\nb");
        let report = h.commit(blocks.clone());
        assert_eq!(report.inserted, 3);
        assert_eq!(h.renderer.calls.get(), 3);
        assert_eq!(h.view_text(), serialize(&blocks));
    }

    #[test]
    fn test_same_state_renders_nothing() {
        let mut h = Harness::new(EditorConfig::default());
        let blocks = parse("a\nb\nc");
        h.commit(blocks.clone());
        let before = h.reconciler.views().to_vec();
        h.renderer.calls.set(0);

        let report = h.commit(blocks);
        assert_eq!(report.reused, 3);
        assert_eq!(h.renderer.calls.get(), 0);
        assert_eq!(h.reconciler.views(), before.as_slice());
    }

    #[test]
    fn test_only_changed_block_is_rendered() {
        let mut h = Harness::new(EditorConfig::default());
        let blocks = parse("a\nb\nc");
        h.commit(blocks.clone());
        let before = h.reconciler.views().to_vec();
        h.renderer.calls.set(0);

        let mut next = blocks.clone();
        next[1] = parse("B").remove(0);
        let report = h.commit(next.clone());
        assert_eq!(h.renderer.calls.get(), 1);
        assert_eq!(report.replaced, 1);
        assert_eq!(h.reconciler.views()[0], before[0]);
        assert_eq!(h.reconciler.views()[2], before[2]);
        // Morphing keeps the root of the replaced subtree.
        assert_eq!(h.reconciler.views()[1], before[1]);
        assert_eq!(h.view_text(), "a\nB\nc");
    }

    #[test]
    fn test_rebuild_mode_replaces_subtree() {
        let mut h = Harness::new(EditorConfig::default().with_morph(false));
        let blocks = parse("a\nb");
        h.commit(blocks.clone());
        let before = h.reconciler.views().to_vec();

        let next = vec![blocks[0].clone(), parse("x").remove(0)];
        h.commit(next);
        assert_eq!(h.reconciler.views()[0], before[0]);
        assert_ne!(h.reconciler.views()[1], before[1]);
        assert!(!h.tree.is_alive(before[1]));
    }

    #[test]
    fn test_insert_shifts_and_keeps_following_blocks() {
        let mut h = Harness::new(EditorConfig::default());
        let blocks = parse("a\nc");
        h.commit(blocks.clone());
        let before = h.reconciler.views().to_vec();
        h.renderer.calls.set(0);

        let next = vec![blocks[0].clone(), parse("b").remove(0), blocks[1].clone()];
        let report = h.commit(next);
        assert_eq!(h.renderer.calls.get(), 1);
        assert_eq!(report.inserted, 1);
        assert_eq!(h.reconciler.views()[0], before[0]);
        assert_eq!(h.reconciler.views()[2], before[1]);
        assert_eq!(h.view_text(), "a\nb\nc");
    }

    #[test]
    fn test_removal_and_reorder() {
        let mut h = Harness::new(EditorConfig::default());
        let blocks = parse("a\nb\nc\nd");
        h.commit(blocks.clone());
        let before = h.reconciler.views().to_vec();
        h.renderer.calls.set(0);

        let next = vec![blocks[3].clone(), blocks[0].clone()];
        let report = h.commit(next);
        assert_eq!(h.renderer.calls.get(), 0);
        assert_eq!(report.removed, 2);
        assert_eq!(h.reconciler.views(), &[before[3], before[0]]);
        assert!(!h.tree.is_alive(before[1]));
        assert_eq!(h.view_text(), "d\na");
    }

    #[test]
    fn test_duplicate_block_renders_second_copy() {
        let mut h = Harness::new(EditorConfig::default());
        let blocks = parse("a");
        h.commit(blocks.clone());
        let next = vec![blocks[0].clone(), blocks[0].clone()];
        let report = h.commit(next);
        assert_eq!(report.reused, 1);
        assert_eq!(report.inserted, 1);
        assert_eq!(h.view_text(), "a\na");
    }

    #[test]
    fn test_render_error_shows_placeholder() {
        let mut h = Harness::new(EditorConfig::default());
        let blocks = parse("a\n|only row");
        let report = h.commit(blocks);
        assert_eq!(report.placeholders, 1);

        let view = h.reconciler.view_of(1).unwrap();
        let meta = h.tree.block_meta(view).unwrap();
        assert!(meta.placeholder);
        assert_eq!(meta.kind, "table");
        assert_eq!(h.view_text(), "a\n|only row");
        let title = h.tree.element(view).and_then(|el| el.attr("title")).unwrap();
        assert!(title.contains("expected at least 2 rows"));
    }

    /// Panics on headings, renders everything else normally.
    struct PanicsOnHeading(CountingRenderer);

    impl BlockRenderer for PanicsOnHeading {
        fn render(&self, node: &Node) -> Result<Fragment, RenderError> {
            if node.kind == "heading" {
                panic!("cannot draw {}", node.kind);
            }
            self.0.render(node)
        }
    }

    #[test]
    fn test_render_panic_shows_placeholder() {
        let mut tree = ViewTree::new();
        let mut reconciler = Reconciler::new();
        let renderer = PanicsOnHeading(CountingRenderer::new());
        let config = EditorConfig::default();

        let report = reconciler.apply(&mut tree, &renderer, &config, parse("a\n# boom\nc"));
        assert_eq!(report.placeholders, 1);
        assert_eq!(report.inserted, 3);

        let view = reconciler.view_of(1).unwrap();
        assert!(tree.block_meta(view).unwrap().placeholder);
        assert_eq!(view_source_text(&tree, view), "# boom");
        let title = tree.element(view).and_then(|el| el.attr("title")).unwrap();
        assert!(title.contains("cannot draw heading"), "{title}");
        assert!(!tree.block_meta(reconciler.view_of(0).unwrap()).unwrap().placeholder);
    }

    #[test]
    fn test_empty_state_clears_view() {
        let mut h = Harness::new(EditorConfig::default());
        h.commit(parse("a\nb"));
        let report = h.commit(Vec::new());
        assert_eq!(report.removed, 2);
        assert!(h.tree.children(h.tree.root()).is_empty());
        assert_eq!(h.tree.len(), 1);
    }
}
