//! The editor: committed state, view, native selection and plugins.
//!
//! [`EditorCore`] is what handlers see. It exposes the committed blocks, the
//! view, the selection read back from the view, and a single slot for the
//! transition a handler schedules. [`Editor`] pairs it with the plugin
//! [`Pipeline`] and drives dispatch: handler chain, precommit hooks, commit.

use smol_str::SmolStr;
use tracing::{debug, info, trace, warn};
use web_time::Instant;

use crate::config::EditorConfig;
use crate::error::EditorError;
use crate::event::{EditEvent, EventTarget};
use crate::metrics::{locate_in_block, measure_in_block, serialize, source_len, view_source_text};
use crate::model::Block;
use crate::plugin::{ChainOutcome, Handled, PendingCommit, Pipeline, Plugin};
use crate::reconcile::{CommitReport, Reconciler};
use crate::render::{BlockParser, BlockRenderer};
use crate::resolve::{Abstain, BlockRange, resolve_block_range};
use crate::types::{Caret, OrderedSelection, Position, Selection, TrackedId};
use crate::view::{ViewId, ViewPoint, ViewTree};

/// Native selection in view coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeSelection {
    pub anchor: ViewPoint,
    pub focus: ViewPoint,
}

/// Editor state shared with plugins.
pub struct EditorCore {
    tree: ViewTree,
    reconciler: Reconciler,
    parser: Box<dyn BlockParser>,
    renderer: Box<dyn BlockRenderer>,
    config: EditorConfig,
    native_selection: Option<NativeSelection>,
    composing: bool,
    pending: Option<PendingCommit>,
    clipboard: Option<String>,
    tracked: Vec<(TrackedId, Position)>,
    next_tracked: usize,
}

impl EditorCore {
    fn new(parser: Box<dyn BlockParser>, renderer: Box<dyn BlockRenderer>, config: EditorConfig) -> Self {
        Self {
            tree: ViewTree::new(),
            reconciler: Reconciler::new(),
            parser,
            renderer,
            config,
            native_selection: None,
            composing: false,
            pending: None,
            clipboard: None,
            tracked: Vec::new(),
            next_tracked: 0,
        }
    }

    /// The committed block list.
    pub fn blocks(&self) -> &[Block] {
        self.reconciler.blocks()
    }

    pub fn view(&self) -> &ViewTree {
        &self.tree
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn parser(&self) -> &dyn BlockParser {
        self.parser.as_ref()
    }

    /// Root subtree of the block at `index`.
    pub fn block_view(&self, index: usize) -> Option<ViewId> {
        self.reconciler.view_of(index)
    }

    pub fn is_opaque(&self, index: usize) -> bool {
        self.blocks()
            .get(index)
            .is_some_and(|b| self.config.is_opaque(&b.kind))
    }

    /// Block source text as the view currently shows it, native edits
    /// included.
    pub fn view_block_text(&self, index: usize) -> Option<String> {
        self.block_view(index)
            .map(|view| view_source_text(&self.tree, view))
    }

    pub fn get_text(&self) -> String {
        serialize(self.blocks())
    }

    pub fn composing(&self) -> bool {
        self.composing
    }

    pub fn set_composing(&mut self, composing: bool) {
        self.composing = composing;
    }

    pub fn native_selection(&self) -> Option<NativeSelection> {
        self.native_selection
    }

    /// Record the native selection. Points outside the view are kept; they
    /// read back as outside offsets.
    pub fn set_native_selection(&mut self, anchor: ViewPoint, focus: ViewPoint) {
        self.native_selection = Some(NativeSelection { anchor, focus });
    }

    /// Current selection in document coordinates.
    pub fn selection(&self) -> Selection {
        let Some(native) = self.native_selection else {
            return Selection::outside();
        };
        let (anchor_block, anchor_offset) = self.document_point(native.anchor);
        let (focus_block, focus_offset) = self.document_point(native.focus);
        Selection {
            anchor_block,
            anchor_offset,
            focus_block,
            focus_offset,
        }
    }

    pub fn ordered_selection(&self) -> OrderedSelection {
        self.selection().ordered()
    }

    fn document_point(&self, point: ViewPoint) -> (usize, Option<usize>) {
        let count = self.blocks().len();
        if count == 0 {
            return (0, None);
        }
        if point.node == self.tree.root() {
            // Root-level points address blocks by child index; past the last
            // child is the end of the document.
            if point.offset >= count {
                let last = count - 1;
                return (last, Some(source_len(&self.blocks()[last])));
            }
            return (point.offset, Some(0));
        }
        let Some(block) = self.tree.block_index_of(point.node) else {
            return (0, None);
        };
        let offset = self
            .block_view(block)
            .and_then(|view| measure_in_block(&self.tree, view, point));
        (block.min(count - 1), offset)
    }

    /// View point for a document position. Offsets past the end of a block's
    /// rendered text continue into the following block.
    pub fn view_point(&self, pos: Position) -> Option<ViewPoint> {
        let count = self.blocks().len();
        if count == 0 {
            return None;
        }
        let mut block = pos.block.min(count - 1);
        let mut offset = pos.offset;
        loop {
            let view = self.block_view(block)?;
            let located = locate_in_block(&self.tree, view, offset);
            if located.overflow == 0 || block + 1 >= count {
                return Some(located.point);
            }
            offset = located.overflow - 1;
            block += 1;
        }
    }

    /// Resolve the blocks an input event touched.
    pub fn resolve_block_range(&self, target: EventTarget) -> Result<BlockRange, Abstain> {
        resolve_block_range(
            &self.tree,
            self.blocks(),
            target,
            &self.selection(),
            |kind| self.config.is_opaque(kind),
        )
    }

    /// Parse text with the editor's parser.
    pub fn parse(&self, text: &str) -> Vec<Block> {
        self.parser.parse_all(text)
    }

    /// Schedule the transition for the current event.
    pub fn schedule(&mut self, blocks: Vec<Block>, caret: impl Into<Caret>) -> Result<(), EditorError> {
        if self.pending.is_some() {
            return Err(EditorError::DuplicateTransition);
        }
        let caret = caret.into();
        trace!(
            target: "weft::transition",
            blocks = blocks.len(),
            anchor = ?caret.anchor,
            focus = ?caret.focus,
            basis = ?caret.basis,
            "transition scheduled"
        );
        self.pending = Some(PendingCommit::new(blocks, caret));
        Ok(())
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub(crate) fn discard_pending(&mut self) {
        if self.pending.take().is_some() {
            debug!(target: "weft::transition", "discarded scheduled transition");
        }
    }

    fn take_pending(&mut self) -> Option<PendingCommit> {
        self.pending.take()
    }

    /// Keep `pos` current across commits, e.g. a bookmark or another
    /// user's caret.
    pub fn track(&mut self, pos: impl Into<Position>) -> TrackedId {
        let id = TrackedId(self.next_tracked);
        self.next_tracked += 1;
        let pos = self.clamp(pos.into());
        self.tracked.push((id, pos));
        id
    }

    pub fn tracked(&self, id: TrackedId) -> Option<Position> {
        self.tracked.iter().find(|(t, _)| *t == id).map(|(_, pos)| *pos)
    }

    /// Stop tracking. `false` if `id` was not tracked.
    pub fn untrack(&mut self, id: TrackedId) -> bool {
        let before = self.tracked.len();
        self.tracked.retain(|(t, _)| *t != id);
        self.tracked.len() != before
    }

    fn tracked_positions(&self) -> Vec<Position> {
        self.tracked.iter().map(|(_, pos)| *pos).collect()
    }

    pub fn set_clipboard(&mut self, text: impl Into<String>) {
        self.clipboard = Some(text.into());
    }

    fn take_clipboard(&mut self) -> Option<String> {
        self.clipboard.take()
    }

    /// Reconcile the view against `pending` and restore its caret.
    fn apply(&mut self, pending: PendingCommit) -> CommitReport {
        let started = Instant::now();
        let report = self.reconciler.apply(
            &mut self.tree,
            self.renderer.as_ref(),
            &self.config,
            pending.blocks,
        );
        self.restore_caret(&pending.caret);
        let positions: Vec<Position> = pending.tracked.iter().map(|pos| self.clamp(*pos)).collect();
        for ((_, slot), pos) in self.tracked.iter_mut().zip(positions) {
            *slot = pos;
        }
        debug!(
            target: "weft::metrics",
            blocks = self.blocks().len(),
            rendered = report.rendered(),
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "commit complete"
        );
        report
    }

    fn restore_caret(&mut self, caret: &Caret) {
        let count = self.blocks().len();
        if count == 0 {
            self.native_selection = None;
            return;
        }
        let anchor = self.clamp(caret.anchor);
        let focus = self.clamp(caret.focus);
        match (self.view_point(anchor), self.view_point(focus)) {
            (Some(anchor), Some(focus)) => {
                self.native_selection = Some(NativeSelection { anchor, focus });
            }
            _ => {
                warn!(target: "weft::relocate", ?caret, "could not place caret in view");
                self.native_selection = None;
            }
        }
    }

    fn clamp(&self, pos: Position) -> Position {
        let blocks = self.blocks();
        let block = pos.block.min(blocks.len().saturating_sub(1));
        let len = blocks.get(block).map_or(0, |b| source_len(b));
        if pos.block != block || pos.offset > len {
            let err = EditorError::CaretOutOfRange {
                block: pos.block,
                offset: pos.offset,
            };
            debug!(target: "weft::relocate", error = %err, block, len, "clamped caret to document");
        }
        Position::new(block, pos.offset.min(len))
    }
}

/// What `Editor::dispatch` did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub status: Handled,
    pub handled_by: Option<SmolStr>,
    pub failures: usize,
    /// Present when the event led to a commit.
    pub commit: Option<CommitReport>,
}

/// Builds an [`Editor`] with its ordered plugin list.
pub struct EditorBuilder {
    parser: Box<dyn BlockParser>,
    renderer: Box<dyn BlockRenderer>,
    config: EditorConfig,
    prior: Vec<Box<dyn Plugin>>,
    default_plugin: Option<Box<dyn Plugin>>,
    plugins: Vec<Box<dyn Plugin>>,
    text: String,
}

impl EditorBuilder {
    pub fn new(parser: impl BlockParser + 'static, renderer: impl BlockRenderer + 'static) -> Self {
        Self {
            parser: Box::new(parser),
            renderer: Box::new(renderer),
            config: EditorConfig::default(),
            prior: Vec::new(),
            default_plugin: Some(Box::new(crate::default_plugin::DefaultPlugin::new())),
            plugins: Vec::new(),
            text: String::new(),
        }
    }

    pub fn config(mut self, config: EditorConfig) -> Self {
        self.config = config;
        self
    }

    /// Plugin that runs before the default plugin.
    pub fn prior_plugin(mut self, plugin: impl Plugin + 'static) -> Self {
        self.prior.push(Box::new(plugin));
        self
    }

    /// Plugin that runs after the default plugin.
    pub fn plugin(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    /// Leave out the default plugin.
    pub fn without_default_plugin(mut self) -> Self {
        self.default_plugin = None;
        self
    }

    /// Initial document text.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn build(self) -> Editor {
        let mut plugins = self.prior;
        plugins.extend(self.default_plugin);
        plugins.extend(self.plugins);
        let pipeline = Pipeline::new(plugins);
        info!(target: "weft::pipeline", plugins = ?pipeline.names(), "editor built");

        let mut editor = Editor {
            core: EditorCore::new(self.parser, self.renderer, self.config),
            pipeline,
        };
        editor.set_text(&self.text);
        editor
    }
}

/// A structured-document editor.
pub struct Editor {
    core: EditorCore,
    pipeline: Pipeline,
}

impl Editor {
    pub fn builder(parser: impl BlockParser + 'static, renderer: impl BlockRenderer + 'static) -> EditorBuilder {
        EditorBuilder::new(parser, renderer)
    }

    pub fn core(&self) -> &EditorCore {
        &self.core
    }

    pub fn blocks(&self) -> &[Block] {
        self.core.blocks()
    }

    pub fn view(&self) -> &ViewTree {
        self.core.view()
    }

    pub fn plugin_names(&self) -> Vec<&str> {
        self.pipeline.names()
    }

    pub fn selection(&self) -> Selection {
        self.core.selection()
    }

    pub fn get_text(&self) -> String {
        self.core.get_text()
    }

    /// Parse `text` and commit it with the caret at the start.
    pub fn set_text(&mut self, text: &str) -> CommitReport {
        let blocks = self.core.parse(text);
        self.commit(blocks, Caret::collapsed((0, 0)))
    }

    /// Place the caret at document positions.
    pub fn set_caret(&mut self, caret: impl Into<Caret>) {
        let caret = caret.into();
        self.core.restore_caret(&caret);
    }

    /// Run the precommit hooks and commit `blocks`.
    pub fn commit(&mut self, blocks: Vec<Block>, caret: impl Into<Caret>) -> CommitReport {
        self.finish(PendingCommit::new(blocks, caret))
    }

    /// Commit `blocks`, keeping the caret at its current document position.
    pub fn commit_keeping_caret(&mut self, blocks: Vec<Block>) -> CommitReport {
        let caret = Caret::from(self.core.selection());
        self.commit(blocks, caret)
    }

    fn finish(&mut self, mut pending: PendingCommit) -> CommitReport {
        pending.tracked = self.core.tracked_positions();
        let pending = self.pipeline.precommit(&self.core, pending);
        self.core.apply(pending)
    }

    /// Offer an event to the plugins and commit what they scheduled.
    pub fn dispatch(&mut self, event: EditEvent) -> DispatchOutcome {
        let ChainOutcome {
            status,
            handled_by,
            failures,
        } = self.pipeline.dispatch(&mut self.core, &event);

        let commit = self
            .core
            .take_pending()
            .map(|pending| self.finish(pending));
        DispatchOutcome {
            status,
            handled_by,
            failures,
            commit,
        }
    }

    /// Keep `pos` current across commits.
    pub fn track(&mut self, pos: impl Into<Position>) -> TrackedId {
        self.core.track(pos)
    }

    pub fn tracked(&self, id: TrackedId) -> Option<Position> {
        self.core.tracked(id)
    }

    pub fn untrack(&mut self, id: TrackedId) -> bool {
        self.core.untrack(id)
    }

    /// Text placed on the clipboard by the last copy.
    pub fn take_clipboard(&mut self) -> Option<String> {
        self.core.take_clipboard()
    }

    /// Surface for edits the platform makes natively.
    pub fn native(&mut self) -> NativeSurface<'_> {
        NativeSurface { core: &mut self.core }
    }
}

/// The platform's view of the editor: in-place text edits and the native
/// selection. Structural changes only happen through commits.
pub struct NativeSurface<'a> {
    core: &'a mut EditorCore,
}

impl NativeSurface<'_> {
    pub fn set_text(&mut self, node: ViewId, text: impl Into<SmolStr>) -> bool {
        self.core.tree.set_text(node, text)
    }

    pub fn set_decorative_text(&mut self, node: ViewId, text: impl Into<SmolStr>) -> bool {
        self.core.tree.set_decorative_text(node, text)
    }

    pub fn select(&mut self, anchor: ViewPoint, focus: ViewPoint) {
        self.core.set_native_selection(anchor, focus);
    }

    /// Place a collapsed native caret at a document position.
    pub fn select_position(&mut self, pos: Position) -> bool {
        match self.core.view_point(pos) {
            Some(point) => {
                self.core.set_native_selection(point, point);
                true
            }
            None => false,
        }
    }
}
