//! Plugin pipeline.
//!
//! Plugins are held in one explicit ordered list, fixed when the editor is
//! built. For each event the pipeline offers it to every plugin that handles
//! the event's kind, in order, until one reports [`Handled::Handled`]. A
//! handler that errors or panics is logged and skipped; whatever it
//! scheduled is discarded.
//!
//! Handlers never mutate the model directly. They schedule at most one
//! transition on the [`EditorCore`]; once the chain is done, every plugin's
//! precommit hook may rewrite it, in order, and the result is committed.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use smol_str::SmolStr;
use tracing::{debug, error, trace, warn};
use web_time::Instant;

use crate::editor::EditorCore;
use crate::error::PluginError;
use crate::event::{EditEvent, EventKind};
use crate::model::Block;
use crate::types::{Caret, Position};

/// Outcome of one handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    /// The event is consumed; later plugins do not see it.
    Handled,
    /// Not interested; later plugins see the event.
    NotHandled,
    /// Interested but declined (e.g. an opaque block). Later plugins see the
    /// event and the model is left alone.
    Abstain,
}

/// A transition scheduled by a handler, awaiting precommit hooks.
#[derive(Debug, Clone)]
pub struct PendingCommit {
    pub blocks: Vec<Block>,
    pub caret: Caret,
    /// Tracked positions, against the committed state until a precommit
    /// hook relocates them.
    pub tracked: Vec<Position>,
}

impl PendingCommit {
    pub fn new(blocks: Vec<Block>, caret: impl Into<Caret>) -> Self {
        Self {
            blocks,
            caret: caret.into(),
            tracked: Vec::new(),
        }
    }
}

/// An editor plugin.
pub trait Plugin {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Whether `handle` wants events of this kind.
    fn handles(&self, kind: EventKind) -> bool;

    fn handle(&mut self, editor: &mut EditorCore, event: &EditEvent) -> Result<Handled, PluginError> {
        let _ = (editor, event);
        Ok(Handled::NotHandled)
    }

    /// Rewrite a scheduled transition before it is committed. `editor` still
    /// holds the previous state.
    fn precommit(
        &mut self,
        editor: &EditorCore,
        pending: &PendingCommit,
    ) -> Result<Option<PendingCommit>, PluginError> {
        let _ = (editor, pending);
        Ok(None)
    }
}

/// Result of running the handler chain for one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainOutcome {
    pub status: Handled,
    /// Plugin that consumed the event.
    pub handled_by: Option<SmolStr>,
    /// Handlers that errored or panicked.
    pub failures: usize,
}

/// The ordered plugin list.
#[derive(Default)]
pub struct Pipeline {
    plugins: Vec<Box<dyn Plugin>>,
}

impl Pipeline {
    pub fn new(plugins: Vec<Box<dyn Plugin>>) -> Self {
        Self { plugins }
    }

    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Run the handler chain for `event`.
    pub fn dispatch(&mut self, editor: &mut EditorCore, event: &EditEvent) -> ChainOutcome {
        let mut outcome = ChainOutcome {
            status: Handled::NotHandled,
            handled_by: None,
            failures: 0,
        };

        for plugin in self.plugins.iter_mut() {
            if !plugin.handles(event.kind) {
                continue;
            }
            let had_pending = editor.has_pending();
            let started = Instant::now();
            let result = catch_unwind(AssertUnwindSafe(|| plugin.handle(editor, event)));
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

            let name = plugin.name();
            match result {
                Ok(Ok(Handled::Handled)) => {
                    trace!(target: "weft::pipeline", plugin = name, kind = ?event.kind, elapsed_ms, "event handled");
                    outcome.status = Handled::Handled;
                    outcome.handled_by = Some(SmolStr::new(name));
                    break;
                }
                Ok(Ok(Handled::Abstain)) => {
                    debug!(target: "weft::pipeline", plugin = name, kind = ?event.kind, "plugin abstained");
                    outcome.status = Handled::Abstain;
                }
                Ok(Ok(Handled::NotHandled)) => {}
                Ok(Err(err)) => {
                    warn!(target: "weft::pipeline", plugin = name, kind = ?event.kind, error = %err, "plugin handler failed");
                    outcome.failures += 1;
                    if !had_pending {
                        editor.discard_pending();
                    }
                }
                Err(payload) => {
                    let err = PluginError::Panicked {
                        plugin: SmolStr::new(name),
                        message: panic_message(payload.as_ref()),
                    };
                    error!(target: "weft::pipeline", kind = ?event.kind, error = %err, "plugin handler panicked");
                    outcome.failures += 1;
                    if !had_pending {
                        editor.discard_pending();
                    }
                }
            }
        }
        outcome
    }

    /// Run every precommit hook over `pending`, in order.
    pub fn precommit(&mut self, editor: &EditorCore, mut pending: PendingCommit) -> PendingCommit {
        for plugin in self.plugins.iter_mut() {
            let result = catch_unwind(AssertUnwindSafe(|| plugin.precommit(editor, &pending)));
            match result {
                Ok(Ok(Some(rewritten))) => {
                    trace!(target: "weft::pipeline", plugin = plugin.name(), "precommit hook rewrote transition");
                    pending = rewritten;
                }
                Ok(Ok(None)) => {}
                Ok(Err(err)) => {
                    warn!(target: "weft::pipeline", plugin = plugin.name(), error = %err, "precommit hook failed");
                }
                Err(payload) => {
                    error!(
                        target: "weft::pipeline",
                        plugin = plugin.name(),
                        message = %panic_message(payload.as_ref()),
                        "precommit hook panicked"
                    );
                }
            }
        }
        pending
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
