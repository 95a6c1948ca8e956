//! Minimal grammar for unit tests: one block per line, except runs of
//! `|` lines which form a single table block.

use std::cell::Cell;
use std::rc::Rc;

use crate::error::RenderError;
use crate::model::{Block, Node};
use crate::render::{BlockParser, BlockRenderer, RendererRegistry};
use crate::view::Fragment;

pub(crate) struct LineParser;

impl BlockParser for LineParser {
    fn parse<'a>(&'a self, text: &'a str) -> Box<dyn Iterator<Item = Block> + 'a> {
        let mut blocks = Vec::new();
        let mut table: Vec<&str> = Vec::new();
        for line in text.split('\n') {
            if line.starts_with('|') {
                table.push(line);
                continue;
            }
            if !table.is_empty() {
                blocks.push(Node::new("table").text(table.join("\n")).into_block());
                table.clear();
            }
            blocks.push(line_block(line));
        }
        if !table.is_empty() {
            blocks.push(Node::new("table").text(table.join("\n")).into_block());
        }
        Box::new(blocks.into_iter())
    }
}

fn line_block(line: &str) -> Block {
    if let Some(rest) = line.strip_prefix("# ") {
        Node::new("heading").with_prefix("# ").text(rest).into_block()
    } else if let Some(rest) = line.strip_prefix("[x]") {
        Node::new("paragraph")
            .child(Node::new("checkbox").with_decorative_text("[x]"))
            .text(rest)
            .into_block()
    } else {
        Node::new("paragraph").text(line).into_block()
    }
}

pub(crate) fn registry() -> RendererRegistry {
    RendererRegistry::new()
        .with("paragraph", |mut cx| {
            Ok(Fragment::element("p").children(cx.take_children()))
        })
        .with("heading", |mut cx| {
            Ok(Fragment::element("h1").children(cx.take_children()))
        })
        .with("checkbox", |cx| {
            Ok(Fragment::element("input").decorative(cx.flattened_text()))
        })
        .with("table", |cx| {
            let text = cx.flattened_text();
            let rows: Vec<&str> = text.split('\n').collect();
            if rows.len() < 2 {
                return Err(RenderError::malformed(
                    "table",
                    format!("expected at least 2 rows, found {}", rows.len()),
                ));
            }
            Ok(Fragment::element("table").children(
                rows.into_iter()
                    .map(|r| Fragment::element("tr").child(Fragment::text(r))),
            ))
        })
}

/// Renderer wrapper counting render calls.
#[derive(Clone)]
pub(crate) struct CountingRenderer {
    inner: Rc<RendererRegistry>,
    pub calls: Rc<Cell<usize>>,
}

impl CountingRenderer {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(registry()),
            calls: Rc::new(Cell::new(0)),
        }
    }
}

impl BlockRenderer for CountingRenderer {
    fn render(&self, node: &Node) -> Result<Fragment, RenderError> {
        self.calls.set(self.calls.get() + 1);
        self.inner.render(node)
    }
}
