//! Render functions for the markdown kinds.
//!
//! Markup the parser keeps as nodes stays visible (`span.markup`), except
//! table pipes and delimiter rows, which render as decorative elements so
//! the table reads as a grid while its view text still matches the source.

use smol_str::SmolStr;
use weft_editor_core::{
    Fragment, Node, RenderContext, RenderError, RendererRegistry, flattened_text,
};

use crate::inline::{CODE, EMPHASIS, LINK, LINK_URL, MARKUP, STRIKETHROUGH, STRONG};
use crate::parser::{
    BLOCKQUOTE, CHECKBOX, CHECKED, CODE_BLOCK, CODE_FENCE, HEADING, HORIZONTAL_RULE, LIST_ITEM,
    ORDERED_ITEM, PARAGRAPH, RULE, TABLE, TABLE_CELL, TABLE_DELIMITER, TABLE_HEADER, TABLE_PIPE,
    TABLE_ROW, TODO_ITEM, fence_language, heading_level,
};

/// Minimum rows for a renderable table: header and delimiter.
const MIN_TABLE_ROWS: usize = 2;

/// Registry covering every kind [`MarkdownParser`](crate::MarkdownParser)
/// produces.
pub fn markdown_renderer() -> RendererRegistry {
    RendererRegistry::new()
        .with(PARAGRAPH, wrap("p"))
        .with(HEADING, |mut cx| {
            let level = heading_level(cx.node.prefix.as_deref().unwrap_or("#"));
            Ok(Fragment::element(format!("h{level}")).children(cx.take_children()))
        })
        .with(BLOCKQUOTE, wrap("blockquote"))
        .with(LIST_ITEM, |mut cx| {
            Ok(Fragment::element("li")
                .attr("class", "list_item")
                .children(cx.take_children()))
        })
        .with(ORDERED_ITEM, |mut cx| {
            Ok(Fragment::element("li")
                .attr("class", "ordered_item")
                .children(cx.take_children()))
        })
        .with(TODO_ITEM, |mut cx| {
            let class = if is_checked(cx.node) {
                "todo_item done"
            } else {
                "todo_item"
            };
            Ok(Fragment::element("li")
                .attr("class", class)
                .children(cx.take_children()))
        })
        .with(CHECKBOX, |cx| {
            let text = cx.flattened_text();
            Ok(Fragment::element("button")
                .attr("role", "checkbox")
                .attr("aria-checked", if text == CHECKED { "true" } else { "false" })
                .non_editable()
                .decorative(text))
        })
        .with(HORIZONTAL_RULE, wrap("p"))
        .with(RULE, |cx| {
            Ok(Fragment::element("img")
                .attr("role", "presentation")
                .attr("class", "rule")
                .decorative(cx.flattened_text()))
        })
        .with(CODE_BLOCK, |mut cx| {
            let mut pre = Fragment::element("pre");
            if let Some(lang) = opening_fence(cx.node).as_deref().and_then(fence_language) {
                pre = pre.attr("data-lang", lang);
            }
            Ok(pre.child(Fragment::element("code").children(cx.take_children())))
        })
        .with(CODE_FENCE, class_span("code_fence"))
        .with(MARKUP, class_span("markup"))
        .with(STRONG, wrap("strong"))
        .with(EMPHASIS, wrap("em"))
        .with(CODE, wrap("code"))
        .with(STRIKETHROUGH, wrap("s"))
        .with(LINK, |mut cx| {
            let href = cx.node.href.clone().unwrap_or_default();
            Ok(Fragment::element("a")
                .attr("href", href)
                .children(cx.take_children()))
        })
        .with(LINK_URL, class_span("link_url"))
        .with(TABLE, render_table)
        .with(TABLE_HEADER, |cx| Ok(render_row(cx).attr("class", "header")))
        .with(TABLE_ROW, |cx| Ok(render_row(cx)))
        .with(TABLE_DELIMITER, |cx| {
            Ok(Fragment::element("tr")
                .attr("class", "delimiter")
                .decorative(cx.flattened_text()))
        })
        .with(TABLE_CELL, wrap("td"))
        .with(TABLE_PIPE, |cx| Ok(pipe(cx.flattened_text())))
}

type RenderResult = Result<Fragment, RenderError>;

fn wrap(tag: &'static str) -> impl Fn(RenderContext<'_>) -> RenderResult {
    move |mut cx| Ok(Fragment::element(tag).children(cx.take_children()))
}

fn class_span(class: &'static str) -> impl Fn(RenderContext<'_>) -> RenderResult {
    move |mut cx| {
        Ok(Fragment::element("span")
            .attr("class", class)
            .children(cx.take_children()))
    }
}

fn pipe(text: impl Into<SmolStr>) -> Fragment {
    Fragment::element("span")
        .attr("class", "table_pipe")
        .decorative(text)
}

fn is_checked(node: &Node) -> bool {
    node.child_nodes()
        .any(|n| n.kind == CHECKBOX && n.decorative_text.as_deref() == Some(CHECKED))
}

fn opening_fence(node: &Node) -> Option<String> {
    node.child_nodes()
        .find(|n| n.kind == CODE_FENCE)
        .map(|n| flattened_text(n))
}

/// Loose text between cells (outer whitespace) renders decorative so only
/// cells take the caret.
fn render_row(mut cx: RenderContext<'_>) -> Fragment {
    let children = cx.take_children().into_iter().map(|child| match child {
        Fragment::Text(text) => pipe(text),
        other => other,
    });
    Fragment::element("tr").children(children)
}

fn render_table(mut cx: RenderContext<'_>) -> RenderResult {
    let rows = cx
        .node
        .child_nodes()
        .filter(|n| matches!(n.kind.as_str(), TABLE_HEADER | TABLE_DELIMITER | TABLE_ROW))
        .count();
    if rows < MIN_TABLE_ROWS {
        return Err(RenderError::malformed(
            TABLE,
            format!("expected at least {MIN_TABLE_ROWS} rows, found {rows}"),
        ));
    }
    // Row separators are newlines in the source.
    let children = cx.take_children().into_iter().map(|child| match child {
        Fragment::Text(text) => Fragment::element("span")
            .attr("class", "row_break")
            .decorative(text),
        other => other,
    });
    Ok(Fragment::element("table").children(children))
}
