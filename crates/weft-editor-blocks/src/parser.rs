//! Line-oriented markdown block parser.
//!
//! Every line starts a block except where a construct spans lines:
//! - fenced code runs to its closing fence, or to the end of the text
//! - a table is a header row, a delimiter row and the `|` rows after it
//!
//! Parsing is lossless: markup is kept either as a hidden block prefix
//! (heading hashes), as `markup` nodes, or as decorative text, so joining
//! the source text of the blocks with `'\n'` gives back the input.

use tracing::trace;
use weft_editor_core::{Block, BlockParser, Node};

use crate::inline::{markup, parse_inline};

pub const PARAGRAPH: &str = "paragraph";
pub const HEADING: &str = "heading";
pub const BLOCKQUOTE: &str = "blockquote";
pub const LIST_ITEM: &str = "list_item";
pub const ORDERED_ITEM: &str = "ordered_item";
pub const TODO_ITEM: &str = "todo_item";
pub const CHECKBOX: &str = "checkbox";
pub const HORIZONTAL_RULE: &str = "horizontal_rule";
pub const RULE: &str = "rule";
pub const CODE_BLOCK: &str = "code_block";
pub const CODE_FENCE: &str = "code_fence";
pub const TABLE: &str = "table";
pub const TABLE_HEADER: &str = "table_header";
pub const TABLE_DELIMITER: &str = "table_delimiter";
pub const TABLE_ROW: &str = "table_row";
pub const TABLE_CELL: &str = "table_cell";
pub const TABLE_PIPE: &str = "table_pipe";

pub const UNCHECKED: &str = "- [ ]";
pub const CHECKED: &str = "- [x]";

/// Markdown block grammar for the editor.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownParser;

impl MarkdownParser {
    pub fn new() -> Self {
        Self
    }
}

impl BlockParser for MarkdownParser {
    fn parse<'a>(&'a self, text: &'a str) -> Box<dyn Iterator<Item = Block> + 'a> {
        Box::new(Blocks {
            lines: text.split('\n').collect(),
            next: 0,
        })
    }
}

/// Lazily yields the blocks of a text.
struct Blocks<'a> {
    lines: Vec<&'a str>,
    next: usize,
}

impl Iterator for Blocks<'_> {
    type Item = Block;

    fn next(&mut self) -> Option<Block> {
        let start = self.next;
        let line = *self.lines.get(start)?;

        let (node, consumed) = if is_fence(line) {
            code_block(&self.lines[start..])
        } else if let Some((node, consumed)) = table(&self.lines[start..]) {
            (node, consumed)
        } else {
            (line_block(line), 1)
        };
        self.next = start + consumed;
        trace!(target: "weft::parse", kind = %node.kind, line = start, lines = consumed, "block");
        Some(node.into_block())
    }
}

fn line_block(line: &str) -> Node {
    if line.is_empty() {
        return Node::new(PARAGRAPH);
    }
    if let Some((prefix, rest)) = heading_prefix(line) {
        return inline_node(Node::new(HEADING).with_prefix(prefix), rest);
    }
    if is_rule(line) {
        return Node::new(HORIZONTAL_RULE).child(Node::new(RULE).with_decorative_text(line));
    }
    if let Some(rest) = line.strip_prefix("> ") {
        return inline_node(Node::new(BLOCKQUOTE).child(markup("> ")), rest);
    }
    for mark in [UNCHECKED, CHECKED] {
        if let Some(rest) = line.strip_prefix(mark).and_then(|r| r.strip_prefix(' ')) {
            let node = Node::new(TODO_ITEM)
                .child(Node::new(CHECKBOX).with_decorative_text(mark))
                .text(" ");
            return inline_node(node, rest);
        }
    }
    for bullet in ["- ", "* ", "+ "] {
        if let Some(rest) = line.strip_prefix(bullet) {
            return inline_node(Node::new(LIST_ITEM).child(markup(bullet)), rest);
        }
    }
    if let Some(marker) = ordered_marker(line) {
        let rest = &line[marker.len()..];
        return inline_node(Node::new(ORDERED_ITEM).child(markup(marker)), rest);
    }
    inline_node(Node::new(PARAGRAPH), line)
}

fn inline_node(mut node: Node, text: &str) -> Node {
    node.content.extend(parse_inline(text));
    node
}

/// `#` to `######` followed by a space.
fn heading_prefix(line: &str) -> Option<(&str, &str)> {
    let hashes = line.bytes().take_while(|&b| b == b'#').count();
    if !(1..=6).contains(&hashes) || line.as_bytes().get(hashes) != Some(&b' ') {
        return None;
    }
    Some(line.split_at(hashes + 1))
}

/// Heading level from a heading prefix.
pub fn heading_level(prefix: &str) -> usize {
    prefix.bytes().take_while(|&b| b == b'#').count().clamp(1, 6)
}

fn is_rule(line: &str) -> bool {
    let trimmed = line.trim_end();
    let Some(first) = trimmed.chars().next() else {
        return false;
    };
    matches!(first, '-' | '*' | '_') && trimmed.len() >= 3 && trimmed.chars().all(|c| c == first)
}

/// `1. ` style marker at the start of the line.
fn ordered_marker(line: &str) -> Option<&str> {
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 || digits > 9 || !line[digits..].starts_with(". ") {
        return None;
    }
    Some(&line[..digits + 2])
}

fn is_fence(line: &str) -> bool {
    line.trim_start().starts_with("```")
}

/// Language named on an opening fence, if any.
pub fn fence_language(fence: &str) -> Option<&str> {
    let info = fence.trim_start().trim_start_matches('`').trim();
    (!info.is_empty()).then_some(info)
}

/// A fenced code block starting at `lines[0]`. Without a closing fence the
/// block runs to the end of the text.
fn code_block(lines: &[&str]) -> (Node, usize) {
    let close = lines[1..].iter().position(|l| is_fence(l)).map(|p| p + 1);
    let body_end = close.unwrap_or(lines.len());

    let mut node = Node::new(CODE_BLOCK).child(Node::new(CODE_FENCE).text(lines[0]));
    if body_end > 1 {
        node = node.text("\n").text(lines[1..body_end].join("\n"));
    }
    match close {
        Some(close) => {
            node = node
                .text("\n")
                .child(Node::new(CODE_FENCE).text(lines[close]));
            (node, close + 1)
        }
        None => (node, lines.len()),
    }
}

/// A table starting at `lines[0]`, with the number of lines it spans.
fn table(lines: &[&str]) -> Option<(Node, usize)> {
    let header = *lines.first()?;
    let delimiter = *lines.get(1)?;
    if !header.contains('|') {
        return None;
    }
    let columns = delimiter_columns(delimiter)?;
    if cell_count(header) != columns {
        return None;
    }

    let mut node = Node::new(TABLE)
        .child(table_row(TABLE_HEADER, header))
        .text("\n")
        .child(Node::new(TABLE_DELIMITER).with_decorative_text(delimiter));
    let mut consumed = 2;
    for line in &lines[2..] {
        if !line.contains('|') || line.trim().is_empty() {
            break;
        }
        node = node.text("\n").child(table_row(TABLE_ROW, line));
        consumed += 1;
    }
    Some((node, consumed))
}

/// Column count of a delimiter row such as `| --- | :-: |`.
fn delimiter_columns(line: &str) -> Option<usize> {
    let trimmed = line.trim();
    let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    if !trimmed.contains('-') || inner.is_empty() {
        return None;
    }
    let mut columns = 0;
    for cell in inner.split('|') {
        let cell = cell.trim();
        if cell.is_empty() || !cell.contains('-') || !cell.chars().all(|c| c == '-' || c == ':') {
            return None;
        }
        columns += 1;
    }
    Some(columns)
}

/// Row segments between pipes. Blank text outside the outer pipes is not a
/// cell.
fn segments(line: &str) -> impl Iterator<Item = (bool, &str)> {
    let parts: Vec<&str> = line.split('|').collect();
    let last = parts.len() - 1;
    parts.into_iter().enumerate().map(move |(i, part)| {
        let outer = (i == 0 || i == last) && part.trim().is_empty();
        (!outer, part)
    })
}

fn cell_count(line: &str) -> usize {
    segments(line).filter(|(cell, _)| *cell).count()
}

fn table_row(kind: &str, line: &str) -> Node {
    let mut row = Node::new(kind);
    for (i, (cell, part)) in segments(line).enumerate() {
        if i > 0 {
            row = row.child(Node::new(TABLE_PIPE).with_decorative_text("|"));
        }
        row = if cell {
            row.child(inline_node(Node::new(TABLE_CELL), part))
        } else {
            row.text(part)
        };
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_editor_core::{serialize, source_text};

    fn parse(text: &str) -> Vec<Block> {
        MarkdownParser.parse_all(text)
    }

    fn kinds(text: &str) -> Vec<String> {
        parse(text).iter().map(|b| b.kind.to_string()).collect()
    }

    const DOC: &str = "# Title\n\
        intro with **bold** and [a link](https://example.com)\n\
        \n\
        > quoted\n\
        - item\n\
        1. first\n\
        - [ ] open task\n\
        - [x] done task\n\
        ---\n\
        ```rust\n\
        fn main() {}\n\
        ```\n\
        | a | b |\n\
        |---|:-:|\n\
        | 1 | 2 |\n\
        tail";

    #[test]
    fn test_parse_is_lossless() {
        assert_eq!(serialize(&parse(DOC)), DOC);
        for text in ["", "\n", "```", "```\nopen", "| a |\n|---|", "#", "####### x"] {
            assert_eq!(serialize(&parse(text)), text, "{text:?}");
        }
    }

    #[test]
    fn test_block_kinds() {
        assert_eq!(
            kinds(DOC),
            vec![
                HEADING,
                PARAGRAPH,
                PARAGRAPH,
                BLOCKQUOTE,
                LIST_ITEM,
                ORDERED_ITEM,
                TODO_ITEM,
                TODO_ITEM,
                HORIZONTAL_RULE,
                CODE_BLOCK,
                TABLE,
                PARAGRAPH,
            ]
        );
    }

    #[test]
    fn test_heading_prefix_is_metadata() {
        let blocks = parse("## Sub");
        assert_eq!(blocks[0].prefix.as_deref(), Some("## "));
        assert_eq!(source_text(&blocks[0]), "## Sub");
        assert_eq!(heading_level("## "), 2);
        assert_eq!(kinds("#nospace"), vec![PARAGRAPH]);
    }

    #[test]
    fn test_unclosed_fence_runs_to_end() {
        assert_eq!(kinds("a\n```\nb\nc"), vec![PARAGRAPH, CODE_BLOCK]);
        assert_eq!(kinds("```\nb\n```\nc"), vec![CODE_BLOCK, PARAGRAPH]);
        assert_eq!(fence_language("```rust"), Some("rust"));
        assert_eq!(fence_language("```"), None);
    }

    #[test]
    fn test_table_needs_matching_delimiter() {
        assert_eq!(kinds("| a | b |\n|---|---|"), vec![TABLE]);
        assert_eq!(kinds("| a | b |\n|---|"), vec![PARAGRAPH, PARAGRAPH]);
        assert_eq!(kinds("| a |\nnot a delimiter"), vec![PARAGRAPH, PARAGRAPH]);
        // Rows stop at the first line without a pipe.
        assert_eq!(kinds("|a|\n|-|\n|1|\nafter"), vec![TABLE, PARAGRAPH]);
    }

    #[test]
    fn test_table_cells() {
        let blocks = parse("| a | b |\n|---|---|\n| 1 | 2 |");
        let rows: Vec<_> = blocks[0].child_nodes().collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].kind, TABLE_HEADER);
        assert_eq!(rows[1].kind, TABLE_DELIMITER);
        let cells = rows[2].child_nodes().filter(|n| n.kind == TABLE_CELL).count();
        assert_eq!(cells, 2);
    }

    #[test]
    fn test_checkbox_is_decorative() {
        let blocks = parse("- [x] done");
        let checkbox = blocks[0].child_nodes().next().unwrap();
        assert_eq!(checkbox.kind, CHECKBOX);
        assert_eq!(checkbox.decorative_text.as_deref(), Some(CHECKED));
        // Without the trailing space it is a plain list item.
        assert_eq!(kinds("- [x]"), vec![LIST_ITEM]);
    }

    #[test]
    fn test_rules() {
        assert_eq!(kinds("---\n***\n___\n--"), vec![
            HORIZONTAL_RULE,
            HORIZONTAL_RULE,
            HORIZONTAL_RULE,
            PARAGRAPH
        ]);
    }
}
