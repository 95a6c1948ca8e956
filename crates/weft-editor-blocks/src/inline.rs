//! Inline markup: strong, emphasis, code, strikethrough and links.
//!
//! Parsing is lossless. Delimiters stay in the tree as `markup` nodes so the
//! flattened text of the result is exactly the input; unmatched delimiters
//! are plain text.

use weft_editor_core::{Content, Node};

pub const MARKUP: &str = "markup";
pub const STRONG: &str = "strong";
pub const EMPHASIS: &str = "emphasis";
pub const CODE: &str = "inline_code";
pub const STRIKETHROUGH: &str = "strikethrough";
pub const LINK: &str = "link";
pub const LINK_URL: &str = "link_url";

/// Paired delimiters, longest first so `**` wins over `*`.
const PAIRS: &[(&str, &str)] = &[
    ("**", STRONG),
    ("~~", STRIKETHROUGH),
    ("`", CODE),
    ("_", EMPHASIS),
    ("*", EMPHASIS),
];

pub fn markup(text: &str) -> Node {
    Node::new(MARKUP).text(text)
}

/// Parse `text` into a content list.
pub fn parse_inline(text: &str) -> Vec<Content> {
    let mut out = Vec::new();
    let mut plain = String::new();
    let mut rest = text;

    'scan: while let Some(c) = rest.chars().next() {
        if c == '[' {
            if let Some((node, len)) = parse_link(rest) {
                flush(&mut plain, &mut out);
                out.push(Content::Node(node.into()));
                rest = &rest[len..];
                continue;
            }
        }
        for (delim, kind) in PAIRS {
            if let Some((node, len)) = parse_pair(rest, delim, kind) {
                flush(&mut plain, &mut out);
                out.push(Content::Node(node.into()));
                rest = &rest[len..];
                continue 'scan;
            }
        }
        plain.push(c);
        rest = &rest[c.len_utf8()..];
    }
    flush(&mut plain, &mut out);
    out
}

fn flush(plain: &mut String, out: &mut Vec<Content>) {
    if !plain.is_empty() {
        out.push(Content::Text(std::mem::take(plain).into()));
    }
}

/// `delim inner delim` at the start of `text`. Returns the node and the
/// byte length consumed.
fn parse_pair(text: &str, delim: &str, kind: &str) -> Option<(Node, usize)> {
    let after = text.strip_prefix(delim)?;
    // `*` must not match the first half of `**`.
    if delim.len() == 1 && after.starts_with(delim) {
        return None;
    }
    let close = find_closing(after, delim)?;
    let inner = &after[..close];
    if inner.is_empty() || inner.starts_with(' ') {
        return None;
    }

    let mut node = Node::new(kind).child(markup(delim));
    if kind == CODE {
        node = node.text(inner);
    } else {
        node.content.extend(parse_inline(inner));
    }
    node = node.child(markup(delim));
    Some((node, delim.len() * 2 + inner.len()))
}

fn find_closing(text: &str, delim: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(found) = text[from..].find(delim) {
        let at = from + found;
        let doubled = delim.len() == 1 && text[at + 1..].starts_with(delim);
        if !doubled {
            return Some(at);
        }
        from = at + 2;
        if from > text.len() {
            return None;
        }
    }
    None
}

/// `[label](url)` at the start of `text`.
fn parse_link(text: &str) -> Option<(Node, usize)> {
    let after = text.strip_prefix('[')?;
    let label_end = after.find("](")?;
    let label = &after[..label_end];
    let url_start = label_end + 2;
    let url_len = after[url_start..].find(')')?;
    let url = &after[url_start..url_start + url_len];
    if label.is_empty() || url.is_empty() || url.contains(' ') {
        return None;
    }

    let mut node = Node::new(LINK).with_href(url).child(markup("["));
    node.content.extend(parse_inline(label));
    node = node
        .child(markup("]("))
        .child(Node::new(LINK_URL).text(url))
        .child(markup(")"));
    Some((node, 1 + url_start + url_len + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_editor_core::flattened_text;

    fn flat(text: &str) -> String {
        let node = Node {
            content: parse_inline(text),
            ..Node::new("paragraph")
        };
        flattened_text(&node)
    }

    fn kinds(text: &str) -> Vec<String> {
        parse_inline(text)
            .iter()
            .map(|c| match c {
                Content::Text(t) => format!("text:{t}"),
                Content::Node(n) => n.kind.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_parsing_is_lossless() {
        for text in [
            "plain",
            "a **b** c",
            "**unclosed",
            "x _y_ and *z*",
            "`co*de*` ~~gone~~",
            "see [docs](https://example.com) now",
            "[broken](no close",
            "***",
            "",
        ] {
            assert_eq!(flat(text), text);
        }
    }

    #[test]
    fn test_recognized_spans() {
        assert_eq!(kinds("a **b** c"), vec!["text:a ", STRONG, "text: c"]);
        assert_eq!(kinds("*x*"), vec![EMPHASIS]);
        assert_eq!(kinds("~~x~~`y`"), vec![STRIKETHROUGH, CODE]);
        assert_eq!(kinds("**"), vec!["text:**"]);
    }

    #[test]
    fn test_code_content_is_not_parsed() {
        let content = parse_inline("`**x**`");
        let Content::Node(code) = &content[0] else {
            panic!("expected a node");
        };
        assert_eq!(code.kind, CODE);
        assert!(code.content.iter().any(|c| matches!(c, Content::Text(t) if t == "**x**")));
    }

    #[test]
    fn test_link_keeps_href() {
        let content = parse_inline("[a](b)");
        let Content::Node(link) = &content[0] else {
            panic!("expected a node");
        };
        assert_eq!(link.kind, LINK);
        assert_eq!(link.href.as_deref(), Some("b"));
    }
}
