//! The rendered view: an arena of element and text nodes.
//!
//! The root element's children are the rendered blocks, one per document
//! block and in document order. Nodes are addressed by generational
//! [`ViewId`]s so a handle to a removed subtree never aliases a newer node.
//!
//! Structural changes go through the reconciler primitives
//! (`insert_subtree`, `replace_subtree`, `move_subtree`, `remove_subtree`).
//! The platform may additionally edit text in place through `set_text` and
//! `set_decorative_text`; everything else is owned by the reconciler.

use std::fmt::Write as _;

use smol_str::SmolStr;

/// Handle to a node in a [`ViewTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewId {
    index: u32,
    generation: u32,
}

/// A point in the view: a node plus an offset.
///
/// For text nodes the offset is a char offset into the text. For elements
/// it is a child index, as with DOM boundary points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewPoint {
    pub node: ViewId,
    pub offset: usize,
}

impl ViewPoint {
    pub fn new(node: ViewId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// Metadata the reconciler stamps on every block root.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlockMeta {
    pub kind: SmolStr,
    pub prefix: Option<SmolStr>,
    pub suffix: Option<SmolStr>,
    /// Set when the block failed to render and shows a placeholder.
    pub placeholder: bool,
}

impl BlockMeta {
    pub fn prefix_len(&self) -> usize {
        self.prefix.as_ref().map_or(0, |p| p.chars().count())
    }

    pub fn suffix_len(&self) -> usize {
        self.suffix.as_ref().map_or(0, |s| s.chars().count())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: SmolStr,
    pub attrs: Vec<(SmolStr, SmolStr)>,
    /// Model text this element stands for. Such elements are leaves for
    /// offset arithmetic and their children are never inspected.
    pub decorative_text: Option<SmolStr>,
    pub editable: bool,
    pub meta: Option<BlockMeta>,
}

impl Element {
    pub fn new(tag: impl Into<SmolStr>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            decorative_text: None,
            editable: true,
            meta: None,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_decorative(&self) -> bool {
        self.decorative_text.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewData {
    Element(Element),
    Text(SmolStr),
}

/// Detached render output, materialized into the tree by the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Element {
        element: Element,
        children: Vec<Fragment>,
    },
    Text(SmolStr),
}

impl Fragment {
    pub fn element(tag: impl Into<SmolStr>) -> Self {
        Fragment::Element {
            element: Element::new(tag),
            children: Vec::new(),
        }
    }

    pub fn text(text: impl Into<SmolStr>) -> Self {
        Fragment::Text(text.into())
    }

    /// Set an attribute. No-op on text fragments.
    pub fn attr(mut self, name: impl Into<SmolStr>, value: impl Into<SmolStr>) -> Self {
        if let Fragment::Element { element, .. } = &mut self {
            element.attrs.push((name.into(), value.into()));
        }
        self
    }

    pub fn child(mut self, child: Fragment) -> Self {
        if let Fragment::Element { children, .. } = &mut self {
            children.push(child);
        }
        self
    }

    pub fn children(mut self, more: impl IntoIterator<Item = Fragment>) -> Self {
        if let Fragment::Element { children, .. } = &mut self {
            children.extend(more);
        }
        self
    }

    /// Mark as a decorative leaf standing for `text`.
    pub fn decorative(mut self, text: impl Into<SmolStr>) -> Self {
        if let Fragment::Element { element, .. } = &mut self {
            element.decorative_text = Some(text.into());
        }
        self
    }

    pub fn non_editable(mut self) -> Self {
        if let Fragment::Element { element, .. } = &mut self {
            element.editable = false;
        }
        self
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            Fragment::Element { element, .. } => Some(element.tag.as_str()),
            Fragment::Text(_) => None,
        }
    }

    pub(crate) fn set_meta(&mut self, meta: BlockMeta) {
        if let Fragment::Element { element, .. } = self {
            element.meta = Some(meta);
        }
    }
}

/// How `replace_subtree` treats the existing subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceMode {
    /// Drop the old subtree and materialize the fragment in its place.
    Rebuild,
    /// Patch the old subtree in place, keeping nodes whose tags match.
    Morph,
}

/// Leaf of a subtree for offset arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Leaf {
    pub id: ViewId,
    /// Char length of the leaf's text.
    pub len: usize,
    pub decorative: bool,
}

#[derive(Debug)]
struct ViewNode {
    data: ViewData,
    parent: Option<ViewId>,
    children: Vec<ViewId>,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<ViewNode>,
}

/// Arena-backed view tree.
#[derive(Debug)]
pub struct ViewTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: ViewId,
}

impl Default for ViewTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewTree {
    /// Create a tree holding only an empty root element.
    pub fn new() -> Self {
        let mut tree = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: ViewId {
                index: 0,
                generation: 0,
            },
        };
        tree.root = tree.alloc(ViewData::Element(Element::new("div")));
        tree
    }

    pub fn root(&self) -> ViewId {
        self.root
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn alloc(&mut self, data: ViewData) -> ViewId {
        let node = ViewNode {
            data,
            parent: None,
            children: Vec::new(),
        };
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.node = Some(node);
                ViewId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                ViewId {
                    index,
                    generation: 0,
                }
            }
        }
    }

    fn node(&self, id: ViewId) -> Option<&ViewNode> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_ref())
    }

    fn node_mut(&mut self, id: ViewId) -> Option<&mut ViewNode> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_mut())
    }

    pub fn is_alive(&self, id: ViewId) -> bool {
        self.node(id).is_some()
    }

    pub fn data(&self, id: ViewId) -> Option<&ViewData> {
        self.node(id).map(|n| &n.data)
    }

    pub fn element(&self, id: ViewId) -> Option<&Element> {
        match self.data(id)? {
            ViewData::Element(el) => Some(el),
            ViewData::Text(_) => None,
        }
    }

    pub fn text(&self, id: ViewId) -> Option<&str> {
        match self.data(id)? {
            ViewData::Text(t) => Some(t.as_str()),
            ViewData::Element(_) => None,
        }
    }

    pub fn block_meta(&self, id: ViewId) -> Option<&BlockMeta> {
        self.element(id).and_then(|el| el.meta.as_ref())
    }

    pub fn parent(&self, id: ViewId) -> Option<ViewId> {
        self.node(id).and_then(|n| n.parent)
    }

    /// Children of `id`; empty for text nodes and stale handles.
    pub fn children(&self, id: ViewId) -> &[ViewId] {
        self.node(id).map_or(&[], |n| n.children.as_slice())
    }

    pub fn index_in_parent(&self, id: ViewId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    /// Whether `node` is `ancestor` or lies beneath it.
    pub fn contains(&self, ancestor: ViewId, node: ViewId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if !self.is_alive(id) {
                return false;
            }
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Index of the root child (rendered block) containing `node`.
    ///
    /// `None` for the root itself and for nodes outside the tree.
    pub fn block_index_of(&self, node: ViewId) -> Option<usize> {
        let mut current = node;
        loop {
            let parent = self.parent(current)?;
            if parent == self.root {
                return self.index_in_parent(current);
            }
            current = parent;
        }
    }

    /// Pre-order walk of `root`'s subtree that does not descend into
    /// decorative elements.
    pub fn walk(&self, root: ViewId) -> Walk<'_> {
        let stack = if self.is_alive(root) { vec![root] } else { Vec::new() };
        Walk { tree: self, stack }
    }

    /// Leaves of `root`'s subtree in document order: text nodes and
    /// decorative elements.
    pub fn leaves(&self, root: ViewId) -> impl Iterator<Item = Leaf> + '_ {
        self.walk(root).filter_map(move |id| self.leaf(id))
    }

    /// Leaf information for `id`, if it is a leaf.
    pub fn leaf(&self, id: ViewId) -> Option<Leaf> {
        match self.data(id)? {
            ViewData::Text(t) => Some(Leaf {
                id,
                len: t.chars().count(),
                decorative: false,
            }),
            ViewData::Element(el) => el.decorative_text.as_ref().map(|t| Leaf {
                id,
                len: t.chars().count(),
                decorative: true,
            }),
        }
    }

    fn materialize(&mut self, fragment: Fragment) -> ViewId {
        match fragment {
            Fragment::Text(text) => self.alloc(ViewData::Text(text)),
            Fragment::Element { element, children } => {
                let id = self.alloc(ViewData::Element(element));
                for child in children {
                    let child_id = self.materialize(child);
                    self.attach(id, usize::MAX, child_id);
                }
                id
            }
        }
    }

    /// Attach a detached node under `parent` at `index` (clamped).
    fn attach(&mut self, parent: ViewId, index: usize, child: ViewId) {
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(p) = self.node_mut(parent) {
            let at = index.min(p.children.len());
            p.children.insert(at, child);
        }
    }

    fn detach(&mut self, id: ViewId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(p) = self.node_mut(parent) {
            p.children.retain(|c| *c != id);
        }
        if let Some(node) = self.node_mut(id) {
            node.parent = None;
        }
    }

    fn free_subtree(&mut self, id: ViewId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(slot) = self.slots.get_mut(current.index as usize) else {
                continue;
            };
            if slot.generation != current.generation {
                continue;
            }
            if let Some(node) = slot.node.take() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(current.index);
                stack.extend(node.children);
            }
        }
    }

    /// Materialize `fragment` as the `index`-th child of `parent`.
    pub fn insert_subtree(&mut self, parent: ViewId, index: usize, fragment: Fragment) -> ViewId {
        let id = self.materialize(fragment);
        self.attach(parent, index, id);
        id
    }

    /// Replace `target`'s subtree with `fragment`. Returns the id of the
    /// resulting subtree root, which is `target` itself when a morph keeps it.
    pub fn replace_subtree(&mut self, target: ViewId, fragment: Fragment, mode: ReplaceMode) -> ViewId {
        match mode {
            ReplaceMode::Rebuild => self.rebuild(target, fragment),
            ReplaceMode::Morph => self.morph(target, fragment),
        }
    }

    fn rebuild(&mut self, target: ViewId, fragment: Fragment) -> ViewId {
        let parent = self.parent(target);
        let index = self.index_in_parent(target);
        let id = self.materialize(fragment);
        if let (Some(parent), Some(index)) = (parent, index) {
            self.detach(target);
            self.attach(parent, index, id);
        }
        self.free_subtree(target);
        id
    }

    fn morph(&mut self, target: ViewId, fragment: Fragment) -> ViewId {
        let compatible = match (self.data(target), &fragment) {
            (Some(ViewData::Text(_)), Fragment::Text(_)) => true,
            (Some(ViewData::Element(old)), Fragment::Element { element, .. }) => {
                old.tag == element.tag
            }
            _ => false,
        };
        if !compatible {
            return self.rebuild(target, fragment);
        }

        match fragment {
            Fragment::Text(text) => {
                if let Some(node) = self.node_mut(target) {
                    if node.data != ViewData::Text(text.clone()) {
                        node.data = ViewData::Text(text);
                    }
                }
            }
            Fragment::Element { element, children } => {
                if let Some(node) = self.node_mut(target) {
                    node.data = ViewData::Element(element);
                }
                let existing = self.children(target).to_vec();
                let mut incoming = children.into_iter();
                for old in existing.iter().copied() {
                    match incoming.next() {
                        Some(frag) => {
                            self.morph(old, frag);
                        }
                        None => {
                            self.detach(old);
                            self.free_subtree(old);
                        }
                    }
                }
                for frag in incoming {
                    let id = self.materialize(frag);
                    self.attach(target, usize::MAX, id);
                }
            }
        }
        target
    }

    /// Move an attached subtree to be the `index`-th child of `parent`.
    ///
    /// `index` is interpreted after the node has been detached.
    pub fn move_subtree(&mut self, node: ViewId, parent: ViewId, index: usize) {
        if !self.is_alive(node) || !self.is_alive(parent) || self.contains(node, parent) {
            return;
        }
        self.detach(node);
        self.attach(parent, index, node);
    }

    /// Detach and free a subtree.
    pub fn remove_subtree(&mut self, node: ViewId) {
        if node == self.root {
            return;
        }
        self.detach(node);
        self.free_subtree(node);
    }

    /// Replace a text node's content. Returns false if `id` is not a live
    /// text node.
    pub fn set_text(&mut self, id: ViewId, text: impl Into<SmolStr>) -> bool {
        match self.node_mut(id) {
            Some(ViewNode {
                data: ViewData::Text(t),
                ..
            }) => {
                *t = text.into();
                true
            }
            _ => false,
        }
    }

    /// Replace the decorative text of an element. Returns false if `id` is
    /// not a live decorative element.
    pub fn set_decorative_text(&mut self, id: ViewId, text: impl Into<SmolStr>) -> bool {
        match self.node_mut(id) {
            Some(ViewNode {
                data: ViewData::Element(el),
                ..
            }) if el.decorative_text.is_some() => {
                el.decorative_text = Some(text.into());
                true
            }
            _ => false,
        }
    }

    /// Indented outline of a subtree, for logs and snapshots.
    pub fn dump(&self, root: ViewId) -> String {
        let mut out = String::new();
        self.dump_into(root, 0, &mut out);
        out
    }

    fn dump_into(&self, id: ViewId, depth: usize, out: &mut String) {
        let indent = "  ".repeat(depth);
        match self.data(id) {
            Some(ViewData::Text(t)) => {
                let _ = writeln!(out, "{indent}{:?}", t.as_str());
            }
            Some(ViewData::Element(el)) => {
                let _ = write!(out, "{indent}<{}", el.tag);
                if let Some(meta) = &el.meta {
                    let _ = write!(out, " kind={}", meta.kind);
                    if let Some(prefix) = &meta.prefix {
                        let _ = write!(out, " prefix={:?}", prefix.as_str());
                    }
                    if meta.placeholder {
                        let _ = write!(out, " placeholder");
                    }
                }
                for (k, v) in &el.attrs {
                    let _ = write!(out, " {k}={v:?}");
                }
                if let Some(text) = &el.decorative_text {
                    let _ = write!(out, " decorative={:?}", text.as_str());
                }
                if !el.editable {
                    let _ = write!(out, " readonly");
                }
                let _ = writeln!(out, ">");
                for child in self.children(id) {
                    self.dump_into(*child, depth + 1, out);
                }
            }
            None => {}
        }
    }
}

/// Iterator returned by [`ViewTree::walk`].
pub struct Walk<'a> {
    tree: &'a ViewTree,
    stack: Vec<ViewId>,
}

impl Iterator for Walk<'_> {
    type Item = ViewId;

    fn next(&mut self) -> Option<ViewId> {
        let id = self.stack.pop()?;
        let descend = match self.tree.data(id) {
            Some(ViewData::Element(el)) => !el.is_decorative(),
            _ => false,
        };
        if descend {
            self.stack
                .extend(self.tree.children(id).iter().rev().copied());
        }
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraph(text: &str) -> Fragment {
        Fragment::element("p").child(Fragment::text(text))
    }

    #[test]
    fn test_insert_and_walk() {
        let mut tree = ViewTree::new();
        let root = tree.root();
        let p = tree.insert_subtree(
            root,
            0,
            Fragment::element("p")
                .child(Fragment::text("a"))
                .child(Fragment::element("input").decorative("[x]").child(Fragment::text("hidden")))
                .child(Fragment::text("b")),
        );
        let leaves: Vec<_> = tree.leaves(p).map(|l| (l.len, l.decorative)).collect();
        assert_eq!(leaves, vec![(1, false), (3, true), (1, false)]);
        assert_eq!(tree.block_index_of(tree.children(p)[0]), Some(0));
        assert_eq!(tree.block_index_of(root), None);
    }

    #[test]
    fn test_remove_invalidates_handles() {
        let mut tree = ViewTree::new();
        let root = tree.root();
        let p = tree.insert_subtree(root, 0, paragraph("x"));
        let text = tree.children(p)[0];
        tree.remove_subtree(p);
        assert!(!tree.is_alive(p));
        assert!(!tree.is_alive(text));

        // Slot reuse must not revive the stale handle.
        let q = tree.insert_subtree(root, 0, paragraph("y"));
        assert!(tree.is_alive(q));
        assert!(!tree.is_alive(p));
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_move_subtree_reorders() {
        let mut tree = ViewTree::new();
        let root = tree.root();
        let a = tree.insert_subtree(root, 0, paragraph("a"));
        let b = tree.insert_subtree(root, 1, paragraph("b"));
        let c = tree.insert_subtree(root, 2, paragraph("c"));
        tree.move_subtree(c, root, 0);
        assert_eq!(tree.children(root), &[c, a, b]);
        tree.move_subtree(c, root, 2);
        assert_eq!(tree.children(root), &[a, b, c]);
    }

    #[test]
    fn test_morph_keeps_matching_nodes() {
        let mut tree = ViewTree::new();
        let root = tree.root();
        let p = tree.insert_subtree(root, 0, paragraph("old"));
        let text = tree.children(p)[0];

        let kept = tree.replace_subtree(p, paragraph("new"), ReplaceMode::Morph);
        assert_eq!(kept, p);
        assert_eq!(tree.children(p), &[text]);
        assert_eq!(tree.text(text), Some("new"));
    }

    #[test]
    fn test_morph_with_different_tag_rebuilds() {
        let mut tree = ViewTree::new();
        let root = tree.root();
        let p = tree.insert_subtree(root, 0, paragraph("old"));
        let h = tree.replace_subtree(
            p,
            Fragment::element("h1").child(Fragment::text("new")),
            ReplaceMode::Morph,
        );
        assert_ne!(h, p);
        assert!(!tree.is_alive(p));
        assert_eq!(tree.children(root), &[h]);
    }

    #[test]
    fn test_morph_trims_and_extends_children() {
        let mut tree = ViewTree::new();
        let root = tree.root();
        let p = tree.insert_subtree(
            root,
            0,
            Fragment::element("p")
                .child(Fragment::text("a"))
                .child(Fragment::text("b")),
        );
        tree.replace_subtree(p, paragraph("z"), ReplaceMode::Morph);
        assert_eq!(tree.children(p).len(), 1);

        tree.replace_subtree(
            p,
            Fragment::element("p")
                .child(Fragment::text("1"))
                .child(Fragment::element("em").child(Fragment::text("2"))),
            ReplaceMode::Morph,
        );
        assert_eq!(tree.children(p).len(), 2);
        let text: String = tree
            .leaves(p)
            .filter_map(|l| tree.text(l.id).map(str::to_owned))
            .collect();
        assert_eq!(text, "12");
    }

    #[test]
    fn test_native_edits_only_touch_matching_nodes() {
        let mut tree = ViewTree::new();
        let root = tree.root();
        let p = tree.insert_subtree(root, 0, paragraph("a"));
        let text = tree.children(p)[0];
        assert!(tree.set_text(text, "ab"));
        assert!(!tree.set_text(p, "ab"));
        assert!(!tree.set_decorative_text(p, "x"));
        assert_eq!(tree.text(text), Some("ab"));
    }
}
