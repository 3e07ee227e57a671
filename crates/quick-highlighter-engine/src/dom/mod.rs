//! Arena-backed document tree.
//!
//! Every node lives in a single `Vec` owned by [`Document`] and is addressed by
//! a copyable [`NodeId`]. A node owns its ordered list of children; the
//! `parent` field is a lookup-only back-reference that the mutation methods
//! keep in sync. Detaching a node keeps its arena slot, so a detached subtree
//! can be inspected or re-attached later.
//!
//! Offsets into text nodes count `char`s. Offsets into containers count
//! children. This mirrors the boundary-point model of a browser DOM range.

use std::collections::BTreeMap;

use crate::overlay::{HIGHLIGHT_STYLES, HIGHLIGHT_STYLES_ID, HighlightVariant};

mod extract;
pub mod range;
mod serialize;

pub use extract::Extracted;
pub use range::{Affinity, BoundaryPoint, Range, Selection};

/// Stable handle to a node inside one [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Arena slot of this node.
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Structural element such as `p`, `em` or `li`.
    Element {
        tag: String,
        attrs: BTreeMap<String, String>,
    },
    Text(String),
    /// Highlight overlay wrapping user-selected content.
    Mark(HighlightVariant),
    /// Affordance attached to a mark; clicking it removes the mark.
    RemoveButton,
}

impl NodeKind {
    pub fn is_text(&self) -> bool {
        matches!(self, NodeKind::Text(_))
    }

    pub fn is_mark(&self) -> bool {
        matches!(self, NodeKind::Mark(_))
    }

    pub fn is_remove_button(&self) -> bool {
        matches!(self, NodeKind::RemoveButton)
    }

    /// Whether the node may hold children.
    pub fn is_container(&self) -> bool {
        matches!(self, NodeKind::Element { .. } | NodeKind::Mark(_))
    }

    /// Only plain elements may be cloned into two halves at a range boundary.
    fn is_splittable(&self) -> bool {
        matches!(self, NodeKind::Element { .. })
    }
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("node {0:?} is not attached to the document")]
    Detached(NodeId),
    #[error("offset {offset} is out of bounds for node {node:?} (length {len})")]
    OffsetOutOfBounds {
        node: NodeId,
        offset: usize,
        len: usize,
    },
    #[error("range end precedes its start")]
    Inverted,
    #[error("node {0:?} cannot be split by a range boundary")]
    Unsplittable(NodeId),
    #[error("node {0:?} cannot hold children")]
    NotAContainer(NodeId),
    #[error("node {0:?} is not a text node")]
    NotText(NodeId),
    #[error("node {child:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, child: NodeId },
    #[error("inserting {node:?} under {parent:?} would create a cycle")]
    HierarchyRequest { parent: NodeId, node: NodeId },
}

/// Stylesheet installed into the rendered page head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleSheet {
    pub id: String,
    pub css: String,
}

/// A page: a `body` root plus the identity it was loaded from.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    title: String,
    url: String,
    styles: Vec<StyleSheet>,
}

impl Document {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        let body = Node {
            kind: NodeKind::Element {
                tag: "body".to_string(),
                attrs: BTreeMap::new(),
            },
            parent: None,
            children: Vec::new(),
        };
        Self {
            nodes: vec![body],
            root: NodeId(0),
            title: title.into(),
            url: url.into(),
            styles: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Text of a text node, `None` for every other kind.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeKind::Element {
            tag: tag.to_string(),
            attrs: BTreeMap::new(),
        })
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeKind::Text(text.to_string()))
    }

    pub fn create_mark(&mut self, variant: HighlightVariant) -> NodeId {
        self.alloc(NodeKind::Mark(variant))
    }

    pub fn create_remove_button(&mut self) -> NodeId {
        self.alloc(NodeKind::RemoveButton)
    }

    /// Sets an attribute on an element; other node kinds are left untouched.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        if let NodeKind::Element { attrs, .. } = &mut self.nodes[id.0].kind {
            attrs.insert(name.to_string(), value.to_string());
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert_before(parent, child, None)
    }

    /// Moves `child` under `parent`, directly before `reference` (or last when
    /// `reference` is `None`). The child is detached from its old parent first.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        if !self.kind(parent).is_container() {
            return Err(DomError::NotAContainer(parent));
        }
        if self.ancestors(parent).any(|a| a == child) {
            return Err(DomError::HierarchyRequest {
                parent,
                node: child,
            });
        }
        let reference = if reference == Some(child) {
            self.next_sibling(child)
        } else {
            reference
        };
        if let Some(r) = reference
            && self.parent(r) != Some(parent)
        {
            return Err(DomError::NotAChild { parent, child: r });
        }

        self.detach(child);
        let index = match reference {
            Some(r) => self
                .index_in_parent(r)
                .ok_or(DomError::NotAChild { parent, child: r })?,
            None => self.nodes[parent.0].children.len(),
        };
        self.nodes[parent.0].children.insert(index, child);
        self.nodes[child.0].parent = Some(parent);
        Ok(())
    }

    /// Removes the node from its parent. Detached nodes are left as they are.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        index
            .checked_sub(1)
            .and_then(|i| self.children(parent).get(i).copied())
    }

    /// The node itself followed by each of its ancestors up to the top of its tree.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), move |n| self.parent(*n))
    }

    /// Whether the node is reachable from the document root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.ancestors(id).last() == Some(self.root)
    }

    pub(crate) fn ensure_attached(&self, id: NodeId) -> Result<(), DomError> {
        if self.is_attached(id) {
            Ok(())
        } else {
            Err(DomError::Detached(id))
        }
    }

    /// Nearest mark containing `id`, including `id` itself.
    pub fn closest_mark(&self, id: NodeId) -> Option<NodeId> {
        self.ancestors(id).find(|n| self.kind(*n).is_mark())
    }

    pub fn lowest_common_ancestor(&self, a: NodeId, b: NodeId) -> Option<NodeId> {
        let lineage: Vec<NodeId> = self.ancestors(a).collect();
        self.ancestors(b).find(|n| lineage.contains(n))
    }

    /// Pre-order walk of the subtree rooted at `id`, `id` included.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Boundary-point length: chars for text nodes, child count otherwise.
    pub fn node_length(&self, id: NodeId) -> usize {
        match self.kind(id) {
            NodeKind::Text(text) => text.chars().count(),
            _ => self.children(id).len(),
        }
    }

    /// Length in chars of the flattened text of the subtree.
    pub fn text_len(&self, id: NodeId) -> usize {
        match self.kind(id) {
            NodeKind::Text(text) => text.chars().count(),
            NodeKind::RemoveButton => 0,
            _ => self.children(id).iter().map(|c| self.text_len(*c)).sum(),
        }
    }

    /// Flattened text of the subtree. Remove buttons contribute nothing.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::RemoveButton => {}
            _ => {
                for child in self.children(id) {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    /// Splits a text node at a char offset. The original node keeps the head;
    /// the returned node holds the tail and, when the original is attached,
    /// is inserted directly after it.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> Result<NodeId, DomError> {
        let NodeKind::Text(text) = &mut self.nodes[id.0].kind else {
            return Err(DomError::NotText(id));
        };
        let len = text.chars().count();
        if offset > len {
            return Err(DomError::OffsetOutOfBounds {
                node: id,
                offset,
                len,
            });
        }
        let at = byte_index(text, offset);
        let tail = text.split_off(at);

        let tail = self.alloc(NodeKind::Text(tail));
        if let Some(parent) = self.parent(id) {
            let next = self.next_sibling(id);
            self.insert_before(parent, tail, next)?;
        }
        Ok(tail)
    }

    /// Appends text to `parent`, extending a trailing text child if there is one.
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> Result<(), DomError> {
        let last = self.children(parent).last().copied();
        if let Some(last) = last
            && let NodeKind::Text(existing) = &mut self.nodes[last.0].kind
        {
            existing.push_str(text);
            return Ok(());
        }
        let node = self.create_text(text);
        self.append_child(parent, node)
    }

    /// Merges adjacent text children and drops empty ones, recursively.
    /// The flattened text of the subtree is unchanged.
    pub fn normalize(&mut self, id: NodeId) {
        let children = self.nodes[id.0].children.clone();
        let mut kept: Vec<NodeId> = Vec::with_capacity(children.len());

        for child in children {
            let Some(text) = self.text(child).map(str::to_owned) else {
                self.normalize(child);
                kept.push(child);
                continue;
            };

            let previous = kept.last().copied();
            if text.is_empty() {
                self.nodes[child.0].parent = None;
            } else if let Some(previous) = previous
                && let NodeKind::Text(merged) = &mut self.nodes[previous.0].kind
            {
                merged.push_str(&text);
                self.nodes[child.0].parent = None;
            } else {
                kept.push(child);
            }
        }

        self.nodes[id.0].children = kept;
    }

    /// Position directly after `id` within its parent.
    pub fn point_after(&self, id: NodeId) -> Option<BoundaryPoint> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        Some(BoundaryPoint::new(parent, index + 1))
    }

    /// Installs the highlight stylesheet once. Returns `false` if it was
    /// already present.
    pub fn inject_styles(&mut self) -> bool {
        if self.styles.iter().any(|s| s.id == HIGHLIGHT_STYLES_ID) {
            return false;
        }
        self.styles.push(StyleSheet {
            id: HIGHLIGHT_STYLES_ID.to_string(),
            css: HIGHLIGHT_STYLES.to_string(),
        });
        true
    }

    pub fn styles(&self) -> &[StyleSheet] {
        &self.styles
    }
}

/// Byte index of the `offset`-th char, or the string length past the end.
pub(crate) fn byte_index(text: &str, offset: usize) -> usize {
    text.char_indices()
        .nth(offset)
        .map_or(text.len(), |(index, _)| index)
}
