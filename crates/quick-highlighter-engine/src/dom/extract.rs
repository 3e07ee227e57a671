//! Detaching the content of a range from the tree.
//!
//! Extraction works in three steps. Boundaries inside text nodes are turned
//! into positions between siblings by splitting the text. Each position is
//! then lifted to the common ancestor, cloning any partially selected element
//! into two halves on the way up. Finally the children of the common ancestor
//! between the two lifted positions are detached. Every step preserves the
//! flattened text of the document.

use super::{BoundaryPoint, Document, DomError, NodeId, NodeKind, Range};

/// Content detached by [`Document::extract_contents`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    /// Detached top-level nodes, in document order.
    pub nodes: Vec<NodeId>,
    /// Container the content was removed from.
    pub parent: NodeId,
    /// Sibling now following the removed content; `None` means end of `parent`.
    pub before: Option<NodeId>,
}

/// A gap between siblings: directly before `before`, or at the end of `parent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Position {
    parent: NodeId,
    before: Option<NodeId>,
}

enum Boundary {
    InText(NodeId, usize),
    Between(Position),
}

impl Document {
    /// Detaches everything the range selects and returns it as a fragment,
    /// together with the position it was removed from.
    ///
    /// Marks and remove buttons are never split: a range that starts or ends
    /// inside one without containing it whole fails with
    /// [`DomError::Unsplittable`] before anything is mutated.
    pub fn extract_contents(&mut self, range: &Range) -> Result<Extracted, DomError> {
        self.range(range.start, range.end)?;
        let ancestor = self
            .common_ancestor(range)
            .ok_or(DomError::Detached(range.start.node))?;
        self.ensure_splittable(range.start, ancestor)?;
        self.ensure_splittable(range.end, ancestor)?;

        // Child-index boundaries are resolved to sibling references before any
        // text split shifts the indices. The end is settled first so a shared
        // text node is split back to front.
        let start = self.boundary(range.start);
        let end = self.boundary(range.end);
        let end = self.settle(end)?;
        let start = self.settle(start)?;

        let ancestor = self
            .lowest_common_ancestor(start.parent, end.parent)
            .ok_or(DomError::Detached(start.parent))?;
        let start = self.lift(start, ancestor)?;
        let end = self.lift(end, ancestor)?;

        let children = self.children(ancestor);
        let index_of = |position: Position| match position.before {
            Some(node) => children.iter().position(|c| *c == node),
            None => Some(children.len()),
        };
        let from = index_of(start).ok_or(DomError::Detached(ancestor))?;
        let to = index_of(end).ok_or(DomError::Detached(ancestor))?;
        let nodes = children[from..to.max(from)].to_vec();

        for node in &nodes {
            self.detach(*node);
        }
        Ok(Extracted {
            nodes,
            parent: ancestor,
            before: end.before,
        })
    }

    fn ensure_splittable(&self, point: BoundaryPoint, ancestor: NodeId) -> Result<(), DomError> {
        let ancestor = match self.kind(ancestor) {
            NodeKind::Text(_) => self.parent(ancestor).unwrap_or(ancestor),
            _ => ancestor,
        };
        match self
            .ancestors(point.node)
            .take_while(|n| *n != ancestor)
            .find(|n| {
                let kind = self.kind(*n);
                !kind.is_text() && !kind.is_splittable()
            }) {
            Some(node) => Err(DomError::Unsplittable(node)),
            None => Ok(()),
        }
    }

    fn boundary(&self, point: BoundaryPoint) -> Boundary {
        match self.kind(point.node) {
            NodeKind::Text(_) => Boundary::InText(point.node, point.offset),
            _ => Boundary::Between(Position {
                parent: point.node,
                before: self.children(point.node).get(point.offset).copied(),
            }),
        }
    }

    fn settle(&mut self, boundary: Boundary) -> Result<Position, DomError> {
        let (text, offset) = match boundary {
            Boundary::Between(position) => return Ok(position),
            Boundary::InText(text, offset) => (text, offset),
        };
        let parent = self.parent(text).ok_or(DomError::Detached(text))?;
        let before = if offset == 0 {
            Some(text)
        } else if offset >= self.node_length(text) {
            self.next_sibling(text)
        } else {
            Some(self.split_text(text, offset)?)
        };
        Ok(Position { parent, before })
    }

    /// Re-expresses `position` as a gap among the children of `ancestor`,
    /// splitting every element it passes through mid-way.
    fn lift(&mut self, mut position: Position, ancestor: NodeId) -> Result<Position, DomError> {
        while position.parent != ancestor {
            let element = position.parent;
            let parent = self.parent(element).ok_or(DomError::Detached(element))?;
            position = match position.before {
                None => Position {
                    parent,
                    before: self.next_sibling(element),
                },
                Some(first) if self.children(element).first() == Some(&first) => Position {
                    parent,
                    before: Some(element),
                },
                Some(split_at) => Position {
                    parent,
                    before: Some(self.split_element(element, split_at)?),
                },
            };
        }
        Ok(position)
    }

    /// Moves `split_at` and its following siblings into a shallow clone of
    /// `element` inserted right after it. Returns the clone.
    fn split_element(&mut self, element: NodeId, split_at: NodeId) -> Result<NodeId, DomError> {
        let kind = self.kind(element).clone();
        if !kind.is_splittable() {
            return Err(DomError::Unsplittable(element));
        }
        let index = self.index_in_parent(split_at).ok_or(DomError::NotAChild {
            parent: element,
            child: split_at,
        })?;
        let parent = self.parent(element).ok_or(DomError::Detached(element))?;

        let clone = self.alloc(kind);
        let moved = self.nodes[element.0].children.split_off(index);
        for node in &moved {
            self.nodes[node.0].parent = Some(clone);
        }
        self.nodes[clone.0].children = moved;

        let next = self.next_sibling(element);
        self.insert_before(parent, clone, next)?;
        Ok(clone)
    }
}
