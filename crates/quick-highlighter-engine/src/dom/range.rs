//! Boundary points, ranges and selections over a [`Document`].

use std::cmp::Ordering;

use super::{Document, DomError, NodeId, NodeKind};

/// A position inside the tree: a char offset into a text node, or a child
/// index into a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundaryPoint {
    pub node: NodeId,
    pub offset: usize,
}

impl BoundaryPoint {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    pub start: BoundaryPoint,
    pub end: BoundaryPoint,
}

impl Range {
    /// Unchecked constructor; use [`Document::range`] to validate.
    pub fn new(start: BoundaryPoint, end: BoundaryPoint) -> Self {
        Self { start, end }
    }

    pub fn collapsed(at: BoundaryPoint) -> Self {
        Self { start: at, end: at }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

/// Which text node wins when a flattened offset falls exactly between two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affinity {
    /// Prefer the end of the earlier node; suits range ends.
    Upstream,
    /// Prefer the start of the later node; suits range starts.
    Downstream,
}

/// The user's current selection: zero or more ranges in selection order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ranges: Vec<Range>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_range(range: Range) -> Self {
        Self {
            ranges: vec![range],
        }
    }

    pub fn range_count(&self) -> usize {
        self.ranges.len()
    }

    pub fn range_at(&self, index: usize) -> Option<Range> {
        self.ranges.get(index).copied()
    }

    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    pub fn add_range(&mut self, range: Range) {
        self.ranges.push(range);
    }

    pub fn remove_all_ranges(&mut self) {
        self.ranges.clear();
    }

    /// True when nothing is selected: no ranges, or only collapsed ones.
    pub fn is_collapsed(&self) -> bool {
        self.ranges.iter().all(Range::is_collapsed)
    }

    /// Replaces the selection with a caret at the end of its last range.
    pub fn collapse_to_end(&mut self) {
        if let Some(last) = self.ranges.last().copied() {
            self.ranges = vec![Range::collapsed(last.end)];
        }
    }
}

impl Document {
    /// Sort key of a boundary point: the child-index path from the root
    /// followed by the offset. Keys compare in document order.
    pub(crate) fn tree_key(&self, point: BoundaryPoint) -> Result<Vec<usize>, DomError> {
        let len = self.node_length(point.node);
        if point.offset > len {
            return Err(DomError::OffsetOutOfBounds {
                node: point.node,
                offset: point.offset,
                len,
            });
        }

        let mut key = vec![point.offset];
        let mut current = point.node;
        while let Some(parent) = self.parent(current) {
            key.push(
                self.index_in_parent(current)
                    .ok_or(DomError::Detached(current))?,
            );
            current = parent;
        }
        if current != self.root {
            return Err(DomError::Detached(point.node));
        }
        key.reverse();
        Ok(key)
    }

    pub fn compare_points(
        &self,
        a: BoundaryPoint,
        b: BoundaryPoint,
    ) -> Result<Ordering, DomError> {
        Ok(self.tree_key(a)?.cmp(&self.tree_key(b)?))
    }

    /// Validated range: both points attached and in bounds, start not after end.
    pub fn range(&self, start: BoundaryPoint, end: BoundaryPoint) -> Result<Range, DomError> {
        match self.compare_points(start, end)? {
            Ordering::Greater => Err(DomError::Inverted),
            _ => Ok(Range::new(start, end)),
        }
    }

    /// Deepest node containing both boundary containers.
    pub fn common_ancestor(&self, range: &Range) -> Option<NodeId> {
        self.lowest_common_ancestor(range.start.node, range.end.node)
    }

    /// Number of chars of flattened document text preceding `point`.
    pub fn text_offset_of(&self, point: BoundaryPoint) -> Result<usize, DomError> {
        self.tree_key(point)?;
        let inner = match self.kind(point.node) {
            NodeKind::Text(_) => point.offset,
            _ => self.children(point.node)[..point.offset]
                .iter()
                .map(|c| self.text_len(*c))
                .sum(),
        };
        Ok(self.text_before(point.node) + inner)
    }

    fn text_before(&self, node: NodeId) -> usize {
        let mut total = 0;
        let mut current = node;
        while let Some(parent) = self.parent(current) {
            total += self
                .children(parent)
                .iter()
                .take_while(|sibling| **sibling != current)
                .map(|sibling| self.text_len(*sibling))
                .sum::<usize>();
            current = parent;
        }
        total
    }

    /// Inverse of [`Document::text_offset_of`]: the text position holding the
    /// given flattened offset. `None` when the offset is past the end.
    pub fn point_at_text_offset(&self, offset: usize, affinity: Affinity) -> Option<BoundaryPoint> {
        let mut consumed = 0;
        let mut last = None;
        for id in self.descendants(self.root) {
            if !self.kind(id).is_text() {
                continue;
            }
            let end = consumed + self.text_len(id);
            let hit = match affinity {
                Affinity::Upstream => offset <= end,
                Affinity::Downstream => offset < end,
            };
            if hit {
                return Some(BoundaryPoint::new(id, offset - consumed));
            }
            consumed = end;
            last = Some(id);
        }

        match last {
            Some(id) if offset == consumed => Some(BoundaryPoint::new(id, self.text_len(id))),
            None if offset == 0 => Some(BoundaryPoint::new(self.root, 0)),
            _ => None,
        }
    }

    /// Range covering the `occurrence`-th (zero-based) match of `quote` in
    /// the flattened document text.
    pub fn find_text(&self, quote: &str, occurrence: usize) -> Option<Range> {
        if quote.is_empty() {
            return None;
        }
        let haystack = self.text_content(self.root);
        let (byte_start, _) = haystack.match_indices(quote).nth(occurrence)?;
        let start = haystack[..byte_start].chars().count();
        let end = start + quote.chars().count();

        let start = self.point_at_text_offset(start, Affinity::Downstream)?;
        let end = self.point_at_text_offset(end, Affinity::Upstream)?;
        self.range(start, end).ok()
    }

    /// Flattened text covered by the range.
    pub fn range_text(&self, range: &Range) -> Result<String, DomError> {
        let from = self.text_offset_of(range.start)?;
        let to = self.text_offset_of(range.end)?;
        if to < from {
            return Err(DomError::Inverted);
        }
        Ok(self
            .text_content(self.root)
            .chars()
            .skip(from)
            .take(to - from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    /// `<p>the quick <em>brown</em> fox</p>`
    fn sample() -> (Document, NodeId, [NodeId; 3], NodeId) {
        let mut doc = Document::new("t", "u");
        let p = doc.create_element("p");
        doc.append_child(doc.root(), p).unwrap();
        let head = doc.create_text("the quick ");
        let em = doc.create_element("em");
        let middle = doc.create_text("brown");
        let tail = doc.create_text(" fox");
        doc.append_child(p, head).unwrap();
        doc.append_child(p, em).unwrap();
        doc.append_child(em, middle).unwrap();
        doc.append_child(p, tail).unwrap();
        (doc, p, [head, middle, tail], em)
    }

    #[test]
    fn points_compare_in_document_order() {
        let (doc, p, [head, middle, tail], em) = sample();

        let before_em = BoundaryPoint::new(p, 1);
        let inside_em = BoundaryPoint::new(middle, 2);
        let after_em = BoundaryPoint::new(p, 2);

        assert_eq!(
            doc.compare_points(BoundaryPoint::new(head, 3), before_em),
            Ok(Ordering::Less)
        );
        assert_eq!(doc.compare_points(before_em, inside_em), Ok(Ordering::Less));
        assert_eq!(
            doc.compare_points(BoundaryPoint::new(em, 0), inside_em),
            Ok(Ordering::Less)
        );
        assert_eq!(doc.compare_points(inside_em, after_em), Ok(Ordering::Less));
        assert_eq!(
            doc.compare_points(after_em, BoundaryPoint::new(tail, 0)),
            Ok(Ordering::Less)
        );
    }

    #[test]
    fn range_validation() {
        let (mut doc, _, [head, _, tail], _) = sample();

        assert_eq!(
            doc.range(BoundaryPoint::new(tail, 1), BoundaryPoint::new(head, 1)),
            Err(DomError::Inverted)
        );
        assert_eq!(
            doc.range(BoundaryPoint::new(head, 0), BoundaryPoint::new(head, 11)),
            Err(DomError::OffsetOutOfBounds {
                node: head,
                offset: 11,
                len: 10
            })
        );

        let stray = doc.create_text("stray");
        assert_eq!(
            doc.range(BoundaryPoint::new(stray, 0), BoundaryPoint::new(stray, 1)),
            Err(DomError::Detached(stray))
        );
    }

    #[test]
    fn range_text_spans_nodes() {
        let (doc, _, [head, _, tail], _) = sample();
        let range = doc
            .range(BoundaryPoint::new(head, 4), BoundaryPoint::new(tail, 2))
            .unwrap();

        assert_eq!(doc.range_text(&range).unwrap(), "quick brown f");
        assert_eq!(doc.common_ancestor(&range), doc.parent(head));
    }

    #[rstest]
    #[case(0)]
    #[case(4)]
    #[case(10)]
    #[case(13)]
    #[case(19)]
    fn text_offsets_round_trip(#[case] offset: usize) {
        let (doc, _, _, _) = sample();

        for affinity in [Affinity::Upstream, Affinity::Downstream] {
            let point = doc.point_at_text_offset(offset, affinity).unwrap();
            assert_eq!(doc.text_offset_of(point).unwrap(), offset);
        }
    }

    #[test]
    fn affinity_picks_side_at_node_boundaries() {
        let (doc, _, [head, middle, _], _) = sample();

        assert_eq!(
            doc.point_at_text_offset(10, Affinity::Upstream),
            Some(BoundaryPoint::new(head, 10))
        );
        assert_eq!(
            doc.point_at_text_offset(10, Affinity::Downstream),
            Some(BoundaryPoint::new(middle, 0))
        );
        assert_eq!(doc.point_at_text_offset(20, Affinity::Downstream), None);
    }

    #[test]
    fn element_boundary_offsets_count_text_of_preceding_children() {
        let (doc, p, _, _) = sample();

        assert_eq!(doc.text_offset_of(BoundaryPoint::new(p, 2)).unwrap(), 15);
        assert_eq!(doc.text_offset_of(BoundaryPoint::new(p, 3)).unwrap(), 19);
    }

    #[test]
    fn find_text_selects_requested_occurrence() {
        let mut doc = Document::new("t", "u");
        let p = doc.create_element("p");
        doc.append_child(doc.root(), p).unwrap();
        doc.append_text(p, "one fish two fish").unwrap();

        let second = doc.find_text("fish", 1).unwrap();

        assert_eq!(doc.text_offset_of(second.start).unwrap(), 13);
        assert_eq!(doc.range_text(&second).unwrap(), "fish");
        assert_eq!(doc.find_text("fish", 2), None);
        assert_eq!(doc.find_text("", 0), None);
    }

    #[test]
    fn collapse_to_end_keeps_a_caret_at_the_last_range_end() {
        let (doc, _, [head, middle, tail], _) = sample();
        let mut selection = Selection::new();
        selection.add_range(
            doc.range(BoundaryPoint::new(head, 0), BoundaryPoint::new(head, 3))
                .unwrap(),
        );
        selection.add_range(
            doc.range(BoundaryPoint::new(middle, 0), BoundaryPoint::new(tail, 2))
                .unwrap(),
        );
        assert!(!selection.is_collapsed());

        selection.collapse_to_end();

        assert_eq!(selection.range_count(), 1);
        assert!(selection.is_collapsed());
        assert_eq!(
            selection.range_at(0).unwrap().start,
            BoundaryPoint::new(tail, 2)
        );
    }

    #[test]
    fn empty_selection_counts_as_collapsed() {
        assert!(Selection::new().is_collapsed());
    }
}
