use thiserror::Error;

use crate::model::NodeId;
use crate::ranges::Span;

/// Stable handle to a tracked node in a [`RangeTree`] arena.
///
/// Handles survive edits; a handle whose node was deleted by
/// [`RangeTree::handle_removal`] stays allocated but no longer resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RangeId(pub(crate) u32);

impl RangeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Arena slot for one tracked node.
///
/// `offset` is the start of the node relative to its parent's start (for the
/// root, relative to the beginning of the text). Absolute offsets are never
/// stored; they are accumulated along the path from the root, which keeps
/// the cost of an edit proportional to the edit path rather than the tree.
#[derive(Debug, Clone)]
pub(crate) struct RangeNode {
    pub(crate) data: NodeId,
    pub(crate) offset: usize,
    pub(crate) length: usize,
    pub(crate) parent: Option<RangeId>,
    pub(crate) children: Vec<RangeId>,
    pub(crate) live: bool,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EditError {
    /// The text buffer reported an edit beyond the tracked text length.
    #[error("edit reaches offset {position} but the tracked text ends at {len}")]
    OutOfBounds { position: usize, len: usize },
}

/// The position-tracking tree over a rendered listing.
///
/// Built once per render by [`RangeTreeBuilder`](super::RangeTreeBuilder),
/// then queried and mutated in place for the lifetime of the document.
/// Invariant: the root span always covers exactly the associated text.
#[derive(Debug, Default)]
pub struct RangeTree {
    nodes: Vec<RangeNode>,
    root: Option<RangeId>,
}

impl RangeTree {
    pub(crate) fn new(nodes: Vec<RangeNode>, root: Option<RangeId>) -> Self {
        Self { nodes, root }
    }

    pub fn root(&self) -> Option<RangeId> {
        self.root
    }

    /// Length of the tracked text, i.e. the end offset of the root span.
    pub fn len(&self) -> usize {
        self.root
            .map(|r| self.nodes[r.index()].offset + self.nodes[r.index()].length)
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Model node a handle was produced for, if the handle is still live.
    pub fn data(&self, id: RangeId) -> Option<NodeId> {
        let node = self.nodes.get(id.index())?;
        node.live.then_some(node.data)
    }

    /// Model node of an allocated handle whether live or dead. Change
    /// notifications name deleted nodes too, which is what this is for.
    pub(crate) fn data_raw(&self, id: RangeId) -> Option<NodeId> {
        self.nodes.get(id.index()).map(|n| n.data)
    }

    /// Live children of a node, in document order.
    pub fn children(&self, id: RangeId) -> &[RangeId] {
        self.nodes
            .get(id.index())
            .filter(|n| n.live)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Deepest node whose span contains `position`, or `None` if the
    /// position is outside the root span.
    ///
    /// Spans are half-open, so a position on a boundary shared by two
    /// siblings answers the later sibling, and the end offset of the text
    /// answers `None`. A position inside a node's span but outside all of
    /// its children (text the node printed itself) answers that node.
    pub fn leaf_at(&self, position: usize) -> Option<RangeId> {
        let root = self.root?;
        let mut node_start = self.nodes[root.index()].offset;
        if !Span::at(node_start, self.nodes[root.index()].length).contains(position) {
            return None;
        }
        let mut id = root;
        'descend: loop {
            for &child in &self.nodes[id.index()].children {
                let child_start = node_start + self.nodes[child.index()].offset;
                if position < child_start {
                    // Gap before this child; later children lie further right.
                    break;
                }
                if Span::at(child_start, self.nodes[child.index()].length).contains(position) {
                    id = child;
                    node_start = child_start;
                    continue 'descend;
                }
            }
            return Some(id);
        }
    }

    /// All nodes whose span is fully contained in `span`, in document order.
    ///
    /// Containment is judged per node: a parent and its child can both
    /// appear. Subtrees that do not reach into `span` are pruned.
    pub fn nodes_in(&self, span: Span) -> Vec<RangeId> {
        let mut result = Vec::new();
        if let Some(root) = self.root {
            self.collect_in(root, self.nodes[root.index()].offset, span, &mut result);
        }
        result
    }

    fn collect_in(&self, id: RangeId, node_start: usize, span: Span, out: &mut Vec<RangeId>) {
        let node_span = Span::at(node_start, self.nodes[id.index()].length);
        if !span.intersects(node_span) && !span.contains_span(node_span) {
            return;
        }
        if span.contains_span(node_span) {
            out.push(id);
        }
        for &child in &self.nodes[id.index()].children {
            self.collect_in(child, node_start + self.nodes[child.index()].offset, span, out);
        }
    }

    /// Absolute span of a node, derived by walking the parent chain.
    ///
    /// `None` for handles that are dead or were never produced by this tree.
    pub fn range_of(&self, id: RangeId) -> Option<Span> {
        let node = self.nodes.get(id.index())?;
        if !node.live {
            return None;
        }
        let mut start = node.offset;
        let mut parent = node.parent;
        while let Some(pid) = parent {
            let p = &self.nodes[pid.index()];
            if !p.live {
                return None;
            }
            start += p.offset;
            parent = p.parent;
        }
        Some(Span::at(start, node.length))
    }

    /// Record that `count` bytes were inserted at `position` in the text.
    ///
    /// The deepest node whose span contains the position absorbs the
    /// insertion (same half-open descent as [`leaf_at`](Self::leaf_at);
    /// when no child contains the position — a gap, the end of a node, or
    /// the end of the text — the current node absorbs it). That node and
    /// all its ancestors grow by `count`; siblings behind the insertion
    /// point shift right. Returns the nodes whose length changed.
    pub fn handle_insertion(
        &mut self,
        position: usize,
        count: usize,
    ) -> Result<Vec<RangeId>, EditError> {
        let Some(root) = self.root else {
            // Nothing tracked any more; the edit only concerns the buffer.
            return Ok(Vec::new());
        };
        let len = self.len();
        if position > len {
            return Err(EditError::OutOfBounds { position, len });
        }
        if count == 0 {
            return Ok(Vec::new());
        }
        let root_start = self.nodes[root.index()].offset;
        if position < root_start {
            self.nodes[root.index()].offset += count;
            return Ok(vec![root]);
        }

        let mut affected = Vec::new();
        let mut id = root;
        let mut node_start = root_start;
        'descend: loop {
            self.nodes[id.index()].length += count;
            affected.push(id);
            let nchildren = self.nodes[id.index()].children.len();
            for i in 0..nchildren {
                let child = self.nodes[id.index()].children[i];
                let child_start = node_start + self.nodes[child.index()].offset;
                if position < child_start {
                    // Lands in a gap; this child and the rest shift right.
                    self.shift_children(id, i, count);
                    break 'descend;
                }
                let child_len = self.nodes[child.index()].length;
                if Span::at(child_start, child_len).contains(position) {
                    self.shift_children(id, i + 1, count);
                    id = child;
                    node_start = child_start;
                    continue 'descend;
                }
            }
            break;
        }
        Ok(affected)
    }

    fn shift_children(&mut self, parent: RangeId, from: usize, count: usize) {
        let n = self.nodes[parent.index()].children.len();
        for i in from..n {
            let child = self.nodes[parent.index()].children[i];
            self.nodes[child.index()].offset += count;
        }
    }

    /// Record that the bytes `[position, position + count)` were removed.
    ///
    /// Nodes fully contained in the removed span are deleted (their handles
    /// go dead); nodes partially overlapped shrink by the overlap; nodes
    /// behind the removal shift left. Returns the deleted and resized nodes.
    pub fn handle_removal(
        &mut self,
        position: usize,
        count: usize,
    ) -> Result<Vec<RangeId>, EditError> {
        let Some(root) = self.root else {
            return Ok(Vec::new());
        };
        let len = self.len();
        if position + count > len {
            return Err(EditError::OutOfBounds {
                position: position + count,
                len,
            });
        }
        if count == 0 {
            return Ok(Vec::new());
        }
        let removed = Span::at(position, count);
        let root_start = self.nodes[root.index()].offset;
        let root_span = Span::at(root_start, self.nodes[root.index()].length);

        let mut affected = Vec::new();
        if removed.contains_span(root_span) {
            self.kill_subtree(root, &mut affected);
            self.root = None;
            return Ok(affected);
        }
        if removed.intersects(root_span) {
            self.remove_in(root, root_start, removed, &mut affected);
        }
        let before = removed.overlap_len(Span::new(0, root_start));
        if before > 0 {
            self.nodes[root.index()].offset = root_start - before;
            if !affected.contains(&root) {
                affected.push(root);
            }
        }
        Ok(affected)
    }

    fn remove_in(
        &mut self,
        id: RangeId,
        node_start: usize,
        removed: Span,
        affected: &mut Vec<RangeId>,
    ) {
        let node_len = self.nodes[id.index()].length;
        let cut = removed.overlap_len(Span::at(node_start, node_len));
        let mut i = 0;
        while i < self.nodes[id.index()].children.len() {
            let child = self.nodes[id.index()].children[i];
            let child_off = self.nodes[child.index()].offset;
            let child_start = node_start + child_off;
            let child_span = Span::at(child_start, self.nodes[child.index()].length);
            if removed.contains_span(child_span) {
                self.nodes[id.index()].children.remove(i);
                self.kill_subtree(child, affected);
                continue;
            }
            if removed.intersects(child_span) {
                self.remove_in(child, child_start, removed, affected);
            }
            // Bytes removed inside this node but before the child pull the
            // child left.
            let shift = removed.overlap_len(Span::new(node_start, child_start));
            if shift > 0 {
                self.nodes[child.index()].offset = child_off - shift;
            }
            i += 1;
        }
        if cut > 0 {
            self.nodes[id.index()].length = node_len - cut;
            affected.push(id);
        }
    }

    fn kill_subtree(&mut self, id: RangeId, affected: &mut Vec<RangeId>) {
        self.nodes[id.index()].live = false;
        affected.push(id);
        let children = std::mem::take(&mut self.nodes[id.index()].children);
        for child in children {
            self.kill_subtree(child, affected);
        }
    }

    /// Structural self-check used by tests: children ordered,
    /// non-overlapping, contained in their parent, parent links consistent.
    pub fn check_invariants(&self) -> bool {
        match self.root {
            Some(root) => self.nodes[root.index()].parent.is_none() && self.check_node(root),
            None => true,
        }
    }

    fn check_node(&self, id: RangeId) -> bool {
        let node = &self.nodes[id.index()];
        if !node.live {
            return false;
        }
        let mut cursor = 0;
        for &child in &node.children {
            let c = &self.nodes[child.index()];
            if !c.live || c.parent != Some(id) {
                return false;
            }
            if c.offset < cursor || c.offset + c.length > node.length {
                return false;
            }
            cursor = c.offset + c.length;
            if !self.check_node(child) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranges::RangeTreeBuilder;
    use rstest::rstest;

    /// Root `[0, 25)` with two statement children `[0, 10)` and `[10, 25)`,
    /// the shape of a two-statement function body.
    fn two_statement_tree() -> (RangeTree, RangeId, RangeId, RangeId) {
        let mut builder = RangeTreeBuilder::new();
        builder.start(NodeId(0), 0);
        builder.start(NodeId(1), 0);
        builder.end(NodeId(1), 10).unwrap();
        builder.start(NodeId(2), 10);
        builder.end(NodeId(2), 25).unwrap();
        builder.end(NodeId(0), 25).unwrap();
        let tree = builder.finish().unwrap();
        let root = tree.root().unwrap();
        let [stmt1, stmt2] = *tree.children(root) else {
            panic!("expected two children");
        };
        (tree, root, stmt1, stmt2)
    }

    /// Root `[0, 30)` printing two children `[4, 10)` and `[14, 25)` with
    /// gaps before each and after the last.
    fn gapped_tree() -> (RangeTree, RangeId, RangeId, RangeId) {
        let mut builder = RangeTreeBuilder::new();
        builder.start(NodeId(0), 0);
        builder.start(NodeId(1), 4);
        builder.end(NodeId(1), 10).unwrap();
        builder.start(NodeId(2), 14);
        builder.end(NodeId(2), 25).unwrap();
        builder.end(NodeId(0), 30).unwrap();
        let tree = builder.finish().unwrap();
        let root = tree.root().unwrap();
        let [a, b] = *tree.children(root) else {
            panic!("expected two children");
        };
        (tree, root, a, b)
    }

    #[test]
    fn leaf_at_descends_to_deepest_node() {
        let (tree, _root, stmt1, stmt2) = two_statement_tree();
        assert_eq!(tree.leaf_at(0), Some(stmt1));
        assert_eq!(tree.leaf_at(9), Some(stmt1));
        assert_eq!(tree.leaf_at(24), Some(stmt2));
    }

    #[test]
    fn leaf_at_shared_boundary_answers_later_sibling() {
        let (tree, _root, _stmt1, stmt2) = two_statement_tree();
        assert_eq!(tree.leaf_at(10), Some(stmt2));
    }

    #[test]
    fn leaf_at_end_of_text_and_past_end_answer_none() {
        let (tree, ..) = two_statement_tree();
        assert_eq!(tree.leaf_at(25), None);
        assert_eq!(tree.leaf_at(100), None);
    }

    #[test]
    fn leaf_at_gap_answers_enclosing_node() {
        let (tree, root, a, b) = gapped_tree();
        assert_eq!(tree.leaf_at(2), Some(root));
        assert_eq!(tree.leaf_at(4), Some(a));
        assert_eq!(tree.leaf_at(10), Some(root));
        assert_eq!(tree.leaf_at(13), Some(root));
        assert_eq!(tree.leaf_at(14), Some(b));
        assert_eq!(tree.leaf_at(27), Some(root));
    }

    #[test]
    fn nodes_in_reports_parents_and_children_independently() {
        let (tree, root, stmt1, stmt2) = two_statement_tree();
        assert_eq!(tree.nodes_in(Span::new(0, 25)), vec![root, stmt1, stmt2]);
        assert_eq!(tree.nodes_in(Span::new(0, 10)), vec![stmt1]);
        assert_eq!(tree.nodes_in(Span::new(5, 25)), vec![stmt2]);
        assert_eq!(tree.nodes_in(Span::new(5, 9)), Vec::<RangeId>::new());
    }

    #[test]
    fn range_of_reports_derived_spans() {
        let (tree, root, stmt1, stmt2) = two_statement_tree();
        assert_eq!(tree.range_of(root), Some(Span::new(0, 25)));
        assert_eq!(tree.range_of(stmt1), Some(Span::new(0, 10)));
        assert_eq!(tree.range_of(stmt2), Some(Span::new(10, 25)));
    }

    #[test]
    fn insertion_grows_edit_path_and_shifts_the_rest() {
        let (mut tree, root, stmt1, stmt2) = two_statement_tree();
        let affected = tree.handle_insertion(3, 5).unwrap();
        assert_eq!(affected, vec![root, stmt1]);
        assert_eq!(tree.range_of(root), Some(Span::new(0, 30)));
        assert_eq!(tree.range_of(stmt1), Some(Span::new(0, 15)));
        assert_eq!(tree.range_of(stmt2), Some(Span::new(15, 30)));
        assert!(tree.check_invariants());
    }

    #[test]
    fn insertion_at_shared_boundary_grows_later_sibling() {
        let (mut tree, root, stmt1, stmt2) = two_statement_tree();
        let affected = tree.handle_insertion(10, 4).unwrap();
        assert_eq!(affected, vec![root, stmt2]);
        assert_eq!(tree.range_of(stmt1), Some(Span::new(0, 10)));
        assert_eq!(tree.range_of(stmt2), Some(Span::new(10, 29)));
    }

    #[test]
    fn insertion_in_gap_grows_only_the_enclosing_node() {
        let (mut tree, root, a, b) = gapped_tree();
        let affected = tree.handle_insertion(12, 3).unwrap();
        assert_eq!(affected, vec![root]);
        assert_eq!(tree.range_of(a), Some(Span::new(4, 10)));
        assert_eq!(tree.range_of(b), Some(Span::new(17, 28)));
        assert_eq!(tree.len(), 33);
    }

    #[test]
    fn insertion_at_end_of_text_grows_only_the_root() {
        let (mut tree, root, stmt1, stmt2) = two_statement_tree();
        let affected = tree.handle_insertion(25, 2).unwrap();
        assert_eq!(affected, vec![root]);
        assert_eq!(tree.range_of(stmt1), Some(Span::new(0, 10)));
        assert_eq!(tree.range_of(stmt2), Some(Span::new(10, 25)));
        assert_eq!(tree.len(), 27);
    }

    #[rstest]
    #[case::insertion(true)]
    #[case::removal(false)]
    fn zero_count_edits_are_no_ops(#[case] insertion: bool) {
        let (mut tree, ..) = two_statement_tree();
        let affected = if insertion {
            tree.handle_insertion(7, 0).unwrap()
        } else {
            tree.handle_removal(7, 0).unwrap()
        };
        assert!(affected.is_empty());
        assert_eq!(tree.len(), 25);
        assert!(tree.check_invariants());
    }

    #[test]
    fn out_of_bounds_edits_are_rejected() {
        let (mut tree, ..) = two_statement_tree();
        assert_eq!(
            tree.handle_insertion(26, 1),
            Err(EditError::OutOfBounds {
                position: 26,
                len: 25
            })
        );
        assert_eq!(
            tree.handle_removal(20, 10),
            Err(EditError::OutOfBounds {
                position: 30,
                len: 25
            })
        );
    }

    #[test]
    fn foreign_handles_resolve_to_nothing() {
        let (tree, ..) = two_statement_tree();
        let foreign = RangeId(99);
        assert_eq!(tree.data(foreign), None);
        assert_eq!(tree.range_of(foreign), None);
        assert!(tree.children(foreign).is_empty());
    }

    #[test]
    fn removal_shrinks_overlapped_nodes() {
        let (mut tree, root, stmt1, stmt2) = two_statement_tree();
        // Remove [5, 15): tail of stmt1, head of stmt2.
        let affected = tree.handle_removal(5, 10).unwrap();
        assert_eq!(affected, vec![stmt1, stmt2, root]);
        assert_eq!(tree.range_of(stmt1), Some(Span::new(0, 5)));
        assert_eq!(tree.range_of(stmt2), Some(Span::new(5, 15)));
        assert_eq!(tree.range_of(root), Some(Span::new(0, 15)));
        assert!(tree.check_invariants());
    }

    #[test]
    fn removal_deletes_fully_contained_nodes() {
        let (mut tree, root, stmt1, stmt2) = two_statement_tree();
        let affected = tree.handle_removal(0, 12).unwrap();
        assert!(affected.contains(&stmt1));
        assert!(affected.contains(&root));
        // The deleted handle no longer resolves; the index key survives.
        assert_eq!(tree.range_of(stmt1), None);
        assert_eq!(tree.data(stmt1), None);
        assert_eq!(tree.range_of(stmt2), Some(Span::new(0, 13)));
        assert_eq!(tree.nodes_in(Span::new(0, 13)), vec![root, stmt2]);
        assert!(tree.check_invariants());
    }

    #[test]
    fn removal_of_everything_empties_the_tree() {
        let (mut tree, root, stmt1, stmt2) = two_statement_tree();
        let affected = tree.handle_removal(0, 25).unwrap();
        assert_eq!(affected.len(), 3);
        assert_eq!(tree.root(), None);
        assert_eq!(tree.len(), 0);
        for id in [root, stmt1, stmt2] {
            assert_eq!(tree.range_of(id), None);
        }
        // Later edits on the emptied tree are accepted and track nothing.
        assert_eq!(tree.handle_insertion(0, 5), Ok(Vec::new()));
    }

    #[test]
    fn edits_compose_in_order() {
        let (mut tree, _root, stmt1, stmt2) = two_statement_tree();
        tree.handle_insertion(3, 5).unwrap();
        tree.handle_removal(0, 2).unwrap();
        tree.handle_insertion(28, 1).unwrap();
        assert_eq!(tree.range_of(stmt1), Some(Span::new(0, 13)));
        assert_eq!(tree.range_of(stmt2), Some(Span::new(13, 28)));
        assert_eq!(tree.len(), 29);
        assert!(tree.check_invariants());
    }
}
