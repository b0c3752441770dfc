/*!
 * An editable listing with live position tracking.
 *
 * A [`Document`] ties the pieces of the engine together:
 *
 * - the [`ModelTree`] the listing was rendered from,
 * - an `xi_rope::Rope` buffer holding the rendered text (source of truth
 *   for the bytes),
 * - the [`RangeTree`](crate::ranges::RangeTree) tracking where every
 *   printed node currently lives,
 * - a [`ReverseIndex`] answering model-to-text questions.
 *
 * Edits go through [`Document::apply`], which validates the edit against
 * the buffer, updates the range tree (removal first, then insertion, so a
 * replacement is two tree operations in that order), applies a delta to the
 * buffer, and bumps the version. The model tree and the index are never
 * rebuilt by an edit; index keys whose ranges were deleted simply stop
 * resolving.
 */

pub mod index;

pub use index::ReverseIndex;

use std::borrow::Cow;

use xi_rope::Rope;

use crate::model::{InstrId, ModelTree, NodeId, Origin};
use crate::ranges::{BuildError, EditError, RangeId, RangeTree, Span};
use crate::render::render_listing;

/// One text edit: replace `removed` bytes at `at` with `inserted`.
///
/// A pure insertion has `removed == 0`; a pure deletion has an empty
/// `inserted`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub at: usize,
    pub removed: usize,
    pub inserted: String,
}

impl Edit {
    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self {
            at,
            removed: 0,
            inserted: text.into(),
        }
    }

    pub fn delete(at: usize, count: usize) -> Self {
        Self {
            at,
            removed: count,
            inserted: String::new(),
        }
    }

    pub fn replace(at: usize, removed: usize, text: impl Into<String>) -> Self {
        Self {
            at,
            removed,
            inserted: text.into(),
        }
    }
}

/// What an edit changed: the rewritten byte spans, the model nodes whose
/// tracked ranges moved, grew, shrank or died, and the document version
/// after the edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    pub changed: Vec<Span>,
    pub changed_nodes: Vec<NodeId>,
    pub version: u64,
}

pub struct Document {
    model: ModelTree,
    buffer: Rope,
    ranges: RangeTree,
    index: ReverseIndex,
    version: u64,
}

impl Document {
    /// Render `model` and wrap the result into an editable document.
    pub fn new(model: ModelTree) -> Result<Self, BuildError> {
        let (text, ranges) = render_listing(&model)?;
        let index = ReverseIndex::build(&model, &ranges);
        Ok(Self {
            model,
            buffer: Rope::from(text.as_str()),
            ranges,
            index,
            version: 0,
        })
    }

    pub fn model(&self) -> &ModelTree {
        &self.model
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.len() == 0
    }

    /// Current text of the listing.
    pub fn text(&self) -> String {
        self.buffer.to_string()
    }

    /// Slice of the listing, clamped to the buffer bounds.
    pub fn get_text(&self, range: std::ops::Range<usize>) -> Cow<'_, str> {
        let len = self.buffer.len();
        let start = range.start.min(len);
        let end = range.end.min(len).max(start);
        self.buffer.slice_to_cow(start..end)
    }

    /// Deepest tracked node at a byte position. See
    /// [`RangeTree::leaf_at`](crate::ranges::RangeTree::leaf_at) for the
    /// boundary rules.
    pub fn leaf_at(&self, position: usize) -> Option<NodeId> {
        self.ranges.leaf_at(position).and_then(|id| self.ranges.data(id))
    }

    /// Model nodes whose spans fall entirely inside `span`, in document
    /// order.
    pub fn nodes_in(&self, span: Span) -> Vec<NodeId> {
        self.ranges
            .nodes_in(span)
            .into_iter()
            .filter_map(|id| self.ranges.data(id))
            .collect()
    }

    /// Current span of a model node, `None` if it was never printed or its
    /// text was deleted.
    pub fn range_of(&self, node: NodeId) -> Option<Span> {
        let id = self.index.range_node(node)?;
        self.ranges.range_of(id)
    }

    /// Current spans of everything an instruction expanded into. Spans
    /// whose nodes were deleted by edits are omitted.
    pub fn ranges_for_instruction(&self, instruction: InstrId) -> Vec<Span> {
        self.index
            .instruction_ranges(instruction)
            .iter()
            .filter_map(|&id| self.ranges.range_of(id))
            .collect()
    }

    /// Identifier nodes referring to a declaration.
    pub fn uses(&self, declaration: NodeId) -> &[NodeId] {
        self.index.uses(declaration)
    }

    pub fn label_statement(&self, declaration: NodeId) -> Option<NodeId> {
        self.index.label_statement(declaration)
    }

    pub fn function_definition(&self, declaration: NodeId) -> Option<NodeId> {
        self.index.function_definition(declaration)
    }

    /// Origin of a node, walking expression to term to statement to
    /// instruction.
    pub fn origin(&self, node: NodeId) -> Origin {
        self.model.origin(node)
    }

    /// Apply one edit to the buffer and the range tree.
    ///
    /// The removal is recorded before the insertion, so a replacement first
    /// shrinks or deletes the nodes under the removed span and then grows
    /// whatever ends up containing the insertion point.
    pub fn apply(&mut self, edit: &Edit) -> Result<Patch, EditError> {
        let len = self.buffer.len();
        if edit.at + edit.removed > len {
            return Err(EditError::OutOfBounds {
                position: edit.at + edit.removed,
                len,
            });
        }

        let mut affected = Vec::new();
        if edit.removed > 0 {
            affected.extend(self.ranges.handle_removal(edit.at, edit.removed)?);
        }
        if !edit.inserted.is_empty() {
            for id in self.ranges.handle_insertion(edit.at, edit.inserted.len())? {
                if !affected.contains(&id) {
                    affected.push(id);
                }
            }
        }

        let mut builder = xi_rope::delta::Builder::new(len);
        builder.replace(
            edit.at..edit.at + edit.removed,
            Rope::from(edit.inserted.as_str()),
        );
        self.buffer = builder.build().apply(&self.buffer);
        self.version += 1;

        Ok(Patch {
            changed: vec![Span::at(edit.at, edit.inserted.len())],
            changed_nodes: self.node_names(&affected),
            version: self.version,
        })
    }

    /// Replace every recorded use of a declaration with `new_name`.
    ///
    /// Only identifier occurrences collected at render time are rewritten;
    /// text the user typed over a use beforehand is whatever the range tree
    /// now says it is. Uses are rewritten back to front so each replacement
    /// leaves the earlier offsets intact.
    pub fn rename(&mut self, declaration: NodeId, new_name: &str) -> Result<Patch, EditError> {
        let mut spans: Vec<Span> = self
            .index
            .uses(declaration)
            .iter()
            .filter_map(|&use_node| self.range_of(use_node))
            .collect();
        spans.sort_by(|a, b| b.start.cmp(&a.start));

        let mut changed = Vec::new();
        let mut changed_nodes = Vec::new();
        for span in spans {
            let patch = self.apply(&Edit::replace(span.start, span.len(), new_name))?;
            changed.extend(patch.changed);
            for node in patch.changed_nodes {
                if !changed_nodes.contains(&node) {
                    changed_nodes.push(node);
                }
            }
        }
        Ok(Patch {
            changed,
            changed_nodes,
            version: self.version,
        })
    }

    fn node_names(&self, affected: &[RangeId]) -> Vec<NodeId> {
        affected
            .iter()
            .filter_map(|&id| self.ranges.data_raw(id))
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn ranges(&self) -> &RangeTree {
        &self.ranges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::demo::{demo_program, demo_program_with_handles, DEMO_LISTING};
    use pretty_assertions::assert_eq;

    #[test]
    fn new_document_holds_the_rendered_listing() {
        let doc = Document::new(demo_program()).unwrap();
        assert_eq!(doc.text(), DEMO_LISTING);
        assert_eq!(doc.len(), DEMO_LISTING.len());
        assert_eq!(doc.version(), 0);
    }

    #[test]
    fn get_text_clamps_out_of_range_slices() {
        let doc = Document::new(demo_program()).unwrap();
        assert_eq!(doc.get_text(0..3), "int");
        assert_eq!(doc.get_text(doc.len()..doc.len() + 50), "");
        assert_eq!(doc.get_text(10_000..20_000), "");
    }

    #[test]
    fn leaf_at_finds_the_identifier_under_the_cursor() {
        let (model, handles) = demo_program_with_handles();
        let doc = Document::new(model).unwrap();

        let pos = doc.text().find("x = 0").unwrap();
        let node = doc.leaf_at(pos).unwrap();
        assert_eq!(doc.model().declaration_of_identifier(node), Some(handles.x_decl));
        assert_eq!(doc.origin(node).instruction, Some(handles.mov_instr));
    }

    #[test]
    fn instruction_spans_follow_insertions() {
        let (model, handles) = demo_program_with_handles();
        let mut doc = Document::new(model).unwrap();

        let before = doc.ranges_for_instruction(handles.add_instr);
        assert!(!before.is_empty());

        // Grow the listing ahead of the `x = x + 1;` line.
        let patch = doc.apply(&Edit::insert(0, "// counting\n")).unwrap();
        assert_eq!(patch.version, 1);

        let after = doc.ranges_for_instruction(handles.add_instr);
        assert_eq!(after.len(), before.len());
        for (a, b) in before.iter().zip(&after) {
            assert_eq!(b.start, a.start + "// counting\n".len());
            assert_eq!(b.len(), a.len());
        }
        let span = after[0];
        assert!(doc.get_text(span.to_range()).contains('x'));
    }

    #[test]
    fn deleting_a_statement_kills_its_ranges_but_keeps_the_keys() {
        let (model, handles) = demo_program_with_handles();
        let mut doc = Document::new(model).unwrap();

        let line = doc.text().find("    goto loop;\n").unwrap();
        doc.apply(&Edit::delete(line, "    goto loop;\n".len()))
            .unwrap();

        // The goto's identifier is gone, so the label has one use left.
        let live: Vec<_> = doc
            .uses(handles.loop_decl)
            .iter()
            .filter(|&&n| doc.range_of(n).is_some())
            .collect();
        assert_eq!(live.len(), 1);
        assert!(doc.ranges().check_invariants());
        assert!(!doc.text().contains("goto"));
    }

    #[test]
    fn out_of_bounds_edit_is_rejected_and_changes_nothing() {
        let mut doc = Document::new(demo_program()).unwrap();
        let len = doc.len();
        let err = doc.apply(&Edit::delete(len - 2, 5)).unwrap_err();
        assert_eq!(
            err,
            EditError::OutOfBounds {
                position: len + 3,
                len
            }
        );
        assert_eq!(doc.version(), 0);
        assert_eq!(doc.text(), DEMO_LISTING);
    }

    #[test]
    fn rename_rewrites_every_use_and_spares_other_names() {
        let (model, handles) = demo_program_with_handles();
        let mut doc = Document::new(model).unwrap();

        let patch = doc.rename(handles.x_decl, "counter").unwrap();
        assert_eq!(patch.changed.len(), 4);

        let text = doc.text();
        assert_eq!(text.matches("counter").count(), 4);
        // The declaration itself keeps its spelling; only uses are recorded.
        assert!(text.contains("    int x;\n"));
        assert!(text.contains("counter = counter + 1;"));
        assert!(text.contains("return helper(counter);"));
        // Unrelated identifiers stay put.
        assert_eq!(text.matches("helper").count(), 3);
        assert!(doc.ranges().check_invariants());
    }

    #[test]
    fn rename_retires_the_replaced_identifier_ranges() {
        let (model, handles) = demo_program_with_handles();
        let mut doc = Document::new(model).unwrap();
        doc.rename(handles.x_decl, "counter").unwrap();

        // Each replacement removes the identifier's whole span, so the use
        // nodes go dead; the new spelling belongs to the enclosing node.
        for &use_node in doc.uses(handles.x_decl) {
            assert_eq!(doc.range_of(use_node), None);
        }
        // Instruction highlighting still works after the rewrite.
        let spans = doc.ranges_for_instruction(handles.add_instr);
        assert!(!spans.is_empty());
        for span in spans {
            let text = doc.get_text(span.to_range()).into_owned();
            assert!(!text.contains('x'), "stale span text: {text:?}");
        }
    }

    #[test]
    fn rename_a_longer_name_shifts_later_uses_correctly() {
        let (model, handles) = demo_program_with_handles();
        let mut doc = Document::new(model).unwrap();

        doc.rename(handles.loop_decl, "again").unwrap();
        let text = doc.text();
        assert!(text.contains("again:\n"));
        assert!(text.contains("goto again;"));
        assert!(!text.contains("loop"));
        assert_eq!(doc.len(), doc.ranges().len());
    }

    #[test]
    fn rename_with_three_ascending_uses_replaces_all_of_them() {
        use crate::model::{BinOp, ModelTree, NodeKind};

        let mut m = ModelTree::new();
        let unit = m.add_node(NodeKind::Unit, None);
        let def = m.add_node(
            NodeKind::FunctionDefinition {
                name: "f".into(),
                forward_declaration: None,
            },
            Some(unit),
        );
        let body = m.add_node(NodeKind::Block, Some(def));
        let v = m.add_node(
            NodeKind::VariableDeclaration {
                name: "v".into(),
                type_name: "int".into(),
            },
            Some(body),
        );
        for value in 1..=3 {
            let stmt = m.add_node(NodeKind::ExprStatement { origin: None }, Some(body));
            let assign = m.add_node(
                NodeKind::BinaryOp {
                    op: BinOp::Assign,
                    term: None,
                },
                Some(stmt),
            );
            m.add_node(
                NodeKind::Identifier {
                    declaration: v,
                    term: None,
                },
                Some(assign),
            );
            m.add_node(NodeKind::IntLiteral { value, term: None }, Some(assign));
        }

        let mut doc = Document::new(m).unwrap();
        assert_eq!(doc.uses(v).len(), 3);

        doc.rename(v, "total").unwrap();
        let text = doc.text();
        assert!(text.contains("total = 1;"));
        assert!(text.contains("total = 2;"));
        assert!(text.contains("total = 3;"));
        assert!(text.contains("int v;"));
        assert!(doc.ranges().check_invariants());
    }

    #[test]
    fn versions_count_every_applied_edit() {
        let mut doc = Document::new(demo_program()).unwrap();
        doc.apply(&Edit::insert(0, "a")).unwrap();
        doc.apply(&Edit::delete(0, 1)).unwrap();
        assert_eq!(doc.version(), 2);
        assert_eq!(doc.text(), DEMO_LISTING);
    }
}
