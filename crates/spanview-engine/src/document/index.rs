use std::collections::HashMap;

use crate::model::{InstrId, ModelTree, NodeId, NodeKind};
use crate::ranges::{RangeId, RangeTree};

/// Lookup tables from model concepts back into the rendered listing.
///
/// Built by one pre-order traversal of a finished [`RangeTree`], once per
/// render. The keys are established at build time and never change;
/// handles whose nodes are later deleted by edits simply stop resolving to
/// a range. A wholesale re-render must discard the index together with the
/// tree it was built from.
#[derive(Debug, Default)]
pub struct ReverseIndex {
    node_to_range: HashMap<NodeId, RangeId>,
    instruction_ranges: HashMap<InstrId, Vec<RangeId>>,
    declaration_uses: HashMap<NodeId, Vec<NodeId>>,
    label_statements: HashMap<NodeId, NodeId>,
    function_definitions: HashMap<NodeId, NodeId>,
}

impl ReverseIndex {
    pub fn build(model: &ModelTree, ranges: &RangeTree) -> Self {
        let mut index = Self::default();
        if let Some(root) = ranges.root() {
            index.visit(model, ranges, root);
        }
        index
    }

    fn visit(&mut self, model: &ModelTree, ranges: &RangeTree, id: RangeId) {
        let Some(node) = ranges.data(id) else {
            return;
        };

        self.node_to_range.insert(node, id);

        if let Some(instruction) = model.origin(node).instruction {
            self.instruction_ranges
                .entry(instruction)
                .or_default()
                .push(id);
        }

        if let Some(declaration) = model.declaration_of_identifier(node) {
            self.declaration_uses
                .entry(declaration)
                .or_default()
                .push(node);
        }

        match *model.kind(node) {
            NodeKind::FunctionDefinition { .. } => {
                self.function_definitions
                    .insert(model.first_declaration(node), node);
            }
            NodeKind::LabelStatement { label, .. } => {
                self.label_statements.insert(label, node);
            }
            _ => {}
        }

        for &child in ranges.children(id) {
            self.visit(model, ranges, child);
        }
    }

    /// Range handle produced for a model node, if it was printed.
    pub fn range_node(&self, node: NodeId) -> Option<RangeId> {
        self.node_to_range.get(&node).copied()
    }

    /// Range handles of every node originating from an instruction.
    pub fn instruction_ranges(&self, instruction: InstrId) -> &[RangeId] {
        self.instruction_ranges
            .get(&instruction)
            .map_or(&[], Vec::as_slice)
    }

    /// Identifier nodes referring to a declaration. Unknown declarations
    /// have no uses, which is a normal outcome, not an error.
    pub fn uses(&self, declaration: NodeId) -> &[NodeId] {
        self.declaration_uses
            .get(&declaration)
            .map_or(&[], Vec::as_slice)
    }

    /// The statement defining a label, at most one per declaration.
    pub fn label_statement(&self, declaration: NodeId) -> Option<NodeId> {
        self.label_statements.get(&declaration).copied()
    }

    /// The definition of a function, keyed by the first declaration of its
    /// chain so any alias resolves to the one definition.
    pub fn function_definition(&self, declaration: NodeId) -> Option<NodeId> {
        self.function_definitions.get(&declaration).copied()
    }
}
