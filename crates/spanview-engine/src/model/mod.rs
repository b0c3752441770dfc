//! The model tree the listing is rendered from.
//!
//! This is the decompiler's side of the fence: a C-like AST whose statements
//! and expressions remember which IR statement, term and machine instruction
//! they came from. The range-tracking core never owns these nodes; it refers
//! to them through the identity-comparable ids assigned here.

use serde::{Deserialize, Serialize};

pub mod demo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub(crate) u32);

/// Machine instruction id, assigned by [`ModelTree::add_instruction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstrId(pub(crate) u32);

/// IR statement id, assigned by [`ModelTree::add_statement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StmtId(pub(crate) u32);

/// IR term id, assigned by [`ModelTree::add_term`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TermId(pub(crate) u32);

/// A disassembled machine instruction, kept for display purposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub address: u64,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Assign,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Assign => "=",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// The whole listing: function declarations and definitions.
    Unit,
    FunctionDefinition {
        name: String,
        /// Forward declaration this definition completes, if any.
        forward_declaration: Option<NodeId>,
    },
    FunctionDeclaration {
        name: String,
    },
    VariableDeclaration {
        name: String,
        type_name: String,
    },
    LabelDeclaration {
        name: String,
    },
    Block,
    ExprStatement {
        origin: Option<StmtId>,
    },
    Return {
        origin: Option<StmtId>,
    },
    Goto {
        origin: Option<StmtId>,
    },
    /// Defines a label in the listing; the child identifier prints it.
    LabelStatement {
        label: NodeId,
        origin: Option<StmtId>,
    },
    /// A textual occurrence of a declared name.
    Identifier {
        declaration: NodeId,
        term: Option<TermId>,
    },
    IntLiteral {
        value: i64,
        term: Option<TermId>,
    },
    BinaryOp {
        op: BinOp,
        term: Option<TermId>,
    },
    /// Children: callee identifier followed by the arguments.
    Call {
        term: Option<TermId>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ModelNode {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Where a rendered node came from, walking expression → term → statement →
/// instruction. Any link can be absent; synthesized nodes (casts, recovered
/// declarations) have no machine origin at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Origin {
    pub statement: Option<StmtId>,
    pub term: Option<TermId>,
    pub instruction: Option<InstrId>,
}

/// Arena AST plus the IR side tables the listing core consumes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelTree {
    nodes: Vec<ModelNode>,
    root: Option<NodeId>,
    instructions: Vec<Instruction>,
    /// Instruction each IR statement was lifted from, indexed by `StmtId`.
    statement_instruction: Vec<Option<InstrId>>,
    /// Statement each IR term belongs to, indexed by `TermId`.
    term_statement: Vec<StmtId>,
}

impl ModelTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node; the first node added with no parent becomes the root.
    pub fn add_node(&mut self, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(ModelNode {
            kind,
            parent,
            children: Vec::new(),
        });
        match parent {
            Some(p) => self.nodes[p.0 as usize].children.push(id),
            None => self.root = self.root.or(Some(id)),
        }
        id
    }

    pub fn add_instruction(&mut self, address: u64, text: impl Into<String>) -> InstrId {
        let id = InstrId(self.instructions.len() as u32);
        self.instructions.push(Instruction {
            address,
            text: text.into(),
        });
        id
    }

    pub fn add_statement(&mut self, instruction: Option<InstrId>) -> StmtId {
        let id = StmtId(self.statement_instruction.len() as u32);
        self.statement_instruction.push(instruction);
        id
    }

    pub fn add_term(&mut self, statement: StmtId) -> TermId {
        let id = TermId(self.term_statement.len() as u32);
        self.term_statement.push(statement);
        id
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0 as usize].kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0 as usize].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0 as usize].children
    }

    pub fn instruction(&self, id: InstrId) -> &Instruction {
        &self.instructions[id.0 as usize]
    }

    /// Statement, term and instruction a node originated from.
    ///
    /// Statement nodes carry their IR statement directly; expression nodes
    /// carry a term whose statement is looked up; the statement then leads
    /// to the instruction.
    pub fn origin(&self, id: NodeId) -> Origin {
        let mut origin = Origin::default();
        match *self.kind(id) {
            NodeKind::ExprStatement { origin: o }
            | NodeKind::Return { origin: o }
            | NodeKind::Goto { origin: o }
            | NodeKind::LabelStatement { origin: o, .. } => origin.statement = o,
            NodeKind::Identifier { term, .. }
            | NodeKind::IntLiteral { term, .. }
            | NodeKind::BinaryOp { term, .. }
            | NodeKind::Call { term } => {
                origin.term = term;
                origin.statement = term.map(|t| self.term_statement[t.0 as usize]);
            }
            _ => {}
        }
        origin.instruction = origin
            .statement
            .and_then(|s| self.statement_instruction[s.0 as usize]);
        origin
    }

    /// Declaration referenced by an identifier node, if it is one.
    pub fn declaration_of_identifier(&self, id: NodeId) -> Option<NodeId> {
        match *self.kind(id) {
            NodeKind::Identifier { declaration, .. } => Some(declaration),
            _ => None,
        }
    }

    pub fn is_declaration(&self, id: NodeId) -> bool {
        matches!(
            self.kind(id),
            NodeKind::FunctionDefinition { .. }
                | NodeKind::FunctionDeclaration { .. }
                | NodeKind::VariableDeclaration { .. }
                | NodeKind::LabelDeclaration { .. }
        )
    }

    /// Head of a definition's declaration chain: its forward declaration
    /// when one exists, otherwise the definition itself. Lookups keyed by
    /// the chain head resolve from any alias of the function.
    pub fn first_declaration(&self, id: NodeId) -> NodeId {
        match *self.kind(id) {
            NodeKind::FunctionDefinition {
                forward_declaration: Some(decl),
                ..
            } => decl,
            _ => id,
        }
    }

    /// Printed name of a declaration (or definition).
    pub fn name_of(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::FunctionDefinition { name, .. }
            | NodeKind::FunctionDeclaration { name }
            | NodeKind::VariableDeclaration { name, .. }
            | NodeKind::LabelDeclaration { name } => Some(name),
            _ => None,
        }
    }
}
