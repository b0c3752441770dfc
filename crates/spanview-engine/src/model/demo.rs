//! A small built-in listing used by the CLI fallback, benches and tests:
//! a forward-declared helper, a counting loop with a label and a goto, and
//! a call — enough to exercise every reverse mapping.

use super::{BinOp, InstrId, ModelTree, NodeId, NodeKind};

/// Text `demo_program` renders to.
pub const DEMO_LISTING: &str = r#"int helper(int a);

int main() {
    int x;
    x = 0;
loop:
    x = x + 1;
    goto loop;
    return helper(x);
}

int helper(int a) {
    return a * 2;
}
"#;

/// Interesting ids inside the demo program, for tests and the CLI.
pub struct DemoHandles {
    pub unit: NodeId,
    pub helper_fwd: NodeId,
    pub helper_def: NodeId,
    pub x_decl: NodeId,
    pub a_decl: NodeId,
    pub loop_decl: NodeId,
    pub label_stmt: NodeId,
    pub mov_instr: InstrId,
    pub add_instr: InstrId,
    pub call_instr: InstrId,
}

pub fn demo_program() -> ModelTree {
    demo_program_with_handles().0
}

pub fn demo_program_with_handles() -> (ModelTree, DemoHandles) {
    let mut m = ModelTree::new();

    let mov_instr = m.add_instruction(0x0040_1000, "mov dword [rbp-0x4], 0x0");
    let add_instr = m.add_instruction(0x0040_1007, "add dword [rbp-0x4], 0x1");
    let jmp_instr = m.add_instruction(0x0040_100b, "jmp 0x401007");
    let call_instr = m.add_instruction(0x0040_100d, "call 0x401020");
    let lea_instr = m.add_instruction(0x0040_1020, "lea eax, [rdi+rdi]");

    let mov_stmt = m.add_statement(Some(mov_instr));
    let add_stmt = m.add_statement(Some(add_instr));
    let jmp_stmt = m.add_statement(Some(jmp_instr));
    let call_stmt = m.add_statement(Some(call_instr));
    let lea_stmt = m.add_statement(Some(lea_instr));

    let unit = m.add_node(NodeKind::Unit, None);

    // int helper(int a);
    let helper_fwd = m.add_node(
        NodeKind::FunctionDeclaration {
            name: "helper".into(),
        },
        Some(unit),
    );
    m.add_node(
        NodeKind::VariableDeclaration {
            name: "a".into(),
            type_name: "int".into(),
        },
        Some(helper_fwd),
    );

    // int main() { ... }
    let main_def = m.add_node(
        NodeKind::FunctionDefinition {
            name: "main".into(),
            forward_declaration: None,
        },
        Some(unit),
    );
    let loop_decl = m.add_node(
        NodeKind::LabelDeclaration {
            name: "loop".into(),
        },
        Some(main_def),
    );
    let body = m.add_node(NodeKind::Block, Some(main_def));

    // int x;
    let x_decl = m.add_node(
        NodeKind::VariableDeclaration {
            name: "x".into(),
            type_name: "int".into(),
        },
        Some(body),
    );

    // x = 0;
    let stmt = m.add_node(
        NodeKind::ExprStatement {
            origin: Some(mov_stmt),
        },
        Some(body),
    );
    let t = m.add_term(mov_stmt);
    let assign = m.add_node(
        NodeKind::BinaryOp {
            op: BinOp::Assign,
            term: Some(t),
        },
        Some(stmt),
    );
    let t = m.add_term(mov_stmt);
    m.add_node(
        NodeKind::Identifier {
            declaration: x_decl,
            term: Some(t),
        },
        Some(assign),
    );
    let t = m.add_term(mov_stmt);
    m.add_node(
        NodeKind::IntLiteral {
            value: 0,
            term: Some(t),
        },
        Some(assign),
    );

    // loop:
    let label_stmt = m.add_node(
        NodeKind::LabelStatement {
            label: loop_decl,
            origin: None,
        },
        Some(body),
    );
    m.add_node(
        NodeKind::Identifier {
            declaration: loop_decl,
            term: None,
        },
        Some(label_stmt),
    );

    // x = x + 1;
    let stmt = m.add_node(
        NodeKind::ExprStatement {
            origin: Some(add_stmt),
        },
        Some(body),
    );
    let t = m.add_term(add_stmt);
    let assign = m.add_node(
        NodeKind::BinaryOp {
            op: BinOp::Assign,
            term: Some(t),
        },
        Some(stmt),
    );
    let t = m.add_term(add_stmt);
    m.add_node(
        NodeKind::Identifier {
            declaration: x_decl,
            term: Some(t),
        },
        Some(assign),
    );
    let t = m.add_term(add_stmt);
    let sum = m.add_node(
        NodeKind::BinaryOp {
            op: BinOp::Add,
            term: Some(t),
        },
        Some(assign),
    );
    let t = m.add_term(add_stmt);
    m.add_node(
        NodeKind::Identifier {
            declaration: x_decl,
            term: Some(t),
        },
        Some(sum),
    );
    let t = m.add_term(add_stmt);
    m.add_node(
        NodeKind::IntLiteral {
            value: 1,
            term: Some(t),
        },
        Some(sum),
    );

    // goto loop;
    let goto = m.add_node(
        NodeKind::Goto {
            origin: Some(jmp_stmt),
        },
        Some(body),
    );
    m.add_node(
        NodeKind::Identifier {
            declaration: loop_decl,
            term: None,
        },
        Some(goto),
    );

    // return helper(x);
    let ret = m.add_node(
        NodeKind::Return {
            origin: Some(call_stmt),
        },
        Some(body),
    );
    let t = m.add_term(call_stmt);
    let call = m.add_node(NodeKind::Call { term: Some(t) }, Some(ret));
    m.add_node(
        NodeKind::Identifier {
            declaration: helper_fwd,
            term: None,
        },
        Some(call),
    );
    let t = m.add_term(call_stmt);
    m.add_node(
        NodeKind::Identifier {
            declaration: x_decl,
            term: Some(t),
        },
        Some(call),
    );

    // int helper(int a) { return a * 2; }
    let helper_def = m.add_node(
        NodeKind::FunctionDefinition {
            name: "helper".into(),
            forward_declaration: Some(helper_fwd),
        },
        Some(unit),
    );
    let a_decl = m.add_node(
        NodeKind::VariableDeclaration {
            name: "a".into(),
            type_name: "int".into(),
        },
        Some(helper_def),
    );
    let helper_body = m.add_node(NodeKind::Block, Some(helper_def));
    let ret = m.add_node(
        NodeKind::Return {
            origin: Some(lea_stmt),
        },
        Some(helper_body),
    );
    let t = m.add_term(lea_stmt);
    let product = m.add_node(
        NodeKind::BinaryOp {
            op: BinOp::Mul,
            term: Some(t),
        },
        Some(ret),
    );
    let t = m.add_term(lea_stmt);
    m.add_node(
        NodeKind::Identifier {
            declaration: a_decl,
            term: Some(t),
        },
        Some(product),
    );
    let t = m.add_term(lea_stmt);
    m.add_node(
        NodeKind::IntLiteral {
            value: 2,
            term: Some(t),
        },
        Some(product),
    );

    (
        m,
        DemoHandles {
            unit,
            helper_fwd,
            helper_def,
            x_decl,
            a_decl,
            loop_decl,
            label_stmt,
            mov_instr,
            add_instr,
            call_instr,
        },
    )
}
