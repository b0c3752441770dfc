//! Renders a model tree into a flat C-like listing.
//!
//! The printer walks the model depth-first and announces every node it
//! prints through a [`PrintHook`], passing the output length at the moment
//! printing starts and ends. Driving a
//! [`RangeTreeBuilder`](crate::ranges::RangeTreeBuilder) with those
//! notifications yields a range tree whose nesting mirrors the print
//! nesting. Indentation and punctuation a node prints around its children
//! stay unattributed, which is what makes gaps inside parent spans.

use crate::model::{ModelTree, NodeId, NodeKind};
use crate::ranges::{BuildError, RangeTree, RangeTreeBuilder};

const INDENT: usize = 4;

/// Receives node boundary notifications from the printer.
pub trait PrintHook {
    fn on_start(&mut self, node: NodeId, output_len: usize);
    fn on_end(&mut self, node: NodeId, output_len: usize);
}

/// Hook that tracks nothing.
pub struct NullHook;

impl PrintHook for NullHook {
    fn on_start(&mut self, _node: NodeId, _output_len: usize) {}
    fn on_end(&mut self, _node: NodeId, _output_len: usize) {}
}

/// Render the listing and the range tree tracking it.
pub fn render_listing(model: &ModelTree) -> Result<(String, RangeTree), BuildError> {
    let mut out = String::new();
    let mut builder = RangeTreeBuilder::new();
    print_tree(model, &mut out, &mut builder);
    let tree = builder.finish()?;
    Ok((out, tree))
}

/// Print the whole model tree, notifying `hook` of every printed node.
pub fn print_tree(model: &ModelTree, out: &mut String, hook: &mut impl PrintHook) {
    if let Some(root) = model.root() {
        print_node(model, root, out, hook, 0);
    }
}

fn print_node(
    model: &ModelTree,
    id: NodeId,
    out: &mut String,
    hook: &mut impl PrintHook,
    indent: usize,
) {
    hook.on_start(id, out.len());
    match model.kind(id) {
        NodeKind::Unit => {
            for (i, &item) in model.children(id).iter().enumerate() {
                if i > 0 {
                    out.push('\n');
                }
                print_node(model, item, out, hook, indent);
                out.push('\n');
            }
        }
        NodeKind::FunctionDeclaration { name } => {
            out.push_str("int ");
            out.push_str(name);
            print_parameters(model, id, out, hook, indent);
            out.push(';');
        }
        NodeKind::FunctionDefinition { name, .. } => {
            out.push_str("int ");
            out.push_str(name);
            print_parameters(model, id, out, hook, indent);
            out.push(' ');
            if let Some(&body) = model
                .children(id)
                .iter()
                .find(|&&c| matches!(model.kind(c), NodeKind::Block))
            {
                print_node(model, body, out, hook, indent);
            }
        }
        NodeKind::VariableDeclaration { name, type_name } => {
            out.push_str(type_name);
            out.push(' ');
            out.push_str(name);
        }
        NodeKind::Block => {
            out.push_str("{\n");
            for &stmt in model.children(id) {
                let pad = if matches!(model.kind(stmt), NodeKind::LabelStatement { .. }) {
                    indent
                } else {
                    indent + INDENT
                };
                out.push_str(&" ".repeat(pad));
                print_node(model, stmt, out, hook, indent + INDENT);
                if matches!(model.kind(stmt), NodeKind::VariableDeclaration { .. }) {
                    out.push(';');
                }
                out.push('\n');
            }
            out.push_str(&" ".repeat(indent));
            out.push('}');
        }
        NodeKind::ExprStatement { .. } => {
            for &child in model.children(id) {
                print_node(model, child, out, hook, indent);
            }
            out.push(';');
        }
        NodeKind::Return { .. } => {
            out.push_str("return");
            for &child in model.children(id) {
                out.push(' ');
                print_node(model, child, out, hook, indent);
            }
            out.push(';');
        }
        NodeKind::Goto { .. } => {
            out.push_str("goto ");
            for &child in model.children(id) {
                print_node(model, child, out, hook, indent);
            }
            out.push(';');
        }
        NodeKind::LabelStatement { .. } => {
            for &child in model.children(id) {
                print_node(model, child, out, hook, indent);
            }
            out.push(':');
        }
        NodeKind::Identifier { declaration, .. } => {
            out.push_str(model.name_of(*declaration).unwrap_or("<unnamed>"));
        }
        NodeKind::IntLiteral { value, .. } => {
            out.push_str(&value.to_string());
        }
        NodeKind::BinaryOp { op, .. } => {
            let children = model.children(id);
            if let [lhs, rhs] = children {
                print_node(model, *lhs, out, hook, indent);
                out.push(' ');
                out.push_str(op.symbol());
                out.push(' ');
                print_node(model, *rhs, out, hook, indent);
            }
        }
        NodeKind::Call { .. } => {
            let children = model.children(id);
            if let Some((&callee, args)) = children.split_first() {
                print_node(model, callee, out, hook, indent);
                out.push('(');
                for (i, &arg) in args.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    print_node(model, arg, out, hook, indent);
                }
                out.push(')');
            }
        }
        // Label declarations have no printed form of their own; the label
        // statement's identifier spells them.
        NodeKind::LabelDeclaration { .. } => {}
    }
    hook.on_end(id, out.len());
}

/// Parameter list of a function node: its variable-declaration children.
/// Label declarations hanging off the function are skipped; the block body
/// is printed by the caller.
fn print_parameters(
    model: &ModelTree,
    id: NodeId,
    out: &mut String,
    hook: &mut impl PrintHook,
    indent: usize,
) {
    out.push('(');
    let mut first = true;
    for &child in model.children(id) {
        if matches!(model.kind(child), NodeKind::VariableDeclaration { .. }) {
            if !first {
                out.push_str(", ");
            }
            print_node(model, child, out, hook, indent);
            first = false;
        }
    }
    out.push(')');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::demo;
    use crate::ranges::Span;
    use pretty_assertions::assert_eq;

    #[test]
    fn demo_program_renders_expected_listing() {
        let model = demo::demo_program();
        let (text, _tree) = render_listing(&model).unwrap();
        assert_eq!(text, demo::DEMO_LISTING);
    }

    #[test]
    fn root_span_covers_the_whole_listing() {
        let model = demo::demo_program();
        let (text, tree) = render_listing(&model).unwrap();
        let root = tree.root().unwrap();
        assert_eq!(tree.range_of(root), Some(Span::new(0, text.len())));
        assert_eq!(tree.len(), text.len());
        assert!(tree.check_invariants());
    }

    #[test]
    fn every_tracked_span_reproduces_its_text() {
        let model = demo::demo_program();
        let (text, tree) = render_listing(&model).unwrap();
        // Spot-check that identifier nodes cover exactly their spelling.
        let mut seen_x = 0;
        for id in tree.nodes_in(Span::new(0, text.len())) {
            let node = tree.data(id).unwrap();
            if let Some(decl) = model.declaration_of_identifier(node) {
                let span = tree.range_of(id).unwrap();
                assert_eq!(&text[span.to_range()], model.name_of(decl).unwrap());
                if model.name_of(decl) == Some("x") {
                    seen_x += 1;
                }
            }
        }
        assert_eq!(seen_x, 4);
    }

    #[test]
    fn label_declarations_are_never_printed() {
        let model = demo::demo_program();
        let (text, tree) = render_listing(&model).unwrap();
        // Labels are spelled by their statement's identifier; the
        // declaration itself has no printed form and thus no range.
        for id in tree.nodes_in(Span::new(0, text.len())) {
            let node = tree.data(id).unwrap();
            assert!(!matches!(
                model.kind(node),
                NodeKind::LabelDeclaration { .. }
            ));
        }
    }
}
