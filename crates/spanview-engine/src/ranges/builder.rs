use thiserror::Error;

use crate::model::NodeId;
use crate::ranges::tree::{RangeId, RangeNode, RangeTree};
use crate::render::PrintHook;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BuildError {
    #[error("end notification for {node:?} without a matching start")]
    UnmatchedEnd { node: NodeId },
    #[error("end notification for {got:?} while {open:?} is still open")]
    MisnestedEnd { open: NodeId, got: NodeId },
    #[error("output length moved backwards for {node:?}: started at {start}, ended at {end}")]
    NegativeLength {
        node: NodeId,
        start: usize,
        end: usize,
    },
    #[error("{node:?} closed as a second top-level node; tracked nodes must share one root")]
    MultipleRoots { node: NodeId },
    #[error("{count} start notification(s) still open when building finished")]
    UnclosedFrames { count: usize },
}

/// Open start/end pair: the node being printed and the output length at the
/// moment printing started.
#[derive(Debug)]
struct Frame {
    data: NodeId,
    start: usize,
    children: Vec<RangeId>,
}

/// Constructs a [`RangeTree`] from the start/end notifications of a printer
/// performing a depth-first traversal of the model tree. The nesting of the
/// notifications becomes the nesting of the tree.
///
/// Mismatched notifications are caller bugs and reported as [`BuildError`]s;
/// when driven through the infallible [`PrintHook`] surface the first
/// violation is remembered and returned by [`finish`](Self::finish).
#[derive(Debug, Default)]
pub struct RangeTreeBuilder {
    nodes: Vec<RangeNode>,
    stack: Vec<Frame>,
    root: Option<RangeId>,
    error: Option<BuildError>,
}

impl RangeTreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Printing of `node` started with `output_len` bytes already emitted.
    pub fn start(&mut self, node: NodeId, output_len: usize) {
        self.stack.push(Frame {
            data: node,
            start: output_len,
            children: Vec::new(),
        });
    }

    /// Printing of `node` finished with `output_len` bytes emitted in total.
    pub fn end(&mut self, node: NodeId, output_len: usize) -> Result<(), BuildError> {
        let frame = self
            .stack
            .pop()
            .ok_or(BuildError::UnmatchedEnd { node })?;
        if frame.data != node {
            return Err(BuildError::MisnestedEnd {
                open: frame.data,
                got: node,
            });
        }
        if output_len < frame.start {
            return Err(BuildError::NegativeLength {
                node,
                start: frame.start,
                end: output_len,
            });
        }

        let id = RangeId(self.nodes.len() as u32);
        for &child in &frame.children {
            self.nodes[child.index()].parent = Some(id);
            // Children carried absolute starts until now; rebase onto the
            // parent.
            self.nodes[child.index()].offset -= frame.start;
        }
        self.nodes.push(RangeNode {
            data: node,
            offset: frame.start,
            length: output_len - frame.start,
            parent: None,
            children: frame.children,
            live: true,
        });

        match self.stack.last_mut() {
            Some(parent) => parent.children.push(id),
            None => {
                if self.root.is_some() {
                    return Err(BuildError::MultipleRoots { node });
                }
                self.root = Some(id);
            }
        }
        Ok(())
    }

    pub fn finish(self) -> Result<RangeTree, BuildError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        if !self.stack.is_empty() {
            return Err(BuildError::UnclosedFrames {
                count: self.stack.len(),
            });
        }
        Ok(RangeTree::new(self.nodes, self.root))
    }
}

impl PrintHook for RangeTreeBuilder {
    fn on_start(&mut self, node: NodeId, output_len: usize) {
        if self.error.is_none() {
            self.start(node, output_len);
        }
    }

    fn on_end(&mut self, node: NodeId, output_len: usize) {
        if self.error.is_none()
            && let Err(error) = self.end(node, output_len)
        {
            self.error = Some(error);
        }
    }
}
