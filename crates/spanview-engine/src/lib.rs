pub mod document;
pub mod io;
pub mod model;
pub mod ranges;
pub mod render;

// Re-export key types for easier usage
pub use document::{Document, Edit, Patch};
pub use model::{InstrId, ModelTree, NodeId, NodeKind, Origin, StmtId, TermId};
pub use ranges::{BuildError, EditError, RangeId, RangeTree, RangeTreeBuilder, Span};
