/*!
 * # Range tracking core
 *
 * This module keeps a precise, queryable correspondence between byte offsets
 * in a rendered listing and the model-tree nodes that produced them, and
 * keeps that correspondence correct while the text is edited afterwards.
 *
 * ## Architecture Overview
 *
 * ### 1. Arena of RangeNodes with stable handles
 * - Every tracked node lives in a flat arena addressed by `RangeId`
 * - A node stores its parent handle, ordered child handles, its **length**
 *   and its start offset **relative to its parent** — never an absolute
 *   offset
 * - Absolute offsets are derived on demand by accumulating offsets along the
 *   root-to-node path, so a single edit only touches the nodes on the edit
 *   path (plus the siblings behind it), not the whole tree
 *
 * ### 2. Building mirrors the printer's call nesting
 * - The printer announces `on_start`/`on_end` with the output length at that
 *   instant; strictly nested pairs become the tree structure
 * - Mismatched nesting is a caller bug and surfaces as a typed `BuildError`
 *
 * ### 3. Queries are half-open
 * - Spans are `[start, end)`; a position on a shared sibling boundary
 *   belongs to the **later** sibling
 * - Positions in text a parent printed between its children (indentation,
 *   punctuation) answer the parent — the "unattributed gap" case
 *
 * ### 4. Edits mutate lengths and offsets, never identities
 * - `handle_insertion` grows the deepest containing node and its ancestors;
 *   `handle_removal` deletes fully-covered nodes and shrinks the overlapped
 *   ones
 * - `RangeId`s survive every edit; a deleted node's handle simply stops
 *   resolving, so lookup tables built once per render stay valid
 *
 * ## Module Structure
 *
 * - **`span`**: half-open byte interval with containment/overlap helpers
 * - **`tree`**: the `RangeNode` arena, point/range queries, edit application
 * - **`builder`**: turns printer start/end notifications into a `RangeTree`
 */

pub mod builder;
pub mod span;
pub mod tree;

pub use builder::{BuildError, RangeTreeBuilder};
pub use span::Span;
pub use tree::{EditError, RangeId, RangeTree};
