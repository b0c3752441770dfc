//! Property tests over random edit sequences: whatever the edits, the
//! tracked spans must stay inside the text and the buffer and tree must
//! agree on its length.

use proptest::prelude::*;
use spanview_engine::model::demo::{demo_program, DEMO_LISTING};
use spanview_engine::{Document, Edit, Span};

proptest! {
    #[test]
    fn random_edits_keep_spans_inside_the_text(
        ops in prop::collection::vec(
            (any::<usize>(), any::<usize>(), "[a-z ;=]{0,8}"),
            1..40,
        )
    ) {
        let mut doc = Document::new(demo_program()).unwrap();
        for (at_seed, removed_seed, inserted) in ops {
            let len = doc.len();
            let at = at_seed % (len + 1);
            let removed = removed_seed % (len - at + 1);
            doc.apply(&Edit::replace(at, removed, inserted)).unwrap();
        }

        let len = doc.len();
        prop_assert_eq!(doc.text().len(), len);
        // The root span accounts for the whole text as long as it survives.
        if let Some(root) = doc.model().root()
            && let Some(root_span) = doc.range_of(root)
        {
            prop_assert_eq!(root_span, Span::new(0, len));
        }
        for node in doc.nodes_in(Span::new(0, len)) {
            let span = doc.range_of(node);
            prop_assert!(span.is_some());
            let span = span.unwrap();
            prop_assert!(span.end <= len, "span {} escapes text of length {}", span, len);
        }
    }

    #[test]
    fn surviving_nodes_stay_inside_their_parents(
        ops in prop::collection::vec((any::<usize>(), any::<usize>()), 1..30)
    ) {
        let mut doc = Document::new(demo_program()).unwrap();
        for (at_seed, removed_seed) in ops {
            let len = doc.len();
            let at = at_seed % (len + 1);
            let removed = removed_seed % (len - at + 1);
            doc.apply(&Edit::delete(at, removed)).unwrap();
        }

        for node in doc.nodes_in(Span::new(0, doc.len())) {
            let span = doc.range_of(node).unwrap();
            let mut parent = doc.model().parent(node);
            while let Some(p) = parent {
                if let Some(parent_span) = doc.range_of(p) {
                    prop_assert!(parent_span.contains_span(span));
                    break;
                }
                parent = doc.model().parent(p);
            }
        }
    }

    #[test]
    fn insert_then_delete_restores_the_text(
        at_seed in any::<usize>(),
        inserted in "[a-z]{1,8}",
    ) {
        let mut doc = Document::new(demo_program()).unwrap();
        let at = at_seed % (doc.len() + 1);
        doc.apply(&Edit::insert(at, inserted.clone())).unwrap();
        doc.apply(&Edit::delete(at, inserted.len())).unwrap();
        prop_assert_eq!(doc.text(), DEMO_LISTING);
    }

    // Pins the boundary tie-break: an insertion on a boundary shared by two
    // siblings lands in the one starting there, matching the half-open
    // leaf-at rule, so the answer of leaf_at never drifts across an edit.
    #[test]
    fn boundary_insertions_agree_with_leaf_at(
        at_seed in any::<usize>(),
        inserted in "[a-z]{1,5}",
    ) {
        let mut doc = Document::new(demo_program()).unwrap();
        let at = at_seed % doc.len();
        let before = doc.leaf_at(at);
        doc.apply(&Edit::insert(at, inserted)).unwrap();
        let after = doc.leaf_at(at);
        prop_assert_eq!(before, after);
    }
}
