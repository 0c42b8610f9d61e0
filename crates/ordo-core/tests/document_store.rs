//! Store-level invariants: versioning, clamping, and derived-state consistency.

use ordo_core::document::{
    DirtyRegion, DocumentChange, DocumentStore, RangeEdit, StoreError, SyncMode,
};
use ordo_core::lexer::lex;
use ordo_core::symbols::SymbolTable;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const URI: &str = "file:///pipeline.ordo";

fn edit(start: usize, end: usize, text: &str) -> DocumentChange {
    DocumentChange::Incremental(vec![RangeEdit {
        start,
        end,
        text: text.to_string(),
    }])
}

#[test]
fn stale_versions_leave_state_at_the_last_accepted_version() {
    let mut store = DocumentStore::new(SyncMode::Incremental);
    store.open(URI, "let a = 1;", 1);

    store.apply_edit(URI, 2, &edit(10, 10, " let b = 2;")).unwrap();
    store.apply_edit(URI, 3, &edit(21, 21, " let c = 3;")).unwrap();

    // A change for version 2 after version 3 was accepted is stale.
    let err = store.apply_edit(URI, 2, &edit(0, 0, "x")).unwrap_err();
    assert!(matches!(
        err,
        StoreError::StaleVersion {
            current: 3,
            received: 2,
            ..
        }
    ));

    let doc = store.get(URI).unwrap();
    assert_eq!(doc.version(), 3);
    assert_eq!(doc.text().to_string(), "let a = 1; let b = 2; let c = 3;");
    assert!(doc.symbols().is_declared("c"));
}

#[test]
fn out_of_bounds_ranges_are_clamped_not_fatal() {
    let mut store = DocumentStore::new(SyncMode::Incremental);
    store.open(URI, "let a = 1;", 1);
    store.apply_edit(URI, 2, &edit(8, 9999, "2;")).unwrap();
    let doc = store.get(URI).unwrap();
    assert_eq!(doc.text().to_string(), "let a = 2;");
    assert!(doc.tokens().is_contiguous(doc.char_len()));
}

#[test]
fn batched_edits_apply_in_order_and_invalidate_fully() {
    let mut store = DocumentStore::new(SyncMode::Incremental);
    store.open(URI, "let a = 1;", 1);
    let change = DocumentChange::Incremental(vec![
        RangeEdit {
            start: 4,
            end: 5,
            text: "total".to_string(),
        },
        RangeEdit {
            start: 12,
            end: 13,
            text: "2".to_string(),
        },
    ]);
    let outcome = store.apply_edit(URI, 2, &change).unwrap();
    assert_eq!(outcome.dirty, DirtyRegion::Full);
    let doc = store.get(URI).unwrap();
    assert_eq!(doc.text().to_string(), "let total = 2;");
    assert!(doc.symbols().is_declared("total"));
}

#[test]
fn reopening_replaces_state_wholesale() {
    let mut store = DocumentStore::new(SyncMode::Incremental);
    store.open(URI, "let a = 1;", 5);
    store.open(URI, "let b = 2;", 1);
    let doc = store.get(URI).unwrap();
    assert_eq!(doc.version(), 1);
    assert!(!doc.symbols().is_declared("a"));
    assert!(doc.symbols().is_declared("b"));
}

/// Incremental symbol updates must agree with a from-scratch rebuild after
/// arbitrary single-character edits.
#[test]
fn incremental_symbols_match_rebuild_under_random_edits() {
    const ALPHABET: &[char] = &[
        'a', 'b', 'c', '_', ' ', '\n', '.', ';', '=', '(', ')', 'l', 'e', 't', 'p', 'h', 's',
        'k', '1',
    ];
    let mut rng = StdRng::seed_from_u64(9);

    for _ in 0..40 {
        let seed: String = (0..60)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())])
            .collect();
        let mut store = DocumentStore::new(SyncMode::Incremental);
        store.open(URI, &seed, 1);

        for version in 2..30 {
            let len = store.get(URI).unwrap().char_len();
            let start = rng.gen_range(0..=len);
            let (end, text) = if rng.gen_bool(0.5) && start < len {
                (start + 1, String::new())
            } else {
                (start, ALPHABET[rng.gen_range(0..ALPHABET.len())].to_string())
            };
            store.apply_edit(URI, version, &edit(start, end, &text)).unwrap();

            let doc = store.get(URI).unwrap();
            let rebuilt = SymbolTable::from_tokens(doc.tokens().tokens());
            assert_eq!(
                *doc.symbols(),
                rebuilt,
                "incremental symbols diverged for text {:?}",
                doc.text().to_string()
            );
        }
    }
}

#[test]
fn token_cache_matches_full_lex_after_store_edits() {
    let mut store = DocumentStore::new(SyncMode::Incremental);
    store.open(URI, "phase load {\n  let u = data_loader.getData(universe)\n}", 1);
    store.apply_edit(URI, 2, &edit(15, 15, "  let w = 1;\n")).unwrap();
    store.apply_edit(URI, 3, &edit(0, 5, "task")).unwrap();
    let doc = store.get(URI).unwrap();
    assert_eq!(*doc.tokens(), lex(&doc.text().to_string()));
}
