//! End-to-end tests for the tamis index.
//!
//! These walk the whole pipeline the way the builder and the browser
//! artifact do: insert raw German text, build, probe, query, serialize,
//! reload, and check that nothing observable changed.

use tamis::{Error, IndexOptions, QueryOptions, QueryType, TextIndex};

fn german_corpus(texts: &[&str]) -> TextIndex {
    let mut index = TextIndex::new(&IndexOptions::default()).expect("default options are valid");
    for text in texts {
        index.insert(text);
    }
    index.index().expect("index construction");
    index
}

// ============================================================================
// MEMBERSHIP PROBES
// ============================================================================

#[test]
fn contains_after_indexing_two_documents() {
    let index = german_corpus(&["Hallo welt", "dies ist ein test"]);

    assert!(index.contains("Hallo").unwrap());
    assert!(index.contains("hallo").unwrap());
    assert!(index.contains("test").unwrap());
    assert!(!index.contains("boo").unwrap());
}

#[test]
fn contains_rejects_multi_word_and_empty_probes() {
    let index = german_corpus(&["Hallo welt", "dies ist ein test"]);

    assert!(matches!(
        index.contains("Hallo googog"),
        Err(Error::MoreThanOneWord)
    ));
    assert!(matches!(
        index.contains("        "),
        Err(Error::EmptySearchWord)
    ));
}

// ============================================================================
// QUERIES
// ============================================================================

#[test]
fn or_query_returns_both_matching_documents() {
    let index = german_corpus(&["Hallo welt", "dies ist ein test"]);

    let mut results = Vec::new();
    let count = index
        .query("Hallo test", &mut results, QueryOptions::default())
        .unwrap();
    assert_eq!(count, 2);
    assert_eq!(results, vec!["Hallo welt", "dies ist ein test"]);

    let mut results = Vec::new();
    let count = index
        .query("boo", &mut results, QueryOptions::default())
        .unwrap();
    assert_eq!(count, 0);
    assert!(results.is_empty());
}

#[test]
fn and_query_returns_only_the_document_with_every_term() {
    let index = german_corpus(&["Hallo welt test", "dies ist ein test"]);

    let mut results = Vec::new();
    let count = index
        .query(
            "Hallo test",
            &mut results,
            QueryOptions {
                query_type: QueryType::All,
            },
        )
        .unwrap();
    assert_eq!(count, 1);
    assert_eq!(results, vec!["Hallo welt test"]);
}

#[test]
fn empty_and_query_matches_the_whole_corpus() {
    let index = german_corpus(&["eins", "zwei", "drei"]);

    let mut results = Vec::new();
    let count = index
        .query(
            "",
            &mut results,
            QueryOptions {
                query_type: QueryType::All,
            },
        )
        .unwrap();
    assert_eq!(count, 3);
    assert_eq!(results, vec!["eins", "zwei", "drei"]);
}

// ============================================================================
// PERSISTENCE
// ============================================================================

#[test]
fn save_load_preserves_every_membership_observation() {
    let dir = tempfile::tempdir().unwrap();
    let index = german_corpus(&["Hallo welt", "dies ist ein test"]);
    index.save(dir.path(), "corpus.tamis").unwrap();

    let loaded =
        TextIndex::<u8>::load(dir.path(), "corpus.tamis", &IndexOptions::default()).unwrap();

    assert!(loaded.contains("Hallo").unwrap());
    assert!(loaded.contains("hallo").unwrap());
    assert!(loaded.contains("test").unwrap());
    assert!(!loaded.contains("boo").unwrap());

    let mut before = Vec::new();
    let mut after = Vec::new();
    index
        .query("Hallo test", &mut before, QueryOptions::default())
        .unwrap();
    loaded
        .query("Hallo test", &mut after, QueryOptions::default())
        .unwrap();
    assert_eq!(before, after);
}

#[test]
fn save_leaves_no_temp_file_behind() {
    let dir = tempfile::tempdir().unwrap();
    let index = german_corpus(&["Hallo welt"]);
    index.save(dir.path(), "corpus.tamis").unwrap();

    let entries: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(entries, vec!["corpus.tamis"]);
}

#[test]
fn identical_corpora_produce_byte_identical_files() {
    let dir = tempfile::tempdir().unwrap();
    let texts = ["Hallo welt", "dies ist ein test", "noch ein dokument"];

    german_corpus(&texts).save(dir.path(), "a.tamis").unwrap();
    german_corpus(&texts).save(dir.path(), "b.tamis").unwrap();

    let a = std::fs::read(dir.path().join("a.tamis")).unwrap();
    let b = std::fs::read(dir.path().join("b.tamis")).unwrap();
    assert_eq!(a, b);
}

// ============================================================================
// TOKENIZER CONTRACT
// ============================================================================

#[test]
fn tokenizer_literal_from_the_format_contract() {
    let tokens: Vec<String> = tamis::tokenize("HELLO über Ölung     123      ").collect();
    assert_eq!(tokens, vec!["hello", "über", "ölung", "123"]);
}

// ============================================================================
// LARGER CORPUS
// ============================================================================

#[test]
fn hundred_documents_queryable_after_round_trip() {
    let texts: Vec<String> = (0..100)
        .map(|i| format!("dokument nummer{} enthält wort{} und wort{}", i, i, i % 10))
        .collect();

    let options = IndexOptions {
        estimated_keys: 500,
        ..IndexOptions::default()
    };
    let mut index = TextIndex::<u8>::new(&options).unwrap();
    for text in &texts {
        index.insert(text);
    }
    index.index().unwrap();

    let dir = tempfile::tempdir().unwrap();
    index.save(dir.path(), "big.tamis").unwrap();
    let loaded = TextIndex::<u8>::load(dir.path(), "big.tamis", &options).unwrap();

    // Every per-document word is found, before and after the round trip.
    for i in [0usize, 17, 42, 99] {
        let word = format!("nummer{i}");
        assert!(index.contains(&word).unwrap());
        assert!(loaded.contains(&word).unwrap());
    }

    // A shared word matches all ten documents that carry it.
    let mut results = Vec::new();
    let count = loaded
        .query("wort3", &mut results, QueryOptions::default())
        .unwrap();
    assert!(count >= 10, "expected at least 10 matches, got {count}");
}
