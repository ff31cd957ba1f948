// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Layered probabilistic full-text membership index.
//!
//! tamis answers one question fast and small: *which of my documents
//! probably contain these words?* Documents are inserted as raw text, the
//! index is built once offline, serialized into a compact binary stream, and
//! queried in the browser through a WebAssembly artifact. Membership answers
//! are approximate in one direction only: a controlled false-positive rate
//! is accepted, false negatives never happen.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────┐   ┌──────────┐
//! │ tokenize.rs  │──▶│  stem.rs  │──▶│ hash.rs  │   text → 64-bit keys
//! └──────────────┘   └───────────┘   └──────────┘
//!                                         │
//!                                         ▼
//! ┌──────────────┐   ┌─────────────────────────────┐
//! │  index.rs    │──▶│        layered.rs           │   three-level tree of
//! │ (TextIndex)  │   │ outer → divisions → per-doc │   binary fuse filters
//! └──────────────┘   └─────────────────────────────┘   (filter.rs)
//!        │                        │
//!        ▼                        ▼
//! ┌──────────────┐   ┌─────────────────────────────┐
//! │  binary.rs   │   │          wasm.rs            │
//! │ (.tamis file)│   │  (browser embedding)        │
//! └──────────────┘   └─────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use tamis::{IndexOptions, QueryOptions, TextIndex};
//!
//! let mut index = TextIndex::<u8>::new(&IndexOptions::default())?;
//! index.insert("Hallo welt");
//! index.insert("dies ist ein test");
//! index.index()?;
//!
//! assert!(index.contains("hallo")?);
//!
//! let mut results = Vec::new();
//! let hits = index.query("Hallo test", &mut results, QueryOptions::default())?;
//! assert_eq!(hits, 2);
//! # Ok::<(), tamis::Error>(())
//! ```
//!
//! The builder CLI (`tamis-index`, feature `cli`) produces the `.tamis`
//! file; the `wasm` feature exposes the browser-side chunked-upload /
//! init / search surface.

pub mod binary;
pub mod error;
pub mod filter;
pub mod hash;
pub mod index;
pub mod layered;
pub mod stem;
pub mod tokenize;

#[cfg(feature = "wasm")]
mod wasm;

// Re-exports for public API
pub use binary::{Payload, FORMAT_VERSION};
pub use error::{Error, Result};
pub use filter::{BinaryFuse, Fingerprint};
pub use hash::key_hash;
pub use index::{IndexOptions, QueryOptions, QueryType, TextIndex};
pub use layered::{InsertHandle, LayeredFilter, MID_LAYER_DIVISIONS};
pub use stem::Stemmer;
pub use tokenize::tokenize;

#[cfg(feature = "wasm")]
pub use wasm::{TamisModule, CHUNK_WINDOW};

#[cfg(test)]
mod tests {
    //! Crate-level property tests: the invariants every build of the index
    //! must satisfy regardless of corpus shape.

    use super::*;
    use proptest::prelude::*;

    fn build(corpus: &[String]) -> TextIndex {
        let mut index = TextIndex::new(&IndexOptions::default()).expect("default options");
        for text in corpus {
            index.insert(text);
        }
        index.index().expect("index construction");
        index
    }

    fn serialize(index: &TextIndex) -> Vec<u8> {
        let dir = tempfile::tempdir().unwrap();
        index.save(dir.path(), "p.tamis").unwrap();
        std::fs::read(dir.path().join("p.tamis")).unwrap()
    }

    fn corpus_strategy() -> impl Strategy<Value = Vec<String>> {
        let word = proptest::string::string_regex("[a-zä-ü]{2,8}").unwrap();
        let doc = prop::collection::vec(word, 1..6).prop_map(|words| words.join(" "));
        prop::collection::vec(doc, 1..8)
    }

    proptest! {
        #[test]
        fn no_false_negatives(corpus in corpus_strategy()) {
            let index = build(&corpus);
            for doc in &corpus {
                for word in doc.split(' ') {
                    prop_assert!(index.contains(word).unwrap(), "missing {word:?}");
                }
            }
        }

        #[test]
        fn identical_builds_serialize_identically(corpus in corpus_strategy()) {
            let a = build(&corpus);
            let b = build(&corpus);
            prop_assert_eq!(serialize(&a), serialize(&b));
        }

        #[test]
        fn round_trip_preserves_query_results(corpus in corpus_strategy()) {
            let index = build(&corpus);
            let bytes = serialize(&index);
            let loaded = TextIndex::<u8>::loads(&bytes, &IndexOptions::default()).unwrap();

            let query = corpus[0].split(' ').next().unwrap();
            let mut before = Vec::new();
            let mut after = Vec::new();
            index.query(query, &mut before, QueryOptions::default()).unwrap();
            loaded.query(query, &mut after, QueryOptions::default()).unwrap();
            prop_assert_eq!(before, after);
        }

        #[test]
        fn and_is_never_broader_than_or(corpus in corpus_strategy()) {
            let index = build(&corpus);
            let query = corpus[0].clone();
            let mut sink = Vec::new();
            let or_count = index.query(&query, &mut sink, QueryOptions::default()).unwrap();
            sink.clear();
            let and_count = index
                .query(&query, &mut sink, QueryOptions { query_type: QueryType::All })
                .unwrap();
            prop_assert!(and_count <= or_count);
        }

        #[test]
        fn single_token_and_equals_or(corpus in corpus_strategy()) {
            let index = build(&corpus);
            let word = corpus[0].split(' ').next().unwrap();

            let mut or_results = Vec::new();
            let mut and_results = Vec::new();
            let or_count = index
                .query(word, &mut or_results, QueryOptions::default())
                .unwrap();
            let and_count = index
                .query(word, &mut and_results, QueryOptions { query_type: QueryType::All })
                .unwrap();
            prop_assert_eq!(or_count, and_count);
            prop_assert_eq!(or_results, and_results);
        }
    }
}
