// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The text index façade.
//!
//! [`TextIndex`] couples the ingestion pipeline (tokenize → stem → hash) with
//! the layered membership filter. It is the type both the builder CLI and
//! the WASM artifact talk to:
//!
//! ```text
//! build:  text ─▶ tokenize ─▶ stem ─▶ key_hash ─▶ insert ─▶ index() ─▶ save
//! query:  load ─▶ text ─▶ tokenize ─▶ stem ─▶ key_hash ─▶ OR/AND query
//! ```
//!
//! The stemmer language and encoding are part of the index identity but are
//! not stored in the serialized file (v1 format); `load`/`loads` reconstruct
//! the stemmer from the options the caller passes, and passing a different
//! language yields keys that silently never match.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::filter::Fingerprint;
use crate::hash::key_hash;
use crate::layered::{InsertHandle, LayeredFilter};
use crate::stem::Stemmer;
use crate::tokenize::tokenize;

/// Runtime options for a [`TextIndex`].
///
/// Fingerprint width and division count are compile-time parameters and not
/// selectable here.
#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// Expected total key count across all documents; drives mid-layer
    /// division balancing. Order of magnitude is enough.
    pub estimated_keys: u64,
    /// Snowball algorithm name.
    pub language: String,
    /// Character encoding; only `"UTF_8"` is supported.
    pub charenc: String,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            estimated_keys: 100,
            language: "german".to_string(),
            charenc: "UTF_8".to_string(),
        }
    }
}

/// Conjunctive or disjunctive query semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryType {
    /// A document matches when it contains any query term.
    #[default]
    Any,
    /// A document matches when it contains every query term.
    All,
}

/// Options for [`TextIndex::query`].
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryOptions {
    pub query_type: QueryType,
}

/// A full-text membership index over short documents.
///
/// Write-once: `insert` documents, call [`TextIndex::index`] exactly once,
/// then `contains`/`query`/`save` at will.
pub struct TextIndex<F: Fingerprint = u8> {
    layered: LayeredFilter<F, Vec<u8>>,
    stemmer: Stemmer,
}

impl<F: Fingerprint> TextIndex<F> {
    /// Create an empty index. Fails with [`Error::UnknownStemmer`] when the
    /// options name an unsupported (language, encoding) pair.
    pub fn new(options: &IndexOptions) -> Result<Self> {
        Ok(Self {
            layered: LayeredFilter::new(options.estimated_keys),
            stemmer: Stemmer::new(&options.language, &options.charenc)?,
        })
    }

    /// Insert one document. The text is tokenized, stemmed and hashed into
    /// the document's key multiset; the raw text is kept as the document's
    /// result payload and comes back verbatim from matching queries.
    pub fn insert(&mut self, text: &str) -> InsertHandle {
        let keys = self.keys_of(text);
        self.layered.insert(keys, text.as_bytes().to_vec())
    }

    /// Build the filter tiers. Call exactly once, between the last `insert`
    /// and the first query.
    pub fn index(&mut self) -> Result<()> {
        self.layered.index()
    }

    /// Single-word membership probe against the outer filter.
    ///
    /// Fails with [`Error::EmptySearchWord`] when `word` tokenizes to
    /// nothing and [`Error::MoreThanOneWord`] when it tokenizes to more than
    /// one token; use [`TextIndex::query`] for multi-word lookups.
    pub fn contains(&self, word: &str) -> Result<bool> {
        let mut tokens = tokenize(word);
        let token = tokens.next().ok_or(Error::EmptySearchWord)?;
        if tokens.next().is_some() {
            return Err(Error::MoreThanOneWord);
        }
        let stem = self.stemmer.stem(&token);
        Ok(self.layered.contains(key_hash(stem.as_bytes())))
    }

    /// Run a multi-word query, appending each matching document's text to
    /// `sink` and returning the match count.
    ///
    /// Results arrive in (division index, insertion index) order. With
    /// [`QueryType::Any`] an empty query matches nothing; with
    /// [`QueryType::All`] it trivially matches every document.
    pub fn query(
        &self,
        term: &str,
        sink: &mut Vec<String>,
        options: QueryOptions,
    ) -> Result<usize> {
        let keys = self.keys_of(term);

        let mut hits: Vec<&Vec<u8>> = Vec::new();
        let count = match options.query_type {
            QueryType::Any => self.layered.query_logical_or(&keys, Some(&mut hits)),
            QueryType::All => self.layered.query_logical_and(&keys, Some(&mut hits)),
        };

        sink.extend(
            hits.into_iter()
                .map(|bytes| String::from_utf8_lossy(bytes).into_owned()),
        );
        Ok(count)
    }

    /// Total heap footprint of the layered filter.
    pub fn size_in_bytes(&self) -> usize {
        self.layered.size_in_bytes()
    }

    /// Number of inserted documents.
    pub fn len(&self) -> usize {
        self.layered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layered.is_empty()
    }

    /// Serialize the index to `dir/filename`.
    ///
    /// Writes to a temporary file in the same directory and renames it over
    /// the target, so a concurrent reader never observes a torn file.
    pub fn save(&self, dir: &Path, filename: &str) -> Result<()> {
        let target = dir.join(filename);
        let tmp = dir.join(format!("{filename}.tmp"));

        let mut file = fs::File::create(&tmp)?;
        if let Err(err) = self.layered.write_to(&mut file) {
            drop(file);
            let _ = fs::remove_file(&tmp);
            return Err(err);
        }
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp, &target)?;
        Ok(())
    }

    /// Load an index from `dir/filename`. `options` must carry the same
    /// language/encoding the index was built with.
    pub fn load(dir: &Path, filename: &str, options: &IndexOptions) -> Result<Self> {
        let mut file = fs::File::open(dir.join(filename))?;
        Ok(Self {
            layered: LayeredFilter::read_from(&mut file)?,
            stemmer: Stemmer::new(&options.language, &options.charenc)?,
        })
    }

    /// Like [`TextIndex::load`], over a caller-provided byte buffer.
    pub fn loads(bytes: &[u8], options: &IndexOptions) -> Result<Self> {
        let mut cursor = bytes;
        Ok(Self {
            layered: LayeredFilter::read_from(&mut cursor)?,
            stemmer: Stemmer::new(&options.language, &options.charenc)?,
        })
    }

    /// tokenize → stem → hash, preserving the multiset.
    fn keys_of(&self, text: &str) -> Vec<u64> {
        tokenize(text)
            .map(|token| key_hash(self.stemmer.stem(&token).as_bytes()))
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================
