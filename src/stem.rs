// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Snowball stemmer adapter.
//!
//! A thin wrapper around `rust-stemmers` keyed by the (language, encoding)
//! pair the index was configured with. The pair is part of the index
//! identity: stems feed the key hasher, so querying an index with a
//! different stemmer language produces keys that simply never match.
//! The pair is intentionally not serialized with the index (v1 format);
//! callers must pass the same options at load time.

use std::borrow::Cow;

use rust_stemmers::Algorithm;

use crate::error::{Error, Result};

/// The only character encoding this crate supports.
pub const UTF_8: &str = "UTF_8";

/// Stemmer for a single Snowball algorithm.
pub struct Stemmer {
    inner: rust_stemmers::Stemmer,
    language: String,
}

impl std::fmt::Debug for Stemmer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stemmer")
            .field("language", &self.language)
            .finish()
    }
}

impl Stemmer {
    /// Construct a stemmer for `language` (a Snowball algorithm name such as
    /// `"german"`) and `encoding` (must be `"UTF_8"`).
    ///
    /// Fails with [`Error::UnknownStemmer`] when the pair is unsupported.
    pub fn new(language: &str, encoding: &str) -> Result<Self> {
        if encoding != UTF_8 {
            return Err(Error::UnknownStemmer {
                language: language.to_string(),
                encoding: encoding.to_string(),
            });
        }

        let algorithm = algorithm_for(language).ok_or_else(|| Error::UnknownStemmer {
            language: language.to_string(),
            encoding: encoding.to_string(),
        })?;

        Ok(Self {
            inner: rust_stemmers::Stemmer::create(algorithm),
            language: language.to_string(),
        })
    }

    /// Map a lowercase token to its stem. Pure and deterministic.
    pub fn stem<'a>(&self, token: &'a str) -> Cow<'a, str> {
        self.inner.stem(token)
    }

    /// The Snowball algorithm name this stemmer was built with.
    pub fn language(&self) -> &str {
        &self.language
    }
}

fn algorithm_for(language: &str) -> Option<Algorithm> {
    let algorithm = match language {
        "arabic" => Algorithm::Arabic,
        "danish" => Algorithm::Danish,
        "dutch" => Algorithm::Dutch,
        "english" => Algorithm::English,
        "finnish" => Algorithm::Finnish,
        "french" => Algorithm::French,
        "german" => Algorithm::German,
        "greek" => Algorithm::Greek,
        "hungarian" => Algorithm::Hungarian,
        "italian" => Algorithm::Italian,
        "norwegian" => Algorithm::Norwegian,
        "portuguese" => Algorithm::Portuguese,
        "romanian" => Algorithm::Romanian,
        "russian" => Algorithm::Russian,
        "spanish" => Algorithm::Spanish,
        "swedish" => Algorithm::Swedish,
        "tamil" => Algorithm::Tamil,
        "turkish" => Algorithm::Turkish,
        _ => return None,
    };
    Some(algorithm)
}
