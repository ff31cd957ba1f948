// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Error types for the tamis index.
//!
//! Everything fallible in the crate funnels into [`Error`]. The core never
//! swallows an error: tokenization, stemming, filter construction and the
//! binary codec all propagate to the caller, who decides whether the failure
//! is recoverable (a malformed query, a stale index file) or fatal (a filter
//! build that did not converge).

use std::io;

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for all tamis operations.
#[derive(Error, Debug)]
pub enum Error {
    /// `contains` was given text that tokenizes to nothing.
    #[error("search word is empty")]
    EmptySearchWord,

    /// `contains` was given more than one word; use `query` for multi-word
    /// lookups.
    #[error("contains() takes a single word, got several")]
    MoreThanOneWord,

    /// The (language, encoding) pair is not a supported Snowball algorithm.
    #[error("unknown stemmer: language {language:?}, encoding {encoding:?}")]
    UnknownStemmer { language: String, encoding: String },

    /// Binary-fuse construction did not converge on the supplied key set.
    /// Almost always means duplicate keys survived the uniqueness pass.
    #[error("binary fuse filter construction failed")]
    ConstructionFailed,

    /// The serialized stream ended before the decoder was done.
    #[error("unexpected end of stream")]
    EndOfStream,

    /// The serialized stream carries a format version this build does not
    /// understand.
    #[error("unsupported index version {found} (expected {expected})")]
    VersionMismatch { found: u16, expected: u16 },

    /// The serialized stream was built with different compile-time filter
    /// options (fingerprint width, division count).
    #[error("index options mismatch: {0}")]
    OptionsMismatch(String),

    /// A query or save was issued before `index()` built the filters.
    #[error("index() has not been called")]
    NotIndexed,

    /// Underlying filesystem failure during save/load.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Map decoder-side I/O errors: a short read is a truncated stream, not
    /// a filesystem fault.
    pub(crate) fn from_read(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Error::EndOfStream
        } else {
            Error::Io(err)
        }
    }
}
