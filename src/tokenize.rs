// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Whitespace tokenization with Unicode-aware case folding.
//!
//! The tokenizer is deliberately minimal and is part of the index's
//! observable contract: the same byte-identical string must produce the same
//! token sequence at build time and at query time, in the native builder and
//! in the WASM artifact. Tokens are maximal runs of non-space code points;
//! the only separator is the ASCII space (U+0020). Lowercasing uses the full
//! Unicode case tables (`HELLO` → `hello`, `Ölung` → `ölung`); there is no
//! NFC/NFKC normalization and no diacritic folding.

/// Split `text` into non-empty lowercase tokens.
///
/// Runs of consecutive spaces yield no empty tokens. Non-letter runs (for
/// example `123`) come through unchanged as single tokens.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(' ')
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}
