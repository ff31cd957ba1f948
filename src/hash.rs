// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The key hasher: stem bytes → 64-bit key.
//!
//! Keys are the only currency the filters see, and they are never written to
//! disk; only fingerprints derived from them are. That makes the hash
//! function part of the serialization contract: the builder and every query
//! environment (native and WASM) must compute bit-identical hashes, forever.
//!
//! The fixed choice is SipHash-1-3 with an all-zero 128-bit key. SipHash's
//! output is specified by the algorithm itself, so it cannot drift between
//! library versions or targets the way `std`'s `DefaultHasher` explicitly
//! may. Changing this function is a format break and requires a version bump
//! in the binary codec.

use std::hash::Hasher;

use siphasher::sip::SipHasher13;

/// Hash a UTF-8 stem (or any byte string) into a 64-bit filter key.
pub fn key_hash(bytes: &[u8]) -> u64 {
    let mut hasher = SipHasher13::new_with_keys(0, 0);
    hasher.write(bytes);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_input_identical_hash() {
        assert_eq!(key_hash(b"hallo"), key_hash(b"hallo"));
        assert_ne!(key_hash(b"hallo"), key_hash(b"welt"));
    }

    #[test]
    fn hash_depends_on_every_byte() {
        assert_ne!(key_hash(b"test"), key_hash(b"test "));
        assert_ne!(key_hash(b""), key_hash(b"\0"));
    }
}
