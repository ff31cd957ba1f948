// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Binary-fuse approximate-membership filter over 64-bit keys.
//!
//! A 3-wise binary fuse filter: every key XORs one fingerprint out of each of
//! three segments, and membership holds when the three stored fingerprints
//! XOR back to the key's own fingerprint. No false negatives; false positives
//! at roughly `2^-F` for an `F`-bit fingerprint width.
//!
//! Construction peels the 3-uniform hypergraph induced by the key set: slots
//! referenced by exactly one remaining key are resolved and removed until
//! either every key has been placed (success) or a 2-core remains. A 2-core
//! with a fresh seed almost always means the input contained duplicate keys,
//! which is why [`BinaryFuse::populate`] demands a de-duplicated set and
//! reports [`Error::ConstructionFailed`] once the retry budget is exhausted.
//!
//! Construction is deterministic: the seed sequence starts from a fixed
//! constant, so the same key set always yields the same filter bytes. The
//! serialized index format depends on this.

use std::fmt;
use std::mem;
use std::ops::{BitXor, BitXorAssign};

use crate::error::{Error, Result};

/// Largest segment the layout will use, as in the reference binary fuse
/// construction.
const MAX_SEGMENT_LENGTH: u32 = 1 << 18;

/// Re-seeding attempts before construction gives up.
const MAX_POPULATE_ATTEMPTS: usize = 100;

/// Initial state of the deterministic seed sequence.
const SEED_COUNTER: u64 = 0x726b_2b9d_438b_9d4d;

/// Fingerprint word stored per slot. Implemented for `u8`, `u16` and `u32`.
pub trait Fingerprint:
    Copy + Default + PartialEq + BitXor<Output = Self> + BitXorAssign + fmt::Debug + Send + Sync + 'static
{
    /// Fingerprint width in bits; part of the serialized type identity.
    const BITS: u16;
    /// Width in bytes on the wire.
    const BYTES: usize;

    fn from_hash(hash: u64) -> Self;
    fn to_word(self) -> u32;
    fn from_word(word: u32) -> Self;
}

impl Fingerprint for u8 {
    const BITS: u16 = 8;
    const BYTES: usize = 1;

    #[inline]
    fn from_hash(hash: u64) -> Self {
        fingerprint_of(hash) as u8
    }

    #[inline]
    fn to_word(self) -> u32 {
        self as u32
    }

    #[inline]
    fn from_word(word: u32) -> Self {
        word as u8
    }
}

impl Fingerprint for u16 {
    const BITS: u16 = 16;
    const BYTES: usize = 2;

    #[inline]
    fn from_hash(hash: u64) -> Self {
        fingerprint_of(hash) as u16
    }

    #[inline]
    fn to_word(self) -> u32 {
        self as u32
    }

    #[inline]
    fn from_word(word: u32) -> Self {
        word as u16
    }
}

impl Fingerprint for u32 {
    const BITS: u16 = 32;
    const BYTES: usize = 4;

    #[inline]
    fn from_hash(hash: u64) -> Self {
        fingerprint_of(hash) as u32
    }

    #[inline]
    fn to_word(self) -> u32 {
        self
    }

    #[inline]
    fn from_word(word: u32) -> Self {
        word
    }
}

/// A static 3-wise binary fuse filter for 64-bit keys.
pub struct BinaryFuse<F: Fingerprint> {
    seed: u64,
    segment_length: u32,
    segment_length_mask: u32,
    segment_count: u32,
    segment_count_length: u32,
    fingerprints: Vec<F>,
}

impl<F: Fingerprint> BinaryFuse<F> {
    /// Create an unpopulated filter whose layout is sized for
    /// `expected_keys` keys. The actual key set handed to
    /// [`BinaryFuse::populate`] may be smaller (de-duplication only removes
    /// keys), which leaves extra slack in the slot array.
    pub fn with_capacity(expected_keys: usize) -> Self {
        let size = u32::try_from(expected_keys).unwrap_or(u32::MAX);

        let segment_length = if size == 0 {
            4
        } else {
            calculate_segment_length(size).min(MAX_SEGMENT_LENGTH)
        };
        let segment_length_mask = segment_length - 1;

        let capacity = if size <= 1 {
            0
        } else {
            (f64::from(size) * calculate_size_factor(size)).round() as u32
        };

        let init_segment_count =
            ((capacity + segment_length - 1) / segment_length).saturating_sub(2);
        let array_length = (init_segment_count + 2) * segment_length;
        let mut segment_count = (array_length + segment_length - 1) / segment_length;
        segment_count = if segment_count <= 2 {
            1
        } else {
            segment_count - 2
        };
        let array_length = (segment_count + 2) * segment_length;
        let segment_count_length = segment_count * segment_length;

        Self {
            seed: 0,
            segment_length,
            segment_length_mask,
            segment_count,
            segment_count_length,
            fingerprints: vec![F::default(); array_length as usize],
        }
    }

    /// Build the filter over `keys`.
    ///
    /// `keys` must be free of duplicates; duplicate keys leave an unpeelable
    /// 2-core under every seed and surface as [`Error::ConstructionFailed`].
    pub fn populate(&mut self, keys: &[u64]) -> Result<()> {
        if keys.is_empty() {
            self.seed = 0;
            self.fingerprints.fill(F::default());
            return Ok(());
        }

        let mut counter = SEED_COUNTER;
        for _ in 0..MAX_POPULATE_ATTEMPTS {
            self.seed = rng_splitmix64(&mut counter);
            if self.try_populate(keys) {
                return Ok(());
            }
        }

        Err(Error::ConstructionFailed)
    }

    /// Returns true when `key` is possibly in the set, false when it is
    /// definitely not.
    #[inline]
    pub fn contains(&self, key: u64) -> bool {
        let hash = mix_split(key, self.seed);
        let mut fp = F::from_hash(hash);
        let [h0, h1, h2] = self.hash_batch(hash);
        fp ^= self.fingerprints[h0];
        fp ^= self.fingerprints[h1];
        fp ^= self.fingerprints[h2];
        fp == F::default()
    }

    /// In-memory footprint: the struct itself plus the fingerprint array.
    pub fn size_in_bytes(&self) -> usize {
        mem::size_of::<Self>() + self.fingerprints.len() * mem::size_of::<F>()
    }

    /// One peeling attempt under the current seed.
    fn try_populate(&mut self, keys: &[u64]) -> bool {
        let capacity = self.fingerprints.len();
        let mut slot_count = vec![0u32; capacity];
        let mut slot_xor = vec![0u64; capacity];

        for &key in keys {
            let hash = mix_split(key, self.seed);
            for slot in self.hash_batch(hash) {
                slot_count[slot] += 1;
                slot_xor[slot] ^= hash;
            }
        }

        let mut queue: Vec<u32> = (0..capacity as u32)
            .filter(|&slot| slot_count[slot as usize] == 1)
            .collect();
        let mut stack: Vec<(u64, u32)> = Vec::with_capacity(keys.len());

        while let Some(slot) = queue.pop() {
            let slot = slot as usize;
            if slot_count[slot] != 1 {
                continue;
            }
            // The lone remaining hash on this slot is whatever is left in
            // the XOR accumulator.
            let hash = slot_xor[slot];
            stack.push((hash, slot as u32));
            for other in self.hash_batch(hash) {
                slot_count[other] -= 1;
                slot_xor[other] ^= hash;
                if slot_count[other] == 1 {
                    queue.push(other as u32);
                }
            }
        }

        if stack.len() != keys.len() {
            return false;
        }

        self.fingerprints.fill(F::default());
        for &(hash, slot) in stack.iter().rev() {
            let [h0, h1, h2] = self.hash_batch(hash);
            // fingerprints[slot] is still zero here, so XOR-ing all three
            // cells folds in exactly the other two.
            let fp = F::from_hash(hash)
                ^ self.fingerprints[h0]
                ^ self.fingerprints[h1]
                ^ self.fingerprints[h2];
            self.fingerprints[slot as usize] = fp;
        }

        true
    }

    /// The three slot indexes of `hash`, one per consecutive segment window.
    #[inline]
    fn hash_batch(&self, hash: u64) -> [usize; 3] {
        let h0 = mulhi(hash, u64::from(self.segment_count_length)) as u32;
        let mut h1 = h0 + self.segment_length;
        let mut h2 = h1 + self.segment_length;
        h1 ^= ((hash >> 18) as u32) & self.segment_length_mask;
        h2 ^= (hash as u32) & self.segment_length_mask;
        [h0 as usize, h1 as usize, h2 as usize]
    }

    // -- accessors used by the binary codec ---------------------------------

    pub(crate) fn seed(&self) -> u64 {
        self.seed
    }

    pub(crate) fn segment_length(&self) -> u32 {
        self.segment_length
    }

    pub(crate) fn segment_length_mask(&self) -> u32 {
        self.segment_length_mask
    }

    pub(crate) fn segment_count(&self) -> u32 {
        self.segment_count
    }

    pub(crate) fn segment_count_length(&self) -> u32 {
        self.segment_count_length
    }

    pub(crate) fn fingerprints(&self) -> &[F] {
        &self.fingerprints
    }

    /// Reassemble a filter from its serialized fields.
    pub(crate) fn from_parts(
        seed: u64,
        segment_length: u32,
        segment_length_mask: u32,
        segment_count: u32,
        segment_count_length: u32,
        fingerprints: Vec<F>,
    ) -> Self {
        Self {
            seed,
            segment_length,
            segment_length_mask,
            segment_count,
            segment_count_length,
            fingerprints,
        }
    }
}

impl<F: Fingerprint> fmt::Debug for BinaryFuse<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryFuse")
            .field("bits", &F::BITS)
            .field("seed", &self.seed)
            .field("segment_count", &self.segment_count)
            .field("slots", &self.fingerprints.len())
            .finish()
    }
}

// ============================================================================
// HASH PRIMITIVES
// ============================================================================

#[inline]
fn murmur64(mut h: u64) -> u64 {
    h ^= h >> 33;
    h = h.wrapping_mul(0xFF51_AFD7_ED55_8CCD);
    h ^= h >> 33;
    h = h.wrapping_mul(0xC4CE_B9FE_1A85_EC53);
    h ^= h >> 33;
    h
}

#[inline]
fn mix_split(key: u64, seed: u64) -> u64 {
    murmur64(key.wrapping_add(seed))
}

#[inline]
fn rng_splitmix64(counter: &mut u64) -> u64 {
    *counter = counter.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *counter;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[inline]
fn mulhi(a: u64, b: u64) -> u64 {
    ((u128::from(a) * u128::from(b)) >> 64) as u64
}

#[inline]
fn fingerprint_of(hash: u64) -> u64 {
    hash ^ (hash >> 32)
}

#[inline]
fn calculate_segment_length(size: u32) -> u32 {
    let ln_size = f64::from(size).ln();
    1_u32 << ((ln_size / 3.33_f64.ln() + 2.25).floor() as u32)
}

#[inline]
fn calculate_size_factor(size: u32) -> f64 {
    let ln_size = f64::from(size).ln();
    1.125_f64.max(0.875 + 0.250 * 1_000_000.0_f64.ln() / ln_size)
}

// ============================================================================
// TESTS
// ============================================================================
