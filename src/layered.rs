// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The layered membership filter: a three-level tree of binary fuse filters.
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │ outer filter            (all keys, all docs)  │
//! ├───────────┬───────────┬───────────┬───────────┤
//! │ division 0│ division 1│    ...    │ division 7│  mid filters
//! ├───────────┴───────────┴───────────┴───────────┤
//! │ inner filters        (one per document)       │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! Documents are inserted as 64-bit key multisets and routed to one of
//! [`MID_LAYER_DIVISIONS`] divisions so that divisions stay balanced against
//! the caller's total-key estimate. `index()` then builds the tree bottom-up
//! in one pass per tier. Queries walk top-down and prune whole divisions (and
//! then whole documents) with a single filter probe each, so a miss costs
//! almost nothing and a hit touches only the divisions that might contain it.
//!
//! The filter is write-once: insert everything, call [`LayeredFilter::index`]
//! exactly once, then query and serialize. Each tier de-duplicates its keys
//! into a scratch buffer before populating, which works around binary-fuse
//! construction refusing duplicate inputs.

use std::mem;

use crate::error::Result;
use crate::filter::{BinaryFuse, Fingerprint};

/// Number of mid-layer divisions. Compile-time because it sizes the fixed
/// array at the top of the tree and appears in the serialized header.
pub const MID_LAYER_DIVISIONS: usize = 8;

/// Opaque receipt for one inserted document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertHandle {
    pub(crate) division: usize,
    pub(crate) position: usize,
}

/// One document: its key multiset, its filter, and the caller's payload.
#[derive(Debug)]
pub(crate) struct InnerLayer<F: Fingerprint, R> {
    pub(crate) keys_count: u64,
    /// Key multiset as inserted. Owned here so `index()` can be re-run;
    /// empty after deserialization (queries never need the raw keys).
    pub(crate) keys: Vec<u64>,
    pub(crate) filter: Option<BinaryFuse<F>>,
    pub(crate) result: R,
}

/// One horizontal partition of documents.
#[derive(Debug)]
pub(crate) struct MidLayer<F: Fingerprint, R> {
    pub(crate) keys_count: u64,
    pub(crate) filter: Option<BinaryFuse<F>>,
    pub(crate) inner_layers: Vec<InnerLayer<F, R>>,
}

impl<F: Fingerprint, R> Default for MidLayer<F, R> {
    fn default() -> Self {
        Self {
            keys_count: 0,
            filter: None,
            inner_layers: Vec::new(),
        }
    }
}

/// The three-level filter tree.
#[derive(Debug)]
pub struct LayeredFilter<F: Fingerprint, R> {
    pub(crate) total_keys_estimate: u64,
    pub(crate) keys: u64,
    pub(crate) outer_layer: Option<BinaryFuse<F>>,
    pub(crate) mid_layer: [MidLayer<F, R>; MID_LAYER_DIVISIONS],
}

impl<F: Fingerprint, R> LayeredFilter<F, R> {
    /// An empty tree. `total_keys_estimate` drives division balancing; it
    /// does not have to be exact, only in the right order of magnitude.
    pub fn new(total_keys_estimate: u64) -> Self {
        Self {
            total_keys_estimate,
            keys: 0,
            outer_layer: None,
            mid_layer: std::array::from_fn(|_| MidLayer::default()),
        }
    }

    /// Number of keys across all inserted documents (multiset count).
    pub fn keys(&self) -> u64 {
        self.keys
    }

    /// Number of inserted documents.
    pub fn len(&self) -> usize {
        self.mid_layer.iter().map(|m| m.inner_layers.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True once `index()` has built the filter tiers.
    pub fn is_indexed(&self) -> bool {
        self.outer_layer.is_some()
    }

    /// Record one document. The key multiset moves into the tree; `result`
    /// is handed back verbatim from matching queries.
    ///
    /// Division selection keeps divisions balanced: the document lands in the
    /// first division that still has room under `total_keys_estimate / D`,
    /// falling back to `keys_count mod D` once every division is at target.
    pub fn insert(&mut self, keys: Vec<u64>, result: R) -> InsertHandle {
        let keys_count = keys.len() as u64;
        let target_per_division = self.total_keys_estimate / MID_LAYER_DIVISIONS as u64;

        let division = self
            .mid_layer
            .iter()
            .position(|m| m.keys_count + keys_count < target_per_division)
            .unwrap_or((keys_count % MID_LAYER_DIVISIONS as u64) as usize);

        let mid = &mut self.mid_layer[division];
        mid.keys_count += keys_count;
        self.keys += keys_count;
        mid.inner_layers.push(InnerLayer {
            keys_count,
            keys,
            filter: None,
            result,
        });

        InsertHandle {
            division,
            position: mid.inner_layers.len() - 1,
        }
    }

    /// Build all three filter tiers. Call exactly once, after the last
    /// insert and before the first query.
    ///
    /// Each tier collects its keys into a scratch buffer and de-duplicates
    /// before populating; binary fuse construction does not converge on
    /// duplicate inputs.
    pub fn index(&mut self) -> Result<()> {
        // Tier 1: outer filter over every key of every document.
        let mut scratch: Vec<u64> = Vec::with_capacity(self.keys as usize);
        scratch.extend(self.all_keys());
        let mut outer = BinaryFuse::with_capacity(self.keys as usize);
        populate_unique(&mut outer, &mut scratch)?;
        self.outer_layer = Some(outer);

        // Tier 2: one filter per mid division.
        for division in 0..MID_LAYER_DIVISIONS {
            scratch.clear();
            scratch.extend(self.division_keys(division));
            let mut filter =
                BinaryFuse::with_capacity(self.mid_layer[division].keys_count as usize);
            populate_unique(&mut filter, &mut scratch)?;
            self.mid_layer[division].filter = Some(filter);
        }

        // Tier 3: one filter per document.
        for mid in &mut self.mid_layer {
            for inner in &mut mid.inner_layers {
                scratch.clear();
                scratch.extend_from_slice(&inner.keys);
                let mut filter = BinaryFuse::with_capacity(inner.keys_count as usize);
                populate_unique(&mut filter, &mut scratch)?;
                inner.filter = Some(filter);
            }
        }

        Ok(())
    }

    /// Every key of every document: divisions in index order, documents in
    /// insertion order within a division, each document's multiset replayed
    /// as inserted. Yields exactly [`LayeredFilter::keys`] items.
    pub fn all_keys(&self) -> impl Iterator<Item = u64> + '_ {
        self.mid_layer
            .iter()
            .flat_map(|m| m.inner_layers.iter())
            .flat_map(|inner| inner.keys.iter().copied())
    }

    /// Same walk restricted to a single division. Yields
    /// `mid_layer[division].keys_count` items.
    pub fn division_keys(&self, division: usize) -> impl Iterator<Item = u64> + '_ {
        self.mid_layer[division]
            .inner_layers
            .iter()
            .flat_map(|inner| inner.keys.iter().copied())
    }

    /// Disjunctive query: count documents whose filter contains at least one
    /// of `keys`, appending each matching document's result to `sink`.
    ///
    /// Results are emitted in (division index, insertion index) order. An
    /// empty `keys` slice matches nothing.
    pub fn query_logical_or<'a>(
        &'a self,
        keys: &[u64],
        mut sink: Option<&mut Vec<&'a R>>,
    ) -> usize {
        let Some(outer) = &self.outer_layer else {
            return 0;
        };
        if !keys.iter().any(|&k| outer.contains(k)) {
            return 0;
        }

        let mut count = 0;
        for mid in &self.mid_layer {
            let Some(mid_filter) = &mid.filter else {
                continue;
            };
            if !keys.iter().any(|&k| mid_filter.contains(k)) {
                continue;
            }
            for inner in &mid.inner_layers {
                let Some(inner_filter) = &inner.filter else {
                    continue;
                };
                if keys.iter().any(|&k| inner_filter.contains(k)) {
                    count += 1;
                    if let Some(sink) = sink.as_mut() {
                        sink.push(&inner.result);
                    }
                }
            }
        }
        count
    }

    /// Conjunctive query: count documents whose filter contains every key in
    /// `keys`, appending each matching document's result to `sink`.
    ///
    /// Results are emitted in (division index, insertion index) order. An
    /// empty `keys` slice trivially satisfies every tier and therefore
    /// matches every document.
    pub fn query_logical_and<'a>(
        &'a self,
        keys: &[u64],
        mut sink: Option<&mut Vec<&'a R>>,
    ) -> usize {
        let Some(outer) = &self.outer_layer else {
            return 0;
        };
        if !keys.iter().all(|&k| outer.contains(k)) {
            return 0;
        }

        let mut count = 0;
        for mid in &self.mid_layer {
            let Some(mid_filter) = &mid.filter else {
                continue;
            };
            if !keys.iter().all(|&k| mid_filter.contains(k)) {
                continue;
            }
            for inner in &mid.inner_layers {
                let Some(inner_filter) = &inner.filter else {
                    continue;
                };
                if keys.iter().all(|&k| inner_filter.contains(k)) {
                    count += 1;
                    if let Some(sink) = sink.as_mut() {
                        sink.push(&inner.result);
                    }
                }
            }
        }
        count
    }

    /// Single-key containment shortcut: consults the outer filter only.
    /// `false` before `index()` has run.
    pub fn contains(&self, key: u64) -> bool {
        self.outer_layer
            .as_ref()
            .map(|outer| outer.contains(key))
            .unwrap_or(false)
    }

    /// Heap footprint: the base struct, every present filter, and one inner
    /// layer overhead per document.
    pub fn size_in_bytes(&self) -> usize {
        let mut total = mem::size_of::<Self>();
        if let Some(outer) = &self.outer_layer {
            total += outer.size_in_bytes();
        }
        for mid in &self.mid_layer {
            if let Some(filter) = &mid.filter {
                total += filter.size_in_bytes();
            }
            for inner in &mid.inner_layers {
                total += mem::size_of::<InnerLayer<F, R>>();
                if let Some(filter) = &inner.filter {
                    total += filter.size_in_bytes();
                }
            }
        }
        total
    }
}

/// Sort + dedup `scratch` in place, then populate `filter` with the unique
/// keys.
fn populate_unique<F: Fingerprint>(filter: &mut BinaryFuse<F>, scratch: &mut Vec<u64>) -> Result<()> {
    scratch.sort_unstable();
    scratch.dedup();
    filter.populate(scratch)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn keyset(words: &[&str]) -> Vec<u64> {
        words.iter().map(|w| crate::hash::key_hash(w.as_bytes())).collect()
    }

    fn build(docs: &[&[&str]], estimate: u64) -> LayeredFilter<u8, usize> {
        let mut filter = LayeredFilter::new(estimate);
        for (id, words) in docs.iter().enumerate() {
            filter.insert(keyset(words), id);
        }
        filter.index().unwrap();
        filter
    }

    #[test]
    fn key_count_conservation() {
        let filter = build(&[&["a", "b"], &["c", "d", "e"], &["f"]], 100);
        assert_eq!(filter.keys(), 6);
        let mid_sum: u64 = filter.mid_layer.iter().map(|m| m.keys_count).sum();
        assert_eq!(mid_sum, filter.keys());
        let inner_sum: u64 = filter
            .mid_layer
            .iter()
            .flat_map(|m| m.inner_layers.iter())
            .map(|i| i.keys_count)
            .sum();
        assert_eq!(inner_sum, filter.keys());
        assert_eq!(filter.all_keys().count() as u64, filter.keys());
    }

    #[test]
    fn inserted_keys_are_contained() {
        let filter = build(&[&["hallo", "welt"], &["dies", "ist", "ein", "test"]], 100);
        for key in keyset(&["hallo", "welt", "dies", "ist", "ein", "test"]) {
            assert!(filter.contains(key));
        }
    }

    #[test]
    fn contains_is_false_before_indexing() {
        let mut filter: LayeredFilter<u8, ()> = LayeredFilter::new(100);
        filter.insert(keyset(&["a"]), ());
        assert!(!filter.contains(crate::hash::key_hash(b"a")));
        assert!(!filter.is_indexed());
    }

    #[test]
    fn or_query_counts_and_collects_in_order() {
        let filter = build(&[&["hallo", "welt"], &["dies", "ist", "ein", "test"]], 100);

        let mut results = Vec::new();
        let count = filter.query_logical_or(&keyset(&["hallo", "test"]), Some(&mut results));
        assert_eq!(count, 2);
        assert_eq!(results, vec![&0, &1]);

        assert_eq!(filter.query_logical_or(&keyset(&["boo"]), None), 0);
        assert_eq!(filter.query_logical_or(&[], None), 0);
    }

    #[test]
    fn and_query_requires_every_key() {
        let filter = build(
            &[&["hallo", "welt", "test"], &["dies", "ist", "ein", "test"]],
            100,
        );

        let mut results = Vec::new();
        let count = filter.query_logical_and(&keyset(&["hallo", "test"]), Some(&mut results));
        assert_eq!(count, 1);
        assert_eq!(results, vec![&0]);
    }

    #[test]
    fn empty_and_query_matches_every_document() {
        let filter = build(&[&["a"], &["b"], &["c"]], 100);
        let mut results = Vec::new();
        let count = filter.query_logical_and(&[], Some(&mut results));
        assert_eq!(count, 3);
        assert_eq!(results, vec![&0, &1, &2]);
    }

    #[test]
    fn and_never_exceeds_or() {
        let filter = build(&[&["a", "b"], &["b", "c"], &["c", "d"]], 100);
        for query in [&["a", "b"][..], &["b", "c"], &["a", "d"], &["b"]] {
            let keys = keyset(query);
            assert!(
                filter.query_logical_and(&keys, None) <= filter.query_logical_or(&keys, None)
            );
        }
    }

    #[test]
    fn division_selection_balances_against_estimate() {
        // 16 docs × 4 keys against an estimate of 96: target is 12 keys per
        // division, so no division may exceed max(E/D, largest doc) = 12.
        let estimate = 96u64;
        let mut filter: LayeredFilter<u8, usize> = LayeredFilter::new(estimate);
        for doc in 0..16usize {
            let keys: Vec<u64> = (0..4u64).map(|k| (doc as u64) << 32 | k).collect();
            filter.insert(keys, doc);
        }
        let target = estimate / MID_LAYER_DIVISIONS as u64;
        for mid in &filter.mid_layer {
            assert!(mid.keys_count <= target.max(4));
        }
    }

    #[test]
    fn overflow_documents_fall_back_to_modulo_routing() {
        // Estimate 0 forces the modulo path immediately.
        let mut filter: LayeredFilter<u8, usize> = LayeredFilter::new(0);
        let handle = filter.insert(vec![1, 2, 3], 0);
        assert_eq!(handle.division, 3 % MID_LAYER_DIVISIONS);
    }

    #[test]
    fn reindexing_after_more_inserts_works() {
        let mut filter: LayeredFilter<u8, usize> = LayeredFilter::new(100);
        filter.insert(keyset(&["alpha"]), 0);
        filter.index().unwrap();
        assert!(filter.contains(crate::hash::key_hash(b"alpha")));

        filter.insert(keyset(&["beta"]), 1);
        filter.index().unwrap();
        assert!(filter.contains(crate::hash::key_hash(b"alpha")));
        assert!(filter.contains(crate::hash::key_hash(b"beta")));
    }

    #[test]
    fn size_in_bytes_sums_all_tiers() {
        let filter = build(&[&["a", "b", "c"], &["d", "e"]], 100);
        let mut expected = mem::size_of::<LayeredFilter<u8, usize>>();
        expected += filter.outer_layer.as_ref().unwrap().size_in_bytes();
        for mid in &filter.mid_layer {
            expected += mid.filter.as_ref().unwrap().size_in_bytes();
            for inner in &mid.inner_layers {
                expected += mem::size_of::<InnerLayer<u8, usize>>();
                expected += inner.filter.as_ref().unwrap().size_in_bytes();
            }
        }
        assert_eq!(filter.size_in_bytes(), expected);
    }
}
