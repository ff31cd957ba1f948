// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Binary format for serialized layered filters.
//!
//! Little-endian throughout, framed, versioned. The stream starts with a
//! `u16` version field (currently 1); there is no magic number and no
//! checksum. A future version can add both by bumping the version field.
//! The header pins the compile-time options (fingerprint width, division
//! count) so a decoder built with different parameters rejects the stream
//! instead of misreading it.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ u16 version (=1)                                         │
//! │ u64 total_keys_estimate                                  │
//! │ u16 filter_bit_size        (must equal F::BITS)          │
//! │ u64 mid_layer_divisions    (must equal D)                │
//! ├──────────────────────────────────────────────────────────┤
//! │ u64 keys                                                 │
//! │ FilterBlob outer_filter                                  │
//! ├─ per mid division (D times, in order) ───────────────────┤
//! │ u64 keys_count                                           │
//! │ FilterBlob mid_filter                                    │
//! │ u32 inner_layers_len                                     │
//! │   per inner layer:                                       │
//! │     u64 keys_count | FilterBlob | Payload                │
//! └──────────────────────────────────────────────────────────┘
//! FilterBlob = u64 seed | u32 segment_length | u32 segment_length_mask
//!            | u32 segment_count | u32 segment_count_length
//!            | u32 fingerprints_len | fingerprints_len F-width words
//! ```
//!
//! The codec is written against `io::Read`/`io::Write`, so it serves files
//! and in-memory buffers alike. Decoding failures release everything
//! allocated so far (plain drop semantics); a short read surfaces as
//! [`Error::EndOfStream`] rather than a filesystem error.

use std::io::{Read, Write};

use crate::error::{Error, Result};
use crate::filter::{BinaryFuse, Fingerprint};
use crate::layered::{LayeredFilter, MID_LAYER_DIVISIONS};

/// Current serialization format version.
pub const FORMAT_VERSION: u16 = 1;

// ============================================================================
// RESULT PAYLOADS
// ============================================================================

/// A result payload the binary format knows how to frame.
///
/// Two shapes are supported: a bare 64-bit integer and a length-prefixed
/// byte string. The index never interprets payloads; it only carries them.
pub trait Payload: Sized {
    fn write_payload<W: Write>(&self, w: &mut W) -> Result<()>;
    fn read_payload<R: Read>(r: &mut R) -> Result<Self>;
}

impl Payload for u64 {
    fn write_payload<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(&self.to_le_bytes())?;
        Ok(())
    }

    fn read_payload<R: Read>(r: &mut R) -> Result<Self> {
        read_u64(r)
    }
}

impl Payload for Vec<u8> {
    fn write_payload<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(&(self.len() as u32).to_le_bytes())?;
        w.write_all(self)?;
        Ok(())
    }

    fn read_payload<R: Read>(r: &mut R) -> Result<Self> {
        let len = read_u32(r)? as usize;
        let mut bytes = vec![0u8; len];
        r.read_exact(&mut bytes).map_err(Error::from_read)?;
        Ok(bytes)
    }
}

// ============================================================================
// LAYERED FILTER STREAM
// ============================================================================

impl<F: Fingerprint, R: Payload> LayeredFilter<F, R> {
    /// Serialize the indexed tree into `w`.
    ///
    /// Fails with [`Error::NotIndexed`] when `index()` has not run: the
    /// stream has no representation for an absent filter.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        let outer = self.outer_layer.as_ref().ok_or(Error::NotIndexed)?;

        w.write_all(&FORMAT_VERSION.to_le_bytes())?;
        w.write_all(&self.total_keys_estimate.to_le_bytes())?;
        w.write_all(&F::BITS.to_le_bytes())?;
        w.write_all(&(MID_LAYER_DIVISIONS as u64).to_le_bytes())?;

        w.write_all(&self.keys.to_le_bytes())?;
        write_filter(outer, w)?;

        for mid in &self.mid_layer {
            w.write_all(&mid.keys_count.to_le_bytes())?;
            let filter = mid.filter.as_ref().ok_or(Error::NotIndexed)?;
            write_filter(filter, w)?;

            w.write_all(&(mid.inner_layers.len() as u32).to_le_bytes())?;
            for inner in &mid.inner_layers {
                w.write_all(&inner.keys_count.to_le_bytes())?;
                let filter = inner.filter.as_ref().ok_or(Error::NotIndexed)?;
                write_filter(filter, w)?;
                inner.result.write_payload(w)?;
            }
        }

        Ok(())
    }

    /// Decode a tree from `r`, validating the version and the compile-time
    /// options before touching any filter data.
    ///
    /// Key multisets are not part of the stream; the decoded tree answers
    /// queries but holds empty key buffers.
    pub fn read_from<Rd: Read>(r: &mut Rd) -> Result<Self> {
        let version = read_u16(r)?;
        if version != FORMAT_VERSION {
            return Err(Error::VersionMismatch {
                found: version,
                expected: FORMAT_VERSION,
            });
        }

        let total_keys_estimate = read_u64(r)?;

        let bit_size = read_u16(r)?;
        if bit_size != F::BITS {
            return Err(Error::OptionsMismatch(format!(
                "fingerprint width {} in stream, {} compiled in",
                bit_size,
                F::BITS
            )));
        }

        let divisions = read_u64(r)?;
        if divisions != MID_LAYER_DIVISIONS as u64 {
            return Err(Error::OptionsMismatch(format!(
                "{} mid-layer divisions in stream, {} compiled in",
                divisions, MID_LAYER_DIVISIONS
            )));
        }

        let mut layered = LayeredFilter::new(total_keys_estimate);
        layered.keys = read_u64(r)?;
        layered.outer_layer = Some(read_filter(r)?);

        for division in 0..MID_LAYER_DIVISIONS {
            let keys_count = read_u64(r)?;
            let filter = read_filter(r)?;
            let inner_len = read_u32(r)? as usize;

            let mid = &mut layered.mid_layer[division];
            mid.keys_count = keys_count;
            mid.filter = Some(filter);
            mid.inner_layers.reserve(inner_len);

            for _ in 0..inner_len {
                let keys_count = read_u64(r)?;
                let filter = read_filter(r)?;
                let result = R::read_payload(r)?;
                mid.inner_layers.push(crate::layered::InnerLayer {
                    keys_count,
                    keys: Vec::new(),
                    filter: Some(filter),
                    result,
                });
            }
        }

        Ok(layered)
    }
}

// ============================================================================
// FILTER BLOBS
// ============================================================================

fn write_filter<F: Fingerprint, W: Write>(filter: &BinaryFuse<F>, w: &mut W) -> Result<()> {
    w.write_all(&filter.seed().to_le_bytes())?;
    w.write_all(&filter.segment_length().to_le_bytes())?;
    w.write_all(&filter.segment_length_mask().to_le_bytes())?;
    w.write_all(&filter.segment_count().to_le_bytes())?;
    w.write_all(&filter.segment_count_length().to_le_bytes())?;

    let fingerprints = filter.fingerprints();
    w.write_all(&(fingerprints.len() as u32).to_le_bytes())?;
    for &fp in fingerprints {
        w.write_all(&fp.to_word().to_le_bytes()[..F::BYTES])?;
    }
    Ok(())
}

fn read_filter<F: Fingerprint, R: Read>(r: &mut R) -> Result<BinaryFuse<F>> {
    let seed = read_u64(r)?;
    let segment_length = read_u32(r)?;
    let segment_length_mask = read_u32(r)?;
    let segment_count = read_u32(r)?;
    let segment_count_length = read_u32(r)?;

    let fingerprints_len = read_u32(r)? as usize;
    let mut raw = vec![0u8; fingerprints_len * F::BYTES];
    r.read_exact(&mut raw).map_err(Error::from_read)?;

    let fingerprints = raw
        .chunks_exact(F::BYTES)
        .map(|chunk| {
            let mut word = [0u8; 4];
            word[..F::BYTES].copy_from_slice(chunk);
            F::from_word(u32::from_le_bytes(word))
        })
        .collect();

    Ok(BinaryFuse::from_parts(
        seed,
        segment_length,
        segment_length_mask,
        segment_count,
        segment_count_length,
        fingerprints,
    ))
}

// ============================================================================
// PRIMITIVE READERS
// ============================================================================

fn read_u16<R: Read>(r: &mut R) -> Result<u16> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf).map_err(Error::from_read)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_u32<R: Read>(r: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf).map_err(Error::from_read)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64<R: Read>(r: &mut R) -> Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf).map_err(Error::from_read)?;
    Ok(u64::from_le_bytes(buf))
}

// ============================================================================
// TESTS
// ============================================================================
