// SPDX-License-Identifier: GPL-3.0-or-later

//! Lossless compression of raw fingerprints.
//!
//! Consecutive subfingerprints are XORed together, and each resulting delta is
//! described by its bit length plus the bits below its leading one. The
//! compressed layout is:
//!
//! ```text
//! [tag: 8][count: 24, big-endian]
//! [normal code: 3] x count
//! [exception code: 5] x (codes equal to 7)
//! [payload: bit length - 1] x count
//! [zero padding to a byte boundary]
//! ```
//!
//! A normal code below 7 is the bit length itself. Code 7 escapes to the
//! exception stream, which holds `bit length - 7`. Any change to these widths
//! must be announced through a new algorithm tag.

use tracing::{debug, instrument};

use crate::bitstream::{BitReader, BitWriter};
use crate::fingerprint::AlgorithmTag;
use crate::{FingerprintError, Result};

pub const NORMAL_BITS: u32 = 3;
pub const EXCEPTION_BITS: u32 = 5;
/// Normal code that escapes to the exception stream.
pub const MAX_NORMAL_VALUE: u32 = (1 << NORMAL_BITS) - 1;
/// One tag byte followed by a 24-bit subfingerprint count.
pub const HEADER_LEN: usize = 4;
pub const MAX_SUBFINGERPRINTS: usize = 0xFF_FFFF;

/// Number of bits up to and including the highest set bit; 0 for zero.
fn bits_needed(delta: u32) -> u32 {
    u32::BITS - delta.leading_zeros()
}

/// Compress a raw fingerprint into its self-describing byte form.
///
/// An empty fingerprint is valid and yields a header-only output.
///
/// # Errors
///
/// - [`FingerprintError::UnsupportedAlgorithm`] if `tag` does not fit in a byte
/// - [`FingerprintError::FingerprintTooLong`] if the count overflows the header
#[instrument(skip(raw), fields(count = raw.len()))]
pub fn compress(raw: &[u32], tag: AlgorithmTag) -> Result<Vec<u8>> {
    let tag_byte = tag.to_header_byte()?;
    let count = raw.len();
    if count > MAX_SUBFINGERPRINTS {
        return Err(FingerprintError::FingerprintTooLong {
            count,
            max: MAX_SUBFINGERPRINTS,
        });
    }

    let mut previous = 0u32;
    let deltas: Vec<u32> = raw
        .iter()
        .map(|&current| {
            let delta = current ^ previous;
            previous = current;
            delta
        })
        .collect();

    let mut writer = BitWriter::with_capacity(HEADER_LEN + count * 2);
    writer.write(u32::from(tag_byte), 8);
    for shift in [16, 8, 0] {
        writer.write((count >> shift) as u32 & 0xFF, 8);
    }

    let mut escapes = 0usize;
    for &delta in &deltas {
        writer.write(bits_needed(delta).min(MAX_NORMAL_VALUE), NORMAL_BITS);
    }
    for &delta in &deltas {
        let length = bits_needed(delta);
        if length >= MAX_NORMAL_VALUE {
            writer.write(length - MAX_NORMAL_VALUE, EXCEPTION_BITS);
            escapes += 1;
        }
    }
    for &delta in &deltas {
        let length = bits_needed(delta);
        if length > 1 {
            // The leading one at `length - 1` is implied by the length code.
            writer.write(delta, length - 1);
        }
    }

    let payload_bits = writer.bit_len();
    let bytes = writer.finish();
    debug!(
        count,
        escapes,
        payload_bits,
        compressed_len = bytes.len(),
        "compressed fingerprint"
    );
    Ok(bytes)
}

/// Reconstruct a raw fingerprint and its algorithm tag.
///
/// Decoding is all-or-nothing: any error discards the partial result.
///
/// # Errors
///
/// - [`FingerprintError::TruncatedStream`] if the input ends before the
///   declared count or a length code is satisfied
/// - [`FingerprintError::InvalidBitLength`] if an exception code describes a
///   delta wider than 32 bits
/// - [`FingerprintError::MalformedHeader`] if whole bytes remain after the
///   declared subfingerprints have been decoded
#[instrument(skip(bytes), fields(len = bytes.len()))]
pub fn decompress(bytes: &[u8]) -> Result<(Vec<u32>, AlgorithmTag)> {
    if bytes.len() < HEADER_LEN {
        return Err(FingerprintError::TruncatedStream {
            needed: HEADER_LEN * 8,
            available: bytes.len() * 8,
        });
    }

    let mut reader = BitReader::new(bytes);
    let tag = AlgorithmTag::new(reader.read(8)?);
    let mut count = 0usize;
    for _ in 0..3 {
        count = (count << 8) | reader.read(8)? as usize;
    }

    // Every subfingerprint costs at least its normal code; checking up front
    // keeps a lying header from driving a huge allocation.
    let normal_bits = count * NORMAL_BITS as usize;
    if normal_bits > reader.remaining_bits() {
        return Err(FingerprintError::TruncatedStream {
            needed: normal_bits,
            available: reader.remaining_bits(),
        });
    }

    let mut lengths = Vec::with_capacity(count);
    for _ in 0..count {
        lengths.push(reader.read(NORMAL_BITS)?);
    }

    let mut escapes = 0usize;
    for length in lengths.iter_mut().filter(|length| **length == MAX_NORMAL_VALUE) {
        let resolved = MAX_NORMAL_VALUE + reader.read(EXCEPTION_BITS)?;
        if resolved > u32::BITS {
            return Err(FingerprintError::InvalidBitLength(resolved));
        }
        *length = resolved;
        escapes += 1;
    }

    let mut raw = Vec::with_capacity(count);
    let mut previous = 0u32;
    for &length in &lengths {
        let delta = match length {
            0 => 0,
            length => (1u32 << (length - 1)) | reader.read(length - 1)?,
        };
        previous ^= delta;
        raw.push(previous);
    }

    let trailing = reader.remaining_bits();
    if trailing >= 8 {
        return Err(FingerprintError::MalformedHeader(format!(
            "header declares {} subfingerprints but {} unused bytes follow them",
            count,
            trailing / 8
        )));
    }

    debug!(count, escapes, tag = %tag, "decompressed fingerprint");
    Ok((raw, tag))
}
