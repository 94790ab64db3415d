// SPDX-License-Identifier: GPL-3.0-or-later

//! Majority-vote similarity digest.
//!
//! Each of the 32 output bits is set when strictly more subfingerprints have
//! that bit set than unset. Ties, including the empty fingerprint, leave the
//! bit clear. Digests are compared by Hamming distance, never by equality.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

/// Distance at or below which two digests are treated as the same recording.
pub const DEFAULT_SIMILARITY_THRESHOLD: u32 = 15;

/// 32-bit locality-sensitive summary of a whole fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Digest(u32);

impl Digest {
    pub const fn from_value(value: u32) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u32 {
        self.0
    }

    /// Number of differing bits.
    pub const fn hamming_distance(self, other: Digest) -> u32 {
        (self.0 ^ other.0).count_ones()
    }

    pub const fn is_similar(self, other: Digest, threshold: u32) -> bool {
        self.hamming_distance(other) <= threshold
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

/// Fold a raw fingerprint into a single digest.
pub fn digest(raw: &[u32]) -> Digest {
    let mut votes = [0i64; 32];
    for &subfingerprint in raw {
        for (bit, vote) in votes.iter_mut().enumerate() {
            if (subfingerprint >> bit) & 1 == 1 {
                *vote += 1;
            } else {
                *vote -= 1;
            }
        }
    }

    let value = votes
        .iter()
        .enumerate()
        .filter(|&(_, &vote)| vote > 0)
        .fold(0u32, |acc, (bit, _)| acc | (1 << bit));

    trace!(count = raw.len(), digest = value, "computed digest");
    Digest(value)
}
