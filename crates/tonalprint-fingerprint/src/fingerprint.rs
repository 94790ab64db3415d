// SPDX-License-Identifier: GPL-3.0-or-later

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::codec;
use crate::digest::{self, Digest};
use crate::text::{self, TextEncoding};
use crate::{FingerprintError, Result};

/// Identifies the generation configuration that produced a fingerprint.
///
/// The tag travels as an opaque header byte and never changes how the
/// codec lays out bits. Values above 255 cannot be compressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlgorithmTag(u32);

impl AlgorithmTag {
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u32 {
        self.0
    }

    /// The single header byte this tag is transported as.
    pub fn to_header_byte(self) -> Result<u8> {
        u8::try_from(self.0).map_err(|_| FingerprintError::UnsupportedAlgorithm(self.0))
    }
}

impl From<u8> for AlgorithmTag {
    fn from(value: u8) -> Self {
        Self(u32::from(value))
    }
}

impl From<Algorithm> for AlgorithmTag {
    fn from(algorithm: Algorithm) -> Self {
        algorithm.tag()
    }
}

impl fmt::Display for AlgorithmTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Known fingerprint generation configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Test1,
    #[default]
    Test2,
    Test3,
    Test4,
    Test5,
}

impl Algorithm {
    pub const ALL: [Algorithm; 5] = [
        Algorithm::Test1,
        Algorithm::Test2,
        Algorithm::Test3,
        Algorithm::Test4,
        Algorithm::Test5,
    ];

    pub const fn tag(self) -> AlgorithmTag {
        AlgorithmTag::new(self as u32)
    }
}

impl TryFrom<AlgorithmTag> for Algorithm {
    type Error = FingerprintError;

    fn try_from(tag: AlgorithmTag) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|algorithm| algorithm.tag() == tag)
            .ok_or_else(|| FingerprintError::InvalidOption(format!("unknown algorithm tag {}", tag)))
    }
}

/// Ordered sequence of 32-bit subfingerprints, one per analysis frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawFingerprint {
    /// Configuration that produced the subfingerprints.
    pub algorithm: AlgorithmTag,
    /// Subfingerprints in temporal order.
    pub subfingerprints: Vec<u32>,
}

impl RawFingerprint {
    /// Create a new fingerprint.
    pub fn new(subfingerprints: Vec<u32>, algorithm: impl Into<AlgorithmTag>) -> Self {
        Self {
            algorithm: algorithm.into(),
            subfingerprints,
        }
    }

    pub fn len(&self) -> usize {
        self.subfingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subfingerprints.is_empty()
    }

    /// Compress into the self-describing binary form.
    pub fn compress(&self) -> Result<Vec<u8>> {
        codec::compress(&self.subfingerprints, self.algorithm)
    }

    /// Rebuild a fingerprint from its compressed binary form.
    pub fn decompress(bytes: &[u8]) -> Result<Self> {
        let (subfingerprints, algorithm) = codec::decompress(bytes)?;
        Ok(Self::new(subfingerprints, algorithm))
    }

    /// Compress and wrap for transport.
    pub fn encode(&self, encoding: TextEncoding) -> Result<Vec<u8>> {
        text::encode_fingerprint(&self.subfingerprints, self.algorithm, encoding)
    }

    /// Inverse of [`RawFingerprint::encode`].
    pub fn decode(data: &[u8], encoding: TextEncoding) -> Result<Self> {
        let (subfingerprints, algorithm) = text::decode_fingerprint(data, encoding)?;
        Ok(Self::new(subfingerprints, algorithm))
    }

    pub fn digest(&self) -> Digest {
        digest::digest(&self.subfingerprints)
    }
}
