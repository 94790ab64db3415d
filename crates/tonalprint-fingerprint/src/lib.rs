// SPDX-License-Identifier: GPL-3.0-or-later

//! Audio fingerprint compression and similarity hashing.
//!
//! This crate provides functionality for:
//! - Losslessly compressing raw fingerprints (sequences of 32-bit subfingerprints)
//! - Encoding compressed fingerprints as URL-safe text
//! - Folding a fingerprint into a 32-bit digest compared by Hamming distance
//! - Driving an external analysis pipeline through a start/feed/finish facade

pub mod bitstream;
pub mod codec;
pub mod digest;
pub mod error;
pub mod fingerprint;
pub mod fingerprinter;
pub mod options;
pub mod pipeline;
pub mod text;

pub use codec::{compress, decompress};
pub use digest::{digest, Digest, DEFAULT_SIMILARITY_THRESHOLD};
pub use error::{FingerprintError, Result};
pub use fingerprint::{Algorithm, AlgorithmTag, RawFingerprint};
pub use fingerprinter::Fingerprinter;
pub use options::FingerprinterOptions;
pub use pipeline::{FrequencyAnalyzer, NaiveDft, SubfingerprintPipeline};
pub use text::{decode_fingerprint, encode_fingerprint, TextEncoding};

/// Version of this library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
