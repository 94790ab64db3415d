// SPDX-License-Identifier: GPL-3.0-or-later

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FingerprintError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FingerprintError {
    #[error("Unsupported algorithm tag {0}: must fit in a single byte")]
    UnsupportedAlgorithm(u32),

    #[error("Fingerprint too long: {count} subfingerprints (max {max})")]
    FingerprintTooLong { count: usize, max: usize },

    #[error("Truncated stream: needed {needed} bits, {available} available")]
    TruncatedStream { needed: usize, available: usize },

    #[error("Malformed header: {0}")]
    MalformedHeader(String),

    /// An exception code resolved to a bit length wider than a subfingerprint.
    #[error("Invalid bit length {0} in compressed stream")]
    InvalidBitLength(u32),

    #[error("Invalid fingerprint text: {0}")]
    InvalidText(String),

    #[error("Invalid option: {0}")]
    InvalidOption(String),

    #[error("Audio pipeline error: {0}")]
    Pipeline(String),

    #[error("Fingerprinter has not been started")]
    NotStarted,

    #[error("No finished fingerprint is available")]
    NotFinished,
}
