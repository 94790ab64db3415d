// SPDX-License-Identifier: GPL-3.0-or-later

use serde::{Deserialize, Serialize};

use crate::fingerprint::Algorithm;
use crate::text::TextEncoding;
use crate::{FingerprintError, Result};

/// Default cap on fed audio. 120 seconds is enough for reliable recognition.
pub const DEFAULT_MAX_DURATION_SECS: u32 = 120;

/// Largest usable silence threshold: the peak magnitude of a 16-bit sample.
pub const MAX_SILENCE_THRESHOLD: u16 = i16::MAX as u16;

/// Typed settings for a [`crate::Fingerprinter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FingerprinterOptions {
    /// Generation configuration recorded in every fingerprint.
    pub algorithm: Algorithm,
    /// Audio beyond this many seconds is dropped. 0 disables the cap.
    pub max_duration_secs: u32,
    /// Leading frames whose samples all stay at or below this magnitude are
    /// skipped. 0 disables silence skipping.
    pub silence_threshold: u16,
    /// Wrapping used by [`crate::Fingerprinter::encoded`].
    pub text_encoding: TextEncoding,
}

impl Default for FingerprinterOptions {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default(),
            max_duration_secs: DEFAULT_MAX_DURATION_SECS,
            silence_threshold: 0,
            text_encoding: TextEncoding::default(),
        }
    }
}

impl FingerprinterOptions {
    pub fn validate(&self) -> Result<()> {
        if self.silence_threshold > MAX_SILENCE_THRESHOLD {
            return Err(FingerprintError::InvalidOption(format!(
                "silence_threshold must be at most {}, got {}",
                MAX_SILENCE_THRESHOLD, self.silence_threshold
            )));
        }
        Ok(())
    }
}
