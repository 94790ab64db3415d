// SPDX-License-Identifier: GPL-3.0-or-later

//! Seams to the audio analysis stages that sit outside this crate.
//!
//! Decoding, chroma extraction and subfingerprint quantization are supplied by
//! callers through [`SubfingerprintPipeline`]. The codec and digest never see
//! these traits.

use std::f64::consts::PI;

use crate::Result;

/// Turns one windowed frame of samples into frequency-domain magnitudes.
pub trait FrequencyAnalyzer {
    /// Returns `frame.len() / 2 + 1` magnitudes, DC first.
    fn magnitudes(&mut self, frame: &[f64]) -> Vec<f64>;
}

/// Direct O(n²) discrete Fourier transform.
///
/// Only suitable for short frames; real pipelines inject an FFT.
#[derive(Debug, Default, Clone, Copy)]
pub struct NaiveDft;

impl FrequencyAnalyzer for NaiveDft {
    fn magnitudes(&mut self, frame: &[f64]) -> Vec<f64> {
        let n = frame.len();
        if n == 0 {
            return Vec::new();
        }

        (0..=n / 2)
            .map(|k| {
                let (re, im) = frame.iter().enumerate().fold((0.0, 0.0), |(re, im), (t, x)| {
                    let angle = 2.0 * PI * (k * t) as f64 / n as f64;
                    (re + x * angle.cos(), im - x * angle.sin())
                });
                (re * re + im * im).sqrt()
            })
            .collect()
    }
}

/// Audio-to-subfingerprint analysis, driven by [`crate::Fingerprinter`].
pub trait SubfingerprintPipeline {
    /// Prepare for a new stream of interleaved 16-bit samples.
    fn start(&mut self, sample_rate: u32, channels: u16) -> Result<()>;

    /// Consume the next block of interleaved samples.
    fn consume(&mut self, samples: &[i16]) -> Result<()>;

    /// Flush buffered audio and return the subfingerprints in temporal order.
    fn finish(&mut self) -> Result<Vec<u32>>;
}
