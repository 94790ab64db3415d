// SPDX-License-Identifier: GPL-3.0-or-later

//! Start/feed/finish facade over an external analysis pipeline.
//!
//! The [`Fingerprinter`] owns the per-stream bookkeeping: leading silence is
//! skipped, audio past the configured duration cap is dropped, and the
//! subfingerprints returned by the pipeline are tagged with the configured
//! algorithm. The finished fingerprint can then be compressed, encoded for
//! transport or folded into a digest.
//!
//! # Example
//!
//! ```no_run
//! use tonalprint_fingerprint::{Fingerprinter, FingerprinterOptions, SubfingerprintPipeline};
//!
//! # fn example(pipeline: impl SubfingerprintPipeline, samples: &[i16]) -> tonalprint_fingerprint::Result<()> {
//! let mut fingerprinter = Fingerprinter::new(pipeline, FingerprinterOptions::default())?;
//! fingerprinter.start(44_100, 2)?;
//! fingerprinter.feed(samples)?;
//! let fingerprint = fingerprinter.finish()?;
//! println!("{} subfingerprints, digest {}", fingerprint.len(), fingerprint.digest());
//! # Ok(())
//! # }
//! ```

use tracing::{debug, instrument, warn};

use crate::digest::Digest;
use crate::fingerprint::RawFingerprint;
use crate::options::FingerprinterOptions;
use crate::pipeline::SubfingerprintPipeline;
use crate::{FingerprintError, Result};

/// Per-stream state between `start` and `finish`.
#[derive(Debug)]
struct Session {
    sample_rate: u32,
    channels: u16,
    /// Samples handed to the pipeline so far.
    forwarded: u64,
    /// Upper bound on `forwarded`, if a duration cap applies.
    sample_limit: Option<u64>,
    skipping_silence: bool,
    /// Incomplete frame held back while still skipping silence.
    partial_frame: Vec<i16>,
    truncated: bool,
}

impl Session {
    fn new(sample_rate: u32, channels: u16, options: &FingerprinterOptions) -> Self {
        let sample_limit = (options.max_duration_secs > 0).then(|| {
            u64::from(options.max_duration_secs) * u64::from(sample_rate) * u64::from(channels)
        });

        Self {
            sample_rate,
            channels,
            forwarded: 0,
            sample_limit,
            skipping_silence: options.silence_threshold > 0,
            partial_frame: Vec::new(),
            truncated: false,
        }
    }

    fn duration_secs(&self) -> u32 {
        let per_second = u64::from(self.sample_rate) * u64::from(self.channels);
        (self.forwarded / per_second.max(1)) as u32
    }

    /// Drop whole leading frames whose samples stay within `threshold`.
    ///
    /// Returns the audio that should reach the pipeline, which is empty while
    /// the stream is still silent.
    fn strip_leading_silence(&mut self, samples: &[i16], threshold: u16) -> Vec<i16> {
        let mut buffered = std::mem::take(&mut self.partial_frame);
        buffered.extend_from_slice(samples);

        let channels = usize::from(self.channels);
        let silent_frames = buffered
            .chunks_exact(channels)
            .take_while(|frame| frame.iter().all(|s| s.unsigned_abs() <= threshold))
            .count();
        let start = silent_frames * channels;

        if buffered.len() - start >= channels {
            debug!(skipped_frames = silent_frames, "leading silence ended");
            self.skipping_silence = false;
            buffered.split_off(start)
        } else {
            self.partial_frame = buffered.split_off(start);
            Vec::new()
        }
    }
}

#[derive(Debug)]
enum State {
    Idle,
    Running(Session),
    Finished(RawFingerprint),
}

/// Drives a [`SubfingerprintPipeline`] and packages its output.
pub struct Fingerprinter<P> {
    pipeline: P,
    options: FingerprinterOptions,
    state: State,
}

impl<P: SubfingerprintPipeline> Fingerprinter<P> {
    /// Create a fingerprinter with validated options.
    pub fn new(pipeline: P, options: FingerprinterOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            pipeline,
            options,
            state: State::Idle,
        })
    }

    pub fn options(&self) -> &FingerprinterOptions {
        &self.options
    }

    /// Begin a new stream, discarding any previous fingerprint.
    #[instrument(skip(self))]
    pub fn start(&mut self, sample_rate: u32, channels: u16) -> Result<()> {
        if sample_rate == 0 {
            return Err(FingerprintError::InvalidOption(
                "sample rate must be > 0".to_string(),
            ));
        }
        if channels == 0 {
            return Err(FingerprintError::InvalidOption(
                "channel count must be > 0".to_string(),
            ));
        }

        self.state = State::Idle;
        self.pipeline.start(sample_rate, channels)?;
        self.state = State::Running(Session::new(sample_rate, channels, &self.options));
        debug!(algorithm = ?self.options.algorithm, "fingerprinting started");
        Ok(())
    }

    /// Forward interleaved samples to the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`FingerprintError::NotStarted`] outside a `start`/`finish` pair,
    /// or whatever the pipeline reports.
    pub fn feed(&mut self, samples: &[i16]) -> Result<()> {
        let State::Running(session) = &mut self.state else {
            return Err(FingerprintError::NotStarted);
        };

        let owned;
        let mut audio = samples;
        if session.skipping_silence {
            owned = session.strip_leading_silence(samples, self.options.silence_threshold);
            audio = owned.as_slice();
        }

        if let Some(limit) = session.sample_limit {
            let room = limit.saturating_sub(session.forwarded);
            if (audio.len() as u64) > room {
                if !session.truncated {
                    debug!(
                        limit,
                        max_duration_secs = self.options.max_duration_secs,
                        "Truncating audio samples to fingerprint duration limit"
                    );
                    session.truncated = true;
                }
                audio = &audio[..room as usize];
            }
        }

        if audio.is_empty() {
            return Ok(());
        }

        self.pipeline.consume(audio)?;
        session.forwarded += audio.len() as u64;
        Ok(())
    }

    /// Finish the stream and return the tagged fingerprint.
    #[instrument(skip(self))]
    pub fn finish(&mut self) -> Result<RawFingerprint> {
        let session = match std::mem::replace(&mut self.state, State::Idle) {
            State::Running(session) => session,
            other => {
                self.state = other;
                return Err(FingerprintError::NotStarted);
            }
        };

        let subfingerprints = self.pipeline.finish()?;
        if subfingerprints.is_empty() {
            warn!(
                forwarded = session.forwarded,
                "pipeline produced no subfingerprints"
            );
        }

        let fingerprint = RawFingerprint::new(subfingerprints, self.options.algorithm);
        debug!(
            subfingerprints = fingerprint.len(),
            duration_secs = session.duration_secs(),
            truncated = session.truncated,
            "fingerprinting finished"
        );
        self.state = State::Finished(fingerprint.clone());
        Ok(fingerprint)
    }

    /// Seconds of audio forwarded so far in the running stream.
    pub fn duration_secs(&self) -> Option<u32> {
        match &self.state {
            State::Running(session) => Some(session.duration_secs()),
            _ => None,
        }
    }

    /// The fingerprint from the last completed stream.
    pub fn fingerprint(&self) -> Option<&RawFingerprint> {
        match &self.state {
            State::Finished(fingerprint) => Some(fingerprint),
            _ => None,
        }
    }

    /// The last fingerprint, compressed and wrapped per the options.
    pub fn encoded(&self) -> Result<Vec<u8>> {
        self.finished()?.encode(self.options.text_encoding)
    }

    pub fn digest(&self) -> Result<Digest> {
        Ok(self.finished()?.digest())
    }

    fn finished(&self) -> Result<&RawFingerprint> {
        self.fingerprint().ok_or(FingerprintError::NotFinished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::{Algorithm, AlgorithmTag};
    use crate::text::TextEncoding;

    /// Pipeline that records what it was fed and emits one subfingerprint per
    /// `frame` samples, each equal to the sum of that frame's samples.
    #[derive(Default)]
    struct RecordingPipeline {
        started: Option<(u32, u16)>,
        consumed: Vec<i16>,
        fail_start: bool,
    }

    impl SubfingerprintPipeline for RecordingPipeline {
        fn start(&mut self, sample_rate: u32, channels: u16) -> Result<()> {
            if self.fail_start {
                return Err(FingerprintError::Pipeline("start refused".to_string()));
            }
            self.started = Some((sample_rate, channels));
            self.consumed.clear();
            Ok(())
        }

        fn consume(&mut self, samples: &[i16]) -> Result<()> {
            self.consumed.extend_from_slice(samples);
            Ok(())
        }

        fn finish(&mut self) -> Result<Vec<u32>> {
            Ok(self
                .consumed
                .chunks(4)
                .map(|frame| frame.iter().map(|&s| s as i32).sum::<i32>() as u32)
                .collect())
        }
    }

    fn fingerprinter(options: FingerprinterOptions) -> Fingerprinter<RecordingPipeline> {
        Fingerprinter::new(RecordingPipeline::default(), options).unwrap()
    }

    #[test]
    fn test_start_feed_finish() {
        let mut fp = fingerprinter(FingerprinterOptions::default());
        fp.start(8, 1).unwrap();
        fp.feed(&[1, 1, 1, 1, 2, 2, 2, 2]).unwrap();
        let result = fp.finish().unwrap();

        assert_eq!(result.subfingerprints, vec![4, 8]);
        assert_eq!(result.algorithm, Algorithm::Test2.tag());
        assert_eq!(fp.pipeline.started, Some((8, 1)));
        assert_eq!(fp.fingerprint(), Some(&result));
    }

    #[test]
    fn test_feed_before_start() {
        let mut fp = fingerprinter(FingerprinterOptions::default());
        assert_eq!(fp.feed(&[1, 2, 3]), Err(FingerprintError::NotStarted));
        assert_eq!(fp.finish(), Err(FingerprintError::NotStarted));
    }

    #[test]
    fn test_feed_after_finish() {
        let mut fp = fingerprinter(FingerprinterOptions::default());
        fp.start(8, 1).unwrap();
        fp.finish().unwrap();
        assert_eq!(fp.feed(&[1]), Err(FingerprintError::NotStarted));
    }

    #[test]
    fn test_start_rejects_zero_rate_and_channels() {
        let mut fp = fingerprinter(FingerprinterOptions::default());
        assert!(matches!(
            fp.start(0, 1),
            Err(FingerprintError::InvalidOption(_))
        ));
        assert!(matches!(
            fp.start(44_100, 0),
            Err(FingerprintError::InvalidOption(_))
        ));
    }

    #[test]
    fn test_pipeline_start_failure_leaves_idle() {
        let pipeline = RecordingPipeline {
            fail_start: true,
            ..Default::default()
        };
        let mut fp = Fingerprinter::new(pipeline, FingerprinterOptions::default()).unwrap();
        assert!(matches!(fp.start(8, 1), Err(FingerprintError::Pipeline(_))));
        assert_eq!(fp.feed(&[1]), Err(FingerprintError::NotStarted));
    }

    #[test]
    fn test_invalid_options_rejected() {
        let options = FingerprinterOptions {
            silence_threshold: u16::MAX,
            ..Default::default()
        };
        assert!(Fingerprinter::new(RecordingPipeline::default(), options).is_err());
    }

    #[test]
    fn test_duration_cap_truncates_samples() {
        let options = FingerprinterOptions {
            max_duration_secs: 2,
            ..Default::default()
        };
        let mut fp = fingerprinter(options);
        // 4 Hz stereo: 16 samples fit in two seconds.
        fp.start(4, 2).unwrap();
        fp.feed(&[1; 10]).unwrap();
        fp.feed(&[1; 10]).unwrap();
        assert_eq!(fp.duration_secs(), Some(2));
        fp.feed(&[1; 10]).unwrap();
        assert_eq!(fp.pipeline.consumed.len(), 16);
    }

    #[test]
    fn test_zero_duration_disables_cap() {
        let options = FingerprinterOptions {
            max_duration_secs: 0,
            ..Default::default()
        };
        let mut fp = fingerprinter(options);
        fp.start(1, 1).unwrap();
        fp.feed(&[1; 1000]).unwrap();
        assert_eq!(fp.pipeline.consumed.len(), 1000);
    }

    #[test]
    fn test_leading_silence_skipped_by_frame() {
        let options = FingerprinterOptions {
            silence_threshold: 10,
            ..Default::default()
        };
        let mut fp = fingerprinter(options);
        fp.start(100, 2).unwrap();
        // Frame [3, 50] is the first with a loud sample and is kept whole.
        fp.feed(&[0, 5, -10, 10, 3]).unwrap();
        assert!(fp.pipeline.consumed.is_empty());
        fp.feed(&[50, 0, 0]).unwrap();
        assert_eq!(fp.pipeline.consumed, vec![3, 50, 0, 0]);
        // Once audio has started, quiet samples pass through.
        fp.feed(&[1, 1]).unwrap();
        assert_eq!(fp.pipeline.consumed, vec![3, 50, 0, 0, 1, 1]);
    }

    #[test]
    fn test_silence_skipping_disabled_by_default() {
        let mut fp = fingerprinter(FingerprinterOptions::default());
        fp.start(100, 1).unwrap();
        fp.feed(&[0, 0, 0]).unwrap();
        assert_eq!(fp.pipeline.consumed, vec![0, 0, 0]);
    }

    #[test]
    fn test_artifacts_require_finish() {
        let mut fp = fingerprinter(FingerprinterOptions::default());
        assert_eq!(fp.digest(), Err(FingerprintError::NotFinished));
        fp.start(8, 1).unwrap();
        assert_eq!(fp.encoded(), Err(FingerprintError::NotFinished));
    }

    #[test]
    fn test_encoded_and_digest_after_finish() {
        let options = FingerprinterOptions {
            algorithm: Algorithm::Test4,
            text_encoding: TextEncoding::Base64,
            ..Default::default()
        };
        let mut fp = fingerprinter(options);
        fp.start(8, 1).unwrap();
        fp.feed(&[1, 0, 0, 0, 1, 0, 0, 0, 3, 0, 0, 0]).unwrap();
        let result = fp.finish().unwrap();

        let encoded = fp.encoded().unwrap();
        let decoded = RawFingerprint::decode(&encoded, TextEncoding::Base64).unwrap();
        assert_eq!(decoded, result);
        assert_eq!(decoded.algorithm, AlgorithmTag::new(3));
        assert_eq!(fp.digest().unwrap(), result.digest());
    }

    #[test]
    fn test_restart_discards_previous_fingerprint() {
        let mut fp = fingerprinter(FingerprinterOptions::default());
        fp.start(8, 1).unwrap();
        fp.feed(&[1, 1, 1, 1]).unwrap();
        fp.finish().unwrap();
        assert!(fp.fingerprint().is_some());

        fp.start(8, 1).unwrap();
        assert!(fp.fingerprint().is_none());
        assert_eq!(fp.finish().unwrap().subfingerprints, Vec::<u32>::new());
    }
}
