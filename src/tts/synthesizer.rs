use crate::audio::wav::resample;
use crate::defaults::SAMPLE_RATE;
use crate::error::{Result, VoxtimerError};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Mono 16-bit PCM produced by a synthesizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clip {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl Clip {
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    /// Convert to `rate` by linear interpolation. No-op when already there.
    pub fn resampled_to(self, rate: u32) -> Self {
        if self.sample_rate == rate {
            return self;
        }
        Self {
            samples: resample(&self.samples, self.sample_rate, rate),
            sample_rate: rate,
        }
    }
}

/// Trait for text-to-speech synthesis.
///
/// Implementations are handed to the composer for a single run and may be
/// called from several worker threads at once.
pub trait Synthesizer: Send + Sync {
    /// Synthesize `text` at speech `rate` (words per minute).
    ///
    /// Clips should be mono at [`SAMPLE_RATE`]; other rates are resampled by
    /// the caller. An empty clip is treated as a synthesis failure.
    fn synthesize(&self, text: &str, rate: u32) -> Result<Clip>;

    /// Name of the underlying engine, for logs.
    fn name(&self) -> &str;

    /// Check if the synthesizer can be used.
    fn is_ready(&self) -> bool;
}

impl<T: Synthesizer> Synthesizer for Arc<T> {
    fn synthesize(&self, text: &str, rate: u32) -> Result<Clip> {
        (**self).synthesize(text, rate)
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }
}

/// Average characters per spoken word, used to derive mock clip lengths.
const MOCK_CHARS_PER_WORD: u64 = 6;

/// Square wave amplitude of mock clips. Never zero, so placed audio is
/// always distinguishable from silence.
const MOCK_AMPLITUDE: i16 = 8000;

/// Deterministic synthesizer: a square wave whose length follows the text
/// length and speech rate.
#[derive(Debug, Default)]
pub struct MockSynthesizer {
    fixed_duration: Option<Duration>,
    fail_on: Option<String>,
    fail_all: bool,
    empty_output: bool,
    calls: AtomicUsize,
}

impl MockSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every clip lasts exactly `duration`.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.fixed_duration = Some(duration);
        self
    }

    /// Fail for the given text only.
    pub fn failing_on(mut self, text: &str) -> Self {
        self.fail_on = Some(text.to_string());
        self
    }

    /// Fail on every call.
    pub fn with_failure(mut self) -> Self {
        self.fail_all = true;
        self
    }

    /// Return empty clips.
    pub fn with_empty_output(mut self) -> Self {
        self.empty_output = true;
        self
    }

    /// Number of synthesize calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Clip length for `text` at `rate`, in samples.
    pub fn clip_len(&self, text: &str, rate: u32) -> usize {
        let rate_hz = u64::from(SAMPLE_RATE);
        match self.fixed_duration {
            Some(d) => (d.as_secs_f64() * rate_hz as f64).round() as usize,
            None => {
                let chars = text.chars().count() as u64;
                let words_per_minute = u64::from(rate.max(1));
                (chars * rate_hz * 60 / (words_per_minute * MOCK_CHARS_PER_WORD)) as usize
            }
        }
    }
}

impl Synthesizer for MockSynthesizer {
    fn synthesize(&self, text: &str, rate: u32) -> Result<Clip> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_all || self.fail_on.as_deref() == Some(text) {
            return Err(VoxtimerError::Synthesis {
                text: text.to_string(),
                message: "mock synthesis failure".to_string(),
            });
        }
        if self.empty_output {
            return Ok(Clip::new(Vec::new(), SAMPLE_RATE));
        }

        // 100Hz square wave at 22.05kHz.
        let half_period = (SAMPLE_RATE / 200) as usize;
        let samples = (0..self.clip_len(text, rate))
            .map(|i| {
                if (i / half_period) % 2 == 0 {
                    MOCK_AMPLITUDE
                } else {
                    -MOCK_AMPLITUDE
                }
            })
            .collect();
        Ok(Clip::new(samples, SAMPLE_RATE))
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn is_ready(&self) -> bool {
        !self.fail_all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_clip_length_follows_text_and_rate() {
        let synth = MockSynthesizer::new();
        let short = synth.synthesize("7", 250).unwrap();
        let long = synth.synthesize("6 minutes remaining", 180).unwrap();
        assert!(short.len() < long.len());
        // One digit at 250 wpm is far below a second.
        assert!(short.duration() < Duration::from_millis(200));

        let slow = synth.synthesize("Finished", 90).unwrap();
        let fast = synth.synthesize("Finished", 180).unwrap();
        assert_eq!(slow.len(), fast.len() * 2);
    }

    #[test]
    fn test_mock_samples_are_never_silent() {
        let clip = MockSynthesizer::new().synthesize("Finished", 180).unwrap();
        assert!(!clip.is_empty());
        assert!(clip.samples.iter().all(|&s| s != 0));
        assert_eq!(clip.sample_rate, SAMPLE_RATE);
    }

    #[test]
    fn test_mock_fixed_duration() {
        let synth = MockSynthesizer::new().with_duration(Duration::from_millis(1500));
        let clip = synth.synthesize("1", 250).unwrap();
        assert_eq!(clip.len(), 33075);
        assert_eq!(clip.duration(), Duration::from_millis(1500));
    }

    #[test]
    fn test_mock_failing_on_specific_text() {
        let synth = MockSynthesizer::new().failing_on("Finished");
        assert!(synth.synthesize("5", 250).is_ok());
        match synth.synthesize("Finished", 180) {
            Err(VoxtimerError::Synthesis { text, message }) => {
                assert_eq!(text, "Finished");
                assert_eq!(message, "mock synthesis failure");
            }
            other => panic!("Expected Synthesis error, got {:?}", other),
        }
        assert!(synth.is_ready());
    }

    #[test]
    fn test_mock_with_failure_is_not_ready() {
        let synth = MockSynthesizer::new().with_failure();
        assert!(!synth.is_ready());
        assert!(synth.synthesize("anything", 180).is_err());
    }

    #[test]
    fn test_mock_counts_calls() {
        let synth = MockSynthesizer::new();
        synth.synthesize("a", 180).unwrap();
        synth.synthesize("b", 180).unwrap();
        assert_eq!(synth.calls(), 2);
    }

    #[test]
    fn test_mock_empty_output() {
        let clip = MockSynthesizer::new()
            .with_empty_output()
            .synthesize("x", 180)
            .unwrap();
        assert!(clip.is_empty());
    }

    #[test]
    fn test_synthesizer_trait_is_object_safe() {
        let synth: Box<dyn Synthesizer> = Box::new(MockSynthesizer::new());
        assert_eq!(synth.name(), "mock");
        assert!(synth.synthesize("boxed", 180).is_ok());
    }

    #[test]
    fn test_arc_synthesizer_delegates() {
        let synth = Arc::new(MockSynthesizer::new());
        synth.synthesize("shared", 180).unwrap();
        assert_eq!(synth.calls(), 1);
        assert_eq!(Synthesizer::name(&synth), "mock");
    }

    #[test]
    fn test_clip_resampled_to_target_rate() {
        let clip = Clip::new(vec![100i16; 11025], 11025).resampled_to(SAMPLE_RATE);
        assert_eq!(clip.sample_rate, SAMPLE_RATE);
        assert_eq!(clip.len(), 22050);
        assert_eq!(clip.duration(), Duration::from_secs(1));
    }

    #[test]
    fn test_clip_zero_rate_has_zero_duration() {
        assert_eq!(Clip::new(vec![1, 2, 3], 0).duration(), Duration::ZERO);
    }
}
