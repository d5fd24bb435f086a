//! Non-fatal events of a composition run and the run summary.

use crate::audio::timeline::PlacedAnnouncement;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Something worth knowing about a run that did not stop it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A clip ran past its slot and was truncated.
    Clipped {
        text: String,
        at_seconds: u64,
        clip_samples: usize,
        slot_samples: usize,
    },
    /// Two announcements fell on the same second; the later phase's was kept.
    Superseded {
        dropped: String,
        kept: String,
        at_seconds: u64,
    },
    /// Best-effort mode left a slot silent after synthesis failed.
    SynthesisSkipped {
        text: String,
        at_seconds: u64,
        reason: String,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Clipped {
                text,
                at_seconds,
                clip_samples,
                slot_samples,
            } if *slot_samples == 0 => write!(
                f,
                "'{}' at {}s has no room before the end of the track ({} samples dropped)",
                text, at_seconds, clip_samples
            ),
            Diagnostic::Clipped {
                text,
                at_seconds,
                clip_samples,
                slot_samples,
            } => write!(
                f,
                "'{}' at {}s clipped from {} to {} samples",
                text, at_seconds, clip_samples, slot_samples
            ),
            Diagnostic::Superseded {
                dropped,
                kept,
                at_seconds,
            } => write!(f, "'{}' at {}s replaced by '{}'", dropped, at_seconds, kept),
            Diagnostic::SynthesisSkipped {
                text,
                at_seconds,
                reason,
            } => write!(f, "'{}' at {}s left silent: {}", text, at_seconds, reason),
        }
    }
}

impl Diagnostic {
    /// Events every default run produces: the boundary hand-over between
    /// phases and a final announcement with no tail to play into.
    pub fn is_expected(&self) -> bool {
        match self {
            Diagnostic::Superseded { .. } => true,
            Diagnostic::Clipped { slot_samples, .. } => *slot_samples == 0,
            Diagnostic::SynthesisSkipped { .. } => false,
        }
    }
}

/// Trait for reporting diagnostics as a run produces them.
pub trait DiagnosticReporter: Send + Sync {
    fn report(&self, diagnostic: &Diagnostic);
}

/// Reporter that logs each diagnostic; expected ones only at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl DiagnosticReporter for LogReporter {
    fn report(&self, diagnostic: &Diagnostic) {
        if diagnostic.is_expected() {
            tracing::debug!("{}", diagnostic);
        } else {
            tracing::warn!("{}", diagnostic);
        }
    }
}

/// What a finished run produced.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    /// Absolute path of the published track.
    pub path: PathBuf,
    pub total_samples: usize,
    pub sample_rate: u32,
    pub placed: Vec<PlacedAnnouncement>,
    pub diagnostics: Vec<Diagnostic>,
}

impl GenerationReport {
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.total_samples as f64 / f64::from(self.sample_rate.max(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clipped_display() {
        let d = Diagnostic::Clipped {
            text: "2 minutes remaining".to_string(),
            at_seconds: 295,
            clip_samples: 30000,
            slot_samples: 22050,
        };
        assert_eq!(
            d.to_string(),
            "'2 minutes remaining' at 295s clipped from 30000 to 22050 samples"
        );
    }

    #[test]
    fn test_clipped_at_end_display() {
        let d = Diagnostic::Clipped {
            text: "Finished".to_string(),
            at_seconds: 435,
            clip_samples: 9800,
            slot_samples: 0,
        };
        assert!(d.to_string().contains("no room before the end"));
    }

    #[test]
    fn test_end_of_track_clip_is_expected() {
        let at_end = Diagnostic::Clipped {
            text: "Finished".to_string(),
            at_seconds: 435,
            clip_samples: 9800,
            slot_samples: 0,
        };
        let truncated = Diagnostic::Clipped {
            text: "Finished".to_string(),
            at_seconds: 434,
            clip_samples: 30000,
            slot_samples: 22050,
        };
        let skipped = Diagnostic::SynthesisSkipped {
            text: "5".to_string(),
            at_seconds: 430,
            reason: "engine crashed".to_string(),
        };
        assert!(at_end.is_expected());
        assert!(!truncated.is_expected());
        assert!(!skipped.is_expected());
    }

    #[test]
    fn test_superseded_display() {
        let d = Diagnostic::Superseded {
            dropped: "Finished".to_string(),
            kept: "415 seconds remaining".to_string(),
            at_seconds: 20,
        };
        assert_eq!(
            d.to_string(),
            "'Finished' at 20s replaced by '415 seconds remaining'"
        );
    }

    #[test]
    fn test_diagnostic_serializes_with_kind_tag() {
        let d = Diagnostic::SynthesisSkipped {
            text: "7".to_string(),
            at_seconds: 428,
            reason: "engine crashed".to_string(),
        };
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["kind"], "synthesis_skipped");
        assert_eq!(json["at_seconds"], 428);
    }

    #[test]
    fn test_log_reporter() {
        // Just ensure it doesn't panic without a subscriber
        LogReporter.report(&Diagnostic::Superseded {
            dropped: "a".to_string(),
            kept: "b".to_string(),
            at_seconds: 1,
        });
    }

    #[test]
    fn test_report_duration() {
        let report = GenerationReport {
            path: PathBuf::from("/tmp/t.wav"),
            total_samples: 22050 * 3,
            sample_rate: 22050,
            placed: Vec::new(),
            diagnostics: Vec::new(),
        };
        assert_eq!(report.duration(), Duration::from_secs(3));
    }
}
