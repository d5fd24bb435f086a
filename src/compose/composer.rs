use crate::audio::timeline::{AudioTimeline, PlacedAnnouncement, sample_offset, slots, split_slots};
use crate::audio::wav::write_track;
use crate::compose::phase::{PhasePlan, TimedAnnouncement, merge_phases};
use crate::compose::report::{Diagnostic, DiagnosticReporter, GenerationReport, LogReporter};
use crate::defaults::{
    COUNTDOWN_SLOT_SAMPLES, MAX_TRACK_SECONDS, SAMPLE_RATE, TTS_RATE_COUNTDOWN, TTS_RATE_NORMAL,
    worker_count,
};
use crate::error::{ErrorKind, Result, VoxtimerError};
use crate::tts::Synthesizer;
use crossbeam_channel::{bounded, unbounded};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;

/// Knobs for one composition run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComposeOptions {
    /// Speech rate for phrases.
    pub rate_normal: u32,
    /// Speech rate for bare numbers.
    pub rate_countdown: u32,
    /// Synthesis worker threads; 1 runs sequentially.
    pub workers: usize,
    /// Leave a slot silent instead of failing when synthesis fails.
    pub best_effort: bool,
    /// Silence appended after the main phase.
    pub tail_seconds: u64,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            rate_normal: TTS_RATE_NORMAL,
            rate_countdown: TTS_RATE_COUNTDOWN,
            workers: worker_count(),
            best_effort: false,
            tail_seconds: 0,
        }
    }
}

/// One slot's synthesis work. Owns exclusive access to its region.
struct Job<'b> {
    index: usize,
    item: &'b TimedAnnouncement,
    region: &'b mut [i16],
}

/// What happened to a slot.
#[derive(Debug)]
enum Outcome {
    Placed { written: usize, clip_len: usize },
    Skipped { reason: String },
}

/// Renders phase plans into a single track.
///
/// The synthesizer is borrowed for the lifetime of the composer and is
/// shared by all worker threads of a run.
pub struct Composer<'a> {
    synthesizer: &'a dyn Synthesizer,
    options: ComposeOptions,
    reporter: &'a dyn DiagnosticReporter,
}

impl<'a> Composer<'a> {
    pub fn new(synthesizer: &'a dyn Synthesizer, options: ComposeOptions) -> Self {
        Self {
            synthesizer,
            options,
            reporter: &LogReporter,
        }
    }

    /// Send diagnostics somewhere other than the log.
    pub fn with_reporter(mut self, reporter: &'a dyn DiagnosticReporter) -> Self {
        self.reporter = reporter;
        self
    }

    fn validate(&self, prep: &PhasePlan, main: &PhasePlan) -> Result<u64> {
        if prep.duration_seconds() == 0 {
            return Err(VoxtimerError::invalid_value(
                "prep_duration",
                "must be greater than 0",
            ));
        }
        if main.duration_seconds() == 0 {
            return Err(VoxtimerError::invalid_value(
                "main_duration",
                "must be greater than 0",
            ));
        }
        if self.options.rate_normal == 0 {
            return Err(VoxtimerError::invalid_value(
                "tts.rate_normal",
                "must be greater than 0",
            ));
        }
        if self.options.rate_countdown == 0 {
            return Err(VoxtimerError::invalid_value(
                "tts.rate_countdown",
                "must be greater than 0",
            ));
        }
        if self.options.workers == 0 {
            return Err(VoxtimerError::invalid_value(
                "compose.workers",
                "must be at least 1",
            ));
        }

        let total = prep
            .duration_seconds()
            .checked_add(main.duration_seconds())
            .and_then(|t| t.checked_add(self.options.tail_seconds))
            .filter(|&t| t <= MAX_TRACK_SECONDS)
            .ok_or_else(|| {
                VoxtimerError::invalid_value(
                    "duration",
                    format!("track may not be longer than {}s", MAX_TRACK_SECONDS),
                )
            })?;
        Ok(total)
    }

    /// Synthesize every announcement of both phases into an in-memory track.
    pub fn compose(
        &self,
        prep: &PhasePlan,
        main: &PhasePlan,
    ) -> Result<(AudioTimeline, Vec<Diagnostic>)> {
        let total_seconds = self.validate(prep, main)?;
        let started = Instant::now();

        let (items, mut diagnostics) = merge_phases(prep, main);
        let mut timeline = AudioTimeline::silent(total_seconds, SAMPLE_RATE)?;

        let starts = items
            .iter()
            .map(|item| sample_offset(item.at_seconds, SAMPLE_RATE))
            .collect::<Result<Vec<_>>>()?;
        let slots = slots(&starts, timeline.total_samples());

        tracing::debug!(
            "Composing {} announcements over {}s with {} ({} workers)",
            items.len(),
            total_seconds,
            self.synthesizer.name(),
            self.options.workers
        );

        let outcomes = {
            let regions = split_slots(timeline.samples_mut(), &slots)?;
            let jobs = items
                .iter()
                .zip(regions)
                .enumerate()
                .map(|(index, (item, region))| Job {
                    index,
                    item,
                    region,
                })
                .collect();
            self.run_jobs(jobs)?
        };

        let mut placed = Vec::with_capacity(items.len());
        for ((item, slot), outcome) in items.iter().zip(&slots).zip(outcomes) {
            let text = &item.announcement.text;
            match outcome {
                Outcome::Placed { written, clip_len } => {
                    if clip_len > written {
                        diagnostics.push(Diagnostic::Clipped {
                            text: text.clone(),
                            at_seconds: item.at_seconds,
                            clip_samples: clip_len,
                            slot_samples: slot.len(),
                        });
                    }
                    if written > 0 {
                        tracing::debug!(
                            "Placed '{}' at {}s ({} samples)",
                            text,
                            item.at_seconds,
                            written
                        );
                        placed.push(PlacedAnnouncement {
                            start_sample: slot.start,
                            length_samples: written,
                            at_seconds: item.at_seconds,
                            text: text.clone(),
                        });
                    }
                }
                Outcome::Skipped { reason } => {
                    diagnostics.push(Diagnostic::SynthesisSkipped {
                        text: text.clone(),
                        at_seconds: item.at_seconds,
                        reason,
                    });
                }
            }
        }
        timeline.set_placed(placed)?;

        for diagnostic in &diagnostics {
            self.reporter.report(diagnostic);
        }
        tracing::info!(
            "Composed {} of {} announcements into {}s of audio in {:.2?}",
            timeline.placed().len(),
            items.len(),
            total_seconds,
            started.elapsed()
        );

        Ok((timeline, diagnostics))
    }

    /// Compose and publish the track at `output`.
    ///
    /// Nothing is written unless every announcement was handled.
    pub fn generate(
        &self,
        prep: &PhasePlan,
        main: &PhasePlan,
        output: &Path,
    ) -> Result<GenerationReport> {
        let (timeline, diagnostics) = self.compose(prep, main)?;
        let path = write_track(output, timeline.samples())?;
        tracing::info!(
            "Wrote {} samples to {}",
            timeline.total_samples(),
            path.display()
        );

        Ok(GenerationReport {
            path,
            total_samples: timeline.total_samples(),
            sample_rate: timeline.sample_rate(),
            placed: timeline.placed().to_vec(),
            diagnostics,
        })
    }

    /// Feed jobs through a bounded queue to scoped workers.
    ///
    /// Dispatch stops after the first fatal error. Outcomes come back in
    /// job order.
    fn run_jobs(&self, jobs: Vec<Job<'_>>) -> Result<Vec<Outcome>> {
        let job_count = jobs.len();
        let workers = self.options.workers.clamp(1, job_count.max(1));
        let (job_tx, job_rx) = bounded::<Job<'_>>(workers);
        let (result_tx, result_rx) = unbounded::<(usize, Result<Outcome>)>();
        let failed = AtomicBool::new(false);

        thread::scope(|scope| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                let failed = &failed;
                scope.spawn(move || {
                    for job in job_rx.iter() {
                        if failed.load(Ordering::SeqCst) {
                            continue;
                        }
                        let outcome = self.place(job.item, job.region);
                        if outcome.is_err() {
                            failed.store(true, Ordering::SeqCst);
                        }
                        if result_tx.send((job.index, outcome)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(job_rx);
            drop(result_tx);

            for job in jobs {
                if failed.load(Ordering::SeqCst) || job_tx.send(job).is_err() {
                    break;
                }
            }
            drop(job_tx);
        });

        let mut results: Vec<(usize, Result<Outcome>)> = result_rx.iter().collect();
        results.sort_by_key(|(index, _)| *index);

        let mut outcomes = Vec::with_capacity(job_count);
        for (_, result) in results {
            outcomes.push(result?);
        }
        if outcomes.len() != job_count {
            return Err(VoxtimerError::Internal(format!(
                "only {} of {} announcements were synthesized",
                outcomes.len(),
                job_count
            )));
        }
        Ok(outcomes)
    }

    /// Synthesize one announcement into its slot.
    fn place(&self, item: &TimedAnnouncement, region: &mut [i16]) -> Result<Outcome> {
        match self.synthesize_into(item, region) {
            Err(e) if self.options.best_effort && e.kind() == ErrorKind::Synthesis => {
                tracing::debug!("Leaving '{}' silent: {}", item.announcement.text, e);
                Ok(Outcome::Skipped {
                    reason: e.to_string(),
                })
            }
            other => other,
        }
    }

    fn synthesize_into(&self, item: &TimedAnnouncement, region: &mut [i16]) -> Result<Outcome> {
        let announcement = &item.announcement;
        let countdown = announcement.is_countdown_token();
        let rate = if countdown {
            self.options.rate_countdown
        } else {
            self.options.rate_normal
        };

        let clip = self
            .synthesizer
            .synthesize(&announcement.text, rate)?
            .resampled_to(SAMPLE_RATE);
        if clip.is_empty() {
            return Err(VoxtimerError::Synthesis {
                text: announcement.text.clone(),
                message: format!("{} produced an empty clip", self.synthesizer.name()),
            });
        }
        if countdown && clip.len() >= COUNTDOWN_SLOT_SAMPLES {
            return Err(VoxtimerError::CountdownTooSlow {
                text: announcement.text.clone(),
                duration_ms: clip.duration().as_millis() as u64,
                rate,
            });
        }

        let written = clip.len().min(region.len());
        region[..written].copy_from_slice(&clip.samples[..written]);
        Ok(Outcome::Placed {
            written,
            clip_len: clip.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::wav::read_track;
    use crate::schedule::{Announcement, StageSchedule, Verbosity};
    use crate::tts::MockSynthesizer;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    fn options(workers: usize) -> ComposeOptions {
        ComposeOptions {
            workers,
            ..Default::default()
        }
    }

    fn default_plans(prep: u64, main: u64) -> (PhasePlan, PhasePlan) {
        let schedule = StageSchedule::default();
        (
            PhasePlan::from_schedule(&schedule, prep),
            PhasePlan::from_schedule(&schedule, main),
        )
    }

    fn phrase_plan(duration: u64, entries: &[(u64, &str)]) -> PhasePlan {
        PhasePlan::new(
            duration,
            entries
                .iter()
                .map(|&(t, text)| Announcement::with_text(t, text, Verbosity::High))
                .collect(),
        )
        .unwrap()
    }

    #[derive(Default)]
    struct CollectingReporter {
        seen: Mutex<Vec<Diagnostic>>,
    }

    impl DiagnosticReporter for CollectingReporter {
        fn report(&self, diagnostic: &Diagnostic) {
            self.seen.lock().unwrap().push(diagnostic.clone());
        }
    }

    #[test]
    fn test_default_track_layout() {
        let synth = MockSynthesizer::new();
        let (prep, main) = default_plans(20, 415);
        let (timeline, diagnostics) = Composer::new(&synth, options(4))
            .compose(&prep, &main)
            .unwrap();

        assert_eq!(timeline.total_samples(), 435 * 22050);
        assert_eq!(timeline.sample_rate(), 22050);
        // 12 prep + 22 main - 1 superseded, minus "Finished" at the very end
        assert_eq!(synth.calls(), 33);
        assert_eq!(timeline.placed().len(), 32);

        assert!(matches!(diagnostics[0], Diagnostic::Superseded { at_seconds: 20, .. }));
        assert_eq!(
            diagnostics[1],
            Diagnostic::Clipped {
                text: "Finished".to_string(),
                at_seconds: 435,
                clip_samples: synth.clip_len("Finished", TTS_RATE_NORMAL),
                slot_samples: 0,
            }
        );
        assert_eq!(diagnostics.len(), 2);
        // a default run has nothing worth warning about
        assert!(diagnostics.iter().all(Diagnostic::is_expected));
    }

    #[test]
    fn test_silence_outside_placed_ranges() {
        let synth = MockSynthesizer::new();
        let (prep, main) = default_plans(20, 75);
        let (timeline, _) = Composer::new(&synth, options(2))
            .compose(&prep, &main)
            .unwrap();

        let mut cursor = 0;
        for placed in timeline.placed() {
            let range = placed.range();
            assert!(range.start >= cursor, "placements overlap");
            assert!(timeline.samples()[cursor..range.start].iter().all(|&s| s == 0));
            assert!(timeline.clip(placed).iter().all(|&s| s != 0));
            cursor = range.end;
        }
        assert!(timeline.samples()[cursor..].iter().all(|&s| s == 0));
    }

    #[test]
    fn test_placements_start_on_announcement_seconds() {
        let synth = MockSynthesizer::new();
        let (prep, main) = default_plans(20, 415);
        let (timeline, _) = Composer::new(&synth, options(3))
            .compose(&prep, &main)
            .unwrap();
        for placed in timeline.placed() {
            assert_eq!(placed.start_sample, placed.at_seconds as usize * 22050);
        }
        let opening = &timeline.placed()[0];
        assert_eq!(opening.text, "20 seconds remaining");
        assert_eq!(opening.start_sample, 0);
    }

    #[test]
    fn test_tail_makes_finished_audible() {
        let synth = MockSynthesizer::new();
        let (prep, main) = default_plans(20, 415);
        let opts = ComposeOptions {
            tail_seconds: 2,
            ..options(2)
        };
        let (timeline, diagnostics) = Composer::new(&synth, opts).compose(&prep, &main).unwrap();

        assert_eq!(timeline.total_samples(), 437 * 22050);
        let last = timeline.placed().last().unwrap();
        assert_eq!(last.text, "Finished");
        assert_eq!(last.start_sample, 435 * 22050);
        assert!(!diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::Clipped { .. })));
    }

    #[test]
    fn test_worker_count_does_not_change_output() {
        let (prep, main) = default_plans(20, 130);
        let sequential = MockSynthesizer::new();
        let parallel = MockSynthesizer::new();
        let (a, _) = Composer::new(&sequential, options(1))
            .compose(&prep, &main)
            .unwrap();
        let (b, _) = Composer::new(&parallel, options(4))
            .compose(&prep, &main)
            .unwrap();
        assert_eq!(a.samples(), b.samples());
        assert_eq!(a.placed(), b.placed());
    }

    #[test]
    fn test_long_clip_is_truncated_at_next_announcement() {
        let synth = MockSynthesizer::new().with_duration(Duration::from_secs(15));
        let prep = phrase_plan(20, &[(20, "get ready"), (10, "almost there")]);
        let main = phrase_plan(5, &[(5, "go"), (0, "stop")]);
        let reporter = CollectingReporter::default();
        let (timeline, diagnostics) = Composer::new(&synth, options(2))
            .with_reporter(&reporter)
            .compose(&prep, &main)
            .unwrap();

        let first = &timeline.placed()[0];
        assert_eq!(first.text, "get ready");
        assert_eq!(first.length_samples, 10 * 22050);
        assert_eq!(
            diagnostics[0],
            Diagnostic::Clipped {
                text: "get ready".to_string(),
                at_seconds: 0,
                clip_samples: 15 * 22050,
                slot_samples: 10 * 22050,
            }
        );
        assert_eq!(*reporter.seen.lock().unwrap(), diagnostics);
    }

    #[test]
    fn test_slow_countdown_token_is_configuration_error() {
        let synth = MockSynthesizer::new().with_duration(Duration::from_secs(1));
        let (prep, main) = default_plans(1, 5);
        let opts = ComposeOptions {
            best_effort: true,
            ..options(1)
        };
        let err = Composer::new(&synth, opts).compose(&prep, &main).unwrap_err();
        match &err {
            VoxtimerError::CountdownTooSlow {
                text,
                duration_ms,
                rate,
            } => {
                // prep's opening "1" is the first numeric token
                assert_eq!(text, "1");
                assert_eq!(*duration_ms, 1000);
                assert_eq!(*rate, TTS_RATE_COUNTDOWN);
            }
            other => panic!("Expected CountdownTooSlow, got {:?}", other),
        }
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_countdown_tokens_use_countdown_rate() {
        let synth = MockSynthesizer::new();
        let (prep, main) = default_plans(1, 3);
        let opts = ComposeOptions {
            rate_countdown: 300,
            ..options(1)
        };
        let (timeline, _) = Composer::new(&synth, opts).compose(&prep, &main).unwrap();
        let three = timeline.placed().iter().find(|p| p.text == "3").unwrap();
        assert_eq!(three.at_seconds, 1);
        assert_eq!(three.length_samples, synth.clip_len("3", 300));
    }

    #[test]
    fn test_synthesis_failure_is_fatal() {
        let synth = MockSynthesizer::new().failing_on("5");
        let (prep, main) = default_plans(20, 415);
        let err = Composer::new(&synth, options(4))
            .compose(&prep, &main)
            .unwrap_err();
        assert!(matches!(err, VoxtimerError::Synthesis { ref text, .. } if text == "5"));
    }

    #[test]
    fn test_failure_stops_dispatch() {
        let synth = MockSynthesizer::new().with_failure();
        let (prep, main) = default_plans(20, 415);
        assert!(Composer::new(&synth, options(1)).compose(&prep, &main).is_err());
        assert_eq!(synth.calls(), 1);
    }

    #[test]
    fn test_best_effort_leaves_slot_silent() {
        let synth = MockSynthesizer::new().failing_on("5");
        let (prep, main) = default_plans(1, 10);
        let opts = ComposeOptions {
            best_effort: true,
            ..options(2)
        };
        let (timeline, diagnostics) = Composer::new(&synth, opts).compose(&prep, &main).unwrap();

        assert!(!timeline.placed().iter().any(|p| p.text == "5"));
        // "5" is spoken at 6s elapsed
        assert!(timeline.samples()[6 * 22050..7 * 22050].iter().all(|&s| s == 0));
        assert!(diagnostics.iter().any(|d| matches!(
            d,
            Diagnostic::SynthesisSkipped { text, at_seconds: 6, .. } if text == "5"
        )));
    }

    #[test]
    fn test_empty_clip_is_synthesis_error() {
        let synth = MockSynthesizer::new().with_empty_output();
        let (prep, main) = default_plans(1, 3);
        let err = Composer::new(&synth, options(1))
            .compose(&prep, &main)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Synthesis);
        assert!(err.to_string().contains("empty clip"));
    }

    #[test]
    fn test_rejects_invalid_runs() {
        let synth = MockSynthesizer::new();
        let (prep, main) = default_plans(20, 0);
        assert!(Composer::new(&synth, options(1)).compose(&prep, &main).is_err());

        let (prep, main) = default_plans(0, 30);
        let err = Composer::new(&synth, options(1))
            .compose(&prep, &main)
            .unwrap_err();
        assert!(
            matches!(err, VoxtimerError::ConfigInvalidValue { ref key, .. } if key == "prep_duration")
        );

        let (prep, main) = default_plans(20, 30);
        let zero_rate = ComposeOptions {
            rate_normal: 0,
            ..options(1)
        };
        assert!(Composer::new(&synth, zero_rate).compose(&prep, &main).is_err());
        assert!(Composer::new(&synth, options(0)).compose(&prep, &main).is_err());

        let long_tail = ComposeOptions {
            tail_seconds: MAX_TRACK_SECONDS,
            ..options(1)
        };
        let err = Composer::new(&synth, long_tail)
            .compose(&prep, &main)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(synth.calls(), 0);
    }

    #[test]
    fn test_generate_publishes_track() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("timer.wav");
        let synth = MockSynthesizer::new();
        let (prep, main) = default_plans(5, 15);

        let report = Composer::new(&synth, options(2))
            .generate(&prep, &main, &output)
            .unwrap();

        assert!(report.path.is_absolute());
        assert_eq!(report.total_samples, 20 * 22050);
        assert_eq!(report.sample_rate, 22050);
        assert_eq!(report.duration(), Duration::from_secs(20));

        let (spec, samples) = read_track(&report.path).unwrap();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 22050);
        assert_eq!(samples.len(), report.total_samples);
        for placed in &report.placed {
            assert!(samples[placed.range()].iter().all(|&s| s != 0));
        }
    }

    #[test]
    fn test_failed_generate_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("timer.wav");
        let synth = MockSynthesizer::new().with_failure();
        let (prep, main) = default_plans(5, 15);

        assert!(Composer::new(&synth, options(2))
            .generate(&prep, &main, &output)
            .is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
