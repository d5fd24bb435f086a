//! Default configuration constants for voxtimer.
//!
//! Shared between the config layer, the composer and the CLI so the
//! rendered track format is defined in exactly one place.

/// Output sample rate in Hz.
///
/// 22.05kHz mono is plenty for speech and keeps a seven minute track under 20MB.
pub const SAMPLE_RATE: u32 = 22050;

/// Output channel count.
pub const CHANNELS: u16 = 1;

/// Output bit depth.
pub const BITS_PER_SAMPLE: u16 = 16;

/// Speech rate for phrase announcements ("2 minutes remaining").
pub const TTS_RATE_NORMAL: u32 = 180;

/// Speech rate for bare numeric countdown tokens.
///
/// Must be fast enough that every token fits its one second slot.
pub const TTS_RATE_COUNTDOWN: u32 = 250;

/// Upper bound for a numeric countdown clip, in samples.
pub const COUNTDOWN_SLOT_SAMPLES: usize = SAMPLE_RATE as usize;

/// Default preparation phase duration, in seconds.
pub const PREP_DURATION_SECS: u64 = 20;

/// Default main phase duration, in seconds (6m55s).
pub const MAIN_DURATION_SECS: u64 = 415;

/// Default output file name.
pub const OUTPUT_FILE: &str = "timer.wav";

/// Default speech program.
pub const TTS_PROGRAM: &str = "espeak-ng";

/// Placeholder replaced with the speech rate in [`TTS_ARGS`].
pub const RATE_PLACEHOLDER: &str = "{rate}";

/// Placeholder replaced with the announcement text in [`TTS_ARGS`].
pub const TEXT_PLACEHOLDER: &str = "{text}";

/// Placeholder replaced with a temporary WAV path in [`TTS_ARGS`].
///
/// Without it the program is expected to write WAV data to stdout.
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Default arguments for [`TTS_PROGRAM`].
pub const TTS_ARGS: &[&str] = &[
    "-w",
    OUTPUT_PLACEHOLDER,
    "-s",
    RATE_PLACEHOLDER,
    TEXT_PLACEHOLDER,
];

/// Default playback program.
pub const PLAYER_PROGRAM: &str = "aplay";

/// Placeholder replaced with the track path in [`PLAYER_ARGS`].
pub const PATH_PLACEHOLDER: &str = "{path}";

/// Default arguments for [`PLAYER_PROGRAM`].
pub const PLAYER_ARGS: &[&str] = &["-q", PATH_PLACEHOLDER];

/// Longest track accepted, in seconds.
///
/// Four hours of 16-bit mono at 22.05kHz is about 635MB, comfortably
/// inside the 4GB RIFF limit.
pub const MAX_TRACK_SECONDS: u64 = 4 * 3600;

/// Text spoken when a phase reaches zero.
pub const FINISHED_TEXT: &str = "Finished";

/// Cap on synthesis worker threads.
///
/// Speech engines are CPU bound and usually single threaded per process,
/// more workers than this mostly adds process spawn contention.
pub const MAX_WORKERS: usize = 4;

/// Default number of synthesis workers.
pub fn worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(MAX_WORKERS)
}
