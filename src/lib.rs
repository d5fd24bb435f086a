//! voxtimer - pre-rendered spoken countdown tracks
//!
//! Schedules announcements for a preparation phase and a main phase, speaks
//! them through an external synthesizer, and lays the clips into one WAV
//! track that can be played back in a single shot.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod compose;
pub mod config;
pub mod defaults;
pub mod error;
pub mod playback;
pub mod schedule;
pub mod tts;

#[cfg(feature = "cli")]
pub mod app;
#[cfg(feature = "cli")]
pub mod cli;
#[cfg(feature = "cli")]
pub mod diagnostics;

// Scheduling
pub use schedule::{Announcement, Stage, StageSchedule, Verbosity, render_text};

// Synthesis
pub use tts::{Clip, CommandSynthesizer, MockSynthesizer, Synthesizer};

// Composition
pub use audio::{AudioTimeline, PlacedAnnouncement};
pub use compose::{
    ComposeOptions, Composer, Diagnostic, DiagnosticReporter, GenerationReport, PhasePlan,
};

// Playback
pub use playback::{Countdown, Player, run_session};

// Error handling
pub use error::{ErrorKind, Result, VoxtimerError};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
