//! Speech synthesis boundary.
//!
//! The composer only sees the [`Synthesizer`] trait. [`CommandSynthesizer`]
//! drives an external speech program; [`MockSynthesizer`] produces
//! deterministic tones for tests and dry runs.

pub mod command;
pub mod synthesizer;

pub use command::{CommandRunner, CommandSynthesizer, SystemCommandRunner};
pub use synthesizer::{Clip, MockSynthesizer, Synthesizer};
