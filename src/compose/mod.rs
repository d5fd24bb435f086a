//! Track composition.
//!
//! Both phases are merged onto one elapsed-time axis, every announcement is
//! synthesized into its own slot of a silent buffer, and the buffer is
//! published as a WAV file. Non-fatal events are collected as
//! [`Diagnostic`]s on the way.

pub mod composer;
pub mod phase;
pub mod report;

pub use composer::{ComposeOptions, Composer};
pub use phase::{Phase, PhasePlan, TimedAnnouncement, merge_phases};
pub use report::{Diagnostic, DiagnosticReporter, GenerationReport, LogReporter};
