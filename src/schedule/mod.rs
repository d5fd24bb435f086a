//! Announcement scheduling.
//!
//! A [`StageSchedule`] splits the remaining-time axis of one countdown phase
//! into stages, each announcing at its own interval and verbosity. The
//! schedule turns a phase duration into an ordered list of [`Announcement`]s.

pub mod announcement;
pub mod stage;

pub use announcement::{Announcement, OverrideEntry, from_overrides, render_text};
pub use stage::{Stage, StageSchedule, Verbosity};
