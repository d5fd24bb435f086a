//! Countdown phases and their merge onto one elapsed-time axis.

use crate::compose::report::Diagnostic;
use crate::error::{Result, VoxtimerError};
use crate::schedule::{Announcement, OverrideEntry, StageSchedule, from_overrides};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// The two back-to-back countdowns of a track. Ordered by playback order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Prep,
    Main,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Prep => write!(f, "prep"),
            Phase::Main => write!(f, "main"),
        }
    }
}

/// A phase's duration and the announcements to speak in it, earliest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhasePlan {
    duration_seconds: u64,
    announcements: Vec<Announcement>,
}

impl PhasePlan {
    /// Plan from explicit announcements.
    ///
    /// Rejects announcements outside `[0, duration]` or repeating a second.
    pub fn new(duration_seconds: u64, mut announcements: Vec<Announcement>) -> Result<Self> {
        let mut seen = HashSet::new();
        for a in &announcements {
            if a.remaining_seconds > duration_seconds {
                return Err(VoxtimerError::invalid_value(
                    "announcements",
                    format!(
                        "'{}' at {}s is outside the {}s phase",
                        a.text, a.remaining_seconds, duration_seconds
                    ),
                ));
            }
            if !seen.insert(a.remaining_seconds) {
                return Err(VoxtimerError::invalid_value(
                    "announcements",
                    format!("{}s has more than one announcement", a.remaining_seconds),
                ));
            }
        }
        announcements.sort_by(|a, b| b.remaining_seconds.cmp(&a.remaining_seconds));
        Ok(Self {
            duration_seconds,
            announcements,
        })
    }

    /// Plan generated by a stage schedule.
    pub fn from_schedule(schedule: &StageSchedule, duration_seconds: u64) -> Self {
        Self {
            duration_seconds,
            announcements: schedule.announcements(duration_seconds),
        }
    }

    /// Plan from a user supplied override list.
    pub fn from_overrides(entries: &[OverrideEntry], duration_seconds: u64) -> Result<Self> {
        Ok(Self {
            duration_seconds,
            announcements: from_overrides(entries, duration_seconds)?,
        })
    }

    pub fn duration_seconds(&self) -> u64 {
        self.duration_seconds
    }

    pub fn announcements(&self) -> &[Announcement] {
        &self.announcements
    }
}

/// An announcement pinned to seconds elapsed since the start of the track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimedAnnouncement {
    pub at_seconds: u64,
    pub phase: Phase,
    pub announcement: Announcement,
}

/// Lay prep then main onto one axis, ascending.
///
/// Where both phases speak at the same second the main phase's announcement
/// is kept and the prep one is reported as superseded.
pub fn merge_phases(
    prep: &PhasePlan,
    main: &PhasePlan,
) -> (Vec<TimedAnnouncement>, Vec<Diagnostic>) {
    fn timed(
        plan: &PhasePlan,
        offset: u64,
        phase: Phase,
    ) -> impl Iterator<Item = TimedAnnouncement> + '_ {
        plan.announcements.iter().map(move |a| TimedAnnouncement {
            at_seconds: offset + (plan.duration_seconds - a.remaining_seconds),
            phase,
            announcement: a.clone(),
        })
    }

    let mut all: Vec<TimedAnnouncement> = timed(prep, 0, Phase::Prep)
        .chain(timed(main, prep.duration_seconds, Phase::Main))
        .collect();
    all.sort_by_key(|t| (t.at_seconds, t.phase));

    let mut merged: Vec<TimedAnnouncement> = Vec::with_capacity(all.len());
    let mut diagnostics = Vec::new();
    for item in all {
        match merged.last_mut() {
            Some(last) if last.at_seconds == item.at_seconds => {
                diagnostics.push(Diagnostic::Superseded {
                    dropped: last.announcement.text.clone(),
                    kept: item.announcement.text.clone(),
                    at_seconds: item.at_seconds,
                });
                *last = item;
            }
            _ => merged.push(item),
        }
    }
    (merged, diagnostics)
}
