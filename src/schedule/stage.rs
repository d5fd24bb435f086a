//! Stage definitions and the stage-based firing rule.

use crate::error::{Result, VoxtimerError};
use crate::schedule::announcement::Announcement;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// How much is said per announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// Bare number ("7").
    Low,
    /// Full phrase ("2 minutes remaining").
    High,
}

/// One announcement regime of a countdown phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub name: String,
    /// Upper bound (inclusive) of the remaining seconds this stage covers.
    /// Zero marks the catch-all stage.
    pub duration_threshold: u64,
    /// Seconds between announcements.
    pub announcement_interval: u64,
    pub verbosity: Verbosity,
}

impl Stage {
    pub fn new(
        name: &str,
        duration_threshold: u64,
        announcement_interval: u64,
        verbosity: Verbosity,
    ) -> Self {
        Self {
            name: name.to_string(),
            duration_threshold,
            announcement_interval,
            verbosity,
        }
    }

    pub fn is_catch_all(&self) -> bool {
        self.duration_threshold == 0
    }

    fn invalid(&self, message: impl Into<String>) -> VoxtimerError {
        VoxtimerError::InvalidStage {
            stage: self.name.clone(),
            message: message.into(),
        }
    }
}

/// Validated stages ordered by threshold, most relaxed first, catch-all last.
///
/// Stage `i` owns the remaining times `(threshold[i+1], threshold[i]]`.
/// The catch-all owns everything above the largest threshold, plus zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Stage>", into = "Vec<Stage>")]
pub struct StageSchedule {
    stages: Vec<Stage>,
}

impl StageSchedule {
    /// Validate and normalize a list of stages.
    ///
    /// Stages may be given in any order; they are sorted by threshold
    /// descending. Requires exactly one catch-all, unique names and
    /// thresholds, and a positive interval with at least one tick inside
    /// each bounded stage's own range.
    pub fn new(mut stages: Vec<Stage>) -> Result<Self> {
        if stages.is_empty() {
            return Err(VoxtimerError::invalid_value(
                "stages",
                "at least one stage is required",
            ));
        }

        let mut names = HashSet::new();
        for stage in &stages {
            if stage.name.trim().is_empty() {
                return Err(stage.invalid("name must not be empty"));
            }
            if stage.announcement_interval == 0 {
                return Err(stage.invalid("announcement_interval must be greater than 0"));
            }
            if !names.insert(stage.name.as_str()) {
                return Err(stage.invalid("duplicate stage name"));
            }
        }

        stages.sort_by(|a, b| b.duration_threshold.cmp(&a.duration_threshold));

        let catch_alls = stages.iter().filter(|s| s.is_catch_all()).count();
        if catch_alls == 0 {
            return Err(VoxtimerError::invalid_value(
                "stages",
                "a catch-all stage with duration_threshold = 0 is required",
            ));
        }

        for pair in stages.windows(2) {
            let (upper, lower) = (&pair[0], &pair[1]);
            if upper.duration_threshold == lower.duration_threshold {
                return Err(lower.invalid(format!(
                    "duration_threshold {} is already used by '{}'",
                    lower.duration_threshold, upper.name
                )));
            }
            // `upper` owns (lower.threshold, upper.threshold]; it must be able to fire.
            let last_tick = upper.duration_threshold / upper.announcement_interval
                * upper.announcement_interval;
            if last_tick <= lower.duration_threshold {
                return Err(upper.invalid(format!(
                    "no multiple of {}s lies within ({}s, {}s]",
                    upper.announcement_interval,
                    lower.duration_threshold,
                    upper.duration_threshold
                )));
            }
        }

        Ok(Self { stages })
    }

    /// Three-stage schedule: every minute, every 10s in the last minute,
    /// every second in the last 10s. Listed in validated order.
    pub fn default_stages() -> Vec<Stage> {
        vec![
            Stage::new("one_minute", 60, 10, Verbosity::High),
            Stage::new("countdown", 10, 1, Verbosity::Low),
            Stage::new("everything", 0, 60, Verbosity::High),
        ]
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    fn catch_all(&self) -> &Stage {
        // Non-empty and sorted descending by construction, so the catch-all is last.
        &self.stages[self.stages.len() - 1]
    }

    /// Stage in charge at `remaining` seconds: the smallest threshold still
    /// `>= remaining`, falling back to the catch-all.
    pub fn active_stage(&self, remaining: u64) -> &Stage {
        self.stages
            .iter()
            .rev()
            .find(|s| s.duration_threshold >= remaining)
            .unwrap_or_else(|| self.catch_all())
    }

    /// Whether an announcement fires at `remaining` in a phase of `duration`.
    ///
    /// Zero always fires (the end-of-phase event) and so does the opening
    /// second. Otherwise only the active stage's ticks fire, so a boundary
    /// second on two stages' grids is claimed by the more urgent stage.
    pub fn fires_at(&self, remaining: u64, duration: u64) -> bool {
        if remaining > duration {
            return false;
        }
        remaining == 0
            || remaining == duration
            || remaining % self.active_stage(remaining).announcement_interval == 0
    }

    /// All announcements for a phase of `duration` seconds, earliest first.
    pub fn announcements(&self, duration: u64) -> Vec<Announcement> {
        (0..=duration)
            .rev()
            .filter(|&t| self.fires_at(t, duration))
            .map(|t| Announcement::new(t, self.active_stage(t).verbosity))
            .collect()
    }
}

impl Default for StageSchedule {
    fn default() -> Self {
        Self {
            stages: Self::default_stages(),
        }
    }
}

impl TryFrom<Vec<Stage>> for StageSchedule {
    type Error = VoxtimerError;

    fn try_from(stages: Vec<Stage>) -> Result<Self> {
        Self::new(stages)
    }
}

impl From<StageSchedule> for Vec<Stage> {
    fn from(schedule: StageSchedule) -> Self {
        schedule.stages
    }
}
