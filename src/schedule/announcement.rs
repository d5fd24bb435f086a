//! Announcements and their spoken text.

use crate::defaults::FINISHED_TEXT;
use crate::error::{Result, VoxtimerError};
use crate::schedule::stage::Verbosity;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Something to say at a given number of remaining seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    pub remaining_seconds: u64,
    pub text: String,
    pub verbosity: Verbosity,
}

impl Announcement {
    /// Announcement with rendered text.
    pub fn new(remaining_seconds: u64, verbosity: Verbosity) -> Self {
        Self {
            remaining_seconds,
            text: render_text(remaining_seconds, verbosity),
            verbosity,
        }
    }

    /// Announcement with caller supplied text.
    pub fn with_text(remaining_seconds: u64, text: &str, verbosity: Verbosity) -> Self {
        Self {
            remaining_seconds,
            text: text.to_string(),
            verbosity,
        }
    }

    /// True for bare numbers, which are spoken at the countdown rate and
    /// must fit a one second slot.
    pub fn is_countdown_token(&self) -> bool {
        is_numeric_token(&self.text)
    }
}

fn is_numeric_token(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

/// Render the spoken text for `remaining` seconds.
pub fn render_text(remaining: u64, verbosity: Verbosity) -> String {
    if remaining == 0 {
        return FINISHED_TEXT.to_string();
    }
    match verbosity {
        Verbosity::Low => remaining.to_string(),
        Verbosity::High if remaining % 60 == 0 => {
            let minutes = remaining / 60;
            let unit = if minutes == 1 { "minute" } else { "minutes" };
            format!("{} {} remaining", minutes, unit)
        }
        Verbosity::High => {
            let unit = if remaining == 1 { "second" } else { "seconds" };
            format!("{} {} remaining", remaining, unit)
        }
    }
}

/// One externally supplied announcement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideEntry {
    pub remaining_seconds: u64,
    pub text: String,
}

/// Replace a phase's generated schedule with an explicit list.
///
/// Entries may come in any order and are returned earliest first. Numeric
/// texts are treated as low-verbosity countdown tokens.
pub fn from_overrides(entries: &[OverrideEntry], duration: u64) -> Result<Vec<Announcement>> {
    let mut seen = HashSet::new();
    let mut announcements = Vec::with_capacity(entries.len());

    for entry in entries {
        let text = entry.text.trim();
        if text.is_empty() {
            return Err(VoxtimerError::invalid_value(
                "overrides",
                format!("empty text at {}s", entry.remaining_seconds),
            ));
        }
        if entry.remaining_seconds > duration {
            return Err(VoxtimerError::invalid_value(
                "overrides",
                format!(
                    "{}s is outside the {}s phase",
                    entry.remaining_seconds, duration
                ),
            ));
        }
        if !seen.insert(entry.remaining_seconds) {
            return Err(VoxtimerError::invalid_value(
                "overrides",
                format!("{}s is listed more than once", entry.remaining_seconds),
            ));
        }
        let verbosity = if is_numeric_token(text) {
            Verbosity::Low
        } else {
            Verbosity::High
        };
        announcements.push(Announcement::with_text(
            entry.remaining_seconds,
            text,
            verbosity,
        ));
    }

    announcements.sort_by(|a, b| b.remaining_seconds.cmp(&a.remaining_seconds));
    Ok(announcements)
}
