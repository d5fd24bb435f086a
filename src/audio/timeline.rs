//! Sample-accurate layout of announcements on the output buffer.
//!
//! Each announcement owns the slot from its own start sample up to the next
//! announcement's start (or the end of the buffer). Slots are disjoint by
//! construction; [`split_slots`] re-checks that before handing out one
//! mutable region per slot.

use crate::error::{Result, VoxtimerError};
use serde::Serialize;
use std::ops::Range;
use std::time::Duration;

/// A clip written into the track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacedAnnouncement {
    pub start_sample: usize,
    pub length_samples: usize,
    /// Elapsed seconds from the start of the track.
    pub at_seconds: u64,
    pub text: String,
}

impl PlacedAnnouncement {
    pub fn range(&self) -> Range<usize> {
        self.start_sample..self.start_sample + self.length_samples
    }
}

/// The rendered track: a silence-filled buffer plus what was placed in it.
#[derive(Debug, Clone)]
pub struct AudioTimeline {
    total_duration_seconds: u64,
    sample_rate: u32,
    samples: Vec<i16>,
    placed: Vec<PlacedAnnouncement>,
}

impl AudioTimeline {
    /// Zero-filled timeline of `total_duration_seconds`.
    pub fn silent(total_duration_seconds: u64, sample_rate: u32) -> Result<Self> {
        let total = sample_offset(total_duration_seconds, sample_rate)?;
        Ok(Self {
            total_duration_seconds,
            sample_rate,
            samples: vec![0; total],
            placed: Vec::new(),
        })
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.total_duration_seconds)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn total_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub(crate) fn samples_mut(&mut self) -> &mut [i16] {
        &mut self.samples
    }

    pub fn placed(&self) -> &[PlacedAnnouncement] {
        &self.placed
    }

    /// Samples of one placed announcement, viewed in the buffer.
    pub fn clip(&self, placed: &PlacedAnnouncement) -> &[i16] {
        &self.samples[placed.range()]
    }

    /// Record placements. They must be ordered, disjoint and in bounds.
    pub(crate) fn set_placed(&mut self, placed: Vec<PlacedAnnouncement>) -> Result<()> {
        let ranges: Vec<Range<usize>> = placed.iter().map(|p| p.range()).collect();
        check_slots(&ranges, self.samples.len())?;
        self.placed = placed;
        Ok(())
    }
}

/// Sample index of `seconds` at `sample_rate`.
pub fn sample_offset(seconds: u64, sample_rate: u32) -> Result<usize> {
    seconds
        .checked_mul(u64::from(sample_rate))
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| {
            VoxtimerError::invalid_value(
                "duration",
                format!("{}s at {}Hz does not fit in memory", seconds, sample_rate),
            )
        })
}

/// Slots for ascending start samples: each runs to the next start, the last
/// to `total`.
pub fn slots(starts: &[usize], total: usize) -> Vec<Range<usize>> {
    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(total).min(total);
            start.min(end)..end
        })
        .collect()
}

fn check_slots(slots: &[Range<usize>], total: usize) -> Result<()> {
    let mut cursor = 0;
    for slot in slots {
        if slot.start < cursor || slot.end < slot.start || slot.end > total {
            return Err(VoxtimerError::Internal(format!(
                "slot {:?} overlaps its neighbour or leaves the {} sample buffer",
                slot, total
            )));
        }
        cursor = slot.end;
    }
    Ok(())
}

/// Split `buffer` into one mutable region per slot.
///
/// Fails if the slots are out of order, overlap, or run past the buffer.
pub fn split_slots<'a>(buffer: &'a mut [i16], slots: &[Range<usize>]) -> Result<Vec<&'a mut [i16]>> {
    check_slots(slots, buffer.len())?;

    let mut regions = Vec::with_capacity(slots.len());
    let mut rest = buffer;
    let mut offset = 0;
    for slot in slots {
        let tail = std::mem::take(&mut rest);
        let (_, tail) = tail.split_at_mut(slot.start - offset);
        let (region, tail) = tail.split_at_mut(slot.len());
        regions.push(region);
        rest = tail;
        offset = slot.end;
    }
    Ok(regions)
}
