//! Track buffer layout and WAV I/O.

pub mod timeline;
pub mod wav;

pub use timeline::{AudioTimeline, PlacedAnnouncement};
pub use wav::{read_track, write_track};
