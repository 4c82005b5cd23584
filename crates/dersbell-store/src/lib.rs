//! # DersBell Store
//!
//! File-backed persistence: the recipient directory and the weekly
//! timetable, both plain pretty-printed JSON — human-readable and
//! hand-editable (timetables are seeded by hand at semester start).

pub mod recipients;
pub mod schedule;

pub use recipients::RecipientStore;
pub use schedule::ScheduleStore;
