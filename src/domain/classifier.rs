//! Classification of a time-of-day window against the current wall clock.
//!
//! The three predicates are deliberately not an exhaustive partition: at
//! `now == end` a window is neither ongoing, upcoming nor ended.

use crate::domain::models::{TimeOfDay, TimeParseError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WindowStatus {
    Upcoming,
    Ongoing,
    Ended,
}

/// Parses `"HH:MM"` into minutes since midnight.
pub fn to_minutes(value: &str) -> Result<u32, TimeParseError> {
    TimeOfDay::parse(value).map(TimeOfDay::minutes)
}

pub fn is_ongoing(start: TimeOfDay, end: TimeOfDay, now: TimeOfDay) -> bool {
    start <= now && now < end
}

pub fn is_upcoming(start: TimeOfDay, now: TimeOfDay) -> bool {
    now < start
}

pub fn is_ended(end: TimeOfDay, now: TimeOfDay) -> bool {
    now > end
}

/// Returns `None` exactly on the window end.
pub fn classify(start: TimeOfDay, end: TimeOfDay, now: TimeOfDay) -> Option<WindowStatus> {
    if is_ongoing(start, end, now) {
        Some(WindowStatus::Ongoing)
    } else if is_upcoming(start, now) {
        Some(WindowStatus::Upcoming)
    } else if is_ended(end, now) {
        Some(WindowStatus::Ended)
    } else {
        None
    }
}
