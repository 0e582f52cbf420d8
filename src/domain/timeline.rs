use crate::domain::classifier::{classify, WindowStatus};
use crate::domain::commitments::{COLLEGE, DHOBI_G, SLEEP};
use crate::domain::models::{Activity, TimeOfDay, MINUTES_PER_DAY};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TimelineColor {
    Sleep,
    College,
    DhobiG,
    Fixed,
    Upcoming,
    Ongoing,
    Ended,
    /// Dynamic item sitting exactly on its end minute.
    Unclassified,
}

impl TimelineColor {
    pub fn for_fixed(name: &str) -> Self {
        match name {
            SLEEP => Self::Sleep,
            COLLEGE => Self::College,
            DHOBI_G => Self::DhobiG,
            _ => Self::Fixed,
        }
    }

    pub fn for_status(status: Option<WindowStatus>) -> Self {
        match status {
            Some(WindowStatus::Upcoming) => Self::Upcoming,
            Some(WindowStatus::Ongoing) => Self::Ongoing,
            Some(WindowStatus::Ended) => Self::Ended,
            None => Self::Unclassified,
        }
    }

    pub fn hex(self) -> &'static str {
        match self {
            Self::Sleep => "#93c5fd",
            Self::College => "#fde047",
            Self::DhobiG => "#d8b4fe",
            Self::Fixed => "#e5e7eb",
            Self::Upcoming => "#86efac",
            Self::Ongoing => "#fdba74",
            Self::Ended => "#9ca3af",
            Self::Unclassified => "#cbd5e1",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimelineBar {
    pub name: String,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    pub start_percent: f64,
    pub duration_percent: f64,
    pub is_fixed: bool,
    pub color: TimelineColor,
    pub hex: &'static str,
}

pub fn start_percent(start: TimeOfDay) -> f64 {
    f64::from(start.hour() * 60 + start.minute()) / f64::from(MINUTES_PER_DAY) * 100.0
}

pub fn duration_percent(duration_hours: f64) -> f64 {
    duration_hours * 60.0 / f64::from(MINUTES_PER_DAY) * 100.0
}

/// Projects activities onto a 24-hour bar in input order. Overlapping items
/// are not laid out in lanes; later bars paint over earlier ones.
pub fn project(activities: &[Activity], now: TimeOfDay) -> Vec<TimelineBar> {
    activities
        .iter()
        .map(|activity| {
            let color = if activity.is_fixed {
                TimelineColor::for_fixed(&activity.name)
            } else {
                TimelineColor::for_status(classify(activity.start, activity.end, now))
            };
            TimelineBar {
                name: activity.name.clone(),
                start: activity.start,
                end: activity.end,
                start_percent: start_percent(activity.start),
                duration_percent: duration_percent(activity.duration_hours),
                is_fixed: activity.is_fixed,
                color,
                hex: color.hex(),
            }
        })
        .collect()
}
