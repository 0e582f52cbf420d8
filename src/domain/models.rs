use crate::domain::classifier::{classify, WindowStatus};
use chrono::{DateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

pub const MINUTES_PER_DAY: u32 = 24 * 60;
pub const DEFAULT_TASK_DURATION_HOURS: f64 = 1.0;

/// Activities with this name are hidden from every view the client derives.
pub const SUPPRESSED_ACTIVITY_NAME: &str = "Other Work";

static NEXT_TASK_SEQUENCE: AtomicU64 = AtomicU64::new(1);

pub fn is_suppressed(name: &str) -> bool {
    name == SUPPRESSED_ACTIVITY_NAME
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid time of day '{value}': expected HH:MM")]
pub struct TimeParseError {
    pub value: String,
}

impl TimeParseError {
    fn new(value: &str) -> Self {
        Self {
            value: value.to_string(),
        }
    }
}

/// Minutes since local midnight, always in `[0, 1440)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay(0);

    // Only for literals known to be in range.
    pub(crate) const fn hm(hour: u16, minute: u16) -> Self {
        Self(hour * 60 + minute)
    }

    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        if hour > 23 || minute > 59 {
            return None;
        }
        u16::try_from(hour * 60 + minute).ok().map(Self)
    }

    pub fn from_naive_time(time: NaiveTime) -> Self {
        // hour() <= 23 and minute() <= 59 by construction
        Self::hm(time.hour() as u16, time.minute() as u16)
    }

    pub fn parse(value: &str) -> Result<Self, TimeParseError> {
        let mut split = value.split(':');
        let (Some(hour_str), Some(minute_str), None) = (split.next(), split.next(), split.next())
        else {
            return Err(TimeParseError::new(value));
        };
        let hour = parse_clock_field(hour_str).ok_or_else(|| TimeParseError::new(value))?;
        let minute = parse_clock_field(minute_str).ok_or_else(|| TimeParseError::new(value))?;
        Self::from_hm(hour, minute).ok_or_else(|| TimeParseError::new(value))
    }

    pub fn minutes(self) -> u32 {
        u32::from(self.0)
    }

    pub fn hour(self) -> u32 {
        self.minutes() / 60
    }

    pub fn minute(self) -> u32 {
        self.minutes() % 60
    }
}

fn parse_clock_field(value: &str) -> Option<u32> {
    if value.is_empty() || value.len() > 2 || !value.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    value.parse::<u32>().ok()
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for TimeOfDay {
    type Err = TimeParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = TimeParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl TimeWindow {
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Result<Self, String> {
        let window = Self { start, end };
        window.validate()?;
        Ok(window)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.end <= self.start {
            return Err(format!(
                "window end {} must be after start {}",
                self.end, self.start
            ));
        }
        Ok(())
    }

    pub fn hours(&self) -> f64 {
        f64::from(self.end.minutes() - self.start.minutes()) / 60.0
    }

    pub fn status_at(&self, now: TimeOfDay) -> Option<WindowStatus> {
        classify(self.start, self.end, now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub name: String,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    pub duration_hours: f64,
    pub is_fixed: bool,
}

impl Activity {
    pub fn fixed(name: &str, start: TimeOfDay, end: TimeOfDay, duration_hours: f64) -> Self {
        Self {
            name: name.to_string(),
            start,
            end,
            duration_hours,
            is_fixed: true,
        }
    }

    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start: self.start,
            end: self.end,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.name, "activity.name")?;
        self.window().validate()?;
        if !self.duration_hours.is_finite() || self.duration_hours <= 0.0 {
            return Err("activity.duration_hours must be > 0".to_string());
        }
        Ok(())
    }

    /// True when `duration_hours` agrees with the window length to the minute.
    pub fn duration_matches_window(&self) -> bool {
        (self.duration_hours - self.window().hours()).abs() < 1.0 / 60.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn generate() -> Self {
        let sequence = NEXT_TASK_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Self(format!("tsk-{}-{sequence}", Utc::now().timestamp_micros()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.trim().to_string())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Scheduled,
    Ongoing,
    Ended,
    WaitingConfirmation,
    Unfinished,
    Completed,
}

impl TaskState {
    fn from_window_status(status: WindowStatus) -> Self {
        match status {
            WindowStatus::Upcoming => Self::Scheduled,
            WindowStatus::Ongoing => Self::Ongoing,
            WindowStatus::Ended => Self::Ended,
        }
    }

    fn is_clock_driven(self) -> bool {
        matches!(self, Self::Scheduled | Self::Ongoing | Self::Ended)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub window: Option<TimeWindow>,
    pub duration_hours: f64,
    pub state: TaskState,
}

impl Task {
    pub fn scheduled(name: &str, window: TimeWindow, duration_hours: f64) -> Self {
        Self::with_state(name, Some(window), duration_hours, TaskState::Scheduled)
    }

    pub fn with_state(
        name: &str,
        window: Option<TimeWindow>,
        duration_hours: f64,
        state: TaskState,
    ) -> Self {
        Self {
            id: TaskId::generate(),
            name: name.to_string(),
            window,
            duration_hours,
            state,
        }
    }

    /// A locally typed task awaiting the next batch update.
    pub fn draft(name: &str) -> Result<Self, String> {
        let name = name.trim();
        validate_non_empty(name, "task.name")?;
        Ok(Self::with_state(
            name,
            None,
            DEFAULT_TASK_DURATION_HOURS,
            TaskState::Unfinished,
        ))
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.name, "task.name")?;
        if let Some(window) = &self.window {
            window.validate()?;
        }
        if self.state.is_clock_driven() && self.window.is_none() {
            return Err("scheduled task must have a time window".to_string());
        }
        if self.state == TaskState::Completed {
            return Err("completed tasks are not retained".to_string());
        }
        Ok(())
    }

    /// Lifecycle state at `now`. Schedule entries follow the clock; `None`
    /// means `now` sits exactly on the window end, where no predicate holds.
    pub fn state_at(&self, now: TimeOfDay) -> Option<TaskState> {
        if !self.state.is_clock_driven() {
            return Some(self.state);
        }
        match self.window {
            Some(window) => window.status_at(now).map(TaskState::from_window_status),
            None => Some(self.state),
        }
    }

    pub fn as_activity(&self) -> Option<Activity> {
        self.window.map(|window| Activity {
            name: self.name.clone(),
            start: window.start,
            end: window.end,
            duration_hours: self.duration_hours,
            is_fixed: false,
        })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSnapshot {
    pub schedule: Vec<Task>,
    pub unfinished_tasks: Vec<Task>,
    pub waiting_for_confirmation: Vec<Task>,
    pub email_sent: bool,
    pub calendar_updated: bool,
    pub last_update: Option<DateTime<Utc>>,
    pub fetched_at: DateTime<Utc>,
}

impl ScheduleSnapshot {
    pub fn empty(fetched_at: DateTime<Utc>) -> Self {
        Self {
            schedule: Vec::new(),
            unfinished_tasks: Vec::new(),
            waiting_for_confirmation: Vec::new(),
            email_sent: false,
            calendar_updated: false,
            last_update: None,
            fetched_at,
        }
    }

    pub fn without_suppressed(mut self) -> Self {
        self.schedule.retain(|task| !is_suppressed(&task.name));
        self.unfinished_tasks.retain(|task| !is_suppressed(&task.name));
        self.waiting_for_confirmation
            .retain(|task| !is_suppressed(&task.name));
        self
    }

    pub fn find_task(&self, task_id: &TaskId) -> Option<&Task> {
        self.schedule
            .iter()
            .chain(&self.unfinished_tasks)
            .chain(&self.waiting_for_confirmation)
            .find(|task| &task.id == task_id)
    }
}

fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}
