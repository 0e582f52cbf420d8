use crate::domain::models::{
    is_suppressed, Activity, ScheduleSnapshot, Task, TaskState, TimeOfDay, TimeWindow,
    DEFAULT_TASK_DURATION_HOURS,
};
use crate::infrastructure::error::InfraError;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct ActivityPayload {
    pub activity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(rename = "isFixed", default, skip_serializing_if = "Option::is_none")]
    pub is_fixed: Option<bool>,
}

#[derive(Debug, Clone, serde::Deserialize, Default)]
pub struct ScheduleResponsePayload {
    pub schedule: Option<Vec<ActivityPayload>>,
    #[serde(rename = "unfinishedTasks")]
    pub unfinished_tasks: Option<Vec<ActivityPayload>>,
    #[serde(rename = "waitingForConfirmation")]
    pub waiting_for_confirmation: Option<Vec<ActivityPayload>>,
    #[serde(rename = "emailSent", default)]
    pub email_sent: bool,
    #[serde(rename = "calendarUpdated", default)]
    pub calendar_updated: bool,
    #[serde(rename = "lastUpdate")]
    pub last_update: Option<String>,
}

impl ScheduleResponsePayload {
    /// Drops "Other Work" entries before decoding so a malformed hidden entry
    /// cannot fail the fetch.
    pub fn without_suppressed(mut self) -> Self {
        for list in [
            &mut self.schedule,
            &mut self.unfinished_tasks,
            &mut self.waiting_for_confirmation,
        ] {
            if let Some(items) = list.as_mut() {
                items.retain(|item| !is_suppressed(item.activity.trim()));
            }
        }
        self
    }
}

pub fn encode_task(task: &Task) -> ActivityPayload {
    ActivityPayload {
        activity: task.name.clone(),
        start: task.window.map(|window| window.start.to_string()),
        end: task.window.map(|window| window.end.to_string()),
        duration: Some(task.duration_hours),
        is_fixed: None,
    }
}

pub fn encode_tasks(tasks: &[Task]) -> Vec<ActivityPayload> {
    tasks.iter().map(encode_task).collect()
}

pub fn decode_snapshot(
    payload: ScheduleResponsePayload,
    fetched_at: DateTime<Utc>,
) -> Result<ScheduleSnapshot, InfraError> {
    let schedule = payload
        .schedule
        .unwrap_or_default()
        .iter()
        .map(decode_schedule_entry)
        .collect::<Result<Vec<_>, _>>()?;
    let unfinished_tasks = payload
        .unfinished_tasks
        .unwrap_or_default()
        .iter()
        .map(|item| decode_task(item, TaskState::Unfinished))
        .collect::<Result<Vec<_>, _>>()?;
    let waiting_for_confirmation = payload
        .waiting_for_confirmation
        .unwrap_or_default()
        .iter()
        .map(|item| decode_task(item, TaskState::WaitingConfirmation))
        .collect::<Result<Vec<_>, _>>()?;

    let last_update = payload
        .last_update
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| {
            DateTime::parse_from_rfc3339(value)
                .map(|parsed| parsed.with_timezone(&Utc))
                .map_err(|error| InfraError::Parse(format!("invalid lastUpdate '{value}': {error}")))
        })
        .transpose()?;

    Ok(ScheduleSnapshot {
        schedule,
        unfinished_tasks,
        waiting_for_confirmation,
        email_sent: payload.email_sent,
        calendar_updated: payload.calendar_updated,
        last_update,
        fetched_at,
    })
}

pub fn decode_activity(payload: &ActivityPayload) -> Result<Activity, InfraError> {
    let window = decode_window(payload)?
        .ok_or_else(|| InfraError::Parse(format!("activity '{}' is missing start/end", payload.activity)))?;
    let activity = Activity {
        name: decode_name(payload)?,
        start: window.start,
        end: window.end,
        duration_hours: decode_duration(payload, Some(window))?,
        is_fixed: payload.is_fixed.unwrap_or(false),
    };
    if !activity.duration_matches_window() {
        tracing::warn!(
            activity = %activity.name,
            duration_hours = activity.duration_hours,
            window_hours = activity.window().hours(),
            "activity duration disagrees with its window"
        );
    }
    Ok(activity)
}

fn decode_schedule_entry(payload: &ActivityPayload) -> Result<Task, InfraError> {
    let activity = decode_activity(payload)?;
    Ok(Task::scheduled(
        &activity.name,
        activity.window(),
        activity.duration_hours,
    ))
}

fn decode_task(payload: &ActivityPayload, state: TaskState) -> Result<Task, InfraError> {
    let window = decode_window(payload)?;
    let duration_hours = decode_duration(payload, window)?;
    Ok(Task::with_state(
        &decode_name(payload)?,
        window,
        duration_hours,
        state,
    ))
}

fn decode_name(payload: &ActivityPayload) -> Result<String, InfraError> {
    let name = payload.activity.trim();
    if name.is_empty() {
        return Err(InfraError::Parse("activity name must not be empty".to_string()));
    }
    Ok(name.to_string())
}

fn decode_window(payload: &ActivityPayload) -> Result<Option<TimeWindow>, InfraError> {
    match (payload.start.as_deref(), payload.end.as_deref()) {
        (None, None) => Ok(None),
        (Some(start), Some(end)) => {
            let window = TimeWindow::new(TimeOfDay::parse(start)?, TimeOfDay::parse(end)?)
                .map_err(|error| InfraError::Parse(format!("activity '{}': {error}", payload.activity)))?;
            Ok(Some(window))
        }
        _ => Err(InfraError::Parse(format!(
            "activity '{}' must carry both start and end",
            payload.activity
        ))),
    }
}

fn decode_duration(payload: &ActivityPayload, window: Option<TimeWindow>) -> Result<f64, InfraError> {
    let duration = payload
        .duration
        .or_else(|| window.map(|window| window.hours()))
        .unwrap_or(DEFAULT_TASK_DURATION_HOURS);
    if !duration.is_finite() || duration <= 0.0 {
        return Err(InfraError::Parse(format!(
            "activity '{}' has invalid duration {duration}",
            payload.activity
        )));
    }
    Ok(duration)
}
