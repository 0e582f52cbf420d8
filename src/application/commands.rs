use crate::application::clock::Clock;
use crate::application::sync_coordinator::SyncCoordinator;
use crate::application::task_store::{ScheduleEntryView, TaskLifecycleStore};
use crate::domain::commitments::{fixed_commitments, is_weekend};
use crate::domain::models::{Activity, Task, TaskId, TimeOfDay};
use crate::domain::timeline::{project, TimelineBar};
use crate::infrastructure::activity_mapper::{encode_task, encode_tasks};
use crate::infrastructure::config::ServiceConfig;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::schedule_client::{ReqwestScheduleServiceClient, ScheduleServiceClient};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

pub struct AppState<C = ReqwestScheduleServiceClient>
where
    C: ScheduleServiceClient + 'static,
{
    client: Arc<C>,
    store: Arc<TaskLifecycleStore>,
    coordinator: Arc<SyncCoordinator<C>>,
    clock: Clock,
}

impl AppState<ReqwestScheduleServiceClient> {
    pub fn from_config(config: &ServiceConfig) -> Self {
        let client = Arc::new(ReqwestScheduleServiceClient::new(config.base_url.clone()));
        Self::new(client, Clock::new(config.timezone))
    }
}

impl<C> AppState<C>
where
    C: ScheduleServiceClient + 'static,
{
    pub fn new(client: Arc<C>, clock: Clock) -> Self {
        let store = Arc::new(TaskLifecycleStore::new());
        let coordinator = Arc::new(SyncCoordinator::new(
            Arc::clone(&client),
            Arc::clone(&store),
            clock.clone(),
        ));
        Self {
            client,
            store,
            coordinator,
            clock,
        }
    }

    /// Must be called before [`AppState::start_sync`].
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.coordinator = Arc::new(
            SyncCoordinator::new(
                Arc::clone(&self.client),
                Arc::clone(&self.store),
                self.clock.clone(),
            )
            .with_poll_interval(poll_interval),
        );
        self
    }

    pub fn store(&self) -> &Arc<TaskLifecycleStore> {
        &self.store
    }

    pub fn coordinator(&self) -> &Arc<SyncCoordinator<C>> {
        &self.coordinator
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn start_sync(&self) -> Result<(), InfraError> {
        self.coordinator.start()
    }

    pub async fn shutdown(&self) {
        self.coordinator.stop().await;
    }

    pub fn command_error(&self, command: &str, error: &InfraError) -> String {
        error!(command, kind = error.kind(), error = %error, "command failed");
        error.to_string()
    }

    pub fn log_info(&self, command: &str, message: &str) {
        info!(command, "{message}");
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyPlanResponse {
    pub generation: u64,
    pub date: NaiveDate,
    pub now: TimeOfDay,
    pub is_weekend: bool,
    pub fixed_commitments: Vec<Activity>,
    pub schedule: Vec<ScheduleEntryView>,
    pub unfinished_tasks: Vec<Task>,
    pub waiting_for_confirmation: Vec<Task>,
    pub email_sent: bool,
    pub calendar_updated: bool,
    pub last_update: Option<DateTime<Utc>>,
    pub fetched_at: Option<DateTime<Utc>>,
    pub timeline: Vec<TimelineBar>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    /// Snapshot generation after the follow-up fetch; `None` when that fetch
    /// failed and the previous snapshot is still shown.
    pub generation: Option<u64>,
}

pub fn daily_plan_impl<C>(state: &AppState<C>) -> Result<DailyPlanResponse, InfraError>
where
    C: ScheduleServiceClient + 'static,
{
    let local_now = state.clock.local_now();
    let today = local_now.date();
    let now = TimeOfDay::from_naive_time(local_now.time());
    let view = state.store.plan_view(now)?;
    let snapshot = view.snapshot.as_deref();

    let fixed = fixed_commitments(today);
    let timeline_input = fixed
        .iter()
        .cloned()
        .chain(view.schedule.iter().filter_map(|entry| entry.task.as_activity()))
        .collect::<Vec<_>>();

    Ok(DailyPlanResponse {
        generation: view.generation,
        date: today,
        now,
        is_weekend: is_weekend(today),
        fixed_commitments: fixed,
        email_sent: snapshot.is_some_and(|snapshot| snapshot.email_sent),
        calendar_updated: snapshot.is_some_and(|snapshot| snapshot.calendar_updated),
        last_update: snapshot.and_then(|snapshot| snapshot.last_update),
        fetched_at: snapshot.map(|snapshot| snapshot.fetched_at),
        schedule: view.schedule,
        unfinished_tasks: view.unfinished_tasks,
        waiting_for_confirmation: view.waiting_for_confirmation,
        timeline: project(&timeline_input, now),
    })
}

pub fn add_task_impl<C>(state: &AppState<C>, name: String) -> Result<Task, InfraError>
where
    C: ScheduleServiceClient + 'static,
{
    let task = state.store.add_unfinished_task(&name)?;
    state.log_info("add_task", &format!("drafted task_id={}", task.id));
    Ok(task)
}

pub fn remove_unfinished_task_impl<C>(state: &AppState<C>, task_id: String) -> Result<bool, InfraError>
where
    C: ScheduleServiceClient + 'static,
{
    let task_id = parse_task_id(&task_id)?;
    let removed = state.store.remove_unfinished_task(&task_id)?;
    if removed {
        state.log_info("remove_unfinished_task", &format!("removed task_id={task_id}"));
    }
    Ok(removed)
}

pub async fn complete_task_impl<C>(state: &AppState<C>, task_id: String) -> Result<ActionResponse, InfraError>
where
    C: ScheduleServiceClient + 'static,
{
    let task_id = parse_task_id(&task_id)?;
    let task = state
        .store
        .completion_candidate(&task_id, state.clock.time_of_day())?;

    state.client.complete_task(&encode_task(&task)).await?;
    state.log_info("complete_task", &format!("completed task_id={task_id} name={}", task.name));
    Ok(refetch_after(state, "complete_task").await)
}

pub async fn confirm_task_impl<C>(
    state: &AppState<C>,
    task_id: String,
    is_completed: bool,
) -> Result<ActionResponse, InfraError>
where
    C: ScheduleServiceClient + 'static,
{
    let task_id = parse_task_id(&task_id)?;
    let task = state.store.confirmation_candidate(&task_id)?;

    state
        .client
        .confirm_task(&encode_task(&task), is_completed)
        .await?;
    state.log_info(
        "confirm_task",
        &format!("confirmed task_id={task_id} is_completed={is_completed}"),
    );
    Ok(refetch_after(state, "confirm_task").await)
}

pub async fn update_unfinished_tasks_impl<C>(state: &AppState<C>) -> Result<ActionResponse, InfraError>
where
    C: ScheduleServiceClient + 'static,
{
    let batch = state.store.unfinished_batch()?;
    state.client.update_unfinished(&encode_tasks(&batch)).await?;
    state.log_info(
        "update_unfinished_tasks",
        &format!("submitted {} unfinished tasks", batch.len()),
    );
    Ok(refetch_after(state, "update_unfinished_tasks").await)
}

pub async fn refresh_schedule_impl<C>(state: &AppState<C>) -> Result<u64, InfraError>
where
    C: ScheduleServiceClient + 'static,
{
    state.coordinator.refresh().await
}

async fn refetch_after<C>(state: &AppState<C>, command: &str) -> ActionResponse
where
    C: ScheduleServiceClient + 'static,
{
    match state.coordinator.refresh().await {
        Ok(generation) => ActionResponse {
            generation: Some(generation),
        },
        Err(error) => {
            warn!(command, kind = error.kind(), error = %error, "refetch after action failed; keeping previous snapshot");
            ActionResponse { generation: None }
        }
    }
}

fn parse_task_id(raw: &str) -> Result<TaskId, InfraError> {
    let task_id = TaskId::from(raw);
    if task_id.as_str().is_empty() {
        return Err(InfraError::InvalidAction("task_id must not be empty".to_string()));
    }
    Ok(task_id)
}
