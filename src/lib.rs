pub mod application;
pub mod domain;
pub mod infrastructure;

use application::commands::{
    add_task_impl, complete_task_impl, confirm_task_impl, daily_plan_impl, refresh_schedule_impl,
    remove_unfinished_task_impl, update_unfinished_tasks_impl, ActionResponse, AppState,
    DailyPlanResponse,
};
use domain::models::Task;
use infrastructure::config::load_service_config_from_env;
use infrastructure::error::InfraError;
use infrastructure::schedule_client::ScheduleServiceClient;
use std::io::Write;
use tokio::sync::watch;
use tracing::{info, warn};

pub fn daily_plan<C>(state: &AppState<C>) -> Result<DailyPlanResponse, String>
where
    C: ScheduleServiceClient + 'static,
{
    daily_plan_impl(state).map_err(|error| state.command_error("daily_plan", &error))
}

pub fn add_task<C>(state: &AppState<C>, name: String) -> Result<Task, String>
where
    C: ScheduleServiceClient + 'static,
{
    add_task_impl(state, name).map_err(|error| state.command_error("add_task", &error))
}

pub fn remove_unfinished_task<C>(state: &AppState<C>, task_id: String) -> Result<bool, String>
where
    C: ScheduleServiceClient + 'static,
{
    remove_unfinished_task_impl(state, task_id)
        .map_err(|error| state.command_error("remove_unfinished_task", &error))
}

pub async fn complete_task<C>(state: &AppState<C>, task_id: String) -> Result<ActionResponse, String>
where
    C: ScheduleServiceClient + 'static,
{
    complete_task_impl(state, task_id)
        .await
        .map_err(|error| state.command_error("complete_task", &error))
}

pub async fn confirm_task<C>(
    state: &AppState<C>,
    task_id: String,
    is_completed: bool,
) -> Result<ActionResponse, String>
where
    C: ScheduleServiceClient + 'static,
{
    confirm_task_impl(state, task_id, is_completed)
        .await
        .map_err(|error| state.command_error("confirm_task", &error))
}

pub async fn update_unfinished_tasks<C>(state: &AppState<C>) -> Result<ActionResponse, String>
where
    C: ScheduleServiceClient + 'static,
{
    update_unfinished_tasks_impl(state)
        .await
        .map_err(|error| state.command_error("update_unfinished_tasks", &error))
}

pub async fn refresh_schedule<C>(state: &AppState<C>) -> Result<u64, String>
where
    C: ScheduleServiceClient + 'static,
{
    refresh_schedule_impl(state)
        .await
        .map_err(|error| state.command_error("refresh_schedule", &error))
}

/// Runs the sync loop until ctrl-c, writing the daily plan as one JSON line
/// to stdout every time the snapshot generation changes.
pub async fn run() -> Result<(), InfraError> {
    let config = load_service_config_from_env()?;
    info!(base_url = %config.base_url, timezone = ?config.timezone, "starting smart schedule");

    let state = AppState::from_config(&config);
    let generations = state.store().subscribe();
    state.start_sync()?;

    let shutdown = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!(error = %error, "ctrl-c handler unavailable; shutting down");
        }
        info!("shutdown requested");
    };
    let served = serve_plans(&state, generations, shutdown, &mut std::io::stdout()).await;

    state.shutdown().await;
    served
}

/// Writes one plan per generation change until `shutdown` resolves. The
/// shutdown future is polled first and lives across iterations, so a signal
/// raised while a plan is being written is seen on the next pass.
async fn serve_plans<C, F, W>(
    state: &AppState<C>,
    mut generations: watch::Receiver<u64>,
    shutdown: F,
    out: &mut W,
) -> Result<(), InfraError>
where
    C: ScheduleServiceClient + 'static,
    F: Future<Output = ()>,
    W: Write,
{
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            changed = generations.changed() => {
                if changed.is_err() {
                    break;
                }
                let generation = *generations.borrow_and_update();
                match daily_plan(state) {
                    Ok(plan) => write_plan(&plan, out)?,
                    Err(message) => warn!(generation, "daily plan unavailable: {message}"),
                }
            }
        }
    }
    Ok(())
}

fn write_plan<W: Write>(plan: &DailyPlanResponse, out: &mut W) -> Result<(), InfraError> {
    let line = serde_json::to_string(plan)?;
    writeln!(out, "{line}")?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::clock::Clock;
    use crate::domain::models::ScheduleSnapshot;
    use crate::infrastructure::schedule_client::ReqwestScheduleServiceClient;
    use std::sync::Arc;
    use tokio::sync::oneshot;

    fn idle_state() -> AppState {
        let base_url = url::Url::parse("http://localhost:3000").expect("valid url");
        AppState::new(
            Arc::new(ReqwestScheduleServiceClient::new(base_url)),
            Clock::new(Some(chrono_tz::UTC)),
        )
    }

    fn written_lines(out: &[u8]) -> Vec<serde_json::Value> {
        String::from_utf8(out.to_vec())
            .expect("utf8 output")
            .lines()
            .map(|line| serde_json::from_str(line).expect("json line"))
            .collect()
    }

    #[tokio::test]
    async fn plan_is_written_per_generation_until_shutdown() {
        let state = idle_state();
        let generations = state.store().subscribe();
        let (stop, stopped) = oneshot::channel::<()>();
        let mut out = Vec::new();

        let driver = async {
            state
                .store()
                .replace_snapshot(ScheduleSnapshot::empty(chrono::Utc::now()))
                .expect("replace");
            for _ in 0..4 {
                tokio::task::yield_now().await;
            }
            stop.send(()).expect("server still listening");
        };
        let shutdown = async {
            let _ = stopped.await;
        };
        let (served, ()) = tokio::join!(serve_plans(&state, generations, shutdown, &mut out), driver);

        served.expect("serve plans");
        let lines = written_lines(&out);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["generation"], serde_json::json!(1));
    }

    #[tokio::test]
    async fn pending_shutdown_wins_over_pending_plan() {
        let state = idle_state();
        let generations = state.store().subscribe();
        state
            .store()
            .replace_snapshot(ScheduleSnapshot::empty(chrono::Utc::now()))
            .expect("replace");
        let mut out = Vec::new();

        serve_plans(&state, generations, std::future::ready(()), &mut out)
            .await
            .expect("serve plans");

        assert!(out.is_empty());
    }

    #[test]
    fn write_failure_is_an_io_error() {
        struct ClosedPipe;

        impl Write for ClosedPipe {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let plan = daily_plan(&idle_state()).expect("plan");
        let error = write_plan(&plan, &mut ClosedPipe).expect_err("closed pipe");
        assert_eq!(error.kind(), "io");
    }
}
