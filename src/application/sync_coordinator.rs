use crate::application::clock::Clock;
use crate::application::task_store::TaskLifecycleStore;
use crate::infrastructure::activity_mapper::decode_snapshot;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::schedule_client::ScheduleServiceClient;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Replaced { generation: u64 },
    /// Another fetch held the gate; this tick was dropped.
    Skipped,
    /// The fetch failed and the previous snapshot was kept.
    Stale,
}

/// Owns the poll loop that keeps the [`TaskLifecycleStore`] in step with the
/// Schedule Service.
pub struct SyncCoordinator<C>
where
    C: ScheduleServiceClient,
{
    client: Arc<C>,
    store: Arc<TaskLifecycleStore>,
    clock: Clock,
    poll_interval: Duration,
    fetch_gate: AsyncMutex<()>,
    cancellation: CancellationToken,
    poll_handle: Mutex<Option<JoinHandle<()>>>,
}

impl<C> SyncCoordinator<C>
where
    C: ScheduleServiceClient + 'static,
{
    pub fn new(client: Arc<C>, store: Arc<TaskLifecycleStore>, clock: Clock) -> Self {
        Self {
            client,
            store,
            clock,
            poll_interval: DEFAULT_POLL_INTERVAL,
            fetch_gate: AsyncMutex::new(()),
            cancellation: CancellationToken::new(),
            poll_handle: Mutex::new(None),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn store(&self) -> &Arc<TaskLifecycleStore> {
        &self.store
    }

    /// Spawns the poll loop. The first tick fires immediately.
    pub fn start(self: &Arc<Self>) -> Result<(), InfraError> {
        let mut handle = self.lock_handle()?;
        if handle.is_some() {
            return Err(InfraError::AlreadyRunning);
        }
        if self.cancellation.is_cancelled() {
            return Err(InfraError::InvalidAction(
                "sync coordinator has been stopped".to_string(),
            ));
        }

        *handle = Some(tokio::spawn(Self::poll_loop(
            Arc::downgrade(self),
            self.poll_interval,
            self.cancellation.clone(),
        )));
        info!(
            interval_secs = self.poll_interval.as_secs(),
            "schedule polling started"
        );
        Ok(())
    }

    /// Cancels the poll loop and waits for it to exit.
    pub async fn stop(&self) {
        self.cancellation.cancel();
        let handle = match self.lock_handle() {
            Ok(mut guard) => guard.take(),
            Err(error) => {
                warn!(error = %error, "poll handle unavailable during stop");
                None
            }
        };
        if let Some(handle) = handle {
            if let Err(error) = handle.await {
                warn!(error = %error, "poll task ended abnormally");
            }
            info!("schedule polling stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock_handle()
            .map(|handle| handle.as_ref().is_some_and(|task| !task.is_finished()))
            .unwrap_or(false)
    }

    /// Fetches now, waiting for any in-flight fetch to finish first. Used after
    /// a successful mutation so the refetch is never dropped.
    pub async fn refresh(&self) -> Result<u64, InfraError> {
        let _gate = self.fetch_gate.lock().await;
        self.fetch_and_replace().await
    }

    /// One scheduled tick: skipped if a fetch is in flight, failures keep the
    /// previous snapshot.
    pub async fn poll_once(&self) -> PollOutcome {
        let Ok(_gate) = self.fetch_gate.try_lock() else {
            debug!("schedule fetch already in flight; skipping tick");
            return PollOutcome::Skipped;
        };
        match self.fetch_and_replace().await {
            Ok(generation) => PollOutcome::Replaced { generation },
            Err(error) => {
                warn!(kind = error.kind(), error = %error, "schedule fetch failed; keeping previous snapshot");
                PollOutcome::Stale
            }
        }
    }

    /// Holds only a weak handle between ticks so dropping the last
    /// coordinator reference tears the loop down.
    async fn poll_loop(coordinator: Weak<Self>, poll_interval: Duration, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    let Some(coordinator) = coordinator.upgrade() else {
                        break;
                    };
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = coordinator.poll_once() => {}
                    }
                }
            }
        }
        debug!("schedule poll loop exited");
    }

    async fn fetch_and_replace(&self) -> Result<u64, InfraError> {
        let payload = self.client.fetch_schedule().await?.without_suppressed();
        let snapshot = decode_snapshot(payload, self.clock.now_utc())?;
        let scheduled = snapshot.schedule.len();
        let unfinished = snapshot.unfinished_tasks.len();
        let waiting = snapshot.waiting_for_confirmation.len();
        let generation = self.store.replace_snapshot(snapshot)?;
        info!(generation, scheduled, unfinished, waiting, "schedule snapshot replaced");
        Ok(generation)
    }

    fn lock_handle(&self) -> Result<std::sync::MutexGuard<'_, Option<JoinHandle<()>>>, InfraError> {
        self.poll_handle
            .lock()
            .map_err(|error| InfraError::LockPoisoned(format!("poll handle lock poisoned: {error}")))
    }
}

impl<C> Drop for SyncCoordinator<C>
where
    C: ScheduleServiceClient,
{
    fn drop(&mut self) {
        self.cancellation.cancel();
    }
}
