use crate::domain::classifier::{is_ended, WindowStatus};
use crate::domain::models::{is_suppressed, ScheduleSnapshot, Task, TaskId, TaskState, TimeOfDay};
use crate::infrastructure::error::InfraError;
use serde::Serialize;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::watch;

/// A schedule entry as seen at a particular minute.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntryView {
    pub task: Task,
    pub state: Option<TaskState>,
    pub status: Option<WindowStatus>,
    pub can_complete: bool,
}

/// Every derived list of one snapshot, read under a single lock acquisition.
#[derive(Debug, Clone)]
pub struct PlanView {
    pub generation: u64,
    pub snapshot: Option<Arc<ScheduleSnapshot>>,
    pub schedule: Vec<ScheduleEntryView>,
    pub unfinished_tasks: Vec<Task>,
    pub waiting_for_confirmation: Vec<Task>,
}

/// Sole owner of the current [`ScheduleSnapshot`].
///
/// The snapshot is replaced wholesale; readers get an `Arc` to an immutable
/// value and never observe a half-applied update. Local edits are limited to
/// the unfinished-task draft and are applied copy-on-write. The generation is
/// bumped while the write lock is held, so a reader sees a snapshot and its
/// generation together.
#[derive(Debug)]
pub struct TaskLifecycleStore {
    snapshot: RwLock<Option<Arc<ScheduleSnapshot>>>,
    generation: watch::Sender<u64>,
}

impl Default for TaskLifecycleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskLifecycleStore {
    pub fn new() -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            snapshot: RwLock::new(None),
            generation,
        }
    }

    pub fn current(&self) -> Result<Option<Arc<ScheduleSnapshot>>, InfraError> {
        Ok(self.read()?.clone())
    }

    /// Bumped on every replacement, remote or local.
    pub fn generation(&self) -> u64 {
        *self.generation.borrow()
    }

    /// The receiver is the whole subscription; dropping it unsubscribes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }

    pub fn replace_snapshot(&self, snapshot: ScheduleSnapshot) -> Result<u64, InfraError> {
        let mut current = self.write()?;
        *current = Some(Arc::new(snapshot));
        Ok(self.bump_generation())
    }

    pub fn plan_view(&self, now: TimeOfDay) -> Result<PlanView, InfraError> {
        let (snapshot, generation) = {
            let current = self.read()?;
            (current.clone(), self.generation())
        };
        let Some(snapshot) = snapshot else {
            return Ok(PlanView {
                generation,
                snapshot: None,
                schedule: Vec::new(),
                unfinished_tasks: Vec::new(),
                waiting_for_confirmation: Vec::new(),
            });
        };
        Ok(PlanView {
            generation,
            schedule: schedule_entries(&snapshot, now),
            unfinished_tasks: visible_tasks(&snapshot.unfinished_tasks),
            waiting_for_confirmation: visible_tasks(&snapshot.waiting_for_confirmation),
            snapshot: Some(snapshot),
        })
    }

    pub fn schedule_view(&self, now: TimeOfDay) -> Result<Vec<ScheduleEntryView>, InfraError> {
        Ok(self
            .current()?
            .map(|snapshot| schedule_entries(&snapshot, now))
            .unwrap_or_default())
    }

    pub fn unfinished_tasks(&self) -> Result<Vec<Task>, InfraError> {
        Ok(self
            .current()?
            .map(|snapshot| visible_tasks(&snapshot.unfinished_tasks))
            .unwrap_or_default())
    }

    pub fn waiting_for_confirmation(&self) -> Result<Vec<Task>, InfraError> {
        Ok(self
            .current()?
            .map(|snapshot| visible_tasks(&snapshot.waiting_for_confirmation))
            .unwrap_or_default())
    }

    /// Appends a draft to the unfinished list. Nothing reaches the server until
    /// the batch is submitted, and the next fetch replaces the draft.
    pub fn add_unfinished_task(&self, name: &str) -> Result<Task, InfraError> {
        let task = Task::draft(name).map_err(InfraError::InvalidAction)?;
        if is_suppressed(&task.name) {
            return Err(InfraError::InvalidAction(format!(
                "'{}' is a reserved activity name",
                task.name
            )));
        }
        let mut current = self.write()?;
        let Some(snapshot) = current.as_ref() else {
            return Err(InfraError::InvalidAction(
                "no schedule snapshot loaded yet".to_string(),
            ));
        };
        let mut next = ScheduleSnapshot::clone(snapshot);
        next.unfinished_tasks.push(task.clone());
        *current = Some(Arc::new(next));
        self.bump_generation();
        Ok(task)
    }

    pub fn remove_unfinished_task(&self, task_id: &TaskId) -> Result<bool, InfraError> {
        let mut current = self.write()?;
        let Some(snapshot) = current.as_ref() else {
            return Ok(false);
        };
        if !snapshot.unfinished_tasks.iter().any(|task| &task.id == task_id) {
            return Ok(false);
        }
        let mut next = ScheduleSnapshot::clone(snapshot);
        next.unfinished_tasks.retain(|task| &task.id != task_id);
        *current = Some(Arc::new(next));
        self.bump_generation();
        Ok(true)
    }

    /// The schedule entry to send to `complete-task`. Only offered once the
    /// clock is strictly past the window end.
    pub fn completion_candidate(&self, task_id: &TaskId, now: TimeOfDay) -> Result<Task, InfraError> {
        let snapshot = self.require_snapshot()?;
        let task = snapshot
            .schedule
            .iter()
            .filter(|task| !is_suppressed(&task.name))
            .find(|task| &task.id == task_id)
            .ok_or_else(|| InfraError::InvalidAction(format!("scheduled task not found: {task_id}")))?;
        let Some(window) = task.window else {
            return Err(InfraError::InvalidAction(format!("task {task_id} has no time window")));
        };
        if !is_ended(window.end, now) {
            return Err(InfraError::InvalidAction(format!(
                "task {task_id} ends at {}; cannot complete at {now}",
                window.end
            )));
        }
        Ok(task.clone())
    }

    pub fn confirmation_candidate(&self, task_id: &TaskId) -> Result<Task, InfraError> {
        let snapshot = self.require_snapshot()?;
        snapshot
            .waiting_for_confirmation
            .iter()
            .filter(|task| !is_suppressed(&task.name))
            .find(|task| &task.id == task_id)
            .cloned()
            .ok_or_else(|| InfraError::InvalidAction(format!("task awaiting confirmation not found: {task_id}")))
    }

    /// What `update-unfinished` receives: the visible unfinished list.
    pub fn unfinished_batch(&self) -> Result<Vec<Task>, InfraError> {
        self.unfinished_tasks()
    }

    fn require_snapshot(&self) -> Result<Arc<ScheduleSnapshot>, InfraError> {
        self.current()?
            .ok_or_else(|| InfraError::InvalidAction("no schedule snapshot loaded yet".to_string()))
    }

    fn bump_generation(&self) -> u64 {
        self.generation.send_modify(|generation| *generation += 1);
        self.generation()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Option<Arc<ScheduleSnapshot>>>, InfraError> {
        self.snapshot
            .read()
            .map_err(|error| InfraError::LockPoisoned(format!("snapshot lock poisoned: {error}")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Option<Arc<ScheduleSnapshot>>>, InfraError> {
        self.snapshot
            .write()
            .map_err(|error| InfraError::LockPoisoned(format!("snapshot lock poisoned: {error}")))
    }
}

fn schedule_entries(snapshot: &ScheduleSnapshot, now: TimeOfDay) -> Vec<ScheduleEntryView> {
    snapshot
        .schedule
        .iter()
        .filter(|task| !is_suppressed(&task.name))
        .map(|task| {
            let status = task.window.and_then(|window| window.status_at(now));
            ScheduleEntryView {
                task: task.clone(),
                state: task.state_at(now),
                status,
                can_complete: status == Some(WindowStatus::Ended),
            }
        })
        .collect()
}

fn visible_tasks(tasks: &[Task]) -> Vec<Task> {
    tasks
        .iter()
        .filter(|task| !is_suppressed(&task.name))
        .cloned()
        .collect()
}
