pub mod clock;
pub mod commands;
pub mod sync_coordinator;
pub mod task_store;
