pub mod activity_mapper;
pub mod config;
pub mod error;
pub mod logging;
pub mod schedule_client;
