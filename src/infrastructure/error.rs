use crate::domain::models::TimeParseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("network error: {0}")]
    Network(String),
    #[error("schedule service rejected request: {0}")]
    Application(String),
    #[error("invalid payload: {0}")]
    Parse(String),
    #[error(transparent)]
    TimeOfDay(#[from] TimeParseError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("invalid action: {0}")]
    InvalidAction(String),
    #[error("sync coordinator is already running")]
    AlreadyRunning,
    #[error("state lock poisoned: {0}")]
    LockPoisoned(String),
}

impl InfraError {
    /// Stable label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Application(_) => "application",
            Self::Parse(_) | Self::TimeOfDay(_) | Self::Json(_) => "parse",
            Self::Io(_) => "io",
            Self::InvalidConfig(_) => "config",
            Self::InvalidAction(_) => "invalid_action",
            Self::AlreadyRunning => "already_running",
            Self::LockPoisoned(_) => "lock_poisoned",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_failure_has_its_own_kind() {
        let error: InfraError = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "stdout closed").into();
        assert_eq!(error.kind(), "io");
        assert!(error.to_string().contains("stdout closed"));
    }
}
