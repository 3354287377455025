use crate::error::PrachtError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Phase of the poll cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatorState {
    Idle,
    Polling,
    Published,
    AuthFailed,
    CommFailed,
}

/// Why a poll cycle did not publish
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum UpdateFailure {
    /// Credentials no longer accepted; the host should ask for new ones
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Device unreachable; retried on the next tick
    #[error("Error communicating with the wallbox: {0}")]
    Communication(String),

    /// Device answered with something unusable; retried on the next tick
    #[error("Unknown error while updating: {0}")]
    Unknown(String),
}

impl UpdateFailure {
    /// Classify a primary-telemetry fetch error
    pub fn from_fetch_error(err: &PrachtError) -> Self {
        match err {
            PrachtError::Auth { .. } => UpdateFailure::Authentication(err.to_string()),
            PrachtError::Connection { .. } => UpdateFailure::Communication(err.to_string()),
            _ => UpdateFailure::Unknown(err.to_string()),
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, UpdateFailure::Authentication(_))
    }

    /// Terminal state this failure puts the cycle in
    pub fn state(&self) -> CoordinatorState {
        if self.is_auth() {
            CoordinatorState::AuthFailed
        } else {
            CoordinatorState::CommFailed
        }
    }
}

/// Observable status of the coordinator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoordinatorStatus {
    pub state: CoordinatorState,
    /// Failure of the most recent cycle; cleared by the next success
    pub last_failure: Option<UpdateFailure>,
    pub last_success_at: Option<DateTime<Utc>>,
    /// Completed cycles, successful or not
    pub cycles: u64,
}

impl Default for CoordinatorStatus {
    fn default() -> Self {
        Self {
            state: CoordinatorState::Idle,
            last_failure: None,
            last_success_at: None,
            cycles: 0,
        }
    }
}

impl CoordinatorStatus {
    /// Whether the last cycle published fresh data
    pub fn last_update_success(&self) -> bool {
        self.last_success_at.is_some() && self.last_failure.is_none()
    }

    /// Whether the last cycle failed on credentials
    pub fn needs_reauth(&self) -> bool {
        self.last_failure.as_ref().is_some_and(UpdateFailure::is_auth)
    }
}
