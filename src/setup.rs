//! Connection setup, credential validation and re-authentication
//!
//! Setup-time failures are classified differently from steady-state polling:
//! an unreachable device means "not ready, try again later", rejected
//! credentials mean "ask the user for a new password".

use crate::config::Config;
use crate::coordinator::{Coordinator, UpdateFailure};
use crate::entities::device::DEVICE_NAME;
use crate::error::{PrachtError, Result};
use crate::logging::get_logger;
use crate::wallbox::{AllData, WallboxApi, WallboxClient};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Why the bridge could not be set up
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupFailure {
    /// Device unreachable or misbehaving; setup should be retried later
    #[error("Wallbox not ready: {message}")]
    NotReady { message: String },

    /// Password rejected; new credentials are required
    #[error("Wallbox rejected the credentials: {message}")]
    AuthFailed { message: String },
}

impl SetupFailure {
    fn from_login_error(err: &PrachtError) -> Self {
        if err.is_auth() {
            SetupFailure::AuthFailed {
                message: err.to_string(),
            }
        } else {
            SetupFailure::NotReady {
                message: err.to_string(),
            }
        }
    }

    fn from_update_failure(failure: &UpdateFailure) -> Self {
        if failure.is_auth() {
            SetupFailure::AuthFailed {
                message: failure.to_string(),
            }
        } else {
            SetupFailure::NotReady {
                message: failure.to_string(),
            }
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, SetupFailure::NotReady { .. })
    }
}

/// A connected wallbox: the API client plus the coordinator polling it
pub struct Bridge {
    host: String,
    api: Arc<dyn WallboxApi>,
    coordinator: Arc<Coordinator>,
}

impl Bridge {
    /// Build the client from configuration, log in and run the first refresh
    pub async fn setup(config: &Config) -> std::result::Result<Self, SetupFailure> {
        let timeout = config.device.request_timeout();
        let client = WallboxClient::with_timeout(&config.device.host, timeout)
            .map_err(|e| SetupFailure::NotReady {
                message: e.to_string(),
            })?;
        Self::setup_with_api(
            &config.device.host,
            Arc::new(client),
            &config.device.password,
            config.poll_interval(),
        )
        .await
    }

    /// Set up against any [`WallboxApi`] implementation
    pub async fn setup_with_api(
        host: &str,
        api: Arc<dyn WallboxApi>,
        password: &str,
        update_interval: Duration,
    ) -> std::result::Result<Self, SetupFailure> {
        let logger = get_logger("setup");
        logger.info(&format!("Connecting to {} at {}", DEVICE_NAME, host));

        api.login(password).await.map_err(|e| {
            logger.warn(&format!("Login to {} failed: {}", host, e));
            SetupFailure::from_login_error(&e)
        })?;

        let coordinator = Arc::new(Coordinator::new(
            &format!("{} {}", DEVICE_NAME, host),
            Arc::clone(&api),
            update_interval,
        ));
        let data = coordinator
            .refresh()
            .await
            .map_err(|f| SetupFailure::from_update_failure(&f))?;

        logger.info(&format!(
            "Connected to {} {} ({} charging point{})",
            DEVICE_NAME,
            data.all_data.device_id,
            data.all_data.num_charging_points,
            if data.all_data.is_duo() { "s" } else { "" }
        ));

        Ok(Self {
            host: host.to_string(),
            api,
            coordinator,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn api(&self) -> Arc<dyn WallboxApi> {
        Arc::clone(&self.api)
    }

    pub fn coordinator(&self) -> Arc<Coordinator> {
        Arc::clone(&self.coordinator)
    }

    /// Log in with a new password and refresh as soon as possible
    pub async fn reauthenticate(&self, password: &str) -> Result<()> {
        reauthenticate(self.api.as_ref(), &self.coordinator, password).await
    }
}

/// Shared by [`Bridge::reauthenticate`] and the web layer
pub async fn reauthenticate(
    api: &dyn WallboxApi,
    coordinator: &Coordinator,
    password: &str,
) -> Result<()> {
    api.login(password).await?;
    get_logger("setup").info("Re-authenticated with new credentials");
    coordinator.request_refresh();
    Ok(())
}

/// Why a host/password pair could not be validated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum CredentialIssue {
    #[error("invalid_auth")]
    InvalidAuth,
    #[error("cannot_connect")]
    CannotConnect,
    #[error("unknown")]
    Unknown,
}

impl CredentialIssue {
    /// Form field the issue belongs to
    pub fn field(&self) -> &'static str {
        match self {
            CredentialIssue::InvalidAuth => "password",
            CredentialIssue::CannotConnect => "host",
            CredentialIssue::Unknown => "base",
        }
    }
}

/// Check a host/password pair by logging in and reading the telemetry once
pub async fn validate_credentials(
    host: &str,
    password: &str,
) -> std::result::Result<AllData, CredentialIssue> {
    let client = WallboxClient::new(host).map_err(|_| CredentialIssue::Unknown)?;
    validate_with_api(&client, password).await
}

/// Same as [`validate_credentials`] against any [`WallboxApi`]
pub async fn validate_with_api(
    api: &dyn WallboxApi,
    password: &str,
) -> std::result::Result<AllData, CredentialIssue> {
    let attempt = async {
        api.login(password).await?;
        api.get_all().await
    };
    match attempt.await {
        Ok(data) => Ok(data),
        Err(PrachtError::Auth { .. }) => Err(CredentialIssue::InvalidAuth),
        Err(PrachtError::Connection { .. }) => Err(CredentialIssue::CannotConnect),
        Err(e) => {
            get_logger("setup").error(&format!("Unexpected error validating credentials: {}", e));
            Err(CredentialIssue::Unknown)
        }
    }
}
