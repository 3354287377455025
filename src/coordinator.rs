//! Polling coordinator
//!
//! Drives the fixed-interval poll of the wallbox, aggregates the mandatory
//! telemetry and the optional lock status into one immutable snapshot, and
//! publishes it to subscribers over a `watch` channel. Failures of the primary
//! fetch are classified (auth vs. communication vs. unknown); failures of the
//! lock-status fetch only drop the lock status from the snapshot.

use crate::error::{PrachtError, Result};
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::wallbox::{AllData, LockStatus, WallboxApi};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior, interval_at};

mod state;
#[cfg(test)]
mod tests;

pub use state::{CoordinatorState, CoordinatorStatus, UpdateFailure};

/// Poll interval used by the bridge
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(15);

/// Everything read from the wallbox in one poll cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoordinatorData {
    pub all_data: AllData,
    /// `None` means the side lock state is unknown, not unlocked
    pub lock_status: Option<LockStatus>,
    pub fetched_at: DateTime<Utc>,
}

/// Result of a single poll cycle
pub type UpdateResult = std::result::Result<Arc<CoordinatorData>, UpdateFailure>;

pub struct Coordinator {
    api: Arc<dyn WallboxApi>,
    name: String,
    update_interval: Duration,
    data_tx: watch::Sender<Option<Arc<CoordinatorData>>>,
    status_tx: watch::Sender<CoordinatorStatus>,
    /// Held for the duration of a cycle so timer and manual refreshes never overlap
    poll_lock: Mutex<()>,
    refresh_tx: mpsc::UnboundedSender<()>,
    refresh_rx: Mutex<Option<mpsc::UnboundedReceiver<()>>>,
    logger: StructuredLogger,
}

impl Coordinator {
    pub fn new(name: &str, api: Arc<dyn WallboxApi>, update_interval: Duration) -> Self {
        let (data_tx, _) = watch::channel(None);
        let (status_tx, _) = watch::channel(CoordinatorStatus::default());
        let (refresh_tx, refresh_rx) = mpsc::unbounded_channel();
        let logger = get_logger_with_context(
            LogContext::new("coordinator").with_field("name", name.to_string()),
        );
        Self {
            api,
            name: name.to_string(),
            update_interval,
            data_tx,
            status_tx,
            poll_lock: Mutex::new(()),
            refresh_tx,
            refresh_rx: Mutex::new(Some(refresh_rx)),
            logger,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    /// The API the coordinator polls; commands go through it directly
    pub fn api(&self) -> Arc<dyn WallboxApi> {
        Arc::clone(&self.api)
    }

    /// Most recently published snapshot
    pub fn data(&self) -> Option<Arc<CoordinatorData>> {
        self.data_tx.borrow().clone()
    }

    pub fn status(&self) -> CoordinatorStatus {
        self.status_tx.borrow().clone()
    }

    /// Fresh data is available when a snapshot exists and the last cycle succeeded
    pub fn is_available(&self) -> bool {
        self.data().is_some() && self.status().last_update_success()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<CoordinatorData>>> {
        self.data_tx.subscribe()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<CoordinatorStatus> {
        self.status_tx.subscribe()
    }

    /// Ask the run loop for an out-of-cycle refresh
    pub fn request_refresh(&self) {
        if self.refresh_tx.send(()).is_err() {
            self.logger.debug("Refresh requested but the poll loop is gone");
        }
    }

    /// Run one poll cycle now and publish its outcome
    pub async fn refresh(&self) -> UpdateResult {
        let _cycle = self.poll_lock.lock().await;
        self.status_tx
            .send_modify(|s| s.state = CoordinatorState::Polling);

        let result = self.fetch().await;
        let previous_failed = self.status_tx.borrow().last_failure.is_some();

        let outcome = match result {
            Ok(data) => {
                let data = Arc::new(data);
                self.data_tx.send_replace(Some(Arc::clone(&data)));
                self.status_tx.send_modify(|s| {
                    s.state = CoordinatorState::Published;
                    s.last_failure = None;
                    s.last_success_at = Some(data.fetched_at);
                    s.cycles += 1;
                });
                if previous_failed {
                    self.logger
                        .info(&format!("Fetching {} data recovered", self.name));
                }
                Ok(data)
            }
            Err(failure) => {
                let message = format!("Error fetching {} data: {}", self.name, failure);
                if failure.is_auth() {
                    self.logger.error(&message);
                } else if previous_failed {
                    self.logger.debug(&message);
                } else {
                    self.logger.warn(&message);
                }
                self.status_tx.send_modify(|s| {
                    s.state = failure.state();
                    s.last_failure = Some(failure.clone());
                    s.cycles += 1;
                });
                Err(failure)
            }
        };

        self.status_tx.send_modify(|s| s.state = CoordinatorState::Idle);
        outcome
    }

    async fn fetch(&self) -> std::result::Result<CoordinatorData, UpdateFailure> {
        let all_data = self
            .api
            .get_all()
            .await
            .map_err(|e| UpdateFailure::from_fetch_error(&e))?;

        let lock_status = if all_data.support_lock_unlock {
            match self.api.get_lock_status().await {
                Ok(status) => Some(status),
                // Lock status is best effort
                Err(e) => {
                    self.logger
                        .warn(&format!("Failed to fetch lock status: {}", e));
                    None
                }
            }
        } else {
            None
        };

        Ok(CoordinatorData {
            all_data,
            lock_status,
            fetched_at: Utc::now(),
        })
    }

    /// Poll on the fixed interval until `shutdown` becomes true or its sender is dropped
    ///
    /// The first tick fires one interval from now; callers are expected to
    /// have done a first [`refresh`](Self::refresh) during setup.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let mut refresh_rx = self
            .refresh_rx
            .lock()
            .await
            .take()
            .ok_or_else(|| PrachtError::generic("Coordinator poll loop is already running"))?;

        let mut ticker = interval_at(Instant::now() + self.update_interval, self.update_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.logger.info(&format!(
            "Starting poll loop, interval {}s",
            self.update_interval.as_secs_f64()
        ));

        while !*shutdown.borrow() {
            tokio::select! {
                _ = ticker.tick() => {
                    let _ = self.refresh().await;
                }
                Some(()) = refresh_rx.recv() => {
                    // Coalesce requests queued while the previous cycle ran
                    while refresh_rx.try_recv().is_ok() {}
                    let _ = self.refresh().await;
                    ticker.reset();
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        self.logger.info("Poll loop stopped");
        *self.refresh_rx.lock().await = Some(refresh_rx);
        Ok(())
    }
}
