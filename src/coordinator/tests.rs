use super::*;
use crate::wallbox::Side;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Clone, Copy)]
enum Outcome {
    Ok,
    Auth,
    Connection,
    Protocol,
}

impl Outcome {
    fn error(self) -> Option<PrachtError> {
        match self {
            Outcome::Ok => None,
            Outcome::Auth => Some(PrachtError::auth("Authentication failed")),
            Outcome::Connection => {
                Some(PrachtError::connection("Cannot connect to test: timed out"))
            }
            Outcome::Protocol => Some(PrachtError::protocol_status(500, "oops")),
        }
    }
}

struct FakeApi {
    all: StdMutex<Outcome>,
    lock: StdMutex<Outcome>,
    supports_lock: bool,
    all_calls: AtomicUsize,
    lock_calls: AtomicUsize,
}

impl FakeApi {
    fn new(supports_lock: bool) -> Self {
        Self {
            all: StdMutex::new(Outcome::Ok),
            lock: StdMutex::new(Outcome::Ok),
            supports_lock,
            all_calls: AtomicUsize::new(0),
            lock_calls: AtomicUsize::new(0),
        }
    }

    fn set_all(&self, outcome: Outcome) {
        *self.all.lock().unwrap() = outcome;
    }

    fn set_lock(&self, outcome: Outcome) {
        *self.lock.lock().unwrap() = outcome;
    }
}

#[async_trait::async_trait]
impl WallboxApi for FakeApi {
    async fn login(&self, _password: &str) -> Result<String> {
        Ok("key".into())
    }

    async fn get_all(&self) -> Result<AllData> {
        self.all_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = self.all.lock().unwrap().error() {
            return Err(e);
        }
        let mut data = AllData::default();
        data.device_id = "PA-TEST".into();
        data.support_lock_unlock = self.supports_lock;
        Ok(data)
    }

    async fn get_lock_status(&self) -> Result<LockStatus> {
        self.lock_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = self.lock.lock().unwrap().error() {
            return Err(e);
        }
        let mut status = LockStatus::default();
        status.lock_status1 = "Locked".into();
        Ok(status)
    }

    async fn set_power(&self, _t: i64, _c1: i64, _c2: i64) -> Result<()> {
        Ok(())
    }

    async fn lock(&self, _side: Side) -> Result<()> {
        Ok(())
    }

    async fn unlock(&self, _side: Side) -> Result<()> {
        Ok(())
    }

    async fn get_led_mode(&self) -> Result<i64> {
        Ok(0)
    }

    async fn set_led_mode(&self, _mode: i64) -> Result<()> {
        Ok(())
    }
}

fn coordinator(api: &Arc<FakeApi>) -> Coordinator {
    Coordinator::new("Pracht Alpha test", api.clone(), Duration::from_secs(3600))
}

#[tokio::test]
async fn publishes_snapshot_with_lock_status() {
    let api = Arc::new(FakeApi::new(true));
    let coord = coordinator(&api);

    let data = coord.refresh().await.unwrap();
    assert_eq!(data.all_data.device_id, "PA-TEST");
    assert!(data.lock_status.as_ref().unwrap().is_locked(Side::First));
    assert_eq!(coord.data().unwrap(), data);

    let status = coord.status();
    assert_eq!(status.state, CoordinatorState::Idle);
    assert!(status.last_update_success());
    assert_eq!(status.cycles, 1);
    assert!(coord.is_available());
}

#[tokio::test]
async fn lock_status_not_fetched_without_support() {
    let api = Arc::new(FakeApi::new(false));
    let coord = coordinator(&api);

    let data = coord.refresh().await.unwrap();
    assert!(data.lock_status.is_none());
    assert_eq!(api.lock_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn lock_status_connection_failure_is_swallowed() {
    let api = Arc::new(FakeApi::new(true));
    api.set_lock(Outcome::Connection);
    let coord = coordinator(&api);

    let data = coord.refresh().await.unwrap();
    assert!(data.lock_status.is_none());
    assert_eq!(api.lock_calls.load(Ordering::SeqCst), 1);
    assert!(coord.status().last_update_success());
}

#[tokio::test]
async fn lock_status_protocol_failure_is_swallowed() {
    let api = Arc::new(FakeApi::new(true));
    api.set_lock(Outcome::Protocol);
    let coord = coordinator(&api);

    assert!(coord.refresh().await.unwrap().lock_status.is_none());
}

#[tokio::test]
async fn lock_status_auth_failure_is_swallowed() {
    let api = Arc::new(FakeApi::new(true));
    api.set_lock(Outcome::Auth);
    let coord = coordinator(&api);

    let data = coord.refresh().await.unwrap();
    assert!(data.lock_status.is_none());
    assert_eq!(data.all_data.device_id, "PA-TEST");
    let status = coord.status();
    assert!(status.last_update_success());
    assert!(!status.needs_reauth());
    assert!(coord.is_available());
}

#[tokio::test]
async fn auth_failure_publishes_nothing() {
    let api = Arc::new(FakeApi::new(true));
    api.set_all(Outcome::Auth);
    let coord = coordinator(&api);

    let failure = coord.refresh().await.unwrap_err();
    assert!(matches!(failure, UpdateFailure::Authentication(_)));
    assert!(coord.data().is_none());
    assert_eq!(api.lock_calls.load(Ordering::SeqCst), 0);

    let status = coord.status();
    assert!(status.needs_reauth());
    assert!(!status.last_update_success());
    assert!(!coord.is_available());
}

#[tokio::test]
async fn connection_and_protocol_failures_are_transient() {
    let api = Arc::new(FakeApi::new(false));
    let coord = coordinator(&api);

    api.set_all(Outcome::Connection);
    let failure = coord.refresh().await.unwrap_err();
    assert!(matches!(failure, UpdateFailure::Communication(ref m) if m.contains("timed out")));
    assert_eq!(failure.state(), CoordinatorState::CommFailed);

    api.set_all(Outcome::Protocol);
    let failure = coord.refresh().await.unwrap_err();
    assert!(matches!(failure, UpdateFailure::Unknown(ref m) if m.contains("500")));
    assert!(!coord.status().needs_reauth());
}

#[tokio::test]
async fn failure_keeps_previous_snapshot_but_marks_unavailable() {
    let api = Arc::new(FakeApi::new(false));
    let coord = coordinator(&api);

    let first = coord.refresh().await.unwrap();
    api.set_all(Outcome::Connection);
    assert!(coord.refresh().await.is_err());

    assert_eq!(coord.data().unwrap(), first);
    assert!(!coord.is_available());

    api.set_all(Outcome::Ok);
    let second = coord.refresh().await.unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert!(coord.is_available());
    assert_eq!(coord.status().cycles, 3);
}

#[tokio::test]
async fn subscribers_see_new_snapshots() {
    let api = Arc::new(FakeApi::new(false));
    let coord = coordinator(&api);
    let mut rx = coord.subscribe();
    assert!(rx.borrow().is_none());

    coord.refresh().await.unwrap();
    assert!(rx.has_changed().unwrap());
    assert!(rx.borrow_and_update().is_some());
}

#[tokio::test]
async fn run_loop_serves_requested_refresh_and_stops() {
    let api = Arc::new(FakeApi::new(false));
    let coord = Arc::new(coordinator(&api));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let runner = {
        let coord = coord.clone();
        tokio::spawn(async move { coord.run(shutdown_rx).await })
    };

    let mut status_rx = coord.subscribe_status();
    coord.request_refresh();
    tokio::time::timeout(Duration::from_secs(2), status_rx.wait_for(|s| s.cycles >= 1))
        .await
        .expect("refresh not served")
        .unwrap();
    assert_eq!(api.all_calls.load(Ordering::SeqCst), 1);

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(2), runner)
        .await
        .expect("loop did not stop")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn run_loop_polls_on_interval() {
    let api = Arc::new(FakeApi::new(false));
    let coord = Arc::new(Coordinator::new(
        "fast",
        api.clone(),
        Duration::from_millis(20),
    ));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let runner = {
        let coord = coord.clone();
        tokio::spawn(async move { coord.run(shutdown_rx).await })
    };

    let mut status_rx = coord.subscribe_status();
    tokio::time::timeout(Duration::from_secs(5), status_rx.wait_for(|s| s.cycles >= 2))
        .await
        .expect("interval ticks not observed")
        .unwrap();

    drop(shutdown_tx);
    runner.await.unwrap().unwrap();
}

#[tokio::test]
async fn second_run_while_running_is_rejected() {
    let api = Arc::new(FakeApi::new(false));
    let coord = Arc::new(coordinator(&api));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let runner = {
        let coord = coord.clone();
        let rx = shutdown_rx.clone();
        tokio::spawn(async move { coord.run(rx).await })
    };
    tokio::task::yield_now().await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(coord.run(shutdown_rx).await.is_err());

    shutdown_tx.send(true).unwrap();
    runner.await.unwrap().unwrap();
}
