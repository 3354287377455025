use crate::error::Result;
use crate::wallbox::client::WallboxClient;
use crate::wallbox::types::{AllData, LockStatus, Side, int_field};
use reqwest::Method;
use serde_json::json;

pub const ALL_PATH: &str = "/api/v1/all";
pub const LOCK_STATUS_PATH: &str = "/api/v1/lock_status";
pub const POWER_PATH: &str = "/api/v1/power";
pub const LOCK_PATH: &str = "/api/v1/lock";
pub const LED_MODE_PATH: &str = "/api/v1/led_mode";

/// Operations the wallbox exposes
///
/// Implemented by [`WallboxClient`]; the coordinator and the presentation
/// layer only see this trait.
#[async_trait::async_trait]
pub trait WallboxApi: Send + Sync {
    /// Log in and keep the password for automatic re-login
    async fn login(&self, password: &str) -> Result<String>;

    /// Primary telemetry
    async fn get_all(&self) -> Result<AllData>;

    /// Per-side lock/timer/power status
    async fn get_lock_status(&self) -> Result<LockStatus>;

    /// Set all three current limits at once
    async fn set_power(&self, max_total: i64, max_car1: i64, max_car2: i64) -> Result<()>;

    async fn lock(&self, side: Side) -> Result<()>;

    async fn unlock(&self, side: Side) -> Result<()>;

    async fn get_led_mode(&self) -> Result<i64>;

    async fn set_led_mode(&self, mode: i64) -> Result<()>;
}

impl WallboxClient {
    async fn post_lock_action(&self, action: &str, side: Side) -> Result<()> {
        let body = json!({ "action": action, "side": side.index() });
        self.request(Method::POST, LOCK_PATH, Some(&body)).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl WallboxApi for WallboxClient {
    async fn login(&self, password: &str) -> Result<String> {
        self.authenticate(password).await
    }

    async fn get_all(&self) -> Result<AllData> {
        let map = self
            .request(Method::GET, ALL_PATH, None)
            .await?
            .into_object(ALL_PATH)?;
        Ok(AllData::from_json(&map))
    }

    async fn get_lock_status(&self) -> Result<LockStatus> {
        let map = self
            .request(Method::GET, LOCK_STATUS_PATH, None)
            .await?
            .into_object(LOCK_STATUS_PATH)?;
        Ok(LockStatus::from_json(&map))
    }

    async fn set_power(&self, max_total: i64, max_car1: i64, max_car2: i64) -> Result<()> {
        tracing::debug!(
            "Setting power: total={}, car1={}, car2={}",
            max_total,
            max_car1,
            max_car2
        );
        let body = json!({
            "MaxCurrentTotal": max_total,
            "MaxCurrentCar1": max_car1,
            "MaxCurrentCar2": max_car2,
        });
        let result = self.request(Method::POST, POWER_PATH, Some(&body)).await?;
        tracing::debug!("set_power response: {:?}", result);
        Ok(())
    }

    async fn lock(&self, side: Side) -> Result<()> {
        self.post_lock_action("lock", side).await
    }

    async fn unlock(&self, side: Side) -> Result<()> {
        self.post_lock_action("unlock", side).await
    }

    async fn get_led_mode(&self) -> Result<i64> {
        let map = self
            .request(Method::GET, LED_MODE_PATH, None)
            .await?
            .into_object(LED_MODE_PATH)?;
        Ok(int_field(&map, "ledMode", 0))
    }

    async fn set_led_mode(&self, mode: i64) -> Result<()> {
        let body = json!({ "ledMode": mode });
        self.request(Method::POST, LED_MODE_PATH, Some(&body)).await?;
        Ok(())
    }
}
