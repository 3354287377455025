//! Observable values and controls derived from the polled snapshot
//!
//! Each platform is a static table of descriptors. A descriptor decides from
//! the first snapshot whether it applies to the connected unit (`has_fn`) and
//! computes its value from every later snapshot. [`EntitySet`] is the set of
//! entities that applied at setup time plus the local state some of them
//! carry (assumed lock state, LED mode).

pub mod binary_sensor;
pub mod device;
pub mod number;
pub mod select;
pub mod sensor;
pub mod switch;

pub use binary_sensor::{BINARY_SENSORS, BinarySensorDescription};
pub use device::{DeviceInfo, translation_key};
pub use number::{MIN_CURRENT, NUMBERS, NumberDescription};
pub use select::{LedMode, LedModeSelect};
pub use sensor::{CarStatus, SENSORS, SensorDescription, SensorValue};
pub use switch::{LOCK_COOLDOWN, LOCK_SWITCHES, LockSwitch, SwitchDescription};

use crate::coordinator::{Coordinator, CoordinatorData};
use crate::error::{PrachtError, Result};
use crate::wallbox::WallboxApi;
use serde::Serialize;
use std::time::Instant;

/// Entity platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Sensor,
    BinarySensor,
    Number,
    Switch,
    Select,
}

/// Grouping hint for consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityCategory {
    /// Settings the user changes
    Config,

    /// Health and debugging values
    Diagnostic,
}

/// Rendered state of one entity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityState {
    pub key: &'static str,
    pub unique_id: String,
    pub platform: Platform,
    pub translation_key: String,
    pub value: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<EntityCategory>,
    pub available: bool,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub attributes: serde_json::Value,
}

/// Entities that exist for one connected unit
#[derive(Debug)]
pub struct EntitySet {
    pub device: DeviceInfo,
    is_mono: bool,
    sensors: Vec<&'static SensorDescription>,
    binary_sensors: Vec<&'static BinarySensorDescription>,
    numbers: Vec<(&'static NumberDescription, i64)>,
    switches: Vec<LockSwitch>,
    led_mode: Option<LedModeSelect>,
}

impl EntitySet {
    /// Pick the applicable descriptors for the unit behind `data`
    ///
    /// Number maxima are fixed here, from the snapshot seen at setup.
    pub fn from_snapshot(data: &CoordinatorData, host: &str) -> Self {
        Self {
            device: DeviceInfo::from_data(&data.all_data, host),
            is_mono: !data.all_data.is_duo(),
            sensors: SENSORS.iter().filter(|d| (d.has_fn)(data)).collect(),
            binary_sensors: BINARY_SENSORS.iter().filter(|d| (d.has_fn)(data)).collect(),
            numbers: NUMBERS
                .iter()
                .filter(|d| (d.has_fn)(data))
                .map(|d| (d, (d.max_value_fn)(data)))
                .collect(),
            switches: LOCK_SWITCHES
                .iter()
                .filter(|d| (d.has_fn)(data))
                .map(LockSwitch::new)
                .collect(),
            led_mode: None,
        }
    }

    /// Same as [`from_snapshot`](Self::from_snapshot) plus the LED mode select,
    /// whose initial value has to be read from the device
    pub async fn load(data: &CoordinatorData, host: &str, api: &dyn WallboxApi) -> Self {
        let mut set = Self::from_snapshot(data, host);
        if data.all_data.led_support {
            set.led_mode = Some(LedModeSelect::load(api).await);
        }
        set
    }

    pub fn is_mono(&self) -> bool {
        self.is_mono
    }

    pub fn keys(&self) -> Vec<&'static str> {
        let mut keys: Vec<&'static str> = Vec::new();
        keys.extend(self.sensors.iter().map(|d| d.key));
        keys.extend(self.binary_sensors.iter().map(|d| d.key));
        keys.extend(self.numbers.iter().map(|(d, _)| d.key));
        keys.extend(self.switches.iter().map(|s| s.description().key));
        if self.led_mode.is_some() {
            keys.push(select::LED_MODE_KEY);
        }
        keys
    }

    fn state(
        &self,
        key: &'static str,
        platform: Platform,
        value: serde_json::Value,
        available: bool,
    ) -> EntityState {
        EntityState {
            key,
            unique_id: self.device.unique_id(key),
            platform,
            translation_key: translation_key(key, self.is_mono),
            value,
            unit: None,
            device_class: None,
            category: None,
            available,
            attributes: serde_json::Value::Null,
        }
    }

    /// Render every entity against `data`
    pub fn states(
        &self,
        data: &CoordinatorData,
        available: bool,
        now: Instant,
    ) -> Vec<EntityState> {
        let mut out = Vec::new();

        for d in &self.sensors {
            let value = (d.value_fn)(data).map_or(serde_json::Value::Null, |v| v.to_json());
            let mut s = self.state(d.key, Platform::Sensor, value, available);
            s.unit = d.unit;
            s.device_class = d.device_class;
            s.category = d.category;
            let mut attributes = serde_json::Map::new();
            if let Some(options) = d.options {
                attributes.insert("options".into(), serde_json::json!(options));
            }
            if let Some(precision) = d.precision {
                attributes.insert("precision".into(), serde_json::json!(precision));
            }
            if !d.enabled_by_default {
                attributes.insert("enabled_by_default".into(), serde_json::Value::Bool(false));
            }
            if !attributes.is_empty() {
                s.attributes = serde_json::Value::Object(attributes);
            }
            out.push(s);
        }

        for d in &self.binary_sensors {
            let on = (d.is_on_fn)(data);
            let mut s = self.state(d.key, Platform::BinarySensor, on.into(), available);
            s.device_class = Some(d.device_class);
            out.push(s);
        }

        for (d, max) in &self.numbers {
            let mut s = self.state(d.key, Platform::Number, (d.value_fn)(data).into(), available);
            s.unit = Some(number::UNIT);
            s.device_class = Some("current");
            s.category = Some(EntityCategory::Config);
            s.attributes = serde_json::json!({
                "min": MIN_CURRENT,
                "max": max,
                "step": number::STEP,
            });
            out.push(s);
        }

        for sw in &self.switches {
            let on = sw.is_on_at(data, now);
            let mut s = self.state(sw.description().key, Platform::Switch, on.into(), available);
            s.device_class = Some("switch");
            out.push(s);
        }

        if let Some(led) = &self.led_mode {
            let mut s = self.state(
                select::LED_MODE_KEY,
                Platform::Select,
                serde_json::json!(led.current_option().label()),
                available,
            );
            s.category = Some(EntityCategory::Config);
            s.attributes = serde_json::json!({ "options": LedMode::labels() });
            out.push(s);
        }

        out
    }

    /// Set one of the current limits
    pub async fn set_number(
        &self,
        key: &str,
        value: f64,
        data: &CoordinatorData,
        coordinator: &Coordinator,
    ) -> Result<()> {
        let (description, max) = self
            .numbers
            .iter()
            .find(|(d, _)| d.key == key)
            .ok_or_else(|| {
                PrachtError::validation("key", format!("Unknown number entity '{}'", key))
            })?;
        description.set_value(value, *max, data, coordinator).await
    }

    /// Lock (`on = true`) or unlock a side
    pub async fn set_switch(
        &self,
        key: &str,
        on: bool,
        api: &dyn WallboxApi,
        now: Instant,
    ) -> Result<()> {
        let switch = self
            .switches
            .iter()
            .find(|s| s.description().key == key)
            .ok_or_else(|| {
                PrachtError::validation("key", format!("Unknown switch entity '{}'", key))
            })?;
        if on {
            switch.turn_on(api, now).await
        } else {
            switch.turn_off(api, now).await
        }
    }

    /// Change the LED mode
    pub async fn select_led_mode(&self, option: &str, api: &dyn WallboxApi) -> Result<()> {
        let select = self
            .led_mode
            .as_ref()
            .ok_or_else(|| {
                PrachtError::validation("led_mode", "LED mode is not supported by this unit")
            })?;
        select.select_option(option, api).await
    }
}
