use crate::wallbox::{AllData, client::base_url_for};
use serde::Serialize;

pub const MANUFACTURER: &str = "Pracht";
pub const DEVICE_NAME: &str = "Pracht Alpha";

/// Per-side keys that get their own wording on single-side units
const MONO_TRANSLATION_KEYS: &[&str] = &[
    "power_car1",
    "current_car1",
    "status_car1",
    "energy_car1",
    "car1_connected",
    "car1_charging",
    "max_current_car1",
    "lock_side1",
];

pub fn translation_key(key: &str, is_mono: bool) -> String {
    if is_mono && MONO_TRANSLATION_KEYS.contains(&key) {
        format!("{}_mono", key)
    } else {
        key.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// Device id reported by the unit
    pub identifier: String,
    pub manufacturer: &'static str,
    pub model: &'static str,
    pub name: &'static str,
    pub sw_version: String,
    pub hw_version: String,
    pub configuration_url: String,
}

impl DeviceInfo {
    pub fn from_data(data: &AllData, host: &str) -> Self {
        Self {
            identifier: data.device_id.clone(),
            manufacturer: MANUFACTURER,
            model: if data.is_duo() { "Alpha DUO" } else { "Alpha MONO" },
            name: DEVICE_NAME,
            sw_version: data.software_version.clone(),
            hw_version: format!("M{} R{}", data.sw_version_main_pcb, data.sw_version_modbus_rfid),
            configuration_url: base_url_for(host),
        }
    }

    pub fn unique_id(&self, key: &str) -> String {
        format!("{}_{}", self.identifier, key)
    }
}
