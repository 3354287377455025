//! Typed records parsed from the wallbox JSON endpoints.
//!
//! The device omits fields freely depending on firmware, so every field has a
//! per-field default instead of failing the whole parse.

use serde::Serialize;
use serde_json::{Map, Value};

/// Literal the device reports for a locked side
pub const LOCKED: &str = "Locked";
/// Default lock state when `LockStatusN` is absent
pub const UNLOCKED: &str = "Unlocked";
/// Default timer/power state when absent
pub const STOPPED: &str = "Stopped";

/// One of the (up to two) charging points of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Side {
    First,
    Second,
}

impl Side {
    /// Zero-based index used on the wire
    pub fn index(self) -> u8 {
        match self {
            Side::First => 0,
            Side::Second => 1,
        }
    }

    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Side::First),
            1 => Some(Side::Second),
            _ => None,
        }
    }
}

/// Snapshot of `GET /api/v1/all`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllData {
    pub device_id: String,
    pub software_version: String,
    pub hardware_revision: i64,
    pub system_initialized: bool,
    /// Derived: 2 for DUO units, 1 for MONO units
    pub num_charging_points: u8,
    pub error_code: i64,
    /// Milliseconds since boot
    pub uptime: u64,
    pub max_current_total: i64,
    pub max_current_car1: i64,
    pub max_current_car2: i64,
    pub max_current_per_side: i64,
    pub current_car1: f64,
    pub current_car2: f64,
    pub power_car1: f64,
    pub power_car2: f64,
    /// 0..=4, see `entities::sensor::CarStatus`
    pub status_car1: i64,
    pub status_car2: i64,
    pub current_meas_support: i64,
    pub support_lock_unlock: bool,
    pub led_support: bool,
    pub rfid_supported: bool,
    pub comm_pcb_temperature: f64,
    pub box_temperature: f64,
    pub current_setting_input_lead: i64,
    /// `None` when the firmware has no energy metering
    pub energy_car1: Option<f64>,
    pub energy_car2: Option<f64>,
    pub sw_version_main_pcb: i64,
    pub sw_version_modbus_rfid: i64,
}

/// Snapshot of `GET /api/v1/lock_status`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LockStatus {
    pub lock_status1: String,
    pub lock_status2: String,
    pub timer_status1: String,
    pub timer_remaining_time1: i64,
    pub timer_status2: String,
    pub timer_remaining_time2: i64,
    pub power_status1: String,
    pub timer_remaining_power1: f64,
    pub power_status2: String,
    pub timer_remaining_power2: f64,
}

pub(crate) fn int_field(data: &Map<String, Value>, key: &str, default: i64) -> i64 {
    match data.get(key) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|v| v.min(i64::MAX as u64) as i64))
            .or_else(|| n.as_f64().map(|v| v as i64))
            .unwrap_or(default),
        Some(Value::Bool(b)) => i64::from(*b),
        _ => default,
    }
}

fn float_field(data: &Map<String, Value>, key: &str) -> f64 {
    optional_float_field(data, key).unwrap_or(0.0)
}

fn optional_float_field(data: &Map<String, Value>, key: &str) -> Option<f64> {
    match data.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        _ => None,
    }
}

/// Device flags are integers where exactly `1` means enabled
fn flag_field(data: &Map<String, Value>, key: &str) -> bool {
    match data.get(key) {
        Some(Value::Number(n)) => n.as_f64() == Some(1.0),
        Some(Value::Bool(b)) => *b,
        _ => false,
    }
}

fn string_field(data: &Map<String, Value>, key: &str, default: &str) -> String {
    match data.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => default.to_string(),
    }
}

/// Raw `NumChargingPoints` is inverted on the device: 0 means a DUO unit
fn charging_points_from_raw(raw: i64) -> u8 {
    if raw == 0 { 2 } else { 1 }
}

impl AllData {
    pub fn from_json(data: &Map<String, Value>) -> Self {
        Self {
            device_id: string_field(data, "DeviceId", ""),
            software_version: string_field(data, "SoftwareVersion", ""),
            hardware_revision: int_field(data, "HardwareRevision", 0),
            system_initialized: flag_field(data, "SystemInitialized"),
            num_charging_points: charging_points_from_raw(int_field(
                data,
                "NumChargingPoints",
                1,
            )),
            error_code: int_field(data, "ErrorCode", 0),
            uptime: int_field(data, "Uptime", 0).max(0) as u64,
            max_current_total: int_field(data, "MaxCurrentTotal", 0),
            max_current_car1: int_field(data, "MaxCurrentCar1", 0),
            max_current_car2: int_field(data, "MaxCurrentCar2", 0),
            max_current_per_side: int_field(data, "MaxCurrentPerSide", 0),
            current_car1: float_field(data, "CurrentCar1"),
            current_car2: float_field(data, "CurrentCar2"),
            power_car1: float_field(data, "PowerCar1"),
            power_car2: float_field(data, "PowerCar2"),
            status_car1: int_field(data, "StatusCar1", 0),
            status_car2: int_field(data, "StatusCar2", 0),
            current_meas_support: int_field(data, "CurrentMeasSupport", 0),
            support_lock_unlock: flag_field(data, "SupportLockUnlock"),
            led_support: flag_field(data, "LedSupport"),
            rfid_supported: flag_field(data, "RfidSupported"),
            comm_pcb_temperature: float_field(data, "CommPcbTemperature"),
            box_temperature: float_field(data, "BoxTemperature"),
            current_setting_input_lead: int_field(data, "CurrentSettingInputLead", 0),
            energy_car1: optional_float_field(data, "EnergyCar1"),
            energy_car2: optional_float_field(data, "EnergyCar2"),
            sw_version_main_pcb: int_field(data, "SwVersionMainPcb", 0),
            sw_version_modbus_rfid: int_field(data, "SwVersionModbusRfidModule", 0),
        }
    }

    pub fn is_duo(&self) -> bool {
        self.num_charging_points == 2
    }
}

impl Default for AllData {
    /// What an empty `{}` response parses to
    fn default() -> Self {
        Self::from_json(&Map::new())
    }
}

impl LockStatus {
    pub fn from_json(data: &Map<String, Value>) -> Self {
        Self {
            lock_status1: string_field(data, "LockStatus1", UNLOCKED),
            lock_status2: string_field(data, "LockStatus2", UNLOCKED),
            timer_status1: string_field(data, "TimerStatus1", STOPPED),
            timer_remaining_time1: int_field(data, "TimerRemainingTime1", 0),
            timer_status2: string_field(data, "TimerStatus2", STOPPED),
            timer_remaining_time2: int_field(data, "TimerRemainingTime2", 0),
            power_status1: string_field(data, "PowerStatus1", STOPPED),
            timer_remaining_power1: float_field(data, "TimerRemainingPower1"),
            power_status2: string_field(data, "PowerStatus2", STOPPED),
            timer_remaining_power2: float_field(data, "TimerRemainingPower2"),
        }
    }

    pub fn lock_status(&self, side: Side) -> &str {
        match side {
            Side::First => &self.lock_status1,
            Side::Second => &self.lock_status2,
        }
    }

    pub fn is_locked(&self, side: Side) -> bool {
        self.lock_status(side) == LOCKED
    }
}

impl Default for LockStatus {
    fn default() -> Self {
        Self::from_json(&Map::new())
    }
}
