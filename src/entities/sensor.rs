use crate::coordinator::CoordinatorData;
use crate::entities::EntityCategory;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::Serialize;

/// Raw box temperature reported by units without the sensor
pub const BOX_TEMPERATURE_ABSENT: f64 = 255.0;

/// Vehicle state of one charging side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CarStatus {
    /// No vehicle plugged in
    Disconnected = 0,

    /// Vehicle plugged in, not charging
    Connected = 1,

    /// Charging
    Charging = 2,

    /// Charging with ventilation requested
    ChargingWithCooling = 3,

    /// Side in error
    Error = 4,
}

impl CarStatus {
    /// Unknown codes read as disconnected
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => CarStatus::Connected,
            2 => CarStatus::Charging,
            3 => CarStatus::ChargingWithCooling,
            4 => CarStatus::Error,
            _ => CarStatus::Disconnected,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CarStatus::Disconnected => "disconnected",
            CarStatus::Connected => "connected",
            CarStatus::Charging => "charging",
            CarStatus::ChargingWithCooling => "charging_with_cooling",
            CarStatus::Error => "error",
        }
    }
}

pub const CAR_STATUS_OPTIONS: &[&str] = &[
    "disconnected",
    "connected",
    "charging",
    "charging_with_cooling",
    "error",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SensorValue {
    Number(f64),
    Text(&'static str),
    Timestamp(DateTime<Utc>),
}

impl SensorValue {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            SensorValue::Number(v) => serde_json::json!(v),
            SensorValue::Text(v) => serde_json::json!(v),
            SensorValue::Timestamp(v) => serde_json::json!(v.to_rfc3339()),
        }
    }
}

#[derive(Debug)]
pub struct SensorDescription {
    pub key: &'static str,
    pub device_class: Option<&'static str>,
    pub unit: Option<&'static str>,
    pub category: Option<EntityCategory>,
    /// Suggested display precision
    pub precision: Option<u8>,
    pub options: Option<&'static [&'static str]>,
    pub enabled_by_default: bool,
    pub has_fn: fn(&CoordinatorData) -> bool,
    pub value_fn: fn(&CoordinatorData) -> Option<SensorValue>,
}

fn always(_: &CoordinatorData) -> bool {
    true
}

fn is_duo(x: &CoordinatorData) -> bool {
    x.all_data.is_duo()
}

fn measures_current(x: &CoordinatorData) -> bool {
    x.all_data.current_meas_support > 0
}

/// Boot time derived from the uptime counter, to the second
pub fn boot_time(x: &CoordinatorData) -> Option<DateTime<Utc>> {
    let uptime = i64::try_from(x.all_data.uptime).ok()?;
    x.fetched_at
        .trunc_subsecs(0)
        .checked_sub_signed(Duration::try_milliseconds(uptime)?)
}

pub static SENSORS: &[SensorDescription] = &[
    SensorDescription {
        key: "power_car1",
        device_class: Some("power"),
        unit: Some("W"),
        category: None,
        precision: Some(0),
        options: None,
        enabled_by_default: true,
        has_fn: measures_current,
        value_fn: |x| Some(SensorValue::Number(x.all_data.power_car1)),
    },
    SensorDescription {
        key: "power_car2",
        device_class: Some("power"),
        unit: Some("W"),
        category: None,
        precision: Some(0),
        options: None,
        enabled_by_default: true,
        has_fn: |x| is_duo(x) && measures_current(x),
        value_fn: |x| Some(SensorValue::Number(x.all_data.power_car2)),
    },
    SensorDescription {
        key: "current_car1",
        device_class: Some("current"),
        unit: Some("A"),
        category: Some(EntityCategory::Diagnostic),
        precision: None,
        options: None,
        enabled_by_default: true,
        has_fn: always,
        value_fn: |x| Some(SensorValue::Number(x.all_data.current_car1)),
    },
    SensorDescription {
        key: "current_car2",
        device_class: Some("current"),
        unit: Some("A"),
        category: Some(EntityCategory::Diagnostic),
        precision: None,
        options: None,
        enabled_by_default: true,
        has_fn: is_duo,
        value_fn: |x| Some(SensorValue::Number(x.all_data.current_car2)),
    },
    SensorDescription {
        key: "status_car1",
        device_class: Some("enum"),
        unit: None,
        category: None,
        precision: None,
        options: Some(CAR_STATUS_OPTIONS),
        enabled_by_default: true,
        has_fn: always,
        value_fn: |x| Some(SensorValue::Text(CarStatus::from_code(x.all_data.status_car1).label())),
    },
    SensorDescription {
        key: "status_car2",
        device_class: Some("enum"),
        unit: None,
        category: None,
        precision: None,
        options: Some(CAR_STATUS_OPTIONS),
        enabled_by_default: true,
        has_fn: is_duo,
        value_fn: |x| Some(SensorValue::Text(CarStatus::from_code(x.all_data.status_car2).label())),
    },
    SensorDescription {
        key: "comm_pcb_temperature",
        device_class: Some("temperature"),
        unit: Some("°C"),
        category: Some(EntityCategory::Diagnostic),
        precision: Some(1),
        options: None,
        enabled_by_default: true,
        has_fn: always,
        value_fn: |x| Some(SensorValue::Number(x.all_data.comm_pcb_temperature)),
    },
    SensorDescription {
        key: "box_temperature",
        device_class: Some("temperature"),
        unit: Some("°C"),
        category: Some(EntityCategory::Diagnostic),
        precision: Some(0),
        options: None,
        enabled_by_default: true,
        has_fn: |x| x.all_data.box_temperature != BOX_TEMPERATURE_ABSENT,
        value_fn: |x| Some(SensorValue::Number(x.all_data.box_temperature)),
    },
    SensorDescription {
        key: "uptime",
        device_class: Some("timestamp"),
        unit: None,
        category: Some(EntityCategory::Diagnostic),
        precision: None,
        options: None,
        enabled_by_default: false,
        has_fn: always,
        value_fn: |x| boot_time(x).map(SensorValue::Timestamp),
    },
    SensorDescription {
        key: "energy_car1",
        device_class: Some("energy"),
        unit: Some("kWh"),
        category: None,
        precision: Some(2),
        options: None,
        enabled_by_default: true,
        has_fn: |x| x.all_data.energy_car1.is_some(),
        value_fn: |x| x.all_data.energy_car1.map(SensorValue::Number),
    },
    SensorDescription {
        key: "energy_car2",
        device_class: Some("energy"),
        unit: Some("kWh"),
        category: None,
        precision: Some(2),
        options: None,
        enabled_by_default: true,
        has_fn: |x| is_duo(x) && x.all_data.energy_car2.is_some(),
        value_fn: |x| x.all_data.energy_car2.map(SensorValue::Number),
    },
];
