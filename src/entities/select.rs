use crate::error::{PrachtError, Result};
use crate::logging::get_logger;
use crate::wallbox::WallboxApi;
use serde::Serialize;
use std::sync::{Mutex, PoisonError};

pub const LED_MODE_KEY: &str = "led_mode";

/// Status LED behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LedMode {
    /// Always lit
    On = 0,

    /// Lit only while something needs attention
    OnIfRequired = 1,

    /// Never lit
    Off = 2,
}

impl LedMode {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(LedMode::On),
            1 => Some(LedMode::OnIfRequired),
            2 => Some(LedMode::Off),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        self as i64
    }

    pub fn label(self) -> &'static str {
        match self {
            LedMode::On => "on",
            LedMode::OnIfRequired => "on_if_required",
            LedMode::Off => "off",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "on" => Some(LedMode::On),
            "on_if_required" => Some(LedMode::OnIfRequired),
            "off" => Some(LedMode::Off),
            _ => None,
        }
    }

    pub fn labels() -> [&'static str; 3] {
        ["on", "on_if_required", "off"]
    }
}

/// LED mode select
///
/// The mode is not part of the polled telemetry, so the select keeps the last
/// value it read or wrote.
#[derive(Debug)]
pub struct LedModeSelect {
    current: Mutex<LedMode>,
}

impl LedModeSelect {
    pub fn new(current: LedMode) -> Self {
        Self {
            current: Mutex::new(current),
        }
    }

    /// Read the initial mode; any failure or unknown code reads as `on`
    pub async fn load(api: &dyn WallboxApi) -> Self {
        let current = match api.get_led_mode().await {
            Ok(code) => LedMode::from_code(code).unwrap_or(LedMode::On),
            Err(e) => {
                get_logger("entities").debug(&format!("Failed to read LED mode: {}", e));
                LedMode::On
            }
        };
        Self::new(current)
    }

    pub fn current_option(&self) -> LedMode {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn select_option(&self, option: &str, api: &dyn WallboxApi) -> Result<()> {
        let mode = LedMode::from_label(option).ok_or_else(|| {
            PrachtError::validation(LED_MODE_KEY, format!("Unknown LED mode '{}'", option))
        })?;
        api.set_led_mode(mode.code()).await?;
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = mode;
        Ok(())
    }
}
