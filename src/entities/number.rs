use crate::coordinator::{Coordinator, CoordinatorData};
use crate::error::{PrachtError, Result};
use crate::logging::get_logger;

/// Lowest current limit the device accepts, in amperes
pub const MIN_CURRENT: i64 = 6;
pub const STEP: i64 = 1;
pub const UNIT: &str = "A";

/// Which of the three limits a number entity controls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrentLimit {
    Total,
    Car1,
    Car2,
}

#[derive(Debug)]
pub struct NumberDescription {
    pub key: &'static str,
    pub limit: CurrentLimit,
    pub has_fn: fn(&CoordinatorData) -> bool,
    pub value_fn: fn(&CoordinatorData) -> i64,
    pub max_value_fn: fn(&CoordinatorData) -> i64,
}

pub static NUMBERS: &[NumberDescription] = &[
    NumberDescription {
        key: "max_current_total",
        limit: CurrentLimit::Total,
        has_fn: |_| true,
        value_fn: |x| x.all_data.max_current_total,
        max_value_fn: |x| x.all_data.current_setting_input_lead,
    },
    NumberDescription {
        key: "max_current_car1",
        limit: CurrentLimit::Car1,
        has_fn: |_| true,
        value_fn: |x| x.all_data.max_current_car1,
        max_value_fn: |x| x.all_data.max_current_per_side,
    },
    NumberDescription {
        key: "max_current_car2",
        limit: CurrentLimit::Car2,
        has_fn: |x| x.all_data.is_duo(),
        value_fn: |x| x.all_data.max_current_car2,
        max_value_fn: |x| x.all_data.max_current_per_side,
    },
];

impl NumberDescription {
    /// The three limits to send when this entity is set to `value`
    ///
    /// The device only accepts all three together, so the other two are
    /// taken from the latest snapshot.
    pub fn limits_with(&self, value: i64, data: &CoordinatorData) -> (i64, i64, i64) {
        let d = &data.all_data;
        let (mut total, mut car1, mut car2) =
            (d.max_current_total, d.max_current_car1, d.max_current_car2);
        match self.limit {
            CurrentLimit::Total => total = value,
            CurrentLimit::Car1 => car1 = value,
            CurrentLimit::Car2 => car2 = value,
        }
        (total, car1, car2)
    }

    pub fn validate(&self, value: f64, max: i64) -> Result<i64> {
        if !value.is_finite() || value.fract() != 0.0 {
            return Err(PrachtError::validation(
                self.key,
                format!("{} is not a whole number of amperes", value),
            ));
        }
        let amps = value as i64;
        if amps < MIN_CURRENT || amps > max {
            return Err(PrachtError::validation(
                self.key,
                format!("{} A is outside {}..={} A", amps, MIN_CURRENT, max),
            ));
        }
        Ok(amps)
    }

    /// Send the new limit and ask for a refresh so the change shows up
    pub async fn set_value(
        &self,
        value: f64,
        max: i64,
        data: &CoordinatorData,
        coordinator: &Coordinator,
    ) -> Result<()> {
        let amps = self.validate(value, max)?;
        let (total, car1, car2) = self.limits_with(amps, data);
        get_logger("entities").info(&format!(
            "Setting {} to {} A (total={}, car1={}, car2={})",
            self.key, amps, total, car1, car2
        ));
        coordinator.api().set_power(total, car1, car2).await?;
        coordinator.request_refresh();
        Ok(())
    }
}
