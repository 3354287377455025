use crate::coordinator::CoordinatorData;
use crate::error::Result;
use crate::wallbox::{Side, WallboxApi};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// How long a commanded lock state is shown before the device is trusted again
pub const LOCK_COOLDOWN: Duration = Duration::from_secs(20);

#[derive(Debug)]
pub struct SwitchDescription {
    pub key: &'static str,
    pub side: Side,
    pub has_fn: fn(&CoordinatorData) -> bool,
}

impl SwitchDescription {
    /// Unknown lock status reads as off
    pub fn is_on(&self, data: &CoordinatorData) -> bool {
        data.lock_status
            .as_ref()
            .is_some_and(|l| l.is_locked(self.side))
    }
}

pub static LOCK_SWITCHES: &[SwitchDescription] = &[
    SwitchDescription {
        key: "lock_side1",
        side: Side::First,
        has_fn: |x| x.all_data.support_lock_unlock,
    },
    SwitchDescription {
        key: "lock_side2",
        side: Side::Second,
        has_fn: |x| x.all_data.support_lock_unlock && x.all_data.is_duo(),
    },
];

/// Lock switch for one side
///
/// After a command the switch reports the commanded state until
/// [`LOCK_COOLDOWN`] has passed, since the device takes a while to report the
/// new lock state.
#[derive(Debug)]
pub struct LockSwitch {
    description: &'static SwitchDescription,
    assumed: Mutex<Option<(bool, Instant)>>,
}

impl LockSwitch {
    pub fn new(description: &'static SwitchDescription) -> Self {
        Self {
            description,
            assumed: Mutex::new(None),
        }
    }

    pub fn description(&self) -> &'static SwitchDescription {
        self.description
    }

    pub fn is_on(&self, data: &CoordinatorData) -> bool {
        self.is_on_at(data, Instant::now())
    }

    pub fn is_on_at(&self, data: &CoordinatorData, now: Instant) -> bool {
        let mut assumed = self.assumed.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((state, until)) = *assumed {
            if now < until {
                return state;
            }
            *assumed = None;
        }
        self.description.is_on(data)
    }

    /// The assumed state is recorded once the device accepted the command
    pub async fn turn_on(&self, api: &dyn WallboxApi, now: Instant) -> Result<()> {
        api.lock(self.description.side).await?;
        self.assume(true, now);
        Ok(())
    }

    pub async fn turn_off(&self, api: &dyn WallboxApi, now: Instant) -> Result<()> {
        api.unlock(self.description.side).await?;
        self.assume(false, now);
        Ok(())
    }

    fn assume(&self, state: bool, now: Instant) {
        *self.assumed.lock().unwrap_or_else(PoisonError::into_inner) =
            Some((state, now + LOCK_COOLDOWN));
    }
}
