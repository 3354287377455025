use crate::coordinator::CoordinatorData;

#[derive(Debug)]
pub struct BinarySensorDescription {
    pub key: &'static str,
    pub device_class: &'static str,
    pub has_fn: fn(&CoordinatorData) -> bool,
    pub is_on_fn: fn(&CoordinatorData) -> bool,
}

pub static BINARY_SENSORS: &[BinarySensorDescription] = &[
    BinarySensorDescription {
        key: "car1_connected",
        device_class: "plug",
        has_fn: |_| true,
        is_on_fn: |x| x.all_data.status_car1 >= 1,
    },
    BinarySensorDescription {
        key: "car2_connected",
        device_class: "plug",
        has_fn: |x| x.all_data.is_duo(),
        is_on_fn: |x| x.all_data.status_car2 >= 1,
    },
    BinarySensorDescription {
        key: "car1_charging",
        device_class: "battery_charging",
        has_fn: |_| true,
        is_on_fn: |x| x.all_data.status_car1 >= 2,
    },
    BinarySensorDescription {
        key: "car2_charging",
        device_class: "battery_charging",
        has_fn: |x| x.all_data.is_duo(),
        is_on_fn: |x| x.all_data.status_car2 >= 2,
    },
];
