#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Only structured objects reach the parsers; everything else is rejected earlier
    let Ok(serde_json::Value::Object(map)) = serde_json::from_slice::<serde_json::Value>(data)
    else {
        return;
    };

    let all = pracht_alpha::wallbox::AllData::from_json(&map);
    assert!(all.num_charging_points == 1 || all.num_charging_points == 2);

    let lock = pracht_alpha::wallbox::LockStatus::from_json(&map);
    let _ = lock.is_locked(pracht_alpha::wallbox::Side::First);
});
