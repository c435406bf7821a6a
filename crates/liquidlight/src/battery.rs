//! One-shot battery query
//!
//! Reads the Linux power-supply class; every other platform, and every
//! machine without a battery, reports `None`.

use liquidlight_core::BatteryStatus;
use std::fs;
use std::path::Path;

const POWER_SUPPLY_DIR: &str = "/sys/class/power_supply";

/// Battery state of this machine, if it has one
pub fn query() -> Option<BatteryStatus> {
    query_in(Path::new(POWER_SUPPLY_DIR))
}

fn query_in(root: &Path) -> Option<BatteryStatus> {
    let mut supplies: Vec<_> = fs::read_dir(root).ok()?.flatten().map(|e| e.path()).collect();
    supplies.sort();

    supplies.into_iter().find_map(|supply| {
        let kind = fs::read_to_string(supply.join("type")).ok()?;
        if kind.trim() != "Battery" {
            return None;
        }
        let capacity: f32 = fs::read_to_string(supply.join("capacity"))
            .ok()?
            .trim()
            .parse()
            .ok()?;
        let status = fs::read_to_string(supply.join("status")).unwrap_or_default();
        Some(BatteryStatus {
            level: (capacity / 100.0).clamp(0.0, 1.0),
            charging: matches!(status.trim(), "Charging" | "Full"),
        })
    })
}
