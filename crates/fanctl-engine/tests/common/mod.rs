//! Shared backend fixtures.

#![allow(dead_code)]

use std::sync::Arc;

use fanctl_engine::backend::{BackendState, InMemoryBackend, ServiceState};
use fanctl_types::{interfaces, ManagedObject, PropertyMap, PropertyValue};

pub const ENTITY_MANAGER: &str = "xyz.openbmc_project.EntityManager";
pub const SETTINGS: &str = "xyz.openbmc_project.Settings";
pub const INVENTORY: &str = "/xyz/openbmc_project/inventory";
pub const CHASSIS: &str = "/xyz/openbmc_project/inventory/system/chassis/chassis0";
pub const THERMAL_MODE_PATH: &str = "/xyz/openbmc_project/control/thermal/0";
pub const FAN_ROOT: &str = "/redfish/v1/Managers/bmc/Oem/OpenBmc/Fan";

pub fn props(pairs: &[(&str, PropertyValue)]) -> PropertyMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

pub fn strings(items: &[&str]) -> PropertyValue {
    PropertyValue::StrList(items.iter().map(|s| s.to_string()).collect())
}

pub fn zone_link(zone: &str) -> serde_json::Value {
    serde_json::json!({ "@odata.id": format!("{}/FanZones/{}", FAN_ROOT, zone) })
}

pub fn chassis() -> ManagedObject {
    ManagedObject::new(CHASSIS).with_interface(
        "xyz.openbmc_project.Inventory.Item.Chassis",
        PropertyMap::new(),
    )
}

pub fn left_zone() -> ManagedObject {
    ManagedObject::new(format!("{}/Left", CHASSIS)).with_interface(
        interfaces::PID_ZONE,
        props(&[
            ("Name", "Left".into()),
            ("Type", "Pid.Zone".into()),
            ("FailSafePercent", 100.0.into()),
            ("MinThermalOutput", 30.0.into()),
        ]),
    )
}

pub fn cpu_pid() -> ManagedObject {
    ManagedObject::new(format!("{}/CPU_Temp", CHASSIS)).with_interface(
        interfaces::PID,
        props(&[
            ("Name", "CPU Temp".into()),
            ("Class", "temp".into()),
            ("Type", "Pid".into()),
            ("Inputs", strings(&["CPU Core"])),
            ("Zones", strings(&["Left"])),
            ("Profiles", strings(&["Default"])),
            ("SetPoint", 70.0.into()),
            ("PCoefficient", 0.1.into()),
            ("SetPointOffset", "WarningHigh".into()),
        ]),
    )
}

pub fn fan_pid() -> ManagedObject {
    ManagedObject::new(format!("{}/Fan_0", CHASSIS)).with_interface(
        interfaces::PID,
        props(&[
            ("Name", "Fan 0".into()),
            ("Class", "fan".into()),
            ("Type", "Pid".into()),
            ("Inputs", strings(&["Fan 0 Tach"])),
            ("Outputs", strings(&["Pwm 0"])),
            ("Zones", strings(&["Left"])),
            ("Profiles", strings(&["Default"])),
            ("OutLimitMax", 100.0.into()),
            ("OutLimitMin", 20.0.into()),
        ]),
    )
}

pub fn curve() -> ManagedObject {
    ManagedObject::new(format!("{}/Curve", CHASSIS)).with_interface(
        interfaces::STEPWISE,
        props(&[
            ("Name", "Curve".into()),
            ("Class", "Ceiling".into()),
            ("Type", "Stepwise".into()),
            ("Inputs", strings(&["Inlet Temp"])),
            ("Zones", strings(&["Left"])),
            ("Profiles", strings(&["Default"])),
            ("Reading", vec![20.0, 40.0].into()),
            ("Output", vec![30.0, 90.0].into()),
            ("PositiveHysteresis", 1.0.into()),
            ("NegativeHysteresis", 2.0.into()),
        ]),
    )
}

pub fn thermal_mode(current: &str, supported: &[&str]) -> ServiceState {
    ServiceState::new(SETTINGS).with_object(ManagedObject::new(THERMAL_MODE_PATH).with_interface(
        interfaces::THERMAL_MODE,
        props(&[("Current", current.into()), ("Supported", strings(supported))]),
    ))
}

/// Chassis with one zone and no profile object.
pub fn bare_backend() -> Arc<InMemoryBackend> {
    Arc::new(InMemoryBackend::from_state(BackendState {
        services: vec![ServiceState::new(ENTITY_MANAGER)
            .with_object_manager(INVENTORY)
            .with_object(chassis())
            .with_object(left_zone())],
    }))
}

/// A populated system with profiles `Default` (active) and `Quiet`.
pub fn full_backend() -> Arc<InMemoryBackend> {
    Arc::new(InMemoryBackend::from_state(full_state()))
}

pub fn full_state() -> BackendState {
    BackendState {
        services: vec![
            ServiceState::new(ENTITY_MANAGER)
                .with_object_manager(INVENTORY)
                .with_object(chassis())
                .with_object(left_zone())
                .with_object(cpu_pid())
                .with_object(fan_pid())
                .with_object(curve()),
            thermal_mode("Default", &["Default", "Quiet"]),
        ],
    }
}
