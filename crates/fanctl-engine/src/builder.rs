//! Translation of client controller fields into backend property bags.
//!
//! [`build_properties`] is a pure function: it reads the snapshot but never
//! talks to the backend. The reconciler turns its [`BuildOutcome`] into
//! calls.

use fanctl_types::{
    object::path_segment, to_display_name, to_identifier, ControllerKind, ManagedObject,
    PropertyMap, PropertyValue,
};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{EngineError, Result};

/// Chassis name position in an inventory path:
/// `/xyz/openbmc_project/inventory/system/chassis/<chassis>`.
pub const INVENTORY_CHASSIS_SEGMENT: usize = 5;

/// Chassis name position in `/redfish/v1/Chassis/<chassis>`.
pub const CHASSIS_URI_SEGMENT: usize = 3;

/// Zone name position in
/// `/redfish/v1/Managers/<id>/Oem/OpenBmc/Fan/FanZones/<zone>`.
pub const ZONE_URI_SEGMENT: usize = 8;

/// Backend `SetPointOffset` values and their client names.
pub const SET_POINT_OFFSETS: [(&str, &str); 4] = [
    ("WarningLow", "UpperThresholdNonCritical"),
    ("WarningHigh", "LowerThresholdNonCritical"),
    ("CriticalLow", "LowerThresholdCritical"),
    ("CriticalHigh", "UpperThresholdCritical"),
];

/// Coefficients copied verbatim between client and backend for PID kinds.
pub const PID_DOUBLES: [&str; 13] = [
    "FFGainCoefficient",
    "FFOffCoefficient",
    "ICoefficient",
    "ILimitMax",
    "ILimitMin",
    "OutLimitMax",
    "OutLimitMin",
    "PCoefficient",
    "SetPoint",
    "SlewNeg",
    "SlewPos",
    "PositiveHysteresis",
    "NegativeHysteresis",
];

const STEPWISE_DIRECTIONS: [&str; 2] = ["Ceiling", "Floor"];

const ODATA_ID: &str = "@odata.id";

/// Client names of backend `SetPointOffset` values.
pub fn offset_to_client(backend: &str) -> Option<&'static str> {
    SET_POINT_OFFSETS
        .iter()
        .find(|(b, _)| *b == backend)
        .map(|(_, client)| *client)
}

/// Backend names of client `SetPointOffset` values.
pub fn offset_to_backend(client: &str) -> Option<&'static str> {
    SET_POINT_OFFSETS
        .iter()
        .find(|(_, c)| *c == client)
        .map(|(backend, _)| *backend)
}

/// Everything the builder needs for one patch entry.
#[derive(Debug, Clone, Copy)]
pub struct BuildRequest<'a> {
    pub kind: ControllerKind,
    /// Client identifier of the controller.
    pub name: &'a str,
    pub value: &'a Value,
    /// First snapshot object whose basename is `name`.
    pub matched: Option<&'a ManagedObject>,
    pub snapshot: &'a [ManagedObject],
    /// True if the entry creates a new configuration record.
    pub create: bool,
    /// Active profile, empty when none.
    pub profile: &'a str,
}

/// What the reconciler should do with one entry.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildOutcome {
    /// The entry is invalid. The pass stops here.
    Fail(EngineError),
    /// Delete the interface from the matched object.
    Delete { interface: &'static str },
    /// Write `properties`. `chassis` is the chassis name for creation.
    Patch {
        properties: PropertyMap,
        chassis: Option<String>,
    },
}

/// One stepwise curve point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub target: f64,
    pub output: f64,
}

/// Split steps into the parallel `Reading` and `Output` vectors the backend
/// stores.
pub fn unzip_steps(steps: &[Step]) -> (Vec<f64>, Vec<f64>) {
    steps.iter().map(|step| (step.target, step.output)).unzip()
}

/// Pair up backend `Reading` and `Output` vectors.
pub fn zip_steps(readings: &[f64], outputs: &[f64]) -> Option<Vec<Step>> {
    if readings.len() != outputs.len() {
        return None;
    }
    Some(
        readings
            .iter()
            .zip(outputs)
            .map(|(&target, &output)| Step { target, output })
            .collect(),
    )
}

/// Find the chassis owning `name`: the first snapshot object whose path ends
/// with `/<name>`, provided that path reaches the chassis segment.
pub fn find_chassis<'a>(
    snapshot: &'a [ManagedObject],
    name: &str,
) -> Option<(&'a ManagedObject, String)> {
    let identifier = to_identifier(name);
    let object = snapshot
        .iter()
        .find(|object| object.path.ends_with_segment(&identifier))?;
    let chassis = object.path.segment(INVENTORY_CHASSIS_SEGMENT)?;
    debug!(path = %object.path, chassis, "Matched chassis");
    Some((object, chassis.to_string()))
}

/// Translate one patch entry.
pub fn build_properties(request: &BuildRequest<'_>) -> BuildOutcome {
    if request.value.is_null() {
        return BuildOutcome::Delete {
            interface: request.kind.interface(),
        };
    }

    let mut properties = PropertyMap::new();
    properties.insert(
        "Name".to_string(),
        PropertyValue::Str(to_display_name(request.name)),
    );

    match Builder::new(request, properties).run() {
        Ok((properties, chassis)) => BuildOutcome::Patch {
            properties,
            chassis: chassis.filter(|c| !c.is_empty()),
        },
        Err(err) => {
            debug!(kind = %request.kind, name = request.name, error = %err, "Rejected patch entry");
            BuildOutcome::Fail(err)
        }
    }
}

struct Builder<'r, 'a> {
    request: &'r BuildRequest<'a>,
    properties: PropertyMap,
    chassis: Option<String>,
}

impl<'r, 'a> Builder<'r, 'a> {
    fn new(request: &'r BuildRequest<'a>, properties: PropertyMap) -> Self {
        Self {
            request,
            properties,
            chassis: None,
        }
    }

    fn run(mut self) -> Result<(PropertyMap, Option<String>)> {
        let fields = self
            .request
            .value
            .as_object()
            .ok_or_else(|| EngineError::value_type(self.request.name, self.request.value))?;

        if !self.request.create {
            let matched = self
                .request
                .matched
                .and_then(|object| object.path.segment(INVENTORY_CHASSIS_SEGMENT))
                .ok_or_else(|| EngineError::InvalidObject(self.request.name.to_string()))?;
            self.chassis = Some(matched.to_string());
        }

        if self.request.kind.is_profiled() && !self.request.profile.is_empty() {
            self.merge_profile()?;
        }

        match self.request.kind {
            ControllerKind::PidTemperature | ControllerKind::PidFan => self.pid(fields)?,
            ControllerKind::Zone => self.zone(fields)?,
            ControllerKind::Stepwise => self.stepwise(fields)?,
        }

        Ok((self.properties, self.chassis))
    }

    fn merge_profile(&mut self) -> Result<()> {
        let profile = self.request.profile;

        let matched = match (self.request.create, self.request.matched) {
            (false, Some(matched)) => matched,
            _ => {
                self.put("Profiles", vec![profile.to_string()]);
                return Ok(());
            }
        };

        let interface = self.request.kind.interface();
        let current = matched.interface(interface).ok_or_else(|| {
            EngineError::internal(format!("{} lacks {}", matched.path, interface))
        })?;

        if let Some(existing) = current.get("Profiles") {
            let existing = existing.as_str_list().ok_or_else(|| {
                EngineError::internal(format!("illegal Profiles on {}", matched.path))
            })?;
            if !existing.iter().any(|p| p == profile) {
                let mut union = existing.to_vec();
                union.push(profile.to_string());
                self.put("Profiles", union);
            }
        }
        Ok(())
    }

    fn pid(&mut self, fields: &Map<String, Value>) -> Result<()> {
        if self.request.create {
            if let Some(class) = self.request.kind.pid_class() {
                self.put("Class", class);
            }
            self.put("Type", "Pid");
        }

        for (field, value) in fields {
            match field.as_str() {
                "Inputs" | "Outputs" => {
                    let names = read_names(field, value)?;
                    self.put(field, names);
                }
                "Zones" => self.zones(value)?,
                "SetPointOffset" => {
                    let offset = read_str(field, value)?;
                    let backend = offset_to_backend(offset)
                        .ok_or_else(|| EngineError::InvalidObject(self.request.name.to_string()))?;
                    self.put(field, backend);
                }
                f if PID_DOUBLES.contains(&f) => {
                    let number = read_f64(field, value)?;
                    self.put(field, number);
                }
                f if is_read_only(f) => {}
                _ => return Err(EngineError::PropertyUnknown(field.clone())),
            }
        }
        Ok(())
    }

    fn zone(&mut self, fields: &Map<String, Value>) -> Result<()> {
        self.put("Type", "Pid.Zone");

        for (field, value) in fields {
            match field.as_str() {
                "Chassis" => {
                    let id = value
                        .get(ODATA_ID)
                        .and_then(Value::as_str)
                        .ok_or_else(|| EngineError::value_type(field, value))?;
                    let chassis = path_segment(id, CHASSIS_URI_SEGMENT)
                        .ok_or_else(|| EngineError::InvalidObject(id.to_string()))?;
                    self.chassis = Some(chassis.to_string());
                }
                "FailSafePercent" | "MinThermalOutput" => {
                    let number = read_f64(field, value)?;
                    self.put(field, number);
                }
                f if is_read_only(f) => {}
                _ => return Err(EngineError::PropertyUnknown(field.clone())),
            }
        }
        Ok(())
    }

    fn stepwise(&mut self, fields: &Map<String, Value>) -> Result<()> {
        self.put("Type", "Stepwise");

        for (field, value) in fields {
            match field.as_str() {
                "Zones" => self.zones(value)?,
                "Inputs" => {
                    let names = read_names(field, value)?;
                    self.put(field, names);
                }
                "Steps" => {
                    let steps = read_steps(value)?;
                    let (readings, outputs) = unzip_steps(&steps);
                    self.put("Reading", readings);
                    self.put("Output", outputs);
                }
                "PositiveHysteresis" | "NegativeHysteresis" => {
                    let number = read_f64(field, value)?;
                    self.put(field, number);
                }
                "Direction" => {
                    let direction = read_str(field, value)?;
                    if !STEPWISE_DIRECTIONS.contains(&direction) {
                        return Err(EngineError::value_type(field, direction));
                    }
                    self.put("Class", direction);
                }
                f if is_read_only(f) => {}
                _ => return Err(EngineError::PropertyUnknown(field.clone())),
            }
        }
        Ok(())
    }

    /// Parse zone links and derive the chassis from the first zone when it
    /// is not known yet.
    fn zones(&mut self, value: &Value) -> Result<()> {
        let links = value
            .as_array()
            .ok_or_else(|| EngineError::value_type("Zones", value))?;
        if links.is_empty() {
            return Err(EngineError::value_format("Zones", value));
        }

        let mut zones = Vec::with_capacity(links.len());
        for link in links {
            let zone = link
                .get(ODATA_ID)
                .and_then(Value::as_str)
                .and_then(|id| path_segment(id, ZONE_URI_SEGMENT))
                .ok_or_else(|| EngineError::value_format("Zones", link))?;
            zones.push(to_display_name(zone));
        }

        if self.chassis.as_deref().map_or(true, str::is_empty) {
            let (_, chassis) = find_chassis(self.request.snapshot, &zones[0])
                .ok_or_else(|| EngineError::InvalidObject(self.request.name.to_string()))?;
            self.chassis = Some(chassis);
        }

        self.put("Zones", zones);
        Ok(())
    }

    fn put(&mut self, property: &str, value: impl Into<PropertyValue>) {
        self.properties.insert(property.to_string(), value.into());
    }
}

fn is_read_only(field: &str) -> bool {
    field == "Name" || field.starts_with("@odata.")
}

fn read_f64(field: &str, value: &Value) -> Result<f64> {
    value
        .as_f64()
        .ok_or_else(|| EngineError::value_type(field, value))
}

fn read_str<'v>(field: &str, value: &'v Value) -> Result<&'v str> {
    value
        .as_str()
        .ok_or_else(|| EngineError::value_type(field, value))
}

/// String list with client identifiers turned back into backend names.
fn read_names(field: &str, value: &Value) -> Result<Vec<String>> {
    let items = value
        .as_array()
        .ok_or_else(|| EngineError::value_type(field, value))?;
    items
        .iter()
        .map(|item| read_str(field, item).map(to_display_name))
        .collect()
}

fn read_steps(value: &Value) -> Result<Vec<Step>> {
    let items = value
        .as_array()
        .ok_or_else(|| EngineError::value_type("Steps", value))?;

    items
        .iter()
        .map(|item| {
            let step = item
                .as_object()
                .ok_or_else(|| EngineError::value_type("Steps", item))?;
            if let Some(unknown) = step.keys().find(|k| *k != "Target" && *k != "Output") {
                return Err(EngineError::PropertyUnknown(unknown.clone()));
            }
            let target = step.get("Target").and_then(Value::as_f64);
            let output = step.get("Output").and_then(Value::as_f64);
            match (target, output) {
                (Some(target), Some(output)) => Ok(Step { target, output }),
                _ => Err(EngineError::value_type("Steps", item)),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fanctl_types::interfaces;
    use proptest::prelude::*;
    use serde_json::json;

    const CHASSIS: &str = "/xyz/openbmc_project/inventory/system/chassis/chassis0";

    fn props(pairs: &[(&str, PropertyValue)]) -> PropertyMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn snapshot() -> Vec<ManagedObject> {
        vec![
            ManagedObject::new(CHASSIS),
            ManagedObject::new(format!("{}/Left", CHASSIS)).with_interface(
                interfaces::PID_ZONE,
                props(&[("Name", "Left".into()), ("FailSafePercent", 100.0.into())]),
            ),
            ManagedObject::new(format!("{}/CPU_Temp", CHASSIS)).with_interface(
                interfaces::PID,
                props(&[
                    ("Name", "CPU Temp".into()),
                    ("Class", "temp".into()),
                    ("Profiles", vec!["Default".to_string()].into()),
                ]),
            ),
        ]
    }

    fn request<'a>(
        kind: ControllerKind,
        name: &'a str,
        value: &'a Value,
        snapshot: &'a [ManagedObject],
        profile: &'a str,
    ) -> BuildRequest<'a> {
        let matched = snapshot.iter().find(|o| o.path.ends_with_segment(name));
        let create = matched.map_or(true, |o| !o.has_interface(kind.interface()));
        BuildRequest {
            kind,
            name,
            value,
            matched,
            snapshot,
            create,
            profile,
        }
    }

    fn patch(outcome: BuildOutcome) -> (PropertyMap, Option<String>) {
        match outcome {
            BuildOutcome::Patch {
                properties,
                chassis,
            } => (properties, chassis),
            other => panic!("expected patch, got {:?}", other),
        }
    }

    fn failure(outcome: BuildOutcome) -> EngineError {
        match outcome {
            BuildOutcome::Fail(err) => err,
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_null_deletes_regardless_of_snapshot() {
        let value = Value::Null;
        let outcome = build_properties(&request(ControllerKind::Zone, "Nowhere", &value, &[], ""));
        assert_eq!(
            outcome,
            BuildOutcome::Delete {
                interface: interfaces::PID_ZONE
            }
        );
    }

    #[test]
    fn test_create_fan_controller() {
        let snapshot = snapshot();
        let value = json!({
            "Zones": [{"@odata.id": "/redfish/v1/Managers/bmc/Oem/OpenBmc/Fan/FanZones/Left"}],
            "FFGainCoefficient": 1.0,
            "Inputs": ["Fan_1_Tach"]
        });
        let (properties, chassis) = patch(build_properties(&request(
            ControllerKind::PidFan,
            "Fan_1",
            &value,
            &snapshot,
            "",
        )));

        assert_eq!(chassis.as_deref(), Some("chassis0"));
        assert_eq!(
            properties,
            props(&[
                ("Name", "Fan 1".into()),
                ("Class", "fan".into()),
                ("Type", "Pid".into()),
                ("Zones", vec!["Left".to_string()].into()),
                ("FFGainCoefficient", 1.0.into()),
                ("Inputs", vec!["Fan 1 Tach".to_string()].into()),
            ])
        );
    }

    #[test]
    fn test_create_sets_profile() {
        let snapshot = snapshot();
        let value = json!({"Zones": [{"@odata.id": "/redfish/v1/Managers/bmc/Oem/OpenBmc/Fan/FanZones/Left"}]});
        let (properties, _) = patch(build_properties(&request(
            ControllerKind::PidTemperature,
            "New",
            &value,
            &snapshot,
            "Quiet",
        )));
        assert_eq!(
            properties["Profiles"],
            PropertyValue::from(vec!["Quiet".to_string()])
        );
    }

    #[test]
    fn test_update_profile_union_is_idempotent() {
        let snapshot = snapshot();
        let value = json!({"SetPoint": 45.0});

        let (properties, chassis) = patch(build_properties(&request(
            ControllerKind::PidTemperature,
            "CPU_Temp",
            &value,
            &snapshot,
            "Quiet",
        )));
        assert_eq!(chassis.as_deref(), Some("chassis0"));
        assert_eq!(
            properties["Profiles"],
            PropertyValue::from(vec!["Default".to_string(), "Quiet".to_string()])
        );

        let (properties, _) = patch(build_properties(&request(
            ControllerKind::PidTemperature,
            "CPU_Temp",
            &value,
            &snapshot,
            "Default",
        )));
        assert!(!properties.contains_key("Profiles"));
    }

    #[test]
    fn test_update_with_illegal_profiles_is_internal() {
        let mut snapshot = snapshot();
        snapshot[2]
            .interfaces
            .get_mut(interfaces::PID)
            .unwrap()
            .insert("Profiles".into(), PropertyValue::Double(1.0));
        let value = json!({});
        let err = failure(build_properties(&request(
            ControllerKind::PidTemperature,
            "CPU_Temp",
            &value,
            &snapshot,
            "Quiet",
        )));
        assert!(err.is_internal());
    }

    #[test]
    fn test_set_point_offset_inverse_mapping() {
        let snapshot = snapshot();
        for (backend, client) in SET_POINT_OFFSETS {
            let value = json!({ "SetPointOffset": client });
            let (properties, _) = patch(build_properties(&request(
                ControllerKind::PidTemperature,
                "CPU_Temp",
                &value,
                &snapshot,
                "",
            )));
            assert_eq!(properties["SetPointOffset"], PropertyValue::from(backend));
            assert_eq!(offset_to_client(backend), Some(client));
        }

        let value = json!({"SetPointOffset": "Sideways"});
        let err = failure(build_properties(&request(
            ControllerKind::PidTemperature,
            "CPU_Temp",
            &value,
            &snapshot,
            "",
        )));
        assert_eq!(err, EngineError::InvalidObject("CPU_Temp".into()));
    }

    #[test]
    fn test_zone_chassis_from_link() {
        let value = json!({
            "Chassis": {"@odata.id": "/redfish/v1/Chassis/chassis1"},
            "FailSafePercent": 80.0
        });
        let (properties, chassis) =
            patch(build_properties(&request(ControllerKind::Zone, "Right", &value, &[], "")));
        assert_eq!(chassis.as_deref(), Some("chassis1"));
        assert_eq!(properties["Type"], PropertyValue::from("Pid.Zone"));
        assert!(!properties.contains_key("Profiles"));

        let value = json!({"Chassis": {"@odata.id": "/redfish/v1"}});
        let err = failure(build_properties(&request(ControllerKind::Zone, "Right", &value, &[], "")));
        assert_eq!(err, EngineError::InvalidObject("/redfish/v1".into()));
    }

    #[test]
    fn test_zones_validation() {
        let snapshot = snapshot();
        let empty = json!({"Zones": []});
        let err = failure(build_properties(&request(
            ControllerKind::PidFan,
            "Fan_2",
            &empty,
            &snapshot,
            "",
        )));
        assert!(matches!(err, EngineError::PropertyValueFormat { ref property, .. } if property == "Zones"));

        let short = json!({"Zones": [{"@odata.id": "/redfish/v1/Managers/bmc"}]});
        let err = failure(build_properties(&request(
            ControllerKind::PidFan,
            "Fan_2",
            &short,
            &snapshot,
            "",
        )));
        assert!(matches!(err, EngineError::PropertyValueFormat { .. }));

        let unknown_zone =
            json!({"Zones": [{"@odata.id": "/redfish/v1/Managers/bmc/Oem/OpenBmc/Fan/FanZones/Rear"}]});
        let err = failure(build_properties(&request(
            ControllerKind::PidFan,
            "Fan_2",
            &unknown_zone,
            &snapshot,
            "",
        )));
        assert_eq!(err, EngineError::InvalidObject("Fan_2".into()));
    }

    #[test]
    fn test_unknown_and_mistyped_fields() {
        let snapshot = snapshot();
        let value = json!({"Color": "red"});
        let err = failure(build_properties(&request(
            ControllerKind::PidTemperature,
            "CPU_Temp",
            &value,
            &snapshot,
            "",
        )));
        assert_eq!(err, EngineError::PropertyUnknown("Color".into()));

        let value = json!({"SetPoint": "hot"});
        let err = failure(build_properties(&request(
            ControllerKind::PidTemperature,
            "CPU_Temp",
            &value,
            &snapshot,
            "",
        )));
        assert!(matches!(err, EngineError::PropertyValueType { ref property, .. } if property == "SetPoint"));

        let value = json!({"Name": "CPU Temp", "@odata.id": "ignored"});
        assert!(matches!(
            build_properties(&request(
                ControllerKind::PidTemperature,
                "CPU_Temp",
                &value,
                &snapshot,
                "",
            )),
            BuildOutcome::Patch { .. }
        ));
    }

    #[test]
    fn test_stepwise_direction_and_steps() {
        let snapshot = snapshot();
        let value = json!({
            "Zones": [{"@odata.id": "/redfish/v1/Managers/bmc/Oem/OpenBmc/Fan/FanZones/Left"}],
            "Direction": "Floor",
            "Steps": [{"Target": 30.0, "Output": 20.0}, {"Target": 50.0, "Output": 60.0}]
        });
        let (properties, _) = patch(build_properties(&request(
            ControllerKind::Stepwise,
            "Curve",
            &value,
            &snapshot,
            "",
        )));
        assert_eq!(properties["Class"], PropertyValue::from("Floor"));
        assert_eq!(properties["Reading"], PropertyValue::from(vec![30.0, 50.0]));
        assert_eq!(properties["Output"], PropertyValue::from(vec![20.0, 60.0]));

        let value = json!({"Direction": "Up"});
        let err = failure(build_properties(&request(
            ControllerKind::Stepwise,
            "Curve",
            &value,
            &snapshot,
            "",
        )));
        assert_eq!(err, EngineError::value_type("Direction", "Up"));

        let value = json!({"Steps": [{"Target": 30.0}]});
        let err = failure(build_properties(&request(
            ControllerKind::Stepwise,
            "Curve",
            &value,
            &snapshot,
            "",
        )));
        assert!(matches!(err, EngineError::PropertyValueType { ref property, .. } if property == "Steps"));
    }

    #[test]
    fn test_update_without_chassis_is_invalid() {
        let snapshot = vec![ManagedObject::new("/short/CPU_Temp")
            .with_interface(interfaces::PID, props(&[("Name", "CPU Temp".into())]))];
        let value = json!({"SetPoint": 1.0});
        let err = failure(build_properties(&request(
            ControllerKind::PidTemperature,
            "CPU_Temp",
            &value,
            &snapshot,
            "",
        )));
        assert_eq!(err, EngineError::InvalidObject("CPU_Temp".into()));
    }

    proptest! {
        #[test]
        fn prop_steps_unzip_to_equal_lengths(
            points in proptest::collection::vec((-200.0f64..200.0, 0.0f64..100.0), 0..16)
        ) {
            let steps: Vec<Step> = points
                .iter()
                .map(|&(target, output)| Step { target, output })
                .collect();
            let (readings, outputs) = unzip_steps(&steps);
            prop_assert_eq!(readings.len(), outputs.len());
            prop_assert_eq!(zip_steps(&readings, &outputs), Some(steps));
        }
    }
}
