//! Rendering of one service snapshot into the client view.

use fanctl_types::{
    interfaces, to_identifier, ControllerKind, ManagedObject, PropertyMap, PropertyValue,
};
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::builder::{offset_to_client, zip_steps, INVENTORY_CHASSIS_SEGMENT, PID_DOUBLES};
use crate::error::{EngineError, Result};
use crate::view::{RenderedController, RenderedView};

/// Chassis shown for zones whose path does not reach the chassis segment.
pub const ILLEGAL_CHASSIS: &str = "#IllegalValue";

/// Render every configuration interface in `objects` into `view`.
///
/// Objects carrying a `Profiles` list that does not include `profile` are
/// skipped. Malformed backend data fails the whole render.
pub fn populate_view(view: &mut RenderedView, objects: &[ManagedObject], profile: &str) -> Result<()> {
    for object in objects {
        for (interface, properties) in &object.interfaces {
            if !interfaces::is_configuration(interface) {
                continue;
            }
            render_interface(view, object, interface, properties, profile)?;
        }
    }
    Ok(())
}

fn illegal(object: &ManagedObject, property: &str) -> EngineError {
    error!(path = %object.path, property, "Illegal configuration field");
    EngineError::internal(format!("illegal {} on {}", property, object.path))
}

fn render_interface(
    view: &mut RenderedView,
    object: &ManagedObject,
    interface: &str,
    properties: &PropertyMap,
    profile: &str,
) -> Result<()> {
    let name = properties
        .get("Name")
        .and_then(PropertyValue::as_str)
        .ok_or_else(|| illegal(object, "Name"))?;
    let id = to_identifier(name);

    if let Some(profiles) = properties.get("Profiles") {
        let profiles = profiles
            .as_str_list()
            .ok_or_else(|| illegal(object, "Profiles"))?;
        if !profiles.iter().any(|p| p == profile) {
            debug!(name, profile, "Controller not in current profile");
            return Ok(());
        }
    }

    let class = properties.get("Class").and_then(PropertyValue::as_str);
    let mut controller = RenderedController::new(name);

    let kind = match interface {
        interfaces::PID_ZONE => {
            let chassis = object
                .path
                .segment(INVENTORY_CHASSIS_SEGMENT)
                .unwrap_or(ILLEGAL_CHASSIS);
            controller.chassis = Some(chassis.to_string());
            render_zone(&mut controller, object, properties)?;
            ControllerKind::Zone
        }
        interfaces::STEPWISE => {
            let class = class.ok_or_else(|| illegal(object, "Class"))?;
            controller.fields.insert("Direction".into(), json!(class));
            render_stepwise(&mut controller, object, properties)?;
            render_shared(&mut controller, object, properties)?;
            ControllerKind::Stepwise
        }
        _ => {
            let class = class.ok_or_else(|| illegal(object, "Class"))?;
            render_shared(&mut controller, object, properties)?;
            ControllerKind::from_pid_class(class)
        }
    };

    view.insert(kind, id, controller);
    Ok(())
}

fn render_zone(
    controller: &mut RenderedController,
    object: &ManagedObject,
    properties: &PropertyMap,
) -> Result<()> {
    for (property, value) in properties {
        if matches!(property.as_str(), "Type" | "Class" | "Name") {
            continue;
        }
        let number = value.as_f64().ok_or_else(|| illegal(object, property))?;
        controller.fields.insert(property.clone(), json!(number));
    }
    Ok(())
}

fn render_stepwise(
    controller: &mut RenderedController,
    object: &ManagedObject,
    properties: &PropertyMap,
) -> Result<()> {
    let readings = match properties.get("Reading") {
        Some(value) => Some(value.as_f64_list().ok_or_else(|| illegal(object, "Reading"))?),
        None => None,
    };
    let outputs = match properties.get("Output") {
        Some(value) => Some(value.as_f64_list().ok_or_else(|| illegal(object, "Output"))?),
        None => None,
    };

    if let (Some(readings), Some(outputs)) = (readings, outputs) {
        let steps = zip_steps(readings, outputs).ok_or_else(|| {
            error!(path = %object.path, "Reading and Output size don't match");
            EngineError::internal(format!("Reading and Output differ in length on {}", object.path))
        })?;
        let steps: Vec<Value> = steps
            .iter()
            .map(|step| json!({ "Target": step.target, "Output": step.output }))
            .collect();
        controller.fields.insert("Steps".into(), Value::Array(steps));
    }
    Ok(())
}

/// Fields common to PID and stepwise controllers.
fn render_shared(
    controller: &mut RenderedController,
    object: &ManagedObject,
    properties: &PropertyMap,
) -> Result<()> {
    for (property, value) in properties {
        match property.as_str() {
            "Zones" => {
                let zones = value.as_str_list().ok_or_else(|| illegal(object, property))?;
                controller.zones = Some(zones.iter().map(|z| to_identifier(z)).collect());
            }
            "Inputs" | "Outputs" => {
                let names = value.as_str_list().ok_or_else(|| illegal(object, property))?;
                let ids: Vec<String> = names.iter().map(|n| to_identifier(n)).collect();
                controller.fields.insert(property.clone(), json!(ids));
            }
            "SetPointOffset" => {
                let offset = value
                    .as_str()
                    .and_then(offset_to_client)
                    .ok_or_else(|| illegal(object, property))?;
                controller.fields.insert(property.clone(), json!(offset));
            }
            p if PID_DOUBLES.contains(&p) => {
                let number = value.as_f64().ok_or_else(|| illegal(object, property))?;
                controller.fields.insert(property.clone(), json!(number));
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHASSIS: &str = "/xyz/openbmc_project/inventory/system/chassis/chassis0";

    fn props(pairs: &[(&str, PropertyValue)]) -> PropertyMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn render(objects: &[ManagedObject], profile: &str) -> Result<RenderedView> {
        let mut view = RenderedView::default();
        populate_view(&mut view, objects, profile)?;
        Ok(view)
    }

    #[test]
    fn test_pid_class_selects_kind() {
        let objects = vec![
            ManagedObject::new(format!("{}/Fan_1", CHASSIS)).with_interface(
                interfaces::PID,
                props(&[
                    ("Name", "Fan 1".into()),
                    ("Class", "fan".into()),
                    ("Inputs", vec!["Fan 1 Tach".to_string()].into()),
                    ("Zones", vec!["Left Zone".to_string()].into()),
                    ("SetPointOffset", "CriticalHigh".into()),
                    ("PCoefficient", 0.5.into()),
                    ("Unrelated", true.into()),
                ]),
            ),
            ManagedObject::new(format!("{}/CPU", CHASSIS)).with_interface(
                interfaces::PID,
                props(&[("Name", "CPU".into()), ("Class", "temp".into())]),
            ),
        ];
        let view = render(&objects, "").unwrap();

        let fan = view.controller(ControllerKind::PidFan, "Fan_1").unwrap();
        assert_eq!(fan.name, "Fan 1");
        assert_eq!(fan.field("Inputs"), Some(&json!(["Fan_1_Tach"])));
        assert_eq!(fan.zones, Some(vec!["Left_Zone".to_string()]));
        assert_eq!(fan.field("SetPointOffset"), Some(&json!("UpperThresholdCritical")));
        assert_eq!(fan.field("PCoefficient"), Some(&json!(0.5)));
        assert!(fan.field("Unrelated").is_none());

        assert!(view.controller(ControllerKind::PidTemperature, "CPU").is_some());
    }

    #[test]
    fn test_zone_chassis_and_doubles() {
        let objects = vec![
            ManagedObject::new(format!("{}/Left", CHASSIS)).with_interface(
                interfaces::PID_ZONE,
                props(&[
                    ("Name", "Left".into()),
                    ("Type", "Pid.Zone".into()),
                    ("FailSafePercent", 100.0.into()),
                    ("MinThermalOutput", 30.0.into()),
                ]),
            ),
            ManagedObject::new("/short/Right").with_interface(
                interfaces::PID_ZONE,
                props(&[("Name", "Right".into())]),
            ),
        ];
        let view = render(&objects, "").unwrap();

        let left = view.controller(ControllerKind::Zone, "Left").unwrap();
        assert_eq!(left.chassis.as_deref(), Some("chassis0"));
        assert_eq!(left.field("MinThermalOutput"), Some(&json!(30.0)));
        assert!(left.field("Type").is_none());

        let right = view.controller(ControllerKind::Zone, "Right").unwrap();
        assert_eq!(right.chassis.as_deref(), Some(ILLEGAL_CHASSIS));
    }

    #[test]
    fn test_zone_with_non_double_is_internal() {
        let objects = vec![ManagedObject::new(format!("{}/Left", CHASSIS)).with_interface(
            interfaces::PID_ZONE,
            props(&[("Name", "Left".into()), ("FailSafePercent", "high".into())]),
        )];
        assert!(render(&objects, "").unwrap_err().is_internal());
    }

    #[test]
    fn test_stepwise_steps_zip() {
        let objects = vec![ManagedObject::new(format!("{}/Curve", CHASSIS)).with_interface(
            interfaces::STEPWISE,
            props(&[
                ("Name", "Curve".into()),
                ("Class", "Ceiling".into()),
                ("Reading", vec![20.0, 40.0].into()),
                ("Output", vec![10.0, 80.0].into()),
                ("PositiveHysteresis", 1.0.into()),
            ]),
        )];
        let view = render(&objects, "").unwrap();
        let curve = view.controller(ControllerKind::Stepwise, "Curve").unwrap();
        assert_eq!(curve.field("Direction"), Some(&json!("Ceiling")));
        assert_eq!(
            curve.field("Steps"),
            Some(&json!([{"Target": 20.0, "Output": 10.0}, {"Target": 40.0, "Output": 80.0}]))
        );
        assert_eq!(curve.field("PositiveHysteresis"), Some(&json!(1.0)));
    }

    #[test]
    fn test_stepwise_length_mismatch_is_internal() {
        let objects = vec![ManagedObject::new(format!("{}/Curve", CHASSIS)).with_interface(
            interfaces::STEPWISE,
            props(&[
                ("Name", "Curve".into()),
                ("Class", "Floor".into()),
                ("Reading", vec![20.0, 40.0].into()),
                ("Output", vec![10.0].into()),
            ]),
        )];
        assert!(render(&objects, "").unwrap_err().is_internal());
    }

    #[test]
    fn test_profile_filter() {
        let objects = vec![ManagedObject::new(format!("{}/Quiet_Fan", CHASSIS)).with_interface(
            interfaces::PID,
            props(&[
                ("Name", "Quiet Fan".into()),
                ("Class", "fan".into()),
                ("Profiles", vec!["Quiet".to_string()].into()),
            ]),
        )];
        assert!(render(&objects, "Performance").unwrap().is_empty());
        assert_eq!(render(&objects, "Quiet").unwrap().len(), 1);
    }

    #[test]
    fn test_missing_name_or_class_is_internal() {
        let nameless = vec![ManagedObject::new(format!("{}/X", CHASSIS))
            .with_interface(interfaces::PID, props(&[("Class", "fan".into())]))];
        assert!(render(&nameless, "").unwrap_err().is_internal());

        let classless = vec![ManagedObject::new(format!("{}/X", CHASSIS))
            .with_interface(interfaces::STEPWISE, props(&[("Name", "X".into())]))];
        assert!(render(&classless, "").unwrap_err().is_internal());
    }

    #[test]
    fn test_unknown_offset_is_internal() {
        let objects = vec![ManagedObject::new(format!("{}/X", CHASSIS)).with_interface(
            interfaces::PID,
            props(&[
                ("Name", "X".into()),
                ("Class", "temp".into()),
                ("SetPointOffset", "Sideways".into()),
            ]),
        )];
        assert!(render(&objects, "").unwrap_err().is_internal());
    }

    #[test]
    fn test_foreign_interfaces_ignored() {
        let objects = vec![ManagedObject::new(CHASSIS).with_interface(
            "xyz.openbmc_project.Inventory.Item.Chassis",
            props(&[("Name", 3.0.into())]),
        )];
        assert!(render(&objects, "").unwrap().is_empty());
    }
}
