//! Backend interface names.

/// Enumerates every object below the path that carries it.
pub const OBJECT_MANAGER: &str = "org.freedesktop.DBus.ObjectManager";

/// PID loop configuration, shared by temperature and fan controllers.
pub const PID: &str = "xyz.openbmc_project.Configuration.Pid";

/// Fan zone configuration.
pub const PID_ZONE: &str = "xyz.openbmc_project.Configuration.Pid.Zone";

/// Stepwise curve configuration.
pub const STEPWISE: &str = "xyz.openbmc_project.Configuration.Stepwise";

/// Thermal profile management.
pub const THERMAL_MODE: &str = "xyz.openbmc_project.Control.ThermalMode";

/// Interfaces that mark an object as controller configuration.
pub const CONFIGURATION: [&str; 3] = [PID, PID_ZONE, STEPWISE];

/// Returns true if `interface` is one of the controller configuration interfaces.
pub fn is_configuration(interface: &str) -> bool {
    CONFIGURATION.contains(&interface)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_configuration() {
        assert!(is_configuration(PID));
        assert!(is_configuration(PID_ZONE));
        assert!(is_configuration(STEPWISE));
        assert!(!is_configuration(OBJECT_MANAGER));
        assert!(!is_configuration(THERMAL_MODE));
    }
}
