//! Thermal profile lookup.

use fanctl_types::{interfaces, PropertyValue, ProfileSet};
use tracing::{debug, error};

use crate::backend::ConfigBackend;
use crate::error::{EngineError, Result};

/// The profile object and where it lives.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileObject {
    pub service: String,
    pub path: String,
    pub profiles: ProfileSet,
}

/// Locate and read the thermal mode object.
///
/// A failed or empty lookup means the system has no profiles and yields
/// `Ok(None)`. A lookup that finds an object which cannot be read, or whose
/// `Current`/`Supported` properties are missing or mistyped, is an internal
/// error.
pub async fn read_profile(backend: &dyn ConfigBackend) -> Result<Option<ProfileObject>> {
    let entries = match backend
        .get_subtree("/", 0, &[interfaces::THERMAL_MODE])
        .await
    {
        Ok(entries) => entries,
        Err(err) => {
            debug!(error = %err, "No thermal mode object");
            return Ok(None);
        }
    };
    let Some(entry) = entries.first() else {
        return Ok(None);
    };

    let (service, _) = entry.services.first().ok_or_else(|| {
        error!(path = %entry.path, "Thermal mode object has no owner");
        EngineError::internal(format!("no owner for {}", entry.path))
    })?;
    let path = entry.path.as_str();

    let properties = backend
        .get_all_properties(service, path, interfaces::THERMAL_MODE)
        .await
        .map_err(|err| {
            error!(path, error = %err, "Can't read thermal mode");
            EngineError::internal(format!("can't read thermal mode on {}: {}", path, err))
        })?;

    let invalid = || {
        error!(path, "Thermal mode interface invalid");
        EngineError::internal(format!("thermal mode on {} is invalid", path))
    };
    let current = properties
        .get("Current")
        .and_then(PropertyValue::as_str)
        .ok_or_else(invalid)?;
    let supported = properties
        .get("Supported")
        .and_then(PropertyValue::as_str_list)
        .ok_or_else(invalid)?;

    Ok(Some(ProfileObject {
        service: service.clone(),
        path: path.to_string(),
        profiles: ProfileSet::new(current, supported.to_vec()),
    }))
}
