//! Controller kinds
//!
//! Every controller belongs to exactly one kind. The kind selects the backend
//! interface that stores it and the field schema the client uses for it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::interfaces;

/// The kind of a controller configuration object.
///
/// Declaration order is the order in which patch collections are processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ControllerKind {
    /// PID loop driven by temperature inputs.
    #[serde(rename = "PidControllers")]
    PidTemperature,

    /// PID loop driving fan outputs.
    #[serde(rename = "FanControllers")]
    PidFan,

    /// Fan zone grouping controllers under one chassis.
    #[serde(rename = "FanZones")]
    Zone,

    /// Stepwise reading-to-output curve.
    #[serde(rename = "StepwiseControllers")]
    Stepwise,
}

/// Client collection key that does not name a controller kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown controller collection: {0}")]
pub struct UnknownControllerKind(pub String);

impl ControllerKind {
    /// All kinds in processing order.
    pub const ALL: [ControllerKind; 4] = [
        ControllerKind::PidTemperature,
        ControllerKind::PidFan,
        ControllerKind::Zone,
        ControllerKind::Stepwise,
    ];

    /// Client-facing collection key.
    pub fn collection(self) -> &'static str {
        match self {
            ControllerKind::PidTemperature => "PidControllers",
            ControllerKind::PidFan => "FanControllers",
            ControllerKind::Zone => "FanZones",
            ControllerKind::Stepwise => "StepwiseControllers",
        }
    }

    /// Parse a client collection key.
    pub fn from_collection(key: &str) -> Result<Self, UnknownControllerKind> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.collection() == key)
            .ok_or_else(|| UnknownControllerKind(key.to_string()))
    }

    /// Backend interface that stores controllers of this kind.
    pub fn interface(self) -> &'static str {
        match self {
            ControllerKind::PidTemperature | ControllerKind::PidFan => interfaces::PID,
            ControllerKind::Zone => interfaces::PID_ZONE,
            ControllerKind::Stepwise => interfaces::STEPWISE,
        }
    }

    /// Rendered `@odata.type` of a single controller of this kind.
    pub fn entry_type(self) -> &'static str {
        match self {
            ControllerKind::PidTemperature => "#OemManager.PidController",
            ControllerKind::PidFan => "#OemManager.FanController",
            ControllerKind::Zone => "#OemManager.FanZone",
            ControllerKind::Stepwise => "#OemManager.StepwiseController",
        }
    }

    /// Rendered `@odata.type` of the collection.
    pub fn collection_type(self) -> &'static str {
        match self {
            ControllerKind::PidTemperature => "#OemManager.PidControllers",
            ControllerKind::PidFan => "#OemManager.FanControllers",
            ControllerKind::Zone => "#OemManager.FanZones",
            ControllerKind::Stepwise => "#OemManager.StepwiseControllers",
        }
    }

    /// Backend `Class` written when a PID controller is created.
    pub fn pid_class(self) -> Option<&'static str> {
        match self {
            ControllerKind::PidTemperature => Some("temp"),
            ControllerKind::PidFan => Some("fan"),
            _ => None,
        }
    }

    /// Classify a PID interface by its backend `Class`.
    pub fn from_pid_class(class: &str) -> Self {
        if class == "fan" {
            ControllerKind::PidFan
        } else {
            ControllerKind::PidTemperature
        }
    }

    /// Returns true for the kinds that carry profile membership.
    pub fn is_profiled(self) -> bool {
        !matches!(self, ControllerKind::Zone)
    }
}

impl std::fmt::Display for ControllerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.collection())
    }
}

impl std::str::FromStr for ControllerKind {
    type Err = UnknownControllerKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_collection(s)
    }
}
