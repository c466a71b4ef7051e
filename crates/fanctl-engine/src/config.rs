//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the reconciliation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Manager identifier used in rendered resource links.
    #[serde(default = "default_manager_id")]
    pub manager_id: String,

    /// Service that owns controller configuration and accepts AddObject.
    #[serde(default = "default_entity_manager_service")]
    pub entity_manager_service: String,

    /// Path whose managed objects form the reconciliation snapshot.
    #[serde(default = "default_config_root")]
    pub config_root: String,

    /// Maximum number of configuration objects before creation is refused.
    #[serde(default = "default_controller_limit")]
    pub controller_limit: usize,

    /// Per-call timeout. `None` leaves timeouts to the backend.
    #[serde(default)]
    pub rpc_timeout_ms: Option<u64>,

    /// Capacity of the engine event channel.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            manager_id: default_manager_id(),
            entity_manager_service: default_entity_manager_service(),
            config_root: default_config_root(),
            controller_limit: default_controller_limit(),
            rpc_timeout_ms: None,
            event_capacity: default_event_capacity(),
        }
    }
}

impl EngineConfig {
    pub fn rpc_timeout(&self) -> Option<Duration> {
        self.rpc_timeout_ms.map(Duration::from_millis)
    }

    /// Root of the rendered fan configuration resource.
    pub fn fan_root_uri(&self) -> String {
        format!("/redfish/v1/Managers/{}/Oem/OpenBmc/Fan", self.manager_id)
    }
}

fn default_manager_id() -> String {
    "bmc".to_string()
}

fn default_entity_manager_service() -> String {
    "xyz.openbmc_project.EntityManager".to_string()
}

fn default_config_root() -> String {
    "/".to_string()
}

const fn default_controller_limit() -> usize {
    500
}

const fn default_event_capacity() -> usize {
    256
}
