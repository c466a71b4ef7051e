//! Engine events
//!
//! Every successful change to backend configuration is announced on a
//! broadcast channel so that observers see the same stream regardless of
//! which client issued the patch.

use fanctl_types::ControllerKind;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Events emitted by a reconciliation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    // ═══════════════════════════════════════════════════════════════════
    // CONTROLLER EVENTS
    // ═══════════════════════════════════════════════════════════════════
    /// A configuration record was created
    ControllerCreated {
        kind: ControllerKind,
        name: String,
        chassis_path: String,
    },

    /// Properties of an existing controller were written
    ControllerUpdated {
        kind: ControllerKind,
        name: String,
        properties: Vec<String>,
    },

    /// A controller interface was deleted
    ControllerDeleted { kind: ControllerKind, name: String },

    // ═══════════════════════════════════════════════════════════════════
    // PASS EVENTS
    // ═══════════════════════════════════════════════════════════════════
    /// The active thermal profile changed
    ProfileChanged { from: String, to: String },

    /// A pass stopped before processing every entry
    ReconciliationAborted { reason: String },
}

impl EngineEvent {
    /// Controller name the event refers to, if any.
    pub fn controller(&self) -> Option<(ControllerKind, &str)> {
        match self {
            EngineEvent::ControllerCreated { kind, name, .. }
            | EngineEvent::ControllerUpdated { kind, name, .. }
            | EngineEvent::ControllerDeleted { kind, name } => Some((*kind, name)),
            EngineEvent::ProfileChanged { .. } | EngineEvent::ReconciliationAborted { .. } => None,
        }
    }
}

/// Sending side shared by the engine.
pub type EventSender = broadcast::Sender<EngineEvent>;

/// Publish without caring whether anyone listens.
pub(crate) fn publish(events: &EventSender, event: EngineEvent) {
    // No receivers is not an error.
    let _ = events.send(event);
}
