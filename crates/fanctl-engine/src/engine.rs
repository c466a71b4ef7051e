//! Engine facade.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

use crate::backend::{ConfigBackend, TimedBackend};
use crate::collect::collect_configuration;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::events::{EngineEvent, EventSender};
use crate::patch::ClientPatch;
use crate::reconcile::{apply_configuration, ApplyReport};
use crate::view::RenderedView;

/// Reads and reconciles fan controller configuration.
pub struct FanConfigEngine {
    /// Configuration.
    config: EngineConfig,

    /// Backend, wrapped with a timeout when one is configured.
    backend: Arc<dyn ConfigBackend>,

    /// Event broadcaster.
    event_tx: EventSender,
}

impl FanConfigEngine {
    /// Create an engine over `backend`.
    pub fn new(config: EngineConfig, backend: Arc<dyn ConfigBackend>) -> Self {
        let backend: Arc<dyn ConfigBackend> = match config.rpc_timeout() {
            Some(timeout) => Arc::new(TimedBackend::new(backend, timeout)),
            None => backend,
        };
        let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));

        Self {
            config,
            backend,
            event_tx,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Subscribe to engine events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<EngineEvent> {
        self.event_tx.subscribe()
    }

    /// Render the current configuration.
    #[instrument(skip(self))]
    pub async fn collect(&self) -> Result<RenderedView> {
        collect_configuration(self.backend.clone()).await
    }

    /// Reconcile `patch` against the backend.
    #[instrument(skip(self, patch), fields(entries = patch.len(), profile = ?patch.profile()))]
    pub async fn apply(&self, patch: &ClientPatch) -> ApplyReport {
        let report =
            apply_configuration(self.backend.clone(), &self.config, patch, &self.event_tx).await;

        if report.is_success() {
            info!(entries = report.entries.len(), "Patch applied");
        } else {
            warn!(
                errors = report.all_errors().count(),
                aborted = report.aborted,
                "Patch applied with errors"
            );
        }
        report
    }
}
