//! CLI commands

pub mod apply;
pub mod show;

use std::path::PathBuf;
use std::sync::Arc;

use fanctl_engine::backend::InMemoryBackend;
use fanctl_engine::FanConfigEngine;
use tracing::debug;

use crate::config::CliConfig;
use crate::error::CliResult;
use crate::state;

/// Engine over the in-memory backend seeded from the state file
pub struct Session {
    pub engine: FanConfigEngine,
    pub backend: Arc<InMemoryBackend>,
    pub state_file: PathBuf,
}

impl Session {
    pub fn open(config: &CliConfig, state_file: Option<PathBuf>) -> CliResult<Self> {
        let state_file = config.resolve_state_file(state_file)?;
        debug!(path = %state_file.display(), "Loading backend state");

        let backend = Arc::new(InMemoryBackend::from_state(state::load(&state_file)?));
        let engine = FanConfigEngine::new(config.engine.clone(), backend.clone());
        Ok(Self {
            engine,
            backend,
            state_file,
        })
    }

    /// Persist the backend contents back to the state file
    pub async fn save(&self) -> CliResult<()> {
        state::save(&self.state_file, &self.backend.state().await)
    }
}
