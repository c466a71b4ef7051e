//! Backend state files
//!
//! The CLI drives the engine against an in-memory backend seeded from a
//! YAML or JSON file. Files ending in `.json` are JSON; everything else is
//! YAML.

use std::path::Path;

use fanctl_engine::backend::BackendState;

use crate::error::CliResult;

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Read a state file
pub fn load(path: &Path) -> CliResult<BackendState> {
    let contents = std::fs::read_to_string(path)?;
    if is_json(path) {
        Ok(serde_json::from_str(&contents)?)
    } else {
        Ok(serde_yaml::from_str(&contents)?)
    }
}

/// Write a state file in the format its extension names
pub fn save(path: &Path, state: &BackendState) -> CliResult<()> {
    let contents = if is_json(path) {
        serde_json::to_string_pretty(state)?
    } else {
        serde_yaml::to_string(state)?
    };
    std::fs::write(path, contents)?;
    Ok(())
}
