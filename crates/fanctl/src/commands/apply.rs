//! Apply a patch document

use std::path::Path;

use fanctl_engine::{ApplyReport, ClientPatch, EngineEvent};
use serde::Serialize;
use tabled::Tabled;
use tracing::info;

use super::Session;
use crate::error::{CliError, CliResult};
use crate::output::{self, notice, Notice, OutputFormat};

/// One entry row
#[derive(Debug, Serialize, Tabled)]
pub struct EntryRow {
    #[tabled(rename = "Collection")]
    pub collection: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Action")]
    pub action: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Detail")]
    pub detail: String,
}

/// Request-level errors first, then one row per entry
pub fn rows(report: &ApplyReport) -> Vec<EntryRow> {
    let request = report.errors.iter().map(|err| EntryRow {
        collection: "-".into(),
        name: "-".into(),
        action: "request".into(),
        status: "error".into(),
        detail: err.to_string(),
    });

    let entries = report.entries.iter().map(|entry| EntryRow {
        collection: entry.kind.collection().to_string(),
        name: entry.name.clone(),
        action: entry.action.to_string(),
        status: if entry.errors.is_empty() { "ok" } else { "error" }.to_string(),
        detail: if entry.errors.is_empty() {
            entry.target.clone().unwrap_or_default()
        } else {
            entry
                .errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ")
        },
    });

    request.chain(entries).collect()
}

/// Read a patch file and apply the optional profile override
pub fn read_patch(path: &Path, profile: Option<String>) -> CliResult<ClientPatch> {
    let contents = std::fs::read_to_string(path)?;
    let document: serde_json::Value = serde_json::from_str(&contents)?;
    let patch = ClientPatch::from_json(&document)?;
    Ok(match profile {
        Some(profile) => patch.with_profile(profile),
        None => patch,
    })
}

fn describe(event: &EngineEvent) -> String {
    match event {
        EngineEvent::ControllerCreated {
            kind,
            name,
            chassis_path,
        } => format!("created {} {} under {}", kind, name, chassis_path),
        EngineEvent::ControllerUpdated {
            kind,
            name,
            properties,
        } => format!("updated {} {} ({})", kind, name, properties.join(", ")),
        EngineEvent::ControllerDeleted { kind, name } => format!("deleted {} {}", kind, name),
        EngineEvent::ProfileChanged { from, to } => format!("profile {} -> {}", from, to),
        EngineEvent::ReconciliationAborted { reason } => format!("aborted: {}", reason),
    }
}

pub async fn execute(
    session: &Session,
    patch_file: &Path,
    profile: Option<String>,
    write: bool,
    format: OutputFormat,
) -> CliResult<()> {
    let patch = read_patch(patch_file, profile)?;
    if patch.is_empty() {
        return Err(CliError::InvalidInput(format!(
            "{} names no controllers",
            patch_file.display()
        )));
    }

    let mut events = session.engine.subscribe_events();
    let report = session.engine.apply(&patch).await;

    output::print_rows(rows(&report), format, "Nothing applied")?;
    if format.is_table() {
        while let Ok(event) = events.try_recv() {
            notice(Notice::Event, &describe(&event));
        }
        output::print_report_summary(&report);
    }

    let mutated = !session.backend.mutations().is_empty();
    if write && mutated {
        session.save().await?;
        info!(path = %session.state_file.display(), "State written");
        if format.is_table() {
            notice(
                Notice::Success,
                &format!("Wrote {}", session.state_file.display()),
            );
        }
    } else if mutated && format.is_table() {
        notice(
            Notice::Warning,
            "Changes not written; pass --write to persist them",
        );
    }

    if report.is_success() {
        Ok(())
    } else {
        Err(CliError::Apply(output::report_summary(&report)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fanctl_engine::{EngineError, EntryAction, EntryReport};
    use fanctl_types::ControllerKind;
    use std::io::Write;

    #[test]
    fn test_rows_include_request_errors() {
        let report = ApplyReport {
            errors: vec![EngineError::ActionParameterUnknown {
                parameter: "Profile".into(),
                value: "Quiet".into(),
            }],
            entries: vec![EntryReport {
                kind: ControllerKind::Zone,
                name: "Left".into(),
                action: EntryAction::Delete,
                target: Some("/inventory/Left".into()),
                properties: vec![],
                errors: vec![],
            }],
            ..Default::default()
        };

        let rows = rows(&report);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].action, "request");
        assert!(rows[0].detail.contains("Quiet"));
        assert_eq!(rows[1].status, "ok");
        assert_eq!(rows[1].detail, "/inventory/Left");
    }

    #[test]
    fn test_read_patch_with_profile_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"FanZones": {{"Left": null}}, "Profile": "Default"}}"#).unwrap();

        let patch = read_patch(file.path(), Some("Quiet".into())).unwrap();
        assert_eq!(patch.profile(), Some("Quiet"));
        assert_eq!(patch.len(), 1);
    }

    #[test]
    fn test_read_patch_rejects_unknown_collection() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"Thermostats": {{}}}}"#).unwrap();

        let err = read_patch(file.path(), None).unwrap_err();
        assert!(matches!(err, CliError::Engine(EngineError::PropertyUnknown(_))));
    }
}
