//! Terminal output for views, apply reports and status lines

use colored::*;
use fanctl_engine::{ApplyReport, EntryAction};
use serde::Serialize;
use tabled::{Table, Tabled};

use crate::error::CliResult;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

impl OutputFormat {
    /// Status lines and summaries only accompany tables; structured output
    /// stays machine readable.
    pub fn is_table(self) -> bool {
        self == OutputFormat::Table
    }
}

/// Print rows as a table, or the rows themselves as JSON/YAML
pub fn print_rows<T: Serialize + Tabled>(
    rows: Vec<T>,
    format: OutputFormat,
    empty: &str,
) -> CliResult<()> {
    match format {
        OutputFormat::Table if rows.is_empty() => println!("{}", empty.dimmed()),
        OutputFormat::Table => println!("{}", Table::new(rows)),
        _ => print_document(&rows, format)?,
    }
    Ok(())
}

/// Print a whole document; there is no table form, so tables get JSON
pub fn print_document<T: Serialize>(document: &T, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(document)?),
        OutputFormat::Table | OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(document)?)
        }
    }
    Ok(())
}

/// Active profile line above the controller table
pub fn print_profile(profile: &str, supported: &[String]) {
    if profile.is_empty() {
        notice(Notice::Info, "No thermal profile");
    } else {
        notice(
            Notice::Info,
            &format!(
                "Profile {} (supported: {})",
                profile.bold(),
                supported.join(", ")
            ),
        );
    }
}

/// Plain-text tally of an apply report
pub fn report_summary(report: &ApplyReport) -> String {
    let skipped = report
        .entries
        .iter()
        .filter(|e| e.action == EntryAction::Skipped)
        .count();
    let failed = report
        .entries
        .iter()
        .filter(|e| e.action != EntryAction::Skipped && !e.errors.is_empty())
        .count();
    let applied = report.entries.len() - skipped - failed;

    let mut summary = format!(
        "{} entries: {} applied, {} failed, {} skipped",
        report.entries.len(),
        applied,
        failed,
        skipped
    );
    if !report.errors.is_empty() {
        summary.push_str(&format!("; {} request error(s)", report.errors.len()));
    }
    if report.aborted {
        summary.push_str("; pass aborted");
    }
    summary
}

pub fn print_report_summary(report: &ApplyReport) {
    let kind = if report.is_success() {
        Notice::Success
    } else {
        Notice::Failure
    };
    notice(kind, &report_summary(report));
}

/// Status line kinds
#[derive(Debug, Clone, Copy)]
pub enum Notice {
    Success,
    Failure,
    Warning,
    Info,
    /// Engine event observed during an apply
    Event,
}

/// Print a status line on stdout
pub fn notice(kind: Notice, message: &str) {
    let marker = match kind {
        Notice::Success => "✓".green(),
        Notice::Failure => "✗".red(),
        Notice::Warning => "⚠".yellow(),
        Notice::Info => "ℹ".blue(),
        Notice::Event => "→".cyan(),
    };
    println!("{} {}", marker, message);
}

/// Print an error message on stderr
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use fanctl_engine::{EngineError, EntryReport};
    use fanctl_types::ControllerKind;

    fn entry(name: &str, action: EntryAction, errors: Vec<EngineError>) -> EntryReport {
        EntryReport {
            kind: ControllerKind::Zone,
            name: name.into(),
            action,
            target: None,
            properties: vec![],
            errors,
        }
    }

    #[test]
    fn test_only_tables_are_decorated() {
        assert!(OutputFormat::default().is_table());
        assert!(!OutputFormat::Json.is_table());
        assert!(!OutputFormat::Yaml.is_table());
    }

    #[test]
    fn test_report_summary_counts() {
        let report = ApplyReport {
            entries: vec![
                entry("Left", EntryAction::Update, vec![]),
                entry("Right", EntryAction::Delete, vec![EngineError::internal("gone")]),
                entry("Rear", EntryAction::Skipped, vec![EngineError::InvalidObject("Rear".into())]),
            ],
            aborted: true,
            ..Default::default()
        };
        assert_eq!(
            report_summary(&report),
            "3 entries: 1 applied, 1 failed, 1 skipped; pass aborted"
        );
    }

    #[test]
    fn test_report_summary_request_errors() {
        let report = ApplyReport {
            errors: vec![EngineError::internal("snapshot failed")],
            ..Default::default()
        };
        assert_eq!(
            report_summary(&report),
            "0 entries: 0 applied, 0 failed, 0 skipped; 1 request error(s)"
        );
    }
}
