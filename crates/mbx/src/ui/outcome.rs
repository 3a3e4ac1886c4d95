//! Human-readable rendering of provisioning outcomes.
//!
//! Written to stderr; stdout is reserved for machine-readable output.

use console::style;
use mbx_core::orchestrator::{HistoryStatus, Outcome};

/// Render the terminal outcome of a run as display lines
pub fn render_lines(outcome: &Outcome) -> Vec<String> {
    let mut lines = Vec::new();
    match outcome {
        Outcome::Succeeded {
            operation,
            completed,
            history,
        } => {
            lines.push(format!(
                "{} {} finished ({} steps)",
                style("✓").green(),
                operation,
                completed.len()
            ));
            if *history == HistoryStatus::Restored {
                lines.push("  git history restored".to_string());
            }
        }
        Outcome::Failed {
            operation,
            failure,
            completed,
            history,
        } => {
            lines.push(format!(
                "{} {} failed at step \"{}\": {}",
                style("✗").red(),
                operation,
                failure.step,
                failure.error
            ));
            if !completed.is_empty() {
                let done: Vec<String> = completed.iter().map(|s| s.to_string()).collect();
                lines.push(format!("  completed before the failure: {}", done.join(", ")));
            }
            match history {
                HistoryStatus::Restored => lines.push("  git history restored".to_string()),
                HistoryStatus::Stranded { staging } => lines.push(format!(
                    "  {} git history was NOT restored; manual restore required at staging path {} (rename it back to .git)",
                    style("!").yellow().bold(),
                    staging.display()
                )),
                HistoryStatus::Missing { staging } => lines.push(format!(
                    "  {} git history backup is missing from {}; it could not be restored",
                    style("!").red().bold(),
                    staging.display()
                )),
                HistoryStatus::Untouched => {}
            }
        }
        Outcome::Blocked(reason) => {
            lines.push(format!("{} {}", style("Blocked:").yellow(), reason));
        }
        Outcome::Aborted => {
            lines.push("Aborted by user; nothing was changed".to_string());
        }
    }
    lines
}

pub fn print(outcome: &Outcome) {
    for line in render_lines(outcome) {
        eprintln!("{}", line);
    }
}
