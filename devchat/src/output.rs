//! Console rendering: tables, titled panels and styled errors.

use comfy_table::{presets, Cell, ContentArrangement, Table};
use console::style;

use crate::workflow::{RunReport, StepOutcome};

/// Print an error message to stderr, clearly marked.
pub fn print_error(error: &anyhow::Error) {
    eprintln!("{} {error:#}", style("error:").red().bold());
}

/// A titled block of text.
pub fn print_panel(title: &str, body: &str) {
    println!("{}", style(title).cyan().bold());
    println!("{}", style("─".repeat(title.chars().count().max(8))).dim());
    println!("{body}");
}

fn base_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.iter().map(|h| Cell::new(h)).collect::<Vec<_>>());
    table
}

/// Name / description / step count listing.
pub fn print_workflow_table(rows: &[(String, String, usize)]) {
    let mut table = base_table(&["Name", "Description", "Steps"]);
    for (name, description, steps) in rows {
        table.add_row(vec![name.clone(), description.clone(), steps.to_string()]);
    }
    println!("{table}");
}

/// Per-step results of a run, plus the failure line when one aborted it.
pub fn print_run_report(report: &RunReport) {
    let mut table = base_table(&["Step", "Status", "Details"]);
    for result in &report.results {
        let (status, details) = match &result.outcome {
            StepOutcome::Completed(payload) => {
                ("completed".to_string(), summarize_payload(payload))
            }
            StepOutcome::Skipped { reason } => ("skipped".to_string(), reason.clone()),
        };
        table.add_row(vec![result.name.clone(), status, details]);
    }
    println!("{}", style(format!("Workflow results: {}", report.workflow)).cyan().bold());
    println!("{table}");

    match &report.error {
        Some(error) => eprintln!(
            "{} step '{}' failed: {}",
            style("error:").red().bold(),
            error.step,
            error.message
        ),
        None => println!("{}", style("Run completed successfully").green()),
    }
}

/// Compact single-line summary of a handler payload for the results table.
fn summarize_payload(payload: &serde_json::Value) -> String {
    let text = match payload {
        serde_json::Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(|k| k.as_str()).collect();
            format!("fields: {}", keys.join(", "))
        }
        other => other.to_string(),
    };
    if text.chars().count() > 80 {
        let truncated: String = text.chars().take(77).collect();
        format!("{truncated}...")
    } else {
        text
    }
}

/// Key/value configuration listing; the API key is masked.
pub fn print_config_table(entries: &[(&'static str, String)]) {
    let mut table = base_table(&["Key", "Value"]);
    for (key, value) in entries {
        let shown = if *key == "api_key" && !value.is_empty() {
            "***".to_string()
        } else {
            value.clone()
        };
        table.add_row(vec![key.to_string(), shown]);
    }
    println!("{table}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_summary_lists_object_fields() {
        let summary = summarize_payload(&json!({"documentation": "...", "file": "a.py"}));
        assert_eq!(summary, "fields: documentation, file");
    }

    #[test]
    fn payload_summary_truncates_long_values() {
        let summary = summarize_payload(&json!("x".repeat(200)));
        assert!(summary.ends_with("..."));
        assert!(summary.chars().count() <= 80);
    }
}
