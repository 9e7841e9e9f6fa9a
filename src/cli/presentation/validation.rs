//! Validation presentation.

use super::shared::{format_section_heading, or_dash, table_with_header};
use crate::error::ApiError;
use crate::types::Severity;
use crate::validation::ValidationError;
use owo_colors::OwoColorize;
use serde_json::json;

pub fn format_validation_text(findings: &[ValidationError]) -> String {
    let errors = findings.iter().filter(|f| f.is_error()).count();
    let warnings = findings.len() - errors;

    let mut out = format!("{}\n\n", format_section_heading("Validation"));
    if findings.is_empty() {
        out.push_str(&format!("  {}\n", "No problems found".green()));
        return out;
    }

    let mut table = table_with_header(vec!["Severity", "Queue", "Property", "Message"]);
    for finding in findings {
        let severity = match finding.severity {
            Severity::Error => format!("{}", "error".red()),
            Severity::Warning => format!("{}", "warning".yellow()),
        };
        table.add_row(vec![
            severity,
            or_dash(finding.queue_path.as_deref()),
            or_dash(finding.property.as_deref()),
            finding.message.clone(),
        ]);
    }
    out.push_str(&format!("{}\n\n", table));
    out.push_str(&format!("{} error(s), {} warning(s)\n", errors, warnings));
    out
}

pub fn format_validation_json(findings: &[ValidationError]) -> Result<String, ApiError> {
    let errors = findings.iter().filter(|f| f.is_error()).count();
    let out = json!({
        "valid": errors == 0,
        "errors": errors,
        "warnings": findings.len() - errors,
        "findings": findings,
    });
    Ok(serde_json::to_string_pretty(&out)?)
}
