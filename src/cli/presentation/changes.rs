//! Pending change presentation.

use super::shared::{format_section_heading, or_dash, table_with_header};
use crate::error::ApiError;
use crate::manager::PendingChange;
use serde_json::json;

pub fn format_pending_changes_text(rows: &[PendingChange]) -> String {
    let mut out = format!("{}\n\n", format_section_heading("Staged changes"));
    if rows.is_empty() {
        out.push_str("  No staged changes\n");
        return out;
    }
    let mut table = table_with_header(vec!["Change", "Queue", "Property", "Old", "New"]);
    for row in rows {
        table.add_row(vec![
            row.kind.to_string(),
            or_dash(row.queue_path.as_deref()),
            or_dash(row.property.as_deref()),
            or_dash(row.old.as_deref()),
            or_dash(row.new.as_deref()),
        ]);
    }
    out.push_str(&format!("{}\n\nTotal: {} change(s)\n", table, rows.len()));
    out
}

pub fn format_pending_changes_json(rows: &[PendingChange]) -> Result<String, ApiError> {
    Ok(serde_json::to_string_pretty(
        &json!({ "changes": rows, "total": rows.len() }),
    )?)
}
