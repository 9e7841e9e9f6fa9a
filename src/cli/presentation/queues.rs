//! Queue presentation: discovered paths and effective properties.

use super::shared::{format_section_heading, or_dash, table_with_header};
use crate::error::ApiError;
use crate::manager::ConfigurationManager;
use crate::tree::PendingOperation;
use serde_json::json;

pub fn format_paths_text(paths: &[String]) -> String {
    let mut out = format!("{}\n\n", format_section_heading("Queue paths"));
    for path in paths {
        out.push_str(&format!("  {}\n", path));
    }
    out.push_str(&format!("\nTotal: {} queue(s)\n", paths.len()));
    out
}

pub fn format_paths_json(paths: &[String]) -> Result<String, ApiError> {
    Ok(serde_json::to_string_pretty(
        &json!({ "paths": paths, "total": paths.len() }),
    )?)
}

fn selected(manager: &ConfigurationManager, queue: Option<&str>) -> Result<Vec<String>, ApiError> {
    match queue {
        Some(path) => {
            if !manager.tree().contains(path) {
                return Err(crate::error::StructuralError::QueueNotFound(path.to_string()).into());
            }
            Ok(vec![path.to_string()])
        }
        None => Ok(manager.queue_paths()),
    }
}

/// One table per queue: simple key, effective value, staged marker.
pub fn format_properties_text(
    manager: &ConfigurationManager,
    queue: Option<&str>,
) -> Result<String, ApiError> {
    let mut out = String::new();
    for path in selected(manager, queue)? {
        let Some(node) = manager.tree().get(&path) else {
            continue;
        };
        let status = match node.pending_operation() {
            PendingOperation::None if !node.is_queue() => " (declared only)",
            PendingOperation::None => "",
            PendingOperation::Add => " (staged add)",
            PendingOperation::Update => " (staged update)",
            PendingOperation::Delete => " (staged removal)",
        };
        out.push_str(&format!("{}{}\n", format_section_heading(&path), status));

        let Some(effective) = manager.get_effective_simple_properties(&path) else {
            out.push('\n');
            continue;
        };
        if effective.is_empty() {
            out.push_str("  (no properties)\n\n");
            continue;
        }
        let mut table = table_with_header(vec!["Property", "Value", "Was"]);
        for (key, value) in &effective {
            let full = manager.mapper().to_full_key(key, &path);
            let was = if node.pending_properties().contains_key(&full) {
                or_dash(node.base_properties().get(&full).map(String::as_str))
            } else {
                String::new()
            };
            table.add_row(vec![key.clone(), value.clone(), was]);
        }
        out.push_str(&format!("{}\n\n", table));
    }
    Ok(out)
}

pub fn format_properties_json(
    manager: &ConfigurationManager,
    queue: Option<&str>,
) -> Result<String, ApiError> {
    let mut queues = Vec::new();
    for path in selected(manager, queue)? {
        let Some(node) = manager.tree().get(&path) else {
            continue;
        };
        queues.push(json!({
            "path": path,
            "pending_operation": format!("{:?}", node.pending_operation()),
            "is_queue": node.is_queue(),
            "properties": manager.get_effective_simple_properties(&path),
        }));
    }
    Ok(serde_json::to_string_pretty(&json!({ "queues": queues }))?)
}
