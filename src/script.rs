//! Change scripts: a JSON list of staging operations replayed against a manager.
//!
//! ```json
//! [
//!   {"op": "update", "queue": "root.a", "properties": {"capacity": "60"}},
//!   {"op": "group", "changes": [
//!     {"op": "update", "queue": "root.b", "properties": {"capacity": "40"}}
//!   ]},
//!   {"op": "global", "key": "maximum-applications", "value": "5000"},
//!   {"op": "undo"}
//! ]
//! ```

use crate::error::{ApiError, StructuralError};
use crate::manager::ConfigurationManager;
use crate::types::PropertyMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// One scripted staging operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum StagedChange {
    Add {
        queue: String,
        #[serde(default)]
        properties: PropertyMap,
    },
    Update {
        queue: String,
        properties: PropertyMap,
    },
    Delete {
        queue: String,
    },
    /// `key` may be full or relative to the property prefix
    Global {
        key: String,
        value: String,
    },
    /// Discard a queue change (optionally one property) or, with `global`, a
    /// staged global setting
    Discard {
        #[serde(default)]
        queue: Option<String>,
        #[serde(default)]
        property: Option<String>,
        #[serde(default)]
        global: Option<String>,
    },
    /// Apply as one undo unit; rolled back as a whole if any member fails
    Group {
        changes: Vec<StagedChange>,
    },
    Undo,
    Redo,
}

pub fn parse_script(json: &str) -> Result<Vec<StagedChange>, ApiError> {
    Ok(serde_json::from_str(json)?)
}

/// Apply every change in order. Stops at the first failure; changes applied
/// before it stay staged.
#[instrument(skip_all, fields(changes = changes.len()))]
pub fn apply_script(
    manager: &mut ConfigurationManager,
    changes: &[StagedChange],
) -> Result<(), ApiError> {
    for (index, change) in changes.iter().enumerate() {
        apply_change(manager, change)
            .map_err(|source| ApiError::ChangeScript { index, source })?;
    }
    debug!(changes = changes.len(), "Applied change script");
    Ok(())
}

fn apply_change(
    manager: &mut ConfigurationManager,
    change: &StagedChange,
) -> Result<(), StructuralError> {
    match change {
        StagedChange::Add { queue, properties } => manager.stage_add_queue(queue, properties),
        StagedChange::Update { queue, properties } => {
            manager.stage_update_queue(queue, properties)
        }
        StagedChange::Delete { queue } => manager.stage_delete_queue(queue),
        StagedChange::Global { key, value } => {
            let full = qualify(manager, key);
            manager.stage_global_update(&full, value)
        }
        StagedChange::Discard {
            queue,
            property,
            global,
        } => match (queue, global) {
            (Some(queue), None) => manager.discard_change(queue, property.as_deref()),
            (None, Some(key)) => {
                let full = qualify(manager, key);
                manager.discard_global_change(&full);
                Ok(())
            }
            _ => Err(StructuralError::MalformedKey(
                "discard needs exactly one of 'queue' or 'global'".to_string(),
            )),
        },
        StagedChange::Group { changes } => manager.stage_group(|m| {
            for change in changes {
                apply_change(m, change)?;
            }
            Ok(())
        }),
        StagedChange::Undo => manager.undo(),
        StagedChange::Redo => manager.redo(),
    }
}

fn qualify(manager: &ConfigurationManager, key: &str) -> String {
    let prefix = manager.mapper().prefix();
    if key.starts_with(prefix) {
        key.to_string()
    } else {
        format!("{}{}", prefix, key)
    }
}
