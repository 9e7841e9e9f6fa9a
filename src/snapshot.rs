//! Read-only inputs from the remote configuration service
//!
//! The structural snapshot describes the live queue hierarchy with runtime
//! metrics; raw properties are the flat `{name, value}` configuration list.

use crate::collaborators::RuntimeStateSource;
use crate::error::ApiError;
use crate::properties::QueueState;
use crate::tree::path;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One queue in the structural snapshot, with its children nested
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSnapshot {
    pub queue_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default)]
    pub num_applications: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_capacity: Option<f64>,
    #[serde(default)]
    pub children: Vec<QueueSnapshot>,
}

impl QueueSnapshot {
    /// A bare queue with no metrics
    pub fn named(queue_name: impl Into<String>) -> Self {
        Self {
            queue_name: queue_name.into(),
            queue_path: None,
            state: None,
            num_applications: 0,
            capacity: None,
            used_capacity: None,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<QueueSnapshot>) -> Self {
        self.children = children;
        self
    }

    pub fn with_runtime(mut self, state: &str, num_applications: u64) -> Self {
        self.state = Some(state.to_string());
        self.num_applications = num_applications;
        self
    }

    pub fn from_json(json: &str) -> Result<Self, ApiError> {
        serde_json::from_str(json).map_err(|e| ApiError::Snapshot(e.to_string()))
    }

    /// Every queue paired with its full path, preorder. Paths are derived from
    /// names; `queue_path`, when present, is only cross-checked by the builder.
    pub fn flatten(&self) -> Vec<(String, &QueueSnapshot)> {
        let mut out = Vec::new();
        let mut stack = vec![(self.queue_name.clone(), self)];
        while let Some((queue_path, queue)) = stack.pop() {
            for child in queue.children.iter().rev() {
                stack.push((path::join(&queue_path, &child.queue_name), child));
            }
            out.push((queue_path, queue));
        }
        out
    }
}

/// One raw configuration entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawProperty {
    pub name: String,
    pub value: String,
}

impl RawProperty {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPropertyDocument {
    Wrapped { property: Vec<RawProperty> },
    Bare(Vec<RawProperty>),
}

/// Parse `{"property": [...]}` or a bare `[...]` of `{name, value}` entries.
pub fn parse_raw_properties(json: &str) -> Result<Vec<RawProperty>, ApiError> {
    let doc: RawPropertyDocument =
        serde_json::from_str(json).map_err(|e| ApiError::Snapshot(e.to_string()))?;
    Ok(match doc {
        RawPropertyDocument::Wrapped { property } => property,
        RawPropertyDocument::Bare(list) => list,
    })
}

/// Runtime state indexed by queue path, taken from a structural snapshot
#[derive(Debug, Clone, Default)]
pub struct SnapshotRuntime {
    queues: HashMap<String, (Option<QueueState>, u64)>,
}

impl SnapshotRuntime {
    pub fn from_snapshot(snapshot: &QueueSnapshot) -> Self {
        let queues = snapshot
            .flatten()
            .into_iter()
            .map(|(queue_path, q)| {
                let state = q.state.as_deref().and_then(|s| s.parse().ok());
                (queue_path, (state, q.num_applications))
            })
            .collect();
        Self { queues }
    }
}

impl RuntimeStateSource for SnapshotRuntime {
    fn active_applications(&self, queue_path: &str) -> u64 {
        self.queues.get(queue_path).map(|(_, n)| *n).unwrap_or(0)
    }

    fn operational_state(&self, queue_path: &str) -> Option<QueueState> {
        self.queues.get(queue_path).and_then(|(s, _)| *s)
    }
}
