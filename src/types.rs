//! Shared type aliases and constants.

use std::collections::BTreeMap;

/// Property key → raw value. Ordered so payloads and diffs are deterministic.
pub type PropertyMap = BTreeMap<String, String>;

/// Name of the top-level queue; reserved to depth 0.
pub const ROOT_QUEUE: &str = "root";

/// Prefix shared by every capacity-scheduler property key.
pub const DEFAULT_PROPERTY_PREFIX: &str = "yarn.scheduler.capacity.";

/// Simple key that declares a queue's children.
pub const QUEUES_KEY: &str = "queues";

/// How strongly a finding blocks an apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}
