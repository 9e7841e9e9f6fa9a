//! Read-only collaborators consulted by the validator

use crate::error::ApiError;
use crate::properties::QueueState;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Authoritative cluster node labels
pub trait NodeLabelSource {
    /// Every label defined in the cluster
    fn cluster_labels(&self) -> BTreeSet<String>;

    /// Labels assigned to each node, keyed by node id
    fn node_labels(&self) -> BTreeMap<String, BTreeSet<String>>;
}

/// Live per-queue runtime state
pub trait RuntimeStateSource {
    fn active_applications(&self, queue_path: &str) -> u64;

    fn operational_state(&self, queue_path: &str) -> Option<QueueState>;
}

/// Label set as served by the cluster's node-label endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterLabels {
    #[serde(default)]
    pub labels: BTreeSet<String>,
    #[serde(default)]
    pub nodes: BTreeMap<String, BTreeSet<String>>,
}

impl ClusterLabels {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
            nodes: BTreeMap::new(),
        }
    }

    pub fn assign(mut self, node: &str, labels: &[&str]) -> Self {
        self.nodes.insert(
            node.to_string(),
            labels.iter().map(|l| l.to_string()).collect(),
        );
        self
    }

    pub fn from_json(json: &str) -> Result<Self, ApiError> {
        serde_json::from_str(json).map_err(|e| ApiError::Snapshot(e.to_string()))
    }
}

impl NodeLabelSource for ClusterLabels {
    fn cluster_labels(&self) -> BTreeSet<String> {
        self.labels.clone()
    }

    fn node_labels(&self) -> BTreeMap<String, BTreeSet<String>> {
        self.nodes.clone()
    }
}

/// Label source for clusters without node labels
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLabels;

impl NodeLabelSource for NoLabels {
    fn cluster_labels(&self) -> BTreeSet<String> {
        BTreeSet::new()
    }

    fn node_labels(&self) -> BTreeMap<String, BTreeSet<String>> {
        BTreeMap::new()
    }
}

/// Runtime source for offline validation: no applications, no live state
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRuntime;

impl RuntimeStateSource for NoRuntime {
    fn active_applications(&self, _queue_path: &str) -> u64 {
        0
    }

    fn operational_state(&self, _queue_path: &str) -> Option<QueueState> {
        None
    }
}
