//! Typed view of a queue's property bag
//!
//! Recognized keys become typed fields; everything else is carried verbatim in
//! `custom`. Values that fail to convert are reported as [`PropertyIssue`]s and
//! left unset, so a single bad value never hides the rest of the record.

use crate::capacity::Capacity;
use crate::keys::{self, PropertyKeyMapper};
use crate::types::{PropertyMap, QUEUES_KEY};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Operational state of a queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QueueState {
    Running,
    Stopped,
    Draining,
}

impl FromStr for QueueState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RUNNING" => Ok(QueueState::Running),
            "STOPPED" => Ok(QueueState::Stopped),
            "DRAINING" => Ok(QueueState::Draining),
            other => Err(format!(
                "unknown queue state '{}' (expected RUNNING or STOPPED)",
                other
            )),
        }
    }
}

impl fmt::Display for QueueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueState::Running => write!(f, "RUNNING"),
            QueueState::Stopped => write!(f, "STOPPED"),
            QueueState::Draining => write!(f, "DRAINING"),
        }
    }
}

/// Value of `accessible-node-labels`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeLabelAccess {
    /// `*`: every label in the cluster
    Any,
    /// Explicit list; empty means the default partition only.
    Labels(BTreeSet<String>),
}

impl NodeLabelAccess {
    pub fn parse(raw: &str) -> Self {
        if raw.trim() == "*" {
            return NodeLabelAccess::Any;
        }
        NodeLabelAccess::Labels(
            raw.split(',')
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn allows(&self, label: &str) -> bool {
        match self {
            NodeLabelAccess::Any => true,
            NodeLabelAccess::Labels(labels) => labels.contains(label),
        }
    }
}

/// Capacities of one queue within one node-label partition
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelCapacities {
    pub capacity: Option<Capacity>,
    pub maximum_capacity: Option<Capacity>,
}

/// A value that could not be converted to its typed field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyIssue {
    /// Simple key of the offending property
    pub property: String,
    pub message: String,
}

/// Typed queue properties plus an opaque side-map for unrecognized keys
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueProperties {
    pub capacity: Option<Capacity>,
    pub maximum_capacity: Option<Capacity>,
    pub state: Option<QueueState>,
    pub child_queues: Vec<String>,
    pub accessible_node_labels: Option<NodeLabelAccess>,
    pub label_capacities: BTreeMap<String, LabelCapacities>,
    pub default_node_label_expression: Option<String>,
    pub legacy_auto_create: bool,
    pub flexible_auto_create: bool,
    pub user_limit_factor: Option<f64>,
    pub minimum_user_limit_percent: Option<f64>,
    pub maximum_applications: Option<u64>,
    pub maximum_am_resource_percent: Option<f64>,
    pub ordering_policy: Option<String>,
    pub priority: Option<i32>,
    pub acl_submit_applications: Option<String>,
    pub acl_administer_queue: Option<String>,
    pub disable_preemption: Option<bool>,
    pub custom: PropertyMap,
}

impl QueueProperties {
    /// Build from full keys belonging to `queue_path`. Keys that do not belong to
    /// the queue are ignored.
    pub fn from_full(
        map: &PropertyMap,
        mapper: &PropertyKeyMapper,
        queue_path: &str,
    ) -> (Self, Vec<PropertyIssue>) {
        let simple: PropertyMap = map
            .iter()
            .filter_map(|(k, v)| {
                mapper
                    .to_simple_key(k, queue_path)
                    .map(|simple| (simple, v.clone()))
            })
            .collect();
        Self::from_simple(&simple)
    }

    /// Build from simple (queue-relative) keys.
    pub fn from_simple(map: &PropertyMap) -> (Self, Vec<PropertyIssue>) {
        let mut props = QueueProperties::default();
        let mut issues = Vec::new();
        let mut issue = |property: &str, message: String| {
            issues.push(PropertyIssue {
                property: property.to_string(),
                message,
            })
        };

        for (key, value) in map {
            match key.as_str() {
                "capacity" => props.capacity = capacity(key, value, &mut issue),
                "maximum-capacity" => props.maximum_capacity = capacity(key, value, &mut issue),
                "state" => match value.parse() {
                    Ok(state) => props.state = Some(state),
                    Err(message) => issue(key, message),
                },
                QUEUES_KEY => {
                    props.child_queues = value
                        .split(',')
                        .map(str::trim)
                        .filter(|c| !c.is_empty())
                        .map(str::to_string)
                        .collect()
                }
                "accessible-node-labels" => {
                    props.accessible_node_labels = Some(NodeLabelAccess::parse(value))
                }
                "default-node-label-expression" => {
                    props.default_node_label_expression = non_blank(value)
                }
                "auto-create-child-queue.enabled" => {
                    props.legacy_auto_create = boolean(key, value, &mut issue).unwrap_or(false)
                }
                "auto-queue-creation-v2.enabled" => {
                    props.flexible_auto_create = boolean(key, value, &mut issue).unwrap_or(false)
                }
                "user-limit-factor" => props.user_limit_factor = number(key, value, &mut issue),
                "minimum-user-limit-percent" => {
                    props.minimum_user_limit_percent = number(key, value, &mut issue)
                }
                "maximum-applications" => {
                    props.maximum_applications = number(key, value, &mut issue)
                }
                "maximum-am-resource-percent" => {
                    props.maximum_am_resource_percent = number(key, value, &mut issue)
                }
                "ordering-policy" => props.ordering_policy = non_blank(value),
                "priority" => props.priority = number(key, value, &mut issue),
                "acl_submit_applications" => props.acl_submit_applications = Some(value.clone()),
                "acl_administer_queue" => props.acl_administer_queue = Some(value.clone()),
                "disable_preemption" => {
                    props.disable_preemption = boolean(key, value, &mut issue)
                }
                other => match keys::parse_label_key(other) {
                    Some((label, field)) => {
                        let parsed = capacity(key, value, &mut issue);
                        let entry = props.label_capacities.entry(label.to_string()).or_default();
                        if field == "capacity" {
                            entry.capacity = parsed;
                        } else {
                            entry.maximum_capacity = parsed;
                        }
                    }
                    None => {
                        props.custom.insert(key.clone(), value.clone());
                    }
                },
            }
        }
        (props, issues)
    }
}

fn capacity(key: &str, value: &str, issue: &mut impl FnMut(&str, String)) -> Option<Capacity> {
    match Capacity::parse(value) {
        Ok(cap) => Some(cap),
        Err(e) => {
            issue(key, e.to_string());
            None
        }
    }
}

fn number<T: FromStr>(key: &str, value: &str, issue: &mut impl FnMut(&str, String)) -> Option<T> {
    match value.trim().parse() {
        Ok(n) => Some(n),
        Err(_) => {
            issue(key, format!("'{}' is not a valid number", value));
            None
        }
    }
}

fn boolean(key: &str, value: &str, issue: &mut impl FnMut(&str, String)) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => {
            issue(key, format!("'{}' is not true or false", value));
            None
        }
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
