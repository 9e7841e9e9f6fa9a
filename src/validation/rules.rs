//! Individual validation rules. Each rule appends findings and never fails.

use super::{LabelContext, NodeView, ValidationError, ValidationPolicy};
use crate::capacity::{self, CapacityMode, CapacityValue, ResourceAmount};
use crate::collaborators::RuntimeStateSource;
use crate::keys;
use crate::manager::ConfigurationManager;
use crate::properties::{NodeLabelAccess, QueueState};
use crate::tree::PendingOperation;
use crate::types::{Severity, QUEUES_KEY, ROOT_QUEUE};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};

/// Values that failed typed conversion
pub(crate) fn property_issues(view: &NodeView<'_>, findings: &mut Vec<ValidationError>) {
    for issue in &view.issues {
        findings.push(ValidationError::error(
            Some(view.path()),
            Some(issue.property.as_str()),
            issue.message.clone(),
        ));
    }
}

pub(crate) fn naming(pattern: &Regex, view: &NodeView<'_>, findings: &mut Vec<ValidationError>) {
    if view.node.depth() == 0 {
        return;
    }
    let segment = view.node.segment();
    if segment == ROOT_QUEUE {
        findings.push(ValidationError::error(
            Some(view.path()),
            None,
            "queue name 'root' is reserved for the top-level queue",
        ));
    } else if !pattern.is_match(segment) {
        findings.push(ValidationError::error(
            Some(view.path()),
            None,
            format!(
                "queue name '{}' does not match pattern {}",
                segment,
                pattern.as_str()
            ),
        ));
    }
}

pub(crate) fn sibling_names(
    parent: &NodeView<'_>,
    children: &[NodeView<'_>],
    findings: &mut Vec<ValidationError>,
) {
    let mut exact: BTreeMap<&str, usize> = BTreeMap::new();
    for declared in &parent.props.child_queues {
        *exact.entry(declared.as_str()).or_default() += 1;
    }

    let mut folded: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for child in children.iter().filter(|c| !c.node.is_deleted()) {
        let segment = child.node.segment();
        folded
            .entry(segment.to_lowercase())
            .or_default()
            .push(segment);
    }

    for (segment, count) in &exact {
        if *count > 1 {
            findings.push(ValidationError::error(
                Some(parent.path()),
                Some(QUEUES_KEY),
                format!("child queue '{}' is declared {} times", segment, count),
            ));
        }
    }
    for names in folded.values() {
        let distinct: BTreeSet<&str> = names.iter().copied().collect();
        if distinct.len() > 1 {
            let listed: Vec<&str> = distinct.into_iter().collect();
            findings.push(ValidationError::warning(
                Some(parent.path()),
                Some(QUEUES_KEY),
                format!(
                    "child queue names differ only by case: {}",
                    listed.join(", ")
                ),
            ));
        }
    }
}

/// Range and mode-compatibility checks on the node's own capacity values
pub(crate) fn capacity_ranges(
    view: &NodeView<'_>,
    sibling_modes: &[CapacityMode],
    findings: &mut Vec<ValidationError>,
) {
    let props = &view.props;
    if let Some(cap) = &props.capacity {
        push_capacity_issues(view, "capacity", capacity::validate(cap.value(), sibling_modes), findings);
    }
    if let Some(max) = &props.maximum_capacity {
        push_capacity_issues(view, "maximum-capacity", capacity::validate(max.value(), &[]), findings);
    }
    check_max_not_below(
        view,
        "maximum-capacity",
        props.capacity.as_ref().map(|c| c.value()),
        props.maximum_capacity.as_ref().map(|c| c.value()),
        findings,
    );

    for (label, caps) in &props.label_capacities {
        let cap_key = keys::label_key(label, "capacity");
        let max_key = keys::label_key(label, "maximum-capacity");
        if let Some(cap) = &caps.capacity {
            push_capacity_issues(view, &cap_key, capacity::validate(cap.value(), &[]), findings);
        }
        if let Some(max) = &caps.maximum_capacity {
            push_capacity_issues(view, &max_key, capacity::validate(max.value(), &[]), findings);
        }
        check_max_not_below(
            view,
            &max_key,
            caps.capacity.as_ref().map(|c| c.value()),
            caps.maximum_capacity.as_ref().map(|c| c.value()),
            findings,
        );
    }
}

fn push_capacity_issues(
    view: &NodeView<'_>,
    property: &str,
    issues: Vec<capacity::CapacityIssue>,
    findings: &mut Vec<ValidationError>,
) {
    for issue in issues {
        findings.push(ValidationError::new(
            issue.severity,
            Some(view.path()),
            Some(property),
            issue.message,
        ));
    }
}

fn check_max_not_below(
    view: &NodeView<'_>,
    property: &str,
    capacity: Option<&CapacityValue>,
    maximum: Option<&CapacityValue>,
    findings: &mut Vec<ValidationError>,
) {
    let (Some(cap), Some(max)) = (
        capacity.and_then(CapacityValue::as_percentage),
        maximum.and_then(CapacityValue::as_percentage),
    ) else {
        return;
    };
    if max < cap {
        findings.push(ValidationError::error(
            Some(view.path()),
            Some(property),
            format!("maximum capacity {}% is below capacity {}%", max, cap),
        ));
    }
}

/// Numeric limits on recognized per-queue settings
pub(crate) fn limits(view: &NodeView<'_>, findings: &mut Vec<ValidationError>) {
    let props = &view.props;
    if let Some(v) = props.maximum_am_resource_percent {
        if !(0.0..=1.0).contains(&v) {
            findings.push(ValidationError::error(
                Some(view.path()),
                Some("maximum-am-resource-percent"),
                format!("{} is outside 0-1", v),
            ));
        }
    }
    if let Some(v) = props.minimum_user_limit_percent {
        if v <= 0.0 || v > 100.0 {
            findings.push(ValidationError::error(
                Some(view.path()),
                Some("minimum-user-limit-percent"),
                format!("{} is outside (0, 100]", v),
            ));
        }
    }
    if let Some(v) = props.user_limit_factor {
        if v <= 0.0 && v != -1.0 {
            findings.push(ValidationError::error(
                Some(view.path()),
                Some("user-limit-factor"),
                format!("{} must be greater than 0, or -1 for unlimited", v),
            ));
        }
    }
}

/// Label references against the cluster label set and the queue's own access list
pub(crate) fn label_access(
    labels: &LabelContext,
    view: &NodeView<'_>,
    findings: &mut Vec<ValidationError>,
) {
    if view.node.is_deleted() {
        return;
    }
    let props = &view.props;

    if let Some(cluster) = &labels.cluster_labels {
        if let Some(NodeLabelAccess::Labels(accessible)) = &props.accessible_node_labels {
            for label in accessible {
                if !cluster.contains(label) {
                    findings.push(ValidationError::error(
                        Some(view.path()),
                        Some("accessible-node-labels"),
                        format!("node label '{}' is not defined in the cluster", label),
                    ));
                } else if labels.nodes_per_label.get(label) == Some(&0) {
                    findings.push(ValidationError::warning(
                        Some(view.path()),
                        Some("accessible-node-labels"),
                        format!("no cluster node carries label '{}'", label),
                    ));
                }
            }
        }
        for label in props.label_capacities.keys() {
            if !cluster.contains(label) {
                findings.push(ValidationError::error(
                    Some(view.path()),
                    Some(keys::label_key(label, "capacity").as_str()),
                    format!("node label '{}' is not defined in the cluster", label),
                ));
            }
        }
        if let Some(expression) = &props.default_node_label_expression {
            if !cluster.contains(expression) {
                findings.push(ValidationError::error(
                    Some(view.path()),
                    Some("default-node-label-expression"),
                    format!("node label '{}' is not defined in the cluster", expression),
                ));
            }
        }
    }

    if let Some(access) = &props.accessible_node_labels {
        for label in props.label_capacities.keys() {
            if !access.allows(label) {
                findings.push(ValidationError::warning(
                    Some(view.path()),
                    Some(keys::label_key(label, "capacity").as_str()),
                    format!(
                        "capacity set for label '{}' which the queue cannot access",
                        label
                    ),
                ));
            }
        }
        if let Some(expression) = &props.default_node_label_expression {
            if !access.allows(expression) {
                findings.push(ValidationError::error(
                    Some(view.path()),
                    Some("default-node-label-expression"),
                    format!("default label '{}' is not accessible to the queue", expression),
                ));
            }
        }
    }
}

pub(crate) fn auto_creation(view: &NodeView<'_>, findings: &mut Vec<ValidationError>) {
    if view.props.legacy_auto_create && view.props.flexible_auto_create {
        findings.push(ValidationError::error(
            Some(view.path()),
            Some("auto-queue-creation-v2.enabled"),
            "legacy and flexible auto queue creation cannot both be enabled",
        ));
    }
}

/// An added queue's parent must exist and not be staged for deletion
pub(crate) fn parent_existence(
    manager: &ConfigurationManager,
    view: &NodeView<'_>,
    findings: &mut Vec<ValidationError>,
) {
    if view.node.pending_operation() != PendingOperation::Add {
        return;
    }
    let Some(parent) = view.node.parent() else {
        return;
    };
    match manager.tree().get(parent) {
        None => findings.push(ValidationError::error(
            Some(view.path()),
            None,
            format!("parent queue {} does not exist", parent),
        )),
        Some(node) if node.is_deleted() => findings.push(ValidationError::error(
            Some(view.path()),
            None,
            format!("parent queue {} is staged for deletion", parent),
        )),
        Some(_) => {}
    }
}

/// A queue cannot be stopped while it still runs applications
pub(crate) fn stop_transition(
    runtime: Option<&dyn RuntimeStateSource>,
    manager: &ConfigurationManager,
    view: &NodeView<'_>,
    findings: &mut Vec<ValidationError>,
) {
    if view.node.is_deleted() || view.props.state != Some(QueueState::Stopped) {
        return;
    }
    let Some(runtime) = runtime else {
        return;
    };
    let current = runtime.operational_state(view.path()).unwrap_or_else(|| {
        let key = manager.mapper().to_full_key("state", view.path());
        view.node
            .base_properties()
            .get(&key)
            .and_then(|s| s.parse().ok())
            .unwrap_or(QueueState::Running)
    });
    if current == QueueState::Stopped {
        return;
    }
    let active = runtime.active_applications(view.path());
    if active > 0 {
        findings.push(ValidationError::error(
            Some(view.path()),
            Some("state"),
            format!("cannot stop queue with {} active applications", active),
        ));
    }
}

/// Preconditions for a queue staged for deletion
pub(crate) fn deletion(
    runtime: Option<&dyn RuntimeStateSource>,
    view: &NodeView<'_>,
    children: &[NodeView<'_>],
    findings: &mut Vec<ValidationError>,
) {
    if !view.node.is_deleted() {
        return;
    }
    if view.props.state != Some(QueueState::Stopped) {
        findings.push(ValidationError::error(
            Some(view.path()),
            Some("state"),
            "queue must be STOPPED before it can be removed",
        ));
    }
    if let Some(runtime) = runtime {
        let active = runtime.active_applications(view.path());
        if active > 0 {
            findings.push(ValidationError::error(
                Some(view.path()),
                None,
                format!("cannot remove queue with {} active applications", active),
            ));
        }
    }
    let live: Vec<&str> = children
        .iter()
        .filter(|c| !c.node.is_deleted())
        .map(|c| c.path())
        .collect();
    if !live.is_empty() {
        findings.push(ValidationError::error(
            Some(view.path()),
            None,
            format!("child queues are not staged for removal: {}", live.join(", ")),
        ));
    }
}

/// One child's contribution to a sibling sum
enum Share<'c> {
    Missing,
    Invalid,
    Value(&'c CapacityValue),
}

fn share<'c>(child: &'c NodeView<'_>, property: &str, value: Option<&'c CapacityValue>) -> Share<'c> {
    match value {
        Some(v) => Share::Value(v),
        None if child.has_issue(property) => Share::Invalid,
        None => Share::Missing,
    }
}

/// Sum rule for the unlabeled partition
pub(crate) fn capacity_sums(
    policy: &ValidationPolicy,
    parent: &NodeView<'_>,
    children: &[&NodeView<'_>],
    findings: &mut Vec<ValidationError>,
) {
    let shares: Vec<Share<'_>> = children
        .iter()
        .map(|c| share(c, "capacity", c.props.capacity.as_ref().map(|cap| cap.value())))
        .collect();
    check_sum(policy, parent.path(), "capacity", &shares, findings);
}

/// Sum rule evaluated independently per node label. A child takes part when
/// it sets a capacity for the label or lists the label as accessible.
pub(crate) fn label_capacity_sums(
    policy: &ValidationPolicy,
    parent: &NodeView<'_>,
    children: &[&NodeView<'_>],
    findings: &mut Vec<ValidationError>,
) {
    let mut labels: BTreeSet<&str> = BTreeSet::new();
    for child in children {
        labels.extend(child.props.label_capacities.keys().map(String::as_str));
        if let Some(NodeLabelAccess::Labels(accessible)) = &child.props.accessible_node_labels {
            labels.extend(accessible.iter().map(String::as_str));
        }
    }

    for label in labels {
        let property = keys::label_key(label, "capacity");
        let shares: Vec<Share<'_>> = children
            .iter()
            .filter(|c| {
                c.props.label_capacities.contains_key(label)
                    || matches!(&c.props.accessible_node_labels, Some(NodeLabelAccess::Labels(l)) if l.contains(label))
            })
            .map(|c| {
                let value = c
                    .props
                    .label_capacities
                    .get(label)
                    .and_then(|caps| caps.capacity.as_ref())
                    .map(|cap| cap.value());
                share(c, &property, value)
            })
            .collect();
        check_sum(policy, parent.path(), &property, &shares, findings);
    }
}

/// All-percentage sets must total 100 (or 0 when allowed). A set with any
/// weight, or a mix of modes, is exempt. An all-absolute set is checked per
/// resource dimension where every child expresses that dimension as a
/// percentage.
fn check_sum(
    policy: &ValidationPolicy,
    parent: &str,
    property: &str,
    shares: &[Share<'_>],
    findings: &mut Vec<ValidationError>,
) {
    if shares.is_empty() || shares.iter().any(|s| matches!(s, Share::Invalid)) {
        return;
    }

    let mut percentages = Vec::with_capacity(shares.len());
    let mut vectors = Vec::with_capacity(shares.len());
    for s in shares {
        match s {
            Share::Missing => percentages.push(0.0),
            Share::Value(CapacityValue::Percentage(p)) => percentages.push(*p),
            Share::Value(CapacityValue::Absolute(v)) => vectors.push(v),
            Share::Value(CapacityValue::Weight(_)) | Share::Invalid => return,
        }
    }

    if vectors.is_empty() {
        check_total(policy, parent, property, percentages.iter().sum(), findings);
        return;
    }
    if !percentages.is_empty() {
        return;
    }

    let mut dimensions: Vec<&str> = Vec::new();
    for vector in &vectors {
        for (name, _) in vector.iter() {
            if !dimensions.contains(&name) {
                dimensions.push(name);
            }
        }
    }
    for name in dimensions {
        let amounts: Option<Vec<f64>> = vectors
            .iter()
            .map(|v| match v.get(name) {
                Some(ResourceAmount::Percentage(p)) => Some(p),
                _ => None,
            })
            .collect();
        if let Some(amounts) = amounts {
            let dimension = format!("{}[{}]", property, name);
            check_total(policy, parent, &dimension, amounts.iter().sum(), findings);
        }
    }
}

fn check_total(
    policy: &ValidationPolicy,
    parent: &str,
    property: &str,
    total: f64,
    findings: &mut Vec<ValidationError>,
) {
    if (total - 100.0).abs() <= policy.capacity_epsilon {
        return;
    }
    if policy.allow_zero_sum && total.abs() <= policy.capacity_epsilon {
        return;
    }
    findings.push(ValidationError::error(
        Some(parent),
        Some(property),
        format!(
            "child capacities sum to {}%, expected 100%",
            (total * 1000.0).round() / 1000.0
        ),
    ));
}

/// Cluster-wide settings held under the bare prefix
pub(crate) fn check_globals(manager: &ConfigurationManager, findings: &mut Vec<ValidationError>) {
    let prefix = manager.mapper().prefix();
    let globals = manager.effective_global_properties();

    let key = format!("{}maximum-applications", prefix);
    if let Some(value) = globals.get(&key) {
        if value.trim().parse::<u64>().is_err() {
            findings.push(ValidationError::new(
                Severity::Error,
                None,
                Some(key.as_str()),
                format!("'{}' is not a non-negative integer", value),
            ));
        }
    }

    let key = format!("{}maximum-am-resource-percent", prefix);
    if let Some(value) = globals.get(&key) {
        match value.trim().parse::<f64>() {
            Ok(v) if (0.0..=1.0).contains(&v) => {}
            _ => findings.push(ValidationError::error(
                None,
                Some(key.as_str()),
                format!("'{}' must be a number between 0 and 1", value),
            )),
        }
    }
}
