//! Validator
//!
//! One depth-first pass over the effective tree. Every node is visited once;
//! findings are accumulated and never short-circuit. Validation only reads the
//! manager and never mutates it.

mod rules;

use crate::collaborators::{NodeLabelSource, RuntimeStateSource};
use crate::error::ApiError;
use crate::manager::ConfigurationManager;
use crate::properties::{PropertyIssue, QueueProperties};
use crate::tree::QueueNode;
use crate::types::Severity;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Instant;
use tracing::{info, instrument};

/// A semantic finding. `queue_path` is absent for global findings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub queue_path: Option<String>,
    pub property: Option<String>,
    pub message: String,
    pub severity: Severity,
}

impl ValidationError {
    pub fn new(
        severity: Severity,
        queue_path: Option<&str>,
        property: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            queue_path: queue_path.map(str::to_string),
            property: property.map(str::to_string),
            message: message.into(),
            severity,
        }
    }

    pub fn error(queue_path: Option<&str>, property: Option<&str>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, queue_path, property, message)
    }

    pub fn warning(
        queue_path: Option<&str>,
        property: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Warning, queue_path, property, message)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.severity)?;
        match (&self.queue_path, &self.property) {
            (Some(q), Some(p)) => write!(f, "{} ({}): ", q, p)?,
            (Some(q), None) => write!(f, "{}: ", q)?,
            (None, Some(p)) => write!(f, "{}: ", p)?,
            (None, None) => write!(f, "global: ")?,
        }
        f.write_str(&self.message)
    }
}

/// True if any finding has error severity
pub fn has_blocking_errors(findings: &[ValidationError]) -> bool {
    findings.iter().any(ValidationError::is_error)
}

/// Tunable validation rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationPolicy {
    /// Allowed deviation from 100 for all-percentage sibling sets
    #[serde(default = "default_epsilon")]
    pub capacity_epsilon: f64,

    /// Accept all-percentage sibling sets that sum to zero
    #[serde(default)]
    pub allow_zero_sum: bool,

    /// Pattern every queue segment below the root must match
    #[serde(default = "default_queue_name_pattern")]
    pub queue_name_pattern: String,
}

fn default_epsilon() -> f64 {
    0.01
}

fn default_queue_name_pattern() -> String {
    "^[A-Za-z0-9_-]+$".to_string()
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            capacity_epsilon: default_epsilon(),
            allow_zero_sum: false,
            queue_name_pattern: default_queue_name_pattern(),
        }
    }
}

impl ValidationPolicy {
    pub fn validate(&self) -> Result<(), String> {
        if !self.capacity_epsilon.is_finite() || self.capacity_epsilon < 0.0 {
            return Err(format!(
                "capacity_epsilon must be a non-negative number, got {}",
                self.capacity_epsilon
            ));
        }
        Regex::new(&self.queue_name_pattern)
            .map_err(|e| format!("queue_name_pattern is not a valid regex: {}", e))?;
        Ok(())
    }
}

/// A queue node paired with its typed effective properties
pub(crate) struct NodeView<'t> {
    pub node: &'t QueueNode,
    pub props: QueueProperties,
    pub issues: Vec<PropertyIssue>,
}

impl<'t> NodeView<'t> {
    /// Properties are base overlaid by pending even for deleted nodes, so
    /// deletion preconditions see the state the queue would be removed in.
    fn of(manager: &ConfigurationManager, node: &'t QueueNode) -> Self {
        let (props, issues) =
            QueueProperties::from_full(&node.merged_properties(), manager.mapper(), node.full_path());
        Self {
            node,
            props,
            issues,
        }
    }

    pub fn path(&self) -> &str {
        self.node.full_path()
    }

    pub fn has_issue(&self, property: &str) -> bool {
        self.issues.iter().any(|i| i.property == property)
    }
}

/// Label data gathered once per run
pub(crate) struct LabelContext {
    pub cluster_labels: Option<BTreeSet<String>>,
    /// label → number of nodes carrying it; empty when no node map was supplied
    pub nodes_per_label: BTreeMap<String, usize>,
}

/// Validates a manager's effective tree
pub struct Validator<'a> {
    policy: ValidationPolicy,
    name_pattern: Regex,
    labels: Option<&'a dyn NodeLabelSource>,
    runtime: Option<&'a dyn RuntimeStateSource>,
}

impl<'a> Validator<'a> {
    pub fn new(policy: ValidationPolicy) -> Result<Self, ApiError> {
        policy.validate().map_err(ApiError::ConfigError)?;
        let name_pattern = Regex::new(&policy.queue_name_pattern)
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;
        Ok(Self {
            policy,
            name_pattern,
            labels: None,
            runtime: None,
        })
    }

    /// Check label references against the cluster's label set.
    pub fn with_labels(mut self, labels: &'a dyn NodeLabelSource) -> Self {
        self.labels = Some(labels);
        self
    }

    /// Gate deletion and stop transitions on live application counts.
    pub fn with_runtime(mut self, runtime: &'a dyn RuntimeStateSource) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    /// Run every rule and return all findings, hydration warnings first.
    #[instrument(skip_all, fields(queues = manager.tree().len()))]
    pub fn validate(&self, manager: &ConfigurationManager) -> Vec<ValidationError> {
        let start = Instant::now();
        let mut findings = manager.hydration_warnings().to_vec();
        let labels = self.label_context();

        let root = NodeView::of(manager, manager.tree().root());
        self.visit(manager, &labels, root, &[], &mut findings);
        rules::check_globals(manager, &mut findings);

        info!(
            findings = findings.len(),
            errors = findings.iter().filter(|f| f.is_error()).count(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Validation complete"
        );
        findings
    }

    fn label_context(&self) -> LabelContext {
        let Some(source) = self.labels else {
            return LabelContext {
                cluster_labels: None,
                nodes_per_label: BTreeMap::new(),
            };
        };
        let mut nodes_per_label: BTreeMap<String, usize> = BTreeMap::new();
        let node_labels = source.node_labels();
        if !node_labels.is_empty() {
            let cluster = source.cluster_labels();
            for label in &cluster {
                nodes_per_label.insert(label.clone(), 0);
            }
            for labels in node_labels.values() {
                for label in labels {
                    *nodes_per_label.entry(label.clone()).or_default() += 1;
                }
            }
        }
        LabelContext {
            cluster_labels: Some(source.cluster_labels()),
            nodes_per_label,
        }
    }

    fn visit(
        &self,
        manager: &ConfigurationManager,
        labels: &LabelContext,
        view: NodeView<'_>,
        sibling_modes: &[crate::capacity::CapacityMode],
        findings: &mut Vec<ValidationError>,
    ) {
        rules::property_issues(&view, findings);
        rules::naming(&self.name_pattern, &view, findings);
        rules::capacity_ranges(&view, sibling_modes, findings);
        rules::limits(&view, findings);
        rules::label_access(labels, &view, findings);
        rules::auto_creation(&view, findings);
        rules::parent_existence(manager, &view, findings);
        rules::stop_transition(self.runtime, manager, &view, findings);

        let children: Vec<NodeView<'_>> = manager
            .tree()
            .children(view.path())
            .into_iter()
            .map(|c| NodeView::of(manager, c))
            .collect();

        rules::deletion(self.runtime, &view, &children, findings);
        rules::sibling_names(&view, &children, findings);

        let effective: Vec<&NodeView<'_>> =
            children.iter().filter(|c| !c.node.is_deleted()).collect();
        rules::capacity_sums(&self.policy, &view, &effective, findings);
        rules::label_capacity_sums(&self.policy, &view, &effective, findings);

        let modes: Vec<(&str, crate::capacity::CapacityMode)> = effective
            .iter()
            .filter_map(|c| c.props.capacity.as_ref().map(|cap| (c.path(), cap.mode())))
            .collect();
        let child_modes: Vec<Vec<crate::capacity::CapacityMode>> = children
            .iter()
            .map(|c| {
                if c.node.is_deleted() {
                    return Vec::new();
                }
                modes
                    .iter()
                    .filter(|(p, _)| *p != c.path())
                    .map(|(_, m)| *m)
                    .collect()
            })
            .collect();

        for (child, sibling_modes) in children.into_iter().zip(child_modes) {
            self.visit(manager, labels, child, &sibling_modes, findings);
        }
    }
}
