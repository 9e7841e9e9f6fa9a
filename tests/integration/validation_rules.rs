//! Integration tests for validation over the effective tree

use super::test_utils::{flat_manager, key, props, sample_manager, sample_snapshot};
use qstage::collaborators::ClusterLabels;
use qstage::snapshot::SnapshotRuntime;
use qstage::validation::has_blocking_errors;
use qstage::{ConfigurationManager, Severity, ValidationError, ValidationPolicy, Validator};

fn validate(manager: &ConfigurationManager) -> Vec<ValidationError> {
    Validator::new(ValidationPolicy::default())
        .unwrap()
        .validate(manager)
}

fn errors(findings: &[ValidationError]) -> Vec<&ValidationError> {
    findings.iter().filter(|f| f.is_error()).collect()
}

#[test]
fn test_sample_tree_is_clean() {
    let manager = sample_manager();
    let runtime = SnapshotRuntime::from_snapshot(&sample_snapshot());
    let findings = Validator::new(ValidationPolicy::default())
        .unwrap()
        .with_runtime(&runtime)
        .validate(&manager);
    assert!(findings.is_empty(), "unexpected findings: {:?}", findings);
}

#[test]
fn test_percentages_summing_to_100_pass() {
    assert!(validate(&flat_manager(&[("a", "60"), ("b", "40")])).is_empty());
}

#[test]
fn test_percentage_overflow_is_reported_on_parent() {
    let findings = validate(&flat_manager(&[("a", "60"), ("b", "50")]));
    let errs = errors(&findings);
    assert_eq!(errs.len(), 1);
    assert_eq!(errs[0].queue_path.as_deref(), Some("root"));
    assert_eq!(errs[0].property.as_deref(), Some("capacity"));
    assert!(errs[0].message.contains("110"));
}

#[test]
fn test_staged_edit_fixes_sum() {
    let mut manager = flat_manager(&[("a", "60"), ("b", "50")]);
    manager
        .stage_update_queue("root.b", &props(&[("capacity", "40")]))
        .unwrap();
    assert!(!has_blocking_errors(&validate(&manager)));
}

#[test]
fn test_sum_within_epsilon_passes() {
    assert!(validate(&flat_manager(&[("a", "33.333"), ("b", "33.333"), ("c", "33.334")])).is_empty());
}

#[test]
fn test_weight_sibling_exempts_sum() {
    let findings = validate(&flat_manager(&[("a", "60"), ("b", "2w")]));
    assert!(!has_blocking_errors(&findings), "{:?}", findings);
}

#[test]
fn test_vector_percentage_dimension_is_summed() {
    let ok = validate(&flat_manager(&[
        ("a", "[memory=10%,vcores=2w]"),
        ("b", "[memory=90%,vcores=3w]"),
    ]));
    assert!(ok.is_empty(), "{:?}", ok);

    let bad = validate(&flat_manager(&[
        ("a", "[memory=10%,vcores=2w]"),
        ("b", "[memory=80%,vcores=3w]"),
    ]));
    let errs = errors(&bad);
    assert_eq!(errs.len(), 1);
    assert_eq!(errs[0].property.as_deref(), Some("capacity[memory]"));
}

#[test]
fn test_absolute_next_to_percentage_warns() {
    let findings = validate(&flat_manager(&[("a", "[memory=4096,vcores=4]"), ("b", "50")]));
    assert!(findings
        .iter()
        .any(|f| f.severity == Severity::Warning && f.queue_path.as_deref() == Some("root.a")));
}

#[test]
fn test_unparseable_capacity_is_an_error_and_skips_sum() {
    let findings = validate(&flat_manager(&[("a", "sixty"), ("b", "10")]));
    let errs = errors(&findings);
    assert_eq!(errs.len(), 1);
    assert_eq!(errs[0].queue_path.as_deref(), Some("root.a"));
    assert_eq!(errs[0].property.as_deref(), Some("capacity"));
}

#[test]
fn test_zero_sum_policy() {
    let manager = flat_manager(&[("a", "0"), ("b", "0")]);
    assert!(has_blocking_errors(&validate(&manager)));

    let policy = ValidationPolicy {
        allow_zero_sum: true,
        ..ValidationPolicy::default()
    };
    assert!(Validator::new(policy).unwrap().validate(&manager).is_empty());
}

#[test]
fn test_maximum_below_capacity() {
    let mut manager = flat_manager(&[("a", "60"), ("b", "40")]);
    manager
        .stage_update_queue("root.a", &props(&[("maximum-capacity", "50")]))
        .unwrap();
    let findings = validate(&manager);
    assert!(findings.iter().any(|f| f.is_error()
        && f.queue_path.as_deref() == Some("root.a")
        && f.property.as_deref() == Some("maximum-capacity")));
}

#[test]
fn test_stopping_busy_queue_is_blocked() {
    let mut manager = sample_manager();
    manager
        .stage_update_queue("root.prod.etl", &props(&[("state", "STOPPED")]))
        .unwrap();
    let runtime = SnapshotRuntime::from_snapshot(&sample_snapshot());
    let findings = Validator::new(ValidationPolicy::default())
        .unwrap()
        .with_runtime(&runtime)
        .validate(&manager);
    let errs = errors(&findings);
    assert_eq!(errs.len(), 1);
    assert_eq!(errs[0].queue_path.as_deref(), Some("root.prod.etl"));
    assert_eq!(errs[0].property.as_deref(), Some("state"));

    // Without runtime data the transition cannot be judged.
    assert!(validate(&manager).is_empty());
}

#[test]
fn test_deletion_requires_stopped_state() {
    let mut manager = sample_manager();
    manager.stage_delete_queue("root.dev").unwrap();
    let findings = validate(&manager);
    assert!(findings.iter().any(|f| f.is_error()
        && f.queue_path.as_deref() == Some("root.dev")
        && f.property.as_deref() == Some("state")));

    manager.undo().unwrap();
    manager
        .stage_group(|m| {
            m.stage_update_queue("root.dev", &props(&[("state", "STOPPED")]))?;
            m.stage_delete_queue("root.dev")
        })
        .unwrap();
    let findings = validate(&manager);
    assert!(findings
        .iter()
        .all(|f| f.queue_path.as_deref() != Some("root.dev")));
}

#[test]
fn test_deleting_busy_queue_is_blocked() {
    let mut manager = sample_manager();
    for queue in ["root.prod.etl", "root.prod.adhoc"] {
        manager
            .stage_update_queue(queue, &props(&[("state", "STOPPED")]))
            .unwrap();
        manager.stage_delete_queue(queue).unwrap();
    }
    let runtime = SnapshotRuntime::from_snapshot(&sample_snapshot());
    let findings = Validator::new(ValidationPolicy::default())
        .unwrap()
        .with_runtime(&runtime)
        .validate(&manager);
    let errs = errors(&findings);
    assert_eq!(errs.len(), 1, "{:?}", errs);
    assert_eq!(errs[0].queue_path.as_deref(), Some("root.prod.etl"));
    assert!(errs[0].message.contains("3 active applications"));
}

#[test]
fn test_unknown_node_label() {
    let mut manager = flat_manager(&[("a", "50"), ("b", "50")]);
    manager
        .stage_update_queue(
            "root.a",
            &props(&[
                ("accessible-node-labels", "gpu"),
                ("accessible-node-labels.gpu.capacity", "100"),
            ]),
        )
        .unwrap();

    let known = ClusterLabels::new(["gpu"]).assign("node-1", &["gpu"]);
    let findings = Validator::new(ValidationPolicy::default())
        .unwrap()
        .with_labels(&known)
        .validate(&manager);
    assert!(findings.is_empty(), "{:?}", findings);

    let unknown = ClusterLabels::new(["ssd"]);
    let findings = Validator::new(ValidationPolicy::default())
        .unwrap()
        .with_labels(&unknown)
        .validate(&manager);
    let properties: Vec<Option<&str>> = errors(&findings)
        .iter()
        .map(|f| f.property.as_deref())
        .collect();
    assert!(properties.contains(&Some("accessible-node-labels")));
    assert!(properties.contains(&Some("accessible-node-labels.gpu.capacity")));
}

#[test]
fn test_label_without_nodes_warns() {
    let mut manager = flat_manager(&[("a", "50"), ("b", "50")]);
    manager
        .stage_update_queue(
            "root.a",
            &props(&[
                ("accessible-node-labels", "gpu"),
                ("accessible-node-labels.gpu.capacity", "100"),
            ]),
        )
        .unwrap();
    let labels = ClusterLabels::new(["gpu", "ssd"]).assign("node-1", &["ssd"]);
    let findings = Validator::new(ValidationPolicy::default())
        .unwrap()
        .with_labels(&labels)
        .validate(&manager);
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].severity, Severity::Warning);
}

#[test]
fn test_label_capacities_sum_per_label() {
    let mut manager = flat_manager(&[("a", "50"), ("b", "50")]);
    manager
        .stage_group(|m| {
            m.stage_update_queue(
                "root.a",
                &props(&[
                    ("accessible-node-labels", "gpu"),
                    ("accessible-node-labels.gpu.capacity", "70"),
                ]),
            )?;
            m.stage_update_queue(
                "root.b",
                &props(&[
                    ("accessible-node-labels", "gpu"),
                    ("accessible-node-labels.gpu.capacity", "20"),
                ]),
            )
        })
        .unwrap();
    let errs: Vec<ValidationError> = validate(&manager).into_iter().filter(|f| f.is_error()).collect();
    assert_eq!(errs.len(), 1);
    assert_eq!(
        errs[0].property.as_deref(),
        Some("accessible-node-labels.gpu.capacity")
    );
}

#[test]
fn test_default_label_must_be_accessible() {
    let mut manager = flat_manager(&[("a", "50"), ("b", "50")]);
    manager
        .stage_update_queue(
            "root.a",
            &props(&[
                ("accessible-node-labels", "ssd"),
                ("accessible-node-labels.ssd.capacity", "100"),
                ("default-node-label-expression", "gpu"),
            ]),
        )
        .unwrap();
    let findings = validate(&manager);
    assert!(errors(&findings)
        .iter()
        .any(|f| f.property.as_deref() == Some("default-node-label-expression")));
}

#[test]
fn test_conflicting_auto_creation_modes() {
    let mut manager = flat_manager(&[("a", "50"), ("b", "50")]);
    manager
        .stage_update_queue(
            "root.a",
            &props(&[
                ("auto-create-child-queue.enabled", "true"),
                ("auto-queue-creation-v2.enabled", "true"),
            ]),
        )
        .unwrap();
    let errs: Vec<ValidationError> = validate(&manager).into_iter().filter(|f| f.is_error()).collect();
    assert_eq!(errs.len(), 1);
    assert_eq!(errs[0].property.as_deref(), Some("auto-queue-creation-v2.enabled"));
}

#[test]
fn test_queue_name_pattern() {
    let mut manager = flat_manager(&[("a", "50"), ("b", "50")]);
    manager
        .stage_add_queue("root.bad$name", &props(&[("capacity", "0")]))
        .unwrap();
    let errs: Vec<ValidationError> = validate(&manager).into_iter().filter(|f| f.is_error()).collect();
    assert_eq!(errs.len(), 1);
    assert_eq!(errs[0].queue_path.as_deref(), Some("root.bad$name"));
}

#[test]
fn test_case_only_sibling_names_warn() {
    let mut manager = flat_manager(&[("a", "50"), ("b", "50")]);
    manager
        .stage_add_queue("root.A", &props(&[("capacity", "0")]))
        .unwrap();
    let findings = validate(&manager);
    assert!(!has_blocking_errors(&findings));
    assert!(findings
        .iter()
        .any(|f| f.severity == Severity::Warning && f.property.as_deref() == Some("queues")));
}

#[test]
fn test_invalid_global_settings() {
    let mut manager = sample_manager();
    manager
        .stage_global_update(&key("maximum-applications"), "lots")
        .unwrap();
    let findings = validate(&manager);
    let errs = errors(&findings);
    assert_eq!(errs.len(), 1);
    assert!(errs[0].queue_path.is_none());
}

#[test]
fn test_validation_does_not_mutate() {
    let mut manager = flat_manager(&[("a", "60"), ("b", "50")]);
    manager
        .stage_update_queue("root.a", &props(&[("capacity", "55")]))
        .unwrap();
    let before = manager.pending_changes();
    let _ = validate(&manager);
    assert_eq!(manager.pending_changes(), before);
    assert!(manager.ledger().can_undo());
}

#[test]
fn test_invalid_policy_is_rejected() {
    let policy = ValidationPolicy {
        queue_name_pattern: "(".to_string(),
        ..ValidationPolicy::default()
    };
    assert!(Validator::new(policy).is_err());
}
