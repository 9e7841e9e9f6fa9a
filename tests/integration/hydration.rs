//! Integration tests for hydrating a manager from snapshots

use super::test_utils::{key, sample_manager, sample_properties, sample_snapshot};
use qstage::snapshot::{parse_raw_properties, QueueSnapshot, RawProperty};
use qstage::types::DEFAULT_PROPERTY_PREFIX;
use qstage::{ConfigurationManager, Severity, StructuralError};

#[test]
fn test_every_node_satisfies_path_invariant() {
    let manager = sample_manager();
    for node in manager.tree().walk() {
        match node.parent() {
            None => assert_eq!(node.full_path(), "root"),
            Some(parent) => {
                assert_eq!(node.full_path(), format!("{}.{}", parent, node.segment()))
            }
        }
    }
    assert!(manager.tree().check_invariants().is_ok());
}

#[test]
fn test_effective_properties_use_full_keys() {
    let manager = sample_manager();
    let effective = manager.get_effective_properties("root.prod").unwrap();
    assert_eq!(effective.get(&key("root.prod.capacity")).map(String::as_str), Some("70"));
    assert!(!effective.contains_key(&key("root.prod.etl.capacity")));

    let simple = manager.get_effective_simple_properties("root.prod").unwrap();
    assert_eq!(simple.get("maximum-capacity").map(String::as_str), Some("100"));
}

#[test]
fn test_global_settings_are_separate() {
    let manager = sample_manager();
    let globals = manager.effective_global_properties();
    assert_eq!(globals.len(), 2);
    assert!(globals.contains_key(&key("maximum-applications")));
}

#[test]
fn test_declared_queue_missing_from_snapshot_becomes_placeholder() {
    let mut raw = sample_properties();
    raw[0] = RawProperty::new(key("root.queues"), "prod,dev,staging");
    raw.push(RawProperty::new(key("root.staging.capacity"), "0"));

    let manager =
        ConfigurationManager::hydrate(DEFAULT_PROPERTY_PREFIX, &sample_snapshot(), &raw).unwrap();
    let staging = manager.tree().get("root.staging").unwrap();
    assert!(!staging.is_queue());
    assert_eq!(staging.base_properties().len(), 1);

    let warnings = manager.hydration_warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].severity, Severity::Warning);
    assert_eq!(warnings[0].queue_path.as_deref(), Some("root.staging"));
}

#[test]
fn test_unresolvable_known_key_is_kept_and_reported() {
    let mut raw = sample_properties();
    raw.push(RawProperty::new(key("root.nowhere.capacity"), "10"));

    let manager =
        ConfigurationManager::hydrate(DEFAULT_PROPERTY_PREFIX, &sample_snapshot(), &raw).unwrap();
    assert!(manager
        .effective_global_properties()
        .contains_key(&key("root.nowhere.capacity")));
    assert_eq!(manager.hydration_warnings().len(), 1);
    assert_eq!(
        manager.hydration_warnings()[0].property.as_deref(),
        Some(key("root.nowhere.capacity").as_str())
    );
}

#[test]
fn test_malformed_child_queue_names_are_reported() {
    let raw: Vec<RawProperty> = sample_properties()
        .into_iter()
        .map(|p| {
            if p.name == key("root.prod.queues") {
                RawProperty::new(p.name, "etl,adhoc,night shift,a.b")
            } else {
                p
            }
        })
        .collect();

    let manager =
        ConfigurationManager::hydrate(DEFAULT_PROPERTY_PREFIX, &sample_snapshot(), &raw).unwrap();
    assert_eq!(manager.tree().len(), 5);
    let warnings = manager.hydration_warnings();
    assert_eq!(warnings.len(), 2);
    for warning in warnings {
        assert_eq!(warning.severity, Severity::Warning);
        assert_eq!(warning.queue_path.as_deref(), Some("root.prod"));
        assert_eq!(
            warning.property.as_deref(),
            Some(key("root.prod.queues").as_str())
        );
    }
    assert!(warnings[0].message.contains("night shift"));
    assert!(warnings[1].message.contains("a.b"));
}

#[test]
fn test_snapshot_root_must_be_root() {
    let err = ConfigurationManager::hydrate(
        DEFAULT_PROPERTY_PREFIX,
        &QueueSnapshot::named("cluster"),
        &sample_properties(),
    )
    .unwrap_err();
    assert!(matches!(err, StructuralError::MalformedPath(_)));
}

#[test]
fn test_rehydrate_discards_staging_and_keeps_state_on_failure() {
    let mut manager = sample_manager();
    manager
        .stage_update_queue("root.dev", &super::test_utils::props(&[("capacity", "25")]))
        .unwrap();
    assert!(manager.has_pending_changes());

    assert!(manager
        .rehydrate(&QueueSnapshot::named("cluster"), &sample_properties())
        .is_err());
    assert!(manager.has_pending_changes());

    manager
        .rehydrate(&sample_snapshot(), &sample_properties())
        .unwrap();
    assert!(!manager.has_pending_changes());
    assert!(!manager.ledger().can_undo());
}

#[test]
fn test_wire_documents_parse() {
    let snapshot = QueueSnapshot::from_json(
        r#"{"queueName": "root", "children": [
            {"queueName": "a", "queuePath": "root.a", "state": "RUNNING", "numApplications": 2}
        ]}"#,
    )
    .unwrap();
    assert_eq!(snapshot.children[0].num_applications, 2);

    let wrapped = parse_raw_properties(r#"{"property": [{"name": "k", "value": "v"}]}"#).unwrap();
    let bare = parse_raw_properties(r#"[{"name": "k", "value": "v"}]"#).unwrap();
    assert_eq!(wrapped, bare);
}
