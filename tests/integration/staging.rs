//! Integration tests for staging operations on the configuration manager

use super::test_utils::{key, props, sample_manager};
use qstage::tree::PendingOperation;
use qstage::StructuralError;

#[test]
fn test_update_reflects_latest_value() {
    let mut manager = sample_manager();
    manager
        .stage_update_queue("root.dev", &props(&[("capacity", "20")]))
        .unwrap();
    manager
        .stage_update_queue("root.dev", &props(&[("capacity", "25")]))
        .unwrap();

    let effective = manager.get_effective_simple_properties("root.dev").unwrap();
    assert_eq!(effective["capacity"], "25");

    let rows = manager.pending_changes();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].old.as_deref(), Some("30"));
    assert_eq!(rows[0].new.as_deref(), Some("25"));
}

#[test]
fn test_delete_requires_descendants_deleted_first() {
    let mut manager = sample_manager();
    let err = manager.stage_delete_queue("root.prod").unwrap_err();
    match err {
        StructuralError::LiveDescendants { path, descendants } => {
            assert_eq!(path, "root.prod");
            assert_eq!(descendants, vec!["root.prod.etl", "root.prod.adhoc"]);
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(!manager.has_pending_changes());

    manager.stage_delete_queue("root.prod.etl").unwrap();
    manager.stage_delete_queue("root.prod.adhoc").unwrap();
    manager.stage_delete_queue("root.prod").unwrap();
    assert!(manager.tree().get("root.prod").unwrap().is_deleted());
    assert!(manager.get_effective_properties("root.prod").is_none());
}

#[test]
fn test_discard_is_idempotent_and_restores() {
    let mut manager = sample_manager();
    manager
        .stage_update_queue("root.prod", &props(&[("capacity", "80")]))
        .unwrap();

    manager.discard_change("root.prod", Some("capacity")).unwrap();
    let once = manager.get_effective_properties("root.prod").unwrap();
    manager.discard_change("root.prod", Some("capacity")).unwrap();
    let twice = manager.get_effective_properties("root.prod").unwrap();

    assert_eq!(once, twice);
    assert_eq!(once[&key("root.prod.capacity")], "70");
    assert!(!manager.has_pending_changes());
    assert!(!manager.ledger().can_undo());
}

#[test]
fn test_add_then_discard_removes_subtree() {
    let mut manager = sample_manager();
    manager
        .stage_add_queue("root.dev.sandbox", &props(&[("capacity", "100")]))
        .unwrap();
    manager
        .stage_add_queue("root.dev.sandbox.inner", &props(&[("capacity", "100")]))
        .unwrap();
    assert!(manager.mapper().contains_path("root.dev.sandbox.inner"));

    manager.discard_change("root.dev.sandbox", None).unwrap();
    assert!(!manager.tree().contains("root.dev.sandbox"));
    assert!(!manager.tree().contains("root.dev.sandbox.inner"));
    assert!(!manager.mapper().contains_path("root.dev.sandbox"));
    assert!(manager.ledger().is_empty());
}

#[test]
fn test_add_rejects_bad_targets() {
    let mut manager = sample_manager();
    assert_eq!(
        manager.stage_add_queue("root.prod", &props(&[])),
        Err(StructuralError::QueueExists("root.prod".into()))
    );
    assert_eq!(
        manager.stage_add_queue("root.nowhere.x", &props(&[])),
        Err(StructuralError::ParentMissing("root.nowhere.x".into()))
    );
    assert_eq!(
        manager.stage_add_queue("root", &props(&[])),
        Err(StructuralError::RootImmutable)
    );
    assert!(matches!(
        manager.stage_add_queue("root..x", &props(&[])),
        Err(StructuralError::MalformedPath(_))
    ));
    assert!(!manager.has_pending_changes());
}

#[test]
fn test_add_under_deleted_parent_is_rejected() {
    let mut manager = sample_manager();
    manager.stage_delete_queue("root.dev").unwrap();
    assert_eq!(
        manager.stage_add_queue("root.dev.x", &props(&[])),
        Err(StructuralError::ParentDeleted("root.dev.x".into()))
    );
}

#[test]
fn test_update_on_deleted_queue_is_rejected() {
    let mut manager = sample_manager();
    manager.stage_delete_queue("root.dev").unwrap();
    assert_eq!(
        manager.stage_update_queue("root.dev", &props(&[("capacity", "1")])),
        Err(StructuralError::QueueDeleted("root.dev".into()))
    );
}

#[test]
fn test_delete_of_staged_add_is_rejected() {
    let mut manager = sample_manager();
    manager.stage_add_queue("root.dev.x", &props(&[])).unwrap();
    assert_eq!(
        manager.stage_delete_queue("root.dev.x"),
        Err(StructuralError::PendingAdd("root.dev.x".into()))
    );
}

#[test]
fn test_writing_back_base_value_clears_update() {
    let mut manager = sample_manager();
    manager
        .stage_update_queue("root.dev", &props(&[("capacity", "10")]))
        .unwrap();
    manager
        .stage_update_queue("root.dev", &props(&[("capacity", "30")]))
        .unwrap();
    assert_eq!(
        manager.tree().get("root.dev").unwrap().pending_operation(),
        PendingOperation::None
    );
    assert!(manager.pending_changes().is_empty());
}

#[test]
fn test_global_update_and_discard() {
    let mut manager = sample_manager();
    let full = key("maximum-applications");
    manager.stage_global_update(&full, "5000").unwrap();
    assert_eq!(manager.effective_global_properties()[&full], "5000");

    manager.discard_global_change(&full);
    assert_eq!(manager.effective_global_properties()[&full], "10000");
    assert!(manager.pending_global_properties().is_empty());
}

#[test]
fn test_global_update_rejects_queue_keys() {
    let mut manager = sample_manager();
    assert!(matches!(
        manager.stage_global_update(&key("root.dev.capacity"), "5"),
        Err(StructuralError::MalformedKey(_))
    ));
}

#[test]
fn test_failed_group_rolls_back() {
    let mut manager = sample_manager();
    let result = manager.stage_group(|m| {
        m.stage_update_queue("root.dev", &props(&[("capacity", "40")]))?;
        m.stage_delete_queue("root.prod")
    });
    assert!(result.is_err());
    assert!(!manager.has_pending_changes());
    assert!(manager.ledger().is_empty());
}

#[test]
fn test_update_rejects_key_owned_by_child_queue() {
    let mut manager = sample_manager();
    assert_eq!(
        manager.stage_update_queue("root", &props(&[("prod.capacity", "90")])),
        Err(StructuralError::MalformedKey(key("root.prod.capacity")))
    );
    assert!(!manager.has_pending_changes());
    assert!(manager.ledger().is_empty());
    assert_eq!(
        manager.get_effective_simple_properties("root.prod").unwrap()["capacity"],
        "70"
    );
    assert!(manager.get_api_payload().is_empty());
}

#[test]
fn test_add_rejects_key_for_undeclared_child() {
    let mut manager = sample_manager();
    assert!(matches!(
        manager.stage_add_queue("root.dev.sandbox", &props(&[("inner.capacity", "5")])),
        Err(StructuralError::MalformedKey(_))
    ));
    assert!(!manager.tree().contains("root.dev.sandbox"));
    assert!(!manager.mapper().contains_path("root.dev.sandbox"));
    assert!(manager.ledger().is_empty());

    manager
        .stage_add_queue("root.dev.sandbox", &props(&[("capacity", "100")]))
        .unwrap();
}

#[test]
fn test_second_delete_of_same_queue_is_rejected() {
    let mut manager = sample_manager();
    manager.stage_delete_queue("root.dev").unwrap();
    assert_eq!(
        manager.stage_delete_queue("root.dev"),
        Err(StructuralError::QueueDeleted("root.dev".into()))
    );
    assert_eq!(manager.ledger().len(), 1);

    manager.undo().unwrap();
    assert!(!manager.tree().get("root.dev").unwrap().is_deleted());
    assert_eq!(manager.undo(), Err(StructuralError::NothingToUndo));
}
