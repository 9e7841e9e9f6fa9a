//! Property-based tests for queue path structure after hydration

use proptest::prelude::*;
use proptest::test_runner::TestRunner;
use qstage::keys::PropertyKeyMapper;
use qstage::snapshot::{QueueSnapshot, RawProperty};
use qstage::types::DEFAULT_PROPERTY_PREFIX;
use qstage::ConfigurationManager;
use std::collections::BTreeMap;

type Shape = BTreeMap<String, Vec<String>>;

/// Two-level hierarchy: top-level names, each with its own child names.
/// The digit in second position keeps names clear of property keywords.
fn shape() -> impl Strategy<Value = Shape> {
    proptest::collection::btree_map(
        "[a-z][0-9][a-z0-9_]{0,4}",
        proptest::collection::btree_set("[a-z][0-9][a-z0-9_]{0,4}", 0..4)
            .prop_map(|s| s.into_iter().collect::<Vec<_>>()),
        1..5,
    )
}

fn raw_for(shape: &Shape) -> Vec<RawProperty> {
    let key = |partial: String| format!("{}{}", DEFAULT_PROPERTY_PREFIX, partial);
    let top: Vec<&str> = shape.keys().map(String::as_str).collect();
    let mut raw = vec![RawProperty::new(key("root.queues".into()), top.join(","))];
    for (name, children) in shape {
        if !children.is_empty() {
            raw.push(RawProperty::new(
                key(format!("root.{}.queues", name)),
                children.join(","),
            ));
        }
        raw.push(RawProperty::new(key(format!("root.{}.capacity", name)), "10"));
    }
    raw
}

/// Every node's full path is its parent's path plus its own segment
#[test]
fn test_full_path_extends_parent() {
    let mut runner = TestRunner::default();

    runner
        .run(&(shape(), any::<bool>()), |(shape, half_in_snapshot)| {
            // Optionally leave the second level out of the snapshot so it is
            // built from declarations alone.
            let snapshot = QueueSnapshot::named("root").with_children(
                shape
                    .iter()
                    .map(|(name, children)| {
                        let nested = if half_in_snapshot {
                            children.iter().map(QueueSnapshot::named).collect()
                        } else {
                            Vec::new()
                        };
                        QueueSnapshot::named(name).with_children(nested)
                    })
                    .collect(),
            );
            let manager =
                ConfigurationManager::hydrate(DEFAULT_PROPERTY_PREFIX, &snapshot, &raw_for(&shape))
                    .unwrap();

            let expected = 1 + shape.len() + shape.values().map(Vec::len).sum::<usize>();
            prop_assert_eq!(manager.tree().len(), expected);
            for node in manager.tree().walk() {
                match node.parent() {
                    None => prop_assert_eq!(node.full_path(), "root"),
                    Some(parent) => prop_assert_eq!(
                        node.full_path().to_string(),
                        format!("{}.{}", parent, node.segment())
                    ),
                }
            }
            prop_assert!(manager.tree().check_invariants().is_ok());
            Ok(())
        })
        .unwrap();
}

/// Capacity keys land on the queue that declares them
#[test]
fn test_properties_resolve_to_declaring_queue() {
    let mut runner = TestRunner::default();

    runner
        .run(&shape(), |shape| {
            let raw = raw_for(&shape);
            let mapper = PropertyKeyMapper::discover(
                DEFAULT_PROPERTY_PREFIX,
                raw.iter().map(|p| (p.name.as_str(), p.value.as_str())),
            );
            for name in shape.keys() {
                let queue_path = format!("root.{}", name);
                let full = mapper.to_full_key("capacity", &queue_path);
                prop_assert_eq!(
                    mapper.to_simple_key(&full, &queue_path),
                    Some("capacity".to_string())
                );
                prop_assert!(!mapper.is_global_property(&full));
            }
            Ok(())
        })
        .unwrap();
}
