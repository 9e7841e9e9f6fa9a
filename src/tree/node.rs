//! Queue node: identity, base state, and staged overlay

use crate::tree::path;
use crate::types::PropertyMap;
use serde::Serialize;
use std::collections::BTreeMap;

/// Staged operation on a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PendingOperation {
    None,
    Add,
    Update,
    Delete,
}

/// One queue (or path placeholder) in the hierarchy.
///
/// Property maps are keyed by full property names. `old_properties` holds the
/// effective value each touched key had before its first staged edit; `None`
/// means the key was absent.
#[derive(Debug, Clone)]
pub struct QueueNode {
    pub(crate) segment: String,
    pub(crate) full_path: String,
    pub(crate) is_queue: bool,
    pub(crate) parent: Option<String>,
    pub(crate) children: Vec<String>,
    pub(crate) base_properties: PropertyMap,
    pub(crate) pending_operation: PendingOperation,
    pub(crate) pending_properties: PropertyMap,
    pub(crate) old_properties: BTreeMap<String, Option<String>>,
}

impl QueueNode {
    pub(crate) fn root(segment: &str) -> Self {
        Self::blank(None, segment.to_string(), segment.to_string(), true)
    }

    pub(crate) fn child(parent_path: &str, segment: &str, is_queue: bool) -> Self {
        Self::blank(
            Some(parent_path.to_string()),
            segment.to_string(),
            path::join(parent_path, segment),
            is_queue,
        )
    }

    fn blank(parent: Option<String>, segment: String, full_path: String, is_queue: bool) -> Self {
        Self {
            segment,
            full_path,
            is_queue,
            parent,
            children: Vec::new(),
            base_properties: PropertyMap::new(),
            pending_operation: PendingOperation::None,
            pending_properties: PropertyMap::new(),
            old_properties: BTreeMap::new(),
        }
    }

    pub fn segment(&self) -> &str {
        &self.segment
    }

    pub fn full_path(&self) -> &str {
        &self.full_path
    }

    /// False for intermediate placeholders the structural snapshot did not report.
    pub fn is_queue(&self) -> bool {
        self.is_queue
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Child segments in insertion order
    pub fn children(&self) -> &[String] {
        &self.children
    }

    pub fn base_properties(&self) -> &PropertyMap {
        &self.base_properties
    }

    pub fn pending_operation(&self) -> PendingOperation {
        self.pending_operation
    }

    pub fn pending_properties(&self) -> &PropertyMap {
        &self.pending_properties
    }

    pub fn old_properties(&self) -> &BTreeMap<String, Option<String>> {
        &self.old_properties
    }

    pub fn is_deleted(&self) -> bool {
        self.pending_operation == PendingOperation::Delete
    }

    pub fn depth(&self) -> usize {
        path::depth(&self.full_path)
    }

    /// Current value of one key: pending overlay first, then base.
    pub fn current_value(&self, full_key: &str) -> Option<&String> {
        self.pending_properties
            .get(full_key)
            .or_else(|| self.base_properties.get(full_key))
    }

    /// Base overlaid by pending, ignoring any staged deletion.
    pub fn merged_properties(&self) -> PropertyMap {
        let mut merged = self.base_properties.clone();
        merged.extend(
            self.pending_properties
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        merged
    }

    pub fn has_pending_changes(&self) -> bool {
        self.pending_operation != PendingOperation::None
    }
}
