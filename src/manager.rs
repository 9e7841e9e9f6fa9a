//! Configuration Manager
//!
//! Owns the queue tree, the key mapper, the global settings, and the change
//! ledger. Every mutation of staged state goes through this type; a failing
//! operation returns a [`StructuralError`] and leaves state untouched.
//!
//! Committing is never done in place: after the remote service applies a
//! payload, callers [`rehydrate`](ConfigurationManager::rehydrate) from fresh
//! snapshots.

mod hydrate;

use crate::error::StructuralError;
use crate::keys::{KeyLocation, PropertyKeyMapper};
use crate::ledger::{ChangeKind, ChangeLedger, ChangeRecord, PropertyDelta};
use crate::payload::{self, ApiPayload};
use crate::properties::{PropertyIssue, QueueProperties};
use crate::tree::{path, PendingOperation, QueueNode, QueueTree};
use crate::types::{PropertyMap, ROOT_QUEUE};
use crate::validation::ValidationError;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// One row of the pending-change diff
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingChange {
    pub kind: ChangeKind,
    pub queue_path: Option<String>,
    /// Simple key for queue rows, full key for global rows, none for deletions
    pub property: Option<String>,
    pub old: Option<String>,
    pub new: Option<String>,
}

/// Staging engine for one editing session
#[derive(Debug)]
pub struct ConfigurationManager {
    tree: QueueTree,
    mapper: PropertyKeyMapper,
    global_base: PropertyMap,
    global_pending: PropertyMap,
    global_old: BTreeMap<String, Option<String>>,
    ledger: ChangeLedger,
    active_group: Option<u64>,
    hydration_warnings: Vec<ValidationError>,
}

impl ConfigurationManager {
    /// Manager with an empty tree holding only `root`.
    pub fn new(prefix: &str) -> Self {
        Self {
            tree: QueueTree::new(),
            mapper: PropertyKeyMapper::new(prefix),
            global_base: PropertyMap::new(),
            global_pending: PropertyMap::new(),
            global_old: BTreeMap::new(),
            ledger: ChangeLedger::new(),
            active_group: None,
            hydration_warnings: Vec::new(),
        }
    }

    pub fn tree(&self) -> &QueueTree {
        &self.tree
    }

    pub fn mapper(&self) -> &PropertyKeyMapper {
        &self.mapper
    }

    pub fn ledger(&self) -> &ChangeLedger {
        &self.ledger
    }

    /// Structural warnings raised while hydrating
    pub fn hydration_warnings(&self) -> &[ValidationError] {
        &self.hydration_warnings
    }

    /// Every node path, preorder
    pub fn queue_paths(&self) -> Vec<String> {
        self.tree
            .walk()
            .into_iter()
            .map(|n| n.full_path().to_string())
            .collect()
    }

    /// Base overlaid by pending, full keys. None for unknown or deleted queues.
    pub fn get_effective_properties(&self, queue_path: &str) -> Option<PropertyMap> {
        let node = self.tree.get(queue_path)?;
        if node.is_deleted() {
            return None;
        }
        Some(node.merged_properties())
    }

    /// Effective properties with simple keys
    pub fn get_effective_simple_properties(&self, queue_path: &str) -> Option<PropertyMap> {
        let effective = self.get_effective_properties(queue_path)?;
        Some(
            effective
                .into_iter()
                .filter_map(|(k, v)| self.mapper.to_simple_key(&k, queue_path).map(|s| (s, v)))
                .collect(),
        )
    }

    /// Typed view of the effective properties
    pub fn typed_properties(&self, queue_path: &str) -> Option<(QueueProperties, Vec<PropertyIssue>)> {
        let effective = self.get_effective_properties(queue_path)?;
        Some(QueueProperties::from_full(&effective, &self.mapper, queue_path))
    }

    /// Global settings with pending values applied
    pub fn effective_global_properties(&self) -> PropertyMap {
        let mut merged = self.global_base.clone();
        merged.extend(
            self.global_pending
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        merged
    }

    pub fn pending_global_properties(&self) -> &PropertyMap {
        &self.global_pending
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.global_pending.is_empty() || self.tree.walk().iter().any(|n| n.has_pending_changes())
    }

    // ------------------------------------------------------------------
    // Staging operations
    // ------------------------------------------------------------------

    /// Stage a new queue with simple-keyed properties.
    pub fn stage_add_queue(
        &mut self,
        queue_path: &str,
        properties: &PropertyMap,
    ) -> Result<(), StructuralError> {
        let full = self.full_keys(queue_path, properties)?;
        self.apply_add(queue_path, &full)?;
        if let Err(e) = self.check_ownership(queue_path, &full) {
            self.remove_added(queue_path);
            return Err(e);
        }
        let deltas = full
            .into_iter()
            .map(|(k, v)| {
                (
                    k,
                    PropertyDelta {
                        old: None,
                        new: Some(v),
                    },
                )
            })
            .collect();
        self.record(ChangeKind::AddQueue, Some(queue_path), deltas);
        debug!(queue = %queue_path, "Staged queue addition");
        Ok(())
    }

    /// Stage simple-keyed property edits on an existing queue.
    pub fn stage_update_queue(
        &mut self,
        queue_path: &str,
        diffs: &PropertyMap,
    ) -> Result<(), StructuralError> {
        let full = self.full_keys(queue_path, diffs)?;
        self.live_node(queue_path)?;
        self.check_ownership(queue_path, &full)?;
        if full.is_empty() {
            return Ok(());
        }

        let mut deltas = BTreeMap::new();
        for (key, value) in full {
            let delta = self.apply_update(queue_path, &key, Some(value))?;
            deltas.insert(key, delta);
        }
        self.record(ChangeKind::UpdateQueue, Some(queue_path), deltas);
        debug!(queue = %queue_path, "Staged queue update");
        Ok(())
    }

    /// Stage removal. Descendants must already be staged for deletion, and a
    /// queue already staged for deletion is rejected.
    pub fn stage_delete_queue(&mut self, queue_path: &str) -> Result<(), StructuralError> {
        self.apply_delete(queue_path)?;
        self.record(ChangeKind::DeleteQueue, Some(queue_path), BTreeMap::new());
        debug!(queue = %queue_path, "Staged queue deletion");
        Ok(())
    }

    /// Stage a change to a cluster-wide setting (full key).
    pub fn stage_global_update(&mut self, key: &str, value: &str) -> Result<(), StructuralError> {
        match self.mapper.extract_queue_path(key)? {
            KeyLocation::Global => {}
            KeyLocation::Queue { .. } => {
                return Err(StructuralError::MalformedKey(key.to_string()));
            }
        }
        let delta = self.apply_global(key, Some(value.to_string()));
        let mut deltas = BTreeMap::new();
        deltas.insert(key.to_string(), delta);
        self.record(ChangeKind::GlobalUpdate, None, deltas);
        debug!(key = %key, "Staged global update");
        Ok(())
    }

    /// Roll back staged state on a queue.
    ///
    /// With a simple key, only that key is restored. Without one, all pending
    /// state is cleared; a staged addition is removed together with its subtree.
    pub fn discard_change(
        &mut self,
        queue_path: &str,
        simple_key: Option<&str>,
    ) -> Result<(), StructuralError> {
        let operation = self
            .tree
            .get(queue_path)
            .ok_or_else(|| StructuralError::QueueNotFound(queue_path.to_string()))?
            .pending_operation();

        match simple_key {
            Some(simple) => {
                let full = self.mapper.to_full_key(simple, queue_path);
                self.restore_key(queue_path, &full);
                self.ledger.forget_property(queue_path, &full);
            }
            None if operation == PendingOperation::Add => {
                self.remove_added(queue_path);
                self.ledger.forget_queue(queue_path);
            }
            None => {
                if let Some(node) = self.tree.get_mut(queue_path) {
                    node.pending_properties.clear();
                    node.old_properties.clear();
                    node.pending_operation = PendingOperation::None;
                }
                self.ledger.forget_queue_exact(queue_path);
            }
        }
        debug!(queue = %queue_path, key = ?simple_key, "Discarded staged change");
        Ok(())
    }

    /// Roll back one staged global setting.
    pub fn discard_global_change(&mut self, key: &str) {
        if let Some(old) = self.global_old.remove(key) {
            self.global_pending.remove(key);
            debug!(key = %key, restored = ?old, "Discarded global change");
        }
        self.ledger.forget_global(key);
    }

    /// Run several staging operations as one undo unit. If any fails, the ones
    /// already applied in the group are rolled back.
    pub fn stage_group<T, F>(&mut self, f: F) -> Result<T, StructuralError>
    where
        F: FnOnce(&mut Self) -> Result<T, StructuralError>,
    {
        if self.active_group.is_some() {
            return f(self);
        }
        let group = self.ledger.next_group_id();
        self.active_group = Some(group);
        let result = f(self);
        self.active_group = None;

        if result.is_err() {
            let applied = self.ledger.pop_group(group);
            for record in applied.iter().rev() {
                if let Err(e) = self.apply_inverse(record) {
                    warn!(error = %e, record = record.id, "Failed to roll back grouped change");
                }
            }
        }
        result
    }

    /// Revert the most recent record or record group.
    pub fn undo(&mut self) -> Result<(), StructuralError> {
        let unit = self
            .ledger
            .pop_undo_unit()
            .ok_or(StructuralError::NothingToUndo)?;
        for record in unit.iter().rev() {
            self.apply_inverse(record)?;
        }
        debug!(records = unit.len(), "Undid change");
        self.ledger.push_redo_unit(unit);
        Ok(())
    }

    /// Re-apply the most recently undone unit.
    pub fn redo(&mut self) -> Result<(), StructuralError> {
        let unit = self
            .ledger
            .pop_redo_unit()
            .ok_or(StructuralError::NothingToRedo)?;
        for record in &unit {
            self.apply_forward(record)?;
        }
        debug!(records = unit.len(), "Redid change");
        self.ledger.restore_unit(unit);
        Ok(())
    }

    /// Serialize all staged changes for the remote mutation API.
    pub fn get_api_payload(&self) -> ApiPayload {
        payload::build_payload(&self.tree, &self.mapper, &self.global_pending)
    }

    /// Flat diff of every staged change, tree order then globals.
    pub fn pending_changes(&self) -> Vec<PendingChange> {
        let mut rows = Vec::new();
        for node in self.tree.walk() {
            let queue_path = node.full_path();
            let kind = match node.pending_operation() {
                PendingOperation::None => continue,
                PendingOperation::Add => ChangeKind::AddQueue,
                PendingOperation::Update => ChangeKind::UpdateQueue,
                PendingOperation::Delete => {
                    rows.push(PendingChange {
                        kind: ChangeKind::DeleteQueue,
                        queue_path: Some(queue_path.to_string()),
                        property: None,
                        old: None,
                        new: None,
                    });
                    continue;
                }
            };
            for (full_key, value) in node.pending_properties() {
                rows.push(PendingChange {
                    kind,
                    queue_path: Some(queue_path.to_string()),
                    property: self.mapper.to_simple_key(full_key, queue_path),
                    old: node.old_properties().get(full_key).cloned().flatten(),
                    new: Some(value.clone()),
                });
            }
        }
        for (key, value) in &self.global_pending {
            rows.push(PendingChange {
                kind: ChangeKind::GlobalUpdate,
                queue_path: None,
                property: Some(key.clone()),
                old: self.global_old.get(key).cloned().flatten(),
                new: Some(value.clone()),
            });
        }
        rows
    }

    // ------------------------------------------------------------------
    // Unrecorded primitives shared by staging, undo, and redo
    // ------------------------------------------------------------------

    fn record(
        &mut self,
        kind: ChangeKind,
        queue_path: Option<&str>,
        properties: BTreeMap<String, PropertyDelta>,
    ) {
        self.ledger.record(
            kind,
            queue_path.map(str::to_string),
            properties,
            self.active_group,
        );
    }

    fn full_keys(
        &self,
        queue_path: &str,
        simple: &PropertyMap,
    ) -> Result<PropertyMap, StructuralError> {
        simple
            .iter()
            .map(|(k, v)| {
                let k = k.trim();
                if k.is_empty() || k.starts_with('.') || k.ends_with('.') {
                    return Err(StructuralError::MalformedKey(k.to_string()));
                }
                Ok((self.mapper.to_full_key(k, queue_path), v.clone()))
            })
            .collect()
    }

    /// Every key must resolve back to `queue_path`; a simple key that reaches
    /// into a child queue is malformed.
    fn check_ownership(&self, queue_path: &str, full: &PropertyMap) -> Result<(), StructuralError> {
        for key in full.keys() {
            match self.mapper.extract_queue_path(key)? {
                KeyLocation::Queue { path, .. } if path == queue_path => {}
                _ => return Err(StructuralError::MalformedKey(key.clone())),
            }
        }
        Ok(())
    }

    /// Node that exists and is not staged for deletion
    fn live_node(&self, queue_path: &str) -> Result<&QueueNode, StructuralError> {
        let node = self
            .tree
            .get(queue_path)
            .ok_or_else(|| StructuralError::QueueNotFound(queue_path.to_string()))?;
        if node.is_deleted() {
            return Err(StructuralError::QueueDeleted(queue_path.to_string()));
        }
        Ok(node)
    }

    fn apply_add(&mut self, queue_path: &str, full: &PropertyMap) -> Result<(), StructuralError> {
        path::validate_path(queue_path)?;
        if queue_path == ROOT_QUEUE {
            return Err(StructuralError::RootImmutable);
        }
        if self.tree.contains(queue_path) {
            return Err(StructuralError::QueueExists(queue_path.to_string()));
        }
        let parent_path = path::parent_of(queue_path).unwrap_or(ROOT_QUEUE);
        match self.tree.get(parent_path) {
            None => return Err(StructuralError::ParentMissing(queue_path.to_string())),
            Some(parent) if parent.is_deleted() => {
                return Err(StructuralError::ParentDeleted(queue_path.to_string()))
            }
            Some(_) => {}
        }

        let node = self
            .tree
            .insert_child(parent_path, path::segment_of(queue_path), true)?;
        node.pending_operation = PendingOperation::Add;
        node.pending_properties = full.clone();
        self.mapper.register_path(queue_path);
        Ok(())
    }

    fn remove_added(&mut self, queue_path: &str) {
        for removed in self.tree.remove_subtree(queue_path) {
            self.mapper.unregister_path(&removed);
        }
    }

    /// Set (`Some`) or clear (`None`) one pending key, snapshotting its
    /// pre-edit value on first touch. Returns the change relative to the value
    /// just before this call.
    fn apply_update(
        &mut self,
        queue_path: &str,
        full_key: &str,
        value: Option<String>,
    ) -> Result<PropertyDelta, StructuralError> {
        self.live_node(queue_path)?;
        let node = self
            .tree
            .get_mut(queue_path)
            .ok_or_else(|| StructuralError::QueueNotFound(queue_path.to_string()))?;

        let before = node.current_value(full_key).cloned();
        let snapshot = node
            .old_properties
            .entry(full_key.to_string())
            .or_insert_with(|| before.clone())
            .clone();

        match &value {
            Some(v) => {
                node.pending_properties.insert(full_key.to_string(), v.clone());
            }
            None => {
                node.pending_properties.remove(full_key);
            }
        }

        // Writing back the pre-edit value on an existing queue reverts the edit.
        if node.pending_operation != PendingOperation::Add && snapshot == value {
            node.pending_properties.remove(full_key);
            node.old_properties.remove(full_key);
        }
        settle_operation(node);

        Ok(PropertyDelta { old: before, new: value })
    }

    fn restore_key(&mut self, queue_path: &str, full_key: &str) {
        if let Some(node) = self.tree.get_mut(queue_path) {
            node.pending_properties.remove(full_key);
            node.old_properties.remove(full_key);
            settle_operation(node);
        }
    }

    fn apply_delete(&mut self, queue_path: &str) -> Result<(), StructuralError> {
        if queue_path == ROOT_QUEUE {
            return Err(StructuralError::RootImmutable);
        }
        let node = self
            .tree
            .get(queue_path)
            .ok_or_else(|| StructuralError::QueueNotFound(queue_path.to_string()))?;
        match node.pending_operation() {
            PendingOperation::Add => {
                return Err(StructuralError::PendingAdd(queue_path.to_string()))
            }
            PendingOperation::Delete => {
                return Err(StructuralError::QueueDeleted(queue_path.to_string()))
            }
            _ => {}
        }

        let live: Vec<String> = self
            .tree
            .descendants(queue_path)
            .into_iter()
            .filter(|d| !d.is_deleted())
            .map(|d| d.full_path().to_string())
            .collect();
        if !live.is_empty() {
            return Err(StructuralError::LiveDescendants {
                path: queue_path.to_string(),
                descendants: live,
            });
        }

        if let Some(node) = self.tree.get_mut(queue_path) {
            node.pending_operation = PendingOperation::Delete;
        }
        Ok(())
    }

    fn apply_undelete(&mut self, queue_path: &str) -> Result<(), StructuralError> {
        let node = self
            .tree
            .get_mut(queue_path)
            .ok_or_else(|| StructuralError::QueueNotFound(queue_path.to_string()))?;
        if node.pending_operation == PendingOperation::Delete {
            node.pending_operation = PendingOperation::None;
            settle_operation(node);
        }
        Ok(())
    }

    fn apply_global(&mut self, key: &str, value: Option<String>) -> PropertyDelta {
        let before = self
            .global_pending
            .get(key)
            .or_else(|| self.global_base.get(key))
            .cloned();
        let snapshot = self
            .global_old
            .entry(key.to_string())
            .or_insert_with(|| before.clone())
            .clone();

        match &value {
            Some(v) => {
                self.global_pending.insert(key.to_string(), v.clone());
            }
            None => {
                self.global_pending.remove(key);
            }
        }
        if snapshot == value {
            self.global_pending.remove(key);
            self.global_old.remove(key);
        }
        PropertyDelta { old: before, new: value }
    }

    fn apply_inverse(&mut self, record: &ChangeRecord) -> Result<(), StructuralError> {
        match record.kind {
            ChangeKind::AddQueue => {
                let queue_path = record_path(record)?;
                self.remove_added(queue_path);
            }
            ChangeKind::UpdateQueue => {
                let queue_path = record_path(record)?;
                for (key, delta) in &record.properties {
                    self.apply_update(queue_path, key, delta.old.clone())?;
                }
            }
            ChangeKind::DeleteQueue => {
                self.apply_undelete(record_path(record)?)?;
            }
            ChangeKind::GlobalUpdate => {
                for (key, delta) in &record.properties {
                    self.apply_global(key, delta.old.clone());
                }
            }
        }
        Ok(())
    }

    fn apply_forward(&mut self, record: &ChangeRecord) -> Result<(), StructuralError> {
        match record.kind {
            ChangeKind::AddQueue => {
                let full: PropertyMap = record
                    .properties
                    .iter()
                    .filter_map(|(k, d)| d.new.clone().map(|v| (k.clone(), v)))
                    .collect();
                self.apply_add(record_path(record)?, &full)?;
            }
            ChangeKind::UpdateQueue => {
                let queue_path = record_path(record)?;
                for (key, delta) in &record.properties {
                    self.apply_update(queue_path, key, delta.new.clone())?;
                }
            }
            ChangeKind::DeleteQueue => self.apply_delete(record_path(record)?)?,
            ChangeKind::GlobalUpdate => {
                for (key, delta) in &record.properties {
                    self.apply_global(key, delta.new.clone());
                }
            }
        }
        Ok(())
    }
}

fn record_path(record: &ChangeRecord) -> Result<&str, StructuralError> {
    record
        .queue_path
        .as_deref()
        .ok_or_else(|| StructuralError::MalformedPath(format!("change {} has no queue", record.id)))
}

/// Update ↔ None transitions driven by whether pending keys remain.
fn settle_operation(node: &mut QueueNode) {
    match node.pending_operation {
        PendingOperation::None if !node.pending_properties.is_empty() => {
            node.pending_operation = PendingOperation::Update;
        }
        PendingOperation::Update if node.pending_properties.is_empty() => {
            node.pending_operation = PendingOperation::None;
        }
        _ => {}
    }
}
