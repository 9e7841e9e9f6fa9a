//! Change Ledger
//!
//! Append-only record of staged edits. Each record carries enough old/new
//! values to be inverted, so undo/redo never snapshots the tree. Records that
//! share a `group_id` undo and redo as one unit.

use crate::tree::path;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Kind of staged edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ChangeKind {
    AddQueue,
    UpdateQueue,
    DeleteQueue,
    GlobalUpdate,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChangeKind::AddQueue => "add",
            ChangeKind::UpdateQueue => "update",
            ChangeKind::DeleteQueue => "delete",
            ChangeKind::GlobalUpdate => "global",
        };
        f.write_str(label)
    }
}

/// Value of one key before and after an edit; `None` means absent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyDelta {
    pub old: Option<String>,
    pub new: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeRecord {
    pub id: u64,
    pub kind: ChangeKind,
    pub queue_path: Option<String>,
    /// Full property key → delta
    pub properties: BTreeMap<String, PropertyDelta>,
    pub timestamp: DateTime<Utc>,
    pub group_id: Option<u64>,
}

/// Linear undo history with a redo stack of undone units
#[derive(Debug, Default)]
pub struct ChangeLedger {
    undo: Vec<ChangeRecord>,
    redo: Vec<Vec<ChangeRecord>>,
    next_id: u64,
    next_group: u64,
}

impl ChangeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record. Any new edit invalidates the redo stack.
    pub fn record(
        &mut self,
        kind: ChangeKind,
        queue_path: Option<String>,
        properties: BTreeMap<String, PropertyDelta>,
        group_id: Option<u64>,
    ) -> u64 {
        self.next_id += 1;
        self.undo.push(ChangeRecord {
            id: self.next_id,
            kind,
            queue_path,
            properties,
            timestamp: Utc::now(),
            group_id,
        });
        self.redo.clear();
        self.next_id
    }

    pub fn next_group_id(&mut self) -> u64 {
        self.next_group += 1;
        self.next_group
    }

    /// Records in the order they were staged
    pub fn entries(&self) -> &[ChangeRecord] {
        &self.undo
    }

    pub fn len(&self) -> usize {
        self.undo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Remove the most recent unit (a record, or a whole group) in staging order.
    pub fn pop_undo_unit(&mut self) -> Option<Vec<ChangeRecord>> {
        let group = self.undo.last()?.group_id;
        let mut unit = vec![self.undo.pop()?];
        if let Some(g) = group {
            while self.undo.last().map(|r| r.group_id) == Some(Some(g)) {
                if let Some(record) = self.undo.pop() {
                    unit.push(record);
                }
            }
        }
        unit.reverse();
        Some(unit)
    }

    /// Remove trailing records of one group, in staging order.
    pub fn pop_group(&mut self, group_id: u64) -> Vec<ChangeRecord> {
        let mut unit = Vec::new();
        while self.undo.last().map(|r| r.group_id) == Some(Some(group_id)) {
            if let Some(record) = self.undo.pop() {
                unit.push(record);
            }
        }
        unit.reverse();
        unit
    }

    pub fn push_redo_unit(&mut self, unit: Vec<ChangeRecord>) {
        self.redo.push(unit);
    }

    pub fn pop_redo_unit(&mut self) -> Option<Vec<ChangeRecord>> {
        self.redo.pop()
    }

    /// Put a redone unit back on the undo history without touching redo.
    pub fn restore_unit(&mut self, unit: Vec<ChangeRecord>) {
        self.undo.extend(unit);
    }

    /// Drop one key from every record on `queue_path`; update records left
    /// empty are removed.
    pub fn forget_property(&mut self, queue_path: &str, full_key: &str) {
        self.forget_key(Some(queue_path), full_key);
    }

    pub fn forget_global(&mut self, full_key: &str) {
        self.forget_key(None, full_key);
    }

    fn forget_key(&mut self, queue_path: Option<&str>, full_key: &str) {
        for record in self
            .undo
            .iter_mut()
            .filter(|r| r.queue_path.as_deref() == queue_path)
        {
            record.properties.remove(full_key);
        }
        self.undo.retain(|r| {
            !matches!(r.kind, ChangeKind::UpdateQueue | ChangeKind::GlobalUpdate)
                || !r.properties.is_empty()
        });
        self.redo.clear();
    }

    /// Drop every record on exactly `queue_path`.
    pub fn forget_queue_exact(&mut self, queue_path: &str) {
        self.undo
            .retain(|r| r.queue_path.as_deref() != Some(queue_path));
        self.redo.clear();
    }

    /// Drop every record touching a queue or any of its descendants.
    pub fn forget_queue(&mut self, queue_path: &str) {
        self.undo.retain(|r| match r.queue_path.as_deref() {
            Some(p) => p != queue_path && !path::is_descendant(p, queue_path),
            None => true,
        });
        self.redo.clear();
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}
