//! Queue Tree
//!
//! The hierarchy of queues keyed by full path. Every non-root node satisfies
//! `full_path == parent.full_path + "." + segment`, and sibling segments are unique.

pub mod builder;
pub mod node;
pub mod path;

pub use builder::TreeBuilder;
pub use node::{PendingOperation, QueueNode};

use crate::error::StructuralError;
use crate::types::ROOT_QUEUE;
use std::collections::HashMap;

/// Queue hierarchy rooted at `root`
#[derive(Debug, Clone)]
pub struct QueueTree {
    nodes: HashMap<String, QueueNode>,
}

impl Default for QueueTree {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueTree {
    /// Tree holding only the root queue
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(ROOT_QUEUE.to_string(), QueueNode::root(ROOT_QUEUE));
        Self { nodes }
    }

    pub fn root(&self) -> &QueueNode {
        &self.nodes[ROOT_QUEUE]
    }

    pub fn get(&self, path: &str) -> Option<&QueueNode> {
        self.nodes.get(path)
    }

    pub(crate) fn get_mut(&mut self, path: &str) -> Option<&mut QueueNode> {
        self.nodes.get_mut(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.nodes.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Attach a new child under `parent_path`.
    pub(crate) fn insert_child(
        &mut self,
        parent_path: &str,
        segment: &str,
        is_queue: bool,
    ) -> Result<&mut QueueNode, StructuralError> {
        let child = QueueNode::child(parent_path, segment, is_queue);
        let child_path = child.full_path.clone();
        if self.nodes.contains_key(&child_path) {
            return Err(StructuralError::QueueExists(child_path));
        }
        let parent = self
            .nodes
            .get_mut(parent_path)
            .ok_or_else(|| StructuralError::ParentMissing(child_path.clone()))?;
        parent.children.push(segment.to_string());
        Ok(self.nodes.entry(child_path).or_insert(child))
    }

    /// Detach a node and all of its descendants; returns removed paths, deepest first.
    pub(crate) fn remove_subtree(&mut self, path: &str) -> Vec<String> {
        let Some(node) = self.nodes.get(path) else {
            return Vec::new();
        };
        if let Some(parent_path) = node.parent.clone() {
            let segment = node.segment.clone();
            if let Some(parent) = self.nodes.get_mut(&parent_path) {
                parent.children.retain(|c| *c != segment);
            }
        }
        let mut removed: Vec<String> = self
            .preorder_from(path)
            .into_iter()
            .map(|n| n.full_path.clone())
            .collect();
        removed.reverse();
        for p in &removed {
            self.nodes.remove(p);
        }
        removed
    }

    /// Children of a node in insertion order.
    pub fn children(&self, path: &str) -> Vec<&QueueNode> {
        match self.nodes.get(path) {
            Some(node) => node
                .children
                .iter()
                .filter_map(|segment| self.nodes.get(&path::join(path, segment)))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Strict descendants of a node, preorder.
    pub fn descendants(&self, path: &str) -> Vec<&QueueNode> {
        let mut all = self.preorder_from(path);
        if !all.is_empty() {
            all.remove(0);
        }
        all
    }

    /// Every node, depth-first preorder from the root.
    pub fn walk(&self) -> Vec<&QueueNode> {
        self.preorder_from(ROOT_QUEUE)
    }

    fn preorder_from(&self, path: &str) -> Vec<&QueueNode> {
        let mut out = Vec::new();
        let mut stack = vec![path.to_string()];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(&current) else {
                continue;
            };
            out.push(node);
            for segment in node.children.iter().rev() {
                stack.push(path::join(&current, segment));
            }
        }
        out
    }

    /// Check the path/parent invariants over every node.
    pub fn check_invariants(&self) -> Result<(), String> {
        for (key, node) in &self.nodes {
            if *key != node.full_path {
                return Err(format!("node stored under {} has path {}", key, node.full_path));
            }
            match &node.parent {
                None if node.full_path != ROOT_QUEUE => {
                    return Err(format!("{} has no parent", node.full_path));
                }
                None => {}
                Some(parent_path) => {
                    if node.full_path != path::join(parent_path, &node.segment) {
                        return Err(format!("{} does not extend {}", node.full_path, parent_path));
                    }
                    let Some(parent) = self.nodes.get(parent_path) else {
                        return Err(format!("{} has missing parent {}", node.full_path, parent_path));
                    };
                    let count = parent.children.iter().filter(|c| **c == node.segment).count();
                    if count != 1 {
                        return Err(format!(
                            "{} listed {} times under {}",
                            node.segment, count, parent_path
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}
