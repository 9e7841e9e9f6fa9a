//! Tree builder for constructing the queue hierarchy from a structural snapshot

use crate::error::StructuralError;
use crate::snapshot::QueueSnapshot;
use crate::tree::path;
use crate::tree::QueueTree;
use crate::types::ROOT_QUEUE;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Result of a build: the tree plus the paths that had to be created as
/// placeholders because only the properties declared them.
#[derive(Debug, Clone)]
pub struct BuiltTree {
    pub tree: QueueTree,
    pub placeholders: Vec<String>,
}

/// Builds a [`QueueTree`] from a structural snapshot
pub struct TreeBuilder<'a> {
    snapshot: &'a QueueSnapshot,
    discovered: Vec<String>,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(snapshot: &'a QueueSnapshot) -> Self {
        Self {
            snapshot,
            discovered: Vec::new(),
        }
    }

    /// Paths discovered from the raw properties. Any not present in the snapshot
    /// become placeholder nodes.
    pub fn with_discovered_paths<I>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        self.discovered = paths.into_iter().collect();
        self
    }

    /// Build the tree: snapshot queues first (preorder, so parents precede
    /// children), then placeholders shallowest first.
    #[instrument(skip(self), fields(root = %self.snapshot.queue_name))]
    pub fn build(&self) -> Result<BuiltTree, StructuralError> {
        let start = Instant::now();

        if self.snapshot.queue_name != ROOT_QUEUE {
            return Err(StructuralError::MalformedPath(
                self.snapshot.queue_name.clone(),
            ));
        }

        let mut tree = QueueTree::new();
        for (queue_path, queue) in self.snapshot.flatten().into_iter().skip(1) {
            path::validate_path(&queue_path)?;
            if let Some(reported) = &queue.queue_path {
                if *reported != queue_path {
                    warn!(
                        reported = %reported,
                        derived = %queue_path,
                        "Snapshot queue path disagrees with its position"
                    );
                    return Err(StructuralError::MalformedPath(reported.clone()));
                }
            }
            let parent = path::parent_of(&queue_path).unwrap_or(ROOT_QUEUE);
            tree.insert_child(parent, &queue.queue_name, true)?;
        }

        let mut missing: Vec<&String> = self
            .discovered
            .iter()
            .filter(|p| !tree.contains(p))
            .collect();
        missing.sort_by(|a, b| (path::depth(a), a).cmp(&(path::depth(b), b)));

        let mut placeholders = Vec::with_capacity(missing.len());
        for queue_path in missing {
            path::validate_path(queue_path)?;
            let Some(parent) = path::parent_of(queue_path) else {
                continue;
            };
            debug!(queue = %queue_path, "Creating placeholder for queue absent from snapshot");
            tree.insert_child(parent, path::segment_of(queue_path), false)?;
            placeholders.push(queue_path.clone());
        }

        info!(
            queues = tree.len(),
            placeholders = placeholders.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Queue tree built"
        );
        Ok(BuiltTree { tree, placeholders })
    }
}
