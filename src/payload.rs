//! Mutation payload for the remote configuration API

use crate::keys::PropertyKeyMapper;
use crate::tree::{path, PendingOperation, QueueNode, QueueTree};
use crate::types::PropertyMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// One queue entry in `add-queue` / `update-queue`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueMutation {
    #[serde(rename = "queue-name")]
    pub queue_name: String,
    /// Simple (queue-relative) keys
    pub params: PropertyMap,
}

/// Request body accepted by the remote mutation API. Empty sections are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiPayload {
    #[serde(rename = "add-queue", default, skip_serializing_if = "Vec::is_empty")]
    pub add_queue: Vec<QueueMutation>,

    #[serde(rename = "update-queue", default, skip_serializing_if = "Vec::is_empty")]
    pub update_queue: Vec<QueueMutation>,

    #[serde(rename = "remove-queue", default, skip_serializing_if = "Vec::is_empty")]
    pub remove_queue: Vec<String>,

    /// Fully qualified keys
    #[serde(
        rename = "global-updates",
        default,
        skip_serializing_if = "PropertyMap::is_empty"
    )]
    pub global_updates: PropertyMap,
}

impl ApiPayload {
    pub fn is_empty(&self) -> bool {
        self.add_queue.is_empty()
            && self.update_queue.is_empty()
            && self.remove_queue.is_empty()
            && self.global_updates.is_empty()
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Walk the tree once and collect every staged mutation.
///
/// Additions come out parents-first (preorder); removals deepest-first so
/// leaves are removed before their parents.
#[instrument(skip_all)]
pub fn build_payload(
    tree: &QueueTree,
    mapper: &PropertyKeyMapper,
    global_pending: &PropertyMap,
) -> ApiPayload {
    let mut payload = ApiPayload::default();
    let mut removals: Vec<&QueueNode> = Vec::new();

    for node in tree.walk() {
        match node.pending_operation() {
            PendingOperation::None => {}
            PendingOperation::Add => payload.add_queue.push(QueueMutation {
                queue_name: node.full_path().to_string(),
                params: simple_params(mapper, node),
            }),
            PendingOperation::Update => {
                let params = simple_params(mapper, node);
                if !params.is_empty() {
                    payload.update_queue.push(QueueMutation {
                        queue_name: node.full_path().to_string(),
                        params,
                    });
                }
            }
            PendingOperation::Delete => removals.push(node),
        }
    }

    removals.sort_by(|a, b| {
        path::depth(b.full_path())
            .cmp(&path::depth(a.full_path()))
            .then_with(|| a.full_path().cmp(b.full_path()))
    });
    payload.remove_queue = removals
        .into_iter()
        .map(|n| n.full_path().to_string())
        .collect();
    payload.global_updates = global_pending.clone();

    debug!(
        add = payload.add_queue.len(),
        update = payload.update_queue.len(),
        remove = payload.remove_queue.len(),
        global = payload.global_updates.len(),
        "Built mutation payload"
    );
    payload
}

fn simple_params(mapper: &PropertyKeyMapper, node: &QueueNode) -> PropertyMap {
    node.pending_properties()
        .iter()
        .filter_map(|(full_key, value)| {
            match mapper.to_simple_key(full_key, node.full_path()) {
                Some(simple) => Some((simple, value.clone())),
                None => {
                    warn!(queue = %node.full_path(), key = %full_key, "Pending key does not belong to its queue");
                    None
                }
            }
        })
        .collect()
}
