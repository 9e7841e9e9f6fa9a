//! Property Key Mapper
//!
//! Translates between the three spellings of a queue property:
//!
//! - full:    `yarn.scheduler.capacity.root.a.capacity`
//! - partial: `root.a.capacity` (prefix stripped)
//! - simple:  `capacity` (relative to the owning queue)
//!
//! Queue boundaries are discovered from the `.queues` declarations in the raw
//! properties, never from a fixed list of names.

pub mod trie;

use crate::error::StructuralError;
use crate::tree::path;
use crate::types::{QUEUES_KEY, ROOT_QUEUE};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::debug;
use trie::PathTrie;

/// Queue-scoped property names with typed handling.
pub const KNOWN_QUEUE_PROPERTIES: &[&str] = &[
    "capacity",
    "maximum-capacity",
    "state",
    QUEUES_KEY,
    "accessible-node-labels",
    "default-node-label-expression",
    "auto-create-child-queue.enabled",
    "auto-queue-creation-v2.enabled",
    "user-limit-factor",
    "minimum-user-limit-percent",
    "maximum-applications",
    "maximum-am-resource-percent",
    "ordering-policy",
    "priority",
    "acl_submit_applications",
    "acl_administer_queue",
    "disable_preemption",
];

/// Simple-key prefixes whose sub-keys are templates, opaque to the mapper.
const TEMPLATE_PREFIXES: &[&str] = &[
    "leaf-queue-template.",
    "auto-queue-creation-v2.template.",
    "auto-queue-creation-v2.parent-template.",
    "auto-queue-creation-v2.leaf-template.",
];

const LABEL_PREFIX: &str = "accessible-node-labels.";

/// True for a recognized queue-scoped simple key, including per-label capacities.
pub fn is_known_simple_key(simple_key: &str) -> bool {
    if KNOWN_QUEUE_PROPERTIES.contains(&simple_key) {
        return true;
    }
    parse_label_key(simple_key).is_some()
}

/// Split `accessible-node-labels.<label>.<field>` into (label, field) when field
/// is `capacity` or `maximum-capacity`.
pub fn parse_label_key(simple_key: &str) -> Option<(&str, &str)> {
    let rest = simple_key.strip_prefix(LABEL_PREFIX)?;
    let (label, field) = rest.split_once('.')?;
    if label.is_empty() || !matches!(field, "capacity" | "maximum-capacity") {
        return None;
    }
    Some((label, field))
}

/// Build the per-label simple key for a field.
pub fn label_key(label: &str, field: &str) -> String {
    format!("{}{}.{}", LABEL_PREFIX, label, field)
}

/// Where a full property key belongs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyLocation {
    /// Scoped to a queue; `simple_key` is relative to `path`.
    Queue { path: String, simple_key: String },
    /// A cluster-wide setting, kept fully qualified.
    Global,
}

/// Maps property keys onto the discovered queue hierarchy
#[derive(Debug, Clone)]
pub struct PropertyKeyMapper {
    prefix: String,
    trie: PathTrie,
}

impl PropertyKeyMapper {
    /// Mapper that knows only the root queue.
    pub fn new(prefix: impl Into<String>) -> Self {
        let mut trie = PathTrie::new();
        trie.insert(ROOT_QUEUE);
        Self {
            prefix: prefix.into(),
            trie,
        }
    }

    /// Mapper seeded with every path discovered from the raw properties.
    pub fn discover<'a, I>(prefix: &str, raw: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut mapper = Self::new(prefix);
        for queue_path in discover_queue_paths(prefix, raw) {
            mapper.trie.insert(&queue_path);
        }
        mapper
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn register_path(&mut self, queue_path: &str) -> bool {
        self.trie.insert(queue_path)
    }

    pub fn unregister_path(&mut self, queue_path: &str) -> bool {
        if queue_path == ROOT_QUEUE {
            return false;
        }
        self.trie.remove(queue_path)
    }

    pub fn contains_path(&self, queue_path: &str) -> bool {
        self.trie.contains(queue_path)
    }

    /// Every known queue path, sorted.
    pub fn queue_paths(&self) -> Vec<String> {
        self.trie.paths()
    }

    /// Resolve a full key to its owning queue by longest-prefix match.
    ///
    /// Keys outside the prefix, or whose first segment is not `root`, are global.
    /// A key naming a queue with no property suffix, containing empty segments, or
    /// whose suffix reads as a known property of an undiscovered queue is rejected.
    pub fn extract_queue_path(&self, full_key: &str) -> Result<KeyLocation, StructuralError> {
        let Some(partial) = self.to_partial_key(full_key) else {
            return Ok(KeyLocation::Global);
        };
        let segments: Vec<&str> = partial.split('.').collect();
        if segments.first() != Some(&ROOT_QUEUE) {
            return Ok(KeyLocation::Global);
        }
        if segments.iter().any(|s| s.is_empty()) {
            return Err(StructuralError::MalformedKey(full_key.to_string()));
        }

        let Some(consumed) = self.trie.longest_match(&segments) else {
            return Ok(KeyLocation::Global);
        };
        if consumed == segments.len() {
            return Err(StructuralError::MalformedKey(full_key.to_string()));
        }

        let queue_path = segments[..consumed].join(".");
        let simple_key = segments[consumed..].join(".");
        if is_undiscovered_queue_property(&simple_key) {
            return Err(StructuralError::MalformedKey(full_key.to_string()));
        }
        Ok(KeyLocation::Queue {
            path: queue_path,
            simple_key,
        })
    }

    /// True iff the key resolves to no queue.
    pub fn is_global_property(&self, full_key: &str) -> bool {
        matches!(self.extract_queue_path(full_key), Ok(KeyLocation::Global))
    }

    /// Strip the global prefix.
    pub fn to_partial_key<'k>(&self, full_key: &'k str) -> Option<&'k str> {
        full_key.strip_prefix(self.prefix.as_str())
    }

    /// Strip prefix and queue path. None when the key does not belong to `queue_path`.
    pub fn to_simple_key(&self, full_key: &str, queue_path: &str) -> Option<String> {
        let partial = self.to_partial_key(full_key)?;
        let rest = partial.strip_prefix(queue_path)?;
        let simple = rest.strip_prefix(path::SEPARATOR)?;
        if simple.is_empty() {
            return None;
        }
        Some(simple.to_string())
    }

    pub fn to_full_key(&self, simple_key: &str, queue_path: &str) -> String {
        format!("{}{}.{}", self.prefix, queue_path, simple_key)
    }
}

/// A simple key that is unknown as a whole but ends in a known property, e.g.
/// `ghost.capacity` resolved against `root` when `root.ghost` was never declared.
fn is_undiscovered_queue_property(simple_key: &str) -> bool {
    if is_known_simple_key(simple_key)
        || TEMPLATE_PREFIXES.iter().any(|p| simple_key.starts_with(p))
    {
        return false;
    }
    simple_key
        .match_indices('.')
        .any(|(idx, _)| is_known_simple_key(&simple_key[idx + 1..]))
}

/// A child name in a `.queues` declaration that cannot form a queue path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedChild {
    pub parent: String,
    pub name: String,
}

/// Result of walking the `.queues` declarations
#[derive(Debug, Clone, Default)]
pub struct QueueDiscovery {
    pub paths: BTreeSet<String>,
    pub rejected: Vec<RejectedChild>,
}

/// Discover the full queue hierarchy from `.queues` declarations.
///
/// Pass 1 records every declared child list. Pass 2 walks the declarations
/// breadth-first from `root`, so only queues reachable from the root are kept.
/// Child names containing whitespace or dots are collected in `rejected`.
pub fn discover_queues<'a, I>(prefix: &str, raw: I) -> QueueDiscovery
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let suffix = format!(".{}", QUEUES_KEY);
    let mut declared: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in raw {
        let Some(partial) = name.strip_prefix(prefix) else {
            continue;
        };
        let Some(parent) = partial.strip_suffix(suffix.as_str()) else {
            continue;
        };
        if path::validate_path(parent).is_err() {
            debug!(key = name, "Ignoring queue declaration with malformed path");
            continue;
        }
        let children = value
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();
        declared.insert(parent.to_string(), children);
    }

    let mut discovery = QueueDiscovery::default();
    discovery.paths.insert(ROOT_QUEUE.to_string());
    let mut pending = VecDeque::from([ROOT_QUEUE.to_string()]);
    while let Some(parent) = pending.pop_front() {
        let Some(children) = declared.get(&parent) else {
            continue;
        };
        for child in children {
            let child_path = path::join(&parent, child);
            if path::validate_path(&child_path).is_err() || child.contains('.') {
                debug!(parent = %parent, child = %child, "Rejecting malformed child queue name");
                discovery.rejected.push(RejectedChild {
                    parent: parent.clone(),
                    name: child.clone(),
                });
                continue;
            }
            if discovery.paths.insert(child_path.clone()) {
                pending.push_back(child_path);
            }
        }
    }

    for parent in declared.keys() {
        if !discovery.paths.contains(parent) {
            debug!(queue = %parent, "Queue declaration not reachable from root");
        }
    }
    discovery
}

/// Queue paths reachable from `root`; see [`discover_queues`].
pub fn discover_queue_paths<'a, I>(prefix: &str, raw: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    discover_queues(prefix, raw).paths
}
