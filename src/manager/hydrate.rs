//! Hydration: one tree from a structural snapshot plus raw properties

use super::ConfigurationManager;
use crate::error::StructuralError;
use crate::keys::{self, KeyLocation};
use crate::snapshot::{QueueSnapshot, RawProperty};
use crate::tree::TreeBuilder;
use crate::types::QUEUES_KEY;
use crate::validation::ValidationError;
use std::time::Instant;
use tracing::{info, instrument, warn};

impl ConfigurationManager {
    /// Build a fresh manager.
    ///
    /// The snapshot supplies the queue shape; `.queues` declarations add any
    /// queues it lacks as placeholders. Each raw property is then assigned to
    /// the queue the key mapper resolves it to. Keys that resolve to no queue
    /// are global settings; unresolvable keys are kept as globals too and
    /// reported as warnings.
    #[instrument(skip_all, fields(properties = raw.len()))]
    pub fn hydrate(
        prefix: &str,
        snapshot: &QueueSnapshot,
        raw: &[RawProperty],
    ) -> Result<Self, StructuralError> {
        let start = Instant::now();
        let discovery = keys::discover_queues(
            prefix,
            raw.iter().map(|p| (p.name.as_str(), p.value.as_str())),
        );
        let built = TreeBuilder::new(snapshot)
            .with_discovered_paths(discovery.paths)
            .build()?;

        let mut manager = ConfigurationManager::new(prefix);
        for rejected in &discovery.rejected {
            warn!(parent = %rejected.parent, child = %rejected.name, "Malformed child queue name ignored");
            let declaration = format!("{}{}.{}", prefix, rejected.parent, QUEUES_KEY);
            manager.hydration_warnings.push(ValidationError::warning(
                Some(rejected.parent.as_str()),
                Some(declaration.as_str()),
                format!(
                    "child queue name '{}' contains whitespace or dots; ignored",
                    rejected.name
                ),
            ));
        }
        for node in built.tree.walk() {
            manager.mapper.register_path(node.full_path());
        }
        manager.tree = built.tree;

        for placeholder in &built.placeholders {
            warn!(queue = %placeholder, "Queue declared in properties but missing from snapshot");
            manager.hydration_warnings.push(ValidationError::warning(
                Some(placeholder.as_str()),
                None,
                "queue is declared in the configuration but missing from the structural snapshot",
            ));
        }

        for property in raw {
            match manager.mapper.extract_queue_path(&property.name) {
                Ok(KeyLocation::Queue { path, .. }) => {
                    if let Some(node) = manager.tree.get_mut(&path) {
                        node.base_properties
                            .insert(property.name.clone(), property.value.clone());
                        continue;
                    }
                    manager.retain_unresolved(property, "resolves to a queue missing from the tree");
                }
                Ok(KeyLocation::Global) => {
                    manager
                        .global_base
                        .insert(property.name.clone(), property.value.clone());
                }
                Err(e) => manager.retain_unresolved(property, &e.to_string()),
            }
        }

        info!(
            queues = manager.tree.len(),
            globals = manager.global_base.len(),
            warnings = manager.hydration_warnings.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Hydrated configuration"
        );
        Ok(manager)
    }

    /// Replace all state with a fresh hydration. Staged changes and history are
    /// discarded; on failure the current state is kept.
    pub fn rehydrate(
        &mut self,
        snapshot: &QueueSnapshot,
        raw: &[RawProperty],
    ) -> Result<(), StructuralError> {
        let prefix = self.mapper.prefix().to_string();
        *self = Self::hydrate(&prefix, snapshot, raw)?;
        Ok(())
    }

    fn retain_unresolved(&mut self, property: &RawProperty, reason: &str) {
        warn!(key = %property.name, reason, "Unresolved property kept as global setting");
        self.hydration_warnings.push(ValidationError::warning(
            None,
            Some(property.name.as_str()),
            format!("{}; kept as a global setting", reason),
        ));
        self.global_base
            .insert(property.name.clone(), property.value.clone());
    }
}
