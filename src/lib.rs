//! qstage: Capacity-Scheduler Queue Configuration Staging
//!
//! Builds an in-memory queue hierarchy from a structural snapshot and raw
//! `yarn.scheduler.capacity.*` properties, stages additions, updates, and
//! removals with undo/redo, validates the effective tree, and emits the
//! mutation payload for the remote configuration API.

pub mod capacity;
pub mod cli;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod keys;
pub mod ledger;
pub mod logging;
pub mod manager;
pub mod payload;
pub mod properties;
pub mod script;
pub mod snapshot;
pub mod tree;
pub mod types;
pub mod validation;

pub use capacity::{Capacity, CapacityMode, CapacityValue, ResourceAmount, ResourceVector};
pub use collaborators::{ClusterLabels, NoLabels, NoRuntime, NodeLabelSource, RuntimeStateSource};
pub use error::{ApiError, CapacityParseError, StructuralError};
pub use keys::{KeyLocation, PropertyKeyMapper};
pub use ledger::{ChangeKind, ChangeLedger, ChangeRecord};
pub use manager::{ConfigurationManager, PendingChange};
pub use payload::{ApiPayload, QueueMutation};
pub use properties::{QueueProperties, QueueState};
pub use snapshot::{QueueSnapshot, RawProperty};
pub use types::{PropertyMap, Severity};
pub use validation::{ValidationError, ValidationPolicy, Validator};
