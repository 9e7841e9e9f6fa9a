//! CLI presentation: text and json formatters per command family.

mod changes;
mod queues;
mod shared;
mod validation;

pub use changes::{format_pending_changes_json, format_pending_changes_text};
pub use queues::{
    format_paths_json, format_paths_text, format_properties_json, format_properties_text,
};
pub use shared::format_section_heading;
pub use validation::{format_validation_json, format_validation_text};
