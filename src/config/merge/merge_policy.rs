//! Merge rules: defaults, override order, conflict handling.

use crate::types::DEFAULT_PROPERTY_PREFIX;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
///
/// Sources added afterwards override in the order they are added: global
/// file, workspace files, environment.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("properties.prefix", DEFAULT_PROPERTY_PREFIX)?
        .set_default("validation.capacity_epsilon", 0.01)?
        .set_default("validation.allow_zero_sum", false)
}
