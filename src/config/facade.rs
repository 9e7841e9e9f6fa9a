//! Entry point for loading layered configuration.

use super::merge::merge_policy;
use super::sources::{environment, global_file, workspace_file};
use super::QStageConfig;
use config::ConfigError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Loads [`QStageConfig`] from defaults, files, and the environment
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load for a workspace: defaults, then the user-level file, then
    /// `config/config.toml` and `config/{QSTAGE_ENV}.toml` under the workspace,
    /// then `QSTAGE_*` environment variables.
    pub fn load(workspace_root: &Path) -> Result<QStageConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = environment::add_to_builder(builder);
        let config: QStageConfig = builder.build()?.try_deserialize()?;
        debug!(workspace = %workspace_root.display(), "Configuration loaded");
        Ok(config)
    }

    /// Load a single explicit file on top of the defaults and environment.
    pub fn load_from_file(path: &Path) -> Result<QStageConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?
            .add_source(config::File::from(path.to_path_buf()).required(true));
        let builder = environment::add_to_builder(builder);
        builder.build()?.try_deserialize()
    }

    /// Location of the user-level config file
    pub fn xdg_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }
}
