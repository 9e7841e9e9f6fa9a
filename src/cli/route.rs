//! CLI route: single route table and run context. Dispatches to domain services and presentation.

use crate::cli::help::{command_name, wants_json};
use crate::cli::output::CommandOutput;
use crate::cli::parse::{Commands, SessionArgs};
use crate::cli::presentation::{
    format_paths_json, format_paths_text, format_pending_changes_json,
    format_pending_changes_text, format_properties_json, format_properties_text,
    format_validation_json, format_validation_text,
};
use crate::collaborators::ClusterLabels;
use crate::config::{ConfigLoader, QStageConfig};
use crate::error::ApiError;
use crate::keys::PropertyKeyMapper;
use crate::manager::ConfigurationManager;
use crate::script::{apply_script, parse_script};
use crate::snapshot::{parse_raw_properties, QueueSnapshot, SnapshotRuntime};
use crate::validation::{has_blocking_errors, ValidationError, Validator};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, info_span};

/// Runtime context for CLI execution: workspace and loaded configuration.
/// Built from workspace path and optional config path using ConfigLoader only.
pub struct RunContext {
    workspace_root: PathBuf,
    config: QStageConfig,
}

/// A hydrated manager plus the runtime view of its snapshot
struct Session {
    manager: ConfigurationManager,
    runtime: SnapshotRuntime,
}

impl RunContext {
    /// Create run context from workspace root and optional config path.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };
        config.ensure_valid()?;
        Ok(Self {
            workspace_root,
            config,
        })
    }

    /// Context with an explicit configuration, bypassing file loading.
    pub fn with_config(workspace_root: PathBuf, config: QStageConfig) -> Result<Self, ApiError> {
        config.ensure_valid()?;
        Ok(Self {
            workspace_root,
            config,
        })
    }

    pub fn config(&self) -> &QStageConfig {
        &self.config
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<CommandOutput, ApiError> {
        let started = Instant::now();
        let span = info_span!("command", name = command_name(command));
        let _enter = span.enter();

        let result = self.execute_inner(command);
        info!(
            ok = result.as_ref().map(|o| o.success).unwrap_or(false),
            json = wants_json(command),
            duration_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        result
    }

    fn execute_inner(&self, command: &Commands) -> Result<CommandOutput, ApiError> {
        match command {
            Commands::Paths { properties, format } => {
                let raw = parse_raw_properties(&self.read_input(properties)?)?;
                let mapper = PropertyKeyMapper::discover(
                    &self.config.properties.prefix,
                    raw.iter().map(|p| (p.name.as_str(), p.value.as_str())),
                );
                let paths = mapper.queue_paths();
                let text = if format == "json" {
                    format_paths_json(&paths)?
                } else {
                    format_paths_text(&paths)
                };
                Ok(CommandOutput::ok(text))
            }
            Commands::Show {
                session,
                queue,
                format,
            } => {
                let session = self.load_session(session)?;
                let text = if format == "json" {
                    format_properties_json(&session.manager, queue.as_deref())?
                } else {
                    format_properties_text(&session.manager, queue.as_deref())?
                };
                Ok(CommandOutput::ok(text))
            }
            Commands::Validate {
                session,
                labels,
                format,
            } => {
                let session = self.load_session(session)?;
                let findings = self.validate(&session, labels.as_deref())?;
                let text = if format == "json" {
                    format_validation_json(&findings)?
                } else {
                    format_validation_text(&findings)
                };
                if has_blocking_errors(&findings) {
                    Ok(CommandOutput::failed(text))
                } else {
                    Ok(CommandOutput::ok(text))
                }
            }
            Commands::Diff { session, format } => {
                let session = self.load_session(session)?;
                let rows = session.manager.pending_changes();
                let text = if format == "json" {
                    format_pending_changes_json(&rows)?
                } else {
                    format_pending_changes_text(&rows)
                };
                Ok(CommandOutput::ok(text))
            }
            Commands::Payload {
                session,
                labels,
                force,
            } => {
                let session = self.load_session(session)?;
                let findings = self.validate(&session, labels.as_deref())?;
                let errors = findings.iter().filter(|f| f.is_error()).count();
                if errors > 0 && !*force {
                    return Err(ApiError::ValidationFailed(errors));
                }
                let payload = session.manager.get_api_payload();
                Ok(CommandOutput::ok(payload.to_json_pretty()?))
            }
            Commands::Config { format } => {
                let text = if format == "json" {
                    serde_json::to_string_pretty(&self.config)?
                } else {
                    toml::to_string_pretty(&self.config)
                        .map_err(|e| ApiError::ConfigError(e.to_string()))?
                };
                Ok(CommandOutput::ok(text))
            }
        }
    }

    fn load_session(&self, args: &SessionArgs) -> Result<Session, ApiError> {
        let snapshot = QueueSnapshot::from_json(&self.read_input(&args.structure)?)?;
        let raw = parse_raw_properties(&self.read_input(&args.properties)?)?;
        let mut manager =
            ConfigurationManager::hydrate(&self.config.properties.prefix, &snapshot, &raw)?;

        if let Some(changes) = &args.changes {
            let script = parse_script(&self.read_input(changes)?)?;
            apply_script(&mut manager, &script)?;
        }
        debug!(
            queues = manager.tree().len(),
            staged = manager.has_pending_changes(),
            "Session loaded"
        );
        Ok(Session {
            manager,
            runtime: SnapshotRuntime::from_snapshot(&snapshot),
        })
    }

    fn validate(
        &self,
        session: &Session,
        labels: Option<&Path>,
    ) -> Result<Vec<ValidationError>, ApiError> {
        let cluster = match labels {
            Some(path) => Some(ClusterLabels::from_json(&self.read_input(path)?)?),
            None => None,
        };
        let mut validator =
            Validator::new(self.config.validation.clone())?.with_runtime(&session.runtime);
        if let Some(cluster) = &cluster {
            validator = validator.with_labels(cluster);
        }
        Ok(validator.validate(&session.manager))
    }

    /// Relative input paths resolve against the workspace root.
    fn read_input(&self, path: &Path) -> Result<String, ApiError> {
        let resolved = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        };
        std::fs::read_to_string(&resolved).map_err(|e| {
            ApiError::IoError(std::io::Error::new(
                e.kind(),
                format!("{}: {}", resolved.display(), e),
            ))
        })
    }
}
