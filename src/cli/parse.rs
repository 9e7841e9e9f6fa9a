//! CLI parse: clap types for qstage. No behavior; definitions only.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// qstage - stage, validate, and serialize capacity-scheduler queue changes
#[derive(Parser, Debug)]
#[command(name = "qstage")]
#[command(about = "Stage and validate capacity-scheduler queue configuration changes")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory (holds config/config.toml)
    #[arg(long, global = true, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, global = true, default_value = "false")]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, global = true, default_value = "false", conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

/// Snapshot inputs shared by every command that builds a tree
#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
    /// Structural snapshot JSON (queue hierarchy)
    #[arg(long)]
    pub structure: PathBuf,

    /// Raw properties JSON ({"property": [{name, value}]} or a bare array)
    #[arg(long)]
    pub properties: PathBuf,

    /// Change script JSON to stage before running the command
    #[arg(long)]
    pub changes: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List queue paths discovered from the raw properties
    Paths {
        /// Raw properties JSON
        #[arg(long)]
        properties: PathBuf,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show effective queue properties
    Show {
        #[command(flatten)]
        session: SessionArgs,
        /// Only this queue
        #[arg(long)]
        queue: Option<String>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Validate the effective tree; exits non-zero on errors
    Validate {
        #[command(flatten)]
        session: SessionArgs,
        /// Cluster node labels JSON ({"labels": [...], "nodes": {...}})
        #[arg(long)]
        labels: Option<PathBuf>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// List staged changes
    Diff {
        #[command(flatten)]
        session: SessionArgs,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Print the mutation payload for the staged changes
    Payload {
        #[command(flatten)]
        session: SessionArgs,
        /// Cluster node labels JSON
        #[arg(long)]
        labels: Option<PathBuf>,
        /// Emit the payload even when validation reports errors
        #[arg(long)]
        force: bool,
    },
    /// Print the resolved configuration
    Config {
        /// Output format (toml or json)
        #[arg(long, default_value = "toml")]
        format: String,
    },
}
