//! CLI help and command-name contract for logging and routing.

use crate::cli::parse::Commands;

/// Command name recorded on the command span (e.g. "validate").
pub fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Paths { .. } => "paths",
        Commands::Show { .. } => "show",
        Commands::Validate { .. } => "validate",
        Commands::Diff { .. } => "diff",
        Commands::Payload { .. } => "payload",
        Commands::Config { .. } => "config",
    }
}

/// Whether the command's output is machine-readable.
pub fn wants_json(command: &Commands) -> bool {
    match command {
        Commands::Paths { format, .. }
        | Commands::Show { format, .. }
        | Commands::Validate { format, .. }
        | Commands::Diff { format, .. } => format == "json",
        Commands::Payload { .. } => true,
        Commands::Config { format } => format == "json",
    }
}
