//! CLI domain: parse, route, help, output, and presentation only.
//! No domain orchestration; single route table dispatches to domain services.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::{command_name, wants_json};
pub use output::{map_error, CommandOutput};
pub use parse::{Cli, Commands, SessionArgs};
pub use presentation::{
    format_paths_json, format_paths_text, format_pending_changes_json,
    format_pending_changes_text, format_properties_json, format_properties_text,
    format_section_heading, format_validation_json, format_validation_text,
};
pub use route::RunContext;
