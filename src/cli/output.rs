//! CLI output: command results and error mapping to a stable CLI surface.

use crate::error::ApiError;

/// Rendered command output plus whether the command succeeded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub text: String,
    pub success: bool,
}

impl CommandOutput {
    pub fn ok(text: String) -> Self {
        Self {
            text,
            success: true,
        }
    }

    pub fn failed(text: String) -> Self {
        Self {
            text,
            success: false,
        }
    }

    /// Process exit code for this result
    pub fn exit_code(&self) -> i32 {
        if self.success {
            0
        } else {
            1
        }
    }
}

/// Map domain/service errors to a string for CLI output.
pub fn map_error(e: &ApiError) -> String {
    match e {
        ApiError::ChangeScript { index, source } => {
            format!("Change script entry {} was rejected: {}", index, source)
        }
        ApiError::ValidationFailed(count) => format!(
            "Refusing to build a payload: validation reported {} error(s). Use --force to override.",
            count
        ),
        other => other.to_string(),
    }
}
