//! Build step error types.

use crate::command::MalformedArgumentError;
use crate::process::SpawnError;
use crate::tool::InstallationNotFoundError;

/// Errors that abort a compile step.
///
/// Every variant fails the build; a non-zero compiler exit code is not an
/// error and is handled by the outcome decision instead.
#[derive(thiserror::Error, Debug)]
pub enum CompileError {
    /// The configured installation name is unknown.
    #[error(transparent)]
    InstallationNotFound(#[from] InstallationNotFoundError),

    /// The resolved executable does not exist on the node.
    #[error("{0} doesn't exist")]
    ToolNotFound(String),

    /// The node could not be asked about the installation.
    #[error("Failed checking for existence of {path}: {source}")]
    Node {
        path: String,
        source: std::io::Error,
    },

    /// The arguments could not be tokenized.
    #[error(transparent)]
    MalformedArgument(#[from] MalformedArgumentError),

    /// The compiler could not be started.
    #[error("Failed to launch {executable}: {source}")]
    Launch {
        executable: String,
        source: SpawnError,
    },

    /// Launched process has no stdout to read.
    #[error("Compiler stdout not available")]
    NoStdout,

    /// Reading the compiler output or writing the logs failed.
    #[error("I/O error while running the compiler: {0}")]
    Io(#[from] std::io::Error),

    /// The compiler ended without reporting an exit code.
    #[error("Compiler terminated without an exit code")]
    Terminated,
}

impl CompileError {
    /// Whether the failure happened before any process was started.
    #[must_use]
    pub fn is_pre_launch(&self) -> bool {
        matches!(
            self,
            Self::InstallationNotFound(_)
                | Self::ToolNotFound(_)
                | Self::Node { .. }
                | Self::MalformedArgument(_)
        )
    }
}
