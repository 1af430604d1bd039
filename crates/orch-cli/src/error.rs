//! CLI error types.

use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Manager connection failed.
    #[error("connection error: {0}")]
    Connection(String),

    /// The manager answered with a non-success status.
    #[error("manager error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message reported by the manager.
        message: String,
    },

    /// The manager answered with something we could not decode.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The requested deployment does not exist.
    #[error("could not find deployment for deployment id: '{0}'")]
    DeploymentNotFound(String),

    /// The requested deployment has node instances that are not started.
    #[error("deployment '{0}' is not installed")]
    DeploymentNotInstalled(String),

    /// No deployment is fully installed.
    #[error("there are no deployments installed")]
    NoInstalledDeployments,

    /// Waiting for an execution exceeded the allowed time.
    #[error("{message} (execution id: {execution_id})")]
    ExecutionTimeout {
        /// The execution that did not finish in time.
        execution_id: String,
        /// Description of what timed out.
        message: String,
    },

    /// Some targets of a multi-deployment operation failed.
    ///
    /// This is an expected outcome rather than a crash: every entry has
    /// already been formatted for the operator.
    #[error("Summary:\n{}\n", .summary.join("\n"))]
    PartialFailure {
        /// One message per failed target.
        summary: Vec<String>,
    },

    /// A target failed unexpectedly while other targets had already
    /// recorded failures of their own.
    #[error("{cause}\n\nSummary:\n{}\n", .summary.join("\n"))]
    Aborted {
        /// The unexpected error that ended the operation.
        cause: Box<CliError>,
        /// Failures recorded by the other targets.
        summary: Vec<String>,
    },

    /// Command execution failed.
    #[error("command error: {0}")]
    Command(String),

    /// Output formatting error.
    #[error("format error: {0}")]
    Format(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Returns true for outcomes that were already reported to the operator
    /// and should be printed as-is rather than as an unexpected error.
    #[must_use]
    pub const fn is_suppressed(&self) -> bool {
        matches!(self, Self::PartialFailure { .. })
    }

    /// Returns true if the manager reported that the resource does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. } | Self::DeploymentNotFound(_))
    }
}

impl From<reqwest::Error> for CliError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Protocol(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Api {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            Self::Connection(err.to_string())
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        Self::Protocol(err.to_string())
    }
}
