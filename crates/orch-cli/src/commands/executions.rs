//! Executions command implementation.
//!
//! Lists workflow executions and cancels running ones. These are the commands
//! an operator is pointed at when `agents install` gives up waiting.

use std::io::Write;

use tracing::info;

use crate::api::ExecutionService;
use crate::cli::ExecutionsCommands;
use crate::error::CliError;
use crate::output::{CancelResult, ExecutionList, OutputFormat};

/// Handler for the executions command.
pub struct ExecutionsCommand<'a, C> {
    client: &'a C,
}

impl<'a, C: ExecutionService> ExecutionsCommand<'a, C> {
    /// Creates a new executions command handler.
    #[must_use]
    pub const fn new(client: &'a C) -> Self {
        Self { client }
    }

    /// Executes the executions command.
    ///
    /// # Errors
    ///
    /// Returns error if the manager request or writing the output fails.
    pub async fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        command: &ExecutionsCommands,
    ) -> Result<(), CliError> {
        match command {
            ExecutionsCommands::List { deployment_id } => {
                let executions = self.client.list(deployment_id.as_deref()).await?;
                format.write(out, &ExecutionList { executions })
            }
            ExecutionsCommands::Cancel {
                execution_id,
                force,
            } => {
                let execution = self.client.cancel(execution_id, *force).await?;
                info!(execution_id = %execution.id, force, "cancellation requested");
                format.write(
                    out,
                    &CancelResult {
                        execution,
                        force: *force,
                    },
                )
            }
        }
    }
}
