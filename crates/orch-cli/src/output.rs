//! Output formatting for CLI commands.
//!
//! Supports table (human-readable) and JSON output formats.

use std::io::Write;

use serde::Serialize;

use crate::api::Execution;
use crate::cli::Format;
use crate::error::CliError;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Write a serializable value to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => {
                value.write_table(writer)?;
            }
        }
        Ok(())
    }

    /// Write a serializable value to a string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_string<T>(&self, value: &T) -> Result<String, CliError>
    where
        T: Serialize + TableDisplay,
    {
        let mut buf = Vec::new();
        self.write(&mut buf, value)?;
        String::from_utf8(buf).map_err(|e| CliError::Format(format!("UTF-8 error: {e}")))
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

/// Executions for listing.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct ExecutionList {
    /// Executions, in the order the manager returned them.
    pub executions: Vec<Execution>,
}

impl TableDisplay for ExecutionList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.executions.is_empty() {
            writeln!(writer, "No executions found")?;
            return Ok(());
        }

        writeln!(
            writer,
            "{:<36}  {:<24}  {:<24}  {:<16}  {:<24}",
            "ID", "WORKFLOW", "DEPLOYMENT", "STATUS", "CREATED"
        )?;
        writeln!(writer, "{}", "─".repeat(132))?;

        for execution in &self.executions {
            writeln!(
                writer,
                "{:<36}  {:<24}  {:<24}  {:<16}  {:<24}",
                truncate(&execution.id, 36),
                truncate(&execution.workflow_id, 24),
                truncate(&execution.deployment_id, 24),
                execution.status,
                execution.created_at.as_deref().unwrap_or("-"),
            )?;
        }

        writeln!(writer)?;
        writeln!(writer, "Total: {} execution(s)", self.executions.len())?;
        Ok(())
    }
}

/// Result of a cancellation request.
#[derive(Debug, Clone, Serialize)]
pub struct CancelResult {
    /// The execution after the request.
    pub execution: Execution,
    /// Whether a forced cancellation was requested.
    pub force: bool,
}

impl TableDisplay for CancelResult {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        let verb = if self.force {
            "Force-cancelling"
        } else {
            "Cancelling"
        };
        writeln!(
            writer,
            "✓ {verb} execution '{}' of workflow '{}' on deployment '{}'",
            self.execution.id, self.execution.workflow_id, self.execution.deployment_id
        )?;
        writeln!(writer, "  Status: {}", self.execution.status)?;
        Ok(())
    }
}

/// Truncate a string to a maximum length, adding ellipsis if needed.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{kept}...")
    } else {
        s.chars().take(max_len).collect()
    }
}
