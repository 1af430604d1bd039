//! Waiting for remote executions to finish.
//!
//! [`wait_for_execution`] polls the manager until an execution reaches a
//! terminal state, handing every newly observed batch of events to a caller
//! supplied handler along the way.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, trace};

use crate::api::{EventQuery, Execution, ExecutionService};
use crate::error::CliError;
use crate::events::Event;

/// Delay between two polls of an execution's status.
pub const WAIT_FOR_EXECUTION_SLEEP_INTERVAL: Duration = Duration::from_secs(3);

/// Default page size when fetching events.
pub const EVENTS_BATCH_SIZE: usize = 100;

/// How [`wait_for_execution`] polls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitOptions {
    /// Fetch log records in addition to events.
    pub include_logs: bool,
    /// Maximum time to wait, measured from the start of the wait call.
    pub timeout: Duration,
    /// Delay between polls.
    pub poll_interval: Duration,
    /// Page size for event fetching.
    pub batch_size: usize,
}

impl WaitOptions {
    /// Creates options with the given timeout and default polling.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self {
            include_logs: false,
            timeout,
            poll_interval: WAIT_FOR_EXECUTION_SLEEP_INTERVAL,
            batch_size: EVENTS_BATCH_SIZE,
        }
    }

    /// Sets whether log records are fetched.
    #[must_use]
    pub const fn with_include_logs(mut self, include_logs: bool) -> Self {
        self.include_logs = include_logs;
        self
    }

    /// Sets the poll interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

}

/// Tracks how far into an execution's event stream we have read.
#[derive(Debug)]
struct EventCursor {
    query: EventQuery,
}

impl EventCursor {
    fn new(execution_id: &str, options: &WaitOptions) -> Self {
        Self {
            query: EventQuery {
                execution_id: execution_id.to_string(),
                offset: 0,
                size: options.batch_size.max(1),
                include_logs: options.include_logs,
            },
        }
    }

    /// Fetches every event past the cursor and hands each page to `handler`.
    async fn drain<S, F>(&mut self, service: &S, handler: &mut F) -> Result<usize, CliError>
    where
        S: ExecutionService,
        F: FnMut(&[Event]) -> Result<(), CliError> + Send,
    {
        let mut seen = 0;
        loop {
            let page = service.list_events(&self.query).await?;
            let count = page.items.len();
            if count == 0 {
                break;
            }

            self.query.offset += count;
            seen += count;
            handler(&page.items)?;

            if count < self.query.size || self.query.offset >= page.total {
                break;
            }
        }
        trace!(
            execution_id = %self.query.execution_id,
            offset = self.query.offset,
            seen,
            "fetched events"
        );
        Ok(seen)
    }
}

/// Waits until `execution` reaches a terminal state.
///
/// Events are fetched before every status check, and once more after the
/// execution turned terminal so nothing emitted at the very end is lost.
///
/// # Errors
///
/// Returns [`CliError::ExecutionTimeout`] carrying the execution ID if the
/// execution is still running once `options.timeout` has elapsed. Errors from
/// the manager or from `handler` are returned as they are.
pub async fn wait_for_execution<S, F>(
    service: &S,
    execution: Execution,
    mut handler: F,
    options: &WaitOptions,
) -> Result<Execution, CliError>
where
    S: ExecutionService,
    F: FnMut(&[Event]) -> Result<(), CliError> + Send,
{
    let deadline = Instant::now() + options.timeout;
    let mut cursor = EventCursor::new(&execution.id, options);
    let mut execution = execution;

    loop {
        cursor.drain(service, &mut handler).await?;

        execution = service.get(&execution.id).await?;
        debug!(
            execution_id = %execution.id,
            status = %execution.status,
            "polled execution"
        );

        if execution.status.is_terminal() {
            cursor.drain(service, &mut handler).await?;
            return Ok(execution);
        }

        if Instant::now() >= deadline {
            return Err(CliError::ExecutionTimeout {
                message: format!(
                    "execution of workflow '{}' for deployment '{}' timed out",
                    execution.workflow_id, execution.deployment_id
                ),
                execution_id: execution.id,
            });
        }

        sleep(options.poll_interval).await;
    }
}
