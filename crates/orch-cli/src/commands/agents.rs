//! Agents command implementation.
//!
//! `agents install` runs the `install_new_agents` workflow on one deployment,
//! or on every fully installed deployment at once. Each deployment gets its
//! own task: it starts the workflow, streams the execution's events to the
//! shared [`EventSink`] and records failures and timeouts in a shared
//! [`ErrorSummary`]. Once every task has finished, a non-empty summary is
//! reported as a single [`CliError::PartialFailure`].

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::api::{DeploymentDirectory, ExecutionService, StartExecution};
use crate::cli::{AgentsCommands, InstallArgs};
use crate::error::CliError;
use crate::events::{format_event_prefix, Event};
use crate::sink::EventSink;
use crate::wait::{wait_for_execution, WaitOptions, WAIT_FOR_EXECUTION_SLEEP_INTERVAL};

/// Workflow that installs agents on a deployment's hosts.
pub const INSTALL_NEW_AGENTS_WORKFLOW: &str = "install_new_agents";

/// How long each deployment's installation is waited for.
pub const DEFAULT_INSTALL_TIMEOUT: Duration = Duration::from_secs(900);

/// Workflow parameter carrying a custom install script.
const INSTALL_SCRIPT_PARAMETER: &str = "install_script";

/// Options for one `agents install` run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOptions {
    /// Stream log records in addition to events.
    pub include_logs: bool,
    /// Alternative install script passed to the workflow.
    pub install_script: Option<String>,
    /// Per-deployment wait timeout.
    pub timeout: Duration,
    /// Delay between execution polls.
    pub poll_interval: Duration,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            include_logs: false,
            install_script: None,
            timeout: DEFAULT_INSTALL_TIMEOUT,
            poll_interval: WAIT_FOR_EXECUTION_SLEEP_INTERVAL,
        }
    }
}

impl From<&InstallArgs> for InstallOptions {
    fn from(args: &InstallArgs) -> Self {
        Self {
            include_logs: args.include_logs,
            install_script: args.install_script.clone(),
            ..Self::default()
        }
    }
}

impl InstallOptions {
    fn wait_options(&self) -> WaitOptions {
        WaitOptions::new(self.timeout)
            .with_include_logs(self.include_logs)
            .with_poll_interval(self.poll_interval)
    }

    fn start_request(&self, deployment_id: &str) -> StartExecution {
        let request = StartExecution::new(deployment_id, INSTALL_NEW_AGENTS_WORKFLOW);
        match &self.install_script {
            Some(script) => request.with_custom_parameter(INSTALL_SCRIPT_PARAMETER, script.as_str()),
            None => request,
        }
    }
}

/// Failure messages collected from concurrent tasks.
///
/// Appends happen only from inside a task; the list is read once every task
/// has been joined.
#[derive(Debug, Clone, Default)]
pub struct ErrorSummary {
    entries: Arc<Mutex<Vec<String>>>,
}

impl ErrorSummary {
    /// Appends a message.
    pub fn push(&self, message: String) {
        self.entries.lock().push(message);
    }

    /// Takes every message collected so far, in append order.
    #[must_use]
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.entries.lock())
    }
}

/// Handler for the agents command.
pub struct AgentsCommand<C> {
    client: Arc<C>,
    sink: EventSink,
}

impl<C> AgentsCommand<C>
where
    C: ExecutionService + DeploymentDirectory + 'static,
{
    /// Creates a new agents command handler.
    #[must_use]
    pub fn new(client: Arc<C>, sink: EventSink) -> Self {
        Self { client, sink }
    }

    /// Executes the agents command.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub async fn execute(&self, command: &AgentsCommands) -> Result<(), CliError> {
        match command {
            AgentsCommands::Install(args) => {
                self.install(args.deployment_id.as_deref(), InstallOptions::from(args))
                    .await
            }
        }
    }

    /// Installs agents on `deployment_id`, or on every installed deployment.
    ///
    /// # Errors
    ///
    /// Returns a pre-flight error if there is nothing to install on,
    /// [`CliError::PartialFailure`] if any deployment failed or timed out, or
    /// the first unexpected error raised by a task.
    pub async fn install(
        &self,
        deployment_id: Option<&str>,
        options: InstallOptions,
    ) -> Result<(), CliError> {
        let targets = self.resolve_targets(deployment_id).await?;
        self.install_on(targets, options).await
    }

    /// Works out which deployments to install agents on.
    ///
    /// # Errors
    ///
    /// - [`CliError::DeploymentNotFound`] if `deployment_id` does not exist
    /// - [`CliError::DeploymentNotInstalled`] if it has node instances that are
    ///   not started
    /// - [`CliError::NoInstalledDeployments`] if no deployment was given and
    ///   none is fully installed
    pub async fn resolve_targets(
        &self,
        deployment_id: Option<&str>,
    ) -> Result<Vec<String>, CliError> {
        let client = self.client.as_ref();

        if let Some(deployment_id) = deployment_id {
            client.get_deployment(deployment_id).await?;
            if !is_deployment_installed(client, deployment_id).await? {
                return Err(CliError::DeploymentNotInstalled(deployment_id.to_string()));
            }
            self.sink
                .line(&format!("Installing agent for deployment '{deployment_id}'"))?;
            return Ok(vec![deployment_id.to_string()]);
        }

        let mut targets = Vec::new();
        for deployment in client.list_deployments().await? {
            if is_deployment_installed(client, &deployment.id).await? {
                targets.push(deployment.id);
            } else {
                debug!(deployment_id = %deployment.id, "skipping deployment that is not installed");
            }
        }

        if targets.is_empty() {
            return Err(CliError::NoInstalledDeployments);
        }
        self.sink
            .line("Installing agents for all installed deployments")?;
        Ok(targets)
    }

    /// Runs the installation on every target concurrently and waits for all
    /// of them.
    ///
    /// `targets` is expected to be non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::PartialFailure`] listing every deployment whose
    /// execution failed or timed out, or the first unexpected error raised
    /// by a task. If both happened, the unexpected error is wrapped in
    /// [`CliError::Aborted`] together with the summary. Every task has
    /// finished when this returns.
    pub async fn install_on(
        &self,
        targets: Vec<String>,
        options: InstallOptions,
    ) -> Result<(), CliError> {
        let summary = ErrorSummary::default();
        let options = Arc::new(options);
        let mut tasks = JoinSet::new();

        for target in targets {
            let client = Arc::clone(&self.client);
            let options = Arc::clone(&options);
            let summary = summary.clone();
            let sink = self.sink.clone();
            tasks.spawn(async move {
                install_agents(client.as_ref(), &target, &options, &summary, &sink).await
            });
        }

        let mut fatal = None;
        while let Some(joined) = tasks.join_next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => Err(CliError::Command(format!(
                    "agent installation task failed: {e}"
                ))),
            };
            if let Err(e) = outcome {
                error!(error = %e, "agent installation aborted");
                fatal.get_or_insert(e);
            }
        }

        let summary = summary.take();
        match fatal {
            Some(cause) if summary.is_empty() => Err(cause),
            Some(cause) => Err(CliError::Aborted {
                cause: Box::new(cause),
                summary,
            }),
            None if summary.is_empty() => Ok(()),
            None => Err(CliError::PartialFailure { summary }),
        }
    }
}

async fn is_deployment_installed<C: DeploymentDirectory>(
    client: &C,
    deployment_id: &str,
) -> Result<bool, CliError> {
    let instances = client.list_node_instances(deployment_id).await?;
    Ok(instances.iter().all(|instance| instance.is_started()))
}

/// Installs agents on one deployment.
///
/// Failed and timed-out executions are recorded in `summary`; any other error
/// is returned.
async fn install_agents<C: ExecutionService>(
    client: &C,
    deployment_id: &str,
    options: &InstallOptions,
    summary: &ErrorSummary,
    sink: &EventSink,
) -> Result<(), CliError> {
    let execution = client.start(options.start_request(deployment_id)).await?;
    info!(
        deployment_id,
        execution_id = %execution.id,
        "started agent installation"
    );

    let waited = wait_for_execution(
        client,
        execution,
        |events| write_events(sink, events),
        &options.wait_options(),
    )
    .await;

    match waited {
        Ok(execution) => match execution.error {
            Some(error) => summary.push(format!(
                "Execution of workflow '{INSTALL_NEW_AGENTS_WORKFLOW}' for deployment \
                 '{deployment_id}' failed. [error={error}]"
            )),
            None => sink.line(&format!(
                "Finished executing workflow '{INSTALL_NEW_AGENTS_WORKFLOW}' on deployment \
                 '{deployment_id}'"
            ))?,
        },
        Err(CliError::ExecutionTimeout { execution_id, .. }) => {
            summary.push(timeout_message(deployment_id, &execution_id, options.timeout));
        }
        Err(e) => return Err(e),
    }
    Ok(())
}

fn write_events(sink: &EventSink, events: &[Event]) -> Result<(), CliError> {
    let lines: Vec<String> = events.iter().filter_map(format_event_prefix).collect();
    if lines.is_empty() {
        return Ok(());
    }
    sink.lines(&lines)
}

fn timeout_message(deployment_id: &str, execution_id: &str, timeout: Duration) -> String {
    format!(
        "Timed out waiting for workflow '{INSTALL_NEW_AGENTS_WORKFLOW}' of deployment \
         '{deployment_id}' to end. The execution may still be running properly; however, \
         the command-line utility was instructed to wait up to {} seconds for its \
         completion.\n\n\
         * Run 'orchctl executions list' to determine the execution's status.\n\
         * Run 'orchctl executions cancel --execution-id {execution_id}' to cancel the \
         running workflow.",
        timeout.as_secs()
    )
}
