//! Manager resource types and the service traits the commands are written
//! against.
//!
//! [`crate::client::ManagerClient`] implements both traits over the REST API.
//! Commands take the traits as generic parameters so they can be driven by an
//! in-memory manager in tests.

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CliError;
use crate::events::{Event, EventKind};

/// Node instance state reported once the instance is fully installed.
pub const NODE_INSTANCE_STATE_STARTED: &str = "started";

/// Lifecycle state of a remote workflow execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ExecutionStatus {
    /// Queued, not yet picked up.
    Pending,
    /// Running.
    Started,
    /// Cancellation requested.
    Cancelling,
    /// Forced cancellation requested.
    ForceCancelling,
    /// Finished successfully.
    Terminated,
    /// Finished with an error.
    Failed,
    /// Cancelled before finishing.
    Cancelled,
    /// A state this client does not know about.
    Other(String),
}

impl ExecutionStatus {
    /// Returns the wire representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Started => "started",
            Self::Cancelling => "cancelling",
            Self::ForceCancelling => "force_cancelling",
            Self::Terminated => "terminated",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Other(s) => s,
        }
    }

    /// Returns true if the execution will not transition any further.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminated | Self::Failed | Self::Cancelled)
    }
}

impl From<String> for ExecutionStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => Self::Pending,
            "started" => Self::Started,
            "cancelling" => Self::Cancelling,
            "force_cancelling" => Self::ForceCancelling,
            "terminated" => Self::Terminated,
            "failed" => Self::Failed,
            "cancelled" => Self::Cancelled,
            _ => Self::Other(s),
        }
    }
}

impl From<ExecutionStatus> for String {
    fn from(status: ExecutionStatus) -> Self {
        match status {
            ExecutionStatus::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A remote workflow execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Execution {
    /// Execution ID.
    pub id: String,
    /// Workflow being executed.
    pub workflow_id: String,
    /// Deployment the workflow runs against.
    pub deployment_id: String,
    /// Current status.
    pub status: ExecutionStatus,
    /// Error text, present only when the execution failed.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub error: Option<String>,
    /// Creation time as reported by the manager.
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Request to start a workflow execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StartExecution {
    /// Target deployment.
    pub deployment_id: String,
    /// Workflow to run.
    pub workflow_id: String,
    /// Workflow parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Map<String, serde_json::Value>>,
    /// Whether parameters not declared by the workflow are accepted.
    pub allow_custom_parameters: bool,
}

impl StartExecution {
    /// Creates a request without parameters.
    #[must_use]
    pub fn new(deployment_id: impl Into<String>, workflow_id: impl Into<String>) -> Self {
        Self {
            deployment_id: deployment_id.into(),
            workflow_id: workflow_id.into(),
            parameters: None,
            allow_custom_parameters: false,
        }
    }

    /// Adds a custom parameter and marks the request as allowing custom
    /// parameters.
    #[must_use]
    pub fn with_custom_parameter(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.parameters
            .get_or_insert_with(serde_json::Map::new)
            .insert(key.into(), value.into());
        self.allow_custom_parameters = true;
        self
    }
}

/// A deployment known to the manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    /// Deployment ID.
    pub id: String,
    /// Blueprint the deployment was created from.
    #[serde(default)]
    pub blueprint_id: Option<String>,
}

/// A node instance of a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInstance {
    /// Node instance ID.
    pub id: String,
    /// Node this instance belongs to.
    #[serde(default)]
    pub node_id: String,
    /// Owning deployment.
    pub deployment_id: String,
    /// Lifecycle state.
    pub state: String,
}

impl NodeInstance {
    /// Returns true if the instance finished installing.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.state == NODE_INSTANCE_STATE_STARTED
    }
}

/// Query for one page of an execution's events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    /// Execution whose events are listed.
    pub execution_id: String,
    /// Number of events to skip.
    pub offset: usize,
    /// Maximum number of events to return.
    pub size: usize,
    /// Whether log records are returned alongside events.
    pub include_logs: bool,
}

impl EventQuery {
    /// Returns the event kinds this query selects.
    #[must_use]
    pub fn kinds(&self) -> &'static [EventKind] {
        if self.include_logs {
            &[EventKind::Event, EventKind::Log]
        } else {
            &[EventKind::Event]
        }
    }
}

/// One page of events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPage {
    /// Events in chronological order.
    pub items: Vec<Event>,
    /// Total number of matching events on the manager.
    pub total: usize,
}

/// Remote workflow executions.
pub trait ExecutionService: Send + Sync {
    /// Starts a workflow execution.
    fn start(
        &self,
        request: StartExecution,
    ) -> impl Future<Output = Result<Execution, CliError>> + Send;

    /// Fetches the current state of an execution.
    fn get(&self, execution_id: &str) -> impl Future<Output = Result<Execution, CliError>> + Send;

    /// Lists executions, optionally restricted to one deployment.
    fn list(
        &self,
        deployment_id: Option<&str>,
    ) -> impl Future<Output = Result<Vec<Execution>, CliError>> + Send;

    /// Requests cancellation of an execution.
    fn cancel(
        &self,
        execution_id: &str,
        force: bool,
    ) -> impl Future<Output = Result<Execution, CliError>> + Send;

    /// Lists one page of an execution's events.
    fn list_events(
        &self,
        query: &EventQuery,
    ) -> impl Future<Output = Result<EventPage, CliError>> + Send;
}

/// Deployments and their node instances.
pub trait DeploymentDirectory: Send + Sync {
    /// Fetches a deployment.
    ///
    /// Fails with [`CliError::DeploymentNotFound`] if it does not exist.
    fn get_deployment(
        &self,
        deployment_id: &str,
    ) -> impl Future<Output = Result<Deployment, CliError>> + Send;

    /// Lists all deployments.
    fn list_deployments(&self) -> impl Future<Output = Result<Vec<Deployment>, CliError>> + Send;

    /// Lists the node instances of a deployment.
    fn list_node_instances(
        &self,
        deployment_id: &str,
    ) -> impl Future<Output = Result<Vec<NodeInstance>, CliError>> + Send;
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}
