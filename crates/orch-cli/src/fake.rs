//! In-memory manager used by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::api::{
    Deployment, DeploymentDirectory, EventPage, EventQuery, Execution, ExecutionService,
    ExecutionStatus, NodeInstance, StartExecution,
};
use crate::error::CliError;
use crate::events::{Event, EventKind};

/// How executions started on a deployment behave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// Terminates successfully on the given poll.
    SucceedAfter(u32),
    /// Fails with the given error on the first poll.
    Fail(String),
    /// Never reaches a terminal state.
    Hang,
    /// The manager rejects the start request.
    RejectStart(String),
    /// Starting works but polling the execution fails.
    PollError(String),
}

#[derive(Debug)]
struct DeploymentEntry {
    deployment: Deployment,
    instances: Vec<NodeInstance>,
    outcome: Outcome,
    events: Vec<Event>,
}

#[derive(Debug)]
struct ExecutionEntry {
    execution: Execution,
    outcome: Outcome,
    polls: u32,
}

#[derive(Debug, Default)]
pub(crate) struct FakeManager {
    deployments: Vec<DeploymentEntry>,
    executions: Mutex<Vec<ExecutionEntry>>,
    starts: Mutex<Vec<StartExecution>>,
    terminal_polls: AtomicUsize,
}

impl FakeManager {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers a deployment with one node instance per entry of `states`.
    pub(crate) fn with_deployment(mut self, id: &str, states: &[&str], outcome: Outcome) -> Self {
        let instances = states
            .iter()
            .enumerate()
            .map(|(i, state)| NodeInstance {
                id: format!("{id}_vm_{i}"),
                node_id: "vm".into(),
                deployment_id: id.into(),
                state: (*state).into(),
            })
            .collect();
        self.deployments.push(DeploymentEntry {
            deployment: Deployment {
                id: id.into(),
                blueprint_id: Some("bp".into()),
            },
            instances,
            outcome,
            events: Vec::new(),
        });
        self
    }

    /// Adds `count` records of `kind` to every execution of a deployment.
    pub(crate) fn with_events(mut self, id: &str, count: usize, kind: EventKind) -> Self {
        let label = match kind {
            EventKind::Event => "event",
            EventKind::Log => "log",
        };
        if let Some(entry) = self.deployments.iter_mut().find(|d| d.deployment.id == id) {
            for i in 0..count {
                entry.events.push(Event {
                    kind,
                    timestamp: format!("2026-10-19 10:00:{i:02}.000"),
                    event_type: (kind == EventKind::Event).then(|| "task_succeeded".into()),
                    level: (kind == EventKind::Log).then(|| "info".into()),
                    deployment_id: Some(id.into()),
                    node_instance_id: Some(format!("{id}_vm_0")),
                    operation: Some("install_agent".into()),
                    message: Some(format!("{id} {label} {i}")),
                    error_causes: Vec::new(),
                });
            }
        }
        self
    }

    /// Every start request received, in arrival order.
    pub(crate) fn starts(&self) -> Vec<StartExecution> {
        self.starts.lock().clone()
    }

    /// Number of times an execution of `deployment_id` was polled.
    pub(crate) fn polls(&self, deployment_id: &str) -> u32 {
        self.executions
            .lock()
            .iter()
            .filter(|e| e.execution.deployment_id == deployment_id)
            .map(|e| e.polls)
            .sum()
    }

    /// Number of polls that observed a terminal state.
    pub(crate) fn terminal_polls(&self) -> usize {
        self.terminal_polls.load(Ordering::SeqCst)
    }

    fn entry(&self, deployment_id: &str) -> Option<&DeploymentEntry> {
        self.deployments
            .iter()
            .find(|d| d.deployment.id == deployment_id)
    }
}

fn execution_index(execution_id: &str) -> Option<usize> {
    execution_id
        .strip_prefix("exec-")
        .and_then(|n| n.parse::<usize>().ok())
        .and_then(|n| n.checked_sub(1))
}

fn not_found(what: &str, id: &str) -> CliError {
    CliError::Api {
        status: 404,
        message: format!("{what} '{id}' not found"),
    }
}

impl ExecutionService for FakeManager {
    async fn start(&self, request: StartExecution) -> Result<Execution, CliError> {
        self.starts.lock().push(request.clone());

        let entry = self
            .entry(&request.deployment_id)
            .ok_or_else(|| not_found("deployment", &request.deployment_id))?;
        if let Outcome::RejectStart(message) = &entry.outcome {
            return Err(CliError::Api {
                status: 400,
                message: message.clone(),
            });
        }

        let mut executions = self.executions.lock();
        let execution = Execution {
            id: format!("exec-{}", executions.len() + 1),
            workflow_id: request.workflow_id,
            deployment_id: request.deployment_id,
            status: ExecutionStatus::Pending,
            error: None,
            created_at: Some("2026-10-19 10:00:00.000".into()),
        };
        executions.push(ExecutionEntry {
            execution: execution.clone(),
            outcome: entry.outcome.clone(),
            polls: 0,
        });
        Ok(execution)
    }

    async fn get(&self, execution_id: &str) -> Result<Execution, CliError> {
        let mut executions = self.executions.lock();
        let index = execution_index(execution_id)
            .filter(|&i| i < executions.len())
            .ok_or_else(|| not_found("execution", execution_id))?;
        let entry = &mut executions[index];

        entry.polls += 1;
        if entry.execution.status.is_terminal() {
            self.terminal_polls.fetch_add(1, Ordering::SeqCst);
            return Ok(entry.execution.clone());
        }

        match &entry.outcome {
            Outcome::SucceedAfter(n) if entry.polls >= *n => {
                entry.execution.status = ExecutionStatus::Terminated;
            }
            Outcome::Fail(error) => {
                entry.execution.status = ExecutionStatus::Failed;
                entry.execution.error = Some(error.clone());
            }
            Outcome::PollError(message) => {
                return Err(CliError::Connection(message.clone()));
            }
            _ => entry.execution.status = ExecutionStatus::Started,
        }

        if entry.execution.status.is_terminal() {
            self.terminal_polls.fetch_add(1, Ordering::SeqCst);
        }
        Ok(entry.execution.clone())
    }

    async fn list(&self, deployment_id: Option<&str>) -> Result<Vec<Execution>, CliError> {
        Ok(self
            .executions
            .lock()
            .iter()
            .map(|e| &e.execution)
            .filter(|e| deployment_id.is_none_or(|d| e.deployment_id == d))
            .cloned()
            .collect())
    }

    async fn cancel(&self, execution_id: &str, force: bool) -> Result<Execution, CliError> {
        let mut executions = self.executions.lock();
        let index = execution_index(execution_id)
            .filter(|&i| i < executions.len())
            .ok_or_else(|| not_found("execution", execution_id))?;
        let entry = &mut executions[index];
        entry.execution.status = if force {
            ExecutionStatus::ForceCancelling
        } else {
            ExecutionStatus::Cancelling
        };
        Ok(entry.execution.clone())
    }

    async fn list_events(&self, query: &EventQuery) -> Result<EventPage, CliError> {
        let deployment_id = {
            let executions = self.executions.lock();
            execution_index(&query.execution_id)
                .and_then(|i| executions.get(i))
                .map(|e| e.execution.deployment_id.clone())
                .ok_or_else(|| not_found("execution", &query.execution_id))?
        };
        let kinds = query.kinds();
        let matching: Vec<&Event> = self
            .entry(&deployment_id)
            .map(|d| d.events.iter().filter(|e| kinds.contains(&e.kind)).collect())
            .unwrap_or_default();

        Ok(EventPage {
            total: matching.len(),
            items: matching
                .into_iter()
                .skip(query.offset)
                .take(query.size)
                .cloned()
                .collect(),
        })
    }
}

impl DeploymentDirectory for FakeManager {
    async fn get_deployment(&self, deployment_id: &str) -> Result<Deployment, CliError> {
        self.entry(deployment_id)
            .map(|d| d.deployment.clone())
            .ok_or_else(|| CliError::DeploymentNotFound(deployment_id.to_string()))
    }

    async fn list_deployments(&self) -> Result<Vec<Deployment>, CliError> {
        Ok(self
            .deployments
            .iter()
            .map(|d| d.deployment.clone())
            .collect())
    }

    async fn list_node_instances(&self, deployment_id: &str) -> Result<Vec<NodeInstance>, CliError> {
        Ok(self
            .entry(deployment_id)
            .map(|d| d.instances.clone())
            .unwrap_or_default())
    }
}
