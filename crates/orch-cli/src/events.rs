//! Execution events and their one-line rendering.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

/// Whether a record is a workflow event or a log line emitted by an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Workflow/task lifecycle event.
    #[serde(rename = "cloudify_event")]
    Event,
    /// Log record emitted by an operation.
    #[serde(rename = "cloudify_log")]
    Log,
}

impl EventKind {
    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Event => "cloudify_event",
            Self::Log => "cloudify_log",
        }
    }
}

/// The cause of a failed task, attached to error events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCause {
    /// Error type name.
    #[serde(rename = "type")]
    pub kind: String,
    /// Error message.
    pub message: String,
}

/// An event or log record produced by an execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Record kind.
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Timestamp as reported by the manager.
    #[serde(default)]
    pub timestamp: String,
    /// Event type, e.g. `task_started` (events only).
    #[serde(default)]
    pub event_type: Option<String>,
    /// Log level (logs only).
    #[serde(default)]
    pub level: Option<String>,
    /// Deployment the record belongs to.
    #[serde(default)]
    pub deployment_id: Option<String>,
    /// Node instance the record belongs to.
    #[serde(default)]
    pub node_instance_id: Option<String>,
    /// Operation being run.
    #[serde(default)]
    pub operation: Option<String>,
    /// Human-readable message.
    #[serde(default)]
    pub message: Option<String>,
    /// Error causes attached to failure events.
    #[serde(default)]
    pub error_causes: Vec<ErrorCause>,
}

/// Renders an event as a single output entry.
///
/// Returns `None` for records with no message text; callers skip those.
/// The shape is `<timestamp> <LABEL> [<deployment>.<node_instance>.<operation>] <message>`,
/// where the label is the upper-cased event type for events and the
/// upper-cased level for logs, and the bracket holds whichever context parts
/// are present. Error causes follow on indented lines.
#[must_use]
pub fn format_event_prefix(event: &Event) -> Option<String> {
    let message = event
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())?;

    let label = match event.kind {
        EventKind::Event => event.event_type.as_deref().unwrap_or("event"),
        EventKind::Log => event.level.as_deref().unwrap_or("info"),
    }
    .to_uppercase();

    let context: Vec<&str> = [
        event.deployment_id.as_deref(),
        event.node_instance_id.as_deref(),
        event.operation.as_deref(),
    ]
    .into_iter()
    .flatten()
    .filter(|part| !part.is_empty())
    .collect();

    let mut out = String::new();
    if !event.timestamp.is_empty() {
        out.push_str(&event.timestamp);
        out.push(' ');
    }
    out.push_str(&label);
    if !context.is_empty() {
        let _ = write!(out, " [{}]", context.join("."));
    }
    let _ = write!(out, " {message}");

    for cause in &event.error_causes {
        let _ = write!(out, "\n    {}: {}", cause.kind, cause.message);
    }

    Some(out)
}
