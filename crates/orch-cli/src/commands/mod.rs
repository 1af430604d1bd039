//! CLI command implementations.
//!
//! Each submodule implements a specific CLI command:
//! - [`agents`] - Agent installation across deployments
//! - [`executions`] - Execution listing and cancellation

pub mod agents;
pub mod executions;

pub use agents::AgentsCommand;
pub use executions::ExecutionsCommand;
