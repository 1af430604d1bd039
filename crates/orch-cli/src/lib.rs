//! # orch-cli
//!
//! Command-line client for an orchestration manager.
//!
//! Provides commands for:
//! - Installing agents on the hosts of one or all installed deployments
//! - Listing and cancelling workflow executions
//!
//! # Architecture
//!
//! Commands are written against the [`api::ExecutionService`] and
//! [`api::DeploymentDirectory`] traits. [`client::ManagerClient`] implements
//! them over the manager's REST API.
//!
//! ```text
//! ┌──────────┐        REST/JSON        ┌───────────┐
//! │ orchctl  │◄───────────────────────►│  manager  │
//! └──────────┘                          └───────────┘
//! ```
//!
//! `agents install` fans out one task per deployment; see
//! [`commands::agents`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod output;
pub mod sink;
pub mod wait;

#[cfg(test)]
mod fake;

pub use cli::{AgentsCommands, Cli, Commands, ExecutionsCommands, Format, InstallArgs};
pub use client::ManagerClient;
pub use error::CliError;
pub use output::OutputFormat;
