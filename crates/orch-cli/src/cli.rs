//! Command-line argument parsing with clap.

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::DEFAULT_MANAGER_URL;

/// orchctl - orchestration manager command-line client.
#[derive(Parser, Debug, Clone)]
#[command(name = "orchctl")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Manager URL to connect to.
    #[arg(
        short,
        long,
        global = true,
        env = "ORCHCTL_MANAGER",
        default_value = DEFAULT_MANAGER_URL
    )]
    pub manager: String,

    /// Bearer token used to authenticate with the manager.
    #[arg(long, global = true, env = "ORCHCTL_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Tenant to act on.
    #[arg(long, global = true, env = "ORCHCTL_TENANT")]
    pub tenant: Option<String>,

    /// Output format.
    #[arg(short, long, global = true, value_enum, default_value_t = Format::Table)]
    pub format: Format,

    /// Show debug output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Handle deployment agents.
    Agents {
        /// Agents subcommand to execute.
        #[command(subcommand)]
        command: AgentsCommands,
    },

    /// Inspect and cancel workflow executions.
    Executions {
        /// Executions subcommand to execute.
        #[command(subcommand)]
        command: ExecutionsCommands,
    },
}

/// Agents subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum AgentsCommands {
    /// Install agents on the hosts of existing deployments.
    ///
    /// Without DEPLOYMENT_ID, agents are installed on every deployment whose
    /// node instances are all started.
    Install(InstallArgs),
}

/// Arguments for `agents install`.
#[derive(Args, Debug, Clone, Default)]
pub struct InstallArgs {
    /// Deployment to install agents for.
    pub deployment_id: Option<String>,

    /// Include logs in the streamed execution events.
    #[arg(short = 'l', long)]
    pub include_logs: bool,

    /// Alternative agent installation script.
    #[arg(short = 's', long, value_name = "PATH")]
    pub install_script: Option<String>,
}

/// Executions subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum ExecutionsCommands {
    /// List executions.
    List {
        /// Only list executions of this deployment.
        #[arg(short, long)]
        deployment_id: Option<String>,
    },

    /// Cancel a running execution.
    Cancel {
        /// Execution to cancel.
        #[arg(short, long)]
        execution_id: String,

        /// Terminate the execution abruptly instead of waiting for running
        /// operations.
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn agents_install_without_deployment() {
        let cli = Cli::parse_from(["orchctl", "agents", "install"]);
        match cli.command {
            Commands::Agents {
                command: AgentsCommands::Install(args),
            } => {
                assert_eq!(args.deployment_id, None);
                assert!(!args.include_logs);
                assert_eq!(args.install_script, None);
            }
            other => panic!("expected agents install, got {other:?}"),
        }
    }

    #[test]
    fn agents_install_with_all_flags() {
        let cli = Cli::parse_from([
            "orchctl",
            "agents",
            "install",
            "web-app",
            "--include-logs",
            "--install-script",
            "/opt/agent/install.sh",
            "--verbose",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Agents {
                command: AgentsCommands::Install(args),
            } => {
                assert_eq!(args.deployment_id.as_deref(), Some("web-app"));
                assert!(args.include_logs);
                assert_eq!(args.install_script.as_deref(), Some("/opt/agent/install.sh"));
            }
            other => panic!("expected agents install, got {other:?}"),
        }
    }

    #[test]
    fn executions_cancel_parses() {
        let cli = Cli::parse_from([
            "orchctl",
            "executions",
            "cancel",
            "--execution-id",
            "exec-1",
            "--force",
        ]);
        match cli.command {
            Commands::Executions {
                command: ExecutionsCommands::Cancel { execution_id, force },
            } => {
                assert_eq!(execution_id, "exec-1");
                assert!(force);
            }
            other => panic!("expected executions cancel, got {other:?}"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "orchctl",
            "executions",
            "list",
            "-d",
            "web-app",
            "--format",
            "json",
            "-m",
            "https://manager",
        ]);
        assert_eq!(cli.format, Format::Json);
        assert_eq!(cli.manager, "https://manager");
    }

    #[test]
    fn cancel_requires_execution_id() {
        let result = Cli::try_parse_from(["orchctl", "executions", "cancel"]);
        assert!(result.is_err());
    }
}
