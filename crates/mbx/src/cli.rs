use crate::commands::ant::{execute_ant, AntArgs};
use crate::commands::build::{execute_build, BuildArgs};
use crate::commands::init::{execute_init, InitArgs};
use crate::commands::install::{execute_install, InstallArgs};
use crate::commands::status::{execute_status, StatusArgs};
use crate::ui;
use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Log format options
#[derive(Debug, Clone, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    Text,
    /// JSON structured format
    Json,
}

/// Log level options
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    /// Error messages only
    Error,
    /// Warning and error messages
    Warn,
    /// Informational messages and above
    Info,
    /// Debug messages and above
    Debug,
    /// All messages including trace
    Trace,
}

impl LogLevel {
    fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// mbx subcommands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create a new workspace directory and fetch the overlay into it
    Init {
        /// Name of the directory to create
        #[arg(value_name = "WORKSPACE_NAME")]
        name: String,
    },
    /// Build the native project and install the overlay, or refresh it with -u
    #[command(long_about = "Build the native project and install the overlay\n\n\
        Without flags this is a fresh install: local.properties is pointed at the SDK, the native build runs, \
        and the overlay is fetched. It refuses to run when an overlay is already present.\n\n\
        With -u/--update only the overlay files are deleted and fetched again. The workspace's own \
        .git directory is moved aside for the duration of the fetch and restored afterwards.")]
    Build {
        /// Refresh an existing overlay instead of a fresh install
        #[arg(short = 'u', long)]
        update: bool,
    },
    /// Refresh the overlay files (same as `build -u`)
    Update,
    /// Run the package manager against the existing overlay
    Install,
    /// Update the SDK path and run the native build only
    Ant,
    /// Show how the workspace is classified
    Status {
        /// Print a JSON object to stdout
        #[arg(long)]
        json: bool,
    },
}

#[derive(Parser, Debug)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version,
    about = "Hybrid mobile workspace provisioner",
    long_about = "Hybrid mobile workspace provisioner\n\nInstalls and refreshes the build tooling overlay on top of a native mobile project while keeping the project's git history safe.",
    color = clap::ColorChoice::Auto
)]
pub struct Cli {
    /// Log format (text or json, defaults to text, can be set via MBX_LOG_FORMAT env var)
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Log level (defaults to MBX_LOG, then RUST_LOG, then info)
    #[arg(long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Workspace folder path (defaults to the current directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub workspace_folder: Option<PathBuf>,

    /// Configuration file path (defaults to <workspace>/mbx.toml when present)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Answer yes to the git history confirmation prompt
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Run the selected subcommand and return the process exit code
    pub fn dispatch(self) -> Result<i32> {
        let log_format = match self.log_format {
            Some(LogFormat::Text) => Some("text"),
            Some(LogFormat::Json) => Some("json"),
            None => None,
        };
        let log_filter = self
            .log_level
            .as_ref()
            .map(|level| format!("mbx={0},mbx_core={0}", level.as_str()));
        mbx_core::logging::init(log_format, log_filter.as_deref())?;
        tracing::debug!("mbx {} starting", mbx_core::version());

        let outcome = match self.command {
            Some(Commands::Init { name }) => execute_init(InitArgs {
                name,
                workspace_folder: self.workspace_folder,
                config_path: self.config,
            })?,
            Some(Commands::Build { update }) => execute_build(BuildArgs {
                update,
                workspace_folder: self.workspace_folder,
                config_path: self.config,
                assume_yes: self.yes,
            })?,
            Some(Commands::Update) => execute_build(BuildArgs {
                update: true,
                workspace_folder: self.workspace_folder,
                config_path: self.config,
                assume_yes: self.yes,
            })?,
            Some(Commands::Install) => execute_install(InstallArgs {
                workspace_folder: self.workspace_folder,
                config_path: self.config,
            })?,
            Some(Commands::Ant) => execute_ant(AntArgs {
                workspace_folder: self.workspace_folder,
                config_path: self.config,
            })?,
            Some(Commands::Status { json }) => {
                execute_status(StatusArgs {
                    json,
                    workspace_folder: self.workspace_folder,
                    config_path: self.config,
                })?;
                return Ok(0);
            }
            None => {
                println!("Hybrid mobile workspace provisioner");
                println!("Run 'mbx --help' to see available commands.");
                return Ok(0);
            }
        };

        ui::outcome::print(&outcome);
        Ok(outcome.exit_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_global_flags_default_values() {
        let cli = Cli::parse_from(["mbx"]);
        assert!(!cli.yes);
        assert!(cli.workspace_folder.is_none());
        assert!(cli.log_level.is_none());
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_build_update_flag() {
        let cli = Cli::parse_from(["mbx", "build", "-u"]);
        assert!(matches!(cli.command, Some(Commands::Build { update: true })));

        let cli = Cli::parse_from(["mbx", "build", "--update", "--yes"]);
        assert!(matches!(cli.command, Some(Commands::Build { update: true })));
        assert!(cli.yes);

        let cli = Cli::parse_from(["mbx", "build"]);
        assert!(matches!(cli.command, Some(Commands::Build { update: false })));
    }

    #[test]
    fn test_init_requires_name() {
        assert!(Cli::try_parse_from(["mbx", "init"]).is_err());
        let cli = Cli::parse_from(["mbx", "init", "my-app"]);
        assert!(matches!(cli.command, Some(Commands::Init { name }) if name == "my-app"));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "mbx",
            "status",
            "--json",
            "--workspace-folder",
            "/tmp/ws",
            "--log-level",
            "debug",
        ]);
        assert!(matches!(cli.command, Some(Commands::Status { json: true })));
        assert_eq!(cli.workspace_folder, Some(PathBuf::from("/tmp/ws")));
        assert!(matches!(cli.log_level, Some(LogLevel::Debug)));
    }
}
