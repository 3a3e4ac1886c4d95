//! Shared configuration loading for CLI commands.
//!
//! Every subcommand resolves the workspace folder and the layered
//! `ProvisionConfig` the same way, then applies the CLI-level overrides.

use mbx_core::config::ProvisionConfig;
use mbx_core::errors::{ConfigError, MbxError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Inputs for configuration loading.
pub struct ConfigLoadArgs<'a> {
    /// Optional workspace folder (defaults to current directory)
    pub workspace_folder: Option<&'a Path>,
    /// Explicit config path (--config)
    pub config_path: Option<&'a Path>,
    /// Skip the confirmation prompt (--yes)
    pub assume_yes: bool,
}

/// Resolve the workspace folder and load its configuration.
///
/// `--yes` turns the history confirmation gate off regardless of what the
/// config file says.
pub fn load_config(args: ConfigLoadArgs<'_>) -> Result<ProvisionConfig> {
    let workspace_folder = resolve_workspace_folder(args.workspace_folder)?;
    let mut config = ProvisionConfig::load(&workspace_folder, args.config_path)?;
    if args.assume_yes {
        debug!("--yes given; confirmation gate disabled");
        config.confirm_when_history_present = false;
    }
    Ok(config)
}

pub fn resolve_workspace_folder(folder: Option<&Path>) -> Result<PathBuf> {
    match folder {
        Some(folder) => Ok(folder.to_path_buf()),
        None => std::env::current_dir().map_err(|e| MbxError::Config(ConfigError::Io(e))),
    }
}
