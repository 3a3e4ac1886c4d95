//! Init command implementation
//!
//! `mbx init <name>` creates `<workspace-folder>/<name>` and fetches the
//! overlay into it. Configuration is read from the workspace folder the
//! command runs in, since the new directory has no `mbx.toml` yet.

use crate::commands::shared::{load_config, ConfigLoadArgs};
use anyhow::{bail, Result};
use mbx_core::confirm::AssumeYes;
use mbx_core::orchestrator::{Orchestrator, Outcome};
use mbx_core::runner::SystemRunner;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, instrument};

#[derive(Debug, Clone)]
pub struct InitArgs {
    /// Directory to create, relative to the workspace folder
    pub name: String,
    pub workspace_folder: Option<PathBuf>,
    pub config_path: Option<PathBuf>,
}

#[instrument(skip(args), fields(name = %args.name))]
pub fn execute_init(args: InitArgs) -> Result<Outcome> {
    validate_name(&args.name)?;

    let config = load_config(ConfigLoadArgs {
        workspace_folder: args.workspace_folder.as_deref(),
        config_path: args.config_path.as_deref(),
        assume_yes: true,
    })?;
    let target = config.layout.root().join(&args.name);
    debug!("Initializing workspace at {}", target.display());
    let config = config.with_root(target);

    let runner = SystemRunner::new();
    Ok(Orchestrator::new(&config, &runner, &AssumeYes).init_workspace())
}

/// The name must stay below the workspace folder
fn validate_name(name: &str) -> Result<()> {
    let path = Path::new(name);
    if name.trim().is_empty() {
        bail!("Workspace name must not be empty");
    }
    if path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        bail!("Workspace name '{}' must be a relative path inside the current folder", name);
    }
    Ok(())
}
