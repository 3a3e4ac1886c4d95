//! Build command implementation
//!
//! `mbx build` runs the fresh install on a native tree without an overlay;
//! `mbx build -u` (and `mbx update`) refreshes an existing overlay.

use crate::commands::shared::{load_config, ConfigLoadArgs};
use crate::ui::prompt;
use anyhow::Result;
use mbx_core::orchestrator::{Orchestrator, Outcome};
use mbx_core::runner::SystemRunner;
use std::path::PathBuf;
use tracing::{debug, instrument};

/// Build command arguments
#[derive(Debug, Clone)]
pub struct BuildArgs {
    /// Refresh the overlay instead of a fresh install
    pub update: bool,
    pub workspace_folder: Option<PathBuf>,
    pub config_path: Option<PathBuf>,
    /// Skip the confirmation prompt
    pub assume_yes: bool,
}

/// Execute the build command
#[instrument(skip(args))]
pub fn execute_build(args: BuildArgs) -> Result<Outcome> {
    debug!("Build args: {:?}", args);

    let config = load_config(ConfigLoadArgs {
        workspace_folder: args.workspace_folder.as_deref(),
        config_path: args.config_path.as_deref(),
        assume_yes: args.assume_yes,
    })?;

    let runner = SystemRunner::new();
    let confirm = prompt::for_session();
    Ok(Orchestrator::new(&config, &runner, confirm.as_ref()).provision(args.update))
}
