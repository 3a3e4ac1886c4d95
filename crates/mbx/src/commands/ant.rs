//! Ant command implementation
//!
//! Points `local.properties` at the installed SDK and runs the native build,
//! without touching the overlay.

use crate::commands::shared::{load_config, ConfigLoadArgs};
use anyhow::Result;
use mbx_core::confirm::AssumeYes;
use mbx_core::orchestrator::{Orchestrator, Outcome};
use mbx_core::runner::SystemRunner;
use std::path::PathBuf;
use tracing::instrument;

#[derive(Debug, Clone)]
pub struct AntArgs {
    pub workspace_folder: Option<PathBuf>,
    pub config_path: Option<PathBuf>,
}

#[instrument(skip(args))]
pub fn execute_ant(args: AntArgs) -> Result<Outcome> {
    let config = load_config(ConfigLoadArgs {
        workspace_folder: args.workspace_folder.as_deref(),
        config_path: args.config_path.as_deref(),
        assume_yes: false,
    })?;

    let runner = SystemRunner::new();
    Ok(Orchestrator::new(&config, &runner, &AssumeYes).native_build())
}
