//! Workspace classification
//!
//! Pure read-only inspection of a workspace root. Only existence checks are
//! performed; no file content is read. The result is recomputed on every
//! invocation and never cached.

use crate::config::WorkspaceLayout;
use crate::errors::PreconditionError;
use crate::overlay::OverlayManifest;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, instrument};

/// What the workspace currently looks like
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WorkspaceState {
    /// No native build descriptor; every build-family command refuses to run
    NoProject,
    /// Native tree present, no overlay artifacts yet
    FreshTarget,
    /// Native tree present and overlay artifacts (or native platforms) already there
    ExistingOverlay,
}

impl std::fmt::Display for WorkspaceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::NoProject => "no project",
            Self::FreshTarget => "fresh target",
            Self::ExistingOverlay => "existing overlay",
        };
        f.write_str(label)
    }
}

/// Snapshot of everything the orchestrator needs to choose a path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Probe {
    pub root: PathBuf,
    pub state: WorkspaceState,
    /// Version-control metadata exists at its canonical location
    pub history_present: bool,
    pub platforms_present: bool,
    /// Manifest entries currently on disk, in manifest order
    pub overlay_entries: Vec<String>,
}

/// Classify the workspace at `layout`.
///
/// A leftover history backup from an interrupted run is reported as
/// [`PreconditionError::StaleBackup`] before anything else, so it is never
/// adopted or overwritten by a later run.
#[instrument(skip(layout), fields(root = %layout.root().display()))]
pub fn classify(layout: &WorkspaceLayout) -> Result<Probe, PreconditionError> {
    let staging = layout.vcs_staging();
    if staging.symlink_metadata().is_ok() {
        debug!("Stale backup detected at {}", staging.display());
        return Err(PreconditionError::StaleBackup { staging });
    }

    let history_present = layout.vcs_dir().symlink_metadata().is_ok();
    let platforms_present = layout.platforms_dir().is_dir();
    let overlay_entries: Vec<String> = OverlayManifest::current()
        .present_entries(layout.root())
        .into_iter()
        .map(str::to_string)
        .collect();

    let state = if !layout.build_descriptor().is_file() {
        WorkspaceState::NoProject
    } else if !overlay_entries.is_empty() || platforms_present {
        WorkspaceState::ExistingOverlay
    } else {
        WorkspaceState::FreshTarget
    };

    debug!(
        "Classified workspace as {} (history: {}, overlay entries: {:?})",
        state, history_present, overlay_entries
    );

    Ok(Probe {
        root: layout.root().to_path_buf(),
        state,
        history_present,
        platforms_present,
        overlay_entries,
    })
}
