//! Status command implementation
//!
//! Prints what the prober sees without changing anything. `--json` writes a
//! single JSON object to stdout; logs stay on stderr.

use crate::commands::shared::{load_config, ConfigLoadArgs};
use anyhow::Result;
use mbx_core::config::ProvisionConfig;
use mbx_core::errors::PreconditionError;
use mbx_core::probe::{classify, WorkspaceState};
use serde::Serialize;
use std::path::PathBuf;
use tracing::instrument;

#[derive(Debug, Clone)]
pub struct StatusArgs {
    pub json: bool,
    pub workspace_folder: Option<PathBuf>,
    pub config_path: Option<PathBuf>,
}

/// Snapshot of the workspace as reported by `mbx status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub root: PathBuf,
    /// `None` while a stale backup blocks classification
    pub state: Option<WorkspaceState>,
    pub history_present: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stale_backup: Option<PathBuf>,
    pub platforms_present: bool,
    pub overlay_entries: Vec<String>,
    pub upstream_url: String,
    pub upstream_ref: String,
}

impl StatusReport {
    pub fn collect(config: &ProvisionConfig) -> Self {
        let layout = &config.layout;
        let mut report = Self {
            root: layout.root().to_path_buf(),
            state: None,
            history_present: layout.vcs_dir().symlink_metadata().is_ok(),
            stale_backup: None,
            platforms_present: layout.platforms_dir().is_dir(),
            overlay_entries: Vec::new(),
            upstream_url: config.upstream.url.clone(),
            upstream_ref: config.upstream.reference.clone(),
        };

        match classify(layout) {
            Ok(probe) => {
                report.state = Some(probe.state);
                report.overlay_entries = probe.overlay_entries;
            }
            Err(PreconditionError::StaleBackup { staging }) => {
                report.stale_backup = Some(staging);
                report.overlay_entries = mbx_core::overlay::OverlayManifest::current()
                    .present_entries(layout.root())
                    .into_iter()
                    .map(str::to_string)
                    .collect();
            }
            Err(other) => tracing::warn!("Unexpected probe error: {}", other),
        }
        report
    }

    fn render_text(&self) -> String {
        let state = self
            .state
            .map(|s| s.to_string())
            .unwrap_or_else(|| "blocked".to_string());
        let entries = if self.overlay_entries.is_empty() {
            "none".to_string()
        } else {
            self.overlay_entries.join(", ")
        };
        let mut text = format!(
            "Workspace: {}\nState: {}\nGit history: {}\nPlatforms: {}\nOverlay entries: {}\nUpstream: {} ({})",
            self.root.display(),
            state,
            if self.history_present { "present" } else { "absent" },
            if self.platforms_present { "present" } else { "absent" },
            entries,
            self.upstream_url,
            self.upstream_ref,
        );
        if let Some(staging) = &self.stale_backup {
            text.push_str(&format!(
                "\nStale backup: {} (restore it to .git before running build)",
                staging.display()
            ));
        }
        text
    }
}

#[instrument(skip(args))]
pub fn execute_status(args: StatusArgs) -> Result<()> {
    let config = load_config(ConfigLoadArgs {
        workspace_folder: args.workspace_folder.as_deref(),
        config_path: args.config_path.as_deref(),
        assume_yes: false,
    })?;

    let report = StatusReport::collect(&config);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.render_text());
    }
    Ok(())
}
