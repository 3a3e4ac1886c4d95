//! Version-control history protection
//!
//! Fetching the overlay initializes a throwaway repository at the workspace's
//! canonical `.git` location. Before that happens the user's own `.git` is
//! renamed to a staging name, and it is renamed back afterwards.
//!
//! Renames are assumed atomic on the local filesystem. There is no
//! cross-device fallback: a workspace whose `.git` is a mount point or lives on
//! another device will fail to protect, and the failure is surfaced.

use crate::config::WorkspaceLayout;
use crate::errors::{FilesystemError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// Proof that the history has been moved to the staging location.
///
/// Deliberately neither `Clone` nor `Copy`: a handle is released exactly once.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a protected history must be released"]
pub struct VcsBackupHandle {
    canonical: PathBuf,
    staging: PathBuf,
}

impl VcsBackupHandle {
    pub fn staging(&self) -> &Path {
        &self.staging
    }
}

/// Result of [`VcsGuard::protect`]
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a protected history must be released"]
pub enum Protection {
    /// History was moved aside and must be released
    Guarded(VcsBackupHandle),
    /// There was no history to protect
    NoOp,
}

impl Protection {
    /// Staging path holding the history, if any
    pub fn staging(&self) -> Option<&Path> {
        match self {
            Self::Guarded(handle) => Some(handle.staging()),
            Self::NoOp => None,
        }
    }
}

/// Moves the workspace's `.git` out of the way and back
#[derive(Debug, Clone)]
pub struct VcsGuard {
    canonical: PathBuf,
    staging: PathBuf,
}

impl VcsGuard {
    pub fn new(layout: &WorkspaceLayout) -> Self {
        Self {
            canonical: layout.vcs_dir(),
            staging: layout.vcs_staging(),
        }
    }

    /// Move existing history to the staging location.
    ///
    /// Refuses to overwrite an occupied staging location.
    #[instrument(skip(self), fields(canonical = %self.canonical.display()))]
    pub fn protect(&self) -> Result<Protection> {
        if self.canonical.symlink_metadata().is_err() {
            info!("No version-control history to protect");
            return Ok(Protection::NoOp);
        }

        if self.staging.symlink_metadata().is_ok() {
            return Err(FilesystemError::StagingOccupied {
                staging: self.staging.clone(),
            }
            .into());
        }

        fs::rename(&self.canonical, &self.staging).map_err(|e| FilesystemError::Rename {
            from: self.canonical.clone(),
            to: self.staging.clone(),
            source: e,
        })?;

        info!(
            "Protected version-control history: {} -> {}",
            self.canonical.display(),
            self.staging.display()
        );
        Ok(Protection::Guarded(VcsBackupHandle {
            canonical: self.canonical.clone(),
            staging: self.staging.clone(),
        }))
    }

    /// Move protected history back to its canonical location.
    ///
    /// Fails if the staging location has vanished or the canonical location
    /// has been re-occupied in the meantime; neither case is papered over.
    #[instrument(skip(self, protection))]
    pub fn release(&self, protection: Protection) -> Result<()> {
        let handle = match protection {
            Protection::Guarded(handle) => handle,
            Protection::NoOp => return Ok(()),
        };

        if handle.staging.symlink_metadata().is_err() {
            warn!("History backup missing at {}", handle.staging.display());
            return Err(FilesystemError::StagingMissing {
                staging: handle.staging,
            }
            .into());
        }

        if handle.canonical.symlink_metadata().is_ok() {
            return Err(FilesystemError::CanonicalOccupied {
                path: handle.canonical,
            }
            .into());
        }

        fs::rename(&handle.staging, &handle.canonical).map_err(|e| FilesystemError::Rename {
            from: handle.staging.clone(),
            to: handle.canonical.clone(),
            source: e,
        })?;

        info!(
            "Restored version-control history to {}",
            handle.canonical.display()
        );
        Ok(())
    }
}
