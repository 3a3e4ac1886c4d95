//! Overlay manifest and synchronization
//!
//! The overlay is the tooling file set (build scripts, lint/editor config,
//! package manifest) fetched from the upstream repository and layered onto a
//! native build tree. Refreshing it deletes every manifest entry, fetches the
//! upstream tip into the workspace root, strips the fetched repository
//! metadata, installs packages and drops the overlay's own readme.
//!
//! Steps that already completed are not rolled back when a later one fails.
//! In particular the manifest deletion is not reversible; that is an accepted
//! risk. A failed fetch does however leave the manifest absent rather than
//! half-populated.

use crate::config::ProvisionConfig;
use crate::errors::{FilesystemError, Result};
use crate::observability::{overlay_refresh_span, TimedSpan};
use crate::orchestrator::{Step, StepFailure};
use crate::runner::{CommandRunner, CommandSpec};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// Relative paths owned by the overlay, in deletion order.
///
/// Versioned with the tool; not configurable at runtime.
const MANIFEST_ENTRIES: &[&str] = &[
    "node_modules",
    ".vscode",
    "package.json",
    "package-lock.json",
    ".eslintrc.json",
    "gulpfile.js",
    ".gitignore",
];

/// The set of files and directories that are safe to delete and recreate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayManifest {
    entries: &'static [&'static str],
}

impl OverlayManifest {
    /// Manifest shipped with this release
    pub fn current() -> Self {
        Self {
            entries: MANIFEST_ENTRIES,
        }
    }

    pub fn entries(&self) -> &'static [&'static str] {
        self.entries
    }

    /// Entries that currently exist under `root`
    pub fn present_entries(&self, root: &Path) -> Vec<&'static str> {
        self.entries
            .iter()
            .copied()
            .filter(|entry| root.join(entry).symlink_metadata().is_ok())
            .collect()
    }

    pub fn is_complete(&self, root: &Path) -> bool {
        self.present_entries(root).len() == self.entries.len()
    }
}

/// Remove a file, symlink or directory tree. A missing path is not an error.
pub(crate) fn remove_path(path: &Path) -> Result<bool> {
    let metadata = match path.symlink_metadata() {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => {
            return Err(FilesystemError::Remove {
                path: path.to_path_buf(),
                source: e,
            }
            .into())
        }
    };

    let result = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };

    match result {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(FilesystemError::Remove {
            path: path.to_path_buf(),
            source: e,
        }
        .into()),
    }
}

/// Runs the overlay refresh steps against one workspace
pub struct OverlaySynchronizer<'a, R: CommandRunner + ?Sized> {
    config: &'a ProvisionConfig,
    runner: &'a R,
    manifest: OverlayManifest,
}

impl<'a, R: CommandRunner + ?Sized> OverlaySynchronizer<'a, R> {
    pub fn new(config: &'a ProvisionConfig, runner: &'a R) -> Self {
        Self {
            config,
            runner,
            manifest: OverlayManifest::current(),
        }
    }

    fn root(&self) -> &Path {
        self.config.layout.root()
    }

    /// Delete the manifest, then fetch and install the current overlay.
    ///
    /// Completed steps are appended to `completed`; the first failing step
    /// aborts the rest.
    pub fn refresh(&self, completed: &mut Vec<Step>) -> std::result::Result<(), StepFailure> {
        let timed_span = TimedSpan::new(overlay_refresh_span(self.root()));
        info!("Refreshing overlay from {}", self.config.upstream.url);

        let result =
            run_step(Step::ManifestPurge, completed, || self.purge_manifest().map(|_| ()))
                .and_then(|_| self.populate(completed));
        timed_span.complete();
        result
    }

    /// Fetch, strip, install and tidy; the manifest is assumed absent
    pub fn populate(&self, completed: &mut Vec<Step>) -> std::result::Result<(), StepFailure> {
        run_step(Step::OverlayFetch, completed, || self.fetch())?;
        run_step(Step::VcsStrip, completed, || self.strip_vcs())?;
        run_step(Step::PackageInstall, completed, || self.install_packages())?;
        run_step(Step::ReadmeRemoval, completed, || self.remove_readme())?;
        Ok(())
    }

    /// Delete every manifest entry that exists; returns the entries removed
    #[instrument(skip(self))]
    pub fn purge_manifest(&self) -> Result<Vec<&'static str>> {
        let mut removed = Vec::new();
        for entry in self.manifest.entries() {
            if remove_path(&self.root().join(entry))? {
                debug!("Removed overlay entry {}", entry);
                removed.push(*entry);
            }
        }
        info!("Removed {} overlay entries", removed.len());
        Ok(removed)
    }

    /// Initialize a throwaway repository at the canonical location and pull
    /// the upstream tip into the workspace root.
    #[instrument(skip(self))]
    pub fn fetch(&self) -> Result<()> {
        let vcs_dir = self.config.layout.vcs_dir();
        if vcs_dir.symlink_metadata().is_ok() {
            return Err(FilesystemError::CanonicalOccupied { path: vcs_dir }.into());
        }

        let git = CommandSpec::from_argv(&self.config.toolchain.git, self.root(), "git")?;
        let upstream = &self.config.upstream;
        let commands = [
            git.clone().arg("init"),
            git.clone()
                .arg("remote")
                .arg("add")
                .arg("origin")
                .arg(&upstream.url),
            git.arg("pull").arg("origin").arg(&upstream.reference),
        ];

        for command in &commands {
            if let Err(err) = self.runner.run(command) {
                self.discard_partial_fetch();
                return Err(err);
            }
        }

        info!("Fetched overlay {}@{}", upstream.url, upstream.reference);
        Ok(())
    }

    /// Remove the fetched repository metadata so the overlay is not a nested repository
    #[instrument(skip(self))]
    pub fn strip_vcs(&self) -> Result<()> {
        if let Err(err) = remove_path(&self.config.layout.vcs_dir()) {
            self.discard_partial_fetch();
            return Err(err);
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn install_packages(&self) -> Result<()> {
        let spec = CommandSpec::from_argv(
            &self.config.toolchain.package_install,
            self.root(),
            "package install",
        )?;
        self.runner.run(&spec)
    }

    /// The canonical workspace does not carry the overlay's documentation
    #[instrument(skip(self))]
    pub fn remove_readme(&self) -> Result<()> {
        if !remove_path(&self.config.layout.overlay_readme())? {
            debug!("Overlay readme already absent");
        }
        Ok(())
    }

    /// Best-effort cleanup after a failed fetch: drop the transient
    /// repository and anything the partial pull wrote into the manifest.
    fn discard_partial_fetch(&self) {
        let mut leftovers: Vec<PathBuf> = vec![self.config.layout.vcs_dir()];
        leftovers.extend(self.manifest.entries().iter().map(|e| self.root().join(e)));

        for path in leftovers {
            if let Err(err) = remove_path(&path) {
                warn!("Failed to clean up after aborted fetch: {}", err);
            }
        }
    }
}

/// Run one step, recording it on success and tagging the error on failure
pub(crate) fn run_step<F>(
    step: Step,
    completed: &mut Vec<Step>,
    action: F,
) -> std::result::Result<(), StepFailure>
where
    F: FnOnce() -> Result<()>,
{
    debug!("Step started: {}", step);
    match action() {
        Ok(()) => {
            completed.push(step);
            Ok(())
        }
        Err(error) => {
            warn!("Step failed: {}: {}", step, error);
            Err(StepFailure { step, error })
        }
    }
}
