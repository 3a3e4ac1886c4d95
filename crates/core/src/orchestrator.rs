//! Provisioning orchestrator
//!
//! Ties the prober, VCS guard and overlay synchronizer together. A run goes
//! `Probing -> {Blocked, ConfirmingDestruction, Running(Fresh|Update)} -> Done`:
//!
//! - `Blocked`: stale backup, no project, or the requested path contradicts the
//!   probed state. Nothing is mutated.
//! - `ConfirmingDestruction`: history exists and the confirmation gate is on.
//!   Declining aborts cleanly.
//! - `Running(Fresh)`: SDK path, native build, stray cleanup, guarded refresh.
//! - `Running(Update)`: guarded refresh only.
//!
//! Every step runs in sequence; the first failure ends the run. There is no
//! rollback beyond releasing the VCS guard.
//!
//! Concurrent runs against the same workspace are not coordinated (there is
//! no lock file).

use crate::config::ProvisionConfig;
use crate::confirm::Confirm;
use crate::errors::{FilesystemError, MbxError, PreconditionError};
use crate::observability::{provision_span, workspace_init_span, TimedSpan};
use crate::overlay::{remove_path, run_step, OverlaySynchronizer};
use crate::probe::{classify, Probe, WorkspaceState};
use crate::runner::{CommandRunner, CommandSpec};
use crate::sdk::update_local_properties;
use crate::vcs_guard::VcsGuard;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use tracing::{info, instrument, warn};

/// Question asked before a build runs on a workspace with history
pub const HISTORY_PROMPT: &str = "This workspace has its own git history. The build will move .git aside while the overlay is fetched and restore it afterwards. Proceed?";

/// Which operation a run performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Native build plus first overlay install
    FreshInstall,
    /// Overlay refresh only
    Update,
    /// Package manager install only
    PackageInstall,
    /// SDK path rewrite plus native build only
    NativeBuild,
    /// New workspace directory with the overlay fetched into it
    Init,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::FreshInstall => "fresh install",
            Self::Update => "update",
            Self::PackageInstall => "package install",
            Self::NativeBuild => "native build",
            Self::Init => "init",
        };
        f.write_str(label)
    }
}

/// Individual steps, in the order they can occur
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Confirmation,
    WorkspaceCreate,
    SdkPath,
    NativeBuild,
    StrayCleanup,
    VcsProtect,
    ManifestPurge,
    OverlayFetch,
    VcsStrip,
    PackageInstall,
    ReadmeRemoval,
    VcsRelease,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Confirmation => "confirmation",
            Self::WorkspaceCreate => "create workspace directory",
            Self::SdkPath => "update local.properties",
            Self::NativeBuild => "native build",
            Self::StrayCleanup => "remove stray engine sources",
            Self::VcsProtect => "protect git history",
            Self::ManifestPurge => "remove overlay files",
            Self::OverlayFetch => "fetch overlay",
            Self::VcsStrip => "strip overlay repository metadata",
            Self::PackageInstall => "install packages",
            Self::ReadmeRemoval => "remove overlay readme",
            Self::VcsRelease => "restore git history",
        };
        f.write_str(label)
    }
}

/// A step that failed, with its cause
#[derive(Debug)]
pub struct StepFailure {
    pub step: Step,
    pub error: MbxError,
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step \"{}\" failed: {}", self.step, self.error)
    }
}

impl From<StepFailure> for MbxError {
    fn from(failure: StepFailure) -> Self {
        failure.error
    }
}

/// Where the user's history ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryStatus {
    /// Never moved (absent, or the run stopped before protecting it)
    Untouched,
    /// Moved aside and restored to its canonical location
    Restored,
    /// Still at the staging location; manual restore required
    Stranded { staging: PathBuf },
    /// Vanished from the staging location before it could be restored
    Missing { staging: PathBuf },
}

/// Terminal result of one invocation
#[derive(Debug)]
pub enum Outcome {
    Succeeded {
        operation: Operation,
        completed: Vec<Step>,
        history: HistoryStatus,
    },
    Failed {
        operation: Operation,
        failure: StepFailure,
        completed: Vec<Step>,
        history: HistoryStatus,
    },
    Blocked(PreconditionError),
    Aborted,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    /// Process exit code: 0 success, 1 failure, 2 blocked, 3 aborted, 4 history not restored
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Succeeded { .. } => 0,
            Self::Failed {
                history: HistoryStatus::Stranded { .. } | HistoryStatus::Missing { .. },
                ..
            } => 4,
            Self::Failed { .. } => 1,
            Self::Blocked(_) => 2,
            Self::Aborted => 3,
        }
    }

    pub fn history(&self) -> Option<&HistoryStatus> {
        match self {
            Self::Succeeded { history, .. } | Self::Failed { history, .. } => Some(history),
            Self::Blocked(_) | Self::Aborted => None,
        }
    }

    pub fn completed(&self) -> &[Step] {
        match self {
            Self::Succeeded { completed, .. } | Self::Failed { completed, .. } => completed,
            Self::Blocked(_) | Self::Aborted => &[],
        }
    }

    fn finish(
        operation: Operation,
        result: Result<(), StepFailure>,
        completed: Vec<Step>,
        history: HistoryStatus,
    ) -> Self {
        match result {
            Ok(()) => {
                info!("{} complete", operation);
                Self::Succeeded {
                    operation,
                    completed,
                    history,
                }
            }
            Err(failure) => {
                warn!("{} failed: {}", operation, failure);
                Self::Failed {
                    operation,
                    failure,
                    completed,
                    history,
                }
            }
        }
    }
}

/// Choose the provisioning path. Pure function of the probed state and the
/// explicit update flag.
pub fn select_path(state: WorkspaceState, update: bool) -> Result<Operation, PreconditionError> {
    match (state, update) {
        (WorkspaceState::NoProject, _) => Err(PreconditionError::NoProject {
            descriptor: crate::config::WorkspaceLayout::BUILD_DESCRIPTOR.to_string(),
        }),
        (WorkspaceState::FreshTarget, false) => Ok(Operation::FreshInstall),
        (WorkspaceState::FreshTarget, true) => Err(PreconditionError::NothingToUpdate),
        (WorkspaceState::ExistingOverlay, true) => Ok(Operation::Update),
        (WorkspaceState::ExistingOverlay, false) => Err(PreconditionError::OverlayAlreadyPresent),
    }
}

/// Runs provisioning operations for one workspace
pub struct Orchestrator<'a, R: CommandRunner + ?Sized> {
    config: &'a ProvisionConfig,
    runner: &'a R,
    confirm: &'a dyn Confirm,
}

impl<'a, R: CommandRunner + ?Sized> Orchestrator<'a, R> {
    pub fn new(config: &'a ProvisionConfig, runner: &'a R, confirm: &'a dyn Confirm) -> Self {
        Self {
            config,
            runner,
            confirm,
        }
    }

    fn synchronizer(&self) -> OverlaySynchronizer<'a, R> {
        OverlaySynchronizer::new(self.config, self.runner)
    }

    /// Probe for a build-family command; only a missing descriptor or a stale
    /// backup block here.
    fn probe_project(&self) -> Result<Probe, PreconditionError> {
        let probe = classify(&self.config.layout)?;
        if probe.state == WorkspaceState::NoProject {
            return Err(PreconditionError::NoProject {
                descriptor: crate::config::WorkspaceLayout::BUILD_DESCRIPTOR.to_string(),
            });
        }
        Ok(probe)
    }

    /// `build [-u]`: select and run the fresh-install or update path
    #[instrument(skip(self), fields(root = %self.config.layout.root().display()))]
    pub fn provision(&self, update: bool) -> Outcome {
        let requested = if update { "update" } else { "build" };
        let timed_span = TimedSpan::new(provision_span(self.config.layout.root(), requested));

        let outcome = self.provision_inner(update);

        timed_span.complete();
        outcome
    }

    fn provision_inner(&self, update: bool) -> Outcome {
        let probe = match classify(&self.config.layout) {
            Ok(probe) => probe,
            Err(reason) => return self.blocked(reason),
        };

        let operation = match select_path(probe.state, update) {
            Ok(operation) => operation,
            Err(reason) => return self.blocked(reason),
        };
        info!("Workspace is a {}; running {}", probe.state, operation);

        if probe.history_present && self.config.confirm_when_history_present {
            match self.confirm.confirm(HISTORY_PROMPT) {
                Ok(true) => {}
                Ok(false) => {
                    info!("Aborted by user; nothing was changed");
                    return Outcome::Aborted;
                }
                Err(error) => {
                    return Outcome::Failed {
                        operation,
                        failure: StepFailure {
                            step: Step::Confirmation,
                            error,
                        },
                        completed: Vec::new(),
                        history: HistoryStatus::Untouched,
                    }
                }
            }
        }

        let mut completed = Vec::new();
        if operation == Operation::FreshInstall {
            if let Err(failure) = self.prepare_native_tree(&mut completed) {
                return Outcome::finish(operation, Err(failure), completed, HistoryStatus::Untouched);
            }
        }

        let (result, history) = self.guarded_refresh(&mut completed);
        Outcome::finish(operation, result, completed, history)
    }

    /// Fresh-install steps ahead of the overlay refresh
    fn prepare_native_tree(&self, completed: &mut Vec<Step>) -> Result<(), StepFailure> {
        self.native_build_steps(completed)?;
        run_step(Step::StrayCleanup, completed, || {
            for path in self.config.layout.stray_paths() {
                if remove_path(&path)? {
                    info!("Removed {}", path.display());
                }
            }
            Ok(())
        })
    }

    fn native_build_steps(&self, completed: &mut Vec<Step>) -> Result<(), StepFailure> {
        run_step(Step::SdkPath, completed, || {
            update_local_properties(
                &self.config.layout.local_properties(),
                &self.config.sdk_env_var,
                self.config.sdk_dir.as_deref(),
            )
            .map(|_| ())
        })?;
        run_step(Step::NativeBuild, completed, || {
            let spec = CommandSpec::from_argv(
                &self.config.toolchain.native_build,
                self.config.layout.root(),
                "native build",
            )?;
            self.runner.run(&spec)
        })
    }

    /// Protect history, refresh the overlay, release history.
    ///
    /// Release is attempted whenever protection succeeded, including after a
    /// failed refresh. A refresh failure takes precedence in the result; the
    /// history status reports a failed release either way.
    fn guarded_refresh(&self, completed: &mut Vec<Step>) -> (Result<(), StepFailure>, HistoryStatus) {
        let guard = VcsGuard::new(&self.config.layout);

        let mut protection = None;
        if let Err(failure) = run_step(Step::VcsProtect, completed, || {
            protection = Some(guard.protect()?);
            Ok(())
        }) {
            return (Err(failure), HistoryStatus::Untouched);
        }
        let Some(protection) = protection else {
            return (Ok(()), HistoryStatus::Untouched);
        };

        let staging = protection.staging().map(|p| p.to_path_buf());
        let refreshed = self.synchronizer().refresh(completed);
        let released = run_step(Step::VcsRelease, completed, || guard.release(protection));

        let history = match (staging, &released) {
            (None, _) => HistoryStatus::Untouched,
            (Some(_), Ok(())) => HistoryStatus::Restored,
            (Some(staging), Err(_)) if staging.symlink_metadata().is_err() => {
                warn!("Git history backup vanished from {}", staging.display());
                HistoryStatus::Missing { staging }
            }
            (Some(staging), Err(_)) => {
                warn!(
                    "Git history left at {}; restore it manually by renaming it to .git",
                    staging.display()
                );
                HistoryStatus::Stranded { staging }
            }
        };

        (refreshed.and(released), history)
    }

    /// `install`: run the package manager against the existing overlay
    #[instrument(skip(self), fields(root = %self.config.layout.root().display()))]
    pub fn install_packages(&self) -> Outcome {
        let timed_span = TimedSpan::new(provision_span(self.config.layout.root(), "install"));
        let outcome = match self.probe_project() {
            Err(reason) => self.blocked(reason),
            Ok(_) if !self.config.layout.package_manifest().is_file() => {
                self.blocked(PreconditionError::MissingPackageManifest {
                    path: self.config.layout.package_manifest(),
                })
            }
            Ok(_) => {
                let mut completed = Vec::new();
                let result = run_step(Step::PackageInstall, &mut completed, || {
                    self.synchronizer().install_packages()
                });
                Outcome::finish(
                    Operation::PackageInstall,
                    result,
                    completed,
                    HistoryStatus::Untouched,
                )
            }
        };
        timed_span.complete();
        outcome
    }

    /// `ant`: point local.properties at the SDK and run the native build
    #[instrument(skip(self), fields(root = %self.config.layout.root().display()))]
    pub fn native_build(&self) -> Outcome {
        let timed_span = TimedSpan::new(provision_span(self.config.layout.root(), "ant"));
        let outcome = match self.probe_project() {
            Err(reason) => self.blocked(reason),
            Ok(_) => {
                let mut completed = Vec::new();
                let result = self.native_build_steps(&mut completed);
                Outcome::finish(
                    Operation::NativeBuild,
                    result,
                    completed,
                    HistoryStatus::Untouched,
                )
            }
        };
        timed_span.complete();
        outcome
    }

    /// `init`: create the configured root and fetch the overlay into it.
    ///
    /// The root must be absent or an empty directory.
    #[instrument(skip(self), fields(root = %self.config.layout.root().display()))]
    pub fn init_workspace(&self) -> Outcome {
        let root = self.config.layout.root();
        let timed_span = TimedSpan::new(workspace_init_span(root));

        let outcome = match directory_has_entries(root) {
            Err(error) => Outcome::Failed {
                operation: Operation::Init,
                failure: StepFailure {
                    step: Step::WorkspaceCreate,
                    error,
                },
                completed: Vec::new(),
                history: HistoryStatus::Untouched,
            },
            Ok(true) => self.blocked(PreconditionError::WorkspaceNotEmpty {
                path: root.to_path_buf(),
            }),
            Ok(false) => {
                let mut completed = Vec::new();
                let result = run_step(Step::WorkspaceCreate, &mut completed, || {
                    fs::create_dir_all(root).map_err(|e| {
                        FilesystemError::CreateDir {
                            path: root.to_path_buf(),
                            source: e,
                        }
                        .into()
                    })
                })
                .and_then(|_| self.synchronizer().populate(&mut completed));
                Outcome::finish(Operation::Init, result, completed, HistoryStatus::Untouched)
            }
        };

        timed_span.complete();
        outcome
    }

    fn blocked(&self, reason: PreconditionError) -> Outcome {
        warn!("{}", reason);
        Outcome::Blocked(reason)
    }
}

/// Whether `path` exists with content. A missing path counts as empty; an
/// existing non-directory counts as occupied.
fn directory_has_entries(path: &std::path::Path) -> Result<bool, MbxError> {
    match fs::read_dir(path) {
        Ok(mut entries) => Ok(entries.next().is_some()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(_) if path.exists() && !path.is_dir() => Ok(true),
        Err(e) => Err(FilesystemError::Read {
            path: path.to_path_buf(),
            source: e,
        }
        .into()),
    }
}
