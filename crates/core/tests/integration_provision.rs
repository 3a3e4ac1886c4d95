//! End-to-end provisioning flows against real temp directories.
//!
//! External tools are simulated by `MockRunner`; every filesystem effect
//! (guard rename, manifest purge, strip, readme removal) is real.

mod common;

use common::{git_history, native_project, snapshot, upstream_runner, UPSTREAM_FILES};
use mbx_core::config::ProvisionConfig;
use mbx_core::confirm::{AssumeYes, ScriptedAnswer};
use mbx_core::errors::{FilesystemError, MbxError, PreconditionError};
use mbx_core::orchestrator::{HistoryStatus, Orchestrator, Outcome, Step};
use mbx_core::overlay::OverlayManifest;
use mbx_core::runner::mock::{MockResponse, MockRunner};
use std::fs;
use tempfile::TempDir;

fn provision(config: &ProvisionConfig, runner: &MockRunner, update: bool) -> Outcome {
    Orchestrator::new(config, runner, &AssumeYes).provision(update)
}

#[test]
fn test_no_descriptor_blocks_without_mutation() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    git_history(temp_dir.path())?;
    fs::write(temp_dir.path().join("package.json"), "{}")?;
    let before = snapshot(temp_dir.path())?;
    let config = ProvisionConfig::new(temp_dir.path());
    let runner = upstream_runner();

    for update in [false, true] {
        let outcome = provision(&config, &runner, update);
        assert!(
            matches!(outcome, Outcome::Blocked(PreconditionError::NoProject { .. })),
            "{:?}",
            outcome
        );
        assert_eq!(outcome.exit_code(), 2);
    }

    assert!(runner.history().is_empty());
    assert_eq!(snapshot(temp_dir.path())?, before);
    Ok(())
}

#[test]
fn test_fresh_install_without_history() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    native_project(temp_dir.path())?;
    let mut config = ProvisionConfig::new(temp_dir.path());
    config.sdk_dir = Some("/opt/android-sdk".to_string());
    let runner = upstream_runner();

    let outcome = provision(&config, &runner, false);

    match &outcome {
        Outcome::Succeeded {
            completed, history, ..
        } => {
            assert_eq!(history, &HistoryStatus::Untouched);
            assert_eq!(
                completed,
                &vec![
                    Step::SdkPath,
                    Step::NativeBuild,
                    Step::StrayCleanup,
                    Step::VcsProtect,
                    Step::ManifestPurge,
                    Step::OverlayFetch,
                    Step::VcsStrip,
                    Step::PackageInstall,
                    Step::ReadmeRemoval,
                    Step::VcsRelease,
                ]
            );
        }
        other => panic!("unexpected outcome: {:?}", other),
    }

    let root = temp_dir.path();
    assert!(OverlayManifest::current().is_complete(root));
    assert!(!root.join(".git").exists());
    assert!(!root.join(".git.mbx-backup").exists());
    assert!(!root.join("README.md").exists());
    assert_eq!(
        fs::read_to_string(root.join("local.properties"))?,
        "sdk.dir=/opt/android-sdk\n"
    );
    assert_eq!(
        runner.history(),
        vec![
            "ant build -f build.xml".to_string(),
            "git init".to_string(),
            format!("git remote add origin {}", config.upstream.url),
            "git pull origin main".to_string(),
            "npm install".to_string(),
        ]
    );
    Ok(())
}

#[test]
fn test_fresh_install_preserves_history() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    native_project(temp_dir.path())?;
    git_history(temp_dir.path())?;
    let history_before = snapshot(&temp_dir.path().join(".git"))?;
    let config = ProvisionConfig::new(temp_dir.path());
    let runner = upstream_runner();

    let outcome = provision(&config, &runner, false);

    assert!(outcome.is_success(), "{:?}", outcome);
    assert_eq!(outcome.history(), Some(&HistoryStatus::Restored));
    assert_eq!(snapshot(&temp_dir.path().join(".git"))?, history_before);
    assert!(!temp_dir.path().join(".git.mbx-backup").exists());
    assert!(OverlayManifest::current().is_complete(temp_dir.path()));
    Ok(())
}

#[test]
fn test_second_fresh_run_is_blocked() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    native_project(temp_dir.path())?;
    let config = ProvisionConfig::new(temp_dir.path());

    let first = provision(&config, &upstream_runner(), false);
    assert!(first.is_success(), "{:?}", first);

    let before = snapshot(temp_dir.path())?;
    let runner = upstream_runner();
    let second = provision(&config, &runner, false);

    match &second {
        Outcome::Blocked(reason @ PreconditionError::OverlayAlreadyPresent) => {
            assert!(reason.to_string().contains("build -u"));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(runner.history().is_empty());
    assert_eq!(snapshot(temp_dir.path())?, before);
    Ok(())
}

#[test]
fn test_update_on_fresh_target_is_blocked() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    native_project(temp_dir.path())?;
    let before = snapshot(temp_dir.path())?;
    let config = ProvisionConfig::new(temp_dir.path());
    let runner = upstream_runner();

    let outcome = provision(&config, &runner, true);

    assert!(matches!(
        outcome,
        Outcome::Blocked(PreconditionError::NothingToUpdate)
    ));
    assert!(runner.history().is_empty());
    assert_eq!(snapshot(temp_dir.path())?, before);
    Ok(())
}

#[test]
fn test_update_refreshes_overlay_and_keeps_history() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();
    native_project(root)?;
    git_history(root)?;
    fs::create_dir_all(root.join("platforms/android"))?;
    fs::write(root.join("gulpfile.js"), "local edits")?;
    fs::create_dir_all(root.join("node_modules/left-pad"))?;
    fs::create_dir_all(root.join("www"))?;
    fs::write(root.join("www/index.html"), "<html/>")?;
    let history_before = snapshot(&root.join(".git"))?;
    let config = ProvisionConfig::new(root);
    let runner = upstream_runner();

    let outcome = provision(&config, &runner, true);

    assert!(outcome.is_success(), "{:?}", outcome);
    assert_eq!(outcome.history(), Some(&HistoryStatus::Restored));
    assert!(!runner.ran("ant"));
    assert!(!outcome.completed().contains(&Step::NativeBuild));
    assert_eq!(snapshot(&root.join(".git"))?, history_before);
    assert_eq!(
        fs::read_to_string(root.join("gulpfile.js"))?,
        "upstream gulpfile.js"
    );
    assert!(!root.join("node_modules/left-pad").exists());
    assert!(root.join("node_modules/gulp").is_dir());
    assert_eq!(fs::read_to_string(root.join("www/index.html"))?, "<html/>");
    Ok(())
}

#[test]
fn test_update_tolerates_half_present_manifest() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();
    native_project(root)?;
    fs::write(root.join("package.json"), "{\"name\":\"old\"}")?;
    let config = ProvisionConfig::new(root);
    let runner = upstream_runner();

    let outcome = provision(&config, &runner, true);

    assert!(outcome.is_success(), "{:?}", outcome);
    assert!(runner.ran("git pull origin main"));
    assert!(OverlayManifest::current().is_complete(root));
    for file in UPSTREAM_FILES.iter().filter(|f| **f != "README.md") {
        assert!(root.join(file).is_file(), "missing {}", file);
    }
    Ok(())
}

#[test]
fn test_stale_backup_blocks_without_mutation() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();
    native_project(root)?;
    fs::create_dir_all(root.join(".git.mbx-backup/objects"))?;
    fs::write(root.join(".git.mbx-backup/HEAD"), "ref: refs/heads/main\n")?;
    let before = snapshot(root)?;
    let config = ProvisionConfig::new(root);

    for update in [false, true] {
        let runner = upstream_runner();
        let outcome = provision(&config, &runner, update);
        match &outcome {
            Outcome::Blocked(PreconditionError::StaleBackup { staging }) => {
                assert_eq!(staging, &root.join(".git.mbx-backup"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(runner.history().is_empty());
    }

    assert_eq!(snapshot(root)?, before);
    Ok(())
}

#[test]
fn test_history_restored_after_package_install_failure() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();
    native_project(root)?;
    git_history(root)?;
    fs::create_dir_all(root.join("platforms"))?;
    let history_before = snapshot(&root.join(".git"))?;
    let config = ProvisionConfig::new(root);
    let runner = upstream_runner().respond("npm install", MockResponse::failure(1));

    let outcome = provision(&config, &runner, true);

    match &outcome {
        Outcome::Failed {
            failure,
            completed,
            history,
            ..
        } => {
            assert_eq!(failure.step, Step::PackageInstall);
            assert_eq!(history, &HistoryStatus::Restored);
            assert!(completed.contains(&Step::VcsRelease));
            assert!(!completed.contains(&Step::ReadmeRemoval));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(outcome.exit_code(), 1);
    assert_eq!(snapshot(&root.join(".git"))?, history_before);
    assert!(!root.join(".git.mbx-backup").exists());
    Ok(())
}

#[test]
fn test_history_restored_after_fetch_failure() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();
    native_project(root)?;
    git_history(root)?;
    fs::write(root.join("package.json"), "{}")?;
    let history_before = snapshot(&root.join(".git"))?;
    let config = ProvisionConfig::new(root);
    let runner = MockRunner::new().respond(
        "git pull",
        MockResponse::failure(128).with_effect(|cwd| {
            fs::create_dir_all(cwd.join(".git/objects"))?;
            fs::write(cwd.join("package.json"), "partial")
        }),
    );

    let outcome = provision(&config, &runner, true);

    match &outcome {
        Outcome::Failed { failure, history, .. } => {
            assert_eq!(failure.step, Step::OverlayFetch);
            assert_eq!(history, &HistoryStatus::Restored);
            assert!(failure.error.to_string().contains("exit code 128"));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(snapshot(&root.join(".git"))?, history_before);
    assert!(OverlayManifest::current().present_entries(root).is_empty());
    Ok(())
}

#[test]
fn test_history_stranded_when_canonical_location_reoccupied() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();
    native_project(root)?;
    git_history(root)?;
    fs::create_dir_all(root.join("platforms"))?;
    let history_before = snapshot(&root.join(".git"))?;
    let config = ProvisionConfig::new(root);
    // A package install hook that initializes a repository of its own
    let runner = upstream_runner().respond(
        "npm install",
        MockResponse::success().with_effect(|cwd| fs::create_dir_all(cwd.join(".git/hooks"))),
    );

    let outcome = provision(&config, &runner, true);

    let staging = root.join(".git.mbx-backup");
    match &outcome {
        Outcome::Failed {
            failure, history, ..
        } => {
            assert_eq!(failure.step, Step::VcsRelease);
            assert!(matches!(
                failure.error,
                MbxError::Filesystem(FilesystemError::CanonicalOccupied { .. })
            ));
            assert_eq!(
                history,
                &HistoryStatus::Stranded {
                    staging: staging.clone()
                }
            );
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(outcome.exit_code(), 4);
    assert_eq!(snapshot(&staging)?, history_before);

    // The leftover backup now blocks every later run until restored by hand
    let next = provision(&config, &upstream_runner(), true);
    assert!(matches!(
        next,
        Outcome::Blocked(PreconditionError::StaleBackup { .. })
    ));
    Ok(())
}

#[test]
fn test_declined_prompt_aborts_before_any_step() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();
    native_project(root)?;
    git_history(root)?;
    let before = snapshot(root)?;
    let config = ProvisionConfig::new(root);
    let runner = upstream_runner();
    let answer = ScriptedAnswer::new(false);

    let outcome = Orchestrator::new(&config, &runner, &answer).provision(false);

    assert!(matches!(outcome, Outcome::Aborted));
    assert_eq!(outcome.exit_code(), 3);
    assert_eq!(answer.prompts().len(), 1);
    assert!(runner.history().is_empty());
    assert_eq!(snapshot(root)?, before);
    Ok(())
}

#[test]
fn test_init_populates_new_workspace() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let target = temp_dir.path().join("my-app");
    let config = ProvisionConfig::new(&target);
    let runner = upstream_runner();

    let outcome = Orchestrator::new(&config, &runner, &AssumeYes).init_workspace();

    assert!(outcome.is_success(), "{:?}", outcome);
    assert!(OverlayManifest::current().is_complete(&target));
    assert!(!target.join(".git").exists());
    assert!(!target.join("README.md").exists());
    assert!(!runner.ran("ant"));
    Ok(())
}
