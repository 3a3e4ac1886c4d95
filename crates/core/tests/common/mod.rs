//! Shared test helpers for core integration tests.

#![allow(dead_code)]

use mbx_core::runner::mock::{MockResponse, MockRunner};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Files the upstream overlay repository delivers on `git pull`
pub const UPSTREAM_FILES: &[&str] = &[
    "package.json",
    "package-lock.json",
    ".eslintrc.json",
    "gulpfile.js",
    ".gitignore",
    "README.md",
];

/// A native project: build descriptor and SDK properties
pub fn native_project(root: &Path) -> io::Result<()> {
    fs::create_dir_all(root)?;
    fs::write(root.join("build.xml"), "<project name=\"app\" default=\"build\"/>")?;
    fs::write(root.join("local.properties"), "sdk.dir=/nowhere\n")?;
    Ok(())
}

/// User-owned git history with a few objects worth comparing
pub fn git_history(root: &Path) -> io::Result<()> {
    let git = root.join(".git");
    fs::create_dir_all(git.join("objects/ab"))?;
    fs::create_dir_all(git.join("refs/heads"))?;
    fs::write(git.join("HEAD"), "ref: refs/heads/main\n")?;
    fs::write(git.join("refs/heads/main"), "abcdef0123456789\n")?;
    fs::write(git.join("objects/ab/cdef0123456789"), [0u8, 1, 2, 3, 255])?;
    Ok(())
}

/// Every regular file under `root` with its bytes, keyed by relative path.
/// Directories appear with empty content so empty ones are compared too.
pub fn snapshot(root: &Path) -> io::Result<BTreeMap<PathBuf, Vec<u8>>> {
    let mut files = BTreeMap::new();
    if root.exists() {
        walk(root, root, &mut files)?;
    }
    Ok(files)
}

fn walk(base: &Path, dir: &Path, files: &mut BTreeMap<PathBuf, Vec<u8>>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let relative = path
            .strip_prefix(base)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.clone());
        if path.is_dir() {
            files.insert(relative.join(""), Vec::new());
            walk(base, &path, files)?;
        } else {
            files.insert(relative, fs::read(&path)?);
        }
    }
    Ok(())
}

/// Simulate the upstream pull: transient `.git` plus the overlay files
pub fn write_upstream_overlay(root: &Path) -> io::Result<()> {
    fs::create_dir_all(root.join(".git/objects"))?;
    fs::write(root.join(".git/HEAD"), "ref: refs/heads/main\n")?;
    fs::create_dir_all(root.join(".vscode"))?;
    fs::write(root.join(".vscode/settings.json"), "{}")?;
    for file in UPSTREAM_FILES {
        fs::write(root.join(file), format!("upstream {}", file))?;
    }
    Ok(())
}

/// Runner whose `git pull` and `npm install` behave like the real tools
pub fn upstream_runner() -> MockRunner {
    MockRunner::new()
        .respond(
            "git pull",
            MockResponse::success().with_effect(write_upstream_overlay),
        )
        .respond(
            "npm install",
            MockResponse::success().with_effect(|cwd| {
                fs::create_dir_all(cwd.join("node_modules/gulp"))?;
                fs::write(cwd.join("node_modules/gulp/index.js"), "module.exports = {}")
            }),
        )
        .respond(
            "ant",
            MockResponse::success()
                .with_effect(|cwd| fs::create_dir_all(cwd.join("platforms/android/src/org"))),
        )
}
