//! Error types and handling
//!
//! Domain-specific error enums (preconditions, external commands, filesystem,
//! configuration) are wrapped in the main [`MbxError`] enum for unified
//! handling by the orchestrator and the CLI.

use std::path::PathBuf;
use thiserror::Error;

/// A precondition for the requested operation was not met. No mutation has
/// happened when one of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreconditionError {
    /// The native build descriptor is missing from the workspace root
    #[error("No native project found: \"{descriptor}\" is missing. Make sure to \"cd\" into the project directory before running this command")]
    NoProject { descriptor: String },

    /// Update requested on a workspace that has no overlay yet
    #[error("Nothing to update: no overlay is present in this workspace. Run \"build\" without --update for a fresh install")]
    NothingToUpdate,

    /// Fresh install requested on a workspace that already carries an overlay
    #[error("Cannot fresh install: an overlay is already present. Run \"build -u\" to update the overlay files")]
    OverlayAlreadyPresent,

    /// A history backup from a previous run is still on disk
    #[error("Stale history backup present at {}. A previous run did not finish; restore it manually (rename it back to .git) or remove it before retrying", staging.display())]
    StaleBackup { staging: PathBuf },

    /// `init` target exists and has content
    #[error("Workspace directory {} already exists and is not empty", path.display())]
    WorkspaceNotEmpty { path: PathBuf },

    /// `install` requested without an overlay package manifest
    #[error("No package manifest found at {}; run \"build\" first", path.display())]
    MissingPackageManifest { path: PathBuf },
}

/// An external command could not be run or reported failure
#[derive(Error, Debug)]
pub enum CommandError {
    /// The program could not be started at all
    #[error("Failed to execute command \"{command}\": {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The program ran and exited unsuccessfully
    #[error("Command \"{command}\" failed{}", code.map(|c| format!(" with exit code {}", c)).unwrap_or_else(|| " (terminated by signal)".to_string()))]
    Failed { command: String, code: Option<i32> },

    /// A configured command line was empty
    #[error("Empty command configured for {purpose}")]
    EmptyCommand { purpose: String },
}

/// A filesystem mutation failed
#[derive(Error, Debug)]
pub enum FilesystemError {
    /// Deleting a file or directory failed
    #[error("Failed to remove {}: {source}", path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Renaming failed
    #[error("Failed to rename {} to {}: {source}", from.display(), to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading a file failed
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing a file failed
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Creating a directory failed
    #[error("Failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A backup handle points at a staging location that no longer exists
    #[error("History backup expected at {} is missing", staging.display())]
    StagingMissing { staging: PathBuf },

    /// The staging location for a history backup already holds something
    #[error("History backup location {} is already occupied", staging.display())]
    StagingOccupied { staging: PathBuf },

    /// The destination of a rename is occupied
    #[error("Refusing to overwrite existing {}", path.display())]
    CanonicalOccupied { path: PathBuf },
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file parsing error
    #[error("Failed to parse configuration file: {message}")]
    Parsing { message: String },

    /// Configuration validation error
    #[error("Configuration validation error: {message}")]
    Validation { message: String },

    /// Configuration file I/O error
    #[error("Failed to read configuration file")]
    Io(#[from] std::io::Error),

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: String },
}

/// Main error enum wrapping all domain-specific errors
#[derive(Error, Debug)]
pub enum MbxError {
    /// Precondition errors
    #[error("Precondition not met: {0}")]
    Precondition(#[from] PreconditionError),

    /// External command errors
    #[error("External command failed: {0}")]
    Command(#[from] CommandError),

    /// Filesystem errors
    #[error("Filesystem operation failed: {0}")]
    Filesystem(#[from] FilesystemError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The confirmation prompt could not be shown or read
    #[error("Confirmation prompt failed: {0}")]
    Prompt(String),
}

/// Convenience type alias for Results with MbxError
pub type Result<T> = std::result::Result<T, MbxError>;
