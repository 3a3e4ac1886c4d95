//! Core library for mbx
//!
//! Workspace classification, git history protection, overlay synchronization
//! and the provisioning state machine that strings them together. The CLI
//! crate only parses arguments, renders outcomes and supplies the interactive
//! confirmation.

pub mod config;
pub mod confirm;
pub mod errors;
pub mod logging;
pub mod observability;
pub mod orchestrator;
pub mod overlay;
pub mod probe;
pub mod runner;
pub mod sdk;
pub mod vcs_guard;

/// Get the version of the core library
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let version = version();
        assert!(!version.is_empty());
        assert!(version.contains('.'));
    }
}
