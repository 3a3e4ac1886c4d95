//! Command implementations
//!
//! This module contains implementations for all CLI subcommands.

pub mod ant;
pub mod build;
pub mod init;
pub mod install;
pub mod shared;
pub mod status;
