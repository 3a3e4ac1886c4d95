//! Terminal UI helpers

pub mod outcome;
pub mod prompt;
