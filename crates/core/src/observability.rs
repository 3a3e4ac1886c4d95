//! Observability utilities for standardized tracing spans and structured fields
//!
//! Helper functions and constants for consistent tracing across the
//! provisioning workflows.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::time::Instant;
use tracing::{span, Span};

/// Canonical span names for core workflows
pub mod spans {
    pub const PROVISION_RUN: &str = "provision.run";
    pub const OVERLAY_REFRESH: &str = "overlay.refresh";
    pub const WORKSPACE_INIT: &str = "workspace.init";
}

/// Common field names for structured logging
pub mod fields {
    pub const DURATION_MS: &str = "duration_ms";
}

/// Generate a deterministic workspace ID from a path
///
/// This creates an 8-character hex hash from the canonical path.
pub fn workspace_id(workspace_path: &Path) -> String {
    let canonical_path = workspace_path
        .canonicalize()
        .unwrap_or_else(|_| workspace_path.to_path_buf());

    let mut hasher = DefaultHasher::new();
    canonical_path.hash(&mut hasher);
    let hash = hasher.finish();

    let hex = format!("{:016x}", hash);
    hex[..8].to_string()
}

/// Start a span for one provisioning run (`build`, `update`, `install`, `ant`)
pub fn provision_span(workspace_path: &Path, operation: &str) -> Span {
    let workspace_id = workspace_id(workspace_path);

    span!(
        target: "mbx_core::observability",
        tracing::Level::INFO,
        spans::PROVISION_RUN,
        duration_ms = tracing::field::Empty,
        workspace_id = %workspace_id,
        operation = %operation
    )
}

/// Start a span for an overlay refresh
pub fn overlay_refresh_span(workspace_path: &Path) -> Span {
    let workspace_id = workspace_id(workspace_path);

    span!(
        target: "mbx_core::observability",
        tracing::Level::INFO,
        spans::OVERLAY_REFRESH,
        duration_ms = tracing::field::Empty,
        workspace_id = %workspace_id
    )
}

/// Start a span for creating a new workspace
pub fn workspace_init_span(workspace_path: &Path) -> Span {
    span!(
        target: "mbx_core::observability",
        tracing::Level::INFO,
        spans::WORKSPACE_INIT,
        duration_ms = tracing::field::Empty,
        target_dir = %workspace_path.display()
    )
}

/// Helper for timing spans and recording duration
pub struct TimedSpan {
    span: Span,
    start_time: Instant,
    // Keep the span entered for the lifetime of TimedSpan
    _entered: tracing::span::EnteredSpan,
}

impl TimedSpan {
    /// Create a new timed span from an existing span
    pub fn new(span: Span) -> Self {
        let entered = span.clone().entered();
        Self {
            span,
            start_time: Instant::now(),
            _entered: entered,
        }
    }

    /// Complete the span and record duration
    pub fn complete(self) {
        let duration_ms = self.start_time.elapsed().as_millis() as u64;
        self.span.record(fields::DURATION_MS, duration_ms);
    }
}
