//! Native SDK location in `local.properties`

use crate::errors::{FilesystemError, Result};
use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};
use std::fs;
use std::path::Path;
use tracing::{info, instrument, warn};

// Stops short of the line terminator so CRLF files keep their `\r`
static SDK_DIR_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^sdk\.dir=[^\r\n]*").expect("sdk.dir pattern is valid")
});

/// What happened to `local.properties`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdkPathUpdate {
    /// The `sdk.dir=` line now points at the given location
    Updated { sdk_dir: String },
    /// The environment variable naming the SDK is unset or empty
    EnvUnset { env_var: String },
    /// There is no `local.properties` to rewrite
    MissingFile,
    /// The file has no `sdk.dir=` line; it was left untouched
    NoEntry,
}

/// Replace the first `sdk.dir=` line in `contents` with `sdk_dir`
pub fn rewrite_sdk_dir(contents: &str, sdk_dir: &str) -> Option<String> {
    if !SDK_DIR_LINE.is_match(contents) {
        return None;
    }
    let replacement = format!("sdk.dir={}", sdk_dir);
    Some(
        SDK_DIR_LINE
            .replacen(contents, 1, NoExpand(&replacement))
            .into_owned(),
    )
}

/// Point `local.properties` at `sdk_dir`, the value of `env_var`.
///
/// A missing file or unset variable is skipped with a warning; I/O failures
/// while reading or writing are errors.
#[instrument]
pub fn update_local_properties(
    properties: &Path,
    env_var: &str,
    sdk_dir: Option<&str>,
) -> Result<SdkPathUpdate> {
    let sdk_dir = match sdk_dir.filter(|v| !v.trim().is_empty()) {
        Some(value) => value.to_string(),
        None => {
            warn!("${} is not set; leaving {} unchanged", env_var, properties.display());
            return Ok(SdkPathUpdate::EnvUnset {
                env_var: env_var.to_string(),
            });
        }
    };

    if !properties.is_file() {
        warn!("{} not found; skipping SDK path update", properties.display());
        return Ok(SdkPathUpdate::MissingFile);
    }

    let contents = fs::read_to_string(properties).map_err(|e| FilesystemError::Read {
        path: properties.to_path_buf(),
        source: e,
    })?;

    let Some(updated) = rewrite_sdk_dir(&contents, &sdk_dir) else {
        warn!("No sdk.dir entry in {}; leaving it unchanged", properties.display());
        return Ok(SdkPathUpdate::NoEntry);
    };

    fs::write(properties, updated).map_err(|e| FilesystemError::Write {
        path: properties.to_path_buf(),
        source: e,
    })?;

    info!("Updated {} with sdk.dir={}", properties.display(), sdk_dir);
    Ok(SdkPathUpdate::Updated { sdk_dir })
}
