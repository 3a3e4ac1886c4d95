//! Shared test utilities for mbx CLI tests.

#![allow(dead_code)]

use std::fs;
use std::io;
use std::path::Path;

/// `mbx.toml` that swaps every external tool for `true`, so runs need
/// neither git, ant nor npm.
pub const FAKE_TOOLS_CONFIG: &str = r#"
[upstream]
url = "file:///dev/null/overlay"

[commands]
git = "true"
native-build = "true"
package-install = "true"
"#;

/// Same as [`FAKE_TOOLS_CONFIG`] but the package install fails
pub const FAILING_INSTALL_CONFIG: &str = r#"
[commands]
git = "true"
native-build = "true"
package-install = "false"
"#;

/// Native project with the given `mbx.toml`
pub fn native_workspace(root: &Path, config: &str) -> io::Result<()> {
    fs::create_dir_all(root)?;
    fs::write(root.join("build.xml"), "<project name=\"app\"/>")?;
    fs::write(root.join("local.properties"), "sdk.dir=/old/sdk\n")?;
    fs::write(root.join("mbx.toml"), config)?;
    Ok(())
}

/// Minimal user-owned git history
pub fn git_history(root: &Path) -> io::Result<()> {
    fs::create_dir_all(root.join(".git/refs/heads"))?;
    fs::write(root.join(".git/HEAD"), "ref: refs/heads/main\n")?;
    fs::write(root.join(".git/refs/heads/main"), "0123456789abcdef\n")?;
    Ok(())
}
